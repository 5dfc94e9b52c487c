use crate::icloudsort_core::error::{Anomaly, IcloudsortError, Result};
use crate::icloudsort_core::record::{Bucket, RecordMap};
use crate::icloudsort_core::report::{Reporter, progress_bar};
use std::fs::{self, FileTimes};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::OwnedFormatItem;

pub const DEFAULT_DIR_PATTERN: &str = "year/month";

/// Date-based directory layout below the bucket folder, e.g. `year/month` -> `2021/03`.
#[derive(Debug, Clone)]
pub struct DirPattern {
    pattern: String,
    format: OwnedFormatItem,
}

impl DirPattern {
    /// Parse a pattern of bare component words (`year`, `month`, `day`, `hour`, `minute`,
    /// `second`) and separators, or a raw `time` format description if it contains `[`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: String| IcloudsortError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let trimmed = pattern.trim().trim_start_matches(['/', '\\']);
        if trimmed.is_empty() {
            return Err(invalid("pattern is empty".to_string()));
        }
        if Path::new(trimmed)
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(invalid("pattern must stay inside the output directory".to_string()));
        }

        let description = if trimmed.contains('[') {
            trimmed.to_string()
        } else {
            words_to_description(trimmed).map_err(invalid)?
        };

        let format = time::format_description::parse_owned::<1>(&description)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(DirPattern {
            pattern: pattern.to_string(),
            format,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn format(&self, date: &OffsetDateTime) -> Result<String> {
        date.format(&self.format)
            .map_err(|e| IcloudsortError::InvalidDateFormat(e.to_string()))
    }
}

impl Default for DirPattern {
    fn default() -> Self {
        DirPattern {
            pattern: DEFAULT_DIR_PATTERN.to_string(),
            format: OwnedFormatItem::from(time::macros::format_description!("[year]/[month]")),
        }
    }
}

fn words_to_description(pattern: &str) -> std::result::Result<String, String> {
    let mut description = String::new();
    let mut word = String::new();

    for c in pattern.chars() {
        if c.is_ascii_alphabetic() {
            word.push(c);
        } else {
            push_component(&mut word, &mut description)?;
            description.push(c);
        }
    }
    push_component(&mut word, &mut description)?;
    Ok(description)
}

fn push_component(word: &mut String, description: &mut String) -> std::result::Result<(), String> {
    if word.is_empty() {
        return Ok(());
    }
    let component = match word.to_lowercase().as_str() {
        "year" => "[year]",
        "month" => "[month]",
        "day" => "[day]",
        "hour" => "[hour]",
        "minute" => "[minute]",
        "second" => "[second]",
        other => return Err(format!("unknown component '{}'", other)),
    };
    description.push_str(component);
    word.clear();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Copy,
    Overwrite,
    SkipExists,
    SkipExcluded,
    SkipUnresolved,
}

impl ActionKind {
    pub fn is_copy(&self) -> bool {
        matches!(self, ActionKind::Copy | ActionKind::Overwrite)
    }
}

/// What the planner decided for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub filename: String,
    pub bucket: Bucket,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub timestamp: Option<OffsetDateTime>,
    pub kind: ActionKind,
}

impl PlannedAction {
    /// The anomaly to report for this action, if any.
    pub fn anomaly(&self) -> Option<Anomaly> {
        match (self.kind, &self.destination) {
            (ActionKind::SkipExists, Some(destination)) => Some(Anomaly::DestinationExists {
                filename: self.filename.clone(),
                destination: destination.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Without an output root destinations are relative and never probed.
    pub output_root: Option<PathBuf>,
    pub pattern: DirPattern,
    pub overwrite: bool,
}

/// Relative destination of a file: `{Shared|Personal}/{date pattern}/{filename}`.
pub fn relative_destination(
    bucket: Bucket,
    date: &OffsetDateTime,
    pattern: &DirPattern,
    filename: &str,
) -> Result<PathBuf> {
    Ok(PathBuf::from(bucket.folder_name())
        .join(pattern.format(date)?)
        .join(filename))
}

/// Decide the fate of every record, in record-map order.
pub fn plan(
    records: &RecordMap,
    options: &PlanOptions,
    reporter: &dyn Reporter,
) -> Result<Vec<PlannedAction>> {
    let mut actions = Vec::with_capacity(records.len());

    for record in records.values() {
        let mut action = PlannedAction {
            filename: record.filename.clone(),
            bucket: record.bucket(),
            source: record.source_path.clone(),
            destination: None,
            timestamp: None,
            kind: ActionKind::SkipExcluded,
        };

        if record.skip {
            actions.push(action);
            continue;
        }

        let Some(resolved) = record.resolved() else {
            action.kind = ActionKind::SkipUnresolved;
            actions.push(action);
            continue;
        };

        let relative =
            relative_destination(record.bucket(), &resolved.date, &options.pattern, &record.filename)?;
        let destination = match &options.output_root {
            Some(root) => root.join(relative),
            None => relative,
        };

        let exists = options.output_root.is_some() && destination.exists();
        action.kind = match (exists, options.overwrite) {
            (false, _) => ActionKind::Copy,
            (true, true) => ActionKind::Overwrite,
            (true, false) => ActionKind::SkipExists,
        };
        action.timestamp = Some(resolved.date);
        action.destination = Some(destination);

        if let Some(anomaly) = action.anomaly() {
            reporter.warn(&anomaly.to_string());
        }
        actions.push(action);
    }

    Ok(actions)
}

/// Copies one file and optionally stamps it with a time.
pub trait FileCopier {
    fn copy(&self, source: &Path, destination: &Path, timestamp: Option<OffsetDateTime>) -> io::Result<()>;
}

/// Copies on the local filesystem, creating parent directories as needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCopier;

impl FileCopier for FsCopier {
    fn copy(&self, source: &Path, destination: &Path, timestamp: Option<OffsetDateTime>) -> io::Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, destination)?;

        if let Some(timestamp) = timestamp {
            let time = SystemTime::from(timestamp);
            let times = FileTimes::new().set_accessed(time).set_modified(time);
            fs::File::options()
                .write(true)
                .open(destination)?
                .set_times(times)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    pub dry_run: bool,
    pub set_timestamps: bool,
}

#[derive(Debug, Default)]
pub struct ExecuteReport {
    pub copied: usize,
    pub would_copy: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Carry out the copy actions of a plan. In dry-run mode only report them.
pub fn execute(
    actions: &[PlannedAction],
    copier: &dyn FileCopier,
    options: ExecuteOptions,
    reporter: &dyn Reporter,
) -> ExecuteReport {
    let mut report = ExecuteReport::default();
    let copies: Vec<&PlannedAction> = actions.iter().filter(|a| a.kind.is_copy()).collect();

    if options.dry_run {
        for action in copies {
            if let Some(destination) = &action.destination {
                let verb = if action.kind == ActionKind::Overwrite {
                    "overwrite"
                } else {
                    "copy"
                };
                reporter.info(&format!(
                    "[DRY RUN] Would {} {} -> {}",
                    verb,
                    action.source.display(),
                    destination.display()
                ));
                report.would_copy += 1;
            }
        }
        return report;
    }

    let bar = progress_bar(copies.len(), "Copying files");
    for action in copies {
        let Some(destination) = &action.destination else {
            continue;
        };
        let timestamp = if options.set_timestamps {
            action.timestamp
        } else {
            None
        };

        match copier.copy(&action.source, destination, timestamp) {
            Ok(()) => {
                reporter.debug(&format!(
                    "Copied {} -> {}",
                    action.source.display(),
                    destination.display()
                ));
                report.copied += 1;
            }
            Err(e) => {
                let anomaly = Anomaly::CopyFailed {
                    filename: action.filename.clone(),
                    destination: destination.clone(),
                    reason: e.to_string(),
                };
                reporter.error(&anomaly.to_string());
                report.anomalies.push(anomaly);
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message("Copy complete");

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icloudsort_core::record::{AssetRecord, ResolvedDate};
    use crate::icloudsort_core::report::MemoryReporter;
    use crate::icloudsort_core::resolve::DateSource;
    use assert_fs::prelude::*;
    use std::cell::RefCell;
    use time::macros::datetime;

    fn record(name: &str, shared: bool, date: Option<OffsetDateTime>) -> AssetRecord {
        let mut record = AssetRecord::untracked(
            name.to_string(),
            PathBuf::from("/src/Photos").join(name),
            datetime!(2024-01-01 00:00 UTC),
        );
        record.is_shared = shared;
        if let Some(date) = date {
            record
                .set_resolved(ResolvedDate {
                    date,
                    source: DateSource::SubSecond,
                })
                .unwrap();
        }
        record
    }

    fn records() -> RecordMap {
        let mut map = RecordMap::new();
        for r in [
            record("a.jpg", false, Some(datetime!(2021-03-26 16:25:20 -7))),
            record("b.jpg", true, Some(datetime!(2019-12-01 08:00 UTC))),
            record("c.jpg", false, None),
        ] {
            map.insert(r.filename.clone(), r);
        }
        map
    }

    #[derive(Default)]
    struct RecordingCopier {
        calls: RefCell<Vec<(PathBuf, PathBuf, Option<OffsetDateTime>)>>,
    }

    impl FileCopier for RecordingCopier {
        fn copy(&self, source: &Path, destination: &Path, timestamp: Option<OffsetDateTime>) -> io::Result<()> {
            self.calls
                .borrow_mut()
                .push((source.to_path_buf(), destination.to_path_buf(), timestamp));
            Ok(())
        }
    }

    #[test]
    fn test_dir_pattern_default_and_words() {
        let date = datetime!(2021-03-26 16:25:20 -7);
        assert_eq!(DirPattern::default().format(&date).unwrap(), "2021/03");
        assert_eq!(DirPattern::parse("year/month").unwrap().format(&date).unwrap(), "2021/03");
        assert_eq!(DirPattern::parse("year/month-day").unwrap().format(&date).unwrap(), "2021/03-26");
        assert_eq!(DirPattern::parse("year").unwrap().format(&date).unwrap(), "2021");
        assert_eq!(DirPattern::parse("[year]/[month]/[day]").unwrap().format(&date).unwrap(), "2021/03/26");
    }

    #[test]
    fn test_dir_pattern_rejects_bad_input() {
        assert!(DirPattern::parse("").is_err());
        assert!(DirPattern::parse("year/fortnight").is_err());
        assert!(DirPattern::parse("../year").is_err());
        assert!(DirPattern::parse("[year").is_err());
    }

    #[test]
    fn test_plan_layout_and_skips() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let mut records = records();
        records.get_mut("b.jpg").unwrap().skip = true;
        let options = PlanOptions {
            output_root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let actions = plan(&records, &options, &MemoryReporter::new()).unwrap();

        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].kind, ActionKind::Copy);
        assert_eq!(
            actions[0].destination,
            Some(temp_dir.path().join("Personal/2021/03/a.jpg"))
        );
        assert_eq!(actions[1].kind, ActionKind::SkipExcluded);
        assert_eq!(actions[1].destination, None);
        assert_eq!(actions[2].kind, ActionKind::SkipUnresolved);
    }

    #[test]
    fn test_shared_bucket_folder() {
        let records = records();
        let actions = plan(&records, &PlanOptions::default(), &MemoryReporter::new()).unwrap();
        assert_eq!(actions[1].destination, Some(PathBuf::from("Shared/2019/12/b.jpg")));
    }

    #[test]
    fn test_collision_without_overwrite_is_skipped() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        temp_dir.child("Personal/2021/03/a.jpg").write_str("existing").unwrap();
        let records = records();
        let options = PlanOptions {
            output_root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let reporter = MemoryReporter::new();
        let actions = plan(&records, &options, &reporter).unwrap();

        assert_eq!(actions[0].kind, ActionKind::SkipExists);
        assert!(matches!(actions[0].anomaly(), Some(Anomaly::DestinationExists { .. })));

        let copier = RecordingCopier::default();
        let report = execute(
            &actions,
            &copier,
            ExecuteOptions {
                dry_run: false,
                set_timestamps: true,
            },
            &reporter,
        );
        assert!(copier.calls.borrow().iter().all(|(s, _, _)| !s.ends_with("a.jpg")));
        assert_eq!(report.copied, 1);
        temp_dir.child("Personal/2021/03/a.jpg").assert("existing");
    }

    #[test]
    fn test_collision_with_overwrite() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        temp_dir.child("Personal/2021/03/a.jpg").write_str("existing").unwrap();
        let options = PlanOptions {
            output_root: Some(temp_dir.path().to_path_buf()),
            overwrite: true,
            ..Default::default()
        };
        let actions = plan(&records(), &options, &MemoryReporter::new()).unwrap();
        assert_eq!(actions[0].kind, ActionKind::Overwrite);
    }

    #[test]
    fn test_dry_run_planning_is_idempotent_and_copies_nothing() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let records = records();
        let options = PlanOptions {
            output_root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let reporter = MemoryReporter::new();
        let first = plan(&records, &options, &reporter).unwrap();
        let copier = RecordingCopier::default();
        let report = execute(
            &first,
            &copier,
            ExecuteOptions {
                dry_run: true,
                set_timestamps: true,
            },
            &reporter,
        );
        let second = plan(&records, &options, &reporter).unwrap();

        assert_eq!(first, second);
        assert_eq!(report.would_copy, 2);
        assert!(copier.calls.borrow().is_empty());
        assert!(!temp_dir.child("Personal").exists());
    }

    #[test]
    fn test_timestamp_suppression() {
        let actions = plan(&records(), &PlanOptions::default(), &MemoryReporter::new()).unwrap();
        let copier = RecordingCopier::default();
        execute(
            &actions,
            &copier,
            ExecuteOptions {
                dry_run: false,
                set_timestamps: false,
            },
            &MemoryReporter::new(),
        );
        assert!(copier.calls.borrow().iter().all(|(_, _, ts)| ts.is_none()));
    }

    #[test]
    fn test_fs_copier_sets_times() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let source = temp_dir.child("src.jpg");
        source.write_str("pixels").unwrap();
        let destination = temp_dir.path().join("out/2021/03/src.jpg");
        let when = datetime!(2021-03-26 16:25:20 -7);

        FsCopier.copy(source.path(), &destination, Some(when)).unwrap();

        let modified = fs::metadata(&destination).unwrap().modified().unwrap();
        assert_eq!(OffsetDateTime::from(modified), when);
        assert_eq!(fs::read_to_string(&destination).unwrap(), "pixels");
    }
}
