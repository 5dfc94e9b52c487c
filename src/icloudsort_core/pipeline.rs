use crate::icloudsort_core::catalog::{
    IngestOptions, correlate_shared, find_catalogs, ingest_catalog,
};
use crate::icloudsort_core::classify::{SkipPolicy, classify};
use crate::icloudsort_core::error::{Anomaly, IcloudsortError, Result};
use crate::icloudsort_core::exif::TagExtractor;
use crate::icloudsort_core::planner::{
    ActionKind, ExecuteOptions, FileCopier, PlanOptions, PlannedAction, execute, plan,
};
use crate::icloudsort_core::reconcile::reconcile_untracked;
use crate::icloudsort_core::record::{RecordMap, ResolvedDate};
use crate::icloudsort_core::report::Reporter;
use crate::icloudsort_core::resolve::resolve;
use std::collections::HashSet;
use std::path::PathBuf;

/// Directory inside the export that holds the photos and their catalogs.
pub const DIR_PHOTOS: &str = "Photos";

/// Everything a run needs to know, independent of how it was configured.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub source: PathBuf,
    pub ingest: IngestOptions,
    pub skip: SkipPolicy,
    pub plan: PlanOptions,
    pub execute: ExecuteOptions,
}

/// Outcome of a whole run. Anomalies never change the exit status.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub personal: usize,
    pub shared: usize,
    pub untracked: usize,
    pub excluded: usize,
    pub resolved: usize,
    pub copied: usize,
    pub would_copy: usize,
    pub skipped_existing: usize,
    pub actions: Vec<PlannedAction>,
    pub anomalies: Vec<Anomaly>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} personal, {} shared, {} untracked; {} excluded, {} dated, {} copied, {} would copy, {} already present ({} anomalies)",
            self.personal,
            self.shared,
            self.untracked,
            self.excluded,
            self.resolved,
            self.copied,
            self.would_copy,
            self.skipped_existing,
            self.anomalies.len()
        )
    }
}

/// Run every stage in order over one export.
pub fn run(
    options: &RunOptions,
    extractor: &mut dyn TagExtractor,
    copier: &dyn FileCopier,
    reporter: &dyn Reporter,
) -> Result<RunSummary> {
    let photos_dir = options.source.join(DIR_PHOTOS);
    if !photos_dir.exists() {
        return Err(IcloudsortError::SourceNotFound(photos_dir));
    }
    if !photos_dir.is_dir() {
        return Err(IcloudsortError::NotADirectory(photos_dir));
    }

    let mut summary = RunSummary::default();
    let mut records = RecordMap::new();

    // Stage 1 and 2: catalogs
    reporter.info("Phase 1: Reading catalogs");
    let catalogs = find_catalogs(&photos_dir)?;
    if catalogs.personal.is_empty() {
        reporter.warn(&format!("No photo catalogs found in {}", photos_dir.display()));
    }
    let mut rejected = HashSet::new();
    for catalog in &catalogs.personal {
        let report = ingest_catalog(catalog, &photos_dir, &mut records, options.ingest, reporter)?;
        rejected.extend(report.anomalies.iter().filter_map(Anomaly::filename).map(str::to_string));
        summary.anomalies.extend(report.anomalies);
    }
    for catalog in &catalogs.shared {
        let report = correlate_shared(catalog, &mut records, reporter)?;
        summary.anomalies.extend(report.anomalies);
    }

    // Stage 3: loose files
    reporter.info("Phase 2: Reconciling with the filesystem");
    let reconciled = reconcile_untracked(&photos_dir, &mut records, &rejected, reporter)?;
    summary.untracked = reconciled.untracked.len();
    summary.shared = records.values().filter(|r| r.is_shared).count();
    summary.personal = records.len() - summary.shared;

    // Stage 4: exclusions
    let candidates = classify(&mut records, options.skip, reporter);
    summary.excluded = records.len() - candidates.len();

    // Stage 5: dates
    reporter.info("Phase 3: Resolving creation dates");
    let resolution_anomalies = resolve_dates(&mut records, &candidates, extractor, reporter)?;
    summary.resolved = records.values().filter(|r| r.resolved().is_some()).count();
    summary.anomalies.extend(resolution_anomalies);

    // Stage 6: destinations
    reporter.info("Phase 4: Planning destinations");
    let actions = plan(&records, &options.plan, reporter)?;
    summary.skipped_existing = actions
        .iter()
        .filter(|a| a.kind == ActionKind::SkipExists)
        .count();
    summary
        .anomalies
        .extend(actions.iter().filter_map(PlannedAction::anomaly));

    let executed = execute(&actions, copier, options.execute, reporter);
    summary.copied = executed.copied;
    summary.would_copy = executed.would_copy;
    summary.anomalies.extend(executed.anomalies);
    summary.actions = actions;

    reporter.info(&format!("Run complete: {}", summary));
    Ok(summary)
}

/// Extract tags for all candidates in one batch and settle each record's creation date.
pub fn resolve_dates(
    records: &mut RecordMap,
    candidates: &[PathBuf],
    extractor: &mut dyn TagExtractor,
    reporter: &dyn Reporter,
) -> Result<Vec<Anomaly>> {
    reporter.info(&format!("Reading metadata from {} files", candidates.len()));
    let mut tags = extractor.extract(candidates)?;
    let mut anomalies = Vec::new();

    for record in records.values_mut().filter(|r| !r.skip) {
        if record.resolved().is_some() {
            continue;
        }
        let record_tags = tags.remove(&record.filename).unwrap_or_default();
        if record_tags.is_empty() {
            reporter.debug(&format!("{}: no metadata tags found", record.filename));
        }

        match resolve(&record.filename, &record_tags, &record.catalog_date, reporter) {
            Ok(resolution) => {
                reporter.debug(&format!(
                    "{} determined to be created at {} (from {})",
                    record.filename, resolution.date, resolution.source
                ));
                record.set_resolved(ResolvedDate {
                    date: resolution.date,
                    source: resolution.source,
                })?;
            }
            Err(e) => {
                let anomaly = Anomaly::UnresolvedDate {
                    filename: record.filename.clone(),
                    reason: e.to_string(),
                };
                reporter.warn(&anomaly.to_string());
                anomalies.push(anomaly);
            }
        }
    }

    Ok(anomalies)
}
