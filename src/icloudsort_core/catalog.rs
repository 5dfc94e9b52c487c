//! Reading the export's CSV catalogs into asset records.
//!
//! Personal catalogs (`Photo Details*.csv`) create records. Shared catalogs
//! (`Shared Library Details*.csv`) only annotate records that already exist.

use crate::icloudsort_core::checksum::{ChecksumPolicy, digest_file};
use crate::icloudsort_core::error::{Anomaly, IcloudsortError, Result};
use crate::icloudsort_core::record::{AssetRecord, RecordMap};
use crate::icloudsort_core::report::{Reporter, progress_bar};
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

pub const FILE_PHOTOS_CSV: &str = "Photo Details";
pub const FILE_SHARED_CSV: &str = "Shared Library Details";
pub const CSV_EXT: &str = ".csv";

const COL_IMG_NAME: &str = "imgName";

const VAL_YES: &str = "yes";
const VAL_NO: &str = "no";

/// One row of a personal catalog.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CatalogRow {
    #[serde(rename = "imgName")]
    pub img_name: String,
    #[serde(rename = "fileChecksum", default)]
    pub file_checksum: String,
    #[serde(rename = "originalCreationDate", default)]
    pub original_creation_date: String,
    #[serde(rename = "importDate", default)]
    pub import_date: String,
    #[serde(rename = "contributedByMe", default)]
    pub contributed_by_me: String,
    #[serde(default)]
    pub deleted: String,
}

/// One row of a shared-library catalog.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SharedRow {
    #[serde(rename = "imgName")]
    pub img_name: String,
    #[serde(rename = "contributedByMe", default)]
    pub contributed_by_me: String,
}

/// Parse a `yes`/`no` column. Anything else is treated as unknown.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        VAL_YES => Some(true),
        VAL_NO => Some(false),
        _ => None,
    }
}

/// Catalog files found in the catalog directory, in filename order.
#[derive(Debug, Default)]
pub struct CatalogSet {
    pub personal: Vec<PathBuf>,
    pub shared: Vec<PathBuf>,
}

/// List the personal and shared catalogs in `dir`.
pub fn find_catalogs(dir: &Path) -> Result<CatalogSet> {
    let mut set = CatalogSet::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !name.ends_with(CSV_EXT) {
            continue;
        }
        if name.starts_with(FILE_PHOTOS_CSV) {
            set.personal.push(entry.into_path());
        } else if name.starts_with(FILE_SHARED_CSV) {
            set.shared.push(entry.into_path());
        }
    }
    Ok(set)
}

/// True if `name` is a single path component that stays inside its directory.
pub fn is_plain_filename(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Turn a row-level CSV error into an anomaly. I/O errors stay fatal.
fn row_error(catalog: &str, err: csv::Error) -> Result<Anomaly> {
    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
        return Err(IcloudsortError::Catalog {
            catalog: catalog.to_string(),
            source: err,
        });
    }
    Ok(Anomaly::MalformedRow {
        catalog: catalog.to_string(),
        line: err.position().map(|p| p.line()).unwrap_or_default(),
        reason: err.to_string(),
    })
}

/// Check the header row so a catalog without `imgName` fails once, not on every row.
fn check_headers<R: Read>(csv_reader: &mut csv::Reader<R>, catalog: &str) -> Result<()> {
    let headers = csv_reader.headers().map_err(|e| IcloudsortError::Catalog {
        catalog: catalog.to_string(),
        source: e,
    })?;
    if !headers.iter().any(|h| h == COL_IMG_NAME) {
        return Err(IcloudsortError::MissingColumn {
            catalog: catalog.to_string(),
            column: COL_IMG_NAME.to_string(),
        });
    }
    Ok(())
}

/// Settings that change how catalog rows are admitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    pub validate_checksums: bool,
    pub checksum_policy: ChecksumPolicy,
}

/// What happened to a single catalog row. Fatal conditions are returned as `Err` instead.
#[derive(Debug)]
pub enum RowOutcome {
    Accepted(AssetRecord),
    Rejected(Anomaly),
}

/// Totals for one ingested catalog.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub rows: usize,
    pub accepted: usize,
    pub anomalies: Vec<Anomaly>,
}

pub fn catalog_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Ingest one personal catalog file.
pub fn ingest_catalog(
    path: &Path,
    photos_dir: &Path,
    records: &mut RecordMap,
    options: IngestOptions,
    reporter: &dyn Reporter,
) -> Result<IngestReport> {
    let name = catalog_name(path);
    reporter.info(&format!("Processing {}...", name));
    let file = fs::File::open(path)?;
    ingest_rows(file, &name, photos_dir, records, options, reporter)
}

/// Ingest personal catalog rows from any reader.
pub fn ingest_rows<R: Read>(
    reader: R,
    catalog: &str,
    photos_dir: &Path,
    records: &mut RecordMap,
    options: IngestOptions,
    reporter: &dyn Reporter,
) -> Result<IngestReport> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    check_headers(&mut csv_reader, catalog)?;
    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<CatalogRow>() {
        rows.push(match row {
            Ok(row) => Ok(row),
            Err(e) => Err(row_error(catalog, e)?),
        });
    }

    let mut report = IngestReport {
        rows: rows.len(),
        ..Default::default()
    };

    let bar = options
        .validate_checksums
        .then(|| progress_bar(rows.len(), "Validating checksums"));

    for row in rows {
        let outcome = match row {
            Ok(row) => {
                reporter.debug(&format!("{:?}", row));
                admit_row(row, catalog, photos_dir, records, options, reporter)?
            }
            Err(anomaly) => RowOutcome::Rejected(anomaly),
        };
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        match outcome {
            RowOutcome::Accepted(record) => {
                report.accepted += 1;
                records.insert(record.filename.clone(), record);
            }
            RowOutcome::Rejected(anomaly) => {
                reporter.warn(&anomaly.to_string());
                report.anomalies.push(anomaly);
            }
        }
    }

    if let Some(bar) = bar {
        bar.finish_with_message("Checksums validated");
    }

    reporter.info(&format!(
        "{}: {} rows, {} accepted, {} skipped",
        catalog,
        report.rows,
        report.accepted,
        report.anomalies.len()
    ));

    Ok(report)
}

/// Decide whether a catalog row becomes a record.
pub fn admit_row(
    row: CatalogRow,
    catalog: &str,
    photos_dir: &Path,
    records: &RecordMap,
    options: IngestOptions,
    reporter: &dyn Reporter,
) -> Result<RowOutcome> {
    let filename = row.img_name;

    if !is_plain_filename(&filename) {
        return Ok(RowOutcome::Rejected(Anomaly::UnsafeFilename {
            filename,
            catalog: catalog.to_string(),
        }));
    }

    if records.contains_key(&filename) {
        return Ok(RowOutcome::Rejected(Anomaly::DuplicateFilename {
            filename,
            catalog: catalog.to_string(),
        }));
    }

    if parse_flag(&row.deleted) == Some(true) {
        return Ok(RowOutcome::Rejected(Anomaly::DeletedRow {
            filename,
            catalog: catalog.to_string(),
        }));
    }

    let abort = options.validate_checksums && options.checksum_policy == ChecksumPolicy::Abort;

    let source_path = photos_dir.join(&filename);
    if !source_path.is_file() {
        if abort {
            return Err(IcloudsortError::MissingFile {
                filename,
                catalog: catalog.to_string(),
                dir: photos_dir.to_path_buf(),
            });
        }
        return Ok(RowOutcome::Rejected(Anomaly::MissingFile {
            filename,
            catalog: catalog.to_string(),
            dir: photos_dir.to_path_buf(),
        }));
    }

    if options.validate_checksums {
        reporter.debug(&format!("Validating checksum for {}...", filename));
        match digest_file(&source_path) {
            Ok(digests) if digests.matches(&row.file_checksum) => {}
            Ok(digests) => {
                if abort {
                    return Err(IcloudsortError::ChecksumMismatch {
                        filename,
                        catalog: catalog.to_string(),
                        expected: row.file_checksum,
                        actual: digests.sha1_base64,
                    });
                }
                return Ok(RowOutcome::Rejected(Anomaly::ChecksumMismatch {
                    filename,
                    catalog: catalog.to_string(),
                    expected: row.file_checksum,
                    actual: digests.sha1_base64,
                }));
            }
            Err(e) => {
                if abort {
                    return Err(IcloudsortError::Io(e));
                }
                return Ok(RowOutcome::Rejected(Anomaly::ChecksumUnreadable {
                    filename,
                    reason: e.to_string(),
                }));
            }
        }
    }

    Ok(RowOutcome::Accepted(AssetRecord::from_catalog(
        filename,
        source_path,
        catalog.to_string(),
        row.file_checksum,
        row.import_date,
        row.original_creation_date,
    )))
}

/// Totals for one shared catalog.
#[derive(Debug, Default)]
pub struct SharedReport {
    pub rows: usize,
    pub matched: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Mark records listed in a shared catalog file as shared.
pub fn correlate_shared(
    path: &Path,
    records: &mut RecordMap,
    reporter: &dyn Reporter,
) -> Result<SharedReport> {
    let name = catalog_name(path);
    reporter.info(&format!("Processing {}...", name));
    let file = fs::File::open(path)?;
    correlate_shared_rows(file, &name, records, reporter)
}

/// Mark records listed in shared catalog rows as shared. Never creates records.
pub fn correlate_shared_rows<R: Read>(
    reader: R,
    catalog: &str,
    records: &mut RecordMap,
    reporter: &dyn Reporter,
) -> Result<SharedReport> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    check_headers(&mut csv_reader, catalog)?;
    let mut report = SharedReport::default();

    for row in csv_reader.deserialize::<SharedRow>() {
        report.rows += 1;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                let anomaly = row_error(catalog, e)?;
                reporter.warn(&anomaly.to_string());
                report.anomalies.push(anomaly);
                continue;
            }
        };
        if !is_plain_filename(&row.img_name) {
            let anomaly = Anomaly::UnsafeFilename {
                filename: row.img_name,
                catalog: catalog.to_string(),
            };
            reporter.warn(&anomaly.to_string());
            report.anomalies.push(anomaly);
            continue;
        }
        match records.get_mut(&row.img_name) {
            Some(record) => {
                record.is_shared = true;
                record.contributed_by_me = parse_flag(&row.contributed_by_me);
                report.matched += 1;
            }
            None => {
                let anomaly = Anomaly::OrphanSharedRow {
                    filename: row.img_name,
                    catalog: catalog.to_string(),
                };
                reporter.warn(&anomaly.to_string());
                report.anomalies.push(anomaly);
            }
        }
    }

    reporter.info(&format!(
        "{}: {} shared rows, {} matched",
        catalog, report.rows, report.matched
    ));

    Ok(report)
}
