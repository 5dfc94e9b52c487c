use crate::icloudsort_core::catalog::CSV_EXT;
use crate::icloudsort_core::error::Result;
use crate::icloudsort_core::record::{AssetRecord, RecordMap};
use crate::icloudsort_core::report::Reporter;
use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use walkdir::WalkDir;

/// Files found on disk that no catalog mentions.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub untracked: Vec<PathBuf>,
}

/// Add a fallback record for every loose file in `photos_dir` that no catalog mentions.
///
/// `catalogued` holds names of catalog rows that were rejected (deleted, bad checksum);
/// those files stay out even though they are on disk.
pub fn reconcile_untracked(
    photos_dir: &Path,
    records: &mut RecordMap,
    catalogued: &HashSet<String>,
    reporter: &dyn Reporter,
) -> Result<ReconcileReport> {
    reporter.info(&format!("Checking {} for untracked files...", photos_dir.display()));

    let mut report = ReconcileReport::default();

    for entry in WalkDir::new(photos_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().to_string();
        if filename.starts_with('.') || filename.ends_with(CSV_EXT) {
            continue;
        }
        if records.contains_key(&filename) || catalogued.contains(&filename) {
            continue;
        }

        let changed_at = change_time(&entry.metadata()?);
        reporter.warn(&format!(
            "File {} is not listed in any catalog, adding it as untracked",
            filename
        ));

        let path = entry.into_path();
        records.insert(
            filename.clone(),
            AssetRecord::untracked(filename, path.clone(), changed_at),
        );
        report.untracked.push(path);
    }

    reporter.info(&format!("Found {} untracked files", report.untracked.len()));
    Ok(report)
}

/// Status-change time of a file in UTC.
#[cfg(unix)]
fn change_time(metadata: &Metadata) -> OffsetDateTime {
    use std::os::unix::fs::MetadataExt;
    let nanos = metadata.ctime() as i128 * 1_000_000_000 + metadata.ctime_nsec() as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Creation time of a file in UTC, or modification time where creation time is unsupported.
#[cfg(not(unix))]
fn change_time(metadata: &Metadata) -> OffsetDateTime {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(OffsetDateTime::from)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icloudsort_core::record::{CatalogDate, RecordOrigin};
    use crate::icloudsort_core::report::MemoryReporter;
    use assert_fs::prelude::*;
    use time::UtcOffset;

    #[test]
    fn test_untracked_files_become_records() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        temp_dir.child("IMG_0001.HEIC").write_str("a").unwrap();
        temp_dir.child("IMG_0002.MOV").write_str("b").unwrap();
        temp_dir.child("Photo Details.csv").write_str("imgName\n").unwrap();
        temp_dir.child(".DS_Store").write_str("").unwrap();
        temp_dir.child("nested/IMG_0003.JPG").write_str("c").unwrap();
        temp_dir.child("IMG_0005.JPG").write_str("deleted").unwrap();

        let mut records = RecordMap::new();
        records.insert(
            "IMG_0001.HEIC".to_string(),
            AssetRecord::from_catalog(
                "IMG_0001.HEIC".to_string(),
                temp_dir.path().join("IMG_0001.HEIC"),
                "Photo Details.csv".to_string(),
                String::new(),
                String::new(),
                "date".to_string(),
            ),
        );

        let reporter = MemoryReporter::new();
        let catalogued: HashSet<String> = ["IMG_0005.JPG".to_string()].into_iter().collect();
        let report = reconcile_untracked(temp_dir.path(), &mut records, &catalogued, &reporter).unwrap();

        assert_eq!(report.untracked, vec![temp_dir.path().join("IMG_0002.MOV")]);
        assert_eq!(records.len(), 2);

        let added = &records["IMG_0002.MOV"];
        assert_eq!(added.origin, RecordOrigin::Untracked);
        assert!(!added.is_shared);
        match added.catalog_date {
            CatalogDate::Timestamp(ts) => assert_eq!(ts.offset(), UtcOffset::UTC),
            ref other => panic!("unexpected catalog date {:?}", other),
        }

        // The catalog record is untouched.
        assert!(matches!(records["IMG_0001.HEIC"].origin, RecordOrigin::Catalog { .. }));
    }
}
