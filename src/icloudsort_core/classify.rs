use crate::icloudsort_core::record::{Bucket, RecordMap};
use crate::icloudsort_core::report::Reporter;
use std::path::PathBuf;

/// Which libraries to leave out of the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipPolicy {
    pub exclude_personal: bool,
    pub exclude_shared: bool,
}

impl SkipPolicy {
    pub fn excludes(&self, bucket: Bucket) -> bool {
        match bucket {
            Bucket::Personal => self.exclude_personal,
            Bucket::Shared => self.exclude_shared,
        }
    }
}

/// Mark excluded records as skipped and return the files that still need metadata.
pub fn classify(records: &mut RecordMap, policy: SkipPolicy, reporter: &dyn Reporter) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let mut skipped = 0;

    for record in records.values_mut() {
        if policy.excludes(record.bucket()) {
            record.skip = true;
            skipped += 1;
            reporter.debug(&format!(
                "Skipping {} ({} library excluded)",
                record.filename,
                record.bucket()
            ));
        } else {
            candidates.push(record.source_path.clone());
        }
    }

    reporter.info(&format!(
        "{} files selected for processing, {} excluded",
        candidates.len(),
        skipped
    ));

    candidates
}
