use crate::icloudsort_core::error::{IcloudsortError, Result};
use crate::icloudsort_core::resolve::DateSource;
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::OffsetDateTime;

/// Every record of a run, keyed by filename.
pub type RecordMap = BTreeMap<String, AssetRecord>;

/// Which library an asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Personal,
    Shared,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Personal => "personal",
            Bucket::Shared => "shared",
        }
    }

    pub fn folder_name(&self) -> &'static str {
        match self {
            Bucket::Personal => "Personal",
            Bucket::Shared => "Shared",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The date the catalog (or the filesystem, for untracked files) gives for an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogDate {
    /// Human-readable string from the `originalCreationDate` column.
    Text(String),
    /// Change time of a file that no catalog mentions.
    Timestamp(OffsetDateTime),
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOrigin {
    Catalog {
        catalog: String,
        checksum: String,
        import_date: String,
    },
    Untracked,
}

/// A creation date that has been settled for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: OffsetDateTime,
    pub source: DateSource,
}

/// One physical photo or video and everything known about it.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub filename: String,
    pub source_path: PathBuf,
    pub origin: RecordOrigin,
    pub is_shared: bool,
    pub contributed_by_me: Option<bool>,
    pub catalog_date: CatalogDate,
    pub skip: bool,
    resolved: Option<ResolvedDate>,
}

impl AssetRecord {
    pub fn from_catalog(
        filename: String,
        source_path: PathBuf,
        catalog: String,
        checksum: String,
        import_date: String,
        creation_date: String,
    ) -> Self {
        Self {
            filename,
            source_path,
            origin: RecordOrigin::Catalog {
                catalog,
                checksum,
                import_date,
            },
            is_shared: false,
            contributed_by_me: None,
            catalog_date: CatalogDate::Text(creation_date),
            skip: false,
            resolved: None,
        }
    }

    pub fn untracked(filename: String, source_path: PathBuf, changed_at: OffsetDateTime) -> Self {
        Self {
            filename,
            source_path,
            origin: RecordOrigin::Untracked,
            is_shared: false,
            contributed_by_me: None,
            catalog_date: CatalogDate::Timestamp(changed_at),
            skip: false,
            resolved: None,
        }
    }

    pub fn bucket(&self) -> Bucket {
        if self.is_shared {
            Bucket::Shared
        } else {
            Bucket::Personal
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedDate> {
        self.resolved.as_ref()
    }

    /// Store the creation date. A second call fails and leaves the first value in place.
    pub fn set_resolved(&mut self, resolved: ResolvedDate) -> Result<()> {
        if self.resolved.is_some() {
            return Err(IcloudsortError::AlreadyResolved(self.filename.clone()));
        }
        self.resolved = Some(resolved);
        Ok(())
    }
}
