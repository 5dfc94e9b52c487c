use std::path::PathBuf;
use thiserror::Error;

/// Run-aborting failures. Anything that only affects one record is an [`Anomaly`] instead.
#[derive(Error, Debug)]
pub enum IcloudsortError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walker error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Failed to read catalog {catalog}: {source}")]
    Catalog {
        catalog: String,
        #[source]
        source: csv::Error,
    },

    #[error("Catalog {catalog} has no '{column}' column")]
    MissingColumn { catalog: String, column: String },

    // Source layout errors
    #[error("Catalog directory not found at {0}, are you running from the unzipped root?")]
    SourceNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    // Metadata errors
    #[error("Exiftool error: {0}")]
    Exiftool(String),

    #[error("Date parsing error: {0}")]
    InvalidDateFormat(String),

    #[error("Invalid output date pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Creation date for {0} is already resolved")]
    AlreadyResolved(String),

    // Checksum errors (only raised under ChecksumPolicy::Abort)
    #[error("Checksum mismatch for {filename} in {catalog}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        catalog: String,
        expected: String,
        actual: String,
    },

    #[error("File {filename} listed in {catalog} not found in {dir}")]
    MissingFile {
        filename: String,
        catalog: String,
        dir: PathBuf,
    },
}

/// A recoverable, record-scoped condition. Reported and aggregated, never run-aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    DuplicateFilename { filename: String, catalog: String },
    DeletedRow { filename: String, catalog: String },
    UnsafeFilename { filename: String, catalog: String },
    MalformedRow { catalog: String, line: u64, reason: String },
    MissingFile { filename: String, catalog: String, dir: PathBuf },
    ChecksumMismatch {
        filename: String,
        catalog: String,
        expected: String,
        actual: String,
    },
    ChecksumUnreadable { filename: String, reason: String },
    OrphanSharedRow { filename: String, catalog: String },
    UnresolvedDate { filename: String, reason: String },
    DestinationExists { filename: String, destination: PathBuf },
    CopyFailed {
        filename: String,
        destination: PathBuf,
        reason: String,
    },
}

impl Anomaly {
    /// The asset this anomaly is about. Rows that could not be read have none.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Anomaly::MalformedRow { .. } => None,
            Anomaly::DuplicateFilename { filename, .. }
            | Anomaly::DeletedRow { filename, .. }
            | Anomaly::UnsafeFilename { filename, .. }
            | Anomaly::MissingFile { filename, .. }
            | Anomaly::ChecksumMismatch { filename, .. }
            | Anomaly::ChecksumUnreadable { filename, .. }
            | Anomaly::OrphanSharedRow { filename, .. }
            | Anomaly::UnresolvedDate { filename, .. }
            | Anomaly::DestinationExists { filename, .. }
            | Anomaly::CopyFailed { filename, .. } => Some(filename),
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::DuplicateFilename { filename, catalog } => {
                write!(f, "Duplicate filename {} found in {}, skipping", filename, catalog)
            }
            Anomaly::DeletedRow { filename, catalog } => {
                write!(f, "File {} is marked as deleted in {}, skipping", filename, catalog)
            }
            Anomaly::UnsafeFilename { filename, catalog } => write!(
                f,
                "Filename '{}' in {} is not a plain file name, skipping",
                filename, catalog
            ),
            Anomaly::MalformedRow {
                catalog,
                line,
                reason,
            } => write!(f, "Malformed row at line {} of {}: {}, skipping", line, catalog, reason),
            Anomaly::MissingFile {
                filename,
                catalog,
                dir,
            } => write!(
                f,
                "File {} listed in {} not found in {}, skipping",
                filename,
                catalog,
                dir.display()
            ),
            Anomaly::ChecksumMismatch {
                filename,
                catalog,
                expected,
                actual,
            } => write!(
                f,
                "Checksum mismatch for {} in {}: expected {}, got {}, skipping",
                filename, catalog, expected, actual
            ),
            Anomaly::ChecksumUnreadable { filename, reason } => {
                write!(f, "Could not checksum {}: {}, skipping", filename, reason)
            }
            Anomaly::OrphanSharedRow { filename, catalog } => write!(
                f,
                "Shared library entry {} in {} has no matching photo, ignoring",
                filename, catalog
            ),
            Anomaly::UnresolvedDate { filename, reason } => {
                write!(f, "Could not determine creation date for {}: {}", filename, reason)
            }
            Anomaly::DestinationExists {
                filename,
                destination,
            } => write!(
                f,
                "Destination {} already exists for {}, skipping (use --overwrite to replace)",
                destination.display(),
                filename
            ),
            Anomaly::CopyFailed {
                filename,
                destination,
                reason,
            } => write!(
                f,
                "Failed to copy {} to {}: {}",
                filename,
                destination.display(),
                reason
            ),
        }
    }
}

/// Result type for icloudsort operations.
pub type Result<T> = std::result::Result<T, IcloudsortError>;
