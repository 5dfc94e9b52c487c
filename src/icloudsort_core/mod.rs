pub mod catalog;
pub mod checksum;
pub mod classify;
pub mod cli;
pub mod error;
pub mod exif;
pub mod human_date;
pub mod pipeline;
pub mod planner;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod resolve;

pub use cli::Cli;
pub use error::{Anomaly, IcloudsortError};
pub use exif::{ExifToolExtractor, NoTags, StaticTags, TagExtractor, TagMap};
pub use pipeline::{RunOptions, RunSummary, run};
pub use planner::{DirPattern, FileCopier, FsCopier};
pub use record::{AssetRecord, Bucket, CatalogDate, RecordMap};
pub use report::{LogReporter, MemoryReporter, Reporter};
pub use resolve::{DateSource, Resolution, resolve};
