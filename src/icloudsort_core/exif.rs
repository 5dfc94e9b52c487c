use crate::icloudsort_core::error::{IcloudsortError, Result};
use crate::icloudsort_core::report::progress_bar;
use exiftool::ExifTool;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const TAG_SUBSEC_DATE_TIME_ORIGINAL: &str = "SubSecDateTimeOriginal";
pub const TAG_DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";
pub const TAG_OFFSET_TIME_ORIGINAL: &str = "OffsetTimeOriginal";
pub const TAG_OFFSET_TIME: &str = "OffsetTime";
pub const TAG_CREATION_DATE: &str = "CreationDate";
pub const TAG_CREATE_DATE: &str = "CreateDate";

/// Every tag the resolver may look at.
pub const REQUESTED_TAGS: &[&str] = &[
    TAG_SUBSEC_DATE_TIME_ORIGINAL,
    TAG_DATE_TIME_ORIGINAL,
    TAG_OFFSET_TIME_ORIGINAL,
    TAG_OFFSET_TIME,
    TAG_CREATION_DATE,
    TAG_CREATE_DATE,
];

const SOURCE_FILE_KEY: &str = "SourceFile";

/// Namespace-qualified tags (`EXIF:DateTimeOriginal`) in the order the extractor produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    entries: Vec<(String, String)>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Value of the first key whose last `:` segment is `tag`. Earlier keys shadow later ones.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.rsplit(':').next() == Some(tag))
            .map(|(_, value)| value.as_str())
    }

    /// Build from one exiftool JSON object, keeping its key order.
    pub fn from_json(object: &serde_json::Map<String, Value>) -> Self {
        let mut map = TagMap::new();
        for (key, value) in object {
            if key == SOURCE_FILE_KEY {
                continue;
            }
            if let Some(text) = value_to_string(value) {
                map.push(key.clone(), text);
            }
        }
        map
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TagMap::new();
        for (k, v) in iter {
            map.push(k, v);
        }
        map
    }
}

/// Helper to render a tag value as text (dates are strings, but exiftool emits bare numbers too).
fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads tags for a batch of files. Results are keyed by filename.
pub trait TagExtractor {
    fn extract(&mut self, paths: &[PathBuf]) -> Result<HashMap<String, TagMap>>;
}

/// Reads the whole candidate list with one exiftool batch call. The process exits when this is dropped.
pub struct ExifToolExtractor {
    exiftool: ExifTool,
}

impl ExifToolExtractor {
    pub fn new() -> Result<Self> {
        let exiftool = ExifTool::new().map_err(|e| IcloudsortError::Exiftool(e.to_string()))?;
        Ok(Self { exiftool })
    }

    fn args() -> Vec<String> {
        let mut args = vec!["-G".to_string()];
        args.extend(REQUESTED_TAGS.iter().map(|tag| format!("-{}", tag)));
        args
    }
}

impl ExifToolExtractor {
    /// One file at a time, for when exiftool rejects the batch as a whole.
    fn extract_each(&mut self, paths: &[PathBuf], args: &[&str]) -> HashMap<String, TagMap> {
        let bar = progress_bar(paths.len(), "Reading metadata");
        let mut tags = HashMap::new();
        for path in paths {
            // Unreadable files fall back to the catalog date
            match self.exiftool.read_metadata::<Value>(path, args) {
                Ok(Value::Object(object)) => {
                    tags.insert(filename_of(path), TagMap::from_json(&object));
                }
                Ok(other) => {
                    log::warn!("Unexpected exiftool output for {}: {}", path.display(), other);
                }
                Err(e) => {
                    log::warn!("Failed to read metadata from {}: {}", path.display(), e);
                }
            }
            bar.inc(1);
        }
        bar.finish_with_message("Metadata read");
        tags
    }
}

impl TagExtractor for ExifToolExtractor {
    fn extract(&mut self, paths: &[PathBuf]) -> Result<HashMap<String, TagMap>> {
        if paths.is_empty() {
            return Ok(HashMap::new());
        }

        let args = Self::args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        match self.exiftool.json_batch(paths.iter(), &arg_refs) {
            Ok(results) => Ok(tags_from_batch(results)),
            Err(e) => {
                log::warn!("Batch metadata read failed ({}), reading files one by one", e);
                Ok(self.extract_each(paths, &arg_refs))
            }
        }
    }
}

/// Key each object of an exiftool JSON batch by the filename in its `SourceFile`.
pub fn tags_from_batch(results: Vec<Value>) -> HashMap<String, TagMap> {
    let mut tags = HashMap::new();
    for result in results {
        let Value::Object(object) = result else {
            log::warn!("Unexpected exiftool output: {}", result);
            continue;
        };
        let Some(source) = object.get(SOURCE_FILE_KEY).and_then(Value::as_str) else {
            log::warn!("Exiftool result without {} ignored", SOURCE_FILE_KEY);
            continue;
        };
        tags.insert(filename_of(Path::new(source)), TagMap::from_json(&object));
    }
    tags
}

/// An extractor that never finds any tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTags;

impl TagExtractor for NoTags {
    fn extract(&mut self, _paths: &[PathBuf]) -> Result<HashMap<String, TagMap>> {
        Ok(HashMap::new())
    }
}

/// Fixed tag maps keyed by filename, for callers that already know the metadata.
#[derive(Debug, Default, Clone)]
pub struct StaticTags {
    pub tags: HashMap<String, TagMap>,
}

impl TagExtractor for StaticTags {
    fn extract(&mut self, paths: &[PathBuf]) -> Result<HashMap<String, TagMap>> {
        Ok(paths
            .iter()
            .map(|p| filename_of(p))
            .filter_map(|name| self.tags.get(&name).map(|t| (name, t.clone())))
            .collect())
    }
}

pub fn filename_of(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Check if exiftool is available on the system.
pub fn exiftool_available() -> bool {
    std::process::Command::new("exiftool")
        .arg("-ver")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
