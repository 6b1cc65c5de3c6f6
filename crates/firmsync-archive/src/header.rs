//! Archive entry metadata

use std::time::SystemTime;

/// Metadata for one file in a release archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Final path component, used when flattening
    pub name: String,

    /// Archive-relative path
    pub path: String,

    /// Models the file applies to; empty means all models
    pub models: Vec<String>,

    /// Modification time recorded in the archive
    pub modified: SystemTime,

    /// Size in bytes
    pub size: u64,
}

impl EntryHeader {
    /// Whether this entry applies to every model.
    pub fn applies_to_all(&self) -> bool {
        self.models.is_empty()
    }
}
