//! Synchronizer settings

use firmsync_manifest::{FilePattern, PatternSet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default firmware installation directory.
pub const DEFAULT_FIRMWARE_DIR: &str = "/var/lib/asterisk/digium_phones/firmware";

/// Default cache record directory.
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/firmsync";

/// Default include pattern for archive files.
pub const DEFAULT_INCLUDE_FILES: &str = "*.eff";

/// Model and file rules applied on one side (include or exclude).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    /// Model name patterns
    pub models: PatternSet,
    /// Archive path pattern; unset places no restriction
    pub files: FilePattern,
}

/// Settings for a [`Synchronizer`](crate::pipeline::Synchronizer).
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Where firmware files are installed
    pub firmware_dir: PathBuf,
    /// Where cache records live
    pub cache_dir: PathBuf,
    /// Selection rules
    pub include: Filters,
    /// Rejection rules
    pub exclude: Filters,
    /// Install entries by file name instead of archive path
    pub flatten: bool,
    /// Versions to keep per model; 0 keeps every version
    pub latest: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            firmware_dir: PathBuf::from(DEFAULT_FIRMWARE_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            include: Filters {
                models: PatternSet::wildcard(),
                files: FilePattern::parse(DEFAULT_INCLUDE_FILES).unwrap_or_default(),
            },
            exclude: Filters::default(),
            flatten: false,
            latest: 0,
        }
    }
}
