//! Installed-release cache records and cache status classification
//!
//! A cache record is a small text file at `<root>/<version>/<model>.md5`
//! holding the checksum of the last verified install of that release for
//! that model.

use firmsync_manifest::{ModelSet, Version};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::trace;

/// File extension of cache records.
pub const RECORD_EXTENSION: &str = "md5";

/// Unix permissions of cache records: readable by everyone.
pub const RECORD_MODE: u32 = 0o644;

/// On-disk store of cache records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until a
    /// record is written.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for `(version, model)`.
    pub fn record_path(&self, version: &Version, model: &str) -> PathBuf {
        self.root
            .join(version.as_str())
            .join(format!("{model}.{RECORD_EXTENSION}"))
    }

    /// Read the checksum recorded for `(version, model)`.
    ///
    /// # Errors
    ///
    /// Returns the read error; [`io::ErrorKind::NotFound`] means no record.
    pub fn read(&self, version: &Version, model: &str) -> io::Result<String> {
        fs::read_to_string(self.record_path(version, model))
    }

    /// Record `checksum` for `(version, model)`.
    ///
    /// The record is written to a temporary file in the same directory and
    /// renamed over the old one, so readers never see a partial record.
    ///
    /// # Errors
    ///
    /// Returns the error from creating the directory, writing or renaming.
    pub fn write(&self, version: &Version, model: &str, checksum: &str) -> io::Result<()> {
        let path = self.record_path(version, model);
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::other("cache record has no parent directory"))?;
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(checksum.as_bytes())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(RECORD_MODE))?;
        }
        temp.persist(&path).map_err(|err| err.error)?;

        trace!("Wrote cache record {}", path.display());
        Ok(())
    }
}

/// Cache state of a set of models for one release.
///
/// Every classified model lands in exactly one bucket; each bucket keeps
/// the input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatus {
    /// Record exists but could not be read
    pub failed: ModelSet,
    /// No record
    pub missing: ModelSet,
    /// Record holds a different checksum
    pub revised: ModelSet,
    /// Record matches
    pub current: ModelSet,
    checksum: String,
}

impl CacheStatus {
    /// Classify `models` of `version` against `checksum`.
    ///
    /// Read failures are classified, never returned.
    pub fn classify(store: &CacheStore, checksum: &str, version: &Version, models: &ModelSet) -> Self {
        let mut status = CacheStatus {
            checksum: checksum.to_string(),
            ..CacheStatus::default()
        };

        for model in models.iter() {
            let bucket = match store.read(version, model) {
                Ok(cached) if cached == checksum => &mut status.current,
                Ok(_) => &mut status.revised,
                Err(err) if err.kind() == io::ErrorKind::NotFound => &mut status.missing,
                Err(err) => {
                    trace!("Cache record for {model} unreadable: {err}");
                    &mut status.failed
                }
            };
            bucket.push(model);
        }

        status
    }

    /// Checksum the models were compared against.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Number of up-to-date models.
    pub fn good(&self) -> usize {
        self.current.len()
    }

    /// Number of models that need work.
    pub fn bad(&self) -> usize {
        self.failed.len() + self.missing.len() + self.revised.len()
    }

    /// Models to download: revised, then missing, then failed.
    pub fn needed(&self) -> ModelSet {
        self.revised
            .iter()
            .chain(self.missing.iter())
            .chain(self.failed.iter())
            .collect()
    }

    /// One line per non-empty bucket, e.g. `[D40,D50]: Missing      md5: ...`.
    pub fn summary(&self) -> Vec<String> {
        [
            ("Up to date", &self.current),
            ("Out of date", &self.revised),
            ("Missing", &self.missing),
            ("Cache error", &self.failed),
        ]
        .into_iter()
        .filter(|(_, models)| !models.is_empty())
        .map(|(kind, models)| format!("[{models}]: {kind:<11}  md5: {}", self.checksum))
        .collect()
    }
}
