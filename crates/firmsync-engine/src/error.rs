//! Error types for release synchronization

use firmsync_archive::ArchiveError;
use firmsync_manifest::ManifestError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a release is abandoned.
///
/// None of these cross a release boundary: the synchronizer logs them,
/// cleans up, and moves on to the next release.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The release names a version or model that is not a safe path
    #[error("Invalid release: {0}")]
    InvalidRelease(#[from] ManifestError),

    /// The release archive could not be opened
    #[error("Unable to open archive: {0}")]
    Open(#[from] ArchiveError),

    /// Reading the archive stream failed
    #[error("Archive stream failed: {0}")]
    Stream(#[source] io::Error),

    /// The archive stream was closed by a shutdown request
    #[error("Download interrupted by shutdown: {0}")]
    Interrupted(#[source] io::Error),

    /// A download file could not be created
    #[error("Unable to prepare {}: {source}", path.display())]
    Prepare {
        /// Download path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Copying entry bytes to a download file failed
    #[error("Unable to write {}: {source}", path.display())]
    Copy {
        /// Download path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// The archive digest does not match the manifest
    #[error("Download doesn't match manifest (download md5: {actual}, manifest md5: {expected})")]
    ChecksumMismatch {
        /// Checksum declared by the manifest
        expected: String,
        /// Checksum of the bytes actually read
        actual: String,
    },

    /// One or more verified files could not be moved into place
    #[error("Installation failed for {} file(s)", failed.len())]
    Install {
        /// Final paths that were not installed
        failed: Vec<PathBuf>,
    },

    /// A cache record could not be written
    #[error("Failed to write cache record for {model}: {source}")]
    CacheWrite {
        /// Model whose record failed
        model: String,
        /// Underlying failure
        #[source]
        source: io::Error,
    },
}

/// Errors returned by [`RetryPolicy::run`](crate::retry::RetryPolicy::run).
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// Every attempt failed
    #[error("{action} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Name of the retried action
        action: String,
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        #[source]
        last: E,
    },
}
