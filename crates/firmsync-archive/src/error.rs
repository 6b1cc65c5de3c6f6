//! Error types for opening archives

use firmsync_manifest::ManifestError;
use thiserror::Error;

/// Errors that can occur while opening a release archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The release's archive location could not be resolved
    #[error("Unable to resolve archive location: {0}")]
    Locator(#[from] ManifestError),

    /// No transport handles the archive's URL scheme
    #[error("Unsupported archive location: {0}")]
    Unsupported(url::Url),

    /// The archive could not be opened
    #[error("Unable to open archive {location}: {source}")]
    Open {
        /// Where the archive was expected
        location: String,
        /// Underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ArchiveError {
    /// Create an open error.
    pub fn open(
        location: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Open {
            location: location.into(),
            source: source.into(),
        }
    }
}
