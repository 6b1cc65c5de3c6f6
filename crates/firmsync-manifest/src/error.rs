//! Error types for manifest parsing and pattern compilation

use thiserror::Error;

/// Errors produced while reading a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The document is not valid manifest JSON
    #[error("Manifest parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A release's archive location cannot be resolved against the origin
    #[error("Unable to resolve archive {tarball:?} for release {version}: {source}")]
    InvalidLocator {
        /// Release version
        version: String,
        /// Archive name from the manifest
        tarball: String,
        /// Underlying URL error
        #[source]
        source: url::ParseError,
    },

    /// A version or model name cannot be used as a cache path component
    #[error("Invalid {kind} name {value:?}")]
    InvalidName {
        /// What was being named ("version" or "model")
        kind: &'static str,
        /// The offending value
        value: String,
    },
}

/// Errors produced while compiling glob patterns
#[derive(Error, Debug)]
pub enum PatternError {
    /// The glob could not be compiled
    #[error("Invalid glob pattern {pattern:?}: {source}")]
    Invalid {
        /// The pattern text
        pattern: String,
        /// Underlying glob error
        #[source]
        source: glob::PatternError,
    },
}
