//! Error types for the firmsync CLI

use firmsync_engine::RetryError;
use std::path::PathBuf;
use thiserror::Error;

use crate::fetch::FetchError;

/// Startup failures that map to distinct exit codes
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Unable to read configuration file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid manifest location: {0}")]
    ManifestLocation(#[source] FetchError),

    #[error("Unable to retrieve the firmware manifest")]
    ManifestUnavailable(#[source] RetryError<FetchError>),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ManifestUnavailable(_) => 2,
            CliError::ConfigRead { .. }
            | CliError::ConfigParse { .. }
            | CliError::ManifestLocation(_) => 1,
        }
    }
}

/// Exit status for any error surfaced by `main`.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    error.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}
