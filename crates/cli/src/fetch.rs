//! Manifest retrieval over HTTP(S) or from the local filesystem

use firmsync_manifest::{Manifest, ManifestError};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// How long to wait for a connection before an attempt counts as failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why one manifest retrieval attempt failed
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{location:?} is neither a URL nor a usable path")]
    Location { location: String },

    #[error("Unsupported manifest scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: Url,
    },

    #[error("Unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ManifestError),
}

/// Build the HTTP client shared by manifest and archive downloads.
pub fn http_client() -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("firmsync/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Interpret a configured manifest location.
///
/// Absolute URLs are used as given. Anything else is taken as a local path,
/// made absolute against the working directory.
pub fn manifest_location(location: &str) -> Result<Url, FetchError> {
    match Url::parse(location) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = std::path::absolute(Path::new(location)).map_err(|source| {
                FetchError::Read {
                    path: PathBuf::from(location),
                    source,
                }
            })?;
            Url::from_file_path(&path).map_err(|()| FetchError::Location {
                location: location.to_string(),
            })
        }
        Err(err) => {
            debug!("Manifest location {location:?} rejected: {err}");
            Err(FetchError::Location {
                location: location.to_string(),
            })
        }
    }
}

/// Downloads and parses manifests.
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    client: reqwest::Client,
}

impl ManifestFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Retrieve and parse the manifest at `url`. Non-2xx responses fail.
    pub async fn fetch(&self, url: &Url) -> Result<Manifest, FetchError> {
        let body = match url.scheme() {
            "http" | "https" => {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        status,
                        url: url.clone(),
                    });
                }
                response.bytes().await?.to_vec()
            }
            "file" => {
                let path = url.to_file_path().map_err(|()| FetchError::Location {
                    location: url.to_string(),
                })?;
                tokio::fs::read(&path)
                    .await
                    .map_err(|source| FetchError::Read { path, source })?
            }
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        };

        debug!("Fetched {} byte manifest from {url}", body.len());
        Ok(Manifest::from_slice(&body)?)
    }
}
