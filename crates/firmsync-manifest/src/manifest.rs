//! Manifest, origin and release descriptions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

use crate::error::ManifestError;
use crate::model::ModelSet;

/// A firmware release version identifier, e.g. `1_4_1`.
///
/// Versions are used as directory names in the cache, so they must be a
/// single, non-traversing path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Wrap a version string.
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// The version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    // Forward to `str` so width/alignment flags apply.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.0.as_str(), f)
    }
}

impl From<&str> for Version {
    fn from(version: &str) -> Self {
        Self::new(version)
    }
}

/// Base location that release archives are resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Base URL of the firmware distribution
    pub url: Url,
}

impl Origin {
    /// Create an origin from a base URL.
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Resolve `locator` relative to this origin.
    ///
    /// The base is treated as a directory even when it lacks a trailing
    /// slash.
    ///
    /// # Errors
    ///
    /// Returns the URL parse error if `locator` cannot be joined.
    pub fn resolve(&self, locator: &str) -> Result<Url, url::ParseError> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(locator)
    }
}

/// Model tags for one file inside a release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// Archive-relative path of the file
    pub path: String,

    /// Models the file applies to; empty means all models
    #[serde(default)]
    pub models: Vec<String>,
}

/// One versioned firmware package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release version
    pub version: Version,

    /// Hex MD5 digest of the whole archive stream
    #[serde(rename = "md5sum")]
    pub checksum: String,

    /// Models covered by this release
    pub models: ModelSet,

    /// Archive location relative to the origin
    pub tarball: String,

    /// Per-file model tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileSpec>,
}

impl Release {
    /// Resolve the archive URL for this release.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidLocator`] when the tarball name does
    /// not join onto the origin URL.
    pub fn url(&self, origin: &Origin) -> Result<Url, ManifestError> {
        origin
            .resolve(&self.tarball)
            .map_err(|source| ManifestError::InvalidLocator {
                version: self.version.to_string(),
                tarball: self.tarball.clone(),
                source,
            })
    }

    /// Check that the version and every model name is a safe path
    /// component.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidName`] for the first offending name.
    pub fn validate(&self) -> Result<(), ManifestError> {
        check_component("version", self.version.as_str())?;
        for model in &self.models {
            check_component("model", model)?;
        }
        Ok(())
    }

    /// Map of archive path to model tags, built from [`Release::files`].
    pub fn file_models(&self) -> HashMap<String, Vec<String>> {
        self.files
            .iter()
            .map(|file| (file.path.clone(), file.models.clone()))
            .collect()
    }
}

/// The ordered collection of releases published by a firmware origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Where release archives live
    pub origin: Origin,

    /// Releases, newest first by convention
    pub releases: Vec<Release>,
}

impl Manifest {
    /// Parse a manifest document.
    ///
    /// Release names are not checked here; see [`Release::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed JSON.
    pub fn from_slice(data: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Human-readable one-line-per-release summary.
    pub fn summary(&self) -> Vec<String> {
        self.releases
            .iter()
            .map(|release| {
                format!(
                    "{:<7}  md5: {}  models: {}",
                    release.version, release.checksum, release.models
                )
            })
            .collect()
    }
}

fn check_component(kind: &'static str, value: &str) -> Result<(), ManifestError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.contains('\0');
    if invalid {
        return Err(ManifestError::InvalidName {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}
