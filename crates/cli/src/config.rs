//! Configuration loading and layering
//!
//! Settings are resolved in order: built-in defaults, then the JSON
//! configuration file, then environment variables and command-line flags
//! (merged by clap, flags win).

use clap::Args;
use clap::builder::BoolishValueParser;
use firmsync_engine::config::{DEFAULT_CACHE_DIR, DEFAULT_FIRMWARE_DIR};
use firmsync_engine::retry::{DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY};
use firmsync_engine::{Filters, RetryPolicy, SyncConfig};
use firmsync_manifest::{FilePattern, PatternError, PatternSet};
use serde::{Deserialize, Deserializer, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::CliError;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/firmsync/config.json";

/// Manifest published by the firmware vendor.
pub const DEFAULT_MANIFEST: &str =
    "https://downloads.digium.com/pub/telephony/res_digium_phone/firmware/dpma-firmware.json";

/// Effective configuration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Manifest URL or local path
    pub manifest: String,
    #[serde(alias = "firmwaredir")]
    pub firmware_dir: PathBuf,
    #[serde(alias = "cachedir")]
    pub cache_dir: PathBuf,
    #[serde(deserialize_with = "include_filters")]
    pub include: Filters,
    pub exclude: Filters,
    pub flatten: bool,
    /// Versions to keep per model; 0 keeps every version
    pub latest: u32,
    /// Manifest retrieval attempts
    pub attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let sync = SyncConfig::default();
        Self {
            manifest: DEFAULT_MANIFEST.to_string(),
            firmware_dir: PathBuf::from(DEFAULT_FIRMWARE_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            include: sync.include,
            exclude: sync.exclude,
            flatten: sync.flatten,
            latest: sync.latest,
            attempts: DEFAULT_ATTEMPTS,
            retry_delay_secs: DEFAULT_BASE_DELAY.as_secs(),
        }
    }
}

/// Include rules as written in the file. Absent fields keep the default
/// include rules, not the empty ones.
#[derive(Deserialize)]
#[serde(default)]
struct IncludeFilters {
    models: PatternSet,
    files: FilePattern,
}

impl Default for IncludeFilters {
    fn default() -> Self {
        let Filters { models, files } = SyncConfig::default().include;
        Self { models, files }
    }
}

fn include_filters<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Filters, D::Error> {
    let IncludeFilters { models, files } = IncludeFilters::deserialize(deserializer)?;
    Ok(Filters { models, files })
}

fn parse_models(list: &str) -> Result<PatternSet, PatternError> {
    PatternSet::parse(list)
}

fn parse_files(pattern: &str) -> Result<FilePattern, PatternError> {
    FilePattern::parse(pattern)
}

/// Settings that environment variables and flags can override.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// URL or path of the firmware manifest
    #[arg(long = "url", env = "MANIFEST", value_name = "URL")]
    pub manifest: Option<String>,

    /// Directory in which to install firmware
    #[arg(long = "dir", env = "FIRMWARE_DIR", value_name = "DIR")]
    pub firmware_dir: Option<PathBuf>,

    /// Directory holding cache records
    #[arg(long, env = "CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Models to include, comma-separated values or globs
    #[arg(long = "inc", env = "INCLUDE_MODELS", value_name = "MODELS", value_parser = parse_models)]
    pub include_models: Option<PatternSet>,

    /// Files to include, value or glob
    #[arg(long = "incfiles", env = "INCLUDE_FILES", value_name = "GLOB", value_parser = parse_files)]
    pub include_files: Option<FilePattern>,

    /// Models to exclude, comma-separated values or globs
    #[arg(long = "exc", env = "EXCLUDE_MODELS", value_name = "MODELS", value_parser = parse_models)]
    pub exclude_models: Option<PatternSet>,

    /// Files to exclude, value or glob
    #[arg(long = "excfiles", env = "EXCLUDE_FILES", value_name = "GLOB", value_parser = parse_files)]
    pub exclude_files: Option<FilePattern>,

    /// Install files by name into a single directory
    #[arg(
        long,
        env = "FLATTEN",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub flatten: Option<bool>,

    /// Versions to keep per model (0 keeps every version)
    #[arg(long, env = "LATEST", value_name = "N")]
    pub latest: Option<u32>,

    /// Manifest retrieval attempts before giving up
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub attempts: Option<u32>,

    /// Base delay in seconds between manifest retrieval attempts
    #[arg(long, value_name = "SECS")]
    pub retry_delay: Option<u64>,
}

impl Config {
    /// Load the configuration file.
    ///
    /// With no explicit path, a missing [`DEFAULT_CONFIG_PATH`] yields the
    /// defaults. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(err) if !explicit && err.kind() == io::ErrorKind::NotFound => {
                info!("No configuration file found. Using defaults.");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CliError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = serde_json::from_slice(&data).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides, returning the names of the settings that changed.
    pub fn apply(&mut self, overrides: &Overrides) -> Vec<&'static str> {
        let mut applied = Vec::new();
        let o = overrides;
        overlay(&mut applied, "manifest", o.manifest.as_ref(), &mut self.manifest);
        overlay(&mut applied, "firmware_dir", o.firmware_dir.as_ref(), &mut self.firmware_dir);
        overlay(&mut applied, "cache_dir", o.cache_dir.as_ref(), &mut self.cache_dir);
        overlay(&mut applied, "include.models", o.include_models.as_ref(), &mut self.include.models);
        overlay(&mut applied, "include.files", o.include_files.as_ref(), &mut self.include.files);
        overlay(&mut applied, "exclude.models", o.exclude_models.as_ref(), &mut self.exclude.models);
        overlay(&mut applied, "exclude.files", o.exclude_files.as_ref(), &mut self.exclude.files);
        overlay(&mut applied, "flatten", o.flatten.as_ref(), &mut self.flatten);
        overlay(&mut applied, "latest", o.latest.as_ref(), &mut self.latest);
        overlay(&mut applied, "attempts", o.attempts.as_ref(), &mut self.attempts);
        overlay(&mut applied, "retry_delay_secs", o.retry_delay.as_ref(), &mut self.retry_delay_secs);
        applied
    }

    /// Settings for the synchronizer.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            firmware_dir: self.firmware_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            flatten: self.flatten,
            latest: self.latest,
        }
    }

    /// Retry policy for manifest retrieval. At least one attempt is made.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.attempts.max(1),
            Duration::from_secs(self.retry_delay_secs),
        )
    }

    /// Log the effective settings.
    pub fn log_effective(&self) {
        info!("Manifest URL:   {}", self.manifest);
        info!("FirmwareDir:    {}", self.firmware_dir.display());
        info!("CacheDir:       {}", self.cache_dir.display());
        info!("Include Models: {}", self.include.models);
        info!("Exclude Models: {}", self.exclude.models);
        info!("Include Files:  {}", self.include.files);
        info!("Exclude Files:  {}", self.exclude.files);
        info!("Flatten:        {}", self.flatten);
        info!("Latest:         {}", self.latest);
    }
}

fn overlay<T: Clone>(
    applied: &mut Vec<&'static str>,
    name: &'static str,
    value: Option<&T>,
    target: &mut T,
) {
    if let Some(value) = value {
        target.clone_from(value);
        applied.push(name);
    }
}

/// Load the configuration file and apply `overrides` on top.
pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Result<Config, CliError> {
    let mut config = Config::load(path)?;
    let applied = config.apply(overrides);
    if applied.is_empty() {
        info!("No configuration overrides from the environment or command line.");
    } else {
        info!("Overriding configuration: {}", applied.join(", "));
    }
    Ok(config)
}
