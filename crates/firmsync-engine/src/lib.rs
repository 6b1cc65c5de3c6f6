//! Firmware release synchronization engine
//!
//! This crate decides, release by release, which firmware files a host is
//! missing and installs them without ever leaving a half-installed release
//! or a lying cache record behind:
//!
//! - [`acquisition`]: per-model version quota ([`AcquisitionMap`])
//! - [`cache`]: cache records ([`CacheStore`]) and their classification
//!   ([`CacheStatus`])
//! - [`pipeline`]: the [`Synchronizer`] that filters, downloads, verifies,
//!   installs and records each release
//! - [`retry`]: bounded retry with doubling backoff ([`RetryPolicy`])
//! - [`config`]: synchronizer settings
//! - [`error`]: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use firmsync_archive::FileArchiveSource;
//! use firmsync_engine::prelude::*;
//! use firmsync_manifest::Manifest;
//! use firmsync_signal::Signal;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::from_slice(&std::fs::read("manifest.json")?)?;
//! let shutdown = Signal::new();
//!
//! let mut sync = Synchronizer::new(SyncConfig::default(), FileArchiveSource::new());
//! let report = sync.run(&shutdown, &manifest);
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod acquisition;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod retry;

pub use acquisition::AcquisitionMap;
pub use cache::{CacheStatus, CacheStore};
pub use config::{Filters, SyncConfig};
pub use error::{RetryError, SyncError};
pub use pipeline::{
    DOWNLOAD_SUFFIX, InstallReport, ReleaseOutcome, RunReport, Synchronizer, should_download,
};
pub use retry::{RetryDecision, RetryPolicy, doubling_backoff};
