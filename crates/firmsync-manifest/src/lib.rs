//! Firmware release manifest model for firmsync
//!
//! This crate describes what a remote firmware distribution offers:
//!
//! - [`manifest`]: the [`Manifest`], its [`Origin`] and the ordered [`Release`]s
//! - [`model`]: [`ModelSet`] and the [`ModelFilter`] seam used for include,
//!   exclude and quota filtering
//! - [`pattern`]: glob-based [`PatternSet`] (models) and [`FilePattern`]
//!   (archive paths)
//! - [`error`]: error types
//!
//! # Example
//!
//! ```rust
//! use firmsync_manifest::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::from_slice(br#"{
//!     "origin": { "url": "https://downloads.example.com/firmware/" },
//!     "releases": [
//!         { "version": "1_4_1", "md5sum": "abc123", "models": ["D40", "D50", "D70"],
//!           "tarball": "firmware_1_4_1.tar.gz" }
//!     ]
//! }"#)?;
//!
//! let include = PatternSet::parse("D4*, D70")?;
//! let release = manifest.releases.first().ok_or("empty manifest")?;
//! assert_eq!(release.models.include(&include).to_string(), "D40,D70");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod manifest;
pub mod model;
pub mod pattern;
pub mod prelude;

pub use error::{ManifestError, PatternError};
pub use manifest::{FileSpec, Manifest, Origin, Release, Version};
pub use model::{ModelFilter, ModelLookup, ModelSet};
pub use pattern::{FilePattern, PatternSet, WILDCARD};
