//! Convenience re-exports for common manifest types

pub use crate::error::{ManifestError, PatternError};
pub use crate::manifest::{FileSpec, Manifest, Origin, Release, Version};
pub use crate::model::{ModelFilter, ModelLookup, ModelSet};
pub use crate::pattern::{FilePattern, PatternSet, WILDCARD};
