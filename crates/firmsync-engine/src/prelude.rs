//! Convenience re-exports for common engine types

pub use crate::acquisition::AcquisitionMap;
pub use crate::cache::{CacheStatus, CacheStore};
pub use crate::config::{Filters, SyncConfig};
pub use crate::error::{RetryError, SyncError};
pub use crate::pipeline::{InstallReport, ReleaseOutcome, RunReport, Synchronizer};
pub use crate::retry::{RetryDecision, RetryPolicy};
