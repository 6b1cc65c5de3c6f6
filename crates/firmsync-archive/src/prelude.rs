//! Convenience re-exports for common archive types

pub use crate::digest::DigestReader;
pub use crate::error::ArchiveError;
pub use crate::file::FileArchiveSource;
pub use crate::header::EntryHeader;
pub use crate::stream::{ArchiveSource, ArchiveStream, CloseHandle, EntryVisitor};
pub use crate::tarball::{ClosableReader, CloseFlag, TarballStream, is_contained};
