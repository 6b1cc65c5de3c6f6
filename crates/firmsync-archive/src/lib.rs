//! Firmware archive entry streams
//!
//! A release archive is consumed exactly once, front to back. The engine sees
//! it through two traits:
//!
//! - [`ArchiveSource`] opens the archive of a release at an origin
//! - [`ArchiveStream`] walks the entries, hands each one to a visitor with a
//!   transient byte reader, and reports a digest over every raw byte read
//!
//! [`TarballStream`] implements the stream for gzip-compressed tarballs over
//! any [`std::io::Read`]; [`FileArchiveSource`] serves `file://` origins.
//! Network transports live with the binary and reuse [`TarballStream`].

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod digest;
pub mod error;
pub mod file;
pub mod header;
pub mod prelude;
pub mod stream;
pub mod tarball;

pub use digest::DigestReader;
pub use error::ArchiveError;
pub use file::FileArchiveSource;
pub use header::EntryHeader;
pub use stream::{ArchiveSource, ArchiveStream, CloseHandle, EntryVisitor};
pub use tarball::{ClosableReader, CloseFlag, TarballStream, is_contained};
