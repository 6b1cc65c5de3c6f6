//! The archive source and stream traits

use firmsync_manifest::{Origin, Release};
use std::io::{self, Read};
use std::ops::ControlFlow;

use crate::error::ArchiveError;
use crate::header::EntryHeader;

/// Closes an open stream from another thread, unblocking a pending read.
pub type CloseHandle = Box<dyn FnOnce() + Send + 'static>;

/// Callback invoked once per archive entry.
///
/// The reader yields the entry's bytes and is only valid for the duration of
/// the call. Entries the visitor does not read are skipped. Returning
/// [`ControlFlow::Break`] stops the walk.
pub type EntryVisitor<'a> = dyn FnMut(&EntryHeader, &mut dyn Read) -> ControlFlow<()> + 'a;

/// Opens release archives.
pub trait ArchiveSource {
    /// Open the archive for `release`, resolved against `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the location cannot be resolved or the
    /// archive cannot be opened.
    fn open(&self, release: &Release, origin: &Origin)
    -> Result<Box<dyn ArchiveStream>, ArchiveError>;
}

impl<S: ArchiveSource + ?Sized> ArchiveSource for &S {
    fn open(
        &self,
        release: &Release,
        origin: &Origin,
    ) -> Result<Box<dyn ArchiveStream>, ArchiveError> {
        (**self).open(release, origin)
    }
}

/// A sequential, single-pass stream of archive entries.
pub trait ArchiveStream: Send {
    /// Walk the entries in archive order.
    ///
    /// Returns `Ok(())` at end of stream or when the visitor breaks.
    ///
    /// # Errors
    ///
    /// Returns the I/O error that interrupted the stream. A stream that has
    /// been closed through its [`CloseHandle`] fails with
    /// [`io::ErrorKind::ConnectionAborted`].
    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> io::Result<()>;

    /// Hex digest of every raw byte read from the stream so far.
    fn checksum(&self) -> String;

    /// A handle that closes the stream.
    fn close_handle(&self) -> CloseHandle;
}
