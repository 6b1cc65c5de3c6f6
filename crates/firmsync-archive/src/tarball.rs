//! Gzip-compressed tarball streams

use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::io::{self, Read};
use std::ops::ControlFlow;
use std::path::{Component, Path};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, trace};

use crate::digest::DigestReader;
use crate::header::EntryHeader;
use crate::stream::{ArchiveStream, CloseHandle, EntryVisitor};

/// Shared "closed" flag for a [`ClosableReader`].
#[derive(Debug, Clone, Default)]
pub struct CloseFlag(Arc<AtomicBool>);

impl CloseFlag {
    /// Mark the reader closed.
    pub fn close(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the reader has been closed.
    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Reader that fails with `ConnectionAborted` once its [`CloseFlag`] is set.
pub struct ClosableReader<R> {
    inner: R,
    flag: CloseFlag,
}

impl<R: Read> ClosableReader<R> {
    /// Wrap `inner` with a fresh flag.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            flag: CloseFlag::default(),
        }
    }

    /// The flag controlling this reader.
    pub fn flag(&self) -> CloseFlag {
        self.flag.clone()
    }
}

impl<R: Read> Read for ClosableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.flag.is_closed() {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "archive stream closed",
            ));
        }
        self.inner.read(buf)
    }
}

type CloseHook = Arc<dyn Fn() + Send + Sync>;

/// [`ArchiveStream`] over a gzip-compressed tarball.
///
/// The digest covers the compressed bytes exactly as they arrive from the
/// underlying reader, including anything after the end of the tar data.
/// Entry model tags come from the release's file list; unlisted entries
/// apply to all models. Only regular files are visited.
pub struct TarballStream<R> {
    reader: Option<ClosableReader<R>>,
    flag: CloseFlag,
    hook: Option<CloseHook>,
    files: HashMap<String, Vec<String>>,
    digest: Option<String>,
}

impl<R: Read + Send> TarballStream<R> {
    /// Create a stream over `reader`, tagging entries from `files`
    /// (archive path → models).
    pub fn new(reader: R, files: HashMap<String, Vec<String>>) -> Self {
        let reader = ClosableReader::new(reader);
        Self {
            flag: reader.flag(),
            reader: Some(reader),
            hook: None,
            files,
            digest: None,
        }
    }

    /// Run `hook` in addition to setting the close flag when the stream is
    /// closed. Transports use this to tear down the underlying connection.
    #[must_use]
    pub fn with_close_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    fn header_for<T: Read>(&self, entry: &tar::Entry<'_, T>) -> io::Result<EntryHeader> {
        let raw = entry.path()?;
        let path = normalize(&raw);
        let name = raw
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let modified = entry
            .header()
            .mtime()
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap_or(UNIX_EPOCH);
        let models = self.files.get(&path).cloned().unwrap_or_default();

        Ok(EntryHeader {
            name,
            path,
            models,
            modified,
            size: entry.size(),
        })
    }

    fn walk<T: Read>(
        &self,
        archive: &mut tar::Archive<T>,
        visit: &mut EntryVisitor<'_>,
    ) -> io::Result<ControlFlow<()>> {
        for entry in archive.entries()? {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let header = self.header_for(&entry)?;
            trace!(path = %header.path, size = header.size, "archive entry");
            if visit(&header, &mut entry).is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

impl<R: Read + Send> ArchiveStream for TarballStream<R> {
    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> io::Result<()> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| io::Error::other("archive stream already consumed"))?;

        let mut archive = tar::Archive::new(GzDecoder::new(DigestReader::new(reader)));
        let walked = self.walk(&mut archive, visit);
        let mut raw = archive.into_inner().into_inner();

        let result = match walked {
            Ok(ControlFlow::Continue(())) => raw.drain().map(|tail| {
                debug!(tail, total = raw.bytes_read(), "archive stream drained");
            }),
            Ok(ControlFlow::Break(())) => Ok(()),
            Err(err) => Err(err),
        };

        self.digest = Some(raw.hex_digest());
        result
    }

    fn checksum(&self) -> String {
        self.digest.clone().unwrap_or_default()
    }

    fn close_handle(&self) -> CloseHandle {
        let flag = self.flag.clone();
        let hook = self.hook.clone();
        Box::new(move || {
            flag.close();
            if let Some(hook) = hook {
                hook();
            }
        })
    }
}

fn normalize(path: &Path) -> String {
    let parts: Vec<_> = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .map(|component| component.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}

/// Whether an entry path stays inside the directory it is extracted to.
pub fn is_contained(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
