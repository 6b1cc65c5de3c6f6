//! Archive sources and fixtures shared by the engine integration tests

use firmsync_archive::{
    ArchiveError, ArchiveSource, ArchiveStream, CloseHandle, EntryHeader, EntryVisitor,
    TarballStream,
};
use firmsync_manifest::{FileSpec, ModelSet, Origin, Release, Version};
use firmsync_signal::Signal;
use flate2::Compression;
use flate2::write::GzEncoder;
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Modification time stamped on every fixture entry.
pub const MTIME_SECS: u64 = 1_600_000_000;

pub fn mtime() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(MTIME_SECS)
}

pub fn origin() -> Result<Origin, url::ParseError> {
    Ok(Origin::new(url::Url::parse(
        "https://downloads.example.com/firmware/",
    )?))
}

pub fn release(version: &str, checksum: &str, models: &[&str], files: &[(&str, &[&str])]) -> Release {
    Release {
        version: Version::from(version),
        checksum: checksum.to_string(),
        models: ModelSet::new(models.iter().copied()),
        tarball: format!("firmware_{version}.tar.gz"),
        files: files
            .iter()
            .map(|(path, models)| FileSpec {
                path: path.to_string(),
                models: models.iter().map(|model| model.to_string()).collect(),
            })
            .collect(),
    }
}

/// One archive entry: path, model tags, contents.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: String,
    pub models: Vec<String>,
    pub data: Vec<u8>,
}

pub fn entry(path: &str, models: &[&str], data: &[u8]) -> Entry {
    Entry {
        path: path.to_string(),
        models: models.iter().map(|model| model.to_string()).collect(),
        data: data.to_vec(),
    }
}

/// Observations shared between a source and the test body.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl Probe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn close_handle(&self) -> CloseHandle {
        let closed = Arc::clone(&self.closed);
        Box::new(move || {
            closed.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// A stream that replays fixed entries and reports a fixed checksum.
pub struct ScriptedStream {
    entries: Vec<Entry>,
    checksum: String,
    fail_after: Option<usize>,
    probe: Probe,
}

impl ArchiveStream for ScriptedStream {
    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> io::Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            if self.fail_after == Some(index) {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated archive"));
            }
            let header = EntryHeader {
                name: entry.path.rsplit('/').next().unwrap_or_default().to_string(),
                path: entry.path.clone(),
                models: entry.models.clone(),
                modified: mtime(),
                size: entry.data.len() as u64,
            };
            let mut body: &[u8] = &entry.data;
            if visit(&header, &mut body).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn checksum(&self) -> String {
        self.checksum.clone()
    }

    fn close_handle(&self) -> CloseHandle {
        self.probe.close_handle()
    }
}

/// Serves [`ScriptedStream`]s keyed by tarball name.
#[derive(Default)]
pub struct ScriptedSource {
    archives: HashMap<String, (Vec<Entry>, String)>,
    fail_after: Option<usize>,
    pub probe: Probe,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_archive(mut self, release: &Release, entries: Vec<Entry>, checksum: &str) -> Self {
        self.archives
            .insert(release.tarball.clone(), (entries, checksum.to_string()));
        self
    }

    pub fn failing_after(mut self, entries: usize) -> Self {
        self.fail_after = Some(entries);
        self
    }
}

impl ArchiveSource for ScriptedSource {
    fn open(
        &self,
        release: &Release,
        _origin: &Origin,
    ) -> Result<Box<dyn ArchiveStream>, ArchiveError> {
        self.probe.open();
        let (entries, checksum) = self
            .archives
            .get(&release.tarball)
            .cloned()
            .ok_or_else(|| ArchiveError::open(release.tarball.clone(), "404 Not Found"))?;
        Ok(Box::new(ScriptedStream {
            entries,
            checksum,
            fail_after: self.fail_after,
            probe: self.probe.clone(),
        }))
    }
}

/// Deterministic, poorly compressible bytes.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xff) as u8
        })
        .collect()
}

/// Build a gzip tarball, returning its bytes and their MD5.
pub fn tarball(entries: &[Entry]) -> io::Result<(Vec<u8>, String)> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(MTIME_SECS);
        header.set_cksum();
        builder.append_data(&mut header, &entry.path, entry.data.as_slice())?;
    }
    let bytes = builder.into_inner()?.finish()?;
    let digest = hex::encode(Md5::digest(&bytes));
    Ok((bytes, digest))
}

/// Reader that triggers `signal` once `after` bytes have been read,
/// standing in for an interrupt arriving mid-download.
struct TrippingReader {
    inner: io::Cursor<Vec<u8>>,
    read: usize,
    after: usize,
    signal: Signal,
}

impl Read for TrippingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n;
        if self.read >= self.after {
            self.signal.trigger();
        }
        Ok(n)
    }
}

/// Serves one real tarball whose reader triggers a shutdown part-way through.
pub struct InterruptedSource {
    bytes: Vec<u8>,
    after: usize,
    shutdown: Signal,
    hook_ran: Arc<AtomicBool>,
    pub probe: Probe,
}

impl InterruptedSource {
    pub fn new(bytes: Vec<u8>, after: usize, shutdown: &Signal) -> Self {
        Self {
            bytes,
            after,
            shutdown: shutdown.clone(),
            hook_ran: Arc::new(AtomicBool::new(false)),
            probe: Probe::default(),
        }
    }

    pub fn hook_ran(&self) -> bool {
        self.hook_ran.load(Ordering::SeqCst)
    }
}

impl ArchiveSource for InterruptedSource {
    fn open(
        &self,
        release: &Release,
        _origin: &Origin,
    ) -> Result<Box<dyn ArchiveStream>, ArchiveError> {
        self.probe.open();
        let reader = TrippingReader {
            inner: io::Cursor::new(self.bytes.clone()),
            read: 0,
            after: self.after,
            signal: self.shutdown.clone(),
        };
        let hook_ran = Arc::clone(&self.hook_ran);
        Ok(Box::new(
            TarballStream::new(reader, release.file_models())
                .with_close_hook(move || hook_ran.store(true, Ordering::SeqCst)),
        ))
    }
}
