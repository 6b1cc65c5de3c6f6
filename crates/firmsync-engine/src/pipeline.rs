//! The per-release synchronization pipeline
//!
//! For each release the [`Synchronizer`] narrows the release's models with
//! the include/exclude rules and the acquisition quota, classifies the cache
//! state of what is left, and only opens the archive when some model needs
//! work. Matching entries are streamed to `<name>.download` files, which are
//! renamed into place only after the whole-archive checksum verifies. Cache
//! records are written last, and only when every file installed cleanly.

use chrono::{DateTime, Utc};
use firmsync_archive::{ArchiveSource, EntryHeader, is_contained};
use firmsync_manifest::{Manifest, ModelLookup, ModelSet, Origin, Release, Version};
use firmsync_signal::Signal;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::acquisition::AcquisitionMap;
use crate::cache::{CacheStatus, CacheStore};
use crate::config::SyncConfig;
use crate::error::SyncError;

/// Suffix of files that are still being downloaded.
pub const DOWNLOAD_SUFFIX: &str = ".download";

/// Whether an archive entry should be written for the `needed` models.
///
/// An entry passes when it applies to all models or to one of `needed`, the
/// include file pattern (if set) matches its path, and the exclude file
/// pattern (if set) does not.
pub fn should_download(config: &SyncConfig, needed: &ModelLookup<'_>, header: &EntryHeader) -> bool {
    if !header.applies_to_all() && !needed.contains_any(&header.models) {
        return false;
    }

    let include = &config.include.files;
    if include.is_set() && !include.matches(&header.path) {
        return false;
    }

    let exclude = &config.exclude.files;
    !(exclude.is_set() && exclude.matches(&header.path))
}

/// What happened to one release.
#[derive(Debug)]
pub enum ReleaseOutcome {
    /// Shutdown was requested before any work started
    Cancelled,
    /// Filters and quota left no models to fetch
    NotWanted,
    /// Every wanted model is already cached
    UpToDate(CacheStatus),
    /// Files were verified, installed and recorded
    Installed(InstallReport),
    /// The release was given up; nothing was recorded
    Abandoned(SyncError),
}

impl ReleaseOutcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ReleaseOutcome::Cancelled => "cancelled",
            ReleaseOutcome::NotWanted => "not wanted",
            ReleaseOutcome::UpToDate(_) => "up to date",
            ReleaseOutcome::Installed(_) => "installed",
            ReleaseOutcome::Abandoned(_) => "abandoned",
        }
    }
}

/// Details of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Installed release
    pub version: Version,
    /// Models whose cache records were written
    pub models: ModelSet,
    /// Final paths of the installed files
    pub installed: Vec<PathBuf>,
    /// Verified archive checksum
    pub checksum: String,
    /// Entry bytes written to disk
    pub bytes: u64,
    /// When the cache records were written
    pub completed_at: DateTime<Utc>,
}

/// Totals for a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Releases with nothing wanted
    pub not_wanted: usize,
    /// Releases already cached
    pub up_to_date: usize,
    /// Releases installed
    pub installed: usize,
    /// Releases given up
    pub abandoned: usize,
    /// Releases skipped because of shutdown
    pub cancelled: usize,
    /// Whether the run stopped early on shutdown
    pub interrupted: bool,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            not_wanted: 0,
            up_to_date: 0,
            installed: 0,
            abandoned: 0,
            cancelled: 0,
            interrupted: false,
            started_at: now,
            finished_at: now,
        }
    }

    /// Count `outcome`.
    pub fn record(&mut self, outcome: &ReleaseOutcome) {
        let counter = match outcome {
            ReleaseOutcome::Cancelled => &mut self.cancelled,
            ReleaseOutcome::NotWanted => &mut self.not_wanted,
            ReleaseOutcome::UpToDate(_) => &mut self.up_to_date,
            ReleaseOutcome::Installed(_) => &mut self.installed,
            ReleaseOutcome::Abandoned(_) => &mut self.abandoned,
        };
        *counter = counter.saturating_add(1);
    }

    /// Number of releases looked at.
    pub fn releases(&self) -> usize {
        [
            self.not_wanted,
            self.up_to_date,
            self.installed,
            self.abandoned,
            self.cancelled,
        ]
        .iter()
        .sum()
    }

    /// Whether any release was abandoned.
    pub fn has_failures(&self) -> bool {
        self.abandoned > 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} release(s): {} installed, {} up to date, {} not wanted, {} abandoned, {} cancelled",
            self.releases(),
            self.installed,
            self.up_to_date,
            self.not_wanted,
            self.abandoned,
            self.cancelled
        )
    }
}

/// A file being downloaded: the temporary path and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Download {
    temp: PathBuf,
    target: PathBuf,
}

impl Download {
    /// Destination for `header`, or `None` if the entry would land outside
    /// the firmware directory.
    fn for_entry(config: &SyncConfig, header: &EntryHeader) -> Option<Self> {
        let relative = if config.flatten {
            &header.name
        } else {
            &header.path
        };
        if !is_contained(&header.path) || !is_contained(relative) {
            return None;
        }

        let target = config.firmware_dir.join(relative);
        let mut temp = OsString::from(target.as_os_str());
        temp.push(DOWNLOAD_SUFFIX);
        Some(Self {
            temp: PathBuf::from(temp),
            target,
        })
    }
}

fn create_download(path: &Path) -> Result<File, SyncError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| SyncError::Prepare {
            path: path.to_path_buf(),
            source,
        })?;
    }
    File::create(path).map_err(|source| SyncError::Prepare {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_entry(
    mut file: File,
    path: &Path,
    header: &EntryHeader,
    body: &mut dyn Read,
) -> Result<u64, SyncError> {
    let copied = io::copy(body, &mut file);
    if let Err(err) = file.set_modified(header.modified) {
        debug!("Unable to set modification time of {}: {err}", path.display());
    }
    drop(file);
    copied.map_err(|source| SyncError::Copy {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_download(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Synchronizes manifest releases into the firmware directory.
pub struct Synchronizer<S> {
    config: SyncConfig,
    source: S,
    cache: CacheStore,
    acquired: AcquisitionMap,
}

impl<S: ArchiveSource> Synchronizer<S> {
    /// Create a synchronizer reading archives from `source`.
    pub fn new(config: SyncConfig, source: S) -> Self {
        Self {
            cache: CacheStore::new(config.cache_dir.clone()),
            acquired: AcquisitionMap::new(config.latest),
            config,
            source,
        }
    }

    /// Settings in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The cache record store.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Models counted so far in this run.
    pub fn acquired(&self) -> &AcquisitionMap {
        &self.acquired
    }

    /// Models of `release` to fetch, counting every filter match against the
    /// quota.
    ///
    /// Matched models are counted even when none end up wanted, so the quota
    /// reflects every release offering the model.
    pub fn select(&mut self, release: &Release) -> ModelSet {
        let matched = release
            .models
            .include(&self.config.include.models)
            .exclude(&self.config.exclude.models);
        let wanted = matched.exclude(&self.acquired);
        self.acquired.add(&matched);
        wanted
    }

    /// Process every release in manifest order, stopping early on shutdown.
    pub fn run(&mut self, shutdown: &Signal, manifest: &Manifest) -> RunReport {
        let mut report = RunReport::start();
        for release in &manifest.releases {
            if shutdown.is_signaled() {
                info!("Shutdown requested, skipping remaining releases");
                report.interrupted = true;
                break;
            }
            let outcome = self.process(shutdown, &manifest.origin, release);
            debug!("{:<7} {}", release.version, outcome.label());
            report.record(&outcome);
        }
        report.finished_at = Utc::now();
        report
    }

    /// Process one release.
    ///
    /// Failures, including unusable version or model names, are logged and
    /// returned as [`ReleaseOutcome::Abandoned`]; they never leave a cache
    /// record behind for the failed release.
    pub fn process(&mut self, shutdown: &Signal, origin: &Origin, release: &Release) -> ReleaseOutcome {
        if shutdown.is_signaled() {
            return ReleaseOutcome::Cancelled;
        }

        if let Err(err) = release.validate() {
            error!("{:<7} Skipping release: {err}", release.version);
            return ReleaseOutcome::Abandoned(err.into());
        }

        let wanted = self.select(release);
        if wanted.is_empty() {
            debug!("{:<7} No wanted models", release.version);
            return ReleaseOutcome::NotWanted;
        }

        let status =
            CacheStatus::classify(&self.cache, &release.checksum, &release.version, &wanted);
        for line in status.summary() {
            info!("{:<7} {line}", release.version);
        }

        let needed = status.needed();
        if needed.is_empty() {
            return ReleaseOutcome::UpToDate(status);
        }

        if shutdown.is_signaled() {
            return ReleaseOutcome::Cancelled;
        }

        match self.install(shutdown, origin, release, &needed) {
            Ok(report) => ReleaseOutcome::Installed(report),
            Err(err) => ReleaseOutcome::Abandoned(err),
        }
    }

    fn install(
        &self,
        shutdown: &Signal,
        origin: &Origin,
        release: &Release,
        needed: &ModelSet,
    ) -> Result<InstallReport, SyncError> {
        let prefix = format!("{:<7} [{needed}]:", release.version);
        if let Ok(url) = release.url(origin) {
            info!("{prefix} Downloading  url: {url}");
        }

        let mut stream = self.source.open(release, origin).map_err(|err| {
            error!("{prefix} Failed     error: {err}");
            SyncError::from(err)
        })?;

        // Closes the stream on shutdown, and always once this scope ends.
        let stop = shutdown.derive();
        stop.then(stream.close_handle());
        let _closer = stop.trigger_on_drop();

        let config = &self.config;
        let lookup = needed.lookup();
        let mut downloads: Vec<Download> = Vec::new();
        let mut bytes = 0u64;
        let mut failure: Option<SyncError> = None;

        let walked = stream.for_each_entry(&mut |header, body| {
            if !should_download(config, &lookup, header) {
                return ControlFlow::Continue(());
            }
            let Some(download) = Download::for_entry(config, header) else {
                warn!("{prefix} Skipping unsafe path: {}", header.path);
                return ControlFlow::Continue(());
            };

            info!(
                "{prefix} Processing  file: {} (modified: {}, bytes: {})",
                header.name,
                DateTime::<Utc>::from(header.modified).to_rfc3339(),
                header.size
            );

            let file = match create_download(&download.temp) {
                Ok(file) => file,
                Err(err) => {
                    failure = Some(err);
                    return ControlFlow::Break(());
                }
            };
            let temp = download.temp.clone();
            if !downloads.contains(&download) {
                downloads.push(download);
            }

            match copy_entry(file, &temp, header, body) {
                Ok(copied) => {
                    bytes = bytes.saturating_add(copied);
                    ControlFlow::Continue(())
                }
                Err(err) => {
                    failure = Some(err);
                    ControlFlow::Break(())
                }
            }
        });

        let failure = match walked {
            Err(err) => Some(SyncError::Stream(err)),
            Ok(()) => failure,
        }
        .map(|err| match err {
            SyncError::Stream(source) | SyncError::Copy { source, .. } if shutdown.is_signaled() => {
                SyncError::Interrupted(source)
            }
            other => other,
        });

        let mut leftovers: Vec<&Path> = Vec::new();
        let mut installed = Vec::new();
        let result = match failure {
            Some(err) => {
                error!("{prefix} Failed     error: {err}");
                leftovers.extend(downloads.iter().map(|download| download.temp.as_path()));
                Err(err)
            }
            None => {
                let actual = stream.checksum();
                if actual.eq_ignore_ascii_case(&release.checksum) {
                    info!("{prefix} Verified     md5: {actual}");
                    let mut failed = Vec::new();
                    for download in &downloads {
                        match fs::rename(&download.temp, &download.target) {
                            Ok(()) => {
                                info!("{prefix} Installed   path: {}", download.target.display());
                                installed.push(download.target.clone());
                            }
                            Err(err) => {
                                error!(
                                    "{prefix} Installation failed: {}: {err}",
                                    download.target.display()
                                );
                                leftovers.push(&download.temp);
                                failed.push(download.target.clone());
                            }
                        }
                    }
                    if failed.is_empty() {
                        Ok(())
                    } else {
                        Err(SyncError::Install { failed })
                    }
                } else {
                    let err = SyncError::ChecksumMismatch {
                        expected: release.checksum.clone(),
                        actual,
                    };
                    error!("{prefix} {err}");
                    leftovers.extend(downloads.iter().map(|download| download.temp.as_path()));
                    Err(err)
                }
            }
        };

        if !leftovers.is_empty() {
            info!("{prefix} Cleaning up leftover download files...");
            for path in leftovers {
                match remove_download(path) {
                    Ok(()) => info!("{prefix} Removed     path: {}", path.display()),
                    Err(err) => warn!("{prefix} Unable to remove {}: {err}", path.display()),
                }
            }
        }
        result?;

        for model in needed.iter() {
            if let Err(source) = self
                .cache
                .write(&release.version, model, &release.checksum)
            {
                error!(
                    "{:<7} [{model}]: Failed to write \"{}\" to cache file: {source}",
                    release.version, release.checksum
                );
                return Err(SyncError::CacheWrite {
                    model: model.to_string(),
                    source,
                });
            }
        }

        Ok(InstallReport {
            version: release.version.clone(),
            models: needed.clone(),
            installed,
            checksum: release.checksum.clone(),
            bytes,
            completed_at: Utc::now(),
        })
    }
}

impl<S> fmt::Debug for Synchronizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("acquired", &self.acquired)
            .finish_non_exhaustive()
    }
}
