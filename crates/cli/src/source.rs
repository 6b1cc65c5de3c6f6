//! Archive source that picks a transport from the archive URL scheme

use firmsync_archive::{ArchiveError, ArchiveSource, ArchiveStream, FileArchiveSource};
use firmsync_manifest::{Origin, Release};

use crate::http::HttpArchiveSource;

/// Serves `file` archives locally and `http`/`https` archives remotely.
#[derive(Debug, Clone)]
pub struct TransportSource {
    file: FileArchiveSource,
    http: HttpArchiveSource,
}

impl TransportSource {
    pub fn new(http: HttpArchiveSource) -> Self {
        Self {
            file: FileArchiveSource::new(),
            http,
        }
    }
}

impl ArchiveSource for TransportSource {
    fn open(
        &self,
        release: &Release,
        origin: &Origin,
    ) -> Result<Box<dyn ArchiveStream>, ArchiveError> {
        let url = release.url(origin)?;
        match url.scheme() {
            "file" => self.file.open(release, origin),
            "http" | "https" => self.http.open(release, origin),
            _ => Err(ArchiveError::Unsupported(url)),
        }
    }
}
