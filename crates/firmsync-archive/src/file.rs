//! Local archive source for `file://` origins

use firmsync_manifest::{Origin, Release};
use std::fs::File;
use std::io::BufReader;
use tracing::debug;

use crate::error::ArchiveError;
use crate::stream::{ArchiveSource, ArchiveStream};
use crate::tarball::TarballStream;

/// Opens release archives from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileArchiveSource;

impl FileArchiveSource {
    /// Create a file archive source.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveSource for FileArchiveSource {
    fn open(
        &self,
        release: &Release,
        origin: &Origin,
    ) -> Result<Box<dyn ArchiveStream>, ArchiveError> {
        let url = release.url(origin)?;
        if url.scheme() != "file" {
            return Err(ArchiveError::Unsupported(url));
        }

        let path = url
            .to_file_path()
            .map_err(|()| ArchiveError::open(url.as_str(), "not a local path"))?;
        let file = File::open(&path).map_err(|err| ArchiveError::open(url.as_str(), err))?;
        debug!(path = %path.display(), version = %release.version, "opened local archive");

        Ok(Box::new(TarballStream::new(
            BufReader::new(file),
            release.file_models(),
        )))
    }
}
