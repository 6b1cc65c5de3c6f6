//! Streaming archive source for `http` and `https` origins
//!
//! The engine reads archives synchronously on the main thread. The request
//! is sent on the runtime, and a pump task forwards body chunks through a
//! bounded channel to a blocking [`Read`] adapter. Closing the stream aborts
//! the pump, which unblocks a pending read.

use bytes::{Buf, Bytes};
use firmsync_archive::{ArchiveError, ArchiveSource, ArchiveStream, TarballStream};
use firmsync_manifest::{Origin, Release};
use futures::StreamExt;
use std::io::{self, Read};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Body chunks buffered between the pump task and the reader.
pub const BODY_CHANNEL_DEPTH: usize = 16;

#[derive(Debug)]
enum BodyEvent {
    Chunk(Bytes),
    Failed(io::Error),
    Finished,
}

/// Blocking reader over body chunks sent by the pump task.
struct ChannelReader {
    rx: mpsc::Receiver<BodyEvent>,
    chunk: Bytes,
    finished: bool,
}

impl ChannelReader {
    fn new(rx: mpsc::Receiver<BodyEvent>) -> Self {
        Self {
            rx,
            chunk: Bytes::new(),
            finished: false,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.chunk.is_empty() {
            if self.finished {
                return Ok(0);
            }
            match self.rx.blocking_recv() {
                Some(BodyEvent::Chunk(chunk)) => self.chunk = chunk,
                Some(BodyEvent::Failed(err)) => return Err(err),
                Some(BodyEvent::Finished) => self.finished = true,
                // The pump went away without finishing the body.
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "archive download stopped",
                    ));
                }
            }
        }

        let mut available: &[u8] = &self.chunk;
        let read = available.read(buf)?;
        self.chunk.advance(read);
        Ok(read)
    }
}

async fn pump_body(response: reqwest::Response, tx: mpsc::Sender<BodyEvent>) {
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let event = match chunk {
            Ok(chunk) => BodyEvent::Chunk(chunk),
            Err(err) => BodyEvent::Failed(io::Error::other(err)),
        };
        let failed = matches!(event, BodyEvent::Failed(_));
        if tx.send(event).await.is_err() {
            trace!("Archive reader dropped before the body ended");
            return;
        }
        if failed {
            return;
        }
    }
    if tx.send(BodyEvent::Finished).await.is_err() {
        trace!("Archive reader dropped at end of body");
    }
}

/// Opens release archives over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpArchiveSource {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpArchiveSource {
    /// Create a source that drives requests on `runtime`.
    ///
    /// [`ArchiveSource::open`] and the returned stream block the calling
    /// thread, so they must not be used from inside the runtime.
    pub fn new(client: reqwest::Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl ArchiveSource for HttpArchiveSource {
    fn open(
        &self,
        release: &Release,
        origin: &Origin,
    ) -> Result<Box<dyn ArchiveStream>, ArchiveError> {
        let url = release.url(origin)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ArchiveError::Unsupported(url));
        }

        let response = self
            .runtime
            .block_on(self.client.get(url.clone()).send())
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| ArchiveError::open(url.as_str(), err))?;
        debug!(url = %url, version = %release.version, "opened remote archive");

        let (tx, rx) = mpsc::channel(BODY_CHANNEL_DEPTH);
        let pump = self.runtime.spawn(pump_body(response, tx)).abort_handle();

        let stream = TarballStream::new(ChannelReader::new(rx), release.file_models())
            .with_close_hook(move || pump.abort());
        Ok(Box::new(stream))
    }
}
