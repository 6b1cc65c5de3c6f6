//! Whole-stream MD5 accounting

use md5::{Digest, Md5};
use std::io::{self, Read};

/// Reader adapter that hashes every byte passing through it.
pub struct DigestReader<R> {
    inner: R,
    hasher: Md5,
    bytes: u64,
}

impl<R: Read> DigestReader<R> {
    /// Wrap `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
            bytes: 0,
        }
    }

    /// Number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Lower-case hex digest of the bytes read so far.
    pub fn hex_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }

    /// Read the remainder of the stream so the digest covers all of it.
    ///
    /// # Errors
    ///
    /// Propagates read errors from the inner reader.
    pub fn drain(&mut self) -> io::Result<u64> {
        io::copy(self, &mut io::sink())
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(chunk) = buf.get(..n) {
            self.hasher.update(chunk);
        }
        self.bytes = self.bytes.saturating_add(n as u64);
        Ok(n)
    }
}
