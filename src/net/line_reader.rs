//! net/line_reader.rs
//!
//! Incremental newline framing. Bytes go in as they arrive off the socket,
//! complete lines come out with the `\n` stripped. A trailing partial line
//! stays buffered until the rest of it shows up.

use bytes::{Buf, BytesMut};
use memchr::memchr;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::FrameError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const SCRATCH_CAPACITY_HINT: usize = 4096;
const DELIMITER: u8 = b'\n';

// -----------------------------------------------------------------------------
// ----- LineReader ------------------------------------------------------------

#[derive(Debug)]
pub struct LineReader {
    buffer: BytesMut,
    // Bytes at the front of `buffer` already known to hold no delimiter.
    scanned: usize,
    max_line_bytes: usize,
}

impl LineReader {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(SCRATCH_CAPACITY_HINT),
            scanned: 0,
            max_line_bytes,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- LineReader: Public Methods --------------------------------------------

impl LineReader {
    /// Append a chunk received from the peer.
    #[cfg(test)]
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Read once from `source` straight into the buffer. `Ok(0)` means EOF.
    pub async fn read_from<R>(&mut self, source: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.buffer.reserve(SCRATCH_CAPACITY_HINT);
        source.read_buf(&mut self.buffer).await
    }

    /// Pop the next complete line, if one is buffered.
    ///
    /// Fails once a line (complete or still partial) grows past
    /// `max_line_bytes`. The reader is unusable after that; the caller is
    /// expected to drop the connection.
    pub fn next_line(&mut self) -> Result<Option<String>, FrameError> {
        let Some(offset) = memchr(DELIMITER, &self.buffer[self.scanned..]) else {
            self.scanned = self.buffer.len();
            if self.buffer.len() > self.max_line_bytes {
                return Err(self.too_long());
            }
            return Ok(None);
        };

        let end = self.scanned + offset;
        if end > self.max_line_bytes {
            return Err(self.too_long());
        }

        let line = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
        self.buffer.advance(end + 1);
        self.scanned = 0;

        Ok(Some(line))
    }

    /// Bytes of the trailing partial line still waiting for a delimiter.
    #[cfg(test)]
    pub(crate) fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

// -----------------------------------------------------------------------------
// ----- LineReader: Private Methods -------------------------------------------

impl LineReader {
    fn too_long(&self) -> FrameError {
        FrameError::LineTooLong {
            limit: self.max_line_bytes,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
