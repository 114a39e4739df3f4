//! In-process duplex byte pipe.
//!
//! Two connected ends, each `Read + Write`, backed by bounded channels so a
//! fast writer blocks once the peer falls behind. Dropping an end closes it:
//! the peer's reads return EOF and its writes fail with `BrokenPipe`.

use std::io::{self, Read, Write};
use std::sync::mpsc;

/// Chunks in flight per direction before a writer blocks
const PIPE_DEPTH: usize = 64;

pub struct PipeEnd {
    tx: Option<mpsc::SyncSender<Vec<u8>>>,
    rx: mpsc::Receiver<Vec<u8>>,
    buffer: Vec<u8>,
    buffer_pos: usize,
}

/// Create a connected pair of pipe ends.
pub fn pipe() -> (PipeEnd, PipeEnd) {
    let (a_tx, b_rx) = mpsc::sync_channel(PIPE_DEPTH);
    let (b_tx, a_rx) = mpsc::sync_channel(PIPE_DEPTH);
    (PipeEnd::new(a_tx, a_rx), PipeEnd::new(b_tx, b_rx))
}

impl PipeEnd {
    fn new(tx: mpsc::SyncSender<Vec<u8>>, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            tx: Some(tx),
            rx,
            buffer: Vec::new(),
            buffer_pos: 0,
        }
    }

    /// Half-close: the peer sees EOF once it drains what was already written.
    pub fn close_write(&mut self) {
        self.tx = None;
    }
}

impl Write for PipeEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed for writing"))?;
        tx.send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe peer closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for PipeEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // If we have data in our buffer, use it first
        if self.buffer_pos < self.buffer.len() {
            let available = self.buffer.len() - self.buffer_pos;
            let to_copy = available.min(buf.len());
            buf[..to_copy]
                .copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + to_copy]);
            self.buffer_pos += to_copy;
            return Ok(to_copy);
        }

        // Buffer is empty, get new chunk from channel
        match self.rx.recv() {
            Ok(chunk) => {
                let to_copy = chunk.len().min(buf.len());
                buf[..to_copy].copy_from_slice(&chunk[..to_copy]);
                self.buffer = chunk;
                self.buffer_pos = to_copy;
                Ok(to_copy)
            }
            Err(_) => Ok(0), // Channel closed, EOF
        }
    }
}
