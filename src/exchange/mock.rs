//! In-memory device link for exchange tests
//!
//! Behaves like the MLP firmware: the queued reply becomes readable only once
//! a full frame (four inputs and the command marker) has been written. An
//! empty receive buffer reads as `TimedOut`, matching `serialport`.

use super::client::DeviceLink;
use super::frame::FRAME_LEN;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

pub struct MockLink {
    written: Vec<u8>,
    write_calls: usize,
    pending_reply: Vec<u8>,
    rx: VecDeque<u8>,
    read_chunk: usize,
    eof_when_drained: bool,
    fail_writes_after: Option<usize>,
    fail_reads: bool,
    read_timeouts: Vec<Duration>,
}

impl MockLink {
    /// A device that answers a complete frame with `reply`
    pub fn responding(reply: &[u8]) -> Self {
        Self {
            written: Vec::new(),
            write_calls: 0,
            pending_reply: reply.to_vec(),
            rx: VecDeque::new(),
            read_chunk: usize::MAX,
            eof_when_drained: false,
            fail_writes_after: None,
            fail_reads: false,
            read_timeouts: Vec::new(),
        }
    }

    /// A device that never answers
    pub fn silent() -> Self {
        Self::responding(&[])
    }

    /// Deliver at most `chunk` bytes per read call
    pub fn with_read_chunk(mut self, chunk: usize) -> Self {
        self.read_chunk = chunk;
        self
    }

    /// Report EOF instead of a timeout once the reply is drained
    pub fn eof_when_drained(mut self) -> Self {
        self.eof_when_drained = true;
        self
    }

    /// Accept `count` bytes, then fail every write
    pub fn fail_writes_after(mut self, count: usize) -> Self {
        self.fail_writes_after = Some(count);
        self
    }

    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    /// Bytes the device sent that the client has not read
    pub fn unread(&self) -> Vec<u8> {
        self.rx.iter().copied().collect()
    }

    pub fn read_timeouts(&self) -> &[Duration] {
        &self.read_timeouts
    }
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
        }
        if self.rx.is_empty() {
            if self.eof_when_drained {
                return Ok(0);
            }
            return Err(io::Error::new(io::ErrorKind::TimedOut, "Operation timed out"));
        }

        let n = buf.len().min(self.rx.len()).min(self.read_chunk);
        for slot in buf.iter_mut().take(n) {
            // rx.len() >= n
            *slot = self.rx.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(limit) = self.fail_writes_after {
            if self.written.len() >= limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
            }
        }

        self.write_calls += 1;
        self.written.extend_from_slice(buf);
        if self.written.len() == FRAME_LEN {
            self.rx.extend(self.pending_reply.drain(..));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DeviceLink for MockLink {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.read_timeouts.push(timeout);
        Ok(())
    }
}
