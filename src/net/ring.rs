//! Fixed-capacity receive buffer with line framing.

use std::io::{self, Read};

use crate::engine::config::{MAX_LINE_LEN, RECV_BUFFER_SIZE};

/// One framing step.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, LF (and an optional preceding CR) stripped.
    Line(String),
    /// A complete line longer than the working limit; dropped whole.
    Overlong,
}

/// Byte-oriented FIFO of fixed capacity. Bytes are fed from the socket and
/// consumed as whole LF-terminated lines; an overlong line is discarded as a
/// unit rather than delivered truncated.
pub struct RingBuffer {
    data: Box<[u8; RECV_BUFFER_SIZE]>,
    tail: usize,
    len: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    pub fn new() -> Self {
        RingBuffer {
            data: Box::new([0; RECV_BUFFER_SIZE]),
            tail: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == RECV_BUFFER_SIZE
    }

    fn head(&self) -> usize {
        (self.tail + self.len) % RECV_BUFFER_SIZE
    }

    fn at(&self, offset: usize) -> u8 {
        self.data[(self.tail + offset) % RECV_BUFFER_SIZE]
    }

    /// Read once from `source` into the contiguous free region at the head.
    /// Returns the byte count (0 on orderly shutdown); `Ok(None)` means the
    /// buffer has no space left.
    pub fn fill_from<R: Read>(&mut self, source: &mut R) -> io::Result<Option<usize>> {
        if self.is_full() {
            return Ok(None);
        }
        let head = self.head();
        let end = if self.tail > head { self.tail } else { RECV_BUFFER_SIZE };
        let n = source.read(&mut self.data[head..end])?;
        self.len += n;
        Ok(Some(n))
    }

    /// Append bytes directly (test aid and loopback path).
    pub fn feed(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > RECV_BUFFER_SIZE - self.len {
            return false;
        }
        for &b in bytes {
            let head = self.head();
            self.data[head] = b;
            self.len += 1;
        }
        true
    }

    /// Extract the next complete line, if any.
    pub fn next_line(&mut self) -> Option<Frame> {
        let newline = (0..self.len).find(|&i| self.at(i) == b'\n')?;
        let mut line_len = newline;
        if line_len > 0 && self.at(line_len - 1) == b'\r' {
            line_len -= 1;
        }
        if line_len >= MAX_LINE_LEN {
            self.consume(newline + 1);
            return Some(Frame::Overlong);
        }
        let mut bytes = Vec::with_capacity(line_len);
        for i in 0..line_len {
            bytes.push(self.at(i));
        }
        self.consume(newline + 1);
        Some(Frame::Line(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Whether the filled region holds a line terminator.
    pub fn contains_newline(&self) -> bool {
        (0..self.len).any(|i| self.at(i) == b'\n')
    }

    fn consume(&mut self, count: usize) {
        let count = count.min(self.len);
        self.tail = (self.tail + count) % RECV_BUFFER_SIZE;
        self.len -= count;
    }
}
