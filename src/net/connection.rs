use std::io::{self, ErrorKind, Write};

use mio::net::TcpStream;

use crate::engine::player::PlayerId;

use super::ring::{Frame, RingBuffer};

/// What a connection currently is to the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Banner sent, first line not seen yet.
    Waiting,
    Ai(PlayerId),
    Gui,
}

/// What one readiness-driven read pass produced.
#[derive(Debug)]
pub enum ReadOutcome {
    /// Complete lines extracted this pass (overlong lines already dropped).
    Lines(Vec<String>),
    /// Orderly shutdown, hard error, or receive-buffer overflow.
    Disconnected,
}

/// Per-socket state: the stream, its receive ring buffer, the pending write
/// queue, and the role decided by the first line.
pub struct Connection {
    pub stream: TcpStream,
    pub role: Role,
    ring: RingBuffer,
    pending: Vec<u8>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Connection {
            stream,
            role: Role::Waiting,
            ring: RingBuffer::new(),
            pending: Vec::new(),
        }
    }

    /// Drain the socket into the ring buffer and extract every complete
    /// line. recv of zero or a hard error reports a disconnect, as does a
    /// full buffer with no newline in sight.
    pub fn read_ready(&mut self) -> ReadOutcome {
        loop {
            match self.ring.fill_from(&mut self.stream) {
                Ok(Some(0)) => return ReadOutcome::Disconnected,
                Ok(Some(_)) => continue,
                Ok(None) => {
                    if !self.ring.contains_newline() {
                        tracing::warn!("receive buffer overflow, dropping connection");
                        return ReadOutcome::Disconnected;
                    }
                    break;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "recv failed");
                    return ReadOutcome::Disconnected;
                }
            }
        }
        let mut lines = Vec::new();
        while let Some(frame) = self.ring.next_line() {
            match frame {
                Frame::Line(line) => lines.push(line),
                Frame::Overlong => tracing::warn!("overlong line discarded"),
            }
        }
        ReadOutcome::Lines(lines)
    }

    /// Queue one protocol line and try to push it out immediately; whatever
    /// the socket will not take waits for the next writable readiness.
    pub fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.pending.extend_from_slice(line.as_bytes());
        self.pending.push(b'\n');
        self.flush_pending()
    }

    /// Write as much of the pending queue as the socket accepts.
    pub fn flush_pending(&mut self) -> io::Result<()> {
        while !self.pending.is_empty() {
            match self.stream.write(&self.pending) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.pending.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }
}
