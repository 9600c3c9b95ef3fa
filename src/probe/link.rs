// src/probe/link.rs
//! Serial link capability used by the probe controller
//!
//! The controller only needs "open this path at this baud" and "give me the
//! next line before this deadline", so tests can swap the real serial port
//! for a scripted feed.

use crate::error::Result;
use std::{
    io::{self, BufRead, BufReader, Read},
    time::{Duration, Instant},
};
use tokio_serial::SerialPort;

/// Longest run of bytes without a newline before it is handed over as a
/// line anyway. NMEA sentences are at most 82 characters.
const MAX_LINE_BYTES: usize = 1024;

/// Result of one bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A lossily decoded line, possibly still carrying its terminator
    Line(String),
    /// Nothing complete arrived before the read timeout
    Idle,
    /// The device reported end of stream
    Closed,
}

pub trait LineSource {
    /// Block until a line arrives, the per-read timeout expires, or
    /// `deadline` passes, whichever comes first.
    fn read_line(&mut self, deadline: Instant) -> io::Result<LineRead>;
}

pub trait SerialLink {
    type Source: LineSource;

    /// Open `path` at `baud_rate`. The returned source owns the handle and
    /// closes it when dropped.
    fn open(&mut self, path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self::Source>;
}

/// The host's serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerial;

impl SerialLink for SystemSerial {
    type Source = SerialLineSource;

    fn open(&mut self, path: &str, baud_rate: u32, read_timeout: Duration) -> Result<SerialLineSource> {
        let port = tokio_serial::new(path, baud_rate).timeout(read_timeout).open()?;
        Ok(SerialLineSource::new(port, read_timeout))
    }
}

/// A byte stream whose blocking reads can be bounded.
pub trait TimedRead: Read {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl TimedRead for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout)?;
        Ok(())
    }
}

/// Line reader over an open serial handle. Partial lines survive read
/// timeouts and are completed by the next read.
pub struct SerialLineSource<P: TimedRead = Box<dyn SerialPort>> {
    reader: BufReader<P>,
    read_timeout: Duration,
    pending: Vec<u8>,
}

impl<P: TimedRead> SerialLineSource<P> {
    pub fn new(port: P, read_timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(port),
            read_timeout,
            pending: Vec::new(),
        }
    }

    fn take_line(&mut self) -> LineRead {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        LineRead::Line(line)
    }
}

impl<P: TimedRead> LineSource for SerialLineSource<P> {
    fn read_line(&mut self, deadline: Instant) -> io::Result<LineRead> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(LineRead::Idle);
        }
        self.reader.get_mut().set_read_timeout(remaining.min(self.read_timeout))?;

        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(LineRead::Closed),
            Ok(_) => Ok(self.take_line()),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                if self.pending.len() > MAX_LINE_BYTES {
                    Ok(self.take_line())
                } else {
                    Ok(LineRead::Idle)
                }
            }
            Err(e) => Err(e),
        }
    }
}
