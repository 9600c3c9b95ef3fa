// src/probe/script.rs
//! Scripted serial link that replays canned lines instead of touching hardware

use super::link::{LineRead, LineSource, SerialLink};
use crate::error::{GpsError, Result};
use std::{
    cell::Cell,
    collections::{HashMap, VecDeque},
    io,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

const SILENCE_STEP: Duration = Duration::from_millis(5);

/// What happens once a stream's lines run out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ending {
    Closed,
    /// Device stays open but quiet until the deadline
    Silence,
    /// The next read fails with this message
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// `open` fails with this message
    Refuse(String),
    Stream { lines: Vec<String>, ending: Ending },
}

impl Feed {
    fn stream<I, S>(lines: I, ending: Ending) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Feed::Stream {
            lines: lines.into_iter().map(Into::into).collect(),
            ending,
        }
    }

    /// Lines, then end of stream
    pub fn lines<I: IntoIterator<Item = S>, S: Into<String>>(lines: I) -> Self {
        Self::stream(lines, Ending::Closed)
    }

    /// Lines, then silence until the read window closes
    pub fn then_silent<I: IntoIterator<Item = S>, S: Into<String>>(lines: I) -> Self {
        Self::stream(lines, Ending::Silence)
    }

    /// Lines, then a read error
    pub fn then_error<I: IntoIterator<Item = S>, S: Into<String>>(lines: I, message: &str) -> Self {
        Self::stream(lines, Ending::Error(message.to_string()))
    }
}

/// Maps `(path, baud)` to a feed. Unscripted combinations refuse to open.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    feeds: HashMap<(String, u32), Feed>,
    opened: Vec<(String, u32)>,
    open_handles: Rc<Cell<usize>>,
    max_open_handles: Rc<Cell<usize>>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, path: &str, baud_rate: u32, feed: Feed) -> Self {
        self.feeds.insert((path.to_string(), baud_rate), feed);
        self
    }

    /// Every `(path, baud)` passed to `open`, in call order
    pub fn opened(&self) -> &[(String, u32)] {
        &self.opened
    }

    /// Handles currently open
    pub fn open_handles(&self) -> usize {
        self.open_handles.get()
    }

    /// Most handles ever open at the same time
    pub fn max_open_handles(&self) -> usize {
        self.max_open_handles.get()
    }
}

impl SerialLink for ScriptedLink {
    type Source = ScriptedSource;

    fn open(&mut self, path: &str, baud_rate: u32, _read_timeout: Duration) -> Result<ScriptedSource> {
        self.opened.push((path.to_string(), baud_rate));

        let (lines, ending) = match self.feeds.get(&(path.to_string(), baud_rate)) {
            Some(Feed::Stream { lines, ending }) => (lines.clone(), ending.clone()),
            Some(Feed::Refuse(message)) => {
                return Err(GpsError::Io(io::Error::new(io::ErrorKind::PermissionDenied, message.clone())))
            }
            None => {
                return Err(GpsError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: no such device", path),
                )))
            }
        };

        let open = self.open_handles.get() + 1;
        self.open_handles.set(open);
        self.max_open_handles.set(self.max_open_handles.get().max(open));

        Ok(ScriptedSource {
            lines: lines.into(),
            ending,
            open_handles: Rc::clone(&self.open_handles),
        })
    }
}

pub struct ScriptedSource {
    lines: VecDeque<String>,
    ending: Ending,
    open_handles: Rc<Cell<usize>>,
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, deadline: Instant) -> io::Result<LineRead> {
        if let Some(line) = self.lines.pop_front() {
            return Ok(LineRead::Line(line));
        }

        match &self.ending {
            Ending::Closed => Ok(LineRead::Closed),
            Ending::Silence => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                thread::sleep(remaining.min(SILENCE_STEP));
                Ok(LineRead::Idle)
            }
            Ending::Error(message) => Err(io::Error::new(io::ErrorKind::BrokenPipe, message.clone())),
        }
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.open_handles.set(self.open_handles.get() - 1);
    }
}
