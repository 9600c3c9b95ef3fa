// src/ports/mod.rs
//! Serial port discovery and probe ordering

pub mod enumerate;
pub mod priority;

use serde::Serialize;
use std::fmt;

pub use enumerate::{discover, system_ports, PortClass, PortDescriptor};
pub use priority::{fallback_candidates, prioritize};

/// Where a candidate path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortSource {
    Discovered,
    FallbackGuess,
    UserOverride,
}

impl fmt::Display for PortSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PortSource::Discovered => "discovered",
            PortSource::FallbackGuess => "fallback",
            PortSource::UserOverride => "override",
        };
        f.write_str(label)
    }
}

/// A device path to probe, in its final position within the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidatePort {
    pub path: String,
    pub source: PortSource,
    /// Lower is tried first
    pub rank: usize,
}

impl CandidatePort {
    pub fn new(path: impl Into<String>, source: PortSource) -> Self {
        Self {
            path: path.into(),
            source,
            rank: 0,
        }
    }
}

/// Host platform family; decides which fallback paths are guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Posix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}
