// src/lib.rs
//! GPS Doctor Library
//!
//! Finds a serial/USB GPS receiver and checks that it is producing valid
//! NMEA data: port enumeration and ordering, bounded per-baud probing,
//! and GGA/RMC parsing.

pub mod config;
pub mod diagnostic;
pub mod display;
pub mod error;
pub mod gps;
pub mod logger;
pub mod ports;
pub mod probe;

// Re-export main types for convenience
pub use config::DiagnosticConfig;
pub use diagnostic::{DiagnosticResult, DiagnosticStatus, GpsDoctor, PortFailure};
pub use error::{GpsError, Result};
pub use ports::{CandidatePort, Platform, PortSource};
