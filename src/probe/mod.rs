// src/probe/mod.rs
//! Probing serial ports for a live NMEA stream

pub mod controller;
pub mod link;
#[cfg(any(test, feature = "test-util"))]
pub mod script;

pub use controller::{probe, ProbeAttempt, ProbeObserver, ProbeReport, ProbeSettings, ProbeState};
pub use link::{LineRead, LineSource, SerialLineSource, SerialLink, SystemSerial, TimedRead};
