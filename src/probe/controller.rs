// src/probe/controller.rs
//! Single (port, baud) probe: open, read for a bounded window, judge health

use super::link::{LineRead, LineSource, SerialLink};
use crate::{
    gps::{
        data::FixSnapshot,
        nmea::{self, NmeaSentence},
    },
    ports::CandidatePort,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_READ_WINDOW: Duration = Duration::from_secs(12);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Valid sentences needed, together with a fix, to stop reading early
pub const DEFAULT_MIN_SENTENCES: usize = 10;
/// Longest read window the engine will honor; longer ones are clamped
pub const MAX_READ_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Total time spent reading one (port, baud) combination
    pub read_window: Duration,
    /// Upper bound for a single blocking read
    pub read_timeout: Duration,
    pub min_sentences: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            read_window: DEFAULT_READ_WINDOW,
            read_timeout: DEFAULT_READ_TIMEOUT,
            min_sentences: DEFAULT_MIN_SENTENCES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeState {
    Opening,
    Reading,
    Succeeded,
    TimedOut,
    ErrorClosed,
}

/// Live bookkeeping for one open-link session.
#[derive(Debug)]
pub struct ProbeAttempt {
    pub port: CandidatePort,
    pub baud_rate: u32,
    pub started_at: Instant,
    pub deadline: Instant,
    /// Valid GGA/RMC sentences only
    pub sentence_count: usize,
    pub fix_observed: bool,
    pub raw_lines: usize,
    pub malformed_lines: usize,
    pub last_fix: FixSnapshot,
    state: ProbeState,
    early_exit: bool,
    error: Option<String>,
}

impl ProbeAttempt {
    pub fn new(port: CandidatePort, baud_rate: u32, read_window: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            port,
            baud_rate,
            started_at,
            deadline: deadline_after(started_at, read_window),
            sentence_count: 0,
            fix_observed: false,
            raw_lines: 0,
            malformed_lines: 0,
            last_fix: FixSnapshot::default(),
            state: ProbeState::Opening,
            early_exit: false,
            error: None,
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Link is open; the read window starts now.
    fn begin_reading(&mut self, read_window: Duration) {
        self.started_at = Instant::now();
        self.deadline = deadline_after(self.started_at, read_window);
        self.state = ProbeState::Reading;
    }

    /// Count a sentence and fold its fields into the snapshot.
    pub fn record(&mut self, sentence: &NmeaSentence) {
        match sentence {
            NmeaSentence::Gga(gga) => {
                self.last_fix.time = gga.time.or(self.last_fix.time);
                self.last_fix.position = gga.position.or(self.last_fix.position);
                self.last_fix.satellites = gga.satellites.or(self.last_fix.satellites);
                self.last_fix.fix_quality = Some(gga.fix_quality);
            }
            NmeaSentence::Rmc(rmc) => {
                self.last_fix.time = rmc.time.or(self.last_fix.time);
                self.last_fix.date = rmc.date.or(self.last_fix.date);
                self.last_fix.position = rmc.position.or(self.last_fix.position);
            }
            NmeaSentence::Other(_) | NmeaSentence::Malformed(_) => return,
        }

        self.sentence_count += 1;
        if sentence.signals_fix() {
            self.fix_observed = true;
        }
    }

    pub fn is_healthy(&self, min_sentences: usize) -> bool {
        self.fix_observed && self.sentence_count >= min_sentences
    }

    fn finish(self, state: ProbeState) -> ProbeReport {
        ProbeReport {
            port: self.port.path,
            baud_rate: self.baud_rate,
            state,
            sentence_count: self.sentence_count,
            fix_observed: self.fix_observed,
            raw_lines: self.raw_lines,
            malformed_lines: self.malformed_lines,
            elapsed: self.started_at.elapsed(),
            early_exit: self.early_exit,
            last_fix: self.last_fix,
            error: self.error,
        }
    }
}

fn deadline_after(start: Instant, read_window: Duration) -> Instant {
    start.checked_add(read_window.min(MAX_READ_WINDOW)).unwrap_or(start)
}

/// Outcome of one attempt, kept after the link is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub port: String,
    pub baud_rate: u32,
    pub state: ProbeState,
    pub sentence_count: usize,
    pub fix_observed: bool,
    pub raw_lines: usize,
    pub malformed_lines: usize,
    pub elapsed: Duration,
    /// Stopped early on a healthy stream with a fix
    pub early_exit: bool,
    pub last_fix: FixSnapshot,
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn succeeded(&self) -> bool {
        self.state == ProbeState::Succeeded
    }
}

/// Hooks for live progress output. All methods default to doing nothing.
pub trait ProbeObserver {
    fn attempt_started(&mut self, _port: &CandidatePort, _baud_rate: u32) {}

    fn sentence(&mut self, _sentence: &NmeaSentence) {}

    fn attempt_finished(&mut self, _report: &ProbeReport) {}
}

impl ProbeObserver for () {}

/// Probe one port at one baud rate.
pub fn probe<L: SerialLink>(
    link: &mut L,
    port: &CandidatePort,
    baud_rate: u32,
    settings: &ProbeSettings,
    observer: &mut dyn ProbeObserver,
) -> ProbeReport {
    let mut attempt = ProbeAttempt::new(port.clone(), baud_rate, settings.read_window);
    observer.attempt_started(port, baud_rate);
    info!(port = %port.path, baud_rate, "probing");

    let report = match link.open(&port.path, baud_rate, settings.read_timeout) {
        Ok(mut source) => {
            attempt.begin_reading(settings.read_window);
            let state = read_stream(&mut attempt, &mut source, settings, observer);
            // close the handle before anything else is opened
            drop(source);
            attempt.finish(state)
        }
        Err(e) => {
            info!(port = %port.path, baud_rate, "failed to open: {}", e);
            attempt.error = Some(e.to_string());
            attempt.finish(ProbeState::ErrorClosed)
        }
    };

    info!(
        port = %report.port,
        baud_rate,
        state = ?report.state,
        sentences = report.sentence_count,
        fix = report.fix_observed,
        "probe finished"
    );
    observer.attempt_finished(&report);
    report
}

fn read_stream<S: LineSource>(
    attempt: &mut ProbeAttempt,
    source: &mut S,
    settings: &ProbeSettings,
    observer: &mut dyn ProbeObserver,
) -> ProbeState {
    while Instant::now() < attempt.deadline {
        let line = match source.read_line(attempt.deadline) {
            Ok(LineRead::Line(line)) => line,
            Ok(LineRead::Idle) => continue,
            Ok(LineRead::Closed) => {
                debug!(port = %attempt.port.path, "device closed the stream");
                break;
            }
            Err(e) => {
                attempt.error = Some(format!("read failed: {}", e));
                return ProbeState::ErrorClosed;
            }
        };
        attempt.raw_lines += 1;

        match nmea::parse_line(&line) {
            None => continue,
            Some(NmeaSentence::Malformed(reason)) => {
                attempt.malformed_lines += 1;
                debug!(port = %attempt.port.path, "skipping malformed sentence: {}", reason);
            }
            Some(sentence) => {
                observer.sentence(&sentence);
                attempt.record(&sentence);
                if attempt.is_healthy(settings.min_sentences) {
                    attempt.early_exit = true;
                    debug!(port = %attempt.port.path, "healthy NMEA stream detected");
                    return ProbeState::Succeeded;
                }
            }
        }
    }

    // window over: any valid traffic means the device is alive
    if attempt.sentence_count > 0 {
        ProbeState::Succeeded
    } else {
        ProbeState::TimedOut
    }
}
