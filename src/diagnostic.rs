// src/diagnostic.rs
//! Whole-run coordination: walk the candidates in order, bauds per port,
//! stop at the first healthy link.

use crate::{
    error::{GpsError, Result},
    gps::data::FixSnapshot,
    ports::CandidatePort,
    probe::{probe, ProbeObserver, ProbeReport, ProbeSettings, ProbeState, SerialLink},
};
use serde::Serialize;
use tracing::{info, warn};

/// Common GPS receiver rates, slow first
pub const DEFAULT_BAUD_RATES: [u32; 2] = [4800, 9600];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticStatus {
    Succeeded,
    /// Nothing to probe after enumeration and fallbacks
    NoCandidatesFound,
    /// Every port/baud combination timed out or failed
    AllCandidatesExhausted,
}

/// Why one port/baud attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortFailure {
    pub port: String,
    pub baud_rate: u32,
    pub state: ProbeState,
    pub reason: String,
}

impl PortFailure {
    fn from_report(report: &ProbeReport) -> Self {
        let reason = match &report.error {
            Some(error) => error.clone(),
            None if report.malformed_lines > 0 => format!(
                "no valid GGA/RMC sentences ({} malformed) in {:.1}s",
                report.malformed_lines,
                report.elapsed.as_secs_f64()
            ),
            None => format!("no NMEA sentences in {:.1}s", report.elapsed.as_secs_f64()),
        };

        Self {
            port: report.port.clone(),
            baud_rate: report.baud_rate,
            state: report.state,
            reason,
        }
    }
}

/// Outcome of one diagnostic run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticResult {
    pub status: DiagnosticStatus,
    pub succeeded_port: Option<CandidatePort>,
    pub succeeded_baud: Option<u32>,
    /// Valid GGA/RMC sentences across every attempt
    pub total_sentences_seen: usize,
    pub fix_acquired: bool,
    /// Failed attempts, in the order they were made
    pub errors: Vec<PortFailure>,
    pub attempts: usize,
    pub last_fix: Option<FixSnapshot>,
}

impl DiagnosticResult {
    fn empty(status: DiagnosticStatus) -> Self {
        Self {
            status,
            succeeded_port: None,
            succeeded_baud: None,
            total_sentences_seen: 0,
            fix_acquired: false,
            errors: Vec::new(),
            attempts: 0,
            last_fix: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DiagnosticStatus::Succeeded
    }

    /// The most recent failure recorded for `path`
    pub fn last_error_for(&self, path: &str) -> Option<&PortFailure> {
        self.errors.iter().rev().find(|failure| failure.port == path)
    }

    /// Turn a negative result into the matching error.
    pub fn into_result(self) -> Result<DiagnosticResult> {
        match self.status {
            DiagnosticStatus::Succeeded => Ok(self),
            DiagnosticStatus::NoCandidatesFound => Err(GpsError::NoCandidatesFound),
            DiagnosticStatus::AllCandidatesExhausted => Err(GpsError::AllCandidatesExhausted {
                attempts: self.attempts,
            }),
        }
    }
}

/// The acquisition engine. Owns the link capability; holds no other state
/// between runs.
pub struct GpsDoctor<L: SerialLink> {
    link: L,
    settings: ProbeSettings,
    baud_rates: Vec<u32>,
}

impl<L: SerialLink> GpsDoctor<L> {
    pub fn new(link: L, settings: ProbeSettings, baud_rates: Vec<u32>) -> Self {
        Self {
            link,
            settings,
            baud_rates,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn baud_rates(&self) -> &[u32] {
        &self.baud_rates
    }

    /// Probe `candidates` in rank order and stop at the first healthy one.
    pub fn run(&mut self, candidates: &[CandidatePort], observer: &mut dyn ProbeObserver) -> DiagnosticResult {
        if candidates.is_empty() {
            warn!("No candidate GPS ports found");
            return DiagnosticResult::empty(DiagnosticStatus::NoCandidatesFound);
        }

        let mut ordered: Vec<&CandidatePort> = candidates.iter().collect();
        ordered.sort_by_key(|candidate| candidate.rank);

        let mut result = DiagnosticResult::empty(DiagnosticStatus::AllCandidatesExhausted);
        for candidate in ordered {
            for &baud_rate in &self.baud_rates {
                let report = probe(&mut self.link, candidate, baud_rate, &self.settings, observer);

                result.attempts += 1;
                result.total_sentences_seen += report.sentence_count;
                result.fix_acquired |= report.fix_observed;
                if report.sentence_count > 0 {
                    result.last_fix = Some(report.last_fix.clone());
                }

                if report.succeeded() {
                    info!(port = %candidate.path, baud_rate, "GPS responding");
                    result.status = DiagnosticStatus::Succeeded;
                    result.succeeded_port = Some(candidate.clone());
                    result.succeeded_baud = Some(baud_rate);
                    return result;
                }

                result.errors.push(PortFailure::from_report(&report));
            }
        }

        warn!(attempts = result.attempts, "Unable to read GPS data from any candidate port");
        result
    }
}
