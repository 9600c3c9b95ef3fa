// src/display/terminal.rs
//! Human-readable terminal report: candidates, live probe progress,
//! verdict and troubleshooting text

use crate::{
    diagnostic::{DiagnosticResult, DiagnosticStatus},
    error::Result,
    gps::{data::FixSnapshot, nmea::NmeaSentence},
    ports::{CandidatePort, Platform},
    probe::{ProbeObserver, ProbeReport, ProbeState},
};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};
use tracing::debug;

pub struct TerminalReporter<W: Write> {
    out: W,
    platform: Platform,
}

impl TerminalReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), Platform::current())
    }
}

impl<W: Write> TerminalReporter<W> {
    pub fn new(out: W, platform: Platform) -> Self {
        Self { out, platform }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn heading(&mut self, color: Color, text: &str) -> Result<()> {
        execute!(self.out, SetForegroundColor(color), Print(text), Print("\n"), ResetColor)?;
        Ok(())
    }

    fn line(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.out, "{}", text.as_ref())?;
        Ok(())
    }

    pub fn header(&mut self) -> Result<()> {
        self.heading(Color::Green, "Testing USB/serial GPS receiver (GlobalSat BU-353N5 / u-blox)...")
    }

    pub fn candidates(&mut self, candidates: &[CandidatePort]) -> Result<()> {
        if candidates.is_empty() {
            return self.line("No candidate GPS ports found.");
        }

        self.heading(Color::Yellow, "Candidate ports:")?;
        for candidate in candidates {
            self.line(format!(" - {} ({})", candidate.path, candidate.source))?;
        }
        Ok(())
    }

    pub fn baud_rates(&mut self, baud_rates: &[u32]) -> Result<()> {
        let rates: Vec<String> = baud_rates.iter().map(u32::to_string).collect();
        self.line(format!("Baud rates to try: {}", rates.join(", ")))
    }

    /// Final verdict plus troubleshooting when nothing worked
    pub fn summary(&mut self, result: &DiagnosticResult) -> Result<()> {
        self.line("")?;
        match result.status {
            DiagnosticStatus::Succeeded => self.render_success(result),
            DiagnosticStatus::NoCandidatesFound => {
                self.heading(Color::Red, "No candidate GPS ports found.")?;
                if self.platform == Platform::Posix {
                    self.line("- On Raspberry Pi/Linux, check /dev/tty* and /dev/serial/by-id/*")?;
                }
                self.render_permissions_help()
            }
            DiagnosticStatus::AllCandidatesExhausted => {
                self.heading(Color::Red, "Unable to read GPS data from any candidate ports.")?;
                self.render_failures(result)?;
                self.render_troubleshooting()
            }
        }
    }

    fn render_success(&mut self, result: &DiagnosticResult) -> Result<()> {
        let port = result.succeeded_port.as_ref().map_or("?", |p| p.path.as_str());
        let baud = result.succeeded_baud.map_or_else(|| "?".to_string(), |b| b.to_string());
        self.heading(Color::Green, &format!("GPS appears to be working on: {} at {} baud", port, baud))?;

        if result.fix_acquired {
            self.line("Position fix: yes")?;
        } else {
            self.line("Position fix: not yet (receiver is streaming; give it a clear sky view and wait)")?;
        }
        if let Some(fix) = &result.last_fix {
            self.render_fix(fix)?;
        }
        self.line(format!("Valid GGA/RMC sentences seen: {}", result.total_sentences_seen))?;
        self.line("If this is your BU-353N5, you're good to go.")
    }

    fn render_fix(&mut self, fix: &FixSnapshot) -> Result<()> {
        if let Some(position) = &fix.position {
            self.line(format!("  Position:   {}", position))?;
        }
        if let Some(quality) = fix.fix_quality {
            self.line(format!("  Fix type:   {}", quality.description()))?;
        }
        if let Some(satellites) = fix.satellites {
            self.line(format!("  Satellites: {}", satellites))?;
        }
        match (fix.date, fix.time) {
            (Some(date), Some(time)) => self.line(format!("  UTC:        {} {}", date, time)),
            (None, Some(time)) => self.line(format!("  UTC:        {}", time)),
            _ => Ok(()),
        }
    }

    fn render_failures(&mut self, result: &DiagnosticResult) -> Result<()> {
        let mut ports: Vec<&str> = Vec::new();
        for failure in &result.errors {
            if !ports.contains(&failure.port.as_str()) {
                ports.push(&failure.port);
            }
        }

        for port in ports {
            if let Some(failure) = result.last_error_for(port) {
                self.line(format!("  Last error while trying {}: {}", port, failure.reason))?;
            }
        }
        Ok(())
    }

    fn render_troubleshooting(&mut self) -> Result<()> {
        self.heading(Color::Yellow, "Troubleshooting:")?;
        self.line("1) Unplug and replug the receiver, then re-run this test")?;
        self.line("2) Close any other app using the serial device (e.g., gpsd, mapping tools)")?;
        match self.platform {
            Platform::Posix => {
                self.line("3) Confirm the device path, e.g., ls -l /dev/serial/by-id/")?;
                self.line("4) Set GPS_PORT=/dev/ttyACM0 and optionally GPS_BAUD=4800, then rerun")?;
            }
            Platform::Windows => {
                self.line("3) Check Device Manager > Ports (COM & LPT) for the receiver's COM number")?;
                self.line("4) Set GPS_PORT=COM4 and optionally GPS_BAUD=4800, then rerun")?;
            }
        }
        self.render_permissions_help()
    }

    fn render_permissions_help(&mut self) -> Result<()> {
        if self.platform != Platform::Posix {
            return Ok(());
        }
        self.heading(Color::Cyan, "Permissions help (Linux/Raspberry Pi):")?;
        self.line("- Ensure your user is in the 'dialout' (or 'uucp' on some distros) group")?;
        self.line("  sudo usermod -aG dialout $USER && newgrp dialout")?;
        self.line("- Or temporarily: sudo chmod a+rw /dev/ttyACM0 (adjust device path)")?;
        self.line("- Prefer stable path under /dev/serial/by-id/ if available")
    }

    fn render_sentence(&mut self, sentence: &NmeaSentence) -> Result<()> {
        match sentence {
            NmeaSentence::Gga(gga) => {
                let time = gga.time.map_or_else(|| "-".to_string(), |t| t.to_string());
                let sats = gga.satellites.map_or_else(|| "-".to_string(), |s| s.to_string());
                self.line(format!("GGA: time={} sats={} qual={}", time, sats, gga.fix_quality.0))?;
                if let (true, Some(position)) = (gga.fix_quality.has_fix(), &gga.position) {
                    self.line(format!("Position: {}", position))?;
                }
                Ok(())
            }
            NmeaSentence::Rmc(rmc) => {
                let time = rmc.time.map_or_else(|| "-".to_string(), |t| t.to_string());
                let position = rmc.position.map_or_else(|| "-".to_string(), |p| p.to_string());
                self.line(format!("RMC: time={} status={:?} pos={}", time, rmc.status, position))
            }
            NmeaSentence::Other(_) | NmeaSentence::Malformed(_) => Ok(()),
        }
    }

    fn render_attempt(&mut self, report: &ProbeReport) -> Result<()> {
        match report.state {
            ProbeState::Succeeded if report.early_exit => self.line("Healthy NMEA stream detected."),
            ProbeState::Succeeded => self.line(format!(
                "Received {} NMEA sentences at {} baud.",
                report.sentence_count, report.baud_rate
            )),
            ProbeState::TimedOut => self.line(format!("No NMEA data at {} baud.", report.baud_rate)),
            ProbeState::ErrorClosed => {
                let error = report.error.as_deref().unwrap_or("unknown error");
                self.line(format!("Could not use {} at {} baud: {}", report.port, report.baud_rate, error))
            }
            ProbeState::Opening | ProbeState::Reading => Ok(()),
        }
    }
}

impl<W: Write> ProbeObserver for TerminalReporter<W> {
    fn attempt_started(&mut self, port: &CandidatePort, baud_rate: u32) {
        if let Err(e) = self.line(format!("Trying {} at {} baud...", port.path, baud_rate)) {
            debug!("report output failed: {}", e);
        }
    }

    fn sentence(&mut self, sentence: &NmeaSentence) {
        if let Err(e) = self.render_sentence(sentence) {
            debug!("report output failed: {}", e);
        }
    }

    fn attempt_finished(&mut self, report: &ProbeReport) {
        if let Err(e) = self.render_attempt(report) {
            debug!("report output failed: {}", e);
        }
    }
}
