// src/config.rs
//! Configuration: defaults, optional JSON file, environment overrides

use crate::{
    diagnostic::DEFAULT_BAUD_RATES,
    error::{GpsError, Result},
    probe::controller::{ProbeSettings, DEFAULT_MIN_SENTENCES, MAX_READ_WINDOW},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, warn};

pub const PORT_ENV: &str = "GPS_PORT";
pub const BAUD_ENV: &str = "GPS_BAUD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    /// Pinned to the front of the probe order
    pub port: Option<String>,
    /// Replaces `baud_rates` when set
    pub baud: Option<u32>,
    pub baud_rates: Vec<u32>,
    pub read_seconds: u64,
    pub read_timeout_ms: u64,
    pub min_sentences: usize,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: None,
            baud_rates: DEFAULT_BAUD_RATES.to_vec(),
            read_seconds: 12,
            read_timeout_ms: 1000,
            min_sentences: DEFAULT_MIN_SENTENCES,
        }
    }
}

impl DiagnosticConfig {
    /// Load from the per-user config file, or defaults if there is none
    pub fn load() -> Result<Self> {
        match Self::get_config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                debug!("no config location: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// A missing file is not an error; a malformed one is.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    #[cfg(not(windows))]
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| GpsError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("gps-doctor").join("config.json"))
    }

    #[cfg(windows)]
    pub fn get_config_path() -> Result<PathBuf> {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| GpsError::Config("APPDATA environment variable not set".to_string()))?;

        Ok(PathBuf::from(appdata).join("gps-doctor").join("config.json"))
    }

    /// Apply `GPS_PORT` / `GPS_BAUD`. An unparsable baud is ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV).filter(|p| !p.trim().is_empty()) {
            self.port = Some(port.trim().to_string());
        }

        if let Some(raw) = lookup(BAUD_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(baud) => self.baud = Some(baud),
                Err(_) => warn!("Ignoring {}={:?}: not a baud rate", BAUD_ENV, raw),
            }
        }
    }

    /// Update serial port override
    pub fn update_port(&mut self, port: String) {
        self.port = Some(port);
    }

    /// Force a single baud rate
    pub fn update_baud(&mut self, baud: u32) {
        self.baud = Some(baud);
    }

    pub fn update_read_seconds(&mut self, seconds: u64) {
        self.read_seconds = seconds;
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud == Some(0) || self.baud_rates.contains(&0) {
            return Err(GpsError::Config("baud rate must be greater than zero".to_string()));
        }
        if self.baud.is_none() && self.baud_rates.is_empty() {
            return Err(GpsError::Config("no baud rates to try".to_string()));
        }
        if self.read_seconds == 0 {
            return Err(GpsError::Config("read window must be at least one second".to_string()));
        }
        if self.read_seconds > MAX_READ_WINDOW.as_secs() {
            return Err(GpsError::Config(format!(
                "read window must be at most {} seconds",
                MAX_READ_WINDOW.as_secs()
            )));
        }
        if self.read_timeout_ms == 0 {
            return Err(GpsError::Config("read timeout must be greater than zero".to_string()));
        }
        if self.read_timeout_ms / 1000 > self.read_seconds {
            return Err(GpsError::Config("read timeout must not exceed the read window".to_string()));
        }
        if self.min_sentences == 0 {
            return Err(GpsError::Config("min_sentences must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Rates to try, in order
    pub fn baud_rates_to_try(&self) -> Vec<u32> {
        match self.baud {
            Some(baud) => vec![baud],
            None => self.baud_rates.clone(),
        }
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            read_window: Duration::from_secs(self.read_seconds),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            min_sentences: self.min_sentences,
        }
    }
}
