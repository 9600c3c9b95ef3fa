// src/main.rs
//! GPS Doctor - check that a USB/serial GPS receiver is reachable and streaming NMEA

use anyhow::Context;
use clap::Parser;
use gps_doctor::{
    display::TerminalReporter,
    logger,
    ports::{self, priority},
    probe::SystemSerial,
    DiagnosticConfig, GpsDoctor, Platform,
};
use std::{path::PathBuf, process::ExitCode, time::Duration};

#[derive(Debug, Parser)]
#[command(
    name = "gps-doctor",
    version,
    about = "Test a USB/serial GPS receiver (GlobalSat BU-353N5, u-blox) for a healthy NMEA stream"
)]
struct Cli {
    /// Serial device path (e.g., /dev/ttyACM0 or COM4); overrides GPS_PORT
    #[arg(long)]
    port: Option<String>,

    /// Baud rate to force (e.g., 4800 or 9600); overrides GPS_BAUD
    #[arg(long)]
    baud: Option<u32>,

    /// List detected candidate ports and exit
    #[arg(long)]
    list: bool,

    /// Seconds to read at each baud rate before deciding
    #[arg(long)]
    read_seconds: Option<u64>,

    /// Print the result as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Abandon the whole run after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Config file [default: ~/.config/gps-doctor/config.json]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut DiagnosticConfig) {
        if let Some(port) = &self.port {
            config.update_port(port.clone());
        }
        if let Some(baud) = self.baud {
            config.update_baud(baud);
        }
        if let Some(seconds) = self.read_seconds {
            config.update_read_seconds(seconds);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = match &cli.config {
        Some(path) => DiagnosticConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DiagnosticConfig::load().context("Failed to load config")?,
    };
    config.apply_env(|key| std::env::var(key).ok());
    cli.apply(&mut config);
    config.validate()?;
    tracing::debug!(?config, "resolved configuration");

    let platform = Platform::current();
    let user_override = config.port.clone();
    let candidates = tokio::task::spawn_blocking(move || {
        priority::candidate_ports(platform, &ports::system_ports(), user_override.as_deref())
    })
    .await
    .context("port enumeration task failed")?;

    let json = cli.json;
    let mut reporter = TerminalReporter::stdout();

    if cli.list {
        if json {
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        } else {
            reporter.candidates(&candidates)?;
        }
        return Ok(true);
    }

    let baud_rates = config.baud_rates_to_try();
    if !json {
        reporter.header()?;
        reporter.candidates(&candidates)?;
        reporter.baud_rates(&baud_rates)?;
    }

    // The engine blocks on serial reads, so it gets its own thread while
    // this task watches for Ctrl+C and the overall time limit.
    let mut doctor = GpsDoctor::new(SystemSerial, config.probe_settings(), baud_rates);
    let task = tokio::task::spawn_blocking(move || {
        let result = if json {
            doctor.run(&candidates, &mut ())
        } else {
            doctor.run(&candidates, &mut reporter)
        };
        (result, reporter)
    });

    let timeout = cli.timeout;
    let overall = async move {
        match timeout {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        joined = task => {
            let (result, mut reporter) = joined.context("diagnostic task failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                reporter.summary(&result)?;
            }
            Ok(result.is_success())
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted.");
            std::process::exit(130);
        }
        _ = overall => {
            eprintln!("\nGave up after {} seconds.", timeout.unwrap_or_default());
            std::process::exit(1);
        }
    }
}
