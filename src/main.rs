//! CLI entry point for flowmon.
//!
//! Subcommands:
//! - `list-ports`: enumerate serial endpoints visible to the host
//! - `run`: drive one acquisition session until Ctrl-C, optionally
//!   exporting a session report on stop
//!
//! The binary is a thin presentation stand-in: it forwards operator intents
//! (connect parameters, stop, export) to the acquisition core and prints
//! the published state. Anything richer (charts, tables, interactive
//! pause/resume) belongs to an external presentation adapter built on the
//! same `SessionHandle` API.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use flowmon::acquisition::{Connect, Session, SessionHandle};
use flowmon::config::Settings;
use flowmon::error::FlowError;
use flowmon::sample_log::SampleLog;
use flowmon::simulator::Simulator;
use flowmon::transport::Transport;
use flowmon::{export, stats, telemetry};

#[derive(Parser)]
#[command(name = "flowmon")]
#[command(about = "Serial flow-sensor acquisition with simulated fallback", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial endpoints visible to the host
    ListPorts,

    /// Run an acquisition session until Ctrl-C
    Run {
        /// Serial endpoint, e.g. /dev/ttyUSB0 (overrides config)
        #[arg(long)]
        endpoint: Option<String>,

        /// Baud rate (overrides config)
        #[arg(long)]
        baud: Option<u32>,

        /// Force simulated mode even if a device is configured
        #[arg(long)]
        simulate: bool,

        /// Write a session report to this path on stop
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load_from(&cli.config)?;
    settings.validate()?;
    telemetry::init(&settings.application.log_level)?;

    match cli.command {
        Commands::ListPorts => list_ports(),
        Commands::Run {
            endpoint,
            baud,
            simulate,
            export,
        } => {
            if let Some(endpoint) = endpoint {
                settings.transport.endpoint = Some(endpoint);
            }
            if let Some(baud) = baud {
                settings.transport.baud = baud;
            }
            run(settings, simulate, export).await
        }
    }
}

#[cfg(feature = "instrument_serial")]
fn list_ports() -> Result<()> {
    let endpoints = flowmon::transport::serial::available_endpoints()?;
    if endpoints.is_empty() {
        println!("no serial endpoints found");
    }
    for ep in endpoints {
        println!("{}\t{}", ep.name, ep.description);
    }
    Ok(())
}

#[cfg(not(feature = "instrument_serial"))]
fn list_ports() -> Result<()> {
    Err(FlowError::FeatureNotEnabled("instrument_serial").into())
}

#[cfg(feature = "instrument_serial")]
fn open_transport(
    endpoint: &str,
    baud: u32,
    read_timeout: Duration,
) -> Result<Box<dyn Transport>, FlowError> {
    flowmon::transport::serial::SerialTransport::open(endpoint, baud, read_timeout)
        .map(|t| Box::new(t) as Box<dyn Transport>)
}

#[cfg(not(feature = "instrument_serial"))]
fn open_transport(
    _endpoint: &str,
    _baud: u32,
    _read_timeout: Duration,
) -> Result<Box<dyn Transport>, FlowError> {
    Err(FlowError::FeatureNotEnabled("instrument_serial"))
}

async fn run(settings: Settings, simulate: bool, export_path: Option<PathBuf>) -> Result<()> {
    let connect = if simulate {
        Connect::Simulated
    } else {
        match settings.transport.endpoint.as_deref() {
            Some(endpoint) => Connect::Device(open_transport(
                endpoint,
                settings.transport.baud,
                settings.transport.read_timeout,
            )),
            None => {
                warn!("no endpoint configured, running simulated");
                Connect::Simulated
            }
        }
    };

    let sample_log = if settings.sample_log.enabled {
        match SampleLog::create(&settings.sample_log.path) {
            Ok(log) => {
                info!(path = %log.path().display(), "sample log enabled");
                Some(log)
            }
            Err(e) => {
                warn!(error = %e, "sample log disabled");
                None
            }
        }
    } else {
        None
    };

    let simulator = Simulator::new(&settings.simulator);
    let session = Session::spawn(
        settings.acquisition.clone(),
        connect,
        simulator,
        sample_log,
    );

    info!("session running, press Ctrl-C to stop");
    watch_until_interrupt(&session).await;

    session.stop().await;

    let snapshot = session.buffer().snapshot();
    session.join().await;

    let stats = stats::compute(&snapshot);
    info!(
        samples = snapshot.len(),
        mean = stats.mean,
        min = stats.min,
        max = stats.max,
        peak = stats.peak,
        "session summary"
    );

    if let Some(path) = export_path {
        let path = if path.is_absolute() || path.parent().map_or(false, |p| !p.as_os_str().is_empty())
        {
            path
        } else {
            settings.export.output_dir.join(path)
        };
        let report = export::render(&settings.export.title, &snapshot, &stats)?;
        report.write_to(&path)?;
        println!("report written to {}", path.display());
    }

    Ok(())
}

/// Print a periodic status line until Ctrl-C arrives.
async fn watch_until_interrupt(session: &SessionHandle) {
    let buffer = session.buffer();
    let state = session.state();
    let mut status = tokio::time::interval(Duration::from_secs(10));
    status.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first interval tick fires immediately
    status.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, stopping");
                return;
            }
            _ = status.tick() => {
                let snapshot = buffer.snapshot();
                let stats = stats::compute(&snapshot);
                let run_state = state.borrow().clone();
                info!(
                    phase = ?run_state.phase,
                    mode = ?run_state.mode,
                    samples = snapshot.len(),
                    parse_drops = run_state.parse_drops,
                    mean = format!("{:.3}", stats.mean),
                    "status"
                );
            }
        }
    }
}
