//! Narrator application binary - composition root.
//!
//! Wires the narrator crates together for a host-less run:
//! 1. Load configuration from TOML, apply CLI overrides
//! 2. Build the coordinator over a shared-root host and a console speech device
//! 3. Feed a recorded trace through the service adapter
//! 4. Optionally print the narration decision log as JSON lines

mod cli;
mod console;
mod trace;

use std::path::Path;

use clap::Parser;

use narrator_core::config::NarratorConfig;
use narrator_core::error::Result;
use narrator_service::{AccessibilityEventCoordinator, ServiceAdapter, SharedRootHost};
use narrator_speech::DeviceInitStatus;

use crate::cli::{CliArgs, Command};
use crate::console::ConsoleSpeechDevice;

async fn run_replay(
    config: &NarratorConfig,
    trace_path: &Path,
    print_events: bool,
    fail_device: Option<String>,
) -> Result<()> {
    let lines = trace::load_trace(trace_path)?;
    let manual_init = lines
        .iter()
        .any(|line| matches!(line, trace::TraceLine::DeviceInit { .. }));

    let init = match (manual_init, fail_device) {
        (true, _) => None,
        (false, Some(reason)) => Some(DeviceInitStatus::Failure(reason)),
        (false, None) => Some(DeviceInitStatus::Success),
    };
    let host = SharedRootHost::new();
    let device = ConsoleSpeechDevice::new(init);
    let coordinator = AccessibilityEventCoordinator::new(host.clone(), device, config);
    let mut decisions = coordinator.subscribe();
    let mut adapter = ServiceAdapter::new(coordinator, &config.service);

    let log = trace::replay(&mut adapter, &host, &lines, &mut decisions).await;
    tracing::info!(
        signals = lines.len(),
        decisions = log.len(),
        state = %adapter.service().state(),
        "Replay finished"
    );

    if print_events {
        for event in &log {
            println!("{}", serde_json::to_string(event)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = NarratorConfig::load_or_default(&config_file);
    if let Some(threshold) = args.threshold {
        config.filter.threshold = threshold;
    }

    // Tracing goes to stderr so stdout carries only speech and JSON.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        path = %config_file.display(),
        "Starting Narrator v{}",
        env!("CARGO_PKG_VERSION")
    );

    match args.command {
        Command::Replay {
            trace,
            events,
            fail_device,
        } => {
            if let Err(e) = run_replay(&config, &trace, events, fail_device).await {
                tracing::error!(path = %trace.display(), error = %e, "Replay failed");
                return Err(e.into());
            }
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
