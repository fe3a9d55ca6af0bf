//! CLI argument definitions for the narrator binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Narrator - speaks what changes on screen.
#[derive(Parser, Debug)]
#[command(name = "narrator", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Significance threshold override.
    #[arg(short = 't', long = "threshold")]
    pub threshold: Option<i32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Replay a recorded JSON-lines trace of host signals.
    Replay {
        /// Trace file, one signal per line.
        trace: PathBuf,

        /// Print every narration decision as JSON after the replay.
        #[arg(long = "events")]
        events: bool,

        /// Make speech device creation fail with this reason.
        #[arg(long = "fail-device", value_name = "REASON")]
        fail_device: Option<String>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > NARRATOR_CONFIG env var > ~/.narrator/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("NARRATOR_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".narrator").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".narrator").join("config.toml");
    }
    PathBuf::from("config.toml")
}
