//! Command-line interface for voxledger
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Spoken or typed money notes to validated ledger entries
#[derive(Parser, Debug)]
#[command(
    name = "voxledger",
    version,
    about = "Spoken or typed money notes to validated ledger entries"
)]
pub struct Cli {
    /// Subcommand to execute (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a request timeout.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `2m`), and compound (`1m30s`).
fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let duration = match s.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides config and HOST)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,
        /// Port to listen on (overrides config and PORT)
        #[arg(long, short = 'p', value_name = "PORT")]
        port: Option<u16>,
    },

    /// Parse one note and print the validated entry
    Parse {
        /// Typed note, used when there is no audio or its transcript is empty
        #[arg(long, short = 't', value_name = "TEXT")]
        text: Option<String>,
        /// Audio file to transcribe
        #[arg(long, short = 'a', value_name = "FILE")]
        audio: Option<PathBuf>,
        /// IANA timezone for "today" (e.g., Europe/Berlin)
        #[arg(long, value_name = "ZONE")]
        tz: Option<String>,
        /// Request deadline (default: from config). Examples: 30s, 2m, 1m30s
        #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
        timeout: Option<Duration>,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the configuration file path
    Path,
}

/// Log filter for the verbosity flags. `RUST_LOG` wins when set.
pub fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}
