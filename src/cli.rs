use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tabled::{Table, Tabled};

use crate::domain::Signal;

#[derive(Parser, Debug)]
#[command(name = "market-sentinel")]
#[command(version)]
#[command(about = "Perpetual futures anomaly monitor with Feishu alerts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding default.toml and per-environment overrides
    #[arg(short, long, env = "SENTINEL_CONFIG_DIR", default_value = "config")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Check every configured symbol once and exit (for cron; needs a durable store)
    Run,
    /// Check every configured symbol on a fixed cadence until Ctrl-C (default)
    Daemon {
        /// Seconds between checks (defaults to monitor.schedule_interval_secs)
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Post a startup message to the webhook
        #[arg(long)]
        announce: bool,
    },
    /// Analyze one symbol and print the result without notifying
    Scan {
        /// Symbol to scan, e.g. BTCUSDT
        symbol: String,
    },
}

impl Cli {
    /// Subcommand to execute, `daemon` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Daemon {
            interval_secs: None,
            announce: false,
        })
    }
}

#[derive(Tabled)]
struct SignalRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Time (UTC)")]
    time: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Render detected signals for the `scan` command
pub fn render_signals(signals: &[Signal]) -> String {
    if signals.is_empty() {
        return "No signals detected".to_string();
    }

    let rows: Vec<SignalRow> = signals
        .iter()
        .map(|s| SignalRow {
            kind: s.kind.label(),
            key: s.suppression_key(),
            time: s.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            description: s.description.clone(),
        })
        .collect();

    Table::new(rows).to_string()
}
