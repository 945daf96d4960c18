//! Command-line argument parsing

use clap::{Parser, ValueEnum};
use crate::commands::Command;

/// dpi-bypass - obfuscating TCP relays
///
/// Starts local listeners that relay traffic to remote endpoints through
/// an obfuscation method (shadowsocks, obfs4, custom, v2ray) so that Deep
/// Packet Inspection cannot fingerprint the tunnelled protocol.
#[derive(Parser, Debug)]
#[command(name = "dpi-bypass")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format for logs
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Log file path
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<String>,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}

impl Args {
    /// Whether the command is long-running and deserves a banner
    pub fn is_interactive_run(&self) -> bool {
        !self.quiet && matches!(self.command, Command::Run(ref run) if !run.dry_run)
    }
}
