//! Command-line argument parsing for TriageMate
//!
//! Subcommands for one-shot runs plus count-based verbosity flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// TriageMate - LLM-backed support ticket triage with provider failover
#[derive(Parser, Debug)]
#[command(name = "triagemate")]
#[command(version = "0.2.0")]
#[command(about = "Triage support tickets into routing decisions", long_about = None)]
pub struct Args {
    /// Data directory holding tickets, customers, and the knowledge base
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to an alternate configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v shows attempts, -vv adds the event stream)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress everything except decisions)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand; without one an interactive session starts
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// One-shot modes; omitting a subcommand starts the interactive session
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Triage a single ticket by id
    Run {
        /// Ticket id from the loaded set
        #[arg(short, long)]
        ticket: String,
    },

    /// Triage every loaded ticket
    Batch {
        /// Number of tickets processed concurrently
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
    },

    /// Print the resolved configuration and exit
    Config,
}

/// How much the console prints during and after runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Resolve the effective verbosity; -q wins over any -v count
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show per-attempt token usage
    pub fn show_usage(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Check if should show the raw telemetry event stream
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::VeryVerbose)
    }
}
