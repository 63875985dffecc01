//! CLI command definitions for the `tableside` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod session;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Real-time session server for shared-screen table games.
#[derive(Parser)]
#[command(name = "tableside", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export trace spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the session server.
    Serve {
        /// Port to listen on (overrides config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// Inspect and purge stored sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List stored sessions.
    #[command(alias = "ls")]
    List,

    /// Show a session's game state and chat log.
    Show {
        /// Session id.
        id: String,
    },

    /// Delete a session's stored chat log and game state.
    #[command(alias = "rm")]
    Purge {
        /// Session id.
        id: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Default log filter for the chosen verbosity. `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => match self.command {
                Commands::Serve { .. } => "warn,tableside=info",
                _ => "warn",
            },
            1 => "info,tableside=debug",
            _ => "trace",
        }
    }
}
