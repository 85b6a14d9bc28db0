//! CLI command definitions
//!
//! Defines the clap commands for the remote-apps CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a keyword suite defined in a YAML file
    Run {
        /// Path to the YAML suite file
        path: PathBuf,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Show or remove the rendezvous file
    Rendezvous {
        /// Rendezvous file (default: configured path)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Remove the file
        #[arg(long)]
        clear: bool,
    },

    /// View agent logs (for debugging)
    Logs {
        /// Number of lines to show (default: 50)
        #[arg(long, short = 'n', default_value = "50")]
        lines: usize,

        /// Clear the log file
        #[arg(long)]
        clear: bool,
    },

    /// [Hidden] Run as the agent of a launched application
    #[command(hide = true)]
    Agent {
        /// Rendezvous file the importer URL is written to
        rendezvous: PathBuf,

        /// Name the importer is published under
        application: String,

        /// Publish the importer on this port instead of a free one
        #[arg(long)]
        port: Option<u16>,

        /// Application entry point and its arguments
        #[arg(last = true)]
        entry_point: Vec<String>,
    },
}
