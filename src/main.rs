//! remote-apps - drive keyword libraries inside launched applications
//!
//! The host side runs keyword suites against applications it starts; the
//! hidden `agent` subcommand is what runs inside each launched application.

use clap::Parser;
use commands::Commands;
use remote_apps::common::logging;
use remote_apps::{agent, cli, commands};

#[derive(Parser)]
#[command(name = "remote-apps", about = "Remote keyword libraries for launched applications")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Agent {
            rendezvous,
            application,
            port,
            entry_point,
        } => {
            logging::init_agent();
            agent::run(rendezvous, application, port, entry_point).await
        }
        command => {
            logging::init_cli();
            cli::dispatch(command).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
