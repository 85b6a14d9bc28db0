//! CLI command handling
//!
//! Dispatches host-side CLI commands and formats output.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{logging, Error, Result};
use crate::rendezvous::RendezvousStore;
use crate::testing;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Agent { .. } => Err(Error::Internal(
            "agent command must be handled before dispatch".to_string(),
        )),

        Commands::Run { path, verbose } => {
            let result = testing::run_suite(&path, verbose).await?;
            if result.passed {
                Ok(())
            } else {
                Err(Error::TestAssertion(format!(
                    "Suite '{}' failed at step {}/{}: {}",
                    result.name,
                    result.steps_run,
                    result.steps_total,
                    result.error.unwrap_or_default()
                )))
            }
        }

        Commands::Rendezvous { path, clear } => {
            let path = match path {
                Some(path) => path,
                None => Config::load()?.rendezvous.path,
            };
            show_rendezvous(path, clear)
        }

        Commands::Logs { lines, clear } => show_logs(lines, clear),
    }
}

fn show_rendezvous(path: PathBuf, clear: bool) -> Result<()> {
    let store = RendezvousStore::new(path);

    if clear {
        store.remove()?;
        println!("Removed {}", store.path().display());
        return Ok(());
    }

    if !store.exists() {
        println!("No rendezvous file at {}", store.path().display());
        return Ok(());
    }

    let records = store.records()?;
    if records.is_empty() {
        println!("{} is empty", store.path().display());
        return Ok(());
    }

    println!("{}:", store.path().display());
    for record in records {
        println!("  {:<24} #{:<4} {}", record.application, record.index, record.url);
    }
    Ok(())
}

fn show_logs(lines: usize, clear: bool) -> Result<()> {
    let Some(path) = logging::agent_log_path() else {
        return Err(Error::Config("could not determine the log directory".to_string()));
    };

    if clear {
        logging::truncate_agent_log()?;
        println!("Cleared {}", path.display());
        return Ok(());
    }

    if !path.exists() {
        println!("No agent log at {}", path.display());
        return Ok(());
    }

    let file = std::fs::File::open(&path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let all: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = all.len().saturating_sub(lines);
    for line in &all[start..] {
        println!("{}", line);
    }
    Ok(())
}
