mod cli;
mod config;
mod db;
mod error;
mod forms;
mod import;
mod ipc;
mod logging;
mod model;
mod period;
mod search;
mod store;
mod views;

use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init_logging(cli.verbosity());

    let mut config = config::Config::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(ws) = cli.workspace.clone() {
        config.storage.workspace = Some(ws);
    }

    let startup_workspace = config.storage.workspace.clone();
    let mut state = ipc::AppState::new(config);
    if let Some(ws) = startup_workspace {
        ipc::select_workspace(&mut state, &ws)
            .with_context(|| format!("failed to open workspace {}", ws.display()))?;
    }
    info!(version = env!("CARGO_PKG_VERSION"), "freiarbeitd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => ipc::error::bad_json(e.to_string()),
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
