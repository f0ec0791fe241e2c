mod cli;
mod config;
mod error;
mod metrics;
mod model;
mod orchestrator;
mod registry;
mod runtime;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "COMPOSE_FLEET_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr, or to a file under the cache dir while the panel owns the terminal.
fn init_logging(panel: bool) {
    let filter = env_filter();
    if !panel {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    }

    let file = dirs::cache_dir()
        .map(|d| d.join("compose-fleet"))
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("panel.log"))
                .ok()
        });
    match file {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .try_init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_json = args.json;
    init_logging(args.is_panel() && cfg!(feature = "tui"));

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if is_json {
                println!("{}", cli::error_json(&e));
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
