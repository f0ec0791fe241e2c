use crate::config::{split_command, FleetConfig};
use crate::error::FleetError;
use crate::orchestrator::{process_action_completion, Fleet};
use crate::text_summary::{self, TextSummary};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "compose-fleet",
    version,
    about = "Discover, inspect and start/stop docker compose projects"
)]
pub struct Cli {
    /// Directory whose subdirectories are compose projects (repeatable; default: home)
    #[arg(long = "root", global = true)]
    pub roots: Vec<PathBuf>,

    /// Compose command prefix, e.g. "sudo docker compose" or "podman compose"
    #[arg(long, global = true)]
    pub compose_cmd: Option<String>,

    /// Timeout for up/down/restart
    #[arg(long, global = true)]
    pub action_timeout: Option<humantime::Duration>,

    /// Timeout for ps/logs
    #[arg(long, global = true)]
    pub probe_timeout: Option<humantime::Duration>,

    /// Config file (default: <config dir>/compose-fleet/config.json when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON results instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List apps with their status
    List,
    /// Show one app and its containers
    Show { name: String },
    /// Start a stopped app or stop a running one
    Toggle {
        name: String,
        /// Re-probe the app after a successful toggle
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        refresh: bool,
    },
    /// Print recent logs
    Logs {
        name: String,
        /// Number of lines from the end of the logs
        #[arg(short = 'n', long)]
        lines: Option<usize>,
    },
    /// Restart all containers of an app
    Restart {
        name: String,
        /// Re-probe the app after a successful restart
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        refresh: bool,
    },
    /// Scan the roots and report what was found
    Discover,
    /// Interactive panel (default)
    Panel,
}

impl Cli {
    pub fn is_panel(&self) -> bool {
        matches!(self.command, None | Some(Command::Panel))
    }
}

/// Build a `FleetConfig` from the config file and CLI overrides.
pub fn build_config(args: &Cli) -> Result<FleetConfig> {
    let mut cfg = FleetConfig::resolve(args.config.as_deref())?;
    if !args.roots.is_empty() {
        cfg.roots = args.roots.clone();
    }
    if let Some(raw) = args.compose_cmd.as_deref() {
        let argv = split_command(raw);
        if argv.is_empty() {
            return Err(anyhow::anyhow!("--compose-cmd must not be empty"));
        }
        cfg.compose_command = argv;
    }
    if let Some(t) = args.action_timeout {
        cfg.action_timeout = Duration::from(t);
    }
    if let Some(t) = args.probe_timeout {
        cfg.probe_timeout = Duration::from(t);
    }
    if cfg.roots.is_empty() {
        return Err(anyhow::anyhow!(
            "no fleet root configured and no home directory found; pass --root"
        ));
    }
    cfg.validate()?;
    Ok(cfg)
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args).context("load configuration")?;

    if args.is_panel() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            let fleet = Fleet::from_config(&cfg);
            return run_command(&args, &fleet, &Command::List).await;
        }
    }

    let fleet = Fleet::from_config(&cfg);
    let command = args.command.clone().unwrap_or(Command::List);
    run_command(&args, &fleet, &command).await
}

async fn run_command(args: &Cli, fleet: &Fleet, command: &Command) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();

    let discovery = fleet.discover().await;
    if !args.json {
        if let Some(failure) = discovery.failure.as_deref() {
            let _ = out_tx.send(OutputLine::Stderr(format!("warning: {failure}")));
        }
    }

    let res = execute(args, fleet, command, discovery, &out_tx).await;

    drop(out_tx);
    let _ = out_handle.await;
    res
}

async fn execute(
    args: &Cli,
    fleet: &Fleet,
    command: &Command,
    discovery: crate::registry::Discovery,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let emit = |summary: TextSummary| {
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    };
    let emit_json = |value: &dyn erased::Json| -> Result<()> {
        let _ = out_tx.send(OutputLine::Stdout(value.to_pretty()?));
        Ok(())
    };

    match command {
        Command::List | Command::Panel => {
            let apps = fleet.list_apps().await;
            if args.json {
                emit_json(&apps)?;
            } else {
                emit(text_summary::build_list_summary(&apps));
            }
        }
        Command::Discover => {
            if args.json {
                emit_json(&discovery)?;
            } else {
                emit(text_summary::build_discovery_summary(&discovery));
            }
        }
        Command::Show { name } => {
            let app = fleet.inspect(name).await?;
            if args.json {
                emit_json(&app)?;
            } else {
                emit(text_summary::build_app_detail(&app));
            }
        }
        Command::Toggle { name, refresh } => {
            let outcome = fleet.toggle(name).await?;
            let processed = process_action_completion(fleet, name, *refresh).await;
            if args.json {
                #[derive(Serialize)]
                struct ToggleReport<'a> {
                    success: bool,
                    #[serde(flatten)]
                    outcome: &'a crate::model::ToggleOutcome,
                    app: Option<crate::model::AppSummary>,
                }
                emit_json(&ToggleReport {
                    success: true,
                    outcome: &outcome,
                    app: processed.summary,
                })?;
            } else {
                let _ = out_tx.send(OutputLine::Stdout(format!(
                    "{} {}",
                    outcome.name,
                    outcome.action.as_str()
                )));
                if let Some(s) = processed.summary.as_ref() {
                    let _ = out_tx.send(OutputLine::Stdout(format!(
                        "{}: {} ({})",
                        s.name,
                        text_summary::status_label(s),
                        text_summary::containers_label(s)
                    )));
                }
                for msg in processed.messages {
                    let _ = out_tx.send(OutputLine::Stderr(msg));
                }
            }
        }
        Command::Restart { name, refresh } => {
            fleet.restart(name).await?;
            let processed = process_action_completion(fleet, name, *refresh).await;
            if args.json {
                #[derive(Serialize)]
                struct RestartReport {
                    success: bool,
                    app: Option<crate::model::AppSummary>,
                }
                emit_json(&RestartReport {
                    success: true,
                    app: processed.summary,
                })?;
            } else {
                let _ = out_tx.send(OutputLine::Stdout(format!("{name} restarted")));
                for msg in processed.messages {
                    let _ = out_tx.send(OutputLine::Stderr(msg));
                }
            }
        }
        Command::Logs { name, lines } => {
            let text = fleet.logs(name, *lines).await?;
            if args.json {
                emit_json(&serde_json::json!({ "name": name, "logs": text }))?;
            } else {
                for line in text.lines() {
                    let _ = out_tx.send(OutputLine::Stdout(line.to_string()));
                }
            }
        }
    }
    Ok(())
}

/// Structured error document printed in `--json` mode.
pub fn error_json(err: &anyhow::Error) -> String {
    let kind = err
        .downcast_ref::<FleetError>()
        .map(FleetError::kind)
        .unwrap_or("error");
    serde_json::json!({ "error": { "kind": kind, "message": format!("{err:#}") } }).to_string()
}

mod erased {
    use serde::Serialize;

    /// Object-safe pretty JSON rendering so one closure can print any result type.
    pub trait Json {
        fn to_pretty(&self) -> anyhow::Result<String>;
    }

    impl<T: Serialize + ?Sized> Json for T {
        fn to_pretty(&self) -> anyhow::Result<String> {
            Ok(serde_json::to_string_pretty(self)?)
        }
    }
}
