use super::{ComposeCommand, ComposeRunner, ProcessOutput, TIMEOUT_EXIT_CODE};
use crate::error::{FleetError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Runs the real compose tool, e.g. `docker compose` or `sudo docker compose`.
#[derive(Debug, Clone)]
pub struct ComposeCli {
    program: String,
    base_args: Vec<String>,
}

impl ComposeCli {
    /// Build from an argv prefix; the first element is the program.
    pub fn new(argv: &[String]) -> Self {
        match argv.split_first() {
            Some((program, rest)) => Self {
                program: program.clone(),
                base_args: rest.to_vec(),
            },
            None => Self {
                program: "docker".into(),
                base_args: vec!["compose".into()],
            },
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl ComposeRunner for ComposeCli {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn run(
        &self,
        directory: &Path,
        command: ComposeCommand,
        timeout: Duration,
    ) -> Result<ProcessOutput> {
        let child = Command::new(&self.program)
            .args(&self.base_args)
            .args(command.args())
            .current_dir(directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the output future on timeout must not leave the child behind.
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FleetError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                // Killed by a signal leaves no code; report it as a generic failure.
                let exit_code = output.status.code().unwrap_or(-1);
                debug!(exit_code, "compose finished");
                Ok(ProcessOutput {
                    exit_code,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    timed_out: false,
                })
            }
            Ok(Err(source)) => Err(FleetError::Spawn {
                program: self.program.clone(),
                source,
            }),
            Err(_) => {
                warn!(?timeout, "compose timed out, child killed");
                Ok(ProcessOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout: String::new(),
                    stderr: format!(
                        "timed out after {}",
                        humantime::format_duration(timeout)
                    ),
                    timed_out: true,
                })
            }
        }
    }
}
