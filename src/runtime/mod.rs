//! Invocation of the external compose tool.
//!
//! Every call names its project directory explicitly; nothing here changes the
//! process-wide working directory, so invocations for different apps can run
//! concurrently.

mod process;
mod status;
#[cfg(test)]
pub(crate) mod testing;

pub use process::ComposeCli;
pub use status::parse_ps_output;

use crate::error::Result;
use crate::model::ComposeAction;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Exit code reported for an invocation that was killed on timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// A compose subcommand plus its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCommand {
    Ps,
    Up,
    Down,
    Restart,
    Logs { tail: usize },
}

impl ComposeCommand {
    pub fn action(self) -> ComposeAction {
        match self {
            ComposeCommand::Ps => ComposeAction::Ps,
            ComposeCommand::Up => ComposeAction::Up,
            ComposeCommand::Down => ComposeAction::Down,
            ComposeCommand::Restart => ComposeAction::Restart,
            ComposeCommand::Logs { .. } => ComposeAction::Logs,
        }
    }

    pub fn args(self) -> Vec<String> {
        match self {
            ComposeCommand::Ps => vec!["ps".into(), "--format".into(), "json".into()],
            ComposeCommand::Up => vec!["up".into(), "-d".into()],
            ComposeCommand::Down => vec!["down".into()],
            ComposeCommand::Restart => vec!["restart".into()],
            ComposeCommand::Logs { tail } => {
                vec!["logs".into(), "--tail".into(), tail.to_string()]
            }
        }
    }
}

/// Captured result of one invocation. A non-zero exit is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Runs compose subcommands against a project directory.
#[async_trait]
pub trait ComposeRunner: Send + Sync {
    /// Run `command` with `directory` as the child's working directory.
    ///
    /// Errors only when the program cannot be spawned at all.
    async fn run(
        &self,
        directory: &Path,
        command: ComposeCommand,
        timeout: Duration,
    ) -> Result<ProcessOutput>;
}
