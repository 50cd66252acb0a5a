use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Result of one shell invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Succeeded,
    Failed { code: Option<i32>, stderr: String },
    SpawnFailed(String),
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> CommandOutcome;
}

/// Runs commands through `sh -c` and waits for them to exit.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

const STDERR_TAIL: usize = 2048;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> CommandOutcome {
        let output = Command::new("sh")
            .args(["-c", command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("failed to spawn shell: {e}");
                return CommandOutcome::SpawnFailed(e.to_string());
            }
        };

        if output.status.success() {
            debug!(stdout_bytes = output.stdout.len(), "command succeeded");
            return CommandOutcome::Succeeded;
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let start = stderr
            .char_indices()
            .rev()
            .nth(STDERR_TAIL)
            .map_or(0, |(idx, _)| idx);
        CommandOutcome::Failed {
            code: output.status.code(),
            stderr: stderr[start..].trim().to_string(),
        }
    }
}
