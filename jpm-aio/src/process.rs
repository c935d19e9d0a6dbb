// jpm-aio/src/process.rs
use std::path::PathBuf;
use std::process::Output as StdOutput;
use std::process::Stdio;

use jpm_common::error::{JpmError, Result};
use tokio::process::Command;
use tracing::{debug, error};

/// Asynchronously runs an external command and captures its output.
///
/// The child is killed if the returned future is dropped, so a cancelled
/// install never leaves an extractor running in the background.
pub async fn run_command_async(
    command: &str,
    args: &[String],
    cwd: Option<PathBuf>,
) -> Result<StdOutput> {
    debug!("Running command: {} {:?} (cwd: {:?})", command, args, cwd);

    let mut cmd = Command::new(command);
    cmd.args(args);
    cmd.kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null()); // Prevent hanging on stdin

    match cmd.output().await {
        Ok(output) => {
            if !output.status.success() {
                debug!("Command failed with status: {}", output.status);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stdout.trim().is_empty() {
                    debug!("Stdout:\n{}", stdout.trim());
                }
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            } else {
                debug!("Command finished successfully.");
            }
            Ok(output) // Return the full output regardless of status
        }
        Err(e) => {
            error!("Failed to execute command '{}': {}", command, e);
            Err(JpmError::CommandExec(format!("{command}: {e}")))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_output_and_status() {
        let output = run_command_async("sh", &["-c".into(), "echo hi; exit 3".into()], None)
            .await
            .unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hi");
    }

    #[tokio::test]
    async fn missing_binary_is_command_exec_error() {
        let err = run_command_async("jpm-definitely-not-a-binary", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, JpmError::CommandExec(_)));
    }
}
