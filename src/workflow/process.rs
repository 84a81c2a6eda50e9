//! Subprocess helpers shared by the work step, the gate and source control.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::errors::WorkflowError;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout followed by stderr, for pattern scans over everything printed.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Best single diagnostic: stderr, else stdout, else the exit code.
    pub fn details(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            format!("Exited with status {}", self.code)
        }
    }
}

/// Run `program args...` in `cwd` and capture its output.
pub async fn run_command(
    program: &str,
    args: &[&str],
    cwd: &Path,
    envs: &[(&str, String)],
) -> Result<CommandOutput, WorkflowError> {
    let command_line = format!("{program} {}", args.join(" "));
    debug!(command = %command_line, "Running command");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(k, v)| (*k, v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| WorkflowError::Command {
            command: command_line.clone(),
            details: format!("Failed to run '{program}': {e}"),
        })?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a shell script through `sh -c`; extra `args` become `$1..$n`.
pub async fn run_shell(
    script: &str,
    args: &[&str],
    cwd: &Path,
    envs: &[(&str, String)],
) -> Result<CommandOutput, WorkflowError> {
    let mut full: Vec<&str> = vec!["-c", script, "sh"];
    full.extend_from_slice(args);
    run_command("sh", &full, cwd, envs).await
}

/// Like [`run_command`] but a non-zero exit is an error.
pub async fn run_checked(
    program: &str,
    args: &[&str],
    cwd: &Path,
) -> Result<CommandOutput, WorkflowError> {
    let output = run_command(program, args, cwd, &[]).await?;
    if !output.success {
        return Err(WorkflowError::Command {
            command: format!("{program} {}", args.join(" ")),
            details: output.details(),
        });
    }
    Ok(output)
}
