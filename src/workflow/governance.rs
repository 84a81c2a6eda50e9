//! Governance gate.
//!
//! The gate is an external command that writes a markdown report with a
//! findings summary (`- CRITICAL: n`, `- HIGH: n`, ...). Any CRITICAL or HIGH
//! finding blocks pull request creation.

use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::process::run_shell;
use crate::errors::WorkflowError;

static SEVERITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*-\s*(CRITICAL|HIGH|MEDIUM|LOW|ENV_BLOCKER):\s*(\d+)\s*$").unwrap()
});

/// Finding counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GovernanceCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub env_blocker: u32,
}

impl GovernanceCounts {
    /// Read the summary lines of a gate report; the first line per severity wins.
    pub fn parse(report: &str) -> Self {
        let mut counts = Self::default();
        let mut seen = [false; 5];
        for caps in SEVERITY_LINE.captures_iter(report) {
            let value: u32 = caps[2].parse().unwrap_or(0);
            let (slot, index) = match &caps[1] {
                "CRITICAL" => (&mut counts.critical, 0),
                "HIGH" => (&mut counts.high, 1),
                "MEDIUM" => (&mut counts.medium, 2),
                "LOW" => (&mut counts.low, 3),
                _ => (&mut counts.env_blocker, 4),
            };
            if !seen[index] {
                *slot = value;
                seen[index] = true;
            }
        }
        counts
    }

    pub fn is_blocking(&self) -> bool {
        self.critical > 0 || self.high > 0
    }
}

#[async_trait]
pub trait Gate: Send + Sync {
    /// Run the gate; a blocking report is an error.
    async fn check(&self) -> Result<GovernanceCounts, WorkflowError>;
}

/// Gate backed by a shell command and its report file.
pub struct CommandGate {
    pub command: String,
    /// Report path relative to `cwd`; stdout is parsed when it is absent.
    pub report: PathBuf,
    pub cwd: PathBuf,
}

#[async_trait]
impl Gate for CommandGate {
    async fn check(&self) -> Result<GovernanceCounts, WorkflowError> {
        // A report left by an earlier run must not decide this one.
        let report_path = self.cwd.join(&self.report);
        match tokio::fs::remove_file(&report_path).await {
            Ok(()) => debug!(path = %report_path.display(), "Removed previous governance report"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to remove {}", report_path.display()))
                    .into());
            }
        }

        info!(command = %self.command, "Running governance gate");
        let output = run_shell(&self.command, &[], &self.cwd, &[]).await?;

        let report = match tokio::fs::read_to_string(&report_path).await {
            Ok(content) => {
                debug!(path = %report_path.display(), "Governance counts read from report file");
                content
            }
            Err(_) => {
                debug!("Governance report not written; counts read from stdout");
                output.stdout.clone()
            }
        };
        let counts = GovernanceCounts::parse(&report);

        if counts.is_blocking() {
            return Err(WorkflowError::GovernanceFailed {
                critical: counts.critical,
                high: counts.high,
            });
        }
        if !output.success {
            return Err(WorkflowError::Command {
                command: self.command.clone(),
                details: output.details(),
            });
        }
        if counts.env_blocker > 0 {
            warn!(env_blocker = counts.env_blocker, "Governance gate reported environment blockers");
        }
        info!(
            medium = counts.medium,
            low = counts.low,
            "Governance gate passed"
        );
        Ok(counts)
    }
}
