//! `verify-setup`: repository preflight for the CI automation.
//!
//! Exit codes: 0 when complete, 1 when configuration is missing, 2 when the
//! check itself could not run.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use console::style;

use readyflow::board::RepoRef;
use readyflow::config::Settings;
use readyflow::setup::{SetupReport, origin_repo, verify_setup};

use super::board_client;

const EXIT_MISSING_CONFIGURATION: u8 = 1;
const EXIT_PREFLIGHT_FAILED: u8 = 2;

pub async fn cmd_verify_setup(project_dir: &Path, repo: Option<&str>, json: bool) -> ExitCode {
    let report = match check(project_dir, repo).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::from(EXIT_PREFLIGHT_FAILED);
        }
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("Error: {err}");
                return ExitCode::from(EXIT_PREFLIGHT_FAILED);
            }
        }
    } else {
        for line in report.text_lines() {
            match line.strip_prefix("Status: ") {
                Some(status) if report.is_ok() => println!("Status: {}", style(status).green().bold()),
                Some(status) => println!("Status: {}", style(status).red().bold()),
                None => println!("{line}"),
            }
        }
    }

    if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_MISSING_CONFIGURATION)
    }
}

async fn check(project_dir: &Path, repo: Option<&str>) -> Result<SetupReport> {
    let repo: RepoRef = match repo {
        Some(value) => value.parse()?,
        None => origin_repo(project_dir)?,
    };
    let settings = Settings::resolve(project_dir)?;
    let client = board_client(&settings)?;
    let report = verify_setup(&client, &repo, project_dir)
        .await
        .with_context(|| format!("Failed to read Actions settings for {repo}"))?;
    Ok(report)
}
