//! `merge-to-done`: move issues linked to a merged pull request to done.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use readyflow::board::RepoRef;
use readyflow::config::Settings;
use readyflow::workflow::{MergeToDoneRequest, merge_to_done};

use super::{board_client, print_json};

pub async fn cmd_merge_to_done(
    project_dir: &Path,
    owner: &str,
    project_number: u32,
    repo: &str,
    pr_number: u64,
    done_status: Option<&str>,
) -> Result<ExitCode> {
    let mut settings = Settings::resolve(project_dir)?;
    if let Some(done) = done_status {
        settings.statuses.done = done.to_string();
    }
    let repo: RepoRef = repo.parse()?;
    let client = board_client(&settings)?;

    let request = MergeToDoneRequest {
        owner: owner.to_string(),
        project_number,
        repo,
        pr_number,
    };
    let report = merge_to_done(&client, &settings.statuses, &request)
        .await
        .context("merge-to-done failed")?;
    print_json(&report)?;
    Ok(ExitCode::SUCCESS)
}
