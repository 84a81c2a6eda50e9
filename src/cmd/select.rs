//! `select-ready`: print the highest-ranked ready card.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;

use readyflow::board::status::resolve_status_field;
use readyflow::board::{BoardApi, RepoRef};
use readyflow::config::Settings;
use readyflow::selector::{Selection, WorkType, WorkTypeSource, select_ready_item};

use super::{EXIT_NO_WORK, board_client, print_json};

#[derive(Serialize)]
struct ReadyItemPayload<'a> {
    status: &'static str,
    owner: &'a str,
    project_number: u32,
    project_id: &'a str,
    status_field_id: &'a str,
    ready_status: &'a str,
    item_id: &'a str,
    content_type: &'static str,
    title: &'a str,
    body: &'a str,
    content_url: &'a str,
    issue_number: Option<u64>,
    repository: &'a str,
    work_type: WorkType,
    work_type_source: WorkTypeSource,
    priority_label: &'static str,
    labels: &'a [String],
}

#[derive(Serialize)]
struct NoWorkPayload {
    status: &'static str,
    message: &'static str,
}

pub async fn cmd_select_ready(
    project_dir: &Path,
    owner: &str,
    project_number: u32,
    repo: Option<&str>,
    status: Option<&str>,
) -> Result<ExitCode> {
    let settings = Settings::resolve(project_dir)?;
    let repo_filter = repo
        .map(|r| r.parse::<RepoRef>().map(|r| r.full_name()))
        .transpose()?;
    let ready_status = status.unwrap_or(settings.statuses.ready.as_str());

    let client = board_client(&settings)?;
    let project = client
        .fetch_project(owner, project_number, true)
        .await
        .context("Failed to fetch project board")?;
    let field = resolve_status_field(&project.fields)?;

    let candidate = match select_ready_item(&project.items, ready_status, repo_filter.as_deref()) {
        Selection::Found(candidate) => candidate,
        Selection::NoWork => {
            print_json(&NoWorkPayload {
                status: "NO_WORK",
                message: "No Ready item found.",
            })?;
            return Ok(ExitCode::from(EXIT_NO_WORK));
        }
    };

    let linked = candidate.item.content.linked();
    print_json(&ReadyItemPayload {
        status: "READY_ITEM_FOUND",
        owner,
        project_number,
        project_id: &project.id,
        status_field_id: &field.id,
        ready_status,
        item_id: &candidate.item.id,
        content_type: candidate.item.content.type_name(),
        title: candidate.item.content.title(),
        body: candidate.item.content.body(),
        content_url: linked.map(|c| c.url.as_str()).unwrap_or_default(),
        issue_number: candidate.item.content.number(),
        repository: candidate.item.content.repo_full_name().unwrap_or_default(),
        work_type: candidate.work_type,
        work_type_source: candidate.work_type_source,
        priority_label: candidate.priority.as_str(),
        labels: &candidate.labels,
    })?;
    Ok(ExitCode::SUCCESS)
}
