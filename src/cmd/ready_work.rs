//! `ready-work`: built-in generator for the card described by `PROJECT_CARD_*`.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;

use readyflow::artifact::{ArtifactContext, ArtifactGenerator};
use readyflow::config::Settings;
use readyflow::intent::{IntentActions, RenamePair};
use readyflow::selector::WorkType;
use readyflow::workflow::run_ready_work;

use super::print_json;

#[derive(Serialize)]
struct WorkflowCompletedPayload<'a> {
    status: &'static str,
    actions: IntentActions,
    created: &'a [String],
    deleted: &'a [String],
    refactored: &'a [String],
    renamed: &'a [RenamePair],
    missing: &'a [String],
    warnings: &'a [String],
}

/// Card context from the work-step environment.
pub fn card_context(lookup: impl Fn(&str) -> Option<String>) -> ArtifactContext {
    let get = |key: &str| lookup(key).unwrap_or_default();
    let work_type = match get("PROJECT_CARD_WORK_TYPE").trim() {
        "" => WorkType::NewTest,
        other => WorkType::parse(other),
    };
    ArtifactContext {
        title: get("PROJECT_CARD_TITLE"),
        body: get("PROJECT_CARD_BODY"),
        work_type,
        seed: get("PROJECT_CARD_ISSUE_NUMBER").trim().parse().unwrap_or(0),
    }
}

pub async fn cmd_ready_work(project_dir: &Path) -> Result<ExitCode> {
    let settings = Settings::resolve(project_dir)?;
    let generator = ArtifactGenerator::new(settings.generator_config(project_dir));
    let ctx = card_context(|key| std::env::var(key).ok());

    let tests = settings.targeted_tests(project_dir);
    let (summary, actions) = run_ready_work(&generator, &ctx, tests.as_ref())
        .await
        .context("ready-work failed")?;

    for line in summary.report_lines() {
        println!("{line}");
    }
    print_json(&WorkflowCompletedPayload {
        status: "WORKFLOW_COMPLETED",
        actions,
        created: &summary.created,
        deleted: &summary.deleted,
        refactored: &summary.refactored,
        renamed: &summary.renamed,
        missing: &summary.missing,
        warnings: &summary.warnings,
    })?;
    Ok(ExitCode::SUCCESS)
}
