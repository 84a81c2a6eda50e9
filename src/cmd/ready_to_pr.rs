//! `ready-to-pr`: turn the best ready card into a pull request.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use readyflow::artifact::ArtifactGenerator;
use readyflow::board::RepoRef;
use readyflow::config::Settings;
use readyflow::workflow::{
    GitCli, InProcessWork, ReadyToPr, ReadyToPrOutcome, ReadyToPrRequest, ShellWork, WorkCommand,
    WorkRunner, resolve_work_command,
};

use super::{board_client, print_json};

pub async fn cmd_ready_to_pr(
    project_dir: &Path,
    owner: &str,
    project_number: u32,
    repo: &str,
    base: Option<&str>,
) -> Result<ExitCode> {
    let settings = Settings::resolve(project_dir)?;
    let repo: RepoRef = repo.parse()?;
    let client = board_client(&settings)?;

    let scm = GitCli::new(project_dir);
    let gate = settings.governance_gate(project_dir);
    let work: Box<dyn WorkRunner> = match resolve_work_command(settings.workflow.work_cmd.as_deref())
    {
        WorkCommand::BuiltIn => Box::new(InProcessWork::new(
            ArtifactGenerator::new(settings.generator_config(project_dir)),
            settings.targeted_tests(project_dir),
        )),
        WorkCommand::Shell(command) => Box::new(ShellWork::new(command, project_dir)),
    };

    let request = ReadyToPrRequest {
        owner: owner.to_string(),
        project_number,
        repo: repo.clone(),
        base_branch: base.unwrap_or(settings.workflow.base_branch.as_str()).to_string(),
    };
    let flow = ReadyToPr {
        board: &client,
        scm: &scm,
        work: work.as_ref(),
        gate: &gate,
        statuses: &settings.statuses,
    };

    match flow.run(&request).await.context("ready-to-pr failed")? {
        ReadyToPrOutcome::NoWork => println!("No Ready card available for {repo}."),
        ReadyToPrOutcome::Completed(report) => print_json(&report)?,
    }
    Ok(ExitCode::SUCCESS)
}
