//! Ready card to pull request.
//!
//! Select the best ready card, move it to in-progress, run the work step and
//! the governance gate, open a pull request and move the card to in-review.
//! Any failure after the first move sends the card back to ready with a
//! diagnostic comment; rollback problems are logged and never replace the
//! original error.

use serde::Serialize;
use tracing::{error, info, warn};

use super::git::{PullRequestRequest, SourceControl, extract_pr_url};
use super::governance::Gate;
use super::state::{CardState, StatusNames, is_valid_transition};
use super::work::{WorkContext, WorkRunner};
use crate::board::{self, BoardApi, RepoRef};
use crate::errors::WorkflowError;
use crate::selector::{RankedCandidate, Selection, WorkType, select_ready_item};
use crate::util::slugify;

const BRANCH_SLUG_MAX: usize = 42;

#[derive(Debug, Clone)]
pub struct ReadyToPrRequest {
    pub owner: String,
    pub project_number: u32,
    pub repo: RepoRef,
    pub base_branch: String,
}

/// Branch, commit and pull request naming for one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPlan {
    pub branch: String,
    pub commit_message: String,
    pub pr_title: String,
}

impl CardPlan {
    pub fn new(work_type: WorkType, title: &str) -> Result<Self, WorkflowError> {
        let (prefix, commit_message, pr_title) = match work_type {
            WorkType::Bugfix => (
                "bugfix",
                format!("fix(e2e): resolve {title}"),
                format!("fix: {title}"),
            ),
            WorkType::NewTest => (
                "newTest",
                format!("test(e2e): add coverage for {title}"),
                format!("test: {title}"),
            ),
            WorkType::Unknown => {
                return Err(WorkflowError::UnsupportedWorkType(work_type.to_string()));
            }
        };
        let slug = match slugify(title, BRANCH_SLUG_MAX) {
            s if s.is_empty() => "project-card".to_string(),
            s => s,
        };
        Ok(Self {
            branch: format!("{prefix}/{slug}"),
            commit_message,
            pr_title,
        })
    }
}

/// Success payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadyToPrReport {
    pub status: &'static str,
    pub item_id: String,
    pub title: String,
    pub branch: String,
    pub work_type: WorkType,
    pub priority_label: String,
    pub commit_message: String,
    pub generated_test_file: String,
    pub pr_url: String,
    pub moved_to_in_progress: String,
    pub moved_to_in_review: String,
}

#[derive(Debug, Clone)]
pub enum ReadyToPrOutcome {
    NoWork,
    Completed(Box<ReadyToPrReport>),
}

pub fn pull_request_body(candidate: &RankedCandidate, branch: &str, generated: Option<&str>) -> String {
    let mut lines = vec![
        "## Summary".to_string(),
        format!(
            "- Automated Ready flow for issue: {}",
            candidate.item.content.title()
        ),
        format!("- Branch: `{branch}`"),
        match generated {
            Some(file) => format!("- Test generated: `{file}`"),
            None => "- Test generated: n/a".to_string(),
        },
        String::new(),
        "## Validation".to_string(),
        "- Governance gate executed".to_string(),
        "- Playwright test discovery attempted".to_string(),
    ];
    if let Some(number) = issue_number(candidate) {
        lines.push(String::new());
        lines.push(format!("Refs #{number}"));
    }
    lines.join("\n") + "\n"
}

/// Issue number of issue cards; pull request and draft cards get no comments.
fn issue_number(candidate: &RankedCandidate) -> Option<u64> {
    match &candidate.item.content {
        board::ItemContent::Issue(content) => content.number,
        _ => None,
    }
}

/// Collaborators of a ready-to-PR run.
pub struct ReadyToPr<'a> {
    pub board: &'a dyn BoardApi,
    pub scm: &'a dyn SourceControl,
    pub work: &'a dyn WorkRunner,
    pub gate: &'a dyn Gate,
    pub statuses: &'a StatusNames,
}

impl ReadyToPr<'_> {
    pub async fn run(&self, request: &ReadyToPrRequest) -> Result<ReadyToPrOutcome, WorkflowError> {
        self.scm.preflight().await?;

        let project = self
            .board
            .fetch_project(&request.owner, request.project_number, true)
            .await?;
        let repo_name = request.repo.full_name();
        let candidate = match select_ready_item(&project.items, &self.statuses.ready, Some(&repo_name)) {
            Selection::Found(candidate) => *candidate,
            Selection::NoWork => {
                info!(repo = %repo_name, "No Ready card available");
                return Ok(ReadyToPrOutcome::NoWork);
            }
        };
        let plan = CardPlan::new(candidate.work_type, candidate.item.content.title())?;
        info!(
            item_id = %candidate.item.id,
            work_type = %candidate.work_type,
            priority = candidate.priority.as_str(),
            branch = %plan.branch,
            "Selected ready card"
        );

        self.transition(request, &candidate, CardState::Ready, CardState::InProgress)
            .await?;

        match self.advance(request, &candidate, &plan).await {
            Ok(report) => Ok(ReadyToPrOutcome::Completed(Box::new(report))),
            Err(err) => {
                self.rollback(request, &candidate, &plan, &err).await;
                Err(err)
            }
        }
    }

    async fn transition(
        &self,
        request: &ReadyToPrRequest,
        candidate: &RankedCandidate,
        from: CardState,
        to: CardState,
    ) -> Result<String, WorkflowError> {
        if !is_valid_transition(from, to) {
            return Err(WorkflowError::Other(anyhow::anyhow!(
                "invalid card transition {from:?} -> {to:?}"
            )));
        }
        let outcome = board::move_item_to_status(
            self.board,
            &request.owner,
            request.project_number,
            &candidate.item.id,
            self.statuses.name(to),
        )
        .await?;
        Ok(outcome.target_status)
    }

    async fn advance(
        &self,
        request: &ReadyToPrRequest,
        candidate: &RankedCandidate,
        plan: &CardPlan,
    ) -> Result<ReadyToPrReport, WorkflowError> {
        self.scm.prepare_branch(&request.base_branch, &plan.branch).await?;

        let ctx = WorkContext {
            owner: request.owner.clone(),
            project_number: request.project_number,
            repo_full_name: request.repo.full_name(),
            base_branch: request.base_branch.clone(),
            branch_name: plan.branch.clone(),
            item_id: candidate.item.id.clone(),
            title: candidate.item.content.title().to_string(),
            body: candidate.item.content.body().to_string(),
            content_type: candidate.item.content.type_name().to_string(),
            issue_number: candidate.item.content.number(),
            work_type: candidate.work_type,
            priority_label: candidate.priority.as_str().to_string(),
        };
        let outcome = self.work.run(&ctx).await?;
        let generated = outcome.generated_test_file.as_deref();

        self.gate.check().await?;

        self.scm.commit_and_push(&plan.branch, &plan.commit_message).await?;
        let output = self
            .scm
            .create_pull_request(&PullRequestRequest {
                base: request.base_branch.clone(),
                head: plan.branch.clone(),
                title: plan.pr_title.clone(),
                body: pull_request_body(candidate, &plan.branch, generated),
            })
            .await?;
        let pr_url = extract_pr_url(&output).ok_or_else(|| WorkflowError::PrUrlNotDetected {
            status: self.statuses.in_review.clone(),
        })?;
        info!(pr_url = %pr_url, "Pull request created");

        let in_review = self
            .transition(request, candidate, CardState::InProgress, CardState::InReview)
            .await?;

        if let Some(number) = issue_number(candidate) {
            let comment = [
                "Automated flow completed.".to_string(),
                format!("- Branch: {}", plan.branch),
                format!("- Test file: {}", generated.unwrap_or("n/a")),
                format!("- PR: {pr_url}"),
            ]
            .join("\n");
            if let Err(err) = self.board.comment_on_issue(&request.repo, number, &comment).await {
                warn!(issue = number, error = %err, "Failed to comment on issue");
            }
        }

        Ok(ReadyToPrReport {
            status: "SUCCESS",
            item_id: candidate.item.id.clone(),
            title: candidate.item.content.title().to_string(),
            branch: plan.branch.clone(),
            work_type: candidate.work_type,
            priority_label: candidate.priority.as_str().to_string(),
            commit_message: plan.commit_message.clone(),
            generated_test_file: generated.unwrap_or_default().to_string(),
            pr_url,
            moved_to_in_progress: self.statuses.in_progress.clone(),
            moved_to_in_review: in_review,
        })
    }

    /// Single best-effort attempt to put the card back to ready.
    async fn rollback(
        &self,
        request: &ReadyToPrRequest,
        candidate: &RankedCandidate,
        plan: &CardPlan,
        cause: &WorkflowError,
    ) {
        let item_id = &candidate.item.id;
        if let Err(err) = self
            .transition(request, candidate, CardState::InProgress, CardState::Ready)
            .await
        {
            error!(
                item_id = %item_id,
                status = %self.statuses.ready,
                error = %err,
                "Failed to rollback item"
            );
            return;
        }
        warn!(item_id = %item_id, status = %self.statuses.ready, "Rolled back item");

        if let Some(number) = issue_number(candidate) {
            let comment = [
                "Automated flow failed and card was moved back to Ready.".to_string(),
                format!("- Branch: {}", plan.branch),
                format!("- Error: {cause}"),
            ]
            .join("\n");
            if let Err(err) = self.board.comment_on_issue(&request.repo, number, &comment).await {
                warn!(issue = number, error = %err, "Failed to comment on issue");
            }
        }
    }
}
