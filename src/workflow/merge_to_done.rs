//! Merged pull request to done.
//!
//! Linked issues come from the pull request's closing references and from
//! `fixes #n`-style keywords in its body. When neither yields anything, issues
//! in review whose comments mention the pull request URL are used instead.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use super::state::StatusNames;
use crate::board::status::{require_status_option, resolve_status_field};
use crate::board::{BoardApi, RepoRef, same_status};
use crate::errors::WorkflowError;

static ISSUE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:refs?|related to|close[sd]?|fix(?:e[sd])?|resolve[sd]?)\s+#(\d+)").unwrap()
});

#[derive(Debug, Clone)]
pub struct MergeToDoneRequest {
    pub owner: String,
    pub project_number: u32,
    pub repo: RepoRef,
    pub pr_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeToDoneReport {
    PullRequestNotMerged {
        pull_request: u64,
    },
    NoLinkedIssues {
        pull_request: u64,
        repo: String,
    },
    DoneSyncCompleted {
        pull_request: u64,
        repo: String,
        linked_issues: Vec<u64>,
        moved_to_done: Vec<u64>,
        already_done: Vec<u64>,
        not_found_in_project: Vec<u64>,
        target_status: String,
    },
}

/// Issue numbers referenced with a linking keyword, e.g. `Refs #12` or `closes #4`.
pub fn issue_numbers_from_text(text: &str) -> BTreeSet<u64> {
    ISSUE_KEYWORD
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .filter(|n| *n > 0)
        .collect()
}

pub async fn merge_to_done(
    board: &dyn BoardApi,
    statuses: &StatusNames,
    request: &MergeToDoneRequest,
) -> Result<MergeToDoneReport, WorkflowError> {
    let repo_name = request.repo.full_name();
    let pr = board.pull_request(&request.repo, request.pr_number).await?;
    if !pr.is_merged() {
        info!(pull_request = request.pr_number, "Pull request is not merged");
        return Ok(MergeToDoneReport::PullRequestNotMerged {
            pull_request: request.pr_number,
        });
    }

    let mut linked: BTreeSet<u64> = board
        .closing_issue_numbers(&request.repo, request.pr_number)
        .await?
        .into_iter()
        .collect();
    linked.extend(issue_numbers_from_text(pr.body.as_deref().unwrap_or_default()));

    let project = board
        .fetch_project(&request.owner, request.project_number, true)
        .await?;
    let field = resolve_status_field(&project.fields)?;
    let done = require_status_option(&field, &statuses.done)?;

    if linked.is_empty() && !pr.html_url.is_empty() {
        for item in &project.items {
            if !item.content.is_issue_in(&repo_name) || !same_status(&item.status_name, &statuses.in_review) {
                continue;
            }
            let Some(number) = item.content.number() else {
                continue;
            };
            let comments = board.issue_comments(&request.repo, number).await?;
            if comments
                .iter()
                .any(|c| c.body.as_deref().is_some_and(|b| b.contains(&pr.html_url)))
            {
                debug!(issue = number, "Linked through pull request URL in comments");
                linked.insert(number);
            }
        }
    }

    if linked.is_empty() {
        return Ok(MergeToDoneReport::NoLinkedIssues {
            pull_request: request.pr_number,
            repo: repo_name,
        });
    }

    let mut moved = Vec::new();
    let mut already_done = Vec::new();
    let mut not_found = Vec::new();
    for &number in &linked {
        let Some(item) = project.find_issue(&repo_name, number) else {
            not_found.push(number);
            continue;
        };
        if same_status(&item.status_name, &done.name) {
            already_done.push(number);
            continue;
        }
        board
            .move_item(&project.id, &item.id, &field.id, &done.id)
            .await?;
        info!(issue = number, item_id = %item.id, status = %done.name, "Moved issue to done");
        moved.push(number);
    }

    Ok(MergeToDoneReport::DoneSyncCompleted {
        pull_request: request.pr_number,
        repo: repo_name,
        linked_issues: linked.into_iter().collect(),
        moved_to_done: moved,
        already_done,
        not_found_in_project: not_found,
        target_status: done.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::board::PullRequestInfo;
    use crate::board::fake::{FakeBoard, issue, project};
    use crate::errors::BoardError;

    const PR_URL: &str = "https://github.com/acme/shop/pull/77";

    fn request() -> MergeToDoneRequest {
        MergeToDoneRequest {
            owner: "acme".to_string(),
            project_number: 3,
            repo: "acme/shop".parse().unwrap(),
            pr_number: 77,
        }
    }

    fn merged_pr(body: &str) -> PullRequestInfo {
        PullRequestInfo {
            number: 77,
            merged_at: Some("2026-10-01T10:00:00Z".to_string()),
            html_url: PR_URL.to_string(),
            body: Some(body.to_string()),
        }
    }

    fn board_with(items: Vec<crate::board::BoardItem>, pr: PullRequestInfo) -> FakeBoard {
        FakeBoard {
            pull: Some(pr),
            ..FakeBoard::with_project(project(items))
        }
    }

    async fn run(board: &FakeBoard) -> Result<MergeToDoneReport, WorkflowError> {
        merge_to_done(board, &StatusNames::default(), &request()).await
    }

    #[test]
    fn keyword_scan() {
        let found = issue_numbers_from_text("Fixes #3, refs #12 and Related to #5. See #99. closed #0");
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![3, 5, 12]);
    }

    #[tokio::test]
    async fn unmerged_pull_request_is_reported() {
        let mut pr = merged_pr("");
        pr.merged_at = None;
        let board = board_with(vec![], pr);
        assert_eq!(
            run(&board).await.unwrap(),
            MergeToDoneReport::PullRequestNotMerged { pull_request: 77 }
        );
        assert!(board.moves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closing_references_and_body_keywords() {
        let mut board = board_with(
            vec![
                issue("I4", 4, "a", &[], "In review"),
                issue("I6", 6, "b", &[], "Done"),
            ],
            merged_pr("Refs #6\nalso closes #8"),
        );
        board.closing = vec![4];

        let report = run(&board).await.unwrap();
        assert_eq!(
            report,
            MergeToDoneReport::DoneSyncCompleted {
                pull_request: 77,
                repo: "acme/shop".to_string(),
                linked_issues: vec![4, 6, 8],
                moved_to_done: vec![4],
                already_done: vec![6],
                not_found_in_project: vec![8],
                target_status: "Done".to_string(),
            }
        );
        assert_eq!(board.moved_statuses(), vec![("I4".to_string(), "Done".to_string())]);
    }

    #[tokio::test]
    async fn falls_back_to_comments_mentioning_the_pr() {
        let mut comments = HashMap::new();
        comments.insert(4, vec![format!("Automated flow completed.\n- PR: {PR_URL}")]);
        comments.insert(5, vec!["unrelated".to_string()]);
        let mut board = board_with(
            vec![
                issue("I4", 4, "a", &[], "In review"),
                issue("I5", 5, "b", &[], "In review"),
                issue("I7", 7, "c", &[], "In progress"),
            ],
            merged_pr("no keywords here"),
        );
        board.issue_comment_bodies = comments;

        match run(&board).await.unwrap() {
            MergeToDoneReport::DoneSyncCompleted {
                linked_issues,
                moved_to_done,
                ..
            } => {
                assert_eq!(linked_issues, vec![4]);
                assert_eq!(moved_to_done, vec![4]);
            }
            other => panic!("Expected DoneSyncCompleted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nothing_linked() {
        let board = board_with(vec![issue("I4", 4, "a", &[], "In review")], merged_pr(""));
        assert_eq!(
            run(&board).await.unwrap(),
            MergeToDoneReport::NoLinkedIssues {
                pull_request: 77,
                repo: "acme/shop".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn unknown_done_status_lists_options() {
        let board = board_with(vec![], merged_pr("Refs #1"));
        let statuses = StatusNames {
            done: "Shipped".to_string(),
            ..Default::default()
        };
        let err = merge_to_done(&board, &statuses, &request()).await.unwrap_err();
        match err {
            WorkflowError::Board(BoardError::Schema { available, .. }) => {
                assert!(available.iter().any(|o| o.contains("Done")));
            }
            other => panic!("Expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn report_serializes_with_status_tag() {
        let json = serde_json::to_value(MergeToDoneReport::NoLinkedIssues {
            pull_request: 3,
            repo: "acme/shop".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "NO_LINKED_ISSUES");
        assert_eq!(json["pull_request"], 3);
    }
}
