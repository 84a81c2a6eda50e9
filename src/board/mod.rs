//! GitHub Projects v2 board access.
//!
//! | Module    | Responsibility                                         |
//! |-----------|--------------------------------------------------------|
//! | `client`  | HTTP transport, bounded retries on reads               |
//! | `queries` | GraphQL documents                                      |
//! | `model`   | board items, project snapshots, response decoding      |
//! | `status`  | status field resolution and the status comparator      |
//!
//! The board is re-queried for every operation; nothing is cached between calls.

pub mod client;
pub mod model;
pub mod queries;
pub mod status;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

pub use client::{BoardClient, IssueComment, PullRequestInfo};
pub use model::{BoardItem, FieldDescriptor, ItemContent, LinkedContent, ProjectSnapshot, RepoRef};
pub use status::{StatusField, StatusOption, normalize_status, same_status};

use crate::errors::BoardError;

/// Board operations used by the selector and the workflows.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Fetch a project's fields, and its items when `with_items` is set.
    async fn fetch_project(
        &self,
        owner: &str,
        number: u32,
        with_items: bool,
    ) -> Result<ProjectSnapshot, BoardError>;

    /// Set an item's status option; returns the updated item id.
    async fn move_item(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<String, BoardError>;

    /// Issue numbers a pull request closes, restricted to the pull request's repository.
    async fn closing_issue_numbers(&self, repo: &RepoRef, pr_number: u64) -> Result<Vec<u64>, BoardError>;

    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequestInfo, BoardError>;

    async fn issue_comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<IssueComment>, BoardError>;

    async fn comment_on_issue(&self, repo: &RepoRef, number: u64, body: &str) -> Result<(), BoardError>;
}

#[async_trait]
impl BoardApi for BoardClient {
    async fn fetch_project(
        &self,
        owner: &str,
        number: u32,
        with_items: bool,
    ) -> Result<ProjectSnapshot, BoardError> {
        let document = if with_items {
            queries::PROJECT_ITEMS_QUERY
        } else {
            queries::PROJECT_FIELDS_QUERY
        };
        let response = self
            .query(document, json!({ "owner": owner, "number": number }))
            .await?;
        ProjectSnapshot::from_response(&response, owner, number)
    }

    async fn move_item(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<String, BoardError> {
        let response = self
            .mutate(
                queries::MOVE_ITEM_MUTATION,
                json!({
                    "project": project_id,
                    "item": item_id,
                    "field": field_id,
                    "option": option_id,
                }),
            )
            .await?;
        response
            .pointer("/data/updateProjectV2ItemFieldValue/projectV2Item/id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| BoardError::MoveFailed {
                item_id: item_id.to_string(),
                status: option_id.to_string(),
            })
    }

    async fn closing_issue_numbers(&self, repo: &RepoRef, pr_number: u64) -> Result<Vec<u64>, BoardError> {
        let response = self
            .query(
                queries::CLOSING_ISSUES_QUERY,
                json!({ "owner": repo.owner, "repo": repo.name, "number": pr_number }),
            )
            .await?;
        let nodes = response
            .pointer("/data/repository/pullRequest/closingIssuesReferences/nodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let full_name = repo.full_name();
        Ok(nodes
            .iter()
            .filter(|node| {
                node.pointer("/repository/nameWithOwner")
                    .and_then(Value::as_str)
                    .is_some_and(|name| name.eq_ignore_ascii_case(&full_name))
            })
            .filter_map(|node| node.get("number").and_then(Value::as_u64))
            .collect())
    }

    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequestInfo, BoardError> {
        BoardClient::pull_request(self, &repo.full_name(), number).await
    }

    async fn issue_comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<IssueComment>, BoardError> {
        BoardClient::issue_comments(self, &repo.full_name(), number).await
    }

    async fn comment_on_issue(&self, repo: &RepoRef, number: u64, body: &str) -> Result<(), BoardError> {
        BoardClient::comment_on_issue(self, &repo.full_name(), number, body).await
    }
}

/// Result of a successful status move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub project_id: String,
    pub item_id: String,
    /// Canonical option name as shown on the board.
    pub target_status: String,
}

/// Move an item to the option matching `status` on a freshly fetched schema.
pub async fn move_item_to_status(
    api: &dyn BoardApi,
    owner: &str,
    number: u32,
    item_id: &str,
    status: &str,
) -> Result<MoveOutcome, BoardError> {
    let project = api.fetch_project(owner, number, false).await?;
    let field = status::resolve_status_field(&project.fields)?;
    let option = status::require_status_option(&field, status)?;

    let moved = api
        .move_item(&project.id, item_id, &field.id, &option.id)
        .await
        .map_err(|err| match err {
            BoardError::MoveFailed { item_id, .. } => BoardError::MoveFailed {
                item_id,
                status: option.name.clone(),
            },
            other => other,
        })?;
    info!(item_id = %moved, status = %option.name, "Moved board item");

    Ok(MoveOutcome {
        project_id: project.id,
        item_id: moved,
        target_status: option.name.clone(),
    })
}

#[cfg(test)]
pub mod fake {
    //! In-memory board used by selector and workflow tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeBoard {
        pub project: Mutex<Option<ProjectSnapshot>>,
        /// `(item_id, option_id)` in call order.
        pub moves: Mutex<Vec<(String, String)>>,
        pub comments: Mutex<Vec<(u64, String)>>,
        pub issue_comment_bodies: HashMap<u64, Vec<String>>,
        pub closing: Vec<u64>,
        pub pull: Option<PullRequestInfo>,
        pub fail_moves_to: Option<String>,
    }

    impl FakeBoard {
        pub fn with_project(project: ProjectSnapshot) -> Self {
            Self {
                project: Mutex::new(Some(project)),
                ..Default::default()
            }
        }

        /// Option names moved to, resolved against the project's status field.
        pub fn moved_statuses(&self) -> Vec<(String, String)> {
            let project = self.project.lock().unwrap();
            let field = project
                .as_ref()
                .and_then(|p| status::resolve_status_field(&p.fields).ok());
            self.moves
                .lock()
                .unwrap()
                .iter()
                .map(|(item, option_id)| {
                    let name = field
                        .as_ref()
                        .and_then(|f| f.options.iter().find(|o| &o.id == option_id))
                        .map(|o| o.name.clone())
                        .unwrap_or_else(|| option_id.clone());
                    (item.clone(), name)
                })
                .collect()
        }
    }

    #[async_trait]
    impl BoardApi for FakeBoard {
        async fn fetch_project(
            &self,
            owner: &str,
            number: u32,
            _with_items: bool,
        ) -> Result<ProjectSnapshot, BoardError> {
            let mut project = self
                .project
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| BoardError::ProjectNotFound {
                    owner: owner.to_string(),
                    number,
                })?;
            // Reflect earlier moves so later fetches see current statuses.
            if let Ok(field) = status::resolve_status_field(&project.fields) {
                for (item_id, option_id) in self.moves.lock().unwrap().iter() {
                    if let Some(option) = field.options.iter().find(|o| &o.id == option_id)
                        && let Some(item) = project.items.iter_mut().find(|i| &i.id == item_id)
                    {
                        item.status_name = option.name.clone();
                    }
                }
            }
            Ok(project)
        }

        async fn move_item(
            &self,
            _project_id: &str,
            item_id: &str,
            _field_id: &str,
            option_id: &str,
        ) -> Result<String, BoardError> {
            if self.fail_moves_to.as_deref() == Some(option_id) {
                return Err(BoardError::MoveFailed {
                    item_id: item_id.to_string(),
                    status: option_id.to_string(),
                });
            }
            self.moves
                .lock()
                .unwrap()
                .push((item_id.to_string(), option_id.to_string()));
            Ok(item_id.to_string())
        }

        async fn closing_issue_numbers(&self, _repo: &RepoRef, _pr: u64) -> Result<Vec<u64>, BoardError> {
            Ok(self.closing.clone())
        }

        async fn pull_request(&self, _repo: &RepoRef, number: u64) -> Result<PullRequestInfo, BoardError> {
            self.pull
                .clone()
                .ok_or_else(|| BoardError::Request(format!("HTTP 404: pull {number}")))
        }

        async fn issue_comments(&self, _repo: &RepoRef, number: u64) -> Result<Vec<IssueComment>, BoardError> {
            Ok(self
                .issue_comment_bodies
                .get(&number)
                .map(|bodies| {
                    bodies
                        .iter()
                        .map(|b| IssueComment { body: Some(b.clone()) })
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn comment_on_issue(&self, _repo: &RepoRef, number: u64, body: &str) -> Result<(), BoardError> {
            self.comments.lock().unwrap().push((number, body.to_string()));
            Ok(())
        }
    }

    fn status_options() -> Vec<StatusOption> {
        ["Ready", "In progress", "In review", "Done"]
            .iter()
            .enumerate()
            .map(|(i, name)| StatusOption {
                id: format!("opt{i}"),
                name: name.to_string(),
            })
            .collect()
    }

    /// Project with a standard four-option status field.
    pub fn project(items: Vec<BoardItem>) -> ProjectSnapshot {
        ProjectSnapshot {
            id: "PVT_1".to_string(),
            title: "QA".to_string(),
            fields: vec![FieldDescriptor {
                id: "F_status".to_string(),
                name: "Status".to_string(),
                options: Some(status_options()),
            }],
            items,
        }
    }

    pub fn issue(id: &str, number: u64, title: &str, labels: &[&str], status: &str) -> BoardItem {
        BoardItem {
            id: id.to_string(),
            content: ItemContent::Issue(LinkedContent {
                number: Some(number),
                title: title.to_string(),
                body: String::new(),
                url: format!("https://github.com/acme/shop/issues/{number}"),
                repo_full_name: "acme/shop".to_string(),
                labels: labels.iter().map(|l| l.to_string()).collect(),
            }),
            status_name: status.to_string(),
        }
    }
}
