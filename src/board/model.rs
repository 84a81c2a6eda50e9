//! Board domain types and their decoding from GraphQL responses.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::{StatusOption, normalize_status};
use crate::errors::BoardError;

/// `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(BoardError::Configuration(format!(
                "invalid repo_full_name '{s}'. expected owner/repo"
            ))),
        }
    }
}

/// Issue or pull request content attached to a board item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkedContent {
    pub number: Option<u64>,
    pub title: String,
    pub body: String,
    pub url: String,
    pub repo_full_name: String,
    pub labels: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ItemContent {
    Issue(LinkedContent),
    PullRequest(LinkedContent),
    DraftItem { title: String, body: String },
    Unknown,
}

impl ItemContent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Issue(_) => "Issue",
            Self::PullRequest(_) => "PullRequest",
            Self::DraftItem { .. } => "DraftIssue",
            Self::Unknown => "Unknown",
        }
    }

    pub fn linked(&self) -> Option<&LinkedContent> {
        match self {
            Self::Issue(content) | Self::PullRequest(content) => Some(content),
            _ => None,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Issue(c) | Self::PullRequest(c) => &c.title,
            Self::DraftItem { title, .. } => title,
            Self::Unknown => "",
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Issue(c) | Self::PullRequest(c) => &c.body,
            Self::DraftItem { body, .. } => body,
            Self::Unknown => "",
        }
    }

    pub fn number(&self) -> Option<u64> {
        self.linked().and_then(|c| c.number)
    }

    pub fn repo_full_name(&self) -> Option<&str> {
        self.linked().map(|c| c.repo_full_name.as_str())
    }

    /// Labels of issues and pull requests; drafts carry none.
    pub fn labels(&self) -> Vec<String> {
        self.linked()
            .map(|c| c.labels.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_issue_in(&self, repo_full_name: &str) -> bool {
        matches!(self, Self::Issue(c) if c.repo_full_name == repo_full_name)
    }
}

/// One row on the project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardItem {
    pub id: String,
    pub content: ItemContent,
    pub status_name: String,
}

/// Any project field; only single-select fields carry options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub id: String,
    pub name: String,
    pub options: Option<Vec<StatusOption>>,
}

/// A project as fetched for a single operation.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub id: String,
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
    pub items: Vec<BoardItem>,
}

impl ProjectSnapshot {
    /// Decode a `repositoryOwner.projectV2` query response.
    pub fn from_response(response: &Value, owner: &str, number: u32) -> Result<Self, BoardError> {
        let project = response
            .pointer("/data/repositoryOwner/projectV2")
            .filter(|v| !v.is_null())
            .ok_or_else(|| BoardError::ProjectNotFound {
                owner: owner.to_string(),
                number,
            })?;

        let raw: RawProject = serde_json::from_value(project.clone())
            .map_err(|e| BoardError::Protocol(format!("unexpected project shape: {e}")))?;

        Ok(raw.into())
    }

    pub fn find_issue(&self, repo_full_name: &str, number: u64) -> Option<&BoardItem> {
        self.items
            .iter()
            .find(|item| item.content.is_issue_in(repo_full_name) && item.content.number() == Some(number))
    }
}

// ── Raw GraphQL shapes ──

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> Connection<T> {
    fn into_items(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Deserialize)]
struct RawProject {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    fields: Connection<RawField>,
    #[serde(default)]
    items: Connection<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    options: Option<Vec<StatusOption>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    id: String,
    content: Option<RawContent>,
    #[serde(default)]
    field_values: Connection<RawFieldValue>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum RawContent {
    Issue(RawLinked),
    PullRequest(RawLinked),
    DraftIssue(RawDraft),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawLinked {
    number: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    url: Option<String>,
    repository: Option<RawRepository>,
    #[serde(default)]
    labels: Option<Connection<RawLabel>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepository {
    name_with_owner: String,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawDraft {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFieldValue {
    name: Option<String>,
    field: Option<RawFieldRef>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFieldRef {
    name: Option<String>,
}

impl From<RawLinked> for LinkedContent {
    fn from(raw: RawLinked) -> Self {
        Self {
            number: raw.number,
            title: raw.title.unwrap_or_default(),
            body: raw.body.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            repo_full_name: raw.repository.map(|r| r.name_with_owner).unwrap_or_default(),
            labels: raw
                .labels
                .map(|c| c.into_items().map(|l| l.name).filter(|n| !n.is_empty()).collect())
                .unwrap_or_default(),
        }
    }
}

impl From<RawItem> for BoardItem {
    fn from(raw: RawItem) -> Self {
        let status_name = raw
            .field_values
            .into_items()
            .find(|value| {
                value
                    .field
                    .as_ref()
                    .and_then(|f| f.name.as_deref())
                    .is_some_and(|name| normalize_status(name) == "status")
            })
            .and_then(|value| value.name)
            .unwrap_or_default();

        let content = match raw.content {
            Some(RawContent::Issue(linked)) => ItemContent::Issue(linked.into()),
            Some(RawContent::PullRequest(linked)) => ItemContent::PullRequest(linked.into()),
            Some(RawContent::DraftIssue(draft)) => ItemContent::DraftItem {
                title: draft.title.unwrap_or_default(),
                body: draft.body.unwrap_or_default(),
            },
            Some(RawContent::Other) | None => ItemContent::Unknown,
        };

        Self {
            id: raw.id,
            content,
            status_name,
        }
    }
}

impl From<RawProject> for ProjectSnapshot {
    fn from(raw: RawProject) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            fields: raw
                .fields
                .into_items()
                .map(|f| FieldDescriptor {
                    id: f.id,
                    name: f.name,
                    options: f.options,
                })
                .collect(),
            items: raw.items.into_items().map(BoardItem::from).collect(),
        }
    }
}
