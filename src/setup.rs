//! Repository preflight for the CI automation.
//!
//! Checks that the repository carries the secrets, variables and workflow
//! files the scheduled runs depend on, and flags a work command variable that
//! still points at the retired shell script.

use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use git2::Repository;
use regex::Regex;
use serde::Serialize;

use crate::board::RepoRef;
use crate::board::client::{ActionsVariable, BoardClient};
use crate::errors::{BoardError, WorkflowError};

pub const REQUIRED_SECRETS: &[&str] = &[
    "GH_PROJECT_TOKEN",
    "APP_USER_STANDARD_PASSWORD",
    "APP_USER_LOCKED_PASSWORD",
    "APP_USER_INVALID_PASSWORD",
];

pub const REQUIRED_VARIABLES: &[&str] = &[
    "BASE_URL",
    "APP_USER_STANDARD_USERNAME",
    "APP_USER_LOCKED_USERNAME",
    "APP_USER_INVALID_USERNAME",
];

pub const REQUIRED_WORKFLOWS: &[&str] = &[
    ".github/workflows/playwright.yml",
    ".github/workflows/project-ready-orchestrator.yml",
    ".github/workflows/project-ready-scheduler.yml",
];

const WORK_CMD_VARIABLE: &str = "PROJECT_READY_WORK_CMD";

static GITHUB_HTTPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https://github\.com/([^/]+)/([^/]+)$").unwrap());

static DEPRECATED_WORK_CMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"project-ready-work\.sh\b").unwrap());

/// Repository Actions settings.
#[async_trait]
pub trait RepoSettings: Send + Sync {
    async fn secret_names(&self, repo: &RepoRef) -> Result<Vec<String>, BoardError>;
    async fn variables(&self, repo: &RepoRef) -> Result<Vec<ActionsVariable>, BoardError>;
}

#[async_trait]
impl RepoSettings for BoardClient {
    async fn secret_names(&self, repo: &RepoRef) -> Result<Vec<String>, BoardError> {
        self.actions_secret_names(&repo.full_name()).await
    }

    async fn variables(&self, repo: &RepoRef) -> Result<Vec<ActionsVariable>, BoardError> {
        self.actions_variables(&repo.full_name()).await
    }
}

/// `owner/repo` from an HTTPS or SSH GitHub remote URL.
pub fn parse_origin_url(url: &str) -> Result<RepoRef, BoardError> {
    let trimmed = url.trim();
    let https = match trimmed.strip_prefix("git@github.com:") {
        Some(rest) => format!("https://github.com/{rest}"),
        None => trimmed.to_string(),
    };
    let https = https.strip_suffix(".git").unwrap_or(&https);
    let caps = GITHUB_HTTPS.captures(https).ok_or_else(|| {
        BoardError::Configuration(format!("unable to parse owner/repo from origin '{trimmed}'"))
    })?;
    Ok(RepoRef {
        owner: caps[1].to_string(),
        name: caps[2].to_string(),
    })
}

/// Repository named by the `origin` remote of the repository containing `dir`.
pub fn origin_repo(dir: &Path) -> Result<RepoRef, WorkflowError> {
    let repo = Repository::discover(dir).map_err(|_| WorkflowError::NotGitRepository)?;
    let remote = repo
        .find_remote("origin")
        .map_err(|_| WorkflowError::MissingOrigin)?;
    let url = remote.url().ok_or(WorkflowError::MissingOrigin)?;
    Ok(parse_origin_url(url)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupStatus {
    Ok,
    MissingConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub secrets: Vec<&'static str>,
    pub variables: Vec<&'static str>,
    pub workflows: Vec<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissingSettings {
    pub secrets: Vec<String>,
    pub variables: Vec<String>,
    pub workflows: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidSettings {
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    pub repo: String,
    pub status: SetupStatus,
    pub required: Requirements,
    pub missing: MissingSettings,
    pub invalid: InvalidSettings,
}

impl SetupReport {
    pub fn is_ok(&self) -> bool {
        self.status == SetupStatus::Ok
    }

    pub fn text_lines(&self) -> Vec<String> {
        fn list(values: &[String]) -> String {
            if values.is_empty() {
                "none".to_string()
            } else {
                values.join(", ")
            }
        }
        vec![
            format!("Repository: {}", self.repo),
            format!(
                "Status: {}",
                match self.status {
                    SetupStatus::Ok => "OK",
                    SetupStatus::MissingConfiguration => "MISSING_CONFIGURATION",
                }
            ),
            format!("Missing secrets: {}", list(&self.missing.secrets)),
            format!("Missing variables: {}", list(&self.missing.variables)),
            format!("Missing workflows: {}", list(&self.missing.workflows)),
            format!("Invalid variables: {}", list(&self.invalid.variables)),
        ]
    }
}

pub async fn verify_setup(
    settings: &dyn RepoSettings,
    repo: &RepoRef,
    root: &Path,
) -> Result<SetupReport, BoardError> {
    let secrets = settings.secret_names(repo).await?;
    let variables = settings.variables(repo).await?;

    let missing = MissingSettings {
        secrets: REQUIRED_SECRETS
            .iter()
            .filter(|name| !secrets.iter().any(|s| s == *name))
            .map(|name| name.to_string())
            .collect(),
        variables: REQUIRED_VARIABLES
            .iter()
            .filter(|name| !variables.iter().any(|v| v.name == **name))
            .map(|name| name.to_string())
            .collect(),
        workflows: REQUIRED_WORKFLOWS
            .iter()
            .filter(|file| !root.join(file).is_file())
            .map(|file| file.to_string())
            .collect(),
    };

    let mut invalid = InvalidSettings::default();
    if variables
        .iter()
        .any(|v| v.name == WORK_CMD_VARIABLE && DEPRECATED_WORK_CMD.is_match(&v.value))
    {
        invalid
            .variables
            .push(format!("{WORK_CMD_VARIABLE} uses deprecated '.sh' command"));
    }

    let complete = missing.secrets.is_empty()
        && missing.variables.is_empty()
        && missing.workflows.is_empty()
        && invalid.variables.is_empty();

    Ok(SetupReport {
        repo: repo.full_name(),
        status: if complete {
            SetupStatus::Ok
        } else {
            SetupStatus::MissingConfiguration
        },
        required: Requirements {
            secrets: REQUIRED_SECRETS.to_vec(),
            variables: REQUIRED_VARIABLES.to_vec(),
            workflows: REQUIRED_WORKFLOWS.to_vec(),
        },
        missing,
        invalid,
    })
}
