//! Typed error hierarchy for readyflow.
//!
//! Three top-level enums cover the three subsystems:
//! - `BoardError`: board API, schema and status resolution failures
//! - `ArtifactError`: test-artifact generation and file operation failures
//! - `WorkflowError`: orchestrator failures (git, work step, governance, PR)
//!
//! `ErrorClass` folds any of them into the user-facing taxonomy that drives
//! exit codes and rollback decisions.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the board client and status resolver.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{message}. Available: {}", available.join(", "))]
    Schema {
        message: String,
        available: Vec<String>,
    },

    #[error("Malformed response from board API: {0}")]
    Protocol(String),

    #[error("Board API unavailable after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },

    #[error("Board API request failed: {0}")]
    Request(String),

    #[error("Failed to move item '{item_id}' to '{status}'")]
    MoveFailed { item_id: String, status: String },

    #[error("Project not found for owner '{owner}' and number '{number}'")]
    ProjectNotFound { owner: String, number: u32 },
}

impl BoardError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            available: Vec::new(),
        }
    }
}

/// Errors from the artifact generator.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Target file already exists: {}", path.display())]
    Exists { path: PathBuf },

    #[error("Refusing to touch path outside {}: {}", sandbox.display(), path.display())]
    OutsideSandbox { path: PathBuf, sandbox: PathBuf },

    #[error("Refusing to touch non-spec file: {}", path.display())]
    NotSpecFile { path: PathBuf },

    #[error("Delete was requested but no explicit test file path was found in card text")]
    DeleteWithoutPaths,

    #[error(
        "Could not extract product name from card text. Expected pattern like \"Sauce Labs <Product Name>\""
    )]
    MissingProductName,

    #[error("Product catalog error: {0}")]
    Catalog(String),

    #[error("No changes were produced for requested non-create actions")]
    NoChanges,

    #[error(
        "No actionable intent found in card text for {work_type} flow. Add an explicit refactor/delete/create instruction"
    )]
    NoActionableIntent { work_type: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the ready-to-PR and merge-to-done workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Current directory is not a git repository")]
    NotGitRepository,

    #[error("Git remote 'origin' not configured")]
    MissingOrigin,

    #[error("Unsupported work type '{0}'. Expected bugfix or newTest")]
    UnsupportedWorkType(String),

    #[error("Command failed: {command}\n{details}")]
    Command { command: String, details: String },

    #[error("Work command failed.\n{0}")]
    WorkFailed(String),

    #[error("Governance gate failed (CRITICAL: {critical}, HIGH: {high})")]
    GovernanceFailed { critical: u32, high: u32 },

    #[error("Pull request creation failed; item will not be moved to in review.\n{0}")]
    PrCreationFailed(String),

    #[error("PR URL not detected; item will not be moved to '{status}'")]
    PrUrlNotDetected { status: String },

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// User-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Schema,
    Protocol,
    TransientNetwork,
    ArtifactConflict,
    WorkflowFailure,
}

impl ErrorClass {
    /// Classify an error chain by its first recognised typed cause.
    pub fn of(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(board) = cause.downcast_ref::<BoardError>() {
                return Self::from_board(board);
            }
            if cause.downcast_ref::<ArtifactError>().is_some() {
                return Self::ArtifactConflict;
            }
            if let Some(workflow) = cause.downcast_ref::<WorkflowError>() {
                return match workflow {
                    WorkflowError::Board(board) => Self::from_board(board),
                    WorkflowError::Artifact(_) => Self::ArtifactConflict,
                    WorkflowError::NotGitRepository | WorkflowError::MissingOrigin => {
                        Self::Configuration
                    }
                    _ => Self::WorkflowFailure,
                };
            }
        }
        Self::WorkflowFailure
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Schema => "schema",
            Self::Protocol => "protocol",
            Self::TransientNetwork => "transient network",
            Self::ArtifactConflict => "artifact conflict",
            Self::WorkflowFailure => "workflow failure",
        }
    }

    fn from_board(err: &BoardError) -> Self {
        match err {
            BoardError::Configuration(_) => Self::Configuration,
            BoardError::Schema { .. } | BoardError::ProjectNotFound { .. } => Self::Schema,
            BoardError::Protocol(_) => Self::Protocol,
            BoardError::Transient { .. } => Self::TransientNetwork,
            BoardError::Request(_) | BoardError::MoveFailed { .. } => Self::WorkflowFailure,
        }
    }
}
