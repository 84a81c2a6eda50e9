//! Authenticated GitHub API client for board queries and mutations.
//!
//! Reads (GraphQL queries and REST GETs) are retried on transient failures.
//! Mutations and REST writes are sent exactly once.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::errors::BoardError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_RETRIES: u32 = 2;

const USER_AGENT: &str = "readyflow";

static TRANSIENT_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(timeout|timed out|temporar|connection reset|502|503|504|eof|tls|rate limit|service unavailable)",
    )
    .expect("valid regex")
});

/// Whether an error message describes a failure worth retrying.
pub fn is_transient_message(message: &str) -> bool {
    TRANSIENT_MESSAGE.is_match(message)
}

/// Outcome of a single HTTP attempt.
#[derive(Debug)]
enum Failure {
    Transient(String),
    Fatal(BoardError),
}

/// Pull request fields needed by the merge-to-done sync.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl PullRequestInfo {
    pub fn is_merged(&self) -> bool {
        self.merged_at.as_deref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub body: Option<String>,
}

/// Name/value pair from the repository actions variables listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionsVariable {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct SecretList {
    #[serde(default)]
    secrets: Vec<NamedEntry>,
}

#[derive(Debug, Deserialize)]
struct VariableList {
    #[serde(default)]
    variables: Vec<ActionsVariable>,
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: String,
}

#[derive(Debug, Clone)]
pub struct BoardClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    retries: u32,
}

impl BoardClient {
    /// Build a client; an empty token is a configuration error.
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self, BoardError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(BoardError::Configuration(
                "missing token. set GH_PROJECT_TOKEN, GH_TOKEN or GITHUB_TOKEN".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BoardError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            retries: DEFAULT_RETRIES,
        })
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Run a GraphQL query, retrying transient failures.
    pub async fn query(&self, document: &str, variables: Value) -> Result<Value, BoardError> {
        let body = json!({ "query": document, "variables": variables });
        let attempts = self.retries + 1;
        let mut attempt = 1;
        loop {
            let request = self.request(Method::POST, "/graphql").json(&body);
            match self.graphql_attempt(request).await {
                Ok(value) => return Ok(value),
                Err(Failure::Fatal(err)) => return Err(err),
                Err(Failure::Transient(message)) if attempt < attempts => {
                    warn!(attempt, max_attempts = attempts, error = %message, "Transient board API failure, retrying");
                    attempt += 1;
                }
                Err(Failure::Transient(message)) => {
                    return Err(BoardError::Transient { attempts, message });
                }
            }
        }
    }

    /// Run a GraphQL mutation once.
    pub async fn mutate(&self, document: &str, variables: Value) -> Result<Value, BoardError> {
        let body = json!({ "query": document, "variables": variables });
        let request = self.request(Method::POST, "/graphql").json(&body);
        match self.graphql_attempt(request).await {
            Ok(value) => Ok(value),
            Err(Failure::Fatal(err)) => Err(err),
            Err(Failure::Transient(message)) => Err(BoardError::Transient {
                attempts: 1,
                message,
            }),
        }
    }

    /// GET a REST resource, retrying transient failures.
    pub async fn rest_get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, BoardError> {
        let attempts = self.retries + 1;
        let mut attempt = 1;
        loop {
            let request = self.request(Method::GET, path).query(query);
            match self.send(request).await {
                Ok(value) => return Ok(value),
                Err(Failure::Fatal(err)) => return Err(err),
                Err(Failure::Transient(message)) if attempt < attempts => {
                    warn!(attempt, max_attempts = attempts, path, error = %message, "Transient REST failure, retrying");
                    attempt += 1;
                }
                Err(Failure::Transient(message)) => {
                    return Err(BoardError::Transient { attempts, message });
                }
            }
        }
    }

    /// POST a REST resource once.
    pub async fn rest_post(&self, path: &str, body: &Value) -> Result<Value, BoardError> {
        let request = self.request(Method::POST, path).json(body);
        self.send(request).await.map_err(|failure| match failure {
            Failure::Fatal(err) => err,
            Failure::Transient(message) => BoardError::Transient {
                attempts: 1,
                message,
            },
        })
    }

    pub async fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequestInfo, BoardError> {
        let value = self.rest_get(&format!("/repos/{repo}/pulls/{number}"), &[]).await?;
        serde_json::from_value(value)
            .map_err(|e| BoardError::Protocol(format!("unexpected pull request shape: {e}")))
    }

    pub async fn issue_comments(&self, repo: &str, number: u64) -> Result<Vec<IssueComment>, BoardError> {
        let value = self
            .rest_get(
                &format!("/repos/{repo}/issues/{number}/comments"),
                &[("per_page", "100")],
            )
            .await?;
        serde_json::from_value(value)
            .map_err(|e| BoardError::Protocol(format!("unexpected comment list shape: {e}")))
    }

    pub async fn comment_on_issue(&self, repo: &str, number: u64, body: &str) -> Result<(), BoardError> {
        self.rest_post(
            &format!("/repos/{repo}/issues/{number}/comments"),
            &json!({ "body": body }),
        )
        .await?;
        Ok(())
    }

    pub async fn actions_secret_names(&self, repo: &str) -> Result<Vec<String>, BoardError> {
        let value = self
            .rest_get(&format!("/repos/{repo}/actions/secrets"), &[("per_page", "100")])
            .await?;
        let list: SecretList = serde_json::from_value(value)
            .map_err(|e| BoardError::Protocol(format!("unexpected secrets shape: {e}")))?;
        Ok(list.secrets.into_iter().map(|s| s.name).collect())
    }

    pub async fn actions_variables(&self, repo: &str) -> Result<Vec<ActionsVariable>, BoardError> {
        let value = self
            .rest_get(&format!("/repos/{repo}/actions/variables"), &[("per_page", "100")])
            .await?;
        let list: VariableList = serde_json::from_value(value)
            .map_err(|e| BoardError::Protocol(format!("unexpected variables shape: {e}")))?;
        Ok(list.variables)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }

    async fn graphql_attempt(&self, request: RequestBuilder) -> Result<Value, Failure> {
        let value = self.send(request).await?;

        if let Some(errors) = value.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let message = errors
                .iter()
                .map(|e| e.get("message").and_then(Value::as_str).unwrap_or("unknown error"))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(if is_transient_message(&message) {
                Failure::Transient(message)
            } else {
                Failure::Fatal(BoardError::Request(message))
            });
        }

        if value.get("data").is_none_or(Value::is_null) {
            return Err(Failure::Fatal(BoardError::Protocol(
                "response carries neither data nor errors".to_string(),
            )));
        }
        Ok(value)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, Failure> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let message = e.to_string();
                return Err(if e.is_timeout() || e.is_connect() || is_transient_message(&message) {
                    Failure::Transient(message)
                } else {
                    Failure::Fatal(BoardError::Request(message))
                });
            }
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Failure::Transient(format!("failed to read response body: {e}")))?;
        debug!(%status, bytes = text.len(), "Board API response");

        if !status.is_success() {
            let message = format!("HTTP {status}: {}", text.trim());
            let retryable = status.is_server_error()
                || status == StatusCode::TOO_MANY_REQUESTS
                || (status == StatusCode::FORBIDDEN && is_transient_message(&text));
            return Err(if retryable {
                Failure::Transient(message)
            } else {
                Failure::Fatal(BoardError::Request(message))
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| Failure::Fatal(BoardError::Protocol(format!("invalid JSON body: {e}"))))
    }
}
