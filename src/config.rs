//! Layered configuration for readyflow.
//!
//! Settings come from built-in defaults, then the optional
//! `.readyflow/readyflow.toml`, then environment variables. Command-line
//! arguments are applied last by the commands themselves.
//!
//! # Configuration File Format
//!
//! ```toml
//! [statuses]
//! ready = "Ready"
//! in_progress = "In progress"
//! in_review = "In review"
//! done = "Done"
//!
//! [workflow]
//! base_branch = "main"
//! work_cmd = "npm run generate"
//! governance_cmd = "node scripts/ci/governance-gate.mjs governance-gate-report.md"
//! governance_report = "governance-gate-report.md"
//! test_cmd = "npx playwright test --project=chromium"
//! run_targeted_tests = true
//! dry_run = false
//!
//! [artifacts]
//! tests_dir = "tests"
//! spec_suffix = ".spec.ts"
//! catalog = "pages/InventoryPage.ts"
//! policy_docs = ["AGENTS.md", "CLAUDE.md", ".github/copilot-instructions.md"]
//!
//! [github]
//! api_url = "https://api.github.com"
//! retries = 2
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::artifact::GeneratorConfig;
use crate::board::client::{DEFAULT_API_URL, DEFAULT_RETRIES};
use crate::errors::BoardError;
use crate::intent::TestLayout;
use crate::workflow::{CommandGate, StatusNames, TargetedTests};

pub const CONFIG_DIR: &str = ".readyflow";
pub const CONFIG_FILE: &str = "readyflow.toml";

/// Token variables in lookup order; the first non-empty one wins.
pub const TOKEN_VARIABLES: &[&str] = &["GH_PROJECT_TOKEN", "GH_TOKEN", "GITHUB_TOKEN"];

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_governance_cmd() -> String {
    "node scripts/ci/governance-gate.mjs governance-gate-report.md".to_string()
}

fn default_governance_report() -> String {
    "governance-gate-report.md".to_string()
}

fn default_test_cmd() -> String {
    "npx playwright test --project=chromium".to_string()
}

fn default_true() -> bool {
    true
}

/// `[workflow]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSection {
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// External work command; the built-in generator runs when unset.
    #[serde(default)]
    pub work_cmd: Option<String>,
    #[serde(default = "default_governance_cmd")]
    pub governance_cmd: String,
    #[serde(default = "default_governance_report")]
    pub governance_report: String,
    #[serde(default = "default_test_cmd")]
    pub test_cmd: String,
    #[serde(default = "default_true")]
    pub run_targeted_tests: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            base_branch: default_base_branch(),
            work_cmd: None,
            governance_cmd: default_governance_cmd(),
            governance_report: default_governance_report(),
            test_cmd: default_test_cmd(),
            run_targeted_tests: true,
            dry_run: false,
        }
    }
}

fn default_tests_dir() -> String {
    TestLayout::default().tests_dir
}

fn default_spec_suffix() -> String {
    TestLayout::default().spec_suffix
}

fn default_catalog() -> String {
    "pages/InventoryPage.ts".to_string()
}

fn default_policy_docs() -> Vec<String> {
    vec![
        "AGENTS.md".to_string(),
        "CLAUDE.md".to_string(),
        ".github/copilot-instructions.md".to_string(),
    ]
}

/// `[artifacts]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsSection {
    #[serde(default = "default_tests_dir")]
    pub tests_dir: String,
    #[serde(default = "default_spec_suffix")]
    pub spec_suffix: String,
    /// Page object holding the product catalog.
    #[serde(default = "default_catalog")]
    pub catalog: String,
    #[serde(default = "default_policy_docs")]
    pub policy_docs: Vec<String>,
}

impl Default for ArtifactsSection {
    fn default() -> Self {
        Self {
            tests_dir: default_tests_dir(),
            spec_suffix: default_spec_suffix(),
            catalog: default_catalog(),
            policy_docs: default_policy_docs(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

/// `[github]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Extra attempts for read requests.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            retries: default_retries(),
        }
    }
}

/// Contents of `readyflow.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub statuses: StatusNames,
    #[serde(default)]
    pub workflow: WorkflowSection,
    #[serde(default)]
    pub artifacts: ArtifactsSection,
    #[serde(default)]
    pub github: GithubSection,
}

impl Settings {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse readyflow.toml")
    }

    /// Load `.readyflow/readyflow.toml` under `root`, or defaults when it is absent.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// File settings with process environment overrides applied.
    pub fn resolve(root: &Path) -> Result<Self> {
        let mut settings = Self::load_or_default(root)?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("READY_STATUS") {
            self.statuses.ready = v;
        }
        if let Some(v) = get("IN_PROGRESS_STATUS") {
            self.statuses.in_progress = v;
        }
        if let Some(v) = get("IN_REVIEW_STATUS") {
            self.statuses.in_review = v;
        }
        if let Some(v) = get("DONE_STATUS") {
            self.statuses.done = v;
        }
        if let Some(v) = get("WORK_CMD").or_else(|| get("PROJECT_READY_WORK_CMD")) {
            self.workflow.work_cmd = Some(v);
        }
        if let Some(v) = get("GOVERNANCE_CMD") {
            self.workflow.governance_cmd = v;
        }
        if let Some(v) = get("DRY_RUN") {
            self.workflow.dry_run = v == "1";
        }
        if let Some(v) = get("RUN_TARGETED_TESTS") {
            self.workflow.run_targeted_tests = v != "0";
        }
        if let Some(v) = get("GITHUB_API_URL") {
            self.github.api_url = v;
        }
    }

    pub fn layout(&self) -> TestLayout {
        TestLayout {
            tests_dir: self.artifacts.tests_dir.clone(),
            spec_suffix: self.artifacts.spec_suffix.clone(),
        }
    }

    pub fn generator_config(&self, root: &Path) -> GeneratorConfig {
        GeneratorConfig {
            layout: self.layout(),
            catalog_path: PathBuf::from(&self.artifacts.catalog),
            policy_docs: self.artifacts.policy_docs.clone(),
            dry_run: self.workflow.dry_run,
            ..GeneratorConfig::new(root)
        }
    }

    /// Targeted test runner, unless disabled.
    pub fn targeted_tests(&self, root: &Path) -> Option<TargetedTests> {
        self.workflow.run_targeted_tests.then(|| TargetedTests {
            command: self.workflow.test_cmd.clone(),
            cwd: root.to_path_buf(),
        })
    }

    pub fn governance_gate(&self, root: &Path) -> CommandGate {
        CommandGate {
            command: self.workflow.governance_cmd.clone(),
            report: PathBuf::from(&self.workflow.governance_report),
            cwd: root.to_path_buf(),
        }
    }
}

/// First non-empty token from [`TOKEN_VARIABLES`].
pub fn github_token(lookup: impl Fn(&str) -> Option<String>) -> Result<String, BoardError> {
    TOKEN_VARIABLES
        .iter()
        .filter_map(|&key| lookup(key))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .ok_or_else(|| {
            BoardError::Configuration(format!(
                "missing board token; set one of {}",
                TOKEN_VARIABLES.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load_or_default(tmp.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.statuses.in_progress, "In progress");
        assert_eq!(settings.workflow.base_branch, "main");
        assert!(settings.workflow.run_targeted_tests);
        assert_eq!(settings.github.retries, DEFAULT_RETRIES);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::parse(
            r#"
[statuses]
ready = "Todo"

[workflow]
base_branch = "develop"
dry_run = true

[artifacts]
tests_dir = "e2e"
"#,
        )
        .unwrap();
        assert_eq!(settings.statuses.ready, "Todo");
        assert_eq!(settings.statuses.done, "Done");
        assert_eq!(settings.workflow.base_branch, "develop");
        assert!(settings.workflow.dry_run);
        assert_eq!(settings.workflow.test_cmd, "npx playwright test --project=chromium");
        assert_eq!(settings.layout().tests_dir, "e2e");
        assert_eq!(settings.layout().spec_suffix, ".spec.ts");
    }

    #[test]
    fn loads_from_config_dir() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(CONFIG_DIR)).unwrap();
        fs::write(
            tmp.path().join(CONFIG_DIR).join(CONFIG_FILE),
            "[github]\nretries = 5\n",
        )
        .unwrap();
        let settings = Settings::load_or_default(tmp.path()).unwrap();
        assert_eq!(settings.github.retries, 5);
        assert_eq!(settings.github.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let err = Settings::parse("[workflow\n").unwrap_err();
        assert!(err.to_string().contains("readyflow.toml"));
    }

    #[test]
    fn environment_overrides_file() {
        let mut settings = Settings::parse("[statuses]\ndone = \"Shipped\"\n").unwrap();
        settings.apply_env(env(&[
            ("DONE_STATUS", "Closed"),
            ("IN_REVIEW_STATUS", "Review"),
            ("WORK_CMD", "npm run work"),
            ("DRY_RUN", "1"),
            ("RUN_TARGETED_TESTS", "0"),
            ("GITHUB_API_URL", "http://localhost:9999"),
        ]));
        assert_eq!(settings.statuses.done, "Closed");
        assert_eq!(settings.statuses.in_review, "Review");
        assert_eq!(settings.workflow.work_cmd.as_deref(), Some("npm run work"));
        assert!(settings.workflow.dry_run);
        assert!(!settings.workflow.run_targeted_tests);
        assert_eq!(settings.github.api_url, "http://localhost:9999");
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("READY_STATUS", "   "), ("DRY_RUN", "")]));
        assert_eq!(settings.statuses.ready, "Ready");
        assert!(!settings.workflow.dry_run);
    }

    #[test]
    fn disabled_targeted_tests() {
        let mut settings = Settings::default();
        assert!(settings.targeted_tests(Path::new(".")).is_some());
        settings.workflow.run_targeted_tests = false;
        assert!(settings.targeted_tests(Path::new(".")).is_none());
    }

    #[test]
    fn generator_config_follows_settings() {
        let mut settings = Settings::default();
        settings.artifacts.catalog = "src/pages/Inventory.ts".to_string();
        settings.workflow.dry_run = true;
        let config = settings.generator_config(Path::new("/repo"));
        assert_eq!(config.root, PathBuf::from("/repo"));
        assert_eq!(config.catalog_path, PathBuf::from("src/pages/Inventory.ts"));
        assert!(config.dry_run);
    }

    #[test]
    fn token_lookup_order() {
        let token = github_token(env(&[("GH_TOKEN", "b"), ("GITHUB_TOKEN", "c")])).unwrap();
        assert_eq!(token, "b");
        let token = github_token(env(&[("GH_PROJECT_TOKEN", " "), ("GITHUB_TOKEN", "c")])).unwrap();
        assert_eq!(token, "c");
        assert!(matches!(
            github_token(env(&[])),
            Err(BoardError::Configuration(_))
        ));
    }
}
