//! The work step: turn a selected card into test-file changes.
//!
//! By default the built-in [`ArtifactGenerator`] runs in-process. A configured
//! work command replaces it; the command receives the card as `PROJECT_*`
//! environment variables and reports its output with `Generated: <path>` lines.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use super::process::{CommandOutput, run_shell};
use crate::artifact::{ArtifactContext, ArtifactGenerator, ArtifactOperationSummary};
use crate::errors::WorkflowError;
use crate::intent::IntentActions;
use crate::selector::WorkType;

static GENERATED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Generated:\s*(\S+\.spec\.[cm]?[jt]s)").unwrap());

static DEPRECATED_WORK_CMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"project-ready-work\.sh\b").unwrap());

/// Card data handed to the work step.
#[derive(Debug, Clone)]
pub struct WorkContext {
    pub owner: String,
    pub project_number: u32,
    pub repo_full_name: String,
    pub base_branch: String,
    pub branch_name: String,
    pub item_id: String,
    pub title: String,
    pub body: String,
    pub content_type: String,
    pub issue_number: Option<u64>,
    pub work_type: WorkType,
    pub priority_label: String,
}

impl WorkContext {
    /// `PROJECT_*` variables for an external work command.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PROJECT_OWNER", self.owner.clone()),
            ("PROJECT_NUMBER", self.project_number.to_string()),
            ("PROJECT_REPO_FULL_NAME", self.repo_full_name.clone()),
            ("PROJECT_BASE_BRANCH", self.base_branch.clone()),
            ("PROJECT_BRANCH_NAME", self.branch_name.clone()),
            ("PROJECT_CARD_ITEM_ID", self.item_id.clone()),
            ("PROJECT_CARD_TITLE", self.title.clone()),
            ("PROJECT_CARD_BODY", self.body.clone()),
            ("PROJECT_CARD_CONTENT_TYPE", self.content_type.clone()),
            (
                "PROJECT_CARD_ISSUE_NUMBER",
                self.issue_number.map(|n| n.to_string()).unwrap_or_default(),
            ),
            ("PROJECT_CARD_WORK_TYPE", self.work_type.as_str().to_string()),
            ("PROJECT_CARD_PRIORITY_LABEL", self.priority_label.clone()),
        ]
    }

    pub fn artifact_context(&self) -> ArtifactContext {
        ArtifactContext {
            title: self.title.clone(),
            body: self.body.clone(),
            work_type: self.work_type,
            seed: self.issue_number.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkOutcome {
    /// First generated spec file, when the step reported one.
    pub generated_test_file: Option<String>,
    pub output: String,
}

#[async_trait]
pub trait WorkRunner: Send + Sync {
    async fn run(&self, ctx: &WorkContext) -> Result<WorkOutcome, WorkflowError>;
}

/// Which implementation the work step uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkCommand {
    BuiltIn,
    Shell(String),
}

/// Resolve the configured work command, redirecting the retired shell script.
pub fn resolve_work_command(configured: Option<&str>) -> WorkCommand {
    match configured.map(str::trim).filter(|c| !c.is_empty()) {
        None => WorkCommand::BuiltIn,
        Some(cmd) if DEPRECATED_WORK_CMD.is_match(cmd) => {
            warn!(work_cmd = %cmd, "WORK_CMD points to deprecated .sh path; using the built-in generator instead");
            WorkCommand::BuiltIn
        }
        Some(cmd) => WorkCommand::Shell(cmd.to_string()),
    }
}

/// Path of the first `Generated: <spec>` line in `output`.
pub fn detect_generated_file(output: &str) -> Option<String> {
    GENERATED_LINE
        .captures(output)
        .map(|caps| caps[1].trim().to_string())
}

/// Test command run over the files a work step touched.
#[derive(Debug, Clone)]
pub struct TargetedTests {
    /// Shell command; target files are appended as arguments.
    pub command: String,
    pub cwd: PathBuf,
}

impl TargetedTests {
    pub async fn run(&self, targets: &[String]) -> Result<(), WorkflowError> {
        if targets.is_empty() {
            info!("No runnable test targets generated for this card. Skipping targeted test run.");
            return Ok(());
        }
        info!(command = %self.command, targets = ?targets, "Running targeted tests");
        let args: Vec<&str> = targets.iter().map(String::as_str).collect();
        let output = run_shell(&format!("{} \"$@\"", self.command), &args, &self.cwd, &[]).await?;
        forward(&output);
        if !output.success {
            return Err(WorkflowError::WorkFailed(format!(
                "targeted tests failed: {}",
                output.details()
            )));
        }
        Ok(())
    }
}

fn forward(output: &CommandOutput) {
    // stdout is reserved for the JSON payload
    if !output.stdout.trim().is_empty() {
        eprintln!("{}", output.stdout.trim_end());
    }
    if !output.stderr.trim().is_empty() {
        eprintln!("{}", output.stderr.trim_end());
    }
}

/// Parse the card, apply the intent and run targeted tests.
pub async fn run_ready_work(
    generator: &ArtifactGenerator,
    ctx: &ArtifactContext,
    tests: Option<&TargetedTests>,
) -> Result<(ArtifactOperationSummary, IntentActions), WorkflowError> {
    if ctx.title.trim().is_empty() && ctx.body.trim().is_empty() {
        return Err(WorkflowError::WorkFailed(
            "card title and body are both empty".to_string(),
        ));
    }
    let intent = generator
        .parse_intent(&ctx.title, &ctx.body)
        .resolve_default(ctx.work_type)?;
    let summary = generator.apply_intent(&intent, ctx)?;

    if let Some(tests) = tests
        && !generator.config().dry_run
    {
        tests.run(&generator.runnable_targets(&summary)).await?;
    }
    Ok((summary, intent.actions()))
}

/// Built-in generator running in the current process.
pub struct InProcessWork {
    generator: ArtifactGenerator,
    tests: Option<TargetedTests>,
}

impl InProcessWork {
    pub fn new(generator: ArtifactGenerator, tests: Option<TargetedTests>) -> Self {
        Self { generator, tests }
    }
}

#[async_trait]
impl WorkRunner for InProcessWork {
    async fn run(&self, ctx: &WorkContext) -> Result<WorkOutcome, WorkflowError> {
        let (summary, _) =
            run_ready_work(&self.generator, &ctx.artifact_context(), self.tests.as_ref()).await?;
        let lines = summary.report_lines();
        for line in &lines {
            info!("{line}");
        }
        Ok(WorkOutcome {
            generated_test_file: summary.created.first().cloned(),
            output: lines.join("\n"),
        })
    }
}

/// External work command run through `sh -c`.
pub struct ShellWork {
    command: String,
    cwd: PathBuf,
}

impl ShellWork {
    pub fn new(command: impl Into<String>, cwd: &Path) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.to_path_buf(),
        }
    }
}

#[async_trait]
impl WorkRunner for ShellWork {
    async fn run(&self, ctx: &WorkContext) -> Result<WorkOutcome, WorkflowError> {
        info!(work_cmd = %self.command, "Running WORK_CMD");
        let envs = ctx.env_vars();
        let output = run_shell(&self.command, &[], &self.cwd, &envs).await?;
        forward(&output);
        if !output.success {
            return Err(WorkflowError::WorkFailed(output.details()));
        }
        let combined = output.combined();
        Ok(WorkOutcome {
            generated_test_file: detect_generated_file(&combined),
            output: combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::GeneratorConfig;
    use crate::artifact::catalog::tests::INVENTORY_PAGE;
    use tempfile::TempDir;

    fn context() -> WorkContext {
        WorkContext {
            owner: "acme".to_string(),
            project_number: 3,
            repo_full_name: "acme/shop".to_string(),
            base_branch: "main".to_string(),
            branch_name: "newTest/onesie".to_string(),
            item_id: "PVTI_1".to_string(),
            title: "Create a new test for the Sauce Labs Onesie product".to_string(),
            body: String::new(),
            content_type: "Issue".to_string(),
            issue_number: Some(12),
            work_type: WorkType::NewTest,
            priority_label: "P1".to_string(),
        }
    }

    #[test]
    fn deprecated_script_is_redirected() {
        assert_eq!(resolve_work_command(None), WorkCommand::BuiltIn);
        assert_eq!(resolve_work_command(Some("  ")), WorkCommand::BuiltIn);
        assert_eq!(
            resolve_work_command(Some("bash scripts/git/project-ready-work.sh")),
            WorkCommand::BuiltIn
        );
        assert_eq!(
            resolve_work_command(Some("make generate")),
            WorkCommand::Shell("make generate".to_string())
        );
    }

    #[test]
    fn generated_line_detection() {
        let output = "Running\nGenerated: tests/cart/cart-002-x.spec.ts\nGenerated: tests/b.spec.ts\n";
        assert_eq!(
            detect_generated_file(output).as_deref(),
            Some("tests/cart/cart-002-x.spec.ts")
        );
        assert_eq!(detect_generated_file("Deleted: tests/a.spec.ts"), None);
    }

    #[test]
    fn env_vars_cover_card_context() {
        let vars = context().env_vars();
        let get = |key: &str| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());
        assert_eq!(get("PROJECT_CARD_ISSUE_NUMBER"), Some("12"));
        assert_eq!(get("PROJECT_CARD_WORK_TYPE"), Some("newTest"));
        assert_eq!(get("PROJECT_BRANCH_NAME"), Some("newTest/onesie"));
        assert_eq!(vars.len(), 12);
    }

    #[tokio::test]
    async fn shell_work_sees_env_and_reports_generated_file() {
        let tmp = TempDir::new().unwrap();
        let work = ShellWork::new(
            "echo \"Generated: tests/inventory/inv-001-$PROJECT_CARD_ITEM_ID.spec.ts\"",
            tmp.path(),
        );
        let outcome = work.run(&context()).await.unwrap();
        assert_eq!(
            outcome.generated_test_file.as_deref(),
            Some("tests/inventory/inv-001-PVTI_1.spec.ts")
        );
    }

    #[tokio::test]
    async fn shell_work_failure_carries_details() {
        let tmp = TempDir::new().unwrap();
        let work = ShellWork::new("echo broken >&2; exit 4", tmp.path());
        let err = work.run(&context()).await.unwrap_err();
        match err {
            WorkflowError::WorkFailed(details) => assert_eq!(details, "broken"),
            other => panic!("Expected WorkFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_process_work_generates_and_runs_targets() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("pages")).unwrap();
        std::fs::write(tmp.path().join("pages/InventoryPage.ts"), INVENTORY_PAGE).unwrap();

        let tests = TargetedTests {
            command: "echo ran >> targets.log; printf '%s\\n' >> targets.log".to_string(),
            cwd: tmp.path().to_path_buf(),
        };
        let work = InProcessWork::new(ArtifactGenerator::new(GeneratorConfig::new(tmp.path())), Some(tests));
        let outcome = work.run(&context()).await.unwrap();

        assert_eq!(
            outcome.generated_test_file.as_deref(),
            Some("tests/inventory/inv-001-onesie-product-details.spec.ts")
        );
        assert!(outcome.output.contains("Generated: tests/inventory/inv-001"));
        assert!(tmp.path().join("targets.log").exists());
    }

    #[tokio::test]
    async fn targeted_test_failure_fails_the_step() {
        let tmp = TempDir::new().unwrap();
        let tests = TargetedTests {
            command: "exit 1;".to_string(),
            cwd: tmp.path().to_path_buf(),
        };
        let err = tests.run(&["tests/a.spec.ts".to_string()]).await.unwrap_err();
        assert!(matches!(err, WorkflowError::WorkFailed(_)));
        tests.run(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn empty_card_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let generator = ArtifactGenerator::new(GeneratorConfig::new(tmp.path()));
        let ctx = ArtifactContext {
            title: " ".to_string(),
            body: String::new(),
            work_type: WorkType::NewTest,
            seed: 0,
        };
        assert!(run_ready_work(&generator, &ctx, None).await.is_err());
    }
}
