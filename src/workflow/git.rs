//! Source control: repository checks, branch preparation, commit, push and PR creation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use git2::{BranchType, Repository};
use regex::Regex;
use tracing::info;

use super::process::{run_checked, run_command};
use crate::errors::WorkflowError;

static PR_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://github\.com/[^\s]+/pull/\d+").unwrap());

/// Last pull request URL printed in `output`.
pub fn extract_pr_url(output: &str) -> Option<String> {
    PR_URL.find_iter(output).last().map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRequest {
    pub base: String,
    pub head: String,
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Fail unless the working directory is a repository with an `origin` remote.
    async fn preflight(&self) -> Result<(), WorkflowError>;

    /// Sync `base` from origin, then check out `branch` (created from base when new).
    async fn prepare_branch(&self, base: &str, branch: &str) -> Result<(), WorkflowError>;

    /// Stage everything, commit with `message` and push `branch` to origin.
    async fn commit_and_push(&self, branch: &str, message: &str) -> Result<(), WorkflowError>;

    /// Open a pull request; returns everything the tool printed.
    async fn create_pull_request(&self, request: &PullRequestRequest) -> Result<String, WorkflowError>;
}

/// `git` and `gh` command-line tools in a working directory.
pub struct GitCli {
    cwd: PathBuf,
}

impl GitCli {
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
        }
    }

    fn open(&self) -> Result<Repository, WorkflowError> {
        Repository::discover(&self.cwd).map_err(|_| WorkflowError::NotGitRepository)
    }

    fn has_local_branch(&self, name: &str) -> Result<bool, WorkflowError> {
        let repo = self.open()?;
        let exists = repo.find_branch(name, BranchType::Local).is_ok();
        Ok(exists)
    }

    async fn git(&self, args: &[&str]) -> Result<(), WorkflowError> {
        run_checked("git", args, &self.cwd).await.map(|_| ())
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn preflight(&self) -> Result<(), WorkflowError> {
        let repo = self.open()?;
        if repo.find_remote("origin").is_err() {
            return Err(WorkflowError::MissingOrigin);
        }
        Ok(())
    }

    async fn prepare_branch(&self, base: &str, branch: &str) -> Result<(), WorkflowError> {
        self.git(&["fetch", "origin", base]).await?;

        if self.has_local_branch(base)? {
            self.git(&["checkout", base]).await?;
            self.git(&["pull", "--ff-only", "origin", base]).await?;
        } else {
            let remote_base = format!("origin/{base}");
            self.git(&["checkout", "-b", base, &remote_base]).await?;
        }

        if self.has_local_branch(branch)? {
            self.git(&["checkout", branch]).await?;
        } else {
            self.git(&["checkout", "-b", branch]).await?;
        }
        info!(base, branch, "Prepared work branch");
        Ok(())
    }

    async fn commit_and_push(&self, branch: &str, message: &str) -> Result<(), WorkflowError> {
        self.git(&["add", "-A"]).await?;

        let staged = run_command("git", &["diff", "--cached", "--quiet"], &self.cwd, &[]).await?;
        if staged.success {
            return Err(WorkflowError::Command {
                command: "git commit".to_string(),
                details: "no changes to commit".to_string(),
            });
        }

        self.git(&["commit", "-m", message]).await?;
        self.git(&["push", "-u", "origin", branch]).await?;
        info!(branch, "Pushed work branch");
        Ok(())
    }

    async fn create_pull_request(&self, request: &PullRequestRequest) -> Result<String, WorkflowError> {
        let output = run_command(
            "gh",
            &[
                "pr",
                "create",
                "--base",
                &request.base,
                "--head",
                &request.head,
                "--title",
                &request.title,
                "--body",
                &request.body,
            ],
            &self.cwd,
            &[],
        )
        .await
        .map_err(|e| WorkflowError::PrCreationFailed(e.to_string()))?;

        if !output.success {
            return Err(WorkflowError::PrCreationFailed(output.details()));
        }
        Ok(output.combined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn commit_all(repo: &Repository, message: &str, update_ref: &str) {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("test", "test@test.com").unwrap();
        repo.commit(Some(update_ref), &sig, &sig, message, &tree, &[])
            .unwrap();
    }

    /// Work repository on `main` with a bare local `origin` that has `main` pushed.
    fn setup_with_origin() -> (TempDir, TempDir) {
        let origin = TempDir::new().unwrap();
        Repository::init_bare(origin.path()).unwrap();

        let work = TempDir::new().unwrap();
        let repo = Repository::init(work.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "test").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        drop(config);

        fs::write(work.path().join("README.md"), "# shop\n").unwrap();
        commit_all(&repo, "initial", "refs/heads/main");
        repo.set_head("refs/heads/main").unwrap();
        repo.remote("origin", origin.path().to_str().unwrap()).unwrap();

        let status = std::process::Command::new("git")
            .args(["push", "origin", "main"])
            .current_dir(work.path())
            .output()
            .unwrap();
        assert!(status.status.success());
        (work, origin)
    }

    #[test]
    fn pr_url_is_the_last_match() {
        let output = "see https://github.com/acme/shop/pull/1\nCreated https://github.com/acme/shop/pull/42\n";
        assert_eq!(
            extract_pr_url(output).as_deref(),
            Some("https://github.com/acme/shop/pull/42")
        );
        assert_eq!(extract_pr_url("https://github.com/acme/shop/issues/3"), None);
    }

    #[tokio::test]
    async fn preflight_rejects_plain_directories() {
        let tmp = TempDir::new().unwrap();
        let err = GitCli::new(tmp.path()).preflight().await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotGitRepository));
    }

    #[tokio::test]
    async fn preflight_requires_origin() {
        let tmp = TempDir::new().unwrap();
        Repository::init(tmp.path()).unwrap();
        let err = GitCli::new(tmp.path()).preflight().await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingOrigin));
    }

    #[tokio::test]
    async fn prepare_commit_and_push() {
        let (work, origin) = setup_with_origin();
        let git = GitCli::new(work.path());
        git.preflight().await.unwrap();

        git.prepare_branch("main", "newTest/cart-totals").await.unwrap();
        let repo = Repository::open(work.path()).unwrap();
        assert_eq!(repo.head().unwrap().shorthand(), Some("newTest/cart-totals"));

        // Second preparation reuses the existing branch.
        git.prepare_branch("main", "newTest/cart-totals").await.unwrap();

        let err = git
            .commit_and_push("newTest/cart-totals", "test(e2e): nothing")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Command { .. }));

        fs::create_dir_all(work.path().join("tests/cart")).unwrap();
        fs::write(work.path().join("tests/cart/cart-001-x.spec.ts"), "test('x', async () => {});\n").unwrap();
        git.commit_and_push("newTest/cart-totals", "test(e2e): add coverage for x")
            .await
            .unwrap();

        let bare = Repository::open_bare(origin.path()).unwrap();
        assert!(bare.find_reference("refs/heads/newTest/cart-totals").is_ok());
    }
}
