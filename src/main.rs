use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use readyflow::errors::ErrorClass;
use readyflow::logging;

mod cmd;

#[derive(Parser)]
#[command(name = "readyflow")]
#[command(version, about = "Move ready project cards to pull requests and merged work to done")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Repository working tree (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the highest-ranked Ready card as JSON
    SelectReady {
        owner: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        project: u32,
        /// Only consider issues from this owner/repo
        repo: Option<String>,
        /// Status to treat as ready (overrides configuration)
        status: Option<String>,
    },
    /// Move a project item to a status option
    MoveItem {
        owner: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        project: u32,
        item: String,
        status: String,
    },
    /// Turn the best Ready card into a pull request
    ReadyToPr {
        owner: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        project: u32,
        repo: String,
        /// Base branch (overrides configuration)
        base: Option<String>,
    },
    /// Move issues linked to a merged pull request to Done
    MergeToDone {
        owner: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        project: u32,
        repo: String,
        pr: u64,
        /// Done status name (overrides configuration)
        done_status: Option<String>,
    },
    /// Check repository secrets, variables and workflow files
    VerifySetup {
        /// owner/repo; defaults to the origin remote
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Run the built-in generator for the card in the PROJECT_CARD_* environment
    ReadyWork,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; real environment variables always win.
    let _ = dotenvy::dotenv();

    // Exit code 2 is reserved for NO_WORK, so usage errors exit 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    logging::init(cli.verbose, cli.log_json);

    match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            let class = ErrorClass::of(&err);
            let message = format!("{err:#}")
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            eprintln!("Error ({}): {message}", class.label());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::SelectReady {
            owner,
            project,
            repo,
            status,
        } => {
            cmd::cmd_select_ready(&project_dir, owner, *project, repo.as_deref(), status.as_deref())
                .await
        }
        Commands::MoveItem {
            owner,
            project,
            item,
            status,
        } => cmd::cmd_move_item(&project_dir, owner, *project, item, status).await,
        Commands::ReadyToPr {
            owner,
            project,
            repo,
            base,
        } => cmd::cmd_ready_to_pr(&project_dir, owner, *project, repo, base.as_deref()).await,
        Commands::MergeToDone {
            owner,
            project,
            repo,
            pr,
            done_status,
        } => {
            cmd::cmd_merge_to_done(&project_dir, owner, *project, repo, *pr, done_status.as_deref())
                .await
        }
        Commands::VerifySetup { repo, json } => {
            Ok(cmd::cmd_verify_setup(&project_dir, repo.as_deref(), *json).await)
        }
        Commands::ReadyWork => cmd::cmd_ready_work(&project_dir).await,
    }
}
