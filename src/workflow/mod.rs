//! Workflow orchestration.
//!
//! | Module          | Responsibility                                          |
//! |-----------------|---------------------------------------------------------|
//! | `state`         | card states, transition table, configured status names  |
//! | `process`       | subprocess execution and output capture                 |
//! | `work`          | work step (built-in generator or external command)      |
//! | `governance`    | governance gate report parsing                          |
//! | `git`           | branch preparation, commit, push, pull request creation |
//! | `ready_to_pr`   | ready card to pull request, with rollback               |
//! | `merge_to_done` | merged pull request to done                             |
//!
//! Every step is awaited before the next one starts; no board mutations run
//! in parallel and mutations are never retried.

pub mod git;
pub mod governance;
pub mod merge_to_done;
pub mod process;
pub mod ready_to_pr;
pub mod state;
pub mod work;

pub use git::{GitCli, SourceControl, extract_pr_url};
pub use governance::{CommandGate, Gate, GovernanceCounts};
pub use merge_to_done::{MergeToDoneReport, MergeToDoneRequest, merge_to_done};
pub use ready_to_pr::{CardPlan, ReadyToPr, ReadyToPrOutcome, ReadyToPrReport, ReadyToPrRequest};
pub use state::{CardState, StatusNames, is_valid_transition};
pub use work::{
    InProcessWork, ShellWork, TargetedTests, WorkCommand, WorkContext, WorkRunner,
    resolve_work_command, run_ready_work,
};
