//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module          | Command         |
//! |-----------------|-----------------|
//! | `select`        | `SelectReady`   |
//! | `move_item`     | `MoveItem`      |
//! | `ready_to_pr`   | `ReadyToPr`     |
//! | `merge_to_done` | `MergeToDone`   |
//! | `verify_setup`  | `VerifySetup`   |
//! | `ready_work`    | `ReadyWork`     |
//!
//! Payloads go to stdout as single-line JSON; diagnostics go to stderr.

pub mod merge_to_done;
pub mod move_item;
pub mod ready_to_pr;
pub mod ready_work;
pub mod select;
pub mod verify_setup;

pub use merge_to_done::cmd_merge_to_done;
pub use move_item::cmd_move_item;
pub use ready_to_pr::cmd_ready_to_pr;
pub use ready_work::cmd_ready_work;
pub use select::cmd_select_ready;
pub use verify_setup::cmd_verify_setup;

use anyhow::{Context, Result};
use serde::Serialize;

use readyflow::board::BoardClient;
use readyflow::config::{self, Settings};

/// Exit code for "nothing to do" from `select-ready`.
pub const EXIT_NO_WORK: u8 = 2;

/// Board client authenticated from the token environment variables.
pub fn board_client(settings: &Settings) -> Result<BoardClient> {
    let token = config::github_token(|key| std::env::var(key).ok())?;
    let client = BoardClient::new(token, settings.github.api_url.clone())?
        .with_retries(settings.github.retries);
    Ok(client)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let line = serde_json::to_string(value).context("Failed to serialize payload")?;
    println!("{line}");
    Ok(())
}
