//! `move-item`: set an item's status option.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use readyflow::board::move_item_to_status;
use readyflow::config::Settings;

use super::{board_client, print_json};

#[derive(Serialize)]
struct MovedPayload<'a> {
    status: &'static str,
    owner: &'a str,
    project_number: u32,
    item_id: &'a str,
    target_status: &'a str,
}

pub async fn cmd_move_item(
    project_dir: &Path,
    owner: &str,
    project_number: u32,
    item_id: &str,
    status: &str,
) -> Result<ExitCode> {
    let settings = Settings::resolve(project_dir)?;
    let client = board_client(&settings)?;
    let outcome = move_item_to_status(&client, owner, project_number, item_id, status).await?;

    print_json(&MovedPayload {
        status: "MOVED",
        owner,
        project_number,
        item_id: &outcome.item_id,
        target_status: &outcome.target_status,
    })?;
    Ok(ExitCode::SUCCESS)
}
