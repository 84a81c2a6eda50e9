//! Agent policy documents.
//!
//! The naming and step rules are appended once to each policy document,
//! delimited by a marker comment so reruns leave the document alone.

use std::fs;
use std::path::Path;

use crate::errors::ArtifactError;

pub const POLICY_MARKER: &str = "<!-- readyflow:agent-policy -->";

const POLICY_SECTION: &str = r#"
<!-- readyflow:agent-policy -->
## Test Authoring Rules (readyflow)

- Test file names, `test.describe` titles and `test` titles are written in English.
- File names follow `<prefix>-<NNN>-<slug>.spec.ts`, with `NNN` the next free sequence in the folder.
- Every test body is a sequence of named steps: `await test.step('Step N: <Title>', async () => { ... })`.
- Page interactions go through the page objects in `pages/`; tests never use raw selectors.
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyUpdate {
    Appended,
    AlreadyPresent,
    Missing,
}

/// Append the policy section to `path` unless its marker is already there.
///
/// With `dry_run` the outcome is computed without writing.
pub fn upsert_policy_section(path: &Path, dry_run: bool) -> Result<PolicyUpdate, ArtifactError> {
    if !path.is_file() {
        return Ok(PolicyUpdate::Missing);
    }
    let content = fs::read_to_string(path).map_err(|e| ArtifactError::io(path, e))?;
    if content.contains(POLICY_MARKER) {
        return Ok(PolicyUpdate::AlreadyPresent);
    }

    if !dry_run {
        let mut updated = content;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(POLICY_SECTION);
        fs::write(path, updated).map_err(|e| ArtifactError::io(path, e))?;
    }
    Ok(PolicyUpdate::Appended)
}
