//! Sequence numbers for `<prefix>-<seq3>-<slug><suffix>` artifact names.

use std::path::Path;

use regex::Regex;

use crate::errors::ArtifactError;

/// Next free three-digit sequence for `prefix` in `dir`: highest existing plus one.
///
/// Gaps are never reused; a missing directory starts at `001`.
pub fn next_sequence_id(dir: &Path, prefix: &str, suffix: &str) -> Result<String, ArtifactError> {
    if !dir.exists() {
        return Ok(format_sequence(1));
    }

    let pattern = Regex::new(&format!(
        r"^{}-(\d{{3}})-.*{}$",
        regex::escape(prefix),
        regex::escape(suffix)
    ))
    .expect("escaped sequence pattern is valid");

    let entries = std::fs::read_dir(dir).map_err(|e| ArtifactError::io(dir, e))?;
    let mut max = 0u32;
    for entry in entries {
        let entry = entry.map_err(|e| ArtifactError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(caps) = pattern.captures(name)
            && let Ok(value) = caps[1].parse::<u32>()
        {
            max = max.max(value);
        }
    }
    Ok(format_sequence(max + 1))
}

fn format_sequence(value: u32) -> String {
    format!("{value:03}")
}
