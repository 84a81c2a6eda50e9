//! Status field resolution.
//!
//! Every comparison of status strings in the crate goes through
//! [`normalize_status`], so "Ready", " ready ", "READY" and "Réady" are one
//! and the same status.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::model::FieldDescriptor;
use crate::errors::BoardError;

/// One selectable option of the status field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOption {
    pub id: String,
    pub name: String,
}

/// The board's single-select status field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusField {
    pub id: String,
    pub name: String,
    pub options: Vec<StatusOption>,
}

/// Case-fold, strip diacritics and drop every non-alphanumeric character.
pub fn normalize_status(value: &str) -> String {
    value
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// True when both strings normalize to the same status.
pub fn same_status(a: &str, b: &str) -> bool {
    normalize_status(a) == normalize_status(b)
}

/// Locate the status field in a project's field list.
///
/// The first field that normalizes to `status` and carries an option list wins.
pub fn resolve_status_field(fields: &[FieldDescriptor]) -> Result<StatusField, BoardError> {
    fields
        .iter()
        .find_map(|field| {
            let options = field.options.as_ref()?;
            (normalize_status(&field.name) == "status").then(|| StatusField {
                id: field.id.clone(),
                name: field.name.clone(),
                options: options.clone(),
            })
        })
        .ok_or_else(|| BoardError::schema("status field not found in project"))
}

/// Find the option matching `requested`, or `None` so callers can list alternatives.
pub fn match_status_option<'a>(field: &'a StatusField, requested: &str) -> Option<&'a StatusOption> {
    let wanted = normalize_status(requested);
    field
        .options
        .iter()
        .find(|option| normalize_status(&option.name) == wanted)
}

/// Option names in board order, for diagnostics.
pub fn describe_status_options(field: &StatusField) -> Vec<String> {
    field
        .options
        .iter()
        .map(|option| option.name.clone())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Like [`match_status_option`], but reports the available options on a miss.
pub fn require_status_option<'a>(
    field: &'a StatusField,
    requested: &str,
) -> Result<&'a StatusOption, BoardError> {
    match_status_option(field, requested).ok_or_else(|| BoardError::Schema {
        message: format!("target status '{requested}' not found in project status options"),
        available: describe_status_options(field),
    })
}
