//! Card lifecycle on the board.

use serde::{Deserialize, Serialize};

use crate::board::same_status;

/// Workflow position of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    Ready,
    InProgress,
    InReview,
    Done,
}

/// Forward edges plus the rollback edges back to `Ready`.
pub fn is_valid_transition(from: CardState, to: CardState) -> bool {
    matches!(
        (from, to),
        (CardState::Ready, CardState::InProgress)
            | (CardState::InProgress, CardState::InReview)
            | (CardState::InReview, CardState::Done)
            | (CardState::InProgress, CardState::Ready)
            | (CardState::InReview, CardState::Ready)
    )
}

/// Board option names for each state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusNames {
    pub ready: String,
    pub in_progress: String,
    pub in_review: String,
    pub done: String,
}

impl Default for StatusNames {
    fn default() -> Self {
        Self {
            ready: "Ready".to_string(),
            in_progress: "In progress".to_string(),
            in_review: "In review".to_string(),
            done: "Done".to_string(),
        }
    }
}

impl StatusNames {
    pub fn name(&self, state: CardState) -> &str {
        match state {
            CardState::Ready => &self.ready,
            CardState::InProgress => &self.in_progress,
            CardState::InReview => &self.in_review,
            CardState::Done => &self.done,
        }
    }

    /// State whose configured name matches `status` under the status comparator.
    pub fn state_of(&self, status: &str) -> Option<CardState> {
        [
            CardState::Ready,
            CardState::InProgress,
            CardState::InReview,
            CardState::Done,
        ]
        .into_iter()
        .find(|state| same_status(self.name(*state), status))
    }
}
