//! Ready-item selection and ranking.
//!
//! Candidates are ordered by work type, then priority label, then issue number,
//! then title, then item id. The order is total, so one pass always yields
//! exactly one candidate when any item is ready.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::board::{BoardItem, normalize_status};

/// Sort key used for items that carry no issue number.
pub const MISSING_ISSUE_NUMBER: u64 = 999_999_999;

static DEFECT_SIGNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(bugs?|erros?|errors?|falha\w*|fix|fixes|fixed|corrig\w*|defects?|hotfix\w*|quebrad\w*|broken|regress\w*)\b",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    #[serde(rename = "bugfix")]
    Bugfix,
    #[serde(rename = "newTest")]
    NewTest,
    #[serde(rename = "unknown")]
    Unknown,
}

impl WorkType {
    pub fn rank(self) -> u8 {
        match self {
            Self::Bugfix => 0,
            Self::NewTest => 1,
            Self::Unknown => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bugfix => "bugfix",
            Self::NewTest => "newTest",
            Self::Unknown => "unknown",
        }
    }

    /// Parse the wire name; anything else is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "bugfix" => Self::Bugfix,
            "newTest" => Self::NewTest,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkTypeSource {
    Label,
    Inferred,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    #[serde(rename = "NONE")]
    None,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Self::P0 => 0,
            Self::P1 => 1,
            Self::P2 => 2,
            Self::None => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::None => "NONE",
        }
    }
}

/// An eligible ready item with its derived ranking attributes.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub item: BoardItem,
    pub labels: Vec<String>,
    pub work_type: WorkType,
    pub work_type_source: WorkTypeSource,
    pub priority: Priority,
    pub issue_number: u64,
}

impl RankedCandidate {
    pub fn from_item(item: BoardItem) -> Self {
        let labels = item.content.labels();
        let (work_type, work_type_source) =
            classify_work_type(&labels, item.content.title(), item.content.body());
        let priority = priority_from_labels(&labels);
        let issue_number = item.content.number().unwrap_or(MISSING_ISSUE_NUMBER);
        Self {
            item,
            labels,
            work_type,
            work_type_source,
            priority,
            issue_number,
        }
    }

    fn cmp_rank(&self, other: &Self) -> Ordering {
        self.work_type
            .rank()
            .cmp(&other.work_type.rank())
            .then_with(|| self.priority.rank().cmp(&other.priority.rank()))
            .then_with(|| self.issue_number.cmp(&other.issue_number))
            .then_with(|| self.item.content.title().cmp(other.item.content.title()))
            .then_with(|| self.item.id.cmp(&other.item.id))
    }
}

#[derive(Debug, Clone)]
pub enum Selection {
    Found(Box<RankedCandidate>),
    NoWork,
}

/// Work type from labels first, then from defect vocabulary in the card text.
pub fn classify_work_type(labels: &[String], title: &str, body: &str) -> (WorkType, WorkTypeSource) {
    let normalized: Vec<String> = labels.iter().map(|l| normalize_status(l)).collect();
    if normalized.iter().any(|l| l == "bug" || l == "bugfix") {
        return (WorkType::Bugfix, WorkTypeSource::Label);
    }
    if normalized.iter().any(|l| l == "newtest") {
        return (WorkType::NewTest, WorkTypeSource::Label);
    }

    let text = format!("{title} {body}").to_lowercase();
    if DEFECT_SIGNAL.is_match(&text) {
        (WorkType::Bugfix, WorkTypeSource::Inferred)
    } else {
        (WorkType::NewTest, WorkTypeSource::Default)
    }
}

pub fn priority_from_labels(labels: &[String]) -> Priority {
    let normalized: Vec<String> = labels.iter().map(|l| normalize_status(l)).collect();
    [Priority::P0, Priority::P1, Priority::P2]
        .into_iter()
        .find(|p| normalized.iter().any(|l| l == &p.as_str().to_ascii_lowercase()))
        .unwrap_or(Priority::None)
}

/// Every ready item in rank order.
pub fn rank_ready_items(items: &[BoardItem], ready_status: &str, repo_filter: Option<&str>) -> Vec<RankedCandidate> {
    let wanted = normalize_status(ready_status);
    let mut candidates: Vec<RankedCandidate> = items
        .iter()
        .filter(|item| normalize_status(&item.status_name) == wanted)
        .filter(|item| match repo_filter {
            Some(repo) => item.content.repo_full_name() == Some(repo),
            None => true,
        })
        .cloned()
        .map(RankedCandidate::from_item)
        .collect();
    candidates.sort_by(RankedCandidate::cmp_rank);
    candidates
}

/// Pick the single best ready item, or signal that there is nothing to do.
pub fn select_ready_item(items: &[BoardItem], ready_status: &str, repo_filter: Option<&str>) -> Selection {
    match rank_ready_items(items, ready_status, repo_filter).into_iter().next() {
        Some(candidate) => Selection::Found(Box::new(candidate)),
        None => Selection::NoWork,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::fake::issue;
    use crate::board::{ItemContent, LinkedContent};

    fn found(selection: Selection) -> RankedCandidate {
        match selection {
            Selection::Found(c) => *c,
            Selection::NoWork => panic!("Expected a candidate"),
        }
    }

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn bug_label_outranks_priority() {
        let items = vec![
            issue("A", 5, "Cart bug", &["bug"], "Ready"),
            issue("B", 2, "New coverage", &["p0"], "Ready"),
        ];
        let selected = found(select_ready_item(&items, "Ready", None));
        assert_eq!(selected.issue_number, 5);
        assert_eq!(selected.work_type, WorkType::Bugfix);
        assert_eq!(selected.work_type_source, WorkTypeSource::Label);
    }

    #[test]
    fn priority_then_number_then_title_then_id() {
        let items = vec![
            issue("Z", 9, "b", &["newtest", "p1"], "Ready"),
            issue("Y", 3, "b", &["newtest", "p2"], "Ready"),
            issue("X", 9, "a", &["newtest", "p1"], "Ready"),
        ];
        let ranked = rank_ready_items(&items, "Ready", None);
        let ids: Vec<&str> = ranked.iter().map(|c| c.item.id.as_str()).collect();
        assert_eq!(ids, vec!["X", "Z", "Y"]);
    }

    #[test]
    fn id_only_breaks_full_ties() {
        let mut a = issue("I2", 4, "same", &[], "Ready");
        let mut b = issue("I1", 4, "same", &[], "Ready");
        assert_eq!(found(select_ready_item(&[a.clone(), b.clone()], "Ready", None)).item.id, "I1");

        std::mem::swap(&mut a.id, &mut b.id);
        assert_eq!(found(select_ready_item(&[a, b], "Ready", None)).item.id, "I1");
    }

    #[test]
    fn selection_is_order_independent() {
        let items = vec![
            issue("A", 7, "add coverage", &[], "Ready"),
            issue("B", 3, "login is broken", &[], "Ready"),
            issue("C", 1, "add cart test", &["p2"], "Ready"),
        ];
        let mut reversed = items.clone();
        reversed.reverse();
        let first = found(select_ready_item(&items, "Ready", None));
        let second = found(select_ready_item(&reversed, "Ready", None));
        assert_eq!(first.item.id, "B");
        assert_eq!(first.item.id, second.item.id);
    }

    #[test]
    fn status_match_is_normalized() {
        let items = vec![issue("A", 1, "t", &[], " READY ")];
        assert!(matches!(select_ready_item(&items, "ready", None), Selection::Found(_)));
    }

    #[test]
    fn no_ready_items_is_no_work() {
        let items = vec![issue("A", 1, "t", &[], "Done")];
        assert!(matches!(select_ready_item(&items, "Ready", None), Selection::NoWork));
        assert!(matches!(select_ready_item(&[], "Ready", None), Selection::NoWork));
    }

    #[test]
    fn repo_filter_excludes_drafts_and_other_repos() {
        let draft = BoardItem {
            id: "D".to_string(),
            content: ItemContent::DraftItem {
                title: "draft".to_string(),
                body: String::new(),
            },
            status_name: "Ready".to_string(),
        };
        let other = BoardItem {
            id: "O".to_string(),
            content: ItemContent::Issue(LinkedContent {
                number: Some(1),
                repo_full_name: "acme/other".to_string(),
                ..Default::default()
            }),
            status_name: "Ready".to_string(),
        };
        let mine = issue("M", 40, "mine", &[], "Ready");
        let items = vec![draft.clone(), other, mine];

        assert_eq!(found(select_ready_item(&items, "Ready", Some("acme/shop"))).item.id, "M");
        assert!(matches!(
            select_ready_item(&[draft.clone()], "Ready", Some("acme/shop")),
            Selection::NoWork
        ));

        let unfiltered = found(select_ready_item(&[draft], "Ready", None));
        assert_eq!(unfiltered.issue_number, MISSING_ISSUE_NUMBER);
    }

    #[test]
    fn inferred_bugfix_from_text() {
        assert_eq!(
            classify_work_type(&[], "Checkout falha ao calcular total", ""),
            (WorkType::Bugfix, WorkTypeSource::Inferred)
        );
        assert_eq!(
            classify_work_type(&[], "Login", "the button is broken"),
            (WorkType::Bugfix, WorkTypeSource::Inferred)
        );
        assert_eq!(
            classify_work_type(&[], "Add fixture for cart", "prefix handling"),
            (WorkType::NewTest, WorkTypeSource::Default)
        );
    }

    #[test]
    fn label_wins_over_text() {
        assert_eq!(
            classify_work_type(&labels(&["New Test"]), "fix broken cart", ""),
            (WorkType::NewTest, WorkTypeSource::Label)
        );
        assert_eq!(
            classify_work_type(&labels(&["Bug-Fix"]), "", ""),
            (WorkType::Bugfix, WorkTypeSource::Label)
        );
    }

    #[test]
    fn priority_uses_highest_label() {
        assert_eq!(priority_from_labels(&labels(&["P2", "p0"])), Priority::P0);
        assert_eq!(priority_from_labels(&labels(&["priority"])), Priority::None);
    }

    #[test]
    fn work_type_wire_names() {
        assert_eq!(serde_json::to_string(&WorkType::NewTest).unwrap(), "\"newTest\"");
        assert_eq!(WorkType::parse("bugfix"), WorkType::Bugfix);
        assert_eq!(WorkType::parse("chore"), WorkType::Unknown);
    }
}
