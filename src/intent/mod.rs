//! Card-intent parsing.
//!
//! [`IntentParser::parse`] is pure: it turns card title and body into a
//! [`CardIntent`] without touching the file system. The set of existing spec
//! files is passed in so bare file names can be resolved.

pub mod paths;
pub mod product;
pub mod rules;

use serde::Serialize;

use crate::errors::ArtifactError;
use crate::selector::WorkType;

pub use paths::{PathMatcher, RenamePair, TestLayout};
pub use product::extract_product_name;
use rules::{Effect, RULES};

/// Requested actions and their parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardIntent {
    pub create: bool,
    pub delete: bool,
    pub refactor_titles: bool,
    pub refactor_files: bool,
    pub instrument_steps: bool,
    pub update_agent_policy: bool,
    /// Test-file paths referenced in the card, first appearance order.
    pub explicit_paths: Vec<String>,
    pub explicit_rename_pairs: Vec<RenamePair>,
    pub product_name: Option<String>,
}

/// Action flags as reported in the workflow payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntentActions {
    pub create: bool,
    pub delete: bool,
    pub refactor: bool,
    pub refactor_titles: bool,
    pub refactor_files: bool,
    pub instrument_steps: bool,
    pub update_agent_policy: bool,
}

impl CardIntent {
    /// Any of the refactor sub-actions.
    pub fn refactor(&self) -> bool {
        self.refactor_titles || self.refactor_files || self.instrument_steps || self.update_agent_policy
    }

    pub fn has_action(&self) -> bool {
        self.create || self.delete || self.refactor()
    }

    /// Apply the work-type default: a card with no recognised action is a
    /// creation request for new-test work and an error otherwise.
    pub fn resolve_default(mut self, work_type: WorkType) -> Result<Self, ArtifactError> {
        if self.has_action() {
            return Ok(self);
        }
        if work_type == WorkType::NewTest {
            self.create = true;
            return Ok(self);
        }
        Err(ArtifactError::NoActionableIntent {
            work_type: work_type.to_string(),
        })
    }

    /// Explicit paths that are not part of a rename pair.
    pub fn delete_targets(&self) -> Vec<&str> {
        self.explicit_paths
            .iter()
            .filter(|path| {
                !self
                    .explicit_rename_pairs
                    .iter()
                    .any(|pair| &pair.from == *path || &pair.to == *path)
            })
            .map(String::as_str)
            .collect()
    }

    pub fn actions(&self) -> IntentActions {
        IntentActions {
            create: self.create,
            delete: self.delete,
            refactor: self.refactor(),
            refactor_titles: self.refactor_titles,
            refactor_files: self.refactor_files,
            instrument_steps: self.instrument_steps,
            update_agent_policy: self.update_agent_policy,
        }
    }
}

#[derive(Debug, Default)]
struct Signals {
    create: bool,
    negate_create: bool,
    delete: bool,
    refactor: bool,
    rename_files: bool,
    rename_titles: bool,
    instrument_steps: bool,
    agent_policy: bool,
}

impl Signals {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::CreateSignal => self.create = true,
            Effect::NegateCreate => self.negate_create = true,
            Effect::Delete => self.delete = true,
            Effect::Refactor => self.refactor = true,
            Effect::RenameFiles => self.rename_files = true,
            Effect::RenameTitles => self.rename_titles = true,
            Effect::InstrumentSteps => self.instrument_steps = true,
            Effect::AgentPolicy => self.agent_policy = true,
        }
    }
}

#[derive(Debug)]
pub struct IntentParser {
    paths: PathMatcher,
}

impl IntentParser {
    pub fn new(layout: &TestLayout) -> Self {
        Self {
            paths: PathMatcher::new(layout),
        }
    }

    pub fn parse(&self, title: &str, body: &str, known_specs: &[String]) -> CardIntent {
        let text = format!("{title} {body}").trim().to_string();
        let explicit_paths = self.paths.explicit_paths(&text, known_specs);
        let explicit_rename_pairs = self.paths.rename_pairs(&format!("{title}\n{body}"), known_specs);

        let working = self
            .paths
            .mask(&text)
            .to_lowercase()
            .replace("test.step", "teststep");

        let mut signals = Signals::default();
        for rule in RULES.iter().filter(|rule| rule.matches(&working)) {
            signals.apply(rule.effect);
        }

        let mut intent = CardIntent {
            create: signals.create && !signals.negate_create,
            delete: signals.delete,
            explicit_paths,
            explicit_rename_pairs,
            product_name: extract_product_name(&text),
            ..Default::default()
        };

        // Sub-flags only count once refactor vocabulary or a rename pair opened the umbrella.
        let refactor = signals.refactor || !intent.explicit_rename_pairs.is_empty();
        if refactor {
            intent.refactor_files = signals.rename_files || !intent.explicit_rename_pairs.is_empty();
            intent.instrument_steps = signals.instrument_steps;
            intent.update_agent_policy = signals.agent_policy;
            if !intent.refactor_files && !intent.instrument_steps && !intent.update_agent_policy {
                intent.refactor_files = true;
            }
            intent.refactor_titles = intent.refactor_files || signals.rename_titles;
        }
        intent
    }
}
