//! Ordered keyword rules over normalized card text.
//!
//! Each rule pairs one pattern with one effect. The parser evaluates all of
//! them against the lower-cased, path-masked text and folds the matched
//! effects into a [`CardIntent`](super::CardIntent).

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// A creation verb close to "test".
    CreateSignal,
    /// A negated creation verb aimed at a test; cancels `CreateSignal`.
    NegateCreate,
    Delete,
    /// General refactor vocabulary; enables the refactor sub-flags.
    Refactor,
    RenameFiles,
    RenameTitles,
    InstrumentSteps,
    AgentPolicy,
}

#[derive(Debug)]
pub struct IntentRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub effect: Effect,
}

impl IntentRule {
    fn new(name: &'static str, pattern: &str, effect: Effect) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            effect,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

pub static RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    vec![
        IntentRule::new(
            "create-command",
            r"\b(crie|criar|adicione|adicionar|gere|gerar|implemente|create|add|generate)\b[^.\n]{0,40}\b(test|teste|tests|testes)\b",
            Effect::CreateSignal,
        ),
        IntentRule::new(
            "negated-create",
            r"\b(n[aã]o|not|don'?t|never|nunca)\s+(crie|criar|create|adicione|adicionar|add|gere|gerar|generate)\b[^.\n]{0,20}\b(tests?|testes?)\b",
            Effect::NegateCreate,
        ),
        IntentRule::new(
            "delete",
            r"\b(excluir|exclua|exclui|remove|remover|remova|delete|deletar|apagar|apague)\b",
            Effect::Delete,
        ),
        IntentRule::new(
            "refactor",
            r"(refator\w*|refactor\w*|renome\w*|renam\w*|padroniz\w*|normaliz\w*|ingl[eê]s|english|traduz\w*|translat\w*)",
            Effect::Refactor,
        ),
        IntentRule::new(
            "rename-files",
            r"(renome\w*|renam\w*|ingl[eê]s|english|traduz\w*|translat\w*|file ?names?|nomes? d[eo]s? arquivos?|test names?|nomes? d[eo]s? testes?)",
            Effect::RenameFiles,
        ),
        IntentRule::new(
            "rename-titles",
            r"\b(t[ií]tulos?|titles?|describe)\b",
            Effect::RenameTitles,
        ),
        IntentRule::new(
            "instrument-steps",
            r"(teststep|instrument\w*|named steps?|steps? nomead[oa]s?|\b(em|com|in|into|with) steps?\b|passos nomeados|etapas nomeadas)",
            Effect::InstrumentSteps,
        ),
        IntentRule::new(
            "agent-policy",
            r"(agents\.md|claude\.md|copilot-instructions|agent polic(y|ies)|pol[ií]tica d[eo]s? agentes?|instru[cç][oõ]es d[eo]s? agentes?)",
            Effect::AgentPolicy,
        ),
    ]
});

/// Names of the rules that fire on `text`, in table order.
pub fn matched_rules(text: &str) -> Vec<&'static str> {
    RULES
        .iter()
        .filter(|rule| rule.matches(text))
        .map(|rule| rule.name)
        .collect()
}
