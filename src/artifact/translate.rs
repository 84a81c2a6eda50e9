//! Portuguese-to-English renaming of test titles and file names.
//!
//! Translation is word-by-word through a fixed lexicon. Every English output
//! word is absent from the lexicon's keys or maps to itself, so applying the
//! transform twice changes nothing the second time.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

const PT_TO_EN: &[(&str, &str)] = &[
    ("adicionando", "adding"),
    ("adicione", "add"),
    ("adicionar", "add"),
    ("adicionado", "added"),
    ("adicionados", "added"),
    ("apenas", "only"),
    ("auto", "auto"),
    ("carrinho", "cart"),
    ("corrigir", "fix"),
    ("criar", "create"),
    ("descricao", "description"),
    ("despacho", "dispatch"),
    ("disparo", "trigger"),
    ("dois", "two"),
    ("duas", "two"),
    ("english", "english"),
    ("erro", "error"),
    ("excluir", "delete"),
    ("exclusao", "deletion"),
    ("fluxo", "flow"),
    ("gerado", "generated"),
    ("gerados", "generated"),
    ("gerar", "generate"),
    ("ingles", "english"),
    ("manual", "manual"),
    ("mudar", "change"),
    ("nao", "not"),
    ("nome", "name"),
    ("nomes", "names"),
    ("novo", "new"),
    ("pedido", "requested"),
    ("pedi", "requested"),
    ("portugues", "portuguese"),
    ("produto", "product"),
    ("produtos", "products"),
    ("quatro", "four"),
    ("que", "that"),
    ("refatorar", "refactor"),
    ("refatore", "refactor"),
    ("refatoracao", "refactor"),
    ("remover", "remove"),
    ("sem", "without"),
    ("teste", "test"),
    ("testes", "tests"),
    ("tres", "three"),
    ("validar", "validate"),
    ("validacao", "validation"),
    ("wrong", "wrong"),
];

static PORTUGUESE_SIGNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(criar|adicionando|carrinho|produto|produtos|portugues|ingles|teste|testes|refatorar|remover|excluir|validar|novo)\b",
    )
    .unwrap()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{L}+").unwrap());

// Quoted first argument of test(...), describe(...), test.describe(...) and test.step(...).
static TITLE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(test|describe|step)\(\s*(?:'([^'\n]*)'|"([^"\n]*)"|`([^`]*)`)"#).unwrap()
});

/// Lower-case and strip combining marks: "Português" becomes "portugues".
pub fn fold_diacritics(word: &str) -> String {
    word.nfkd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase()
}

fn lookup(folded: &str) -> Option<&'static str> {
    PT_TO_EN
        .iter()
        .find(|(pt, _)| *pt == folded)
        .map(|(_, en)| *en)
}

/// Translate one word, preserving upper-case and capitalized forms.
pub fn map_word(word: &str) -> Cow<'_, str> {
    let Some(mapped) = lookup(&fold_diacritics(word)) else {
        return Cow::Borrowed(word);
    };

    let has_letters = word.chars().any(char::is_alphabetic);
    if has_letters && word.chars().count() > 1 && word.to_uppercase() == word {
        return Cow::Owned(mapped.to_uppercase());
    }
    if word.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = mapped.chars();
        return Cow::Owned(match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        });
    }
    Cow::Owned(mapped.to_string())
}

pub fn translate_sentence(text: &str) -> String {
    WORD.replace_all(text, |caps: &Captures| map_word(&caps[0]).into_owned())
        .into_owned()
}

/// Translate a hyphenated slug token by token.
pub fn translate_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|token| !token.is_empty())
        .map(|token| map_word(token).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}

/// Rewrite every quoted test/describe/step title in `content`.
pub fn translate_titles(content: &str) -> String {
    TITLE_CALL
        .replace_all(content, |caps: &Captures| {
            let (quote, title) = if let Some(m) = caps.get(2) {
                ('\'', m.as_str())
            } else if let Some(m) = caps.get(3) {
                ('"', m.as_str())
            } else {
                ('`', caps.get(4).map_or("", |m| m.as_str()))
            };
            let opening = &caps[0][..caps[0].find(quote).unwrap_or(caps[0].len())];
            format!("{opening}{quote}{}{quote}", translate_sentence(title))
        })
        .into_owned()
}

pub fn has_portuguese_signal(text: &str) -> bool {
    PORTUGUESE_SIGNAL.is_match(&fold_diacritics(text))
}

/// Whether any test/describe/step title carries Portuguese vocabulary.
pub fn has_portuguese_titles(content: &str) -> bool {
    TITLE_CALL.captures_iter(content).any(|caps| {
        let title = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        has_portuguese_signal(title)
    })
}

/// Translated file name for `path`, or `None` when nothing changes.
pub fn translate_file_name(path: &str, suffix: &str) -> Option<String> {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };
    let stem = name.strip_suffix(suffix)?;
    let translated = translate_slug(stem);
    if translated.is_empty() || translated == stem {
        return None;
    }
    Some(match dir {
        Some(dir) => format!("{dir}/{translated}{suffix}"),
        None => format!("{translated}{suffix}"),
    })
}
