//! Product name extraction for inventory cards.

use std::sync::LazyLock;

use regex::Regex;

/// Product used when the card names the red T-shirt instead of a "Sauce Labs" item.
pub const FALLBACK_PRODUCT: &str = "Test.allTheThings() T-Shirt (Red)";

// "Sauce Labs" followed by up to five title-cased tokens.
static SAUCE_LABS_PRODUCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:sauce labs)((?:\s+[A-Z0-9(][A-Za-z0-9().'\-]*){1,5})").unwrap()
});

static TRAILING_VALIDATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(valide|validar|validate|quero|teste|test|descricao|descrição|description|imagem|image)\b.*$",
    )
    .unwrap()
});

static FALLBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Test\.allTheThings\(\) T-Shirt \(Red\)").unwrap());

/// Extract the product a card talks about, if any.
pub fn extract_product_name(text: &str) -> Option<String> {
    if let Some(caps) = SAUCE_LABS_PRODUCT.captures(text) {
        let tokens = caps.get(1).map_or("", |m| m.as_str());
        let tokens = TRAILING_VALIDATION.replace(tokens, "");
        let tokens = tokens.trim().trim_end_matches(['.', ',', ';', ':']);
        if !tokens.is_empty() {
            return Some(format!("Sauce Labs {tokens}"));
        }
    }

    FALLBACK
        .is_match(text)
        .then(|| FALLBACK_PRODUCT.to_string())
}

/// Display name without the brand prefix.
pub fn short_product_name(name: &str) -> &str {
    let trimmed = name.trim();
    match trimmed.get(..11) {
        Some(prefix) if prefix.eq_ignore_ascii_case("sauce labs ") => trimmed[11..].trim_start(),
        _ => trimmed,
    }
}
