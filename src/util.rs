//! Shared text helpers.

/// Convert text to a lower-case, hyphen-delimited ASCII slug of at most `max_len` bytes.
pub fn slugify(text: &str, max_len: usize) -> String {
    let slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.len() > max_len {
        slug[..max_len].trim_end_matches('-').to_string()
    } else {
        slug
    }
}

/// Escape single quotes for embedding in a single-quoted TypeScript string.
pub fn escape_single_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_normal_title() {
        assert_eq!(slugify("Fix the API bug", 50), "fix-the-api-bug");
    }

    #[test]
    fn test_slugify_special_characters() {
        assert_eq!(slugify("Fix @#$ bug!", 50), "fix-bug");
    }

    #[test]
    fn test_slugify_drops_accented_letters() {
        assert_eq!(slugify("Validação do carrinho", 50), "valida-o-do-carrinho");
    }

    #[test]
    fn test_slugify_truncation_no_trailing_dash() {
        let result = slugify("abcde fghij", 6);
        assert_eq!(result, "abcde");
    }

    #[test]
    fn test_slugify_branch_length() {
        let result = slugify(
            "Create a new test adding two products to the cart and checking totals",
            42,
        );
        assert!(result.len() <= 42);
        assert!(!result.ends_with('-'));
    }

    #[test]
    fn test_slugify_empty_input() {
        assert_eq!(slugify("", 50), "");
        assert_eq!(slugify("@#$%^&*()", 50), "");
    }

    #[test]
    fn test_escape_single_quotes() {
        assert_eq!(escape_single_quotes("Bob's Jacket"), "Bob\\'s Jacket");
    }
}
