//! Explicit test-file references in card text.
//!
//! Two forms are recognised: full paths under the tests directory
//! (`tests/cart/cart-002-totals.spec.ts`) and bare sequenced file names
//! (`cart-002-totals.spec.ts`). Bare names only count when they resolve to
//! exactly one existing spec file.

use regex::Regex;
use serde::Serialize;

/// Where test artifacts live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestLayout {
    pub tests_dir: String,
    pub spec_suffix: String,
}

impl Default for TestLayout {
    fn default() -> Self {
        Self {
            tests_dir: "tests".to_string(),
            spec_suffix: ".spec.ts".to_string(),
        }
    }
}

impl TestLayout {
    pub fn is_spec_file(&self, path: &str) -> bool {
        path.ends_with(&self.spec_suffix)
    }

    /// File name without the spec suffix.
    pub fn stem<'a>(&self, path: &'a str) -> &'a str {
        let name = file_name(path);
        name.strip_suffix(self.spec_suffix.as_str()).unwrap_or(name)
    }
}

/// A `(from, to)` rename requested with arrow notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePair {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PathToken {
    start: usize,
    end: usize,
    text: String,
    bare: bool,
}

/// Compiled path patterns for one layout.
#[derive(Debug)]
pub struct PathMatcher {
    layout: TestLayout,
    full: Regex,
    bare: Regex,
}

impl PathMatcher {
    pub fn new(layout: &TestLayout) -> Self {
        let suffix = regex::escape(&layout.spec_suffix);
        let dir = regex::escape(layout.tests_dir.trim_end_matches('/'));
        // No lookbehind in `regex`: the boundary is consumed and the path is group 1.
        let full = Regex::new(&format!(
            r"(?:^|[^A-Za-z0-9_./-])((?:\./)?{dir}/[A-Za-z0-9_./-]+?{suffix})"
        ))
        .expect("escaped path pattern is valid");
        let bare = Regex::new(&format!(r"(?i)\b[a-z]+-\d{{3}}-[a-z0-9-]+{suffix}"))
            .expect("escaped file name pattern is valid");
        Self {
            layout: layout.clone(),
            full,
            bare,
        }
    }

    pub fn layout(&self) -> &TestLayout {
        &self.layout
    }

    fn tokens(&self, text: &str) -> Vec<PathToken> {
        let mut tokens: Vec<PathToken> = self
            .full
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| PathToken {
                start: m.start(),
                end: m.end(),
                text: normalize_path(m.as_str()),
                bare: false,
            })
            .collect();

        for m in self.bare.find_iter(text) {
            let inside_full = tokens
                .iter()
                .any(|t| !t.bare && m.start() >= t.start && m.end() <= t.end);
            if !inside_full {
                tokens.push(PathToken {
                    start: m.start(),
                    end: m.end(),
                    text: m.as_str().to_string(),
                    bare: true,
                });
            }
        }
        tokens.sort_by_key(|t| t.start);
        tokens
    }

    /// Resolve a bare file name against the existing spec files.
    fn resolve_bare(name: &str, known_specs: &[String]) -> Option<String> {
        let mut matches = known_specs
            .iter()
            .filter(|path| file_name(path).eq_ignore_ascii_case(name));
        let first = matches.next()?;
        matches.next().is_none().then(|| normalize_path(first))
    }

    /// Every explicit path in `text`, first appearance order, duplicates removed.
    pub fn explicit_paths(&self, text: &str, known_specs: &[String]) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for token in self.tokens(text) {
            let resolved = if token.bare {
                Self::resolve_bare(&token.text, known_specs)
            } else {
                Some(token.text)
            };
            if let Some(path) = resolved
                && !paths.contains(&path)
            {
                paths.push(path);
            }
        }
        paths
    }

    /// Replace every path reference with a neutral placeholder so keyword
    /// rules never fire on words inside file names.
    pub fn mask(&self, text: &str) -> String {
        let tokens = self.tokens(text);
        let mut masked = String::with_capacity(text.len());
        let mut cursor = 0;
        for token in tokens {
            if token.start < cursor {
                continue;
            }
            masked.push_str(&text[cursor..token.start]);
            masked.push_str(" <path> ");
            cursor = token.end;
        }
        masked.push_str(&text[cursor..]);
        masked
    }

    /// Rename pairs from arrow lines.
    ///
    /// `a -> b` on one line yields a pair. A line holding a single path sets a
    /// pending source that a later arrow line with one path completes; any line
    /// without paths clears it. A bare target that does not exist yet lands in
    /// the source's directory.
    pub fn rename_pairs(&self, text: &str, known_specs: &[String]) -> Vec<RenamePair> {
        let mut pairs = Vec::new();
        let mut pending: Option<String> = None;

        for line in text.lines() {
            let tokens = self.tokens(line);
            let has_arrow = line.contains("->") || line.contains("=>") || line.contains('→');

            match (has_arrow, tokens.as_slice()) {
                (_, []) => pending = None,
                (true, [from, to, ..]) => {
                    if let Some(from) = self.resolve_source(from, known_specs) {
                        let to = self.resolve_target(to, &from, known_specs);
                        pairs.push(RenamePair { from, to });
                    }
                    pending = None;
                }
                (true, [to]) => {
                    if let Some(from) = pending.take() {
                        let to = self.resolve_target(to, &from, known_specs);
                        pairs.push(RenamePair { from, to });
                    }
                }
                (false, [only]) => pending = self.resolve_source(only, known_specs),
                (false, _) => pending = None,
            }
        }
        pairs
    }

    fn resolve_source(&self, token: &PathToken, known_specs: &[String]) -> Option<String> {
        if token.bare {
            Self::resolve_bare(&token.text, known_specs)
        } else {
            Some(token.text.clone())
        }
    }

    fn resolve_target(&self, token: &PathToken, from: &str, known_specs: &[String]) -> String {
        if !token.bare {
            return token.text.clone();
        }
        Self::resolve_bare(&token.text, known_specs).unwrap_or_else(|| match from.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{}", token.text),
            None => token.text.clone(),
        })
    }
}

/// Last path segment.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Drop `./` and empty segments; `..` is kept so callers can reject it.
pub fn normalize_path(path: &str) -> String {
    path.trim()
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
