//! Step instrumentation of Playwright test bodies.
//!
//! Each `test(...)` body is split into blank-line separated blocks and every
//! block is wrapped in `await test.step('Step N: <Title>', async () => { ... })`.
//! Bodies that already contain a step are left untouched, which makes the
//! transform idempotent.
//!
//! Scanning runs over a code mask: string literals and comments are blanked
//! byte-for-byte, so braces, blank lines and keywords inside them never count.

use std::sync::LazyLock;

use regex::Regex;

const STEP_MARKER: &str = "test.step(";

static TEST_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btest\s*\(").unwrap());

static METHOD_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*([A-Za-z_$][\w$]*)\s*\(").unwrap());

static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_$][\w$]*)\s*\(").unwrap());

const KEYWORDS: &[&str] = &[
    "await", "async", "if", "for", "while", "switch", "catch", "function", "return", "expect",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    Quoted(u8),
    LineComment,
    BlockComment,
}

/// Blank out string contents and comments, keeping byte offsets and code newlines.
pub fn code_mask(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut state = ScanState::Code;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            ScanState::Code => match (b, next) {
                (b'\'' | b'"' | b'`', _) => {
                    out.push(b);
                    state = ScanState::Quoted(b);
                }
                (b'/', Some(b'/')) => {
                    out.extend_from_slice(b"  ");
                    state = ScanState::LineComment;
                    i += 1;
                }
                (b'/', Some(b'*')) => {
                    out.extend_from_slice(b"  ");
                    state = ScanState::BlockComment;
                    i += 1;
                }
                _ => out.push(b),
            },
            ScanState::Quoted(delim) => {
                if b == b'\\' && next.is_some() {
                    out.extend_from_slice(b"  ");
                    i += 1;
                } else if b == delim {
                    out.push(b);
                    state = ScanState::Code;
                } else {
                    out.push(b' ');
                }
            }
            ScanState::LineComment => {
                if b == b'\n' {
                    out.push(b'\n');
                    state = ScanState::Code;
                } else {
                    out.push(b' ');
                }
            }
            ScanState::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    out.extend_from_slice(b"  ");
                    state = ScanState::Code;
                    i += 1;
                } else {
                    out.push(b' ');
                }
            }
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Index of the bracket closing the one at `open`.
fn matching_close(masked: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (offset, b) in masked[open..].iter().enumerate() {
        match b {
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Opening brace of the callback body inside a `test(` call spanning `start..end`.
fn callback_body_open(masked: &str, start: usize, end: usize) -> Option<usize> {
    let arrow = masked[start..end].find("=>")? + start + 2;
    let rest = &masked[arrow..end];
    let skipped = rest.len() - rest.trim_start().len();
    (rest.trim_start().starts_with('{')).then_some(arrow + skipped)
}

/// `camelCase` or `snake_case` identifier to "Title Case Words".
pub fn title_from_identifier(ident: &str) -> String {
    let chars: Vec<char> = ident.trim_matches(|c| c == '_' || c == '$').chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '$' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && (prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
                || next.is_some_and(char::is_lowercase));
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_assertion_only(masked_block: &str) -> bool {
    let mut saw_expect = false;
    for line in masked_block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let statement = line.strip_prefix("await ").unwrap_or(line).trim_start();
        if statement.starts_with("expect") {
            saw_expect = true;
        } else if !(statement.starts_with('.') || statement.starts_with(')')) {
            return false;
        }
    }
    saw_expect
}

/// Human title for one block, derived from its first call.
fn block_title(masked_block: &str) -> Option<String> {
    if is_assertion_only(masked_block) {
        return Some("Validate expectation".to_string());
    }
    if let Some(caps) = METHOD_CALL.captures(masked_block) {
        return Some(title_from_identifier(&caps[1]));
    }
    FUNCTION_CALL
        .captures_iter(masked_block)
        .map(|caps| caps[1].to_string())
        .find(|name| !KEYWORDS.contains(&name.as_str()))
        .map(|name| title_from_identifier(&name))
}

/// Logical lines of `range`: newlines inside strings or comments do not split.
fn logical_lines(masked: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut lines = Vec::new();
    let mut line_start = start;
    for (offset, b) in masked.as_bytes()[start..end].iter().enumerate() {
        if *b == b'\n' {
            lines.push((line_start, start + offset));
            line_start = start + offset + 1;
        }
    }
    lines.push((line_start, end));
    lines
}

/// Rewrite the body between `open` and `close` braces, or `None` to keep it.
fn instrument_body(source: &str, masked: &str, open: usize, close: usize) -> Option<String> {
    let inner = &source[open + 1..close];
    if inner.contains(STEP_MARKER) || !inner.contains('\n') {
        return None;
    }

    // Split into blocks at blank lines that sit at nesting depth zero.
    let mut blocks: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut current: Vec<(usize, usize)> = Vec::new();
    let mut depth = 0i32;
    for (start, end) in logical_lines(masked, open + 1, close) {
        let blank = source[start..end].trim().is_empty();
        if blank && depth == 0 {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push((start, end));
        for b in masked[start..end].bytes() {
            match b {
                b'(' | b'{' | b'[' => depth += 1,
                b')' | b'}' | b']' => depth -= 1,
                _ => {}
            }
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    if blocks.is_empty() {
        return None;
    }

    let closing_indent = inner
        .rsplit_once('\n')
        .map(|(_, tail)| tail)
        .filter(|tail| tail.trim().is_empty())
        .unwrap_or("");

    let rendered: Vec<String> = blocks
        .iter()
        .enumerate()
        .map(|(index, lines)| {
            let (first_start, first_end) = lines[0];
            let first = &source[first_start..first_end];
            let indent = &first[..first.len() - first.trim_start().len()];
            let block_start = lines[0].0;
            let block_end = lines[lines.len() - 1].1;
            let number = index + 1;
            let title = match block_title(&masked[block_start..block_end]) {
                Some(title) => format!("Step {number}: {title}"),
                None => format!("Step {number}"),
            };

            let mut out = vec![format!(
                "{indent}await test.step('{}', async () => {{",
                title.replace('\'', "\\'")
            )];
            for &(start, end) in lines {
                let line = &source[start..end];
                if line.trim().is_empty() {
                    out.push(String::new());
                } else {
                    out.push(format!("  {line}"));
                }
            }
            out.push(format!("{indent}}});"));
            out.join("\n")
        })
        .collect();

    Some(format!("\n{}\n{closing_indent}", rendered.join("\n\n")))
}

/// Wrap every un-instrumented test body in named steps.
///
/// Returns the input unchanged when there is nothing to do.
pub fn instrument_steps(source: &str) -> String {
    let masked = code_mask(source);
    let bytes = masked.as_bytes();
    let mut edits: Vec<(usize, usize, String)> = Vec::new();

    for m in TEST_CALL.find_iter(&masked) {
        if m.start() > 0 && matches!(bytes[m.start() - 1], b'.' | b'$') {
            continue;
        }
        if edits.iter().any(|(start, end, _)| m.start() > *start && m.start() < *end) {
            continue;
        }
        let paren = m.end() - 1;
        let Some(call_close) = matching_close(bytes, paren) else { continue };
        let Some(open) = callback_body_open(&masked, paren, call_close) else { continue };
        let Some(close) = matching_close(bytes, open) else { continue };
        if let Some(body) = instrument_body(source, &masked, open, close) {
            edits.push((open + 1, close, body));
        }
    }

    let mut result = source.to_string();
    for (start, end, replacement) in edits.into_iter().rev() {
        result.replace_range(start..end, &replacement);
    }
    result
}

pub fn has_step_marker(source: &str) -> bool {
    source.contains(STEP_MARKER)
}
