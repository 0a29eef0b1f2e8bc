use regex::Regex;
use std::sync::OnceLock;

/// Canonical form of a comma-separated answer: split, trim, lowercase,
/// drop empty tokens, sort. MCQ answers are a single token, MSQ answers a
/// set of tokens; sorting makes the comparison order-insensitive.
pub fn normalize_answer(raw: &str) -> Vec<String> {
    let mut tokens: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort();
    tokens
}

/// Order/case/whitespace-insensitive equality of two answer token lists.
pub fn answers_match(given: &str, correct: &str) -> bool {
    normalize_answer(given) == normalize_answer(correct)
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Strips HTML markup and collapses whitespace runs to single spaces.
/// Question bodies and reference answers arrive from a rich-text editor;
/// the grading prompt wants plain text.
pub fn strip_html(text: &str) -> String {
    let stripped = html_tag_re().replace_all(text, " ");
    collapse_whitespace(&stripped)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sanitizes submitted source before validation: CRLF/CR to LF, control
/// characters other than newline and tab removed.
pub fn sanitize_source(code: &str) -> String {
    code.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Line-ending-normalized, trimmed text used for duplicate test-case
/// detection and output comparison.
pub fn normalize_case_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}
