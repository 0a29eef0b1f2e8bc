use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::models::coding_question::MAX_BOILERPLATE_CHARS;
use crate::models::submission::{MAX_SOLUTION_CHARS, MAX_SOLUTION_LINES};
use crate::utils::normalize::sanitize_source;

pub const SUPPORTED_LANGUAGES: &[&str] =
    &["python", "javascript", "java", "c", "cpp", "ruby", "go"];

/// Blacklisted constructs rejected before any execution is attempted.
///
/// Not a security boundary: actual isolation is the execution service's
/// responsibility. This is a first-line filter so obviously malicious input
/// never consumes execution-service capacity.
const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    (r"\beval\s*\(", "dynamic evaluation (eval)"),
    (r"\bexec[lv]?p?e?\s*\(", "dynamic execution (exec)"),
    (r"\bsystem\s*\(", "system call invocation"),
    (r"`[^`]*`", "shell back-tick invocation"),
    (r"\bpopen\s*\(", "process pipe invocation"),
    (r"\bsubprocess\b", "subprocess module usage"),
    (r"Runtime\s*\.\s*getRuntime", "JVM runtime invocation"),
    (r"\bProcessBuilder\b", "JVM process construction"),
    (r#"child_process"#, "Node child process module"),
    (r"rm\s+-rf?\b", "destructive filesystem command"),
    (r"\bfork\s*\(", "process forking"),
    (r"\bkill\s*\(", "process-control call (kill)"),
    (r"\bshutil\s*\.\s*rmtree", "recursive directory removal"),
    (r"\bunlink\s*\(", "file deletion call"),
    (r"__import__\s*\(", "dynamic import"),
    (r"\bimportlib\b", "dynamic import module"),
];

fn blacklist() -> &'static Vec<(Regex, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DANGEROUS_PATTERNS
            .iter()
            .map(|(pattern, label)| {
                (
                    Regex::new(&format!("(?i){}", pattern)).expect("valid blacklist regex"),
                    *label,
                )
            })
            .collect()
    })
}

/// Sanitizes and validates a candidate's solution submission. Returns the
/// sanitized source on success so the exact validated text is what gets
/// executed and persisted.
pub fn validate_solution(code: &str, language: &str) -> Result<String> {
    validate(code, language, MAX_SOLUTION_CHARS, Some(MAX_SOLUTION_LINES))
}

/// Boilerplate-class fields carry a tighter cap and no line limit.
pub fn validate_boilerplate_class(code: &str, language: &str) -> Result<String> {
    validate(code, language, MAX_BOILERPLATE_CHARS, None)
}

fn validate(
    code: &str,
    language: &str,
    max_chars: usize,
    max_lines: Option<usize>,
) -> Result<String> {
    let sanitized = sanitize_source(code);

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidSubmission("Code must not be empty".to_string()));
    }
    if sanitized.chars().count() > max_chars {
        return Err(Error::InvalidSubmission(format!(
            "Code exceeds the maximum length of {} characters",
            max_chars
        )));
    }
    if let Some(limit) = max_lines {
        if sanitized.lines().count() > limit {
            return Err(Error::InvalidSubmission(format!(
                "Code exceeds the maximum of {} lines",
                limit
            )));
        }
    }
    if !SUPPORTED_LANGUAGES.contains(&language.to_lowercase().as_str()) {
        return Err(Error::InvalidSubmission(format!(
            "Unsupported language: {}",
            language
        )));
    }

    for (pattern, label) in blacklist() {
        if pattern.is_match(&sanitized) {
            return Err(Error::InvalidSubmission(format!(
                "Code contains a forbidden construct: {}",
                label
            )));
        }
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_benign_code() {
        let code = "def add(a, b):\n    return a + b\n\nprint(add(1, 2))";
        assert!(validate_solution(code, "python").is_ok());
    }

    #[test]
    fn rejects_empty_code() {
        assert!(matches!(
            validate_solution("   \n  ", "python"),
            Err(Error::InvalidSubmission(_))
        ));
    }

    #[test]
    fn rejects_unsupported_language() {
        assert!(matches!(
            validate_solution("print(1)", "brainfuck"),
            Err(Error::InvalidSubmission(_))
        ));
    }

    #[test]
    fn rejects_shell_backticks_even_in_well_formed_code() {
        let code = "x = `rm tmp`\nputs x";
        assert!(matches!(
            validate_solution(code, "ruby"),
            Err(Error::InvalidSubmission(_))
        ));
    }

    #[test]
    fn rejects_blacklisted_calls() {
        for code in [
            "eval(input())",
            "import subprocess",
            "os.system(\"ls\")",
            "Runtime.getRuntime().exec(cmd)",
            "require('child_process')",
            "shutil.rmtree('/')",
            "__import__('os')",
        ] {
            assert!(
                validate_solution(code, "python").is_err(),
                "expected rejection: {}",
                code
            );
        }
    }

    #[test]
    fn benign_code_with_similar_words_passes() {
        // "evaluation" and "killed" must not trip word-boundary patterns
        let code = "# evaluation of killed processes is out of scope\nresult = a + b";
        assert!(validate_solution(code, "python").is_ok());
    }

    #[test]
    fn rejects_oversized_code() {
        let code = "a = 1\n".repeat(10_000);
        assert!(matches!(
            validate_solution(&code, "python"),
            Err(Error::InvalidSubmission(_))
        ));
    }

    #[test]
    fn boilerplate_class_uses_tighter_cap() {
        let code = format!("x = 1{}", " ".repeat(20_000));
        assert!(validate_boilerplate_class(&code, "python").is_err());
        assert!(validate_solution(&code, "python").is_ok());
    }

    #[test]
    fn returns_sanitized_source() {
        let out = validate_solution("a = 1\r\nb = 2", "python").unwrap();
        assert_eq!(out, "a = 1\nb = 2");
    }
}
