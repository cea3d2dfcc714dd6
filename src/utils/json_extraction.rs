//! JSON object extraction from LLM responses.
//!
//! Model output frequently wraps the requested object in a markdown fence or
//! surrounds it with commentary. Extraction tries, in order:
//! 1. a ```json fenced block (or a bare ``` fence)
//! 2. the whole trimmed content when it starts with `{`
//! 3. the last balanced `{...}` that parses as JSON
//!
//! ```
//! use ds_forge::utils::json_extraction::{try_extract_json_object, JsonExtractionResult};
//!
//! let response = "Sure, here it is: {\"approved\": true}";
//! assert_eq!(
//!     try_extract_json_object(response),
//!     JsonExtractionResult::Success("{\"approved\": true}".to_string())
//! );
//! ```

use std::sync::OnceLock;

use regex::Regex;

/// Result of a JSON extraction attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonExtractionResult {
    /// A complete JSON object was found.
    Success(String),
    /// An object was started but never closed (typically a max_tokens cut).
    Truncated {
        partial_json: String,
        unclosed_braces: usize,
    },
    /// No JSON-like content at all.
    NotFound,
}

impl JsonExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JsonExtractionResult::Success(_))
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\n?(.*?)```")
            .expect("Invalid regex for fenced code blocks")
    })
}

/// Attempts to extract a JSON object from raw model output.
pub fn try_extract_json_object(content: &str) -> JsonExtractionResult {
    let trimmed = content.trim();

    for captures in fence_regex().captures_iter(trimmed) {
        if let Some(body) = captures.get(1) {
            let body = body.as_str().trim();
            if parses_as_object(body) {
                return JsonExtractionResult::Success(body.to_string());
            }
        }
    }

    if trimmed.starts_with('{') && parses_as_object(trimmed) {
        return JsonExtractionResult::Success(trimmed.to_string());
    }

    if let Some(json) = last_balanced_object(trimmed) {
        return JsonExtractionResult::Success(json);
    }

    match trimmed.find('{') {
        Some(start) => {
            let unclosed_braces = unclosed_brace_depth(&trimmed[start..]);
            if unclosed_braces > 0 {
                JsonExtractionResult::Truncated {
                    partial_json: trimmed[start..].to_string(),
                    unclosed_braces,
                }
            } else {
                JsonExtractionResult::NotFound
            }
        }
        None => JsonExtractionResult::NotFound,
    }
}

fn parses_as_object(candidate: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(candidate),
        Ok(serde_json::Value::Object(_))
    )
}

/// Finds the index of the `}` matching the `{` at the start of `s`.
///
/// String literals and escape sequences are respected.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Returns the last top-level `{...}` span in `s` that parses as a JSON object.
fn last_balanced_object(s: &str) -> Option<String> {
    let mut found = None;
    let mut cursor = 0;

    while let Some(offset) = s[cursor..].find('{') {
        let start = cursor + offset;
        match find_matching_brace(&s[start..]) {
            Some(end) if parses_as_object(&s[start..=start + end]) => {
                found = Some(s[start..=start + end].to_string());
                cursor = start + end + 1;
            }
            _ => cursor = start + 1,
        }
    }
    found
}

fn unclosed_brace_depth(s: &str) -> usize {
    let mut depth: isize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for c in s.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => depth -= 1,
            _ => {}
        }
    }
    depth.max(0) as usize
}
