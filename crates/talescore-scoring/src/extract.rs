//! JSON recovery from free-form LLM output.
//!
//! Models are instructed to return only JSON but routinely wrap the payload
//! in Markdown code fences or surrounding prose. Recovery runs an ordered
//! fallback chain and short-circuits on the first strategy that parses:
//!
//! 1. direct parse of the trimmed text;
//! 2. the inner content of a fenced code block (optionally tagged `json`);
//! 3. the greedy slice from the first `{` to the last `}`;
//! 4. the same slice after stripping trailing commas.
//!
//! Direct parse is cheapest and covers the common case; fenced blocks are
//! the most frequent formatting habit; the brace slice is the most
//! permissive and also the most error-prone, so it runs last.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no JSON object found in response text")]
    NoJsonFound,

    #[error("JSON candidate failed to parse: {0}")]
    Unparseable(String),
}

/// Recover a JSON value from raw model output.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = fenced_block(trimmed) {
        let inner = inner.trim();
        if let Ok(value) = serde_json::from_str(inner) {
            return Ok(value);
        }
        if let Some(slice) = brace_slice(inner) {
            if let Ok(value) = serde_json::from_str(slice) {
                return Ok(value);
            }
        }
    }

    let slice = brace_slice(trimmed).ok_or(ExtractError::NoJsonFound)?;
    match serde_json::from_str(slice) {
        Ok(value) => Ok(value),
        Err(err) => {
            let repaired = strip_trailing_commas(slice);
            serde_json::from_str(&repaired)
                .map_err(|_| ExtractError::Unparseable(err.to_string()))
        }
    }
}

/// Inner content of the first fenced code block, if a complete one exists.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let mut body = &text[start + 3..];
    for tag in ["json", "JSON"] {
        if let Some(stripped) = body.strip_prefix(tag) {
            body = stripped;
            break;
        }
    }
    let end = body.find("```")?;
    Some(&body[..end])
}

/// Greedy slice from the first `{` to the last `}`, inclusive. Greedy rather
/// than minimal because rubric JSON itself contains nested braces.
fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Remove commas that directly precede a closing brace or bracket, outside
/// of string literals.
fn strip_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in json.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '}' | ']' => {
                let kept = out.trim_end().len();
                if out[..kept].ends_with(',') {
                    out.truncate(kept - 1);
                }
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }

    out
}
