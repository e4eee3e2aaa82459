//! Extraction of structured payloads from collaborator replies.
//!
//! LLM-backed collaborators tend to wrap their answer in Markdown. These
//! helpers recover a JSON value or a code listing from such text.

use serde_json::Value;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Recover a JSON value from a reply.
///
/// Tried in order: the whole text, the last ```` ```json ```` block, then the
/// outermost `{...}` or `[...]` span.
pub fn extract_json_payload(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(start) = trimmed.rfind(JSON_FENCE) {
        let body = &trimmed[start + JSON_FENCE.len()..];
        let body = body.find(FENCE).map_or(body, |end| &body[..end]);
        if let Ok(value) = serde_json::from_str(body.trim()) {
            return Some(value);
        }
    }

    [('{', '}'), ('[', ']')].iter().find_map(|&(open, close)| {
        let start = trimmed.find(open)?;
        let end = trimmed.rfind(close)?;
        if start < end {
            serde_json::from_str(&trimmed[start..=end]).ok()
        } else {
            None
        }
    })
}

/// Recover a code listing from a reply.
///
/// Returns the body of the first fenced block, without its language tag, or
/// the whole trimmed text when there is no fence. `None` when nothing but
/// whitespace remains.
pub fn extract_code_block(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let code = match trimmed.find(FENCE) {
        Some(start) => {
            let after_fence = &trimmed[start + FENCE.len()..];
            // Skip the info string (language tag) up to the end of the line.
            let body = after_fence
                .find('\n')
                .map_or("", |newline| &after_fence[newline + 1..]);
            body.find(FENCE).map_or(body, |end| &body[..end])
        }
        None => trimmed,
    };

    let code = code.trim_matches('\n').trim_end();
    if code.trim().is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// Take a list out of a payload that is either a bare array or an object
/// holding the array under one of `keys`.
pub fn list_field(payload: Value, keys: &[&str]) -> Option<Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => keys.iter().find_map(|key| match map.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}
