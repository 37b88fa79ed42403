//! Strict JSON extraction from model output.
//!
//! Models wrap JSON in prose or markdown fences. Extraction tries, in order,
//! the whole text, a ```json fence, any ``` fence and the outermost `{...}`
//! span. Only a JSON object is accepted; anything else is "no result".

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Extract the JSON object carried by a model response.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let text = text.trim();
    let candidates = [
        Some(text),
        fenced(text, "```json"),
        fenced(text, "```"),
        brace_span(text),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate.trim()) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

/// Extract and deserialize a model response into `T`.
pub fn parse_response<T: DeserializeOwned>(text: &str) -> Option<T> {
    let map = extract_json_object(text)?;
    serde_json::from_value(Value::Object(map)).ok()
}

fn fenced<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    // Skip an info string such as `ts` or `JSON` on the fence line.
    let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &rest[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
