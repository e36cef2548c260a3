//! Helpers for picking apart MediaWiki-style API documents.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FetchError, FetchResult};

/// The `query` member of a response, after checking for an API error.
pub(crate) fn query_section(doc: &Value) -> FetchResult<&Value> {
    if let Some(error) = doc.get("error") {
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .or_else(|| error.get("code").and_then(Value::as_str))
            .unwrap_or("API error");
        return Err(FetchError::unknown(info));
    }

    doc.get("query")
        .ok_or_else(|| FetchError::malformed("response has no query member"))
}

/// The first entry of `query.pages`, whether pages is an object or an array.
pub(crate) fn first_page(doc: &Value) -> FetchResult<&Value> {
    let pages = query_section(doc)?
        .get("pages")
        .ok_or_else(|| FetchError::malformed("response has no pages"))?;

    let page = match pages {
        Value::Object(map) => map.values().next(),
        Value::Array(list) => list.first(),
        _ => None,
    };
    page.ok_or_else(|| FetchError::malformed("response has an empty page list"))
}

/// Deserialize one member of a JSON value into `T`.
pub(crate) fn parse_member<T: DeserializeOwned>(value: &Value, member: &str) -> FetchResult<T> {
    let raw = value
        .get(member)
        .ok_or_else(|| FetchError::malformed(format!("response has no {member}")))?;
    Ok(T::deserialize(raw)?)
}

/// Render a scalar JSON value as trimmed text; empty text becomes `None`.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Remove HTML tags, keeping their text content.
pub(crate) fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}
