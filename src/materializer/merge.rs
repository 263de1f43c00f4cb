//! Content merging for the `merge` conflict policy
//!
//! ### JSON (`.json` destinations)
//!
//! Objects are merged recursively. Arrays are combined without duplicates.
//! For anything else the incoming value wins.
//!
//! ```json
//! Existing: {"a": 1, "b": {"x": 1, "y": 2}, "tags": ["x"]}
//! New:      {"b": {"y": 3, "z": 4}, "c": 3, "tags": ["x", "y"]}
//! Result:   {"a": 1, "b": {"x": 1, "y": 3, "z": 4}, "c": 3, "tags": ["x", "y"]}
//! ```
//!
//! ### Text (everything else)
//!
//! Incoming content is appended after a blank line, unless its lines
//! already appear as a contiguous block of whole lines in the existing file:
//!
//! ```text
//! Existing: "OPENAI_API_KEY="
//! New:      "QWANT_API_KEY="
//! Result:   "OPENAI_API_KEY=\n\nQWANT_API_KEY=\n"
//! ```
//!
//! Both paths return `None` when the merge would not change the file, which
//! keeps re-running a merge install a no-op.

use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::{RegkitError, Result};

/// Merge `incoming` into `existing` for `destination`.
///
/// Returns `Ok(None)` when the existing content already includes everything
/// incoming would add.
pub fn merge_contents(destination: &Path, existing: &[u8], incoming: &[u8]) -> Result<Option<Vec<u8>>> {
    let is_json = destination
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        merge_json(destination, existing, incoming)
    } else {
        merge_text(destination, existing, incoming)
    }
}

fn merge_failed(destination: &Path, reason: impl std::fmt::Display) -> RegkitError {
    RegkitError::MergeFailed {
        path: destination.display().to_string(),
        reason: reason.to_string(),
    }
}

fn merge_json(destination: &Path, existing: &[u8], incoming: &[u8]) -> Result<Option<Vec<u8>>> {
    let current: JsonValue = serde_json::from_slice(existing)
        .map_err(|e| merge_failed(destination, format!("existing file is not valid JSON: {e}")))?;
    let new: JsonValue = serde_json::from_slice(incoming)
        .map_err(|e| merge_failed(destination, format!("incoming content is not valid JSON: {e}")))?;

    let merged = merge_json_deep(current.clone(), new);
    if merged == current {
        return Ok(None);
    }

    let mut out = serde_json::to_string_pretty(&merged).map_err(|e| merge_failed(destination, e))?;
    out.push('\n');
    Ok(Some(out.into_bytes()))
}

/// Deep merge: recursively merge nested objects
fn merge_json_deep(existing: JsonValue, new: JsonValue) -> JsonValue {
    match (existing, new) {
        (JsonValue::Object(mut existing_map), JsonValue::Object(new_map)) => {
            for (key, new_value) in new_map {
                let merged_value = match existing_map.remove(&key) {
                    Some(existing_value) => merge_json_deep(existing_value, new_value),
                    None => new_value,
                };
                existing_map.insert(key, merged_value);
            }
            JsonValue::Object(existing_map)
        }
        (JsonValue::Array(mut existing_arr), JsonValue::Array(new_arr)) => {
            for item in new_arr {
                if !existing_arr.contains(&item) {
                    existing_arr.push(item);
                }
            }
            JsonValue::Array(existing_arr)
        }
        (_, new) => new,
    }
}

fn merge_text(destination: &Path, existing: &[u8], incoming: &[u8]) -> Result<Option<Vec<u8>>> {
    let current = std::str::from_utf8(existing)
        .map_err(|_| merge_failed(destination, "existing file is not UTF-8 text"))?;
    let new = std::str::from_utf8(incoming)
        .map_err(|_| merge_failed(destination, "incoming content is not UTF-8 text"))?;

    let addition = new.trim();
    if addition.is_empty() || contains_block(current, addition) {
        return Ok(None);
    }

    let base = current.trim_end();
    let merged = if base.is_empty() {
        format!("{addition}\n")
    } else {
        format!("{base}\n\n{addition}\n")
    };
    Ok(Some(merged.into_bytes()))
}

/// Whether the trimmed lines of `block` appear as consecutive whole lines of `text`
fn contains_block(text: &str, block: &str) -> bool {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let wanted: Vec<&str> = block.lines().map(str::trim).collect();
    lines.windows(wanted.len()).any(|window| window == wanted.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn merge_str(dest: &str, existing: &str, incoming: &str) -> Option<String> {
        merge_contents(Path::new(dest), existing.as_bytes(), incoming.as_bytes())
            .unwrap()
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_json_deep_merge() {
        let merged = merge_str(
            "settings.json",
            r#"{"a": 1, "b": {"x": 1, "y": 2}, "tags": ["x"]}"#,
            r#"{"b": {"y": 3, "z": 4}, "c": 3, "tags": ["x", "y"]}"#,
        )
        .unwrap();

        let value: JsonValue = serde_json::from_str(&merged).unwrap();
        assert_eq!(
            value,
            json!({"a": 1, "b": {"x": 1, "y": 3, "z": 4}, "c": 3, "tags": ["x", "y"]})
        );
    }

    #[test]
    fn test_json_merge_without_change_is_skipped() {
        assert_eq!(
            merge_str("a.json", r#"{"a": {"b": [1, 2]}}"#, r#"{"a": {"b": [2]}}"#),
            None
        );
    }

    #[test]
    fn test_invalid_json_fails() {
        let err = merge_contents(Path::new("a.json"), b"{", b"{}").unwrap_err();
        assert!(matches!(err, RegkitError::MergeFailed { .. }));
    }

    #[test]
    fn test_text_append() {
        assert_eq!(
            merge_str(".env.example", "OPENAI_API_KEY=\n", "QWANT_API_KEY=\n").as_deref(),
            Some("OPENAI_API_KEY=\n\nQWANT_API_KEY=\n")
        );
    }

    #[test]
    fn test_text_already_present() {
        assert_eq!(
            merge_str("requirements.txt", "requests\nhttpx\n", "httpx\n"),
            None
        );
    }

    #[test]
    fn test_text_substring_is_not_a_match() {
        assert_eq!(
            merge_str("requirements.txt", "requests-oauthlib\n", "requests\n").as_deref(),
            Some("requests-oauthlib\n\nrequests\n")
        );
        assert_eq!(
            merge_str(".env", "# OPENAI_API_KEY= is required\n", "OPENAI_API_KEY=\n").as_deref(),
            Some("# OPENAI_API_KEY= is required\n\nOPENAI_API_KEY=\n")
        );
    }

    #[test]
    fn test_text_block_must_be_contiguous() {
        assert_eq!(
            merge_str("requirements.txt", "httpx\nrich\nrequests\n", "httpx\nrequests\n").as_deref(),
            Some("httpx\nrich\nrequests\n\nhttpx\nrequests\n")
        );
        assert_eq!(
            merge_str("requirements.txt", "rich\n  httpx\nrequests  \n", "httpx\nrequests\n"),
            None
        );
    }

    #[test]
    fn test_text_into_empty_file() {
        assert_eq!(
            merge_str("__init__.py", "\n", "from .tool import *\n").as_deref(),
            Some("from .tool import *\n")
        );
    }

    #[test]
    fn test_text_merge_is_idempotent() {
        let once = merge_str("notes.md", "# A", "# B").unwrap();
        assert_eq!(merge_str("notes.md", &once, "# B"), None);
    }
}
