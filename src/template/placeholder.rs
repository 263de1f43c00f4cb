//! Placeholder grammar
//!
//! ```text
//! {{name}}
//! {{name|transform}}     transform ∈ lower | upper | title | none
//! ```
//!
//! Whitespace inside the braces is ignored. The grammar is closed: anything
//! between `{{` and `}}` that is not an identifier with an optional known
//! transform is an error, never passed through.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{RegkitError, Result};
use crate::manifest::is_identifier;

use super::Transform;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{\s*([^{}|]*?)\s*(?:\|\s*([^{}]*?)\s*)?\}\}")
        .expect("placeholder pattern is valid")
});

/// A placeholder occurrence in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Byte range of the whole `{{...}}` occurrence
    pub range: Range<usize>,
    pub name: &'a str,
    /// Explicit pipe, if any
    pub transform: Option<Transform>,
}

/// Find every placeholder in `text`.
///
/// `location` is used in error messages (e.g. `web_search_agent:agent.py`).
pub fn scan<'a>(text: &'a str, location: &str) -> Result<Vec<Placeholder<'a>>> {
    let mut found = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        if !is_identifier(name) {
            return Err(RegkitError::TemplateInvalid {
                location: location.to_string(),
                message: format!("'{}' is not a valid placeholder", whole.as_str()),
            });
        }

        let transform = match caps.get(2) {
            Some(pipe) => Some(Transform::from_pipe(pipe.as_str()).ok_or_else(|| {
                RegkitError::UnknownTransform {
                    transform: pipe.as_str().to_string(),
                    location: location.to_string(),
                }
            })?),
            None => None,
        };

        found.push(Placeholder {
            range: whole.range(),
            name,
            transform,
        });
    }
    Ok(found)
}
