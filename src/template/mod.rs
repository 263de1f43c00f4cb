//! Template variables and placeholder rendering
//!
//! Component files and destination paths may contain `{{name}}` or
//! `{{name|transform}}` placeholders. For one install run:
//!
//! - every referenced variable is resolved exactly once (see [`resolve`]),
//! - every placeholder is validated before anything is rendered,
//! - rendering is a pure function of the text and the resolved map, so the
//!   same variable renders identically in every file of every component.

mod placeholder;
mod resolve;

pub use placeholder::{Placeholder, scan};
pub use resolve::{
    InteractiveProvider, NonInteractive, PromptRequest, Reference, ValueSource, parse_overrides,
};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RegkitError, Result};
use crate::manifest::{ComponentManifest, TemplateVariable};

/// Transformation applied to a variable value when rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    None,
    Lower,
    Upper,
    Title,
}

impl Transform {
    /// Parse a pipe name as written in a placeholder
    pub fn from_pipe(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Transform::None),
            "lower" => Some(Transform::Lower),
            "upper" => Some(Transform::Upper),
            "title" => Some(Transform::Title),
            _ => None,
        }
    }

    /// Apply the transform to a value
    pub fn apply(self, value: &str) -> String {
        match self {
            Transform::None => value.to_string(),
            Transform::Lower => value.to_lowercase(),
            Transform::Upper => value.to_uppercase(),
            Transform::Title => title_case(value),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transform::None => "none",
            Transform::Lower => "lower",
            Transform::Upper => "upper",
            Transform::Title => "title",
        })
    }
}

/// Uppercase the first letter of every run of letters, lowercase the rest.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// The value of one variable for the current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTemplateValue {
    pub variable_name: String,
    pub raw_value: String,
    /// Transform used by placeholders without an explicit pipe
    pub applied_transform: Transform,
    pub source: ValueSource,
}

impl ResolvedTemplateValue {
    /// Render with an explicit pipe, or the declared transform if there is none
    pub fn render(&self, pipe: Option<Transform>) -> String {
        pipe.unwrap_or(self.applied_transform).apply(&self.raw_value)
    }
}

/// All variable values resolved for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedVariables {
    values: BTreeMap<String, ResolvedTemplateValue>,
}

impl ResolvedVariables {
    pub fn get(&self, name: &str) -> Option<&ResolvedTemplateValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedTemplateValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A variable declaration together with the component that declared it
#[derive(Debug, Clone)]
pub struct Declaration {
    pub variable: TemplateVariable,
    pub declared_by: String,
}

/// Template engine for one install run
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    declarations: BTreeMap<String, Declaration>,
}

impl TemplateEngine {
    /// Collect declarations from manifests given in install order.
    ///
    /// When two components declare the same variable, the one later in
    /// install order wins, so the requested component can refine the
    /// defaults of its dependencies.
    pub fn new<'a>(manifests: impl IntoIterator<Item = &'a ComponentManifest>) -> Self {
        let mut declarations: BTreeMap<String, Declaration> = BTreeMap::new();
        for manifest in manifests {
            for (name, variable) in &manifest.template_variables {
                if let Some(previous) = declarations.get(name) {
                    if previous.variable != *variable {
                        warn!(
                            variable = %name,
                            previous = %previous.declared_by,
                            current = %manifest.name,
                            "template variable declared differently by two components, using the later one"
                        );
                    }
                }
                declarations.insert(
                    name.clone(),
                    Declaration {
                        variable: variable.clone(),
                        declared_by: manifest.name.clone(),
                    },
                );
            }
        }
        Self { declarations }
    }

    /// Look up a declaration
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    /// Validate every placeholder in `text` and return the referenced names.
    ///
    /// Fails on malformed placeholders, unknown transforms and variables no
    /// component declares.
    pub fn validate(&self, text: &str, location: &str) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for placeholder in scan(text, location)? {
            if !self.declarations.contains_key(placeholder.name) {
                return Err(RegkitError::UndeclaredVariable {
                    name: placeholder.name.to_string(),
                    location: location.to_string(),
                });
            }
            names.insert(placeholder.name.to_string());
        }
        Ok(names)
    }
}

/// Replace every placeholder in `text` with its resolved value.
pub fn render(text: &str, values: &ResolvedVariables, location: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for placeholder in scan(text, location)? {
        let value = values
            .get(placeholder.name)
            .ok_or_else(|| RegkitError::UnresolvedVariable {
                name: placeholder.name.to_string(),
                referenced_by: location.to_string(),
            })?;
        out.push_str(&text[last..placeholder.range.start]);
        out.push_str(&value.render(placeholder.transform));
        last = placeholder.range.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Render file bytes; the content must be UTF-8.
pub fn render_bytes(bytes: &[u8], values: &ResolvedVariables, location: &str) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(bytes).map_err(|e| RegkitError::TemplateInvalid {
        location: location.to_string(),
        message: format!("template files must be UTF-8 ({e}); mark the file `kind: static`"),
    })?;
    Ok(render(text, values, location)?.into_bytes())
}
