//! Variable value resolution
//!
//! Precedence, highest first:
//!
//! 1. explicit override for this invocation (`--set name=value`)
//! 2. project-wide override (`variables` in `regkit.yaml`)
//! 3. default declared by a component manifest
//! 4. interactive prompt
//!
//! A variable that falls through all four has no value. That is fatal only
//! when a non-optional file references it.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::ProjectConfig;
use crate::error::{RegkitError, Result};

use super::{ResolvedTemplateValue, ResolvedVariables, TemplateEngine};

/// What the interactive layer is asked for
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    pub variable: &'a str,
    pub description: Option<&'a str>,
    pub default: Option<&'a str>,
    /// Component whose declaration is being prompted for
    pub declared_by: &'a str,
}

/// Source of values when the precedence chain bottoms out
pub trait InteractiveProvider {
    /// Ask for a value. `Ok(None)` means no value is available.
    fn prompt(&mut self, request: &PromptRequest<'_>) -> Result<Option<String>>;
}

/// Provider for non-interactive runs: never produces a value
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl InteractiveProvider for NonInteractive {
    fn prompt(&mut self, _request: &PromptRequest<'_>) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueSource {
    Override,
    Project,
    ManifestDefault,
    Prompt,
}

/// A referenced variable and whether a non-optional file needs it
#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub required: bool,
    /// First location that referenced it, for error messages
    pub first_location: String,
}

/// Parse `name=value` override arguments.
pub fn parse_overrides<I, S>(items: I) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut overrides = BTreeMap::new();
    for item in items {
        let item = item.as_ref();
        let Some((name, value)) = item.split_once('=') else {
            return Err(RegkitError::InvalidOverride {
                input: item.to_string(),
            });
        };
        let name = name.trim();
        if !crate::manifest::is_identifier(name) {
            return Err(RegkitError::InvalidOverride {
                input: item.to_string(),
            });
        }
        overrides.insert(name.to_string(), value.to_string());
    }
    Ok(overrides)
}

impl TemplateEngine {
    /// Resolve a value for every referenced variable.
    ///
    /// Variables in `references` must be declared (validated by [`TemplateEngine::validate`]).
    /// The result is computed once per run and reused for every file.
    pub fn resolve_variables(
        &self,
        references: &BTreeMap<String, Reference>,
        config: &ProjectConfig,
        overrides: &BTreeMap<String, String>,
        provider: &mut dyn InteractiveProvider,
    ) -> Result<ResolvedVariables> {
        for name in overrides.keys() {
            if !self.declarations.contains_key(name) {
                warn!(variable = %name, "override does not match any declared template variable, ignoring");
            }
        }

        let mut values = BTreeMap::new();
        for (name, reference) in references {
            let Some(declaration) = self.declarations.get(name) else {
                return Err(RegkitError::UndeclaredVariable {
                    name: name.clone(),
                    location: reference.first_location.clone(),
                });
            };

            let found = if let Some(v) = overrides.get(name) {
                Some((v.clone(), ValueSource::Override))
            } else if let Some(v) = config.variables.get(name) {
                Some((v.clone(), ValueSource::Project))
            } else if let Some(v) = &declaration.variable.default {
                Some((v.clone(), ValueSource::ManifestDefault))
            } else {
                provider
                    .prompt(&PromptRequest {
                        variable: name,
                        description: declaration.variable.description.as_deref(),
                        default: None,
                        declared_by: &declaration.declared_by,
                    })?
                    .map(|v| (v, ValueSource::Prompt))
            };

            match found {
                Some((raw_value, source)) => {
                    debug!(variable = %name, ?source, "resolved template variable");
                    values.insert(
                        name.clone(),
                        ResolvedTemplateValue {
                            variable_name: name.clone(),
                            raw_value,
                            applied_transform: declaration.variable.transform,
                            source,
                        },
                    );
                }
                None if reference.required => {
                    return Err(RegkitError::UnresolvedVariable {
                        name: name.clone(),
                        referenced_by: reference.first_location.clone(),
                    });
                }
                None => {
                    debug!(variable = %name, "no value for variable used only by optional files");
                }
            }
        }

        Ok(ResolvedVariables { values })
    }
}
