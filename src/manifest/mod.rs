//! Component manifests (`component.yaml` / `component.json`)
//!
//! A manifest is the declarative contract of one installable component:
//! which files it ships, where they land, which other components it needs,
//! and which template variables its files may reference.
//!
//! Manifests are parsed into explicit structs and validated once, at parse
//! time. Unknown `type` or `transform` values are rejected by serde rather
//! than passed through.

mod validation;

pub use validation::{is_identifier, is_valid_component_name};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::scalar;
use crate::error::{RegkitError, Result};
use crate::template::Transform;

/// Manifest file names looked up in a registry component directory, in order.
pub const MANIFEST_FILE_NAMES: &[&str] = &["component.yaml", "component.yml", "component.json"];

/// Kind of installable component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Agent,
    Tool,
    PromptTemplate,
    ResponseModel,
    Eval,
    Example,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentType::Agent => "agent",
            ComponentType::Tool => "tool",
            ComponentType::PromptTemplate => "prompt_template",
            ComponentType::ResponseModel => "response_model",
            ComponentType::Eval => "eval",
            ComponentType::Example => "example",
        };
        f.write_str(s)
    }
}

/// How a file's content is treated during installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// UTF-8 text with `{{placeholders}}`, rendered before writing
    #[default]
    Template,
    /// Copied byte-for-byte
    Static,
}

/// A file shipped by a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path of the file inside the component payload
    pub source: String,

    /// Destination template relative to the target directory (defaults to `source`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(default)]
    pub kind: FileKind,

    /// Optional files are dropped when a variable they reference has no value
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl FileEntry {
    /// Create a template file entry installed under the same relative path
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            kind: FileKind::Template,
            optional: false,
        }
    }

    /// Set the destination template
    #[must_use]
    pub fn to(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Mark the file as static (no rendering)
    #[must_use]
    pub fn static_file(mut self) -> Self {
        self.kind = FileKind::Static;
        self
    }

    /// Mark the file as optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// The destination template, falling back to the source path
    pub fn destination_template(&self) -> &str {
        self.destination.as_deref().unwrap_or(&self.source)
    }
}

/// A runtime dependency declaration, opaque to the installer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeDependency {
    pub name: String,

    /// Version constraint string (`*` when absent)
    #[serde(default = "any_version")]
    pub version: String,
}

impl RuntimeDependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

fn any_version() -> String {
    "*".to_string()
}

/// An environment variable the installed code expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

/// A template variable declaration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateVariable {
    #[serde(
        default,
        deserialize_with = "scalar::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Transform applied when a placeholder has no explicit pipe
    #[serde(default)]
    pub transform: Transform,
}

/// Component manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentManifest {
    /// Unique component name within a registry
    pub name: String,

    /// Informational only, never used for constraint solving
    pub version: String,

    #[serde(rename = "type")]
    pub component_type: ComponentType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Symbolic directory key resolved through the project configuration
    pub target_directory: String,

    #[serde(default)]
    pub files: Vec<FileEntry>,

    #[serde(default)]
    pub registry_dependencies: Vec<String>,

    #[serde(default)]
    pub runtime_dependencies: Vec<RuntimeDependency>,

    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,

    #[serde(default)]
    pub template_variables: BTreeMap<String, TemplateVariable>,
}

impl ComponentManifest {
    /// Create an empty manifest
    pub fn new(
        name: impl Into<String>,
        component_type: ComponentType,
        target_directory: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: "0.1.0".to_string(),
            component_type,
            description: None,
            target_directory: target_directory.into(),
            files: Vec::new(),
            registry_dependencies: Vec::new(),
            runtime_dependencies: Vec::new(),
            environment_variables: Vec::new(),
            template_variables: BTreeMap::new(),
        }
    }

    /// Parse a manifest from YAML. `origin` names the component for error messages.
    pub fn from_yaml(origin: &str, yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).map_err(|e| RegkitError::ManifestParse {
                component: origin.to_string(),
                reason: e.to_string(),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from JSON. `origin` names the component for error messages.
    pub fn from_json(origin: &str, json: &str) -> Result<Self> {
        let manifest: Self =
            serde_json::from_str(json).map_err(|e| RegkitError::ManifestParse {
                component: origin.to_string(),
                reason: e.to_string(),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest picking the format from its file name
    pub fn from_file_contents(origin: &str, file_name: &str, contents: &str) -> Result<Self> {
        if file_name.ends_with(".json") {
            Self::from_json(origin, contents)
        } else {
            Self::from_yaml(origin, contents)
        }
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<()> {
        validation::validate_manifest(self)
    }

    #[must_use]
    pub fn with_file(mut self, file: FileEntry) -> Self {
        self.files.push(file);
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.registry_dependencies.push(name.into());
        self
    }

    #[must_use]
    pub fn with_runtime_dependency(mut self, dep: RuntimeDependency) -> Self {
        self.runtime_dependencies.push(dep);
        self
    }

    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, required: bool) -> Self {
        self.environment_variables.push(EnvironmentVariable {
            name: name.into(),
            description: None,
            required,
        });
        self
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, variable: TemplateVariable) -> Self {
        self.template_variables.insert(name.into(), variable);
        self
    }
}
