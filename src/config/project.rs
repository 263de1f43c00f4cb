//! Project configuration (`regkit.yaml`)
//!
//! Read once at the start of a run and never mutated by the installer.
//!
//! ```yaml
//! directories:
//!   agents: src/agents
//!   tools: src/tools
//! variables:
//!   provider: openai
//! conflict_policy: skip-if-exists
//! jobs: 4
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::scalar;
use crate::error::{RegkitError, Result};
use crate::materializer::ConflictPolicy;

/// The consuming project's installation target description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project root; relative directories are resolved against it
    #[serde(skip)]
    pub root: PathBuf,

    /// Symbolic directory key -> directory
    #[serde(default)]
    pub directories: BTreeMap<String, PathBuf>,

    /// Project-wide template variable values (outrank manifest defaults)
    #[serde(default, deserialize_with = "scalar::string_map")]
    pub variables: BTreeMap<String, String>,

    /// Default conflict policy for this project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_policy: Option<ConflictPolicy>,

    /// Worker limit for parallel fetches and writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl ProjectConfig {
    /// Default configuration file name at the project root
    pub const FILE_NAME: &'static str = "regkit.yaml";

    /// Create an empty configuration rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load the configuration for a project.
    ///
    /// With no explicit path, `<root>/regkit.yaml` is used and a missing file
    /// yields an empty configuration. An explicit path must exist.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) if p.is_relative() => root.join(p),
            Some(p) => p.to_path_buf(),
            None => root.join(Self::FILE_NAME),
        };

        if !path.exists() {
            if explicit.is_some() {
                return Err(RegkitError::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            tracing::debug!(path = %path.display(), "no project configuration, using defaults");
            return Ok(Self::new(root));
        }

        let yaml = std::fs::read_to_string(&path).map_err(|e| RegkitError::ConfigReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(root, &yaml).map_err(|e| match e {
            RegkitError::ConfigParseFailed { reason, .. } => RegkitError::ConfigParseFailed {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(root: &Path, yaml: &str) -> Result<Self> {
        // An empty file is a valid, empty configuration
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.root = root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.jobs == Some(0) {
            return Err(RegkitError::ConfigParseFailed {
                path: Self::FILE_NAME.to_string(),
                reason: "jobs must be at least 1".to_string(),
            });
        }
        for (key, dir) in &self.directories {
            if dir.as_os_str().is_empty() {
                return Err(RegkitError::ConfigParseFailed {
                    path: Self::FILE_NAME.to_string(),
                    reason: format!("directory for key '{key}' cannot be empty"),
                });
            }
        }
        Ok(())
    }

    /// Resolve a symbolic directory key to a directory path
    pub fn directory_for_key(&self, key: &str) -> Option<PathBuf> {
        self.directories.get(key).map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                self.root.join(dir)
            }
        })
    }

    #[must_use]
    pub fn with_directory(mut self, key: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.directories.insert(key.into(), dir.into());
        self
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}
