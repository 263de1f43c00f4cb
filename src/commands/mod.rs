//! Command implementations for regkit CLI

pub mod completions;
pub mod display;
pub mod install;
pub mod plan;
pub mod prompt;

use std::path::PathBuf;

use regkit::config::ProjectConfig;
use regkit::error::{RegkitError, Result};
use regkit::planner::{InstallPlan, Planner};
use regkit::store::DirectoryStore;
use regkit::template::{InteractiveProvider, NonInteractive, parse_overrides};

use crate::cli::{Cli, PlanOptions};

/// Paths shared by every command that builds a plan
#[derive(Debug, Clone)]
pub struct Context {
    pub project_root: PathBuf,
    pub registry: PathBuf,
    pub config_file: Option<PathBuf>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            project_root: project_root(cli.project.clone())?,
            registry: registry_path(cli.registry.clone())?,
            config_file: cli.config.clone(),
        })
    }

    /// Load the project config and build a plan
    pub fn build_plan(&self, options: &PlanOptions) -> Result<InstallPlan> {
        let config = ProjectConfig::load(&self.project_root, self.config_file.as_deref())?;
        let overrides = parse_overrides(&options.set)?;
        let store = DirectoryStore::new(&self.registry);

        let mut provider: Box<dyn InteractiveProvider> = if prompt::can_prompt(options.non_interactive) {
            Box::new(prompt::InquireProvider)
        } else {
            Box::new(NonInteractive)
        };

        tracing::debug!(
            project = %self.project_root.display(),
            registry = %store.root().display(),
            "building plan"
        );
        Planner::new(&store, &config)
            .with_policy(options.policy)
            .with_jobs(options.jobs.map(usize::from))
            .plan(&options.component, &overrides, provider.as_mut())
    }
}

/// Project directory from CLI argument or current directory
fn project_root(project: Option<PathBuf>) -> Result<PathBuf> {
    let path = match project {
        Some(path) => path,
        None => std::env::current_dir().map_err(|e| RegkitError::Io {
            message: format!("Failed to get current directory: {e}"),
        })?,
    };
    if !path.is_dir() {
        return Err(RegkitError::Io {
            message: format!("Project directory does not exist: {}", path.display()),
        });
    }
    dunce::canonicalize(&path).map_err(|e| RegkitError::Io {
        message: format!("Failed to resolve {}: {e}", path.display()),
    })
}

/// Registry directory from CLI argument or the user data directory
fn registry_path(registry: Option<PathBuf>) -> Result<PathBuf> {
    match registry {
        Some(path) => Ok(path),
        None => dirs::data_dir()
            .map(|dir| dir.join("regkit").join("registry"))
            .ok_or(RegkitError::RegistryNotConfigured),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_root_must_exist() {
        let temp = TempDir::new().unwrap();
        assert!(project_root(Some(temp.path().join("missing"))).is_err());
        assert_eq!(
            project_root(Some(temp.path().to_path_buf())).unwrap(),
            dunce::canonicalize(temp.path()).unwrap()
        );
    }

    #[test]
    fn test_explicit_registry_wins() {
        assert_eq!(
            registry_path(Some(PathBuf::from("/srv/registry"))).unwrap(),
            PathBuf::from("/srv/registry")
        );
    }
}
