//! Error types and handling for regkit
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Resolution-phase errors (missing components, cycles, template problems,
//! destination problems) are raised before any file is written. Only
//! [`RegkitError::Conflict`] and [`RegkitError::Write`] can occur while a
//! plan is executing.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for regkit operations
#[derive(Error, Diagnostic, Debug)]
pub enum RegkitError {
    // Registry errors
    #[error("Component not found in registry: {name}{}", required_by_suffix(.required_by.as_deref()))]
    #[diagnostic(
        code(regkit::registry::not_found),
        help("Check the component name and that the registry path is correct")
    )]
    MissingComponent {
        name: String,
        required_by: Option<String>,
    },

    #[error("Failed to fetch component '{name}': {reason}")]
    #[diagnostic(code(regkit::registry::fetch_failed))]
    FetchFailed { name: String, reason: String },

    #[error("No registry configured")]
    #[diagnostic(
        code(regkit::registry::not_configured),
        help("Pass --registry <dir> or set REGKIT_REGISTRY")
    )]
    RegistryNotConfigured,

    // Manifest errors
    #[error("Failed to parse manifest of '{component}': {reason}")]
    #[diagnostic(code(regkit::manifest::parse_failed))]
    ManifestParse { component: String, reason: String },

    #[error("Invalid manifest for '{component}': {message}")]
    #[diagnostic(code(regkit::manifest::invalid))]
    ManifestInvalid { component: String, message: String },

    #[error("Component '{component}' lists file '{source_path}' but the registry did not provide it")]
    #[diagnostic(code(regkit::manifest::missing_file))]
    MissingSourceFile {
        component: String,
        source_path: String,
    },

    // Dependency errors
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    #[diagnostic(
        code(regkit::deps::circular),
        help("Remove one of the registry_dependencies entries along this path")
    )]
    Cycle { path: Vec<String> },

    // Template errors
    #[error("Template variable '{name}' has no value (referenced by {referenced_by})")]
    #[diagnostic(
        code(regkit::template::unresolved),
        help("Provide it with --set {name}=<value>, in regkit.yaml under `variables`, or run interactively")
    )]
    UnresolvedVariable { name: String, referenced_by: String },

    #[error("Placeholder '{{{{{name}}}}}' in {location} is not declared by any component")]
    #[diagnostic(
        code(regkit::template::undeclared),
        help("Declare the variable under `template_variables` or fix the placeholder name")
    )]
    UndeclaredVariable { name: String, location: String },

    #[error("Unknown transform '{transform}' in {location}")]
    #[diagnostic(
        code(regkit::template::unknown_transform),
        help("Supported transforms: lower, upper, title")
    )]
    UnknownTransform { transform: String, location: String },

    #[error("Invalid template in {location}: {message}")]
    #[diagnostic(code(regkit::template::invalid))]
    TemplateInvalid { location: String, message: String },

    #[error("Invalid variable override '{input}'")]
    #[diagnostic(code(regkit::template::invalid_override), help("Use the form name=value"))]
    InvalidOverride { input: String },

    // Destination errors
    #[error("No directory configured for key '{key}' (used by '{component}')")]
    #[diagnostic(
        code(regkit::project::unknown_directory_key),
        help("Add the key under `directories` in regkit.yaml")
    )]
    UnknownDirectoryKey { key: String, component: String },

    #[error("Destination '{destination}' of '{component}' escapes its target directory")]
    #[diagnostic(code(regkit::project::unsafe_destination))]
    UnsafeDestination {
        component: String,
        destination: String,
    },

    #[error("Destination {path} is written by both '{first}' and '{second}'")]
    #[diagnostic(
        code(regkit::project::duplicate_destination),
        help("Use the merge conflict policy or change one of the destinations")
    )]
    DuplicateDestination {
        path: String,
        first: String,
        second: String,
    },

    // Materialization errors
    #[error("Destination already exists: {path} (component '{component}')")]
    #[diagnostic(
        code(regkit::fs::conflict),
        help("Re-run with --policy skip-if-exists or --policy overwrite")
    )]
    Conflict { path: String, component: String },

    #[error("Failed to write {path}: {reason}")]
    #[diagnostic(code(regkit::fs::write_failed))]
    Write { path: String, reason: String },

    #[error("Failed to merge into {path}: {reason}")]
    #[diagnostic(code(regkit::fs::merge_failed))]
    MergeFailed { path: String, reason: String },

    #[error("Installation cancelled")]
    #[diagnostic(code(regkit::cancelled))]
    Cancelled,

    #[error("Installation incomplete: {count} component(s) were not installed")]
    #[diagnostic(
        code(regkit::install::incomplete),
        help("Fix the reported problems and re-run; completed components are safe to install again")
    )]
    InstallIncomplete { count: usize },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    #[diagnostic(code(regkit::config::not_found))]
    ConfigNotFound { path: String },

    #[error("Failed to read configuration file {path}: {reason}")]
    #[diagnostic(code(regkit::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file {path}: {reason}")]
    #[diagnostic(code(regkit::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Prompt failed: {message}")]
    #[diagnostic(code(regkit::ui::prompt_failed))]
    Prompt { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(regkit::fs::io_error))]
    Io { message: String },
}

fn required_by_suffix(required_by: Option<&str>) -> String {
    required_by
        .map(|parent| format!(" (required by '{parent}')"))
        .unwrap_or_default()
}

impl RegkitError {
    /// Whether the error belongs to the resolution phase (raised before any write).
    pub fn is_resolution_error(&self) -> bool {
        !matches!(
            self,
            RegkitError::Conflict { .. }
                | RegkitError::Write { .. }
                | RegkitError::MergeFailed { .. }
                | RegkitError::Cancelled
                | RegkitError::InstallIncomplete { .. }
        )
    }
}

impl From<std::io::Error> for RegkitError {
    fn from(err: std::io::Error) -> Self {
        RegkitError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RegkitError {
    fn from(err: serde_yaml::Error) -> Self {
        RegkitError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RegkitError {
    fn from(err: serde_json::Error) -> Self {
        RegkitError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<inquire::InquireError> for RegkitError {
    fn from(err: inquire::InquireError) -> Self {
        match err {
            inquire::InquireError::OperationCanceled
            | inquire::InquireError::OperationInterrupted => RegkitError::Cancelled,
            other => RegkitError::Prompt {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, RegkitError>;
