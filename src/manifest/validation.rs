//! Manifest validation
//!
//! Structural checks that serde cannot express. The self-dependency check is
//! deliberately left to the resolver, which reports it as a cycle.

use std::collections::HashSet;

use crate::error::{RegkitError, Result};

use super::ComponentManifest;

fn invalid(manifest: &ComponentManifest, message: String) -> RegkitError {
    RegkitError::ManifestInvalid {
        component: if manifest.name.is_empty() {
            "<unnamed>".to_string()
        } else {
            manifest.name.clone()
        },
        message,
    }
}

/// Whether a string is a valid component name
pub fn is_valid_component_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && name != "."
        && name != ".."
}

/// Whether a string is a valid template variable identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(super) fn validate_manifest(manifest: &ComponentManifest) -> Result<()> {
    if !is_valid_component_name(&manifest.name) {
        return Err(invalid(
            manifest,
            format!(
                "component name '{}' must be non-empty and use only letters, digits, '_', '-' or '.'",
                manifest.name
            ),
        ));
    }

    if manifest.target_directory.trim().is_empty() {
        return Err(invalid(
            manifest,
            "target_directory cannot be empty".to_string(),
        ));
    }

    let mut sources = HashSet::new();
    for file in &manifest.files {
        if file.source.trim().is_empty() {
            return Err(invalid(manifest, "file source cannot be empty".to_string()));
        }
        if !sources.insert(file.source.as_str()) {
            return Err(invalid(
                manifest,
                format!("file '{}' is listed more than once", file.source),
            ));
        }
    }

    let mut deps = HashSet::new();
    for dep in &manifest.registry_dependencies {
        if !is_valid_component_name(dep) {
            return Err(invalid(
                manifest,
                format!("registry dependency '{dep}' is not a valid component name"),
            ));
        }
        if !deps.insert(dep.as_str()) {
            return Err(invalid(
                manifest,
                format!("registry dependency '{dep}' is listed more than once"),
            ));
        }
    }

    let mut runtime = HashSet::new();
    for dep in &manifest.runtime_dependencies {
        if dep.name.trim().is_empty() {
            return Err(invalid(
                manifest,
                "runtime dependency name cannot be empty".to_string(),
            ));
        }
        if !runtime.insert(dep.name.as_str()) {
            return Err(invalid(
                manifest,
                format!("runtime dependency '{}' is declared more than once", dep.name),
            ));
        }
    }

    let mut env = HashSet::new();
    for var in &manifest.environment_variables {
        if var.name.trim().is_empty() {
            return Err(invalid(
                manifest,
                "environment variable name cannot be empty".to_string(),
            ));
        }
        if !env.insert(var.name.as_str()) {
            return Err(invalid(
                manifest,
                format!("environment variable '{}' is declared more than once", var.name),
            ));
        }
    }

    for name in manifest.template_variables.keys() {
        if !is_identifier(name) {
            return Err(invalid(
                manifest,
                format!("template variable '{name}' is not a valid identifier"),
            ));
        }
    }

    Ok(())
}
