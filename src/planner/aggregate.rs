//! Runtime dependency and environment variable aggregation
//!
//! Components are added in install order. Runtime dependencies are
//! deduplicated by name with the last declaration winning; every name
//! declared with more than one distinct constraint is reported as a
//! [`DependencyConflict`]. Environment variables are deduplicated by name
//! and `required` is OR'd across declarations.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::manifest::ComponentManifest;

/// One runtime dependency in the aggregated set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedDependency {
    pub name: String,
    pub version: String,
    /// Component whose declaration won
    pub declared_by: String,
}

/// A single `(component, constraint)` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDeclaration {
    pub component: String,
    pub version: String,
}

/// A runtime dependency declared with different constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyConflict {
    pub name: String,
    /// Every declaration, in install order
    pub declarations: Vec<VersionDeclaration>,
    /// The constraint that was kept
    pub chosen: String,
}

/// One environment variable in the aggregated set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedEnvVar {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub declared_by: Vec<String>,
}

/// Aggregated results for one plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregates {
    pub runtime_dependencies: Vec<AggregatedDependency>,
    pub runtime_dependency_conflicts: Vec<DependencyConflict>,
    pub environment_variables: Vec<AggregatedEnvVar>,
}

/// Accumulates declarations component by component
#[derive(Debug, Default)]
pub struct Aggregator {
    dependencies: BTreeMap<String, Vec<VersionDeclaration>>,
    environment: BTreeMap<String, AggregatedEnvVar>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component's declarations
    pub fn add(&mut self, manifest: &ComponentManifest) {
        for dep in &manifest.runtime_dependencies {
            self.dependencies
                .entry(dep.name.clone())
                .or_default()
                .push(VersionDeclaration {
                    component: manifest.name.clone(),
                    version: dep.version.clone(),
                });
        }

        for var in &manifest.environment_variables {
            let entry = self
                .environment
                .entry(var.name.clone())
                .or_insert_with(|| AggregatedEnvVar {
                    name: var.name.clone(),
                    description: None,
                    required: false,
                    declared_by: Vec::new(),
                });
            entry.required |= var.required;
            if entry.description.is_none() {
                entry.description.clone_from(&var.description);
            }
            entry.declared_by.push(manifest.name.clone());
        }
    }

    pub fn finish(self) -> Aggregates {
        let mut aggregates = Aggregates::default();

        for (name, declarations) in self.dependencies {
            let Some(last) = declarations.last() else {
                continue;
            };
            let chosen = last.version.clone();
            aggregates.runtime_dependencies.push(AggregatedDependency {
                name: name.clone(),
                version: chosen.clone(),
                declared_by: last.component.clone(),
            });

            let distinct = declarations
                .iter()
                .any(|d| d.version != declarations[0].version);
            if distinct {
                warn!(
                    dependency = %name,
                    chosen = %chosen,
                    declarations = declarations.len(),
                    "runtime dependency declared with different version constraints"
                );
                aggregates.runtime_dependency_conflicts.push(DependencyConflict {
                    name,
                    declarations,
                    chosen,
                });
            }
        }

        aggregates.environment_variables = self.environment.into_values().collect();
        aggregates
    }
}
