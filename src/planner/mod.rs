//! Install planning
//!
//! [`Planner::plan`] turns a component name into a ready-to-execute
//! [`InstallPlan`]:
//!
//! 1. resolve the dependency order ([`Resolver`])
//! 2. validate every placeholder in every destination and template file,
//!    and every directory key, before anything is resolved or rendered
//! 3. resolve template variables once for the whole run
//! 4. render contents and destinations into [`FileOperation`]s
//! 5. aggregate runtime dependencies and environment variables
//!
//! Every error in these steps happens before the first write. Executing the
//! plan is [`execute`]'s job.

pub mod aggregate;
pub mod execute;

pub use aggregate::{
    AggregatedDependency, AggregatedEnvVar, Aggregates, Aggregator, DependencyConflict,
    VersionDeclaration,
};
pub use execute::{ComponentReport, ComponentStatus, Executor, FileRecord, InstallReport};

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::common::path::{safe_relative, to_forward_slashes};
use crate::config::ProjectConfig;
use crate::error::{RegkitError, Result};
use crate::manifest::{FileEntry, FileKind};
use crate::materializer::ConflictPolicy;
use crate::resolver::{ResolvedGraph, Resolver, default_jobs, transitive_dependents};
use crate::store::ManifestStore;
use crate::template::{self, InteractiveProvider, Reference, ResolvedVariables, TemplateEngine};

/// One file to write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOperation {
    pub component: String,
    /// Path inside the component payload
    pub source_path: String,
    /// Rendered content (raw bytes for static files)
    #[serde(skip)]
    pub content: Vec<u8>,
    /// Absolute destination
    pub destination: PathBuf,
    /// Destination relative to the project root, forward slashes
    pub relative_destination: String,
    pub policy: ConflictPolicy,
    pub kind: FileKind,
}

/// An optional file left out of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmittedFile {
    pub component: String,
    pub source_path: String,
    pub reason: String,
}

/// The computed result of one resolution pass
#[derive(Debug, Clone, Serialize)]
pub struct InstallPlan {
    /// Requested component
    pub root: String,
    pub project_root: PathBuf,
    /// Dependencies first, each component once
    pub ordered_components: Vec<String>,
    /// Direct registry dependencies per component
    pub edges: BTreeMap<String, Vec<String>>,
    pub file_operations: Vec<FileOperation>,
    #[serde(flatten)]
    pub aggregates: Aggregates,
    pub variables: ResolvedVariables,
    pub omitted_files: Vec<OmittedFile>,
    pub policy: ConflictPolicy,
    pub jobs: usize,
}

impl InstallPlan {
    /// File operations of one component, in plan order
    pub fn operations_for<'p>(&'p self, component: &'p str) -> impl Iterator<Item = &'p FileOperation> {
        self.file_operations
            .iter()
            .filter(move |op| op.component == component)
    }

    /// Components that depend on `component`, directly or transitively
    pub fn dependents_of(&self, component: &str) -> BTreeSet<String> {
        transitive_dependents(&self.edges, component)
    }

    /// blake3 digest of the order and every file operation.
    ///
    /// Identical inputs give identical fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for name in &self.ordered_components {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
        }
        for op in &self.file_operations {
            hasher.update(op.component.as_bytes());
            hasher.update(&[0]);
            hasher.update(op.relative_destination.as_bytes());
            hasher.update(&[0]);
            hasher.update(op.policy.as_str().as_bytes());
            hasher.update(&(op.content.len() as u64).to_le_bytes());
            hasher.update(&op.content);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Execute with default settings
    pub fn execute(&self) -> InstallReport {
        Executor::new(self.jobs).execute(self)
    }
}

/// A file entry that passed validation, waiting for variable values
struct Candidate<'g> {
    component: &'g str,
    entry: &'g FileEntry,
    payload: &'g [u8],
    target_dir: PathBuf,
    /// Variables referenced by the destination or the content
    variables: BTreeSet<String>,
}

fn content_location(component: &str, source: &str) -> String {
    format!("{component}:{source}")
}

fn destination_location(component: &str, source: &str) -> String {
    format!("destination of {component}:{source}")
}

/// Record where each variable is referenced.
///
/// The location kept is the first one, or the first required one once a
/// non-optional file references the variable.
fn note_references(
    references: &mut BTreeMap<String, Reference>,
    names: &BTreeSet<String>,
    location: &str,
    optional: bool,
) {
    for name in names {
        let reference = references.entry(name.clone()).or_insert_with(|| Reference {
            required: false,
            first_location: location.to_string(),
        });
        if !optional && !reference.required {
            reference.required = true;
            reference.first_location = location.to_string();
        }
    }
}

/// Builds install plans against one store and project
pub struct Planner<'a> {
    store: &'a dyn ManifestStore,
    config: &'a ProjectConfig,
    policy: Option<ConflictPolicy>,
    jobs: Option<usize>,
}

impl<'a> Planner<'a> {
    pub fn new(store: &'a dyn ManifestStore, config: &'a ProjectConfig) -> Self {
        Self {
            store,
            config,
            policy: None,
            jobs: None,
        }
    }

    /// Conflict policy for this run (falls back to the project's, then `overwrite`)
    #[must_use]
    pub fn with_policy(mut self, policy: Option<ConflictPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Worker limit for this run (falls back to the project's, then the default)
    #[must_use]
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    fn effective_policy(&self) -> ConflictPolicy {
        self.policy
            .or(self.config.conflict_policy)
            .unwrap_or_default()
    }

    fn effective_jobs(&self) -> usize {
        self.jobs
            .or(self.config.jobs)
            .unwrap_or_else(default_jobs)
            .max(1)
    }

    /// Build the plan for `root`.
    ///
    /// `overrides` are the per-invocation variable values; `provider` is
    /// asked only for variables nothing else gives a value to.
    pub fn plan(
        &self,
        root: &str,
        overrides: &BTreeMap<String, String>,
        provider: &mut dyn InteractiveProvider,
    ) -> Result<InstallPlan> {
        let policy = self.effective_policy();
        let jobs = self.effective_jobs();

        let graph = Resolver::new(self.store).with_jobs(jobs).resolve(root)?;
        let engine = TemplateEngine::new(graph.ordered_bundles().map(|b| &b.manifest));

        let mut omitted_files = Vec::new();
        let (candidates, references) = self.collect_candidates(&graph, &engine, &mut omitted_files)?;

        let variables = engine.resolve_variables(&references, self.config, overrides, provider)?;

        let file_operations =
            self.build_operations(candidates, &variables, policy, &mut omitted_files)?;
        check_duplicates(&file_operations, policy)?;

        let mut aggregator = Aggregator::new();
        for bundle in graph.ordered_bundles() {
            aggregator.add(&bundle.manifest);
        }

        info!(
            component = %root,
            components = graph.order.len(),
            files = file_operations.len(),
            %policy,
            "install plan ready"
        );

        Ok(InstallPlan {
            root: root.to_string(),
            project_root: self.config.root.clone(),
            ordered_components: graph.order,
            edges: graph.edges,
            file_operations,
            aggregates: aggregator.finish(),
            variables,
            omitted_files,
            policy,
            jobs,
        })
    }

    /// Validate every file entry and collect variable references
    fn collect_candidates<'g>(
        &self,
        graph: &'g ResolvedGraph,
        engine: &TemplateEngine,
        omitted: &mut Vec<OmittedFile>,
    ) -> Result<(Vec<Candidate<'g>>, BTreeMap<String, Reference>)> {
        let mut candidates = Vec::new();
        let mut references: BTreeMap<String, Reference> = BTreeMap::new();

        for bundle in graph.ordered_bundles() {
            let manifest = &bundle.manifest;
            let key = &manifest.target_directory;
            let target_dir = self.config.directory_for_key(key).ok_or_else(|| {
                RegkitError::UnknownDirectoryKey {
                    key: key.clone(),
                    component: manifest.name.clone(),
                }
            })?;

            for entry in &manifest.files {
                let Some(payload) = bundle.file(&entry.source) else {
                    if entry.optional {
                        debug!(component = %manifest.name, source = %entry.source, "optional file missing from registry");
                        omitted.push(OmittedFile {
                            component: manifest.name.clone(),
                            source_path: entry.source.clone(),
                            reason: "not provided by the registry".to_string(),
                        });
                        continue;
                    }
                    return Err(RegkitError::MissingSourceFile {
                        component: manifest.name.clone(),
                        source_path: entry.source.clone(),
                    });
                };

                let dest_location = destination_location(&manifest.name, &entry.source);
                let in_destination = engine.validate(entry.destination_template(), &dest_location)?;
                note_references(&mut references, &in_destination, &dest_location, entry.optional);
                let mut variables = in_destination;

                if entry.kind == FileKind::Template {
                    let location = content_location(&manifest.name, &entry.source);
                    let text = std::str::from_utf8(payload).map_err(|e| RegkitError::TemplateInvalid {
                        location: location.clone(),
                        message: format!("template files must be UTF-8 ({e}); mark the file `kind: static`"),
                    })?;
                    let in_content = engine.validate(text, &location)?;
                    note_references(&mut references, &in_content, &location, entry.optional);
                    variables.extend(in_content);
                }

                candidates.push(Candidate {
                    component: &manifest.name,
                    entry,
                    payload,
                    target_dir: target_dir.clone(),
                    variables,
                });
            }
        }

        Ok((candidates, references))
    }

    /// Render every candidate into a file operation
    fn build_operations(
        &self,
        candidates: Vec<Candidate<'_>>,
        variables: &ResolvedVariables,
        policy: ConflictPolicy,
        omitted: &mut Vec<OmittedFile>,
    ) -> Result<Vec<FileOperation>> {
        let mut operations = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let Candidate {
                component,
                entry,
                payload,
                target_dir,
                variables: referenced,
            } = candidate;

            // Only optional files can reference a variable without a value
            if let Some(missing) = referenced.iter().find(|name| !variables.contains(name)) {
                debug!(%component, source = %entry.source, variable = %missing, "omitting optional file");
                omitted.push(OmittedFile {
                    component: component.to_string(),
                    source_path: entry.source.clone(),
                    reason: format!("template variable '{missing}' has no value"),
                });
                continue;
            }

            let dest_location = destination_location(component, &entry.source);
            let rendered_dest = template::render(entry.destination_template(), variables, &dest_location)?;
            let relative = safe_relative(&rendered_dest).ok_or_else(|| RegkitError::UnsafeDestination {
                component: component.to_string(),
                destination: rendered_dest.clone(),
            })?;
            let destination = target_dir.join(relative);

            let content = match entry.kind {
                FileKind::Template => template::render_bytes(
                    payload,
                    variables,
                    &content_location(component, &entry.source),
                )?,
                FileKind::Static => payload.to_vec(),
            };

            let relative_destination = destination
                .strip_prefix(&self.config.root)
                .map_or_else(|_| to_forward_slashes(&destination), to_forward_slashes);

            operations.push(FileOperation {
                component: component.to_string(),
                source_path: entry.source.clone(),
                content,
                destination,
                relative_destination,
                policy,
                kind: entry.kind,
            });
        }

        Ok(operations)
    }
}

/// Two operations may share a destination only under `merge`
fn check_duplicates(operations: &[FileOperation], policy: ConflictPolicy) -> Result<()> {
    if policy == ConflictPolicy::Merge {
        return Ok(());
    }
    let mut seen: BTreeMap<&PathBuf, &str> = BTreeMap::new();
    for op in operations {
        if let Some(first) = seen.insert(&op.destination, &op.component) {
            return Err(RegkitError::DuplicateDestination {
                path: op.relative_destination.clone(),
                first: first.to_string(),
                second: op.component.clone(),
            });
        }
    }
    Ok(())
}
