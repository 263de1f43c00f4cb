//! Plan execution
//!
//! Components are processed one at a time in plan order, so a dependency's
//! files exist before its dependents' files are written. Within a
//! component, operations are grouped by destination: groups run in parallel
//! on the bounded pool, operations inside a group run in plan order.
//!
//! Failure handling:
//!
//! - a conflict (or failed merge) fails its component; no new writes are
//!   issued for it, its transitive dependents are not attempted and
//!   unrelated components continue
//! - a write error fails its component and stops the run; the error is kept
//!   in [`InstallReport::fatal`]
//! - cancellation lets in-flight writes finish and stops the run
//!
//! Renames that already happened are never undone.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{RegkitError, Result};
use crate::materializer::{FileMaterializer, MaterializeOutcome};
use crate::progress::{ProgressReporter, SilentProgress};
use crate::resolver::build_pool;
use crate::transaction::Transaction;

use super::{Aggregates, FileOperation, InstallPlan};

/// Final state of one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComponentStatus {
    /// At least one file written (or nothing to write)
    Installed,
    /// Every file already present
    Skipped,
    Failed { reason: String },
    /// Not processed: the run stopped, or `blocked_by` failed
    NotAttempted { blocked_by: Option<String> },
}

impl ComponentStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, ComponentStatus::Failed { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ComponentStatus::Installed | ComponentStatus::Skipped)
    }
}

/// What happened to one planned file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub source_path: String,
    pub destination: String,
    /// `None` when the file was never attempted
    pub outcome: Option<MaterializeOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentReport {
    pub name: String,
    #[serde(flatten)]
    pub status: ComponentStatus,
    pub files: Vec<FileRecord>,
}

/// Result of executing a plan
#[derive(Debug)]
pub struct InstallReport {
    /// One entry per planned component, in plan order
    pub components: Vec<ComponentReport>,
    pub aggregates: Aggregates,
    /// Error that stopped the run
    pub fatal: Option<RegkitError>,
}

impl InstallReport {
    /// No component failed and the run was not stopped
    pub fn is_success(&self) -> bool {
        self.fatal.is_none() && self.components.iter().all(|c| c.status.is_complete())
    }

    pub fn component(&self, name: &str) -> Option<&ComponentReport> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Components that fully succeeded
    pub fn completed(&self) -> impl Iterator<Item = &ComponentReport> {
        self.components.iter().filter(|c| c.status.is_complete())
    }

    /// Components that failed or were not attempted
    pub fn incomplete(&self) -> impl Iterator<Item = &ComponentReport> {
        self.components.iter().filter(|c| !c.status.is_complete())
    }
}

/// Executes install plans
pub struct Executor<'p> {
    jobs: usize,
    cancel: Arc<AtomicBool>,
    progress: &'p dyn ProgressReporter,
}

/// Why a component stopped issuing writes
enum Halt {
    Conflict(String),
    Error(RegkitError),
    Cancelled,
}

impl Executor<'static> {
    pub fn new(jobs: usize) -> Self {
        Self {
            jobs: jobs.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: &SilentProgress,
        }
    }
}

impl<'p> Executor<'p> {
    /// Share a cancellation token; setting it stops new writes
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_progress<'q>(self, progress: &'q dyn ProgressReporter) -> Executor<'q> {
        Executor {
            jobs: self.jobs,
            cancel: self.cancel,
            progress,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Execute `plan`. Never returns early: the report says what happened.
    pub fn execute(&self, plan: &InstallPlan) -> InstallReport {
        let mut components = Vec::with_capacity(plan.ordered_components.len());
        let mut fatal: Option<RegkitError> = None;

        let pool = match build_pool(self.jobs) {
            Ok(pool) => pool,
            Err(e) => {
                for name in &plan.ordered_components {
                    components.push(not_attempted(plan, name, None));
                }
                return InstallReport {
                    components,
                    aggregates: plan.aggregates.clone(),
                    fatal: Some(e),
                };
            }
        };

        let transaction = Transaction::new();
        let materializer = FileMaterializer::new(&transaction);
        // Failed or not attempted
        let mut blocked: BTreeSet<&str> = BTreeSet::new();
        let total = plan.ordered_components.len();

        for (index, name) in plan.ordered_components.iter().enumerate() {
            if fatal.is_some() {
                components.push(not_attempted(plan, name, None));
                continue;
            }
            if self.cancelled() {
                fatal = Some(RegkitError::Cancelled);
                components.push(not_attempted(plan, name, None));
                continue;
            }

            let blocked_by = plan
                .edges
                .get(name)
                .and_then(|deps| deps.iter().find(|d| blocked.contains(d.as_str())));
            if let Some(dep) = blocked_by {
                debug!(component = %name, dependency = %dep, "dependency failed, not attempting");
                blocked.insert(name);
                components.push(not_attempted(plan, name, Some(dep.clone())));
                self.progress.component_done();
                continue;
            }

            self.progress.component_started(name, index + 1, total);
            let (report, halt) = self.run_component(plan, name, &materializer, &pool);
            match halt {
                None => info!(component = %name, status = ?report.status, "component done"),
                Some(Halt::Conflict(_)) => {
                    warn!(component = %name, "component failed");
                    blocked.insert(name);
                }
                Some(Halt::Error(e)) => {
                    blocked.insert(name);
                    if matches!(e, RegkitError::MergeFailed { .. }) {
                        warn!(component = %name, error = %e, "merge failed");
                    } else {
                        fatal = Some(e);
                    }
                }
                Some(Halt::Cancelled) => {
                    blocked.insert(name);
                    fatal = Some(RegkitError::Cancelled);
                }
            }
            components.push(report);
            self.progress.component_done();
        }

        if fatal.is_some() {
            self.progress.abandon();
        } else {
            self.progress.finish();
        }

        let summary = transaction.finish();
        info!(
            created = summary.created.len(),
            replaced = summary.replaced.len(),
            "execution finished"
        );

        InstallReport {
            components,
            aggregates: plan.aggregates.clone(),
            fatal,
        }
    }

    fn run_component(
        &self,
        plan: &InstallPlan,
        name: &str,
        materializer: &FileMaterializer<'_>,
        pool: &rayon::ThreadPool,
    ) -> (ComponentReport, Option<Halt>) {
        let operations: Vec<&FileOperation> = plan.operations_for(name).collect();

        // Same destination -> same group, groups in first-appearance order
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of: BTreeMap<&std::path::Path, usize> = BTreeMap::new();
        for (i, op) in operations.iter().enumerate() {
            let group = *group_of.entry(op.destination.as_path()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(i);
        }

        let halted = AtomicBool::new(false);
        let results: Vec<Vec<(usize, Result<MaterializeOutcome>)>> = pool.install(|| {
            groups
                .par_iter()
                .map(|group| {
                    let mut out = Vec::with_capacity(group.len());
                    for &i in group {
                        if halted.load(Ordering::SeqCst) || self.cancelled() {
                            break;
                        }
                        let op = operations[i];
                        let result = materializer.materialize(op, op.policy);
                        self.progress.file_done(&op.relative_destination);
                        if !matches!(
                            result,
                            Ok(MaterializeOutcome::Written | MaterializeOutcome::Skipped)
                        ) {
                            halted.store(true, Ordering::SeqCst);
                        }
                        out.push((i, result));
                        if halted.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    out
                })
                .collect()
        });

        let mut outcomes: Vec<Option<MaterializeOutcome>> = vec![None; operations.len()];
        let mut first_problem: Option<(usize, Halt)> = None;
        for (i, result) in results.into_iter().flatten() {
            let problem = match result {
                Ok(outcome) => {
                    outcomes[i] = Some(outcome);
                    (outcome == MaterializeOutcome::Conflict).then(|| {
                        Halt::Conflict(
                            RegkitError::Conflict {
                                path: operations[i].relative_destination.clone(),
                                component: name.to_string(),
                            }
                            .to_string(),
                        )
                    })
                }
                Err(e) => Some(Halt::Error(e)),
            };
            // Report the earliest problem in plan order
            if let Some(problem) = problem {
                if first_problem.as_ref().is_none_or(|(j, _)| i < *j) {
                    first_problem = Some((i, problem));
                }
            }
        }

        let attempted_all = outcomes.iter().all(Option::is_some);
        let halt = match first_problem {
            Some((_, halt)) => Some(halt),
            None if !attempted_all => Some(Halt::Cancelled),
            None => None,
        };

        let status = match &halt {
            Some(Halt::Conflict(reason)) => ComponentStatus::Failed {
                reason: reason.clone(),
            },
            Some(Halt::Error(e)) => ComponentStatus::Failed {
                reason: e.to_string(),
            },
            Some(Halt::Cancelled) => ComponentStatus::Failed {
                reason: RegkitError::Cancelled.to_string(),
            },
            None if outcomes.is_empty()
                || outcomes.contains(&Some(MaterializeOutcome::Written)) =>
            {
                ComponentStatus::Installed
            }
            None => ComponentStatus::Skipped,
        };

        let files = operations
            .iter()
            .zip(outcomes)
            .map(|(op, outcome)| FileRecord {
                source_path: op.source_path.clone(),
                destination: op.relative_destination.clone(),
                outcome,
            })
            .collect();

        (
            ComponentReport {
                name: name.to_string(),
                status,
                files,
            },
            halt,
        )
    }
}

fn not_attempted(plan: &InstallPlan, name: &str, blocked_by: Option<String>) -> ComponentReport {
    ComponentReport {
        name: name.to_string(),
        status: ComponentStatus::NotAttempted { blocked_by },
        files: plan
            .operations_for(name)
            .map(|op| FileRecord {
                source_path: op.source_path.clone(),
                destination: op.relative_destination.clone(),
                outcome: None,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::manifest::{ComponentManifest, ComponentType, FileEntry};
    use crate::materializer::ConflictPolicy;
    use crate::planner::Planner;
    use crate::store::MemoryStore;
    use crate::template::NonInteractive;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn tool(name: &str) -> ComponentManifest {
        ComponentManifest::new(name, ComponentType::Tool, "tools")
            .with_file(FileEntry::new("tool.py").to(format!("{name}/tool.py")))
    }

    /// a -> b, c independent
    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_component(tool("b"), [("tool.py", "# b\n")])
            .with_component(tool("c"), [("tool.py", "# c\n")])
            .with_component(
                tool("a").with_dependency("b"),
                [("tool.py", "# a\n")],
            )
            .with_component(
                ComponentManifest::new("app", ComponentType::Agent, "tools")
                    .with_dependency("a")
                    .with_dependency("c"),
                Vec::<(String, String)>::new(),
            )
    }

    fn plan(temp: &TempDir, policy: ConflictPolicy) -> InstallPlan {
        let config = ProjectConfig::new(temp.path()).with_directory("tools", "tools");
        Planner::new(&store(), &config)
            .with_policy(Some(policy))
            .with_jobs(Some(2))
            .plan("app", &BTreeMap::new(), &mut NonInteractive)
            .unwrap()
    }

    fn status(report: &InstallReport, name: &str) -> ComponentStatus {
        report.component(name).unwrap().status.clone()
    }

    #[test]
    fn test_execute_writes_in_order() {
        let temp = TempDir::new().unwrap();
        let plan = plan(&temp, ConflictPolicy::Overwrite);

        let report = plan.execute();

        assert!(report.is_success());
        assert_eq!(status(&report, "a"), ComponentStatus::Installed);
        assert_eq!(status(&report, "app"), ComponentStatus::Installed);
        assert_eq!(
            fs::read_to_string(temp.path().join("tools/a/tool.py")).unwrap(),
            "# a\n"
        );
    }

    #[test]
    fn test_skip_if_exists_rerun() {
        let temp = TempDir::new().unwrap();
        let plan = plan(&temp, ConflictPolicy::SkipIfExists);

        assert!(plan.execute().is_success());
        let second = plan.execute();
        assert!(second.is_success());
        for name in ["a", "b", "c"] {
            assert_eq!(status(&second, name), ComponentStatus::Skipped);
        }
    }

    #[test]
    fn test_conflict_blocks_dependents_only() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("tools/b")).unwrap();
        fs::write(temp.path().join("tools/b/tool.py"), "mine").unwrap();

        let report = plan(&temp, ConflictPolicy::FailOnConflict).execute();

        assert!(!report.is_success());
        assert!(report.fatal.is_none());
        assert!(status(&report, "b").is_failure());
        assert_eq!(
            status(&report, "a"),
            ComponentStatus::NotAttempted {
                blocked_by: Some("b".to_string())
            }
        );
        assert_eq!(
            status(&report, "app"),
            ComponentStatus::NotAttempted {
                blocked_by: Some("a".to_string())
            }
        );
        assert_eq!(status(&report, "c"), ComponentStatus::Installed);
        assert_eq!(
            fs::read_to_string(temp.path().join("tools/b/tool.py")).unwrap(),
            "mine"
        );
        assert!(!temp.path().join("tools/a/tool.py").exists());
    }

    #[test]
    fn test_write_error_stops_run() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("tools")).unwrap();
        // `b` would need tools/b/ as a directory
        fs::write(temp.path().join("tools/b"), "not a directory").unwrap();

        let report = plan(&temp, ConflictPolicy::Overwrite).execute();

        assert!(matches!(report.fatal, Some(RegkitError::Write { .. })));
        assert!(status(&report, "b").is_failure());
        for name in ["c", "a", "app"] {
            assert_eq!(
                status(&report, name),
                ComponentStatus::NotAttempted { blocked_by: None }
            );
        }
        let completed: Vec<&str> = report.completed().map(|c| c.name.as_str()).collect();
        assert!(completed.is_empty());
    }

    #[test]
    fn test_cancel_before_start() {
        let temp = TempDir::new().unwrap();
        let plan = plan(&temp, ConflictPolicy::Overwrite);
        let cancel = Arc::new(AtomicBool::new(true));

        let report = Executor::new(2).with_cancel_token(cancel).execute(&plan);

        assert!(matches!(report.fatal, Some(RegkitError::Cancelled)));
        assert_eq!(report.incomplete().count(), 4);
        assert!(!temp.path().join("tools").exists());
    }

    #[test]
    fn test_merge_same_destination_in_one_component() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new().with_component(
            ComponentManifest::new("env", ComponentType::Tool, "tools")
                .with_file(FileEntry::new("a.env").to(".env.example"))
                .with_file(FileEntry::new("b.env").to(".env.example")),
            [("a.env", "A=\n"), ("b.env", "B=\n")],
        );
        let config = ProjectConfig::new(temp.path()).with_directory("tools", ".");
        let plan = Planner::new(&store, &config)
            .with_policy(Some(ConflictPolicy::Merge))
            .plan("env", &BTreeMap::new(), &mut NonInteractive)
            .unwrap();

        let report = plan.execute();
        assert!(report.is_success());
        assert_eq!(
            fs::read_to_string(temp.path().join(".env.example")).unwrap(),
            "A=\n\nB=\n"
        );
    }
}
