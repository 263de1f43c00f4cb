//! End-to-end installs into a temporary project

mod common;

use std::collections::BTreeMap;

use common::TestProject;
use pretty_assertions::assert_eq;
use regkit::config::ProjectConfig;
use regkit::error::RegkitError;
use regkit::materializer::{ConflictPolicy, MaterializeOutcome};
use regkit::planner::{ComponentStatus, InstallPlan, InstallReport, Planner};
use regkit::store::DirectoryStore;
use regkit::template::NonInteractive;

fn plan(project: &TestProject, root: &str, policy: ConflictPolicy) -> InstallPlan {
    let config = ProjectConfig::load(&project.project, None).unwrap();
    let store = DirectoryStore::new(&project.registry);
    Planner::new(&store, &config)
        .with_policy(Some(policy))
        .plan(root, &BTreeMap::new(), &mut NonInteractive)
        .unwrap()
}

fn install(project: &TestProject, root: &str, policy: ConflictPolicy) -> InstallReport {
    plan(project, root, policy).execute()
}

fn status<'r>(report: &'r InstallReport, name: &str) -> &'r ComponentStatus {
    &report.component(name).unwrap().status
}

#[test]
fn test_install_search_agent() {
    let project = TestProject::new().with_search_agent();
    let report = install(&project, "web_search_agent", ConflictPolicy::Overwrite);

    assert!(report.is_success());
    assert_eq!(
        project.read("src/agents/agent.py"),
        "PROVIDER = \"openai\"\nCLIENT = OpenaiClient()\n"
    );
    assert_eq!(
        project.read("src/tools/qwant/tool.py"),
        "import requests\nPROVIDER = 'OPENAI'\n"
    );
    assert!(project.exists("src/tools/duckduckgo/tool.py"));
}

#[test]
fn test_skip_if_exists_is_idempotent() {
    let project = TestProject::new().with_search_agent();

    let first = install(&project, "web_search_agent", ConflictPolicy::SkipIfExists);
    assert!(first.is_success());
    assert_eq!(status(&first, "web_search_agent"), &ComponentStatus::Installed);

    let second = install(&project, "web_search_agent", ConflictPolicy::SkipIfExists);
    assert!(second.is_success());
    for component in &second.components {
        assert_eq!(component.status, ComponentStatus::Skipped, "{}", component.name);
        assert!(
            component
                .files
                .iter()
                .all(|f| f.outcome == Some(MaterializeOutcome::Skipped))
        );
    }
}

#[test]
fn test_skip_if_exists_keeps_user_edits() {
    let project = TestProject::new().with_search_agent();
    project.write_project_file("src/agents/agent.py", "# mine\n");

    let report = install(&project, "web_search_agent", ConflictPolicy::SkipIfExists);

    assert!(report.is_success());
    assert_eq!(project.read("src/agents/agent.py"), "# mine\n");
    assert!(project.exists("src/tools/qwant/tool.py"));
}

#[test]
fn test_fail_on_conflict_blocks_dependents_only() {
    let project = TestProject::new().with_search_agent();
    project.write_project_file("src/tools/qwant/tool.py", "# existing\n");

    let report = install(&project, "web_search_agent", ConflictPolicy::FailOnConflict);

    assert!(!report.is_success());
    assert!(report.fatal.is_none());
    assert_eq!(status(&report, "duckduckgo_search_tool"), &ComponentStatus::Installed);
    assert!(matches!(
        status(&report, "qwant_search_tool"),
        ComponentStatus::Failed { .. }
    ));
    assert_eq!(
        status(&report, "web_search_agent"),
        &ComponentStatus::NotAttempted {
            blocked_by: Some("qwant_search_tool".to_string())
        }
    );

    assert_eq!(project.read("src/tools/qwant/tool.py"), "# existing\n");
    assert!(project.exists("src/tools/duckduckgo/tool.py"));
    assert!(!project.exists("src/agents/agent.py"));
}

#[test]
fn test_overwrite_replaces_existing() {
    let project = TestProject::new().with_search_agent();
    project.write_project_file("src/tools/qwant/tool.py", "# stale\n");

    let report = install(&project, "web_search_agent", ConflictPolicy::Overwrite);

    assert!(report.is_success());
    assert_eq!(
        project.read("src/tools/qwant/tool.py"),
        "import requests\nPROVIDER = 'OPENAI'\n"
    );
}

#[test]
fn test_merge_appends_text_and_keeps_static_files() {
    let project = TestProject::new();
    project
        .component(
            "settings_tool",
            "name: settings_tool\nversion: '1'\ntype: tool\ntarget_directory: tools\n\
             files:\n  - source: README.md\n  - source: settings.json\n    kind: static\n",
        )
        .file("README.md", "## Settings tool\n")
        .file("settings.json", "{\"tools\": [\"settings\"], \"debug\": false}\n");
    project.write_project_file("src/tools/README.md", "# Tools\n");
    project.write_project_file("src/tools/settings.json", "{\"tools\": [\"search\"]}\n");

    let report = install(&project, "settings_tool", ConflictPolicy::Merge);
    assert!(report.is_success());

    assert_eq!(project.read("src/tools/README.md"), "# Tools\n\n## Settings tool\n");

    // static files are left alone under merge
    assert_eq!(project.read("src/tools/settings.json"), "{\"tools\": [\"search\"]}\n");

    let again = install(&project, "settings_tool", ConflictPolicy::Merge);
    assert!(again.is_success());
    assert_eq!(project.read("src/tools/README.md"), "# Tools\n\n## Settings tool\n");
}

#[test]
fn test_merge_adds_line_that_only_matches_as_substring() {
    let project = TestProject::new();
    project
        .component(
            "http_tool",
            "name: http_tool\nversion: '1'\ntype: tool\ntarget_directory: tools\n\
             files:\n  - source: requirements.txt\n",
        )
        .file("requirements.txt", "requests\n");
    project.write_project_file("src/tools/requirements.txt", "requests-oauthlib\n");

    let report = install(&project, "http_tool", ConflictPolicy::Merge);
    assert!(report.is_success());
    assert_eq!(status(&report, "http_tool"), &ComponentStatus::Installed);
    assert_eq!(
        project.read("src/tools/requirements.txt"),
        "requests-oauthlib\n\nrequests\n"
    );
}

#[test]
fn test_merge_json_template() {
    let project = TestProject::new();
    project
        .component(
            "mcp_tool",
            "name: mcp_tool\nversion: '1'\ntype: tool\ntarget_directory: tools\n\
             files:\n  - source: servers.json\n",
        )
        .file("servers.json", "{\"servers\": [\"mcp\"]}\n");
    project.write_project_file("src/tools/servers.json", "{\"servers\": [\"local\"], \"port\": 1}\n");

    let report = install(&project, "mcp_tool", ConflictPolicy::Merge);
    assert!(report.is_success());

    let merged: serde_json::Value =
        serde_json::from_str(&project.read("src/tools/servers.json")).unwrap();
    assert_eq!(merged["servers"], serde_json::json!(["local", "mcp"]));
    assert_eq!(merged["port"], serde_json::json!(1));
}

#[test]
fn test_write_error_stops_the_run() {
    let project = TestProject::new().with_search_agent();
    // `src/tools` is a file, so no tool can be written
    project.write_project_file("src/tools", "not a directory\n");

    let report = install(&project, "web_search_agent", ConflictPolicy::Overwrite);

    assert!(!report.is_success());
    assert!(matches!(report.fatal, Some(RegkitError::Write { .. })));
    assert!(matches!(
        status(&report, "duckduckgo_search_tool"),
        ComponentStatus::Failed { .. }
    ));
    assert!(matches!(
        status(&report, "web_search_agent"),
        ComponentStatus::NotAttempted { .. }
    ));
    assert!(!project.exists("src/agents/agent.py"));

    let leftovers: Vec<_> = walkdir::WalkDir::new(&project.project)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".regkit.tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[test]
fn test_missing_directory_key_fails_at_plan_time() {
    let project = TestProject::new().with_search_agent();
    project.write_config("directories:\n  agents: src/agents\n");

    let config = ProjectConfig::load(&project.project, None).unwrap();
    let store = DirectoryStore::new(&project.registry);
    let err = Planner::new(&store, &config)
        .plan("web_search_agent", &BTreeMap::new(), &mut NonInteractive)
        .unwrap_err();

    assert!(matches!(err, RegkitError::UnknownDirectoryKey { ref key, .. } if key == "tools"));
    assert!(!project.exists("src"));
}
