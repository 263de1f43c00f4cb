//! Shared fixtures for regkit integration tests

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A registry directory and a project directory side by side
#[allow(dead_code)]
pub struct TestProject {
    pub temp: TempDir,
    pub registry: PathBuf,
    pub project: PathBuf,
}

#[allow(dead_code)]
impl TestProject {
    /// Create an empty registry and a project with the default directory layout
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let registry = temp.path().join("registry");
        let project = temp.path().join("project");
        std::fs::create_dir_all(&registry).expect("Failed to create registry directory");
        std::fs::create_dir_all(&project).expect("Failed to create project directory");

        let this = Self {
            temp,
            registry,
            project,
        };
        this.write_config(
            "directories:\n  agents: src/agents\n  tools: src/tools\n  prompts: src/prompts\n",
        );
        this
    }

    /// Replace `regkit.yaml`
    pub fn write_config(&self, yaml: &str) {
        write(&self.project.join("regkit.yaml"), yaml);
    }

    /// Add a component directory with its manifest
    pub fn component(&self, name: &str, manifest: &str) -> ComponentDir {
        let dir = self.registry.join(name);
        write(&dir.join("component.yaml"), manifest);
        ComponentDir { dir }
    }

    /// Write a file inside the project
    pub fn write_project_file(&self, relative: &str, contents: &str) {
        write(&self.project.join(relative), contents);
    }

    /// Read a file from the project
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.project.join(relative))
            .unwrap_or_else(|e| panic!("Failed to read {relative}: {e}"))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.project.join(relative).exists()
    }

    /// The search agent example: one agent, two tools, one shared variable
    pub fn with_search_agent(self) -> Self {
        self.component(
            "web_search_agent",
            r#"
name: web_search_agent
version: 1.0.0
type: agent
target_directory: agents
files:
  - source: agent.py
registry_dependencies:
  - duckduckgo_search_tool
  - qwant_search_tool
runtime_dependencies:
  - name: openai
    version: ">=1.0"
environment_variables:
  - name: OPENAI_API_KEY
    description: Key for the model provider
template_variables:
  provider:
    default: openai
    description: Model provider
"#,
        )
        .file("agent.py", "PROVIDER = \"{{provider}}\"\nCLIENT = {{provider|title}}Client()\n");

        self.component(
            "duckduckgo_search_tool",
            r#"
name: duckduckgo_search_tool
version: 0.2.0
type: tool
target_directory: tools
files:
  - source: tool.py
    destination: duckduckgo/tool.py
runtime_dependencies:
  - name: requests
    version: ">=2.28"
"#,
        )
        .file("tool.py", "# provider: {{provider}}\nimport requests\n");

        self.component(
            "qwant_search_tool",
            r#"
name: qwant_search_tool
version: 0.1.0
type: tool
target_directory: tools
files:
  - source: tool.py
    destination: qwant/tool.py
runtime_dependencies:
  - name: requests
    version: ">=2.31"
environment_variables:
  - name: QWANT_TOKEN
    required: false
"#,
        )
        .file("tool.py", "import requests\nPROVIDER = '{{provider|upper}}'\n");

        self
    }
}

/// A component directory inside the test registry
pub struct ComponentDir {
    dir: PathBuf,
}

#[allow(dead_code)]
impl ComponentDir {
    /// Add a payload file
    pub fn file(self, relative: &str, contents: &str) -> Self {
        write(&self.dir.join(relative), contents);
        self
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(path, contents).expect("Failed to write file");
}
