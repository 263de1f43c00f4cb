//! Local registry directory
//!
//! Layout:
//!
//! ```text
//! <registry>/
//!   duckduckgo_search_tool/
//!     component.yaml
//!     tool.py
//!   web_search_agent/
//!     component.yaml
//!     agent.py
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::common::path::to_forward_slashes;
use crate::error::{RegkitError, Result};
use crate::manifest::{ComponentManifest, MANIFEST_FILE_NAMES, is_valid_component_name};

use super::{ComponentBundle, ManifestStore};

/// Registry backed by a directory of component directories
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn fetch_failed(name: &str, path: &Path, e: impl std::fmt::Display) -> RegkitError {
        RegkitError::FetchFailed {
            name: name.to_string(),
            reason: format!("{}: {e}", path.display()),
        }
    }

    fn read_manifest(&self, name: &str, dir: &Path) -> Result<Option<(String, ComponentManifest)>> {
        for file_name in MANIFEST_FILE_NAMES {
            let path = dir.join(file_name);
            if !path.is_file() {
                continue;
            }
            let contents =
                std::fs::read_to_string(&path).map_err(|e| Self::fetch_failed(name, &path, e))?;
            let manifest = ComponentManifest::from_file_contents(name, file_name, &contents)?;
            return Ok(Some(((*file_name).to_string(), manifest)));
        }
        Ok(None)
    }

    fn read_payload(
        &self,
        name: &str,
        dir: &Path,
        manifest_file: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| Self::fetch_failed(name, dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let key = to_forward_slashes(relative);
            if key == manifest_file {
                continue;
            }
            let bytes =
                std::fs::read(entry.path()).map_err(|e| Self::fetch_failed(name, entry.path(), e))?;
            files.insert(key, bytes);
        }
        Ok(files)
    }
}

impl ManifestStore for DirectoryStore {
    fn fetch(&self, name: &str) -> Result<ComponentBundle> {
        let missing = || RegkitError::MissingComponent {
            name: name.to_string(),
            required_by: None,
        };

        // Names double as directory names, so never let one walk out of the registry
        if !is_valid_component_name(name) {
            return Err(missing());
        }

        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(missing());
        }

        let Some((manifest_file, manifest)) = self.read_manifest(name, &dir)? else {
            return Err(RegkitError::FetchFailed {
                name: name.to_string(),
                reason: format!(
                    "{} has no {}",
                    dir.display(),
                    MANIFEST_FILE_NAMES.join(" / ")
                ),
            });
        };

        let files = self.read_payload(name, &dir, &manifest_file)?;
        Ok(ComponentBundle { manifest, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_fetch_reads_manifest_and_payload() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("qwant_search_tool");
        write(
            &dir.join("component.yaml"),
            "name: qwant_search_tool\nversion: '1.0'\ntype: tool\ntarget_directory: tools\n\
             files:\n  - source: tool.py\n  - source: helpers/parse.py\n",
        );
        write(&dir.join("tool.py"), "import requests\n");
        write(&dir.join("helpers/parse.py"), "def parse(): ...\n");

        let store = DirectoryStore::new(temp.path());
        let bundle = store.fetch("qwant_search_tool").unwrap();

        assert_eq!(bundle.manifest.name, "qwant_search_tool");
        assert_eq!(
            bundle.files.keys().collect::<Vec<_>>(),
            vec!["helpers/parse.py", "tool.py"]
        );
    }

    #[test]
    fn test_fetch_json_manifest() {
        let temp = TempDir::new().unwrap();
        write(
            &temp.path().join("calc/component.json"),
            r#"{"name": "calc", "version": "1", "type": "tool", "target_directory": "tools"}"#,
        );
        let bundle = DirectoryStore::new(temp.path()).fetch("calc").unwrap();
        assert!(bundle.files.is_empty());
    }

    #[test]
    fn test_missing_component() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp.path());
        assert!(matches!(
            store.fetch("nothing_here"),
            Err(RegkitError::MissingComponent { .. })
        ));
        assert!(matches!(
            store.fetch("../etc"),
            Err(RegkitError::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_directory_without_manifest_fails() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("broken/tool.py"), "");
        assert!(matches!(
            DirectoryStore::new(temp.path()).fetch("broken"),
            Err(RegkitError::FetchFailed { .. })
        ));
    }
}
