//! In-memory registry

use std::collections::BTreeMap;

use crate::error::{RegkitError, Result};
use crate::manifest::ComponentManifest;

use super::{ComponentBundle, ManifestStore};

/// Registry held in memory; used by tests and by embedders that fetch
/// bundles themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bundles: BTreeMap<String, ComponentBundle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a component
    pub fn insert(&mut self, bundle: ComponentBundle) {
        self.bundles.insert(bundle.manifest.name.clone(), bundle);
    }

    /// Builder-style insert of a manifest and its files
    #[must_use]
    pub fn with_component<I, S, B>(mut self, manifest: ComponentManifest, files: I) -> Self
    where
        I: IntoIterator<Item = (S, B)>,
        S: Into<String>,
        B: Into<Vec<u8>>,
    {
        let bundle = files
            .into_iter()
            .fold(ComponentBundle::new(manifest), |bundle, (path, bytes)| {
                bundle.with_file(path, bytes)
            });
        self.insert(bundle);
        self
    }
}

impl ManifestStore for MemoryStore {
    fn fetch(&self, name: &str) -> Result<ComponentBundle> {
        self.bundles
            .get(name)
            .cloned()
            .ok_or_else(|| RegkitError::MissingComponent {
                name: name.to_string(),
                required_by: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ComponentType;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new().with_component(
            ComponentManifest::new("calc", ComponentType::Tool, "tools"),
            [("calc.py", "x = 1\n")],
        );

        let bundle = store.fetch("calc").unwrap();
        assert_eq!(bundle.file("calc.py"), Some("x = 1\n".as_bytes()));
        assert!(matches!(
            store.fetch("nope"),
            Err(RegkitError::MissingComponent { .. })
        ));
    }
}
