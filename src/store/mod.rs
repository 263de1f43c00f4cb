//! Manifest stores
//!
//! A [`ManifestStore`] hands the installer one [`ComponentBundle`] (parsed
//! manifest plus file payloads) per component name. Where the bytes come
//! from is the store's business: a local registry directory
//! ([`DirectoryStore`]), memory ([`MemoryStore`]), or a network-backed
//! implementation provided by the caller.
//!
//! Stores are passed explicitly into every resolution run. [`CachingStore`]
//! wraps one for the duration of a run so each name is fetched at most once.

mod directory;
mod memory;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{RegkitError, Result};
use crate::manifest::ComponentManifest;

/// A component manifest with its file payloads keyed by source path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentBundle {
    pub manifest: ComponentManifest,
    pub files: BTreeMap<String, Vec<u8>>,
}

impl ComponentBundle {
    pub fn new(manifest: ComponentManifest) -> Self {
        Self {
            manifest,
            files: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, source: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(source.into(), contents.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Payload for a manifest `source` path
    pub fn file(&self, source: &str) -> Option<&[u8]> {
        let key = source.trim_start_matches("./");
        self.files.get(key).map(Vec::as_slice)
    }
}

/// Registry fetch collaborator
pub trait ManifestStore: Send + Sync {
    /// Fetch a component.
    ///
    /// Returns [`RegkitError::MissingComponent`] if the registry has no
    /// component of that name. Any other error is treated as fatal by the
    /// resolver, including a fetch that exceeded the store's own timeout.
    fn fetch(&self, name: &str) -> Result<ComponentBundle>;
}

impl<T: ManifestStore + ?Sized> ManifestStore for &T {
    fn fetch(&self, name: &str) -> Result<ComponentBundle> {
        (**self).fetch(name)
    }
}

/// Run-scoped cache in front of another store
pub struct CachingStore<'a> {
    inner: &'a dyn ManifestStore,
    cache: Mutex<HashMap<String, Arc<ComponentBundle>>>,
}

impl<'a> CachingStore<'a> {
    pub fn new(inner: &'a dyn ManifestStore) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch through the cache
    pub fn get(&self, name: &str) -> Result<Arc<ComponentBundle>> {
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(hit));
        }

        tracing::debug!(component = %name, "fetching component");
        let bundle = self.inner.fetch(name)?;
        if bundle.manifest.name != name {
            return Err(RegkitError::ManifestInvalid {
                component: name.to_string(),
                message: format!(
                    "registry returned a manifest named '{}'",
                    bundle.manifest.name
                ),
            });
        }

        let bundle = Arc::new(bundle);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&bundle));
        Ok(bundle)
    }

    /// Number of distinct components fetched so far
    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
