//! Path utilities for rendered destinations
//!
//! Component manifests use forward slashes everywhere. Destinations are
//! rendered from templates, so they are checked here before they are joined
//! onto a project directory.

use std::path::{Component, Path, PathBuf};

/// Convert a path to a forward-slash string for display and manifests.
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Normalize a manifest-relative path (`./a//b` -> `a/b`).
///
/// Returns `None` if the path is empty, absolute, or climbs out with `..`.
pub fn safe_relative(raw: &str) -> Option<PathBuf> {
    let raw = raw.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&raw).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
