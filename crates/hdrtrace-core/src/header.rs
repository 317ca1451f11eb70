//! Header identity

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Canonical reference to a source or header file.
///
/// Two identities are equal when their resolved paths are equal, so the same
/// file reached through `a/../b.h` and `b.h` maps to a single key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderId(PathBuf);

impl HeaderId {
    /// Create an identity from a path, normalized lexically
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(normalize(path.as_ref()))
    }

    /// Create an identity for a file on disk, following symlinks when the
    /// file exists
    pub fn resolve(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::canonicalize(path) {
            Ok(canonical) => Self(canonical),
            Err(_) => Self::new(path),
        }
    }

    /// The resolved path
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Directory containing this file
    pub fn parent(&self) -> Option<&Path> {
        self.0.parent()
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl From<PathBuf> for HeaderId {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for HeaderId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl AsRef<Path> for HeaderId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for HeaderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Drop `.` components and fold `dir/..` pairs without touching the disk.
/// Leading `..` components of a relative path are kept.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
