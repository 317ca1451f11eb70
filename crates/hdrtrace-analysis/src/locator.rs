//! Include file lookup
//!
//! Maps a literal include target to files on disk using include search paths.

use hdrtrace_core::config::SearchConfig;
use hdrtrace_core::{HeaderId, IncludeKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds the files a literal include target may refer to.
///
/// More than one candidate is reported to callers as an ambiguous include.
pub trait FileLocator: Send + Sync {
    /// Candidates for `target`, written with `kind` quoting, included from `from`
    fn locate(&self, target: &str, kind: IncludeKind, from: &HeaderId) -> Vec<HeaderId>;

    /// Candidates for an `#include_next` of `target` in `from`.
    ///
    /// Locators without search-path order report every candidate except the
    /// including file itself.
    fn locate_next(&self, target: &str, kind: IncludeKind, from: &HeaderId) -> Vec<HeaderId> {
        self.locate(target, kind, from)
            .into_iter()
            .filter(|candidate| candidate != from)
            .collect()
    }
}

impl<F> FileLocator for F
where
    F: Fn(&str, IncludeKind, &HeaderId) -> Vec<HeaderId> + Send + Sync,
{
    fn locate(&self, target: &str, kind: IncludeKind, from: &HeaderId) -> Vec<HeaderId> {
        self(target, kind, from)
    }
}

/// Compiler-style search over include directories
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    /// User include directories (`-I`)
    include_paths: Vec<PathBuf>,
    /// System include directories (`-isystem`)
    system_include_paths: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SearchConfig, root: &Path) -> Self {
        let mut search = Self::new();
        for path in &config.include_paths {
            search.add_include_path(root.join(path));
        }
        for path in &config.system_include_paths {
            search.add_system_include_path(root.join(path));
        }
        search
    }

    /// Add a user include path
    pub fn add_include_path(&mut self, path: PathBuf) {
        if !self.include_paths.contains(&path) {
            self.include_paths.push(path);
        }
    }

    /// Add a system include path
    pub fn add_system_include_path(&mut self, path: PathBuf) {
        if !self.system_include_paths.contains(&path) {
            self.system_include_paths.push(path);
        }
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    pub fn system_include_paths(&self) -> &[PathBuf] {
        &self.system_include_paths
    }

    /// Resolve a header file path.
    ///
    /// Quoted targets are tried next to the including file first. Then user
    /// paths, then system paths, in the order they were added.
    pub fn resolve(&self, target: &str, kind: IncludeKind, from: Option<&Path>) -> Option<PathBuf> {
        let target_path = Path::new(target);
        if target_path.is_absolute() {
            return target_path.is_file().then(|| target_path.to_path_buf());
        }

        if kind == IncludeKind::Quoted {
            if let Some(parent) = from.and_then(Path::parent) {
                let relative_path = parent.join(target);
                if relative_path.is_file() {
                    debug!("Resolved {} relative to {:?}", target, parent);
                    return Some(relative_path);
                }
            }
        }

        for include_path in self.include_paths.iter().chain(&self.system_include_paths) {
            let full_path = include_path.join(target);
            if full_path.is_file() {
                debug!("Resolved {} in {:?}", target, include_path);
                return Some(full_path);
            }
        }

        debug!("Failed to resolve header: {}", target);
        None
    }

    /// Resolve an `#include_next` target.
    ///
    /// The search resumes after the first search directory containing
    /// `from`. When `from` is in none of them this is a plain lookup.
    pub fn resolve_next(&self, target: &str, kind: IncludeKind, from: &Path) -> Option<PathBuf> {
        let dirs: Vec<&PathBuf> = self.include_paths.iter().chain(&self.system_include_paths).collect();
        let holder = dirs.iter().position(|dir| {
            let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
            from.starts_with(&dir)
        });

        let Some(holder) = holder else {
            return self.resolve(target, kind, Some(from));
        };

        for include_path in &dirs[holder + 1..] {
            let full_path = include_path.join(target);
            if full_path.is_file() {
                debug!("Resolved next {} in {:?}", target, include_path);
                return Some(full_path);
            }
        }

        debug!("Failed to resolve next header: {}", target);
        None
    }
}

impl FileLocator for SearchPath {
    fn locate(&self, target: &str, kind: IncludeKind, from: &HeaderId) -> Vec<HeaderId> {
        self.resolve(target, kind, Some(from.path()))
            .map(HeaderId::resolve)
            .into_iter()
            .collect()
    }

    fn locate_next(&self, target: &str, kind: IncludeKind, from: &HeaderId) -> Vec<HeaderId> {
        self.resolve_next(target, kind, from.path())
            .map(HeaderId::resolve)
            .into_iter()
            .collect()
    }
}
