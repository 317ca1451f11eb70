//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default bound on nested macro expansion while resolving one include
pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 64;

/// Default bound on the total number of macro expansions for one include
pub const DEFAULT_MAX_EXPANSION_STEPS: usize = 4096;

/// hdrtrace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root path
    pub project_root: PathBuf,

    /// Include search configuration
    pub search: SearchConfig,

    /// Translation unit discovery
    pub scan: ScanConfig,

    /// Include resolution
    pub resolver: ResolverConfig,

    /// Caching
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            search: SearchConfig::default(),
            scan: ScanConfig::default(),
            resolver: ResolverConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Parse a YAML document. Missing sections take their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    fn check(&self) -> Result<()> {
        if self.resolver.max_expansion_depth == 0 {
            return Err(Error::Config("resolver.max_expansion_depth must be at least 1".into()));
        }
        if self.resolver.max_expansion_steps == 0 {
            return Err(Error::Config("resolver.max_expansion_steps must be at least 1".into()));
        }
        if self.cache.directive_capacity == 0 {
            return Err(Error::Config("cache.directive_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Include search paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// User include directories (`-I`)
    pub include_paths: Vec<PathBuf>,

    /// System include directories (`-isystem`)
    pub system_include_paths: Vec<PathBuf>,
}

/// Translation unit discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extensions of files analyzed as translation units
    pub extensions: Vec<String>,

    /// Directories to exclude
    pub exclude_dirs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec![
                "c".into(),
                "cc".into(),
                "cpp".into(),
                "cxx".into(),
                "m".into(),
                "mm".into(),
            ],
            exclude_dirs: vec![".git".into(), "build".into(), "target".into()],
        }
    }
}

/// Include resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum nesting of macro expansion for one include
    pub max_expansion_depth: usize,
    /// Maximum number of macro expansions for one include
    pub max_expansion_steps: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_expansion_depth: DEFAULT_MAX_EXPANSION_DEPTH,
            max_expansion_steps: DEFAULT_MAX_EXPANSION_STEPS,
        }
    }
}

/// Caching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of parsed directive sets kept in memory
    pub directive_capacity: usize,

    /// Reuse finished header summaries across translation units
    pub share_summaries: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directive_capacity: 1024,
            share_summaries: true,
        }
    }
}
