//! Parallel analysis of translation units using rayon
//!
//! Every unit gets its own traversal and registry. Workers share only the
//! directive provider and, optionally, a summary cache whose entries are
//! immutable once published.

use hdrtrace_core::{HeaderId, Result};
use hdrtrace_parser::DirectiveProvider;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;
use walkdir::WalkDir;

use crate::graph::{GraphBuilder, IncludeGraph};
use crate::locator::FileLocator;
use crate::resolver::IncludeResolver;
use crate::summary::SummaryCache;

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress event for tracking analysis progress
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Analysis phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Scanning,
    Analyzing,
    Complete,
}

/// Analyzer for many translation units at once
pub struct ParallelAnalyzer<P, L> {
    provider: P,
    resolver: IncludeResolver<L>,
    summaries: Option<Arc<SummaryCache>>,
    progress_callback: Option<Arc<ProgressCallback>>,
}

impl<P: DirectiveProvider, L: FileLocator> ParallelAnalyzer<P, L> {
    pub fn new(provider: P, resolver: IncludeResolver<L>) -> Self {
        Self {
            provider,
            resolver,
            summaries: None,
            progress_callback: None,
        }
    }

    /// Share header summaries between units
    pub fn with_summaries(mut self, cache: Arc<SummaryCache>) -> Self {
        self.summaries = Some(cache);
        self
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }

    pub fn summaries(&self) -> Option<&SummaryCache> {
        self.summaries.as_deref()
    }

    /// Build the include graph of every unit in parallel
    pub fn analyze_units(&self, units: &[HeaderId]) -> Vec<(HeaderId, Result<IncludeGraph>)> {
        let total = units.len();
        let processed = AtomicUsize::new(0);

        self.emit_progress(ProgressPhase::Analyzing, 0, total, "Starting parallel analysis...");

        let results: Vec<_> = units
            .par_iter()
            .map(|unit| {
                let result = self.analyze_unit(unit);

                let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                if current % 10 == 0 || current == total {
                    self.emit_progress(
                        ProgressPhase::Analyzing,
                        current,
                        total,
                        format!("Analyzed {}/{} units", current, total),
                    );
                }

                (unit.clone(), result)
            })
            .collect();

        self.emit_progress(ProgressPhase::Complete, total, total, "Analysis complete");
        results
    }

    /// Build the include graph of one unit
    pub fn analyze_unit(&self, unit: &HeaderId) -> Result<IncludeGraph> {
        let builder = GraphBuilder::new(&self.provider, &self.resolver);
        match self.summaries.as_deref() {
            Some(cache) => builder.with_summaries(cache).build(unit),
            None => builder.build(unit),
        }
    }

    /// Find translation units below `dir` and analyze them
    pub fn analyze_directory(
        &self,
        dir: &Path,
        extensions: &[&str],
        exclude_dirs: &[&str],
    ) -> Vec<(HeaderId, Result<IncludeGraph>)> {
        self.emit_progress(ProgressPhase::Scanning, 0, 0, "Scanning directory...");

        let units = find_units(dir, extensions, exclude_dirs);

        info!("Found {} translation units", units.len());
        self.emit_progress(
            ProgressPhase::Scanning,
            units.len(),
            units.len(),
            format!("Found {} units", units.len()),
        );

        self.analyze_units(&units)
    }

    fn emit_progress<S: Into<String>>(&self, phase: ProgressPhase, current: usize, total: usize, message: S) {
        if let Some(ref callback) = self.progress_callback {
            callback(ProgressEvent {
                phase,
                current,
                total,
                message: message.into(),
            });
        }
    }
}

/// Files below `dir` with one of `extensions`, skipping `exclude_dirs`,
/// sorted by path
pub fn find_units(dir: &Path, extensions: &[&str], exclude_dirs: &[&str]) -> Vec<HeaderId> {
    let mut units: Vec<HeaderId> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !e
                    .file_name()
                    .to_str()
                    .map(|name| exclude_dirs.contains(&name))
                    .unwrap_or(false)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.contains(&ext))
                .unwrap_or(false)
        })
        .map(|e| HeaderId::resolve(e.path()))
        .collect();
    units.sort();
    units
}
