//! hdrtrace CLI
//!
//! Command-line interface for header dependency discovery.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use hdrtrace_analysis::{
    affected_units, GraphBuilder, IncludeGraph, IncludeResolver, ParallelAnalyzer, SearchPath,
    SummaryCache,
};
use hdrtrace_core::{Config, HeaderId};
use hdrtrace_parser::FileDirectiveProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hdrtrace")]
#[command(author, version, about = "Header dependency discovery for incremental builds", long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct SearchArgs {
    /// Add a user include directory
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Add a system include directory
    #[arg(long, value_name = "DIR")]
    isystem: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the headers a translation unit depends on
    Deps {
        /// Translation unit
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze every translation unit below a directory
    Scan {
        /// Project directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the translation units a header change requires rebuilding
    Affected {
        /// Project directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Changed header
        #[arg(long, value_name = "HEADER")]
        changed: PathBuf,

        #[command(flatten)]
        search: SearchArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Deps {
            file,
            search,
            format,
            output,
        } => cmd_deps(&config, &file, &search, &format, output.as_deref()),
        Commands::Scan { dir, search, format } => cmd_scan(&config, &dir, &search, &format),
        Commands::Affected {
            dir,
            changed,
            search,
        } => cmd_affected(&config, &dir, &changed, &search),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Configuration file if given, `hdrtrace.yaml` in the working directory if
/// present, defaults otherwise
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => {
            let local = Path::new("hdrtrace.yaml");
            if local.is_file() {
                debug!("Using {}", local.display());
                Ok(Config::load(local)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Search paths from the configuration followed by the command line ones.
fn search_path(config: &Config, args: &SearchArgs) -> SearchPath {
    let mut search = SearchPath::from_config(&config.search, &config.project_root);
    for dir in &args.include {
        search.add_include_path(dir.clone());
    }
    for dir in &args.isystem {
        search.add_system_include_path(dir.clone());
    }
    search
}

fn resolver(config: &Config, args: &SearchArgs) -> IncludeResolver<SearchPath> {
    IncludeResolver::new(search_path(config, args))
        .with_max_depth(config.resolver.max_expansion_depth)
        .with_max_steps(config.resolver.max_expansion_steps)
}

fn analyzer(config: &Config, args: &SearchArgs) -> ParallelAnalyzer<FileDirectiveProvider, SearchPath> {
    let provider = FileDirectiveProvider::with_cache_capacity(config.cache.directive_capacity);
    let analyzer = ParallelAnalyzer::new(provider, resolver(config, args));
    if config.cache.share_summaries {
        analyzer.with_summaries(Arc::new(SummaryCache::new()))
    } else {
        analyzer
    }
}

/// Graphs of the units that could be analyzed, and the units that could not
struct DirAnalysis {
    graphs: Vec<IncludeGraph>,
    failed: Vec<HeaderId>,
}

impl DirAnalysis {
    fn from_results(results: Vec<(HeaderId, hdrtrace_core::Result<IncludeGraph>)>) -> Self {
        let mut analysis = DirAnalysis {
            graphs: Vec::new(),
            failed: Vec::new(),
        };
        for (unit, result) in results {
            match result {
                Ok(graph) => analysis.graphs.push(graph),
                Err(e) => {
                    warn!("Failed to analyze {}: {}", unit, e);
                    analysis.failed.push(unit);
                }
            }
        }
        analysis
    }

    /// Units to rebuild after `changed` is modified. A unit that could not
    /// be analyzed is always rebuilt.
    fn rebuild(&self, changed: &HeaderId) -> Vec<&HeaderId> {
        let mut units = affected_units(&self.graphs, changed);
        units.extend(&self.failed);
        units.sort();
        units
    }
}

/// Analyze all units below `dir`
fn analyze_dir(config: &Config, dir: &Path, args: &SearchArgs) -> DirAnalysis {
    let extensions: Vec<&str> = config.scan.extensions.iter().map(String::as_str).collect();
    let exclude_dirs: Vec<&str> = config.scan.exclude_dirs.iter().map(String::as_str).collect();

    DirAnalysis::from_results(analyzer(config, args).analyze_directory(dir, &extensions, &exclude_dirs))
}

fn cmd_deps(config: &Config, file: &Path, args: &SearchArgs, format: &str, output: Option<&Path>) -> Result<()> {
    let provider = FileDirectiveProvider::with_cache_capacity(config.cache.directive_capacity);
    let resolver = resolver(config, args);
    let unit = HeaderId::resolve(file);

    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&unit)
        .with_context(|| format!("analyzing {}", file.display()))?;

    let rendered = match format {
        "json" => graph.to_json()?,
        "text" => render_deps(&graph),
        other => bail!("Unknown format: {}", other),
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("Output written to: {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn cmd_scan(config: &Config, dir: &Path, args: &SearchArgs, format: &str) -> Result<()> {
    let DirAnalysis { graphs, failed } = analyze_dir(config, dir, args);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&graphs)?),
        "text" => {
            println!("📂 {} translation units in {}", graphs.len(), dir.display());
            for graph in &graphs {
                let marker = if graph.is_complete() { "✓" } else { "?" };
                println!("  {} {} ({} headers)", marker, graph.source, graph.dependencies().count());
            }
            let incomplete = graphs.iter().filter(|g| !g.is_complete()).count();
            if incomplete > 0 {
                println!("\n⚠️  {} units have unresolved includes", incomplete);
            }
            for unit in &failed {
                println!("  ✗ {} (analysis failed)", unit);
            }
        }
        other => bail!("Unknown format: {}", other),
    }
    Ok(())
}

fn cmd_affected(config: &Config, dir: &Path, changed: &Path, args: &SearchArgs) -> Result<()> {
    let analysis = analyze_dir(config, dir, args);
    let changed = HeaderId::resolve(changed);

    for unit in analysis.rebuild(&changed) {
        println!("{}", unit);
    }
    Ok(())
}

fn render_deps(graph: &IncludeGraph) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", graph.source));
    for header in graph.dependencies() {
        out.push_str(&format!("  {}\n", header));
    }
    if !graph.is_complete() {
        out.push_str("\nUnresolved includes (any header change rebuilds this unit):\n");
        for issue in &graph.issues {
            out.push_str(&format!("  {}\n", issue));
        }
    }
    out
}
