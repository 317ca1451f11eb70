//! Integration tests over real source trees
//!
//! Builds small projects on disk and runs the analysis through the file
//! backed provider and compiler-style search paths.

use hdrtrace_analysis::{
    affected_units, GraphBuilder, IncludeResolver, IssueKind, ParallelAnalyzer, SearchPath,
    SummaryCache, UnresolvedReason,
};
use hdrtrace_core::HeaderId;
use hdrtrace_parser::FileDirectiveProvider;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Project laid out like a typical portable library
fn create_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(
        root,
        "src/main.c",
        r#"
#include "config.h"
#include PLATFORM_HEADER
#include <lib/api.h>

int main(void) { return 0; }
"#,
    );
    write(
        root,
        "src/tool.c",
        r#"
#include <lib/api.h>
/* #include "config.h" */
"#,
    );
    write(
        root,
        "src/config.h",
        r#"
#ifndef CONFIG_H
#define CONFIG_H
#define PLATFORM_HEADER PLATFORM_PATH(posix)
#define PLATFORM_PATH(name) <platform/name.h>
#endif
"#,
    );
    write(root, "include/platform/posix.h", "#include <lib/types.h>\n");
    write(
        root,
        "include/lib/api.h",
        "#include \"types.h\"\n#define LIB_API_VERSION 3\n",
    );
    write(root, "include/lib/types.h", "typedef int lib_int;\n");
    write(root, "build/generated.c", "#include \"missing.h\"\n");

    temp
}

fn search(root: &Path) -> SearchPath {
    let mut search = SearchPath::new();
    search.add_include_path(root.join("include"));
    search
}

fn id(root: &Path, rel: &str) -> HeaderId {
    HeaderId::resolve(root.join(rel))
}

#[test]
fn test_function_macro_picks_platform_header() {
    let project = create_project();
    let root = project.path();
    let provider = FileDirectiveProvider::new();
    let resolver = IncludeResolver::new(search(root));

    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&id(root, "src/main.c"))
        .unwrap();

    assert!(graph.is_complete(), "issues: {:?}", graph.issues);
    assert!(graph.headers.contains(&id(root, "include/platform/posix.h")));
    assert!(graph.headers.contains(&id(root, "include/lib/types.h")));
    assert_eq!(graph.dependencies().count(), 4);
}

#[test]
fn test_commented_include_is_ignored() {
    let project = create_project();
    let root = project.path();
    let provider = FileDirectiveProvider::new();
    let resolver = IncludeResolver::new(search(root));

    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&id(root, "src/tool.c"))
        .unwrap();

    assert!(!graph.headers.contains(&id(root, "src/config.h")));
    assert!(graph.affected_by(&id(root, "include/lib/types.h")));
    assert!(!graph.affected_by(&id(root, "include/platform/posix.h")));
}

#[test]
fn test_missing_header_makes_graph_incomplete() {
    let project = create_project();
    let root = project.path();
    let provider = FileDirectiveProvider::new();
    let resolver = IncludeResolver::new(search(root));

    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&id(root, "build/generated.c"))
        .unwrap();

    assert_eq!(graph.issues.len(), 1);
    assert!(matches!(
        graph.issues[0].problem,
        IssueKind::Unresolved {
            reason: UnresolvedReason::NotFound(_)
        }
    ));
    assert!(graph.affected_by(&id(root, "include/lib/api.h")));
}

#[test]
fn test_directory_analysis_with_shared_summaries() {
    let project = create_project();
    let root = project.path();
    let cache = Arc::new(SummaryCache::new());
    let analyzer = ParallelAnalyzer::new(
        FileDirectiveProvider::new(),
        IncludeResolver::new(search(root)),
    )
    .with_summaries(cache.clone());

    let results = analyzer.analyze_directory(root, &["c"], &["build"]);
    assert_eq!(results.len(), 2);

    let graphs: Vec<_> = results.into_iter().map(|(_, g)| g.unwrap()).collect();
    let touched = affected_units(&graphs, &id(root, "include/platform/posix.h"));
    assert_eq!(touched, vec![&id(root, "src/main.c")]);

    let touched = affected_units(&graphs, &id(root, "include/lib/types.h"));
    assert_eq!(touched.len(), 2);

    assert!(cache.get(&id(root, "include/lib/api.h")).is_some());
}

#[test]
fn test_edited_header_is_rescanned() {
    let project = create_project();
    let root = project.path();
    let provider = FileDirectiveProvider::new();
    let resolver = IncludeResolver::new(search(root));
    let unit = id(root, "src/main.c");

    let before = GraphBuilder::new(&provider, &resolver).build(&unit).unwrap();
    assert!(before.is_complete());

    write(
        root,
        "src/config.h",
        "#define PLATFORM_HEADER PLATFORM_PATH(win32)\n#define PLATFORM_PATH(name) <platform/name.h>\n",
    );
    let after = GraphBuilder::new(&provider, &resolver).build(&unit).unwrap();

    assert!(!after.is_complete());
    assert!(!after.headers.contains(&id(root, "include/platform/posix.h")));
}

#[test]
fn test_include_next_reaches_wrapped_header() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "main.c", "#include <stdio.h>\n");
    write(root, "wrap/stdio.h", "#define WRAPPED 1\n#include_next <stdio.h>\n");
    write(root, "sys/stdio.h", "typedef struct file FILE;\n");

    let mut search = SearchPath::new();
    search.add_include_path(root.join("wrap"));
    search.add_system_include_path(root.join("sys"));
    let provider = FileDirectiveProvider::new();
    let resolver = IncludeResolver::new(search);

    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&id(root, "main.c"))
        .unwrap();

    assert!(graph.is_complete(), "issues: {:?}", graph.issues);
    assert!(graph.headers.contains(&id(root, "wrap/stdio.h")));
    assert!(graph.headers.contains(&id(root, "sys/stdio.h")));
    assert!(graph.affected_by(&id(root, "sys/stdio.h")));
}

#[test]
fn test_unparsable_include_is_reported() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "main.c", "#define A \"x.h\"\n#include A B\n");
    write(root, "x.h", "");

    let provider = FileDirectiveProvider::new();
    let resolver = IncludeResolver::new(search(root));
    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&id(root, "main.c"))
        .unwrap();

    assert!(matches!(
        graph.issues[0].problem,
        IssueKind::Unresolved {
            reason: UnresolvedReason::NotAnIncludeTarget(_)
        }
    ));
    assert!(graph.affected_by(&id(root, "x.h")));
}

#[test]
fn test_disabled_malformed_definition_does_not_fail_unit() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "main.c", "#include \"a.h\"\n");
    write(root, "a.h", "#if 0\n#define F(x, x) x\n#endif\n");

    let provider = FileDirectiveProvider::new();
    let resolver = IncludeResolver::new(search(root));
    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&id(root, "main.c"))
        .unwrap();

    assert!(graph.is_complete());
    assert!(graph.headers.contains(&id(root, "a.h")));
}
