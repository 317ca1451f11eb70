//! End-to-end tests for the analysis engine

use super::*;
use hdrtrace_core::{Include, IncludeDirectives, IncludeKind};
use hdrtrace_parser::MemoryProvider;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;

fn identity(target: &str, _kind: IncludeKind, _from: &HeaderId) -> Vec<HeaderId> {
    vec![HeaderId::new(target)]
}

fn ids(names: &[&str]) -> BTreeSet<HeaderId> {
    names.iter().map(|n| HeaderId::new(*n)).collect()
}

/// A small project where a platform header is picked through a macro
fn project() -> MemoryProvider {
    let mut provider = MemoryProvider::new();
    provider.insert_source(
        "main.c",
        r#"
#include "config.h"
#include PLATFORM_HEADER
#include "util.h"
"#,
    );
    provider.insert_source(
        "config.h",
        r#"
#define STRINGIFY(x) #x
#define PLATFORM_HEADER "posix.h"
"#,
    );
    provider.insert_source("posix.h", "#include <types.h>\n");
    provider.insert_source("util.h", "#include <types.h>\n#define UTIL_H\n");
    provider.insert_source("types.h", "#define TYPES_H\n");
    provider.insert_source("other.c", "#include \"util.h\"\n");
    provider
}

#[test]
fn test_macro_selected_header_is_a_dependency() {
    let provider = project();
    let resolver = IncludeResolver::new(identity);

    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&HeaderId::new("main.c"))
        .unwrap();

    assert!(graph.is_complete());
    assert_eq!(
        graph.headers,
        ids(&["main.c", "config.h", "posix.h", "util.h", "types.h"])
    );
    assert!(graph.affected_by(&HeaderId::new("posix.h")));
    assert!(!graph.affected_by(&HeaderId::new("other.c")));
}

#[test]
fn test_summaries_give_the_same_graph() {
    let provider = project();
    let resolver = IncludeResolver::new(identity);
    let cache = SummaryCache::new();

    for unit in ["main.c", "other.c"] {
        let unit = HeaderId::new(unit);
        let plain = GraphBuilder::new(&provider, &resolver).build(&unit).unwrap();
        let summarized = GraphBuilder::new(&provider, &resolver)
            .with_summaries(&cache)
            .build(&unit)
            .unwrap();
        assert_eq!(plain, summarized);
    }

    assert!(cache.get(&HeaderId::new("util.h")).is_some());
    assert!(cache.get(&HeaderId::new("types.h")).is_some());
}

#[test]
fn test_summary_macros_stay_visible() {
    // lib.h is context-independent, but the unit uses its macro afterwards
    let provider = MemoryProvider::new()
        .with(
            "main.c",
            IncludeDirectives::builder()
                .include(Include::quoted("lib.h"))
                .include(Include::macro_ref("LIB_IMPL"))
                .build(),
        )
        .with(
            "lib.h",
            IncludeDirectives::builder()
                .include(Include::quoted("lib_config.h"))
                .build(),
        )
        .with(
            "lib_config.h",
            IncludeDirectives::builder()
                .define("LIB_IMPL", "<lib_impl.h>")
                .build(),
        )
        .with("lib_impl.h", IncludeDirectives::default());
    let resolver = IncludeResolver::new(identity);
    let cache = SummaryCache::new();

    let graph = GraphBuilder::new(&provider, &resolver)
        .with_summaries(&cache)
        .build(&HeaderId::new("main.c"))
        .unwrap();

    assert!(graph.is_complete());
    assert!(graph.headers.contains(&HeaderId::new("lib_impl.h")));
}

#[test]
fn test_unit_definitions_reach_dependent_headers() {
    // wrapper.h picks its target from a macro defined by the unit
    let provider = MemoryProvider::new()
        .with(
            "main.c",
            IncludeDirectives::builder()
                .define("BACKEND", "\"gl.h\"")
                .include(Include::quoted("wrapper.h"))
                .build(),
        )
        .with(
            "alt.c",
            IncludeDirectives::builder()
                .define("BACKEND", "\"vk.h\"")
                .include(Include::quoted("wrapper.h"))
                .build(),
        )
        .with(
            "wrapper.h",
            IncludeDirectives::builder()
                .include(Include::macro_ref("BACKEND"))
                .build(),
        )
        .with("gl.h", IncludeDirectives::default())
        .with("vk.h", IncludeDirectives::default());
    let resolver = IncludeResolver::new(identity);
    let cache = Arc::new(SummaryCache::new());
    let analyzer = ParallelAnalyzer::new(provider, resolver).with_summaries(cache.clone());

    let results = analyzer.analyze_units(&[HeaderId::new("main.c"), HeaderId::new("alt.c")]);
    let graphs: Vec<_> = results.into_iter().map(|(_, g)| g.unwrap()).collect();

    assert!(graphs[0].headers.contains(&HeaderId::new("gl.h")));
    assert!(!graphs[0].headers.contains(&HeaderId::new("vk.h")));
    assert!(graphs[1].headers.contains(&HeaderId::new("vk.h")));
    assert!(cache.get(&HeaderId::new("wrapper.h")).is_none());
}

#[test]
fn test_affected_units() {
    let provider = project();
    let resolver = IncludeResolver::new(identity);
    let builder = GraphBuilder::new(&provider, &resolver);
    let graphs = vec![
        builder.build(&HeaderId::new("main.c")).unwrap(),
        builder.build(&HeaderId::new("other.c")).unwrap(),
    ];

    let touched = affected_units(&graphs, &HeaderId::new("posix.h"));
    assert_eq!(touched, vec![&HeaderId::new("main.c")]);

    let touched = affected_units(&graphs, &HeaderId::new("types.h"));
    assert_eq!(touched.len(), 2);
}

#[test]
fn test_incomplete_graph_is_always_affected() {
    let provider = MemoryProvider::new().with(
        "main.c",
        IncludeDirectives::builder()
            .include(Include::macro_call("SELECT", ["arm"]))
            .build(),
    );
    let resolver = IncludeResolver::new(identity);
    let graph = GraphBuilder::new(&provider, &resolver)
        .build(&HeaderId::new("main.c"))
        .unwrap();

    assert!(!graph.is_complete());
    assert_eq!(
        affected_units([&graph], &HeaderId::new("anything.h")),
        vec![&HeaderId::new("main.c")]
    );
}
