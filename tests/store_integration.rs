//! Persistence tests: a built graph survives a save/load cycle, and
//! re-analysis against a loaded graph adds nothing new.

use std::path::PathBuf;

use calltrace::{CallGraphBuilder, Config, QueryEngine, Registry, ResolveOptions, Store, TraceOptions};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn labels(registry: &Registry) -> Vec<String> {
    registry
        .members()
        .iter()
        .map(|m| registry.member_label(m.id))
        .collect()
}

#[test]
fn test_saved_graph_loads_identically() {
    let config = Config::default();
    let dir = TempDir::new().expect("temp dir");
    let db = dir.path().join("nested").join("graph.db");

    let mut built = Registry::new();
    CallGraphBuilder::new(&config)
        .build(&testdata_path().join("shop"), &mut built)
        .expect("build");
    Store::open(&db).expect("open").save(&built).expect("save");
    assert!(db.exists());

    let loaded = Store::open(&db)
        .expect("reopen")
        .load(&ResolveOptions::from_config(&config))
        .expect("load");
    assert_eq!(built.stats(), loaded.stats());
    assert_eq!(labels(&built), labels(&loaded));

    for (a, b) in built.edges().iter().zip(loaded.edges()) {
        assert_eq!(a.caller, b.caller);
        assert_eq!(a.ordinal, b.ordinal);
        assert_eq!(a.line, b.line);
        assert_eq!(a.resolved, b.resolved);
        assert_eq!(a.resolved_type, b.resolved_type);
        assert_eq!(a.context, b.context);
    }
}

#[test]
fn test_reanalysis_over_loaded_graph_adds_no_rows() {
    let config = Config::default();
    let root = testdata_path().join("shop");
    let mut store = Store::open_in_memory().expect("open");

    let mut registry = Registry::new();
    CallGraphBuilder::new(&config)
        .build(&root, &mut registry)
        .expect("first build");
    store.save(&registry).expect("first save");
    let first = store.counts().expect("counts");

    let mut reloaded = store
        .load(&ResolveOptions::from_config(&config))
        .expect("load");
    CallGraphBuilder::new(&config)
        .build(&root, &mut reloaded)
        .expect("second build");
    store.save(&reloaded).expect("second save");

    assert_eq!(first, store.counts().expect("counts"));
    assert_eq!(labels(&registry), labels(&reloaded));
}

#[test]
fn test_queries_on_loaded_graph() {
    let config = Config::default();
    let mut store = Store::open_in_memory().expect("open");
    let mut registry = Registry::new();
    CallGraphBuilder::new(&config)
        .build(&testdata_path().join("shop"), &mut registry)
        .expect("build");
    store.save(&registry).expect("save");

    let loaded = store
        .load(&ResolveOptions::from_config(&config))
        .expect("load");
    let engine = QueryEngine::new(&loaded, &config);
    let run = engine
        .members_of_type("com.example.a.A", false)
        .expect("members")
        .into_iter()
        .find(|m| m.signature == "run()")
        .expect("run()");

    let tree = engine.forward(run.id, TraceOptions::default()).expect("trace");
    let helper = &tree.children[0];
    assert_eq!(helper.edge.line, 15);
    assert_eq!(
        helper.target.as_ref().map(|t| t.owner.as_str()),
        Some("com.example.b.B")
    );

    // Inheritance links are rebuilt on load.
    let inherited = engine.members_of_type("com.example.e.Child", true).expect("members");
    assert!(inherited.iter().any(|m| m.owner == "com.example.e.Base"));
}

#[test]
fn test_reset_clears_the_store() {
    let config = Config::default();
    let mut store = Store::open_in_memory().expect("open");
    let mut registry = Registry::new();
    CallGraphBuilder::new(&config)
        .build(&testdata_path().join("shop"), &mut registry)
        .expect("build");
    store.save(&registry).expect("save");
    assert!(store.counts().expect("counts").edges > 0);

    store.reset().expect("reset");
    let counts = store.counts().expect("counts");
    assert_eq!(counts.types, 0);
    assert_eq!(counts.edges, 0);

    let loaded = store
        .load(&ResolveOptions::from_config(&config))
        .expect("load");
    assert!(loaded.types().is_empty());
}
