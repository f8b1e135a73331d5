//! Query tests over the `testdata/shop` call graph: forward traces,
//! platform filtering, callers and member lookup.

use std::path::PathBuf;

use calltrace::analysis::LoopKind;
use calltrace::graph::{ContextFilter, Direction, NodeStatus, TraceNode};
use calltrace::{CallGraphBuilder, Config, MemberId, QueryEngine, Registry, SearchMode, TraceOptions};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn build_shop(config: &Config) -> Registry {
    let mut registry = Registry::new();
    CallGraphBuilder::new(config)
        .build(&testdata_path().join("shop"), &mut registry)
        .expect("build should succeed");
    registry
}

fn member(registry: &Registry, label: &str) -> MemberId {
    registry
        .members()
        .iter()
        .map(|m| m.id)
        .find(|&id| registry.member_label(id) == label)
        .unwrap_or_else(|| panic!("no member {}", label))
}

fn called_names(nodes: &[&TraceNode]) -> Vec<String> {
    nodes.iter().map(|n| n.edge.called_name.clone()).collect()
}

#[test]
fn test_forward_trace_expands_resolved_calls() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    let tree = engine
        .forward(member(&registry, "com.example.a.A.run()"), TraceOptions::default())
        .expect("trace");
    assert_eq!(tree.root.signature, "run()");
    assert_eq!(tree.root.owner, "com.example.a.A");

    let top: Vec<&TraceNode> = tree.children.iter().collect();
    assert_eq!(called_names(&top), vec!["helper", "add", "log"]);
    assert_eq!(top[0].status, NodeStatus::Expanded);
    assert_eq!(top[1].status, NodeStatus::Unresolved);
    assert_eq!(top[2].status, NodeStatus::Expanded);

    let all = tree.nodes();
    assert_eq!(
        called_names(&all),
        vec!["helper", "<init>", "demo", "print", "print", "print", "add", "log", "info"]
    );
}

#[test]
fn test_cycle_terminates_with_each_member_once() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);
    let ping = member(&registry, "com.example.c.Ping.ping(int)");
    let pong = member(&registry, "com.example.c.Pong.pong(int)");

    let tree = engine.forward(ping, TraceOptions::default()).expect("trace");
    let nodes = tree.nodes();
    assert_eq!(nodes.len(), 2);

    let into_pong: Vec<_> = nodes
        .iter()
        .filter(|n| n.target.as_ref().map(|t| t.id) == Some(pong))
        .collect();
    assert_eq!(into_pong.len(), 1);
    assert_eq!(into_pong[0].status, NodeStatus::Expanded);

    assert_eq!(nodes[1].target.as_ref().map(|t| t.id), Some(ping));
    assert_eq!(nodes[1].status, NodeStatus::Cycle);
    assert!(nodes[1].children.is_empty());
}

#[test]
fn test_depth_limit_stops_expansion() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    let options = TraceOptions {
        max_depth: 1,
        ..TraceOptions::default()
    };
    let tree = engine
        .forward(member(&registry, "com.example.a.A.run()"), options)
        .expect("trace");
    let statuses: Vec<NodeStatus> = tree.children.iter().map(|n| n.status).collect();
    assert_eq!(
        statuses,
        vec![NodeStatus::DepthLimited, NodeStatus::Unresolved, NodeStatus::DepthLimited]
    );
    assert_eq!(tree.nodes().len(), 3);
}

#[test]
fn test_platform_filter_drops_platform_edges() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);
    let run = member(&registry, "com.example.a.A.run()");

    let all = engine.forward(run, TraceOptions::default()).expect("trace");
    let user = engine
        .forward(
            run,
            TraceOptions {
                exclude_platform: true,
                ..TraceOptions::default()
            },
        )
        .expect("trace");

    assert!(called_names(&all.nodes()).contains(&"add".to_string()));
    assert!(!called_names(&user.nodes()).contains(&"add".to_string()));
    assert_eq!(user.nodes().len(), all.nodes().len() - 1);
}

#[test]
fn test_platform_filter_drops_resolved_edges_under_custom_prefix() {
    let mut config = Config::default();
    config.platform_prefixes.push("com.example.vendor.".to_string());
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);
    let log = member(&registry, "com.example.a.A.log(String)");

    let all = engine.forward(log, TraceOptions::default()).expect("trace");
    assert_eq!(all.children.len(), 1);
    let info = all.children[0].target.as_ref().expect("resolved");
    assert_eq!(info.owner, "com.example.vendor.Logger");

    let user = engine
        .forward(
            log,
            TraceOptions {
                exclude_platform: true,
                ..TraceOptions::default()
            },
        )
        .expect("trace");
    assert!(user.children.is_empty());
}

#[test]
fn test_callers_direct_and_recursive() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);
    let demo = member(&registry, "com.example.b.Printer.demo()");

    let direct = engine.callers(demo, false).expect("callers");
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].caller.signature, "helper()");
    assert_eq!(direct[0].edge.line, 6);

    let recursive = engine.callers(demo, true).expect("callers");
    let chain: Vec<(String, usize)> = recursive
        .iter()
        .map(|e| (format!("{}.{}", e.caller.owner, e.caller.signature), e.depth))
        .collect();
    assert_eq!(
        chain,
        vec![
            ("com.example.b.B.helper()".to_string(), 1),
            ("com.example.a.A.run()".to_string(), 2),
        ]
    );
}

#[test]
fn test_callers_of_cycle_terminate() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    let callers = engine
        .callers(member(&registry, "com.example.c.Ping.ping(int)"), true)
        .expect("callers");
    let signatures: Vec<&str> = callers.iter().map(|e| e.caller.signature.as_str()).collect();
    assert_eq!(signatures, vec!["pong(int)", "ping(int)"]);
}

#[test]
fn test_bidirectional_lists_both_directions() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    let edges = engine
        .bidirectional(member(&registry, "com.example.b.B.helper()"), TraceOptions::default())
        .expect("bidi");
    let outgoing = edges.iter().filter(|e| e.direction == Direction::Outgoing).count();
    let incoming: Vec<_> = edges
        .iter()
        .filter(|e| e.direction == Direction::Incoming)
        .collect();
    assert_eq!(outgoing, 5);
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].caller.signature, "run()");
    assert_eq!(incoming[0].depth, 1);
}

#[test]
fn test_type_and_member_listing() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    let types = engine.list_types();
    assert_eq!(types.len(), 15);
    assert_eq!(types[0].qualified_name, "com.example.a.A");
    let child = types
        .iter()
        .find(|t| t.qualified_name == "com.example.e.Child")
        .expect("Child listed");
    assert_eq!(child.superclass.as_deref(), Some("Base"));

    let own = engine.members_of_type("com.example.b.B", false).expect("members");
    let signatures: Vec<&str> = own.iter().map(|m| m.signature.as_str()).collect();
    assert_eq!(signatures, vec!["helper()"]);

    let inherited = engine.members_of_type("Child", true).expect("members");
    assert!(inherited.iter().any(|m| m.signature == "describe()"));
    assert!(engine.members_of_type("Missing", false).is_err());

    // Both Widget types exist; the simple name picks the first declared.
    let widgets = engine.members_of_type("Widget", false).expect("members");
    assert_eq!(widgets.len(), 1);
}

#[test]
fn test_search_members() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    let found = engine.search_members("PRINT", SearchMode::Substring).expect("search");
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|m| m.owner == "com.example.b.Printer"));

    let found = engine
        .search_members(r"^accept\(", SearchMode::Regex)
        .expect("search");
    let signatures: Vec<&str> = found.iter().map(|m| m.signature.as_str()).collect();
    assert_eq!(signatures, vec!["accept(Integer)", "accept(Number)"]);

    assert!(engine.search_members("(", SearchMode::Regex).is_err());
    assert!(engine.search_members("nothing-like-this", SearchMode::Substring).expect("search").is_empty());
}

fn context_lines(engine: &QueryEngine<'_>, filters: &[ContextFilter], caller: Option<MemberId>) -> Vec<u32> {
    engine
        .calls_in_context(filters, caller)
        .expect("context query")
        .iter()
        .map(|c| c.edge.line)
        .collect()
}

#[test]
fn test_calls_in_try_catch_and_finally() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    // Try covers the try block, catch clauses and finally block.
    assert_eq!(context_lines(&engine, &[ContextFilter::Try], None), vec![16, 18, 40, 42]);
    assert_eq!(context_lines(&engine, &[ContextFilter::Catch], None), vec![18]);
    assert_eq!(context_lines(&engine, &[ContextFilter::Finally], None), vec![42]);

    let fire = member(&registry, "com.example.f.Events.fire()");
    assert_eq!(context_lines(&engine, &[ContextFilter::Try], Some(fire)), vec![16, 18]);

    let caught = engine
        .calls_in_context(&[ContextFilter::Catch], None)
        .expect("context query");
    assert_eq!(caught[0].caller.signature, "fire()");
    assert_eq!(
        caught[0].target.as_ref().map(|t| t.signature.as_str()),
        Some("reset()")
    );
}

#[test]
fn test_calls_in_loops() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    assert_eq!(context_lines(&engine, &[ContextFilter::Loop], None), vec![31, 34, 36, 37]);
    assert_eq!(
        context_lines(&engine, &[ContextFilter::LoopKind(LoopKind::For)], None),
        vec![31]
    );
    assert_eq!(
        context_lines(&engine, &[ContextFilter::LoopKind(LoopKind::Foreach)], None),
        vec![34]
    );
    assert_eq!(
        context_lines(&engine, &[ContextFilter::LoopKind(LoopKind::While)], None),
        vec![36, 37]
    );
    assert!(context_lines(&engine, &[ContextFilter::LoopKind(LoopKind::Do)], None).is_empty());
}

#[test]
fn test_calls_in_conditionals_and_lambdas() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    let branched = engine
        .calls_in_context(&[ContextFilter::Conditional], None)
        .expect("context query");
    assert_eq!(branched.len(), 1);
    assert_eq!(branched[0].caller.signature, "ping(int)");
    assert_eq!(branched[0].edge.line, 9);

    let lambdas = engine
        .calls_in_context(&[ContextFilter::Lambda], None)
        .expect("context query");
    assert_eq!(lambdas.len(), 1);
    assert_eq!(lambdas[0].edge.called_name, "dispatch");
    assert_eq!(lambdas[0].edge.line, 13);
}

#[test]
fn test_context_filters_combine() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);
    let drain = member(&registry, "com.example.f.Events.drain(List)");

    let all = engine.calls_in_context(&[], None).expect("context query");
    assert_eq!(all.len(), registry.edges().len());
    assert_eq!(context_lines(&engine, &[], Some(drain)), vec![31, 34, 36, 37, 40, 42]);

    assert_eq!(
        context_lines(&engine, &[ContextFilter::Loop, ContextFilter::LoopKind(LoopKind::While)], None),
        vec![36, 37]
    );
    assert_eq!(
        context_lines(&engine, &[ContextFilter::Try, ContextFilter::Finally], Some(drain)),
        vec![42]
    );
    assert!(context_lines(&engine, &[ContextFilter::Loop, ContextFilter::Try], None).is_empty());
}

#[test]
fn test_unknown_member_is_an_error() {
    let config = Config::default();
    let registry = build_shop(&config);
    let engine = QueryEngine::new(&registry, &config);

    let bogus = MemberId(registry.members().len() as u32 + 10);
    assert!(engine.forward(bogus, TraceOptions::default()).is_err());
    assert!(engine.callers(bogus, false).is_err());
    assert!(engine.member(bogus).is_err());
    assert!(engine.calls_in_context(&[], Some(bogus)).is_err());
}
