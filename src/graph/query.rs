//! Read-only traversals over a finished call graph.

use std::collections::{HashSet, VecDeque};

use regex::Regex;
use serde::Serialize;

use crate::analysis::{CallContext, CallKind, LoopKind};
use crate::config::{is_platform_package, Config};
use crate::error::QueryError;
use crate::registry::{CallEdge, EdgeId, MemberId, Registry, TypeId};

/// Options for forward traversals.
#[derive(Debug, Clone, Copy)]
pub struct TraceOptions {
    /// Drop edges into platform packages.
    pub exclude_platform: bool,
    /// Depth at which expansion stops.
    pub max_depth: usize,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            exclude_platform: false,
            max_depth: 64,
        }
    }
}

/// How member search patterns are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Case-insensitive substring of the name or signature.
    Substring,
    Regex,
}

/// Syntactic context a call site must sit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFilter {
    /// In a try block, a catch clause or a finally block.
    Try,
    Catch,
    Finally,
    /// In any loop.
    Loop,
    /// In a loop of this kind.
    LoopKind(LoopKind),
    /// In any branch of an if, switch or ternary.
    Conditional,
    Lambda,
}

impl ContextFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "try" => Some(ContextFilter::Try),
            "catch" => Some(ContextFilter::Catch),
            "finally" => Some(ContextFilter::Finally),
            "loop" => Some(ContextFilter::Loop),
            "conditional" => Some(ContextFilter::Conditional),
            "lambda" => Some(ContextFilter::Lambda),
            other => LoopKind::parse(other).map(ContextFilter::LoopKind),
        }
    }

    pub fn matches(self, ctx: &CallContext) -> bool {
        match self {
            ContextFilter::Try => ctx.in_try || ctx.in_catch || ctx.in_finally,
            ContextFilter::Catch => ctx.in_catch,
            ContextFilter::Finally => ctx.in_finally,
            ContextFilter::Loop => ctx.loop_kind.is_some(),
            ContextFilter::LoopKind(kind) => ctx.loop_kind == Some(kind),
            ContextFilter::Conditional => ctx.conditional.is_some(),
            ContextFilter::Lambda => ctx.in_lambda,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeSummary {
    pub id: TypeId,
    pub name: String,
    pub package: Option<String>,
    pub qualified_name: String,
    pub location: String,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub superclass: Option<String>,
    pub member_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub id: MemberId,
    /// Fully-qualified owning type.
    pub owner: String,
    pub name: String,
    pub signature: String,
    pub return_type: String,
    pub is_static: bool,
    pub is_public: bool,
    pub location: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeSummary {
    pub id: EdgeId,
    pub kind: CallKind,
    pub called_type_hint: Option<String>,
    pub called_name: String,
    pub called_signature_hint: Option<String>,
    pub line: u32,
    pub resolved_type: Option<String>,
    pub context: CallContext,
}

/// State of one node in a forward trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Target resolved and its calls listed below.
    Expanded,
    /// Target already on the current path; not expanded again.
    Cycle,
    /// Target not expanded because the depth limit was reached.
    DepthLimited,
    /// No target member was resolved.
    Unresolved,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceNode {
    pub edge: EdgeSummary,
    pub target: Option<MemberSummary>,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TraceNode>,
}

/// Forward call trace rooted at one member.
#[derive(Debug, Clone, Serialize)]
pub struct CallTree {
    pub root: MemberSummary,
    pub children: Vec<TraceNode>,
}

impl CallTree {
    /// Every node, depth first.
    pub fn nodes(&self) -> Vec<&TraceNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&TraceNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallerEntry {
    pub caller: MemberSummary,
    pub edge: EdgeSummary,
    /// 1 for direct callers.
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectedEdge {
    pub direction: Direction,
    pub depth: usize,
    pub caller: MemberSummary,
    pub edge: EdgeSummary,
    pub target: Option<MemberSummary>,
}

/// One call site with its caller, as listed by a context query.
#[derive(Debug, Clone, Serialize)]
pub struct CallEntry {
    pub caller: MemberSummary,
    pub edge: EdgeSummary,
    pub target: Option<MemberSummary>,
}

/// Serves queries against a registry that is no longer being written.
pub struct QueryEngine<'r> {
    registry: &'r Registry,
    platform_prefixes: Vec<String>,
}

impl<'r> QueryEngine<'r> {
    pub fn new(registry: &'r Registry, config: &Config) -> Self {
        Self {
            registry,
            platform_prefixes: config.platform_prefixes.clone(),
        }
    }

    /// All types, sorted by qualified name.
    pub fn list_types(&self) -> Vec<TypeSummary> {
        let mut types: Vec<TypeSummary> = self
            .registry
            .types()
            .iter()
            .map(|t| TypeSummary {
                id: t.id,
                name: t.name.clone(),
                package: t.package.clone(),
                qualified_name: t.qualified_name(),
                location: t.location.clone(),
                is_interface: t.is_interface,
                is_abstract: t.is_abstract,
                superclass: t.superclass.clone(),
                member_count: self.registry.declared_members(t.id).len(),
            })
            .collect();
        types.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        types
    }

    /// Summary of one member.
    pub fn member(&self, id: MemberId) -> Result<MemberSummary, QueryError> {
        self.check_member(id)?;
        Ok(self.member_summary(id))
    }

    /// Members of a type given by qualified or simple name.
    pub fn members_of_type(
        &self,
        type_name: &str,
        including_inherited: bool,
    ) -> Result<Vec<MemberSummary>, QueryError> {
        let owner = self
            .registry
            .lookup_qualified(type_name)
            .or_else(|| self.registry.types_named(type_name).first().copied())
            .ok_or_else(|| QueryError::UnknownType(type_name.to_string()))?;
        Ok(self
            .registry
            .members_of(owner, including_inherited)
            .into_iter()
            .map(|m| self.member_summary(m))
            .collect())
    }

    /// Members whose name or signature matches `pattern`, in declaration
    /// order.
    pub fn search_members(&self, pattern: &str, mode: SearchMode) -> Result<Vec<MemberSummary>, QueryError> {
        let matches: Box<dyn Fn(&str) -> bool> = match mode {
            SearchMode::Substring => {
                let needle = pattern.to_lowercase();
                Box::new(move |text: &str| text.to_lowercase().contains(&needle))
            }
            SearchMode::Regex => {
                let re = Regex::new(pattern)?;
                Box::new(move |text: &str| re.is_match(text))
            }
        };
        Ok(self
            .registry
            .members()
            .iter()
            .filter(|m| matches(&m.name) || matches(&m.signature))
            .map(|m| self.member_summary(m.id))
            .collect())
    }

    /// Everything `member` calls, recursively. Cycles on the current path
    /// are cut rather than followed.
    pub fn forward(&self, member: MemberId, options: TraceOptions) -> Result<CallTree, QueryError> {
        self.check_member(member)?;
        let mut path = HashSet::from([member]);
        let children = self.expand(member, 1, options, &mut path);
        Ok(CallTree {
            root: self.member_summary(member),
            children,
        })
    }

    fn expand(
        &self,
        member: MemberId,
        depth: usize,
        options: TraceOptions,
        path: &mut HashSet<MemberId>,
    ) -> Vec<TraceNode> {
        let mut nodes = Vec::new();
        for &edge_id in self.registry.edges_from(member) {
            let edge = self.registry.edge(edge_id);
            if options.exclude_platform && self.is_platform_edge(edge) {
                continue;
            }
            let Some(target) = edge.resolved else {
                nodes.push(TraceNode {
                    edge: self.edge_summary(edge_id),
                    target: None,
                    status: NodeStatus::Unresolved,
                    children: Vec::new(),
                });
                continue;
            };

            let (status, children) = if path.contains(&target) {
                (NodeStatus::Cycle, Vec::new())
            } else if depth >= options.max_depth && !self.registry.edges_from(target).is_empty() {
                (NodeStatus::DepthLimited, Vec::new())
            } else {
                path.insert(target);
                let children = self.expand(target, depth + 1, options, path);
                path.remove(&target);
                (NodeStatus::Expanded, children)
            };
            nodes.push(TraceNode {
                edge: self.edge_summary(edge_id),
                target: Some(self.member_summary(target)),
                status,
                children,
            });
        }
        nodes
    }

    /// Members whose calls resolve to `member`. Recursive mode walks up
    /// breadth first, reporting each caller once.
    pub fn callers(&self, member: MemberId, recursive: bool) -> Result<Vec<CallerEntry>, QueryError> {
        self.check_member(member)?;
        let mut entries = Vec::new();
        let mut visited = HashSet::from([member]);
        let mut queue = VecDeque::from([(member, 1usize)]);
        while let Some((target, depth)) = queue.pop_front() {
            for &edge_id in self.registry.callers_of(target) {
                let caller = self.registry.edge(edge_id).caller;
                entries.push(CallerEntry {
                    caller: self.member_summary(caller),
                    edge: self.edge_summary(edge_id),
                    depth,
                });
                if recursive && visited.insert(caller) {
                    queue.push_back((caller, depth + 1));
                }
            }
        }
        Ok(entries)
    }

    /// Outgoing edges (depth first, each member expanded once) followed by
    /// incoming edges (recursive callers), each tagged with its direction.
    pub fn bidirectional(&self, member: MemberId, options: TraceOptions) -> Result<Vec<DirectedEdge>, QueryError> {
        self.check_member(member)?;
        let mut out = Vec::new();
        let mut expanded = HashSet::from([member]);
        self.outgoing(member, 1, options, &mut expanded, &mut out);

        for entry in self.callers(member, true)? {
            out.push(DirectedEdge {
                direction: Direction::Incoming,
                depth: entry.depth,
                target: self
                    .registry
                    .edge(entry.edge.id)
                    .resolved
                    .map(|t| self.member_summary(t)),
                caller: entry.caller,
                edge: entry.edge,
            });
        }
        Ok(out)
    }

    fn outgoing(
        &self,
        member: MemberId,
        depth: usize,
        options: TraceOptions,
        expanded: &mut HashSet<MemberId>,
        out: &mut Vec<DirectedEdge>,
    ) {
        for &edge_id in self.registry.edges_from(member) {
            let edge = self.registry.edge(edge_id);
            if options.exclude_platform && self.is_platform_edge(edge) {
                continue;
            }
            out.push(DirectedEdge {
                direction: Direction::Outgoing,
                depth,
                caller: self.member_summary(member),
                edge: self.edge_summary(edge_id),
                target: edge.resolved.map(|t| self.member_summary(t)),
            });
            if let Some(target) = edge.resolved {
                if depth < options.max_depth && expanded.insert(target) {
                    self.outgoing(target, depth + 1, options, expanded, out);
                }
            }
        }
    }

    /// Call sites whose context matches every filter, by caller then source
    /// order. `caller` restricts the listing to one member's body; no
    /// filters lists every call.
    pub fn calls_in_context(
        &self,
        filters: &[ContextFilter],
        caller: Option<MemberId>,
    ) -> Result<Vec<CallEntry>, QueryError> {
        let callers: Vec<MemberId> = match caller {
            Some(member) => {
                self.check_member(member)?;
                vec![member]
            }
            None => self.registry.members().iter().map(|m| m.id).collect(),
        };

        let mut entries = Vec::new();
        for member in callers {
            for &edge_id in self.registry.edges_from(member) {
                let edge = self.registry.edge(edge_id);
                if !filters.iter().all(|f| f.matches(&edge.context)) {
                    continue;
                }
                entries.push(CallEntry {
                    caller: self.member_summary(member),
                    edge: self.edge_summary(edge_id),
                    target: edge.resolved.map(|t| self.member_summary(t)),
                });
            }
        }
        Ok(entries)
    }

    /// Whether an edge leads into platform code: the resolved member's
    /// package, or else the resolved target type's package, has a platform
    /// prefix.
    pub fn is_platform_edge(&self, edge: &CallEdge) -> bool {
        if let Some(target) = edge.resolved {
            let owner = self.registry.member(target).owner;
            let package = self.registry.type_record(owner).package.as_deref().unwrap_or("");
            return is_platform_package(&self.platform_prefixes, package);
        }
        edge.resolved_type
            .as_deref()
            .and_then(|fqn| fqn.rsplit_once('.'))
            .map(|(package, _)| is_platform_package(&self.platform_prefixes, package))
            .unwrap_or(false)
    }

    fn check_member(&self, member: MemberId) -> Result<(), QueryError> {
        match self.registry.get_member(member) {
            Some(_) => Ok(()),
            None => Err(QueryError::UnknownMember(member)),
        }
    }

    fn member_summary(&self, id: MemberId) -> MemberSummary {
        let member = self.registry.member(id);
        let owner = self.registry.type_record(member.owner);
        MemberSummary {
            id,
            owner: owner.qualified_name(),
            name: member.name.clone(),
            signature: member.signature.clone(),
            return_type: member.return_type.clone(),
            is_static: member.is_static,
            is_public: member.is_public,
            location: owner.location.clone(),
            line: member.span.start,
        }
    }

    fn edge_summary(&self, id: EdgeId) -> EdgeSummary {
        let edge = self.registry.edge(id);
        EdgeSummary {
            id,
            kind: edge.kind,
            called_type_hint: edge.called_type_hint.clone(),
            called_name: edge.called_name.clone(),
            called_signature_hint: edge.called_signature_hint.clone(),
            line: edge.line,
            resolved_type: edge.resolved_type.clone(),
            context: edge.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ConditionalKind, LineSpan};
    use crate::registry::{EdgeSpec, MemberSpec, TypeSpec};

    struct Graph {
        reg: Registry,
    }

    impl Graph {
        fn new() -> Self {
            Self { reg: Registry::new() }
        }

        fn class(&mut self, name: &str, package: &str) -> TypeId {
            self.reg.declare_type(TypeSpec {
                name: name.to_string(),
                package: Some(package.to_string()),
                location: format!("{}.java", name),
                ..Default::default()
            })
        }

        fn method(&mut self, owner: TypeId, name: &str) -> MemberId {
            self.reg.declare_member(
                owner,
                MemberSpec {
                    name: name.to_string(),
                    return_type: "void".to_string(),
                    span: LineSpan { start: 1, end: 3 },
                    ..Default::default()
                },
            )
        }

        /// Record an edge, resolved when `to` is given.
        fn call(&mut self, from: MemberId, to: Option<MemberId>, name: &str, resolved_type: Option<&str>) -> EdgeId {
            let ordinal = self.reg.edges_from(from).len() as u32;
            let id = self.reg.record_call(
                from,
                ordinal,
                EdgeSpec {
                    kind: CallKind::Invocation,
                    called_type_hint: None,
                    called_name: name.to_string(),
                    called_signature_hint: Some(format!("{}()", name)),
                    line: 10 + ordinal,
                    context: CallContext::default(),
                },
            );
            if let Some(fqn) = resolved_type {
                self.reg.set_resolved_type(id, fqn);
            }
            if let Some(target) = to {
                self.reg.set_resolved(id, target);
            }
            id
        }

        fn engine(&self) -> QueryEngine<'_> {
            QueryEngine::new(&self.reg, &Config::default())
        }
    }

    #[test]
    fn test_cycle_terminates_and_visits_once() {
        let mut g = Graph::new();
        let t = g.class("T", "app");
        let a = g.method(t, "a");
        let b = g.method(t, "b");
        g.call(a, Some(b), "b", None);
        g.call(b, Some(a), "a", None);

        let tree = g.engine().forward(a, TraceOptions::default()).unwrap();
        let nodes = tree.nodes();
        assert_eq!(nodes.len(), 2);
        let b_nodes: Vec<_> = nodes
            .iter()
            .filter(|n| n.target.as_ref().map(|m| m.id) == Some(b))
            .collect();
        assert_eq!(b_nodes.len(), 1);
        assert_eq!(b_nodes[0].status, NodeStatus::Expanded);
        assert_eq!(nodes[1].status, NodeStatus::Cycle);
        assert_eq!(nodes[1].target.as_ref().unwrap().id, a);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut g = Graph::new();
        let t = g.class("T", "app");
        let top = g.method(t, "top");
        let left = g.method(t, "left");
        let right = g.method(t, "right");
        let bottom = g.method(t, "bottom");
        g.call(top, Some(left), "left", None);
        g.call(top, Some(right), "right", None);
        g.call(left, Some(bottom), "bottom", None);
        g.call(right, Some(bottom), "bottom", None);

        let tree = g.engine().forward(top, TraceOptions::default()).unwrap();
        assert!(tree.nodes().iter().all(|n| n.status == NodeStatus::Expanded));
        assert_eq!(tree.nodes().len(), 4);
    }

    #[test]
    fn test_depth_limit() {
        let mut g = Graph::new();
        let t = g.class("T", "app");
        let m1 = g.method(t, "m1");
        let m2 = g.method(t, "m2");
        let m3 = g.method(t, "m3");
        let m4 = g.method(t, "m4");
        g.call(m1, Some(m2), "m2", None);
        g.call(m2, Some(m3), "m3", None);
        g.call(m3, Some(m4), "m4", None);

        let options = TraceOptions {
            max_depth: 2,
            ..Default::default()
        };
        let tree = g.engine().forward(m1, options).unwrap();
        let statuses: Vec<_> = tree.nodes().iter().map(|n| n.status).collect();
        assert_eq!(statuses, vec![NodeStatus::Expanded, NodeStatus::DepthLimited]);
    }

    #[test]
    fn test_platform_filter() {
        let mut g = Graph::new();
        let app = g.class("Main", "app");
        let list = g.class("ArrayList", "java.util");
        let run = g.method(app, "run");
        let add = g.method(list, "add");
        let helper = g.method(app, "helper");
        g.call(run, Some(add), "add", Some("java.util.ArrayList"));
        g.call(run, Some(helper), "helper", Some("app.Main"));
        g.call(run, None, "println", Some("java.io.PrintStream"));

        let engine = g.engine();
        let all = engine.forward(run, TraceOptions::default()).unwrap();
        assert_eq!(all.children.len(), 3);

        let user = engine
            .forward(
                run,
                TraceOptions {
                    exclude_platform: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let names: Vec<_> = user.children.iter().map(|n| n.edge.called_name.as_str()).collect();
        assert_eq!(names, vec!["helper"]);
    }

    #[test]
    fn test_callers_direct_and_recursive() {
        let mut g = Graph::new();
        let t = g.class("T", "app");
        let a = g.method(t, "a");
        let b = g.method(t, "b");
        let c = g.method(t, "c");
        g.call(a, Some(b), "b", None);
        g.call(b, Some(c), "c", None);
        g.call(c, Some(b), "b", None);

        let engine = g.engine();
        let direct = engine.callers(c, false).unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].caller.id, b);

        let all = engine.callers(c, true).unwrap();
        let seen: Vec<_> = all.iter().map(|e| (e.caller.id, e.depth)).collect();
        assert_eq!(seen, vec![(b, 1), (a, 2), (c, 2)]);
    }

    #[test]
    fn test_bidirectional_tags_directions() {
        let mut g = Graph::new();
        let t = g.class("T", "app");
        let a = g.method(t, "a");
        let b = g.method(t, "b");
        let c = g.method(t, "c");
        g.call(a, Some(b), "b", None);
        g.call(b, Some(c), "c", None);

        let edges = g.engine().bidirectional(b, TraceOptions::default()).unwrap();
        let tagged: Vec<_> = edges.iter().map(|e| (e.direction, e.caller.id)).collect();
        assert_eq!(tagged, vec![(Direction::Outgoing, b), (Direction::Incoming, a)]);
    }

    #[test]
    fn test_listing_and_search() {
        let mut g = Graph::new();
        let b = g.class("B", "app");
        let a = g.class("A", "app");
        g.method(a, "processOrder");
        g.method(b, "process");
        g.method(b, "other");

        let engine = g.engine();
        let names: Vec<_> = engine.list_types().into_iter().map(|t| t.qualified_name).collect();
        assert_eq!(names, vec!["app.A", "app.B"]);

        assert_eq!(engine.members_of_type("app.B", false).unwrap().len(), 2);
        assert_eq!(engine.members_of_type("A", false).unwrap().len(), 1);
        assert!(matches!(
            engine.members_of_type("Nope", false),
            Err(QueryError::UnknownType(_))
        ));

        assert_eq!(engine.search_members("PROCESS", SearchMode::Substring).unwrap().len(), 2);
        assert_eq!(engine.search_members("^process\\(", SearchMode::Regex).unwrap().len(), 1);
        assert!(matches!(
            engine.search_members("(", SearchMode::Regex),
            Err(QueryError::Pattern(_))
        ));
    }

    #[test]
    fn test_context_filters() {
        let in_finally = CallContext {
            in_finally: true,
            ..Default::default()
        };
        let in_while = CallContext {
            loop_kind: Some(LoopKind::While),
            conditional: Some(ConditionalKind::Switch),
            ..Default::default()
        };
        assert!(ContextFilter::Try.matches(&in_finally));
        assert!(!ContextFilter::Catch.matches(&in_finally));
        assert!(ContextFilter::Loop.matches(&in_while));
        assert!(ContextFilter::LoopKind(LoopKind::While).matches(&in_while));
        assert!(!ContextFilter::LoopKind(LoopKind::For).matches(&in_while));
        assert!(ContextFilter::Conditional.matches(&in_while));
        assert!(!ContextFilter::Lambda.matches(&in_while));
        assert!(!ContextFilter::Try.matches(&CallContext::default()));

        assert_eq!(ContextFilter::parse("try"), Some(ContextFilter::Try));
        assert_eq!(ContextFilter::parse("do"), Some(ContextFilter::LoopKind(LoopKind::Do)));
        assert_eq!(ContextFilter::parse("foreach"), Some(ContextFilter::LoopKind(LoopKind::Foreach)));
        assert_eq!(ContextFilter::parse("lambda"), Some(ContextFilter::Lambda));
        assert_eq!(ContextFilter::parse("goto"), None);
    }

    #[test]
    fn test_calls_in_context() {
        let mut g = Graph::new();
        let t = g.class("T", "app");
        let a = g.method(t, "a");
        let b = g.method(t, "b");
        let plain = g.call(a, Some(b), "b", None);
        let looped = g.reg.record_call(
            a,
            1,
            EdgeSpec {
                kind: CallKind::Invocation,
                called_type_hint: None,
                called_name: "c".to_string(),
                called_signature_hint: None,
                line: 12,
                context: CallContext {
                    in_catch: true,
                    loop_kind: Some(LoopKind::For),
                    ..Default::default()
                },
            },
        );
        g.reg.record_call(
            b,
            0,
            EdgeSpec {
                kind: CallKind::Invocation,
                called_type_hint: None,
                called_name: "d".to_string(),
                called_signature_hint: None,
                line: 20,
                context: CallContext {
                    loop_kind: Some(LoopKind::While),
                    ..Default::default()
                },
            },
        );

        let engine = g.engine();
        let ids = |filters: &[ContextFilter], caller: Option<MemberId>| -> Vec<EdgeId> {
            engine
                .calls_in_context(filters, caller)
                .unwrap()
                .iter()
                .map(|e| e.edge.id)
                .collect()
        };
        assert_eq!(ids(&[], None).len(), 3);
        assert_eq!(ids(&[], Some(a)), vec![plain, looped]);
        assert_eq!(ids(&[ContextFilter::Try], None), vec![looped]);
        assert_eq!(ids(&[ContextFilter::Loop], None).len(), 2);
        assert_eq!(ids(&[ContextFilter::Loop], Some(b)).len(), 1);
        assert_eq!(ids(&[ContextFilter::Loop, ContextFilter::Catch], None), vec![looped]);
        assert!(ids(&[ContextFilter::Catch, ContextFilter::LoopKind(LoopKind::While)], None).is_empty());

        let entries = engine.calls_in_context(&[], Some(a)).unwrap();
        assert_eq!(entries[0].caller.id, a);
        assert_eq!(entries[0].target.as_ref().map(|m| m.id), Some(b));
        assert!(entries[1].target.is_none());
        assert!(engine.calls_in_context(&[], Some(MemberId(40))).is_err());
    }

    #[test]
    fn test_unknown_member() {
        let g = Graph::new();
        let err = g.engine().forward(MemberId(7), TraceOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "unknown member id 8");
    }
}
