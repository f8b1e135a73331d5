//! Call-graph construction and queries.
//!
//! [`CallGraphBuilder`] fills a [`Registry`](crate::registry::Registry) from
//! a source tree in two passes; [`QueryEngine`] answers forward, reverse and
//! bidirectional traversals and call-context listings over the result.

mod builder;
mod query;

pub use builder::{BuildStats, CallGraphBuilder, SkippedFile};
pub use query::{
    CallEntry, CallTree, CallerEntry, ContextFilter, DirectedEdge, Direction, EdgeSummary,
    MemberSummary, NodeStatus, QueryEngine, SearchMode, TraceNode, TraceOptions, TypeSummary,
};
