//! Output formatting for calltrace results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output (trees for traces, tables for listings)
//! - JSON: the serialized result structs wrapped in a versioned envelope

use std::fmt::Write as _;

use colored::*;
use serde::Serialize;

use crate::analysis::CallContext;
use crate::graph::{
    BuildStats, CallEntry, CallTree, CallerEntry, DirectedEdge, Direction, EdgeSummary,
    MemberSummary, NodeStatus, TraceNode, TypeSummary,
};

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pretty" => Some(Format::Pretty),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// Envelope around every JSON result.
#[derive(Serialize)]
pub struct JsonReport<'a, T: Serialize> {
    pub version: &'static str,
    pub command: &'a str,
    pub result: &'a T,
}

pub fn render_json<T: Serialize>(command: &str, result: &T) -> anyhow::Result<String> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        command,
        result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn write_json<T: Serialize>(command: &str, result: &T) -> anyhow::Result<()> {
    println!("{}", render_json(command, result)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn member_label(m: &MemberSummary) -> String {
    format!("{}.{}", m.owner, m.signature)
}

fn write_member_line(out: &mut String, m: &MemberSummary) {
    let _ = writeln!(
        out,
        "  {} {}  {}",
        format!("[{}]", m.id).dimmed(),
        member_label(m).bold(),
        format!("{}:{}", m.location, m.line).blue()
    );
}

/// Short syntactic context tags, e.g. `[try, foreach]`.
fn context_tags(ctx: &CallContext) -> Option<String> {
    let mut tags = Vec::new();
    if ctx.in_try {
        tags.push("try");
    }
    if ctx.in_catch {
        tags.push("catch");
    }
    if ctx.in_finally {
        tags.push("finally");
    }
    if let Some(kind) = ctx.loop_kind {
        tags.push(kind.as_str());
    }
    if let Some(kind) = ctx.conditional {
        tags.push(kind.as_str());
    }
    if ctx.in_lambda {
        tags.push("lambda");
    }
    (!tags.is_empty()).then(|| format!("[{}]", tags.join(", ")))
}

fn call_text(edge: &EdgeSummary) -> String {
    let called = edge
        .called_signature_hint
        .clone()
        .unwrap_or_else(|| format!("::{}", edge.called_name));
    match &edge.called_type_hint {
        Some(qualifier) => format!("{}.{}", qualifier, called),
        None => called,
    }
}

fn edge_suffix(edge: &EdgeSummary) -> String {
    let mut suffix = format!("  {}", format!("line {}", edge.line).dimmed());
    if let Some(tags) = context_tags(&edge.context) {
        suffix.push_str(&format!("  {}", tags.dimmed()));
    }
    suffix
}

/// Render a forward trace as an indented tree.
pub fn render_trace(tree: &CallTree) -> String {
    let mut out = String::new();
    write_member_line(&mut out, &tree.root);
    render_nodes(&mut out, &tree.children, "  ");
    if tree.children.is_empty() {
        let _ = writeln!(out, "  {}", "(no outgoing calls)".dimmed());
    }
    out
}

fn render_nodes(out: &mut String, nodes: &[TraceNode], prefix: &str) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };
        let target = match (&node.target, node.status) {
            (Some(m), NodeStatus::Expanded) => format!("→ {}", member_label(m)).green().to_string(),
            (Some(m), NodeStatus::Cycle) => format!("↻ {} (cycle)", member_label(m)).yellow().to_string(),
            (Some(m), NodeStatus::DepthLimited) => {
                format!("… {} (depth limit)", member_label(m)).yellow().to_string()
            }
            _ => match &node.edge.resolved_type {
                Some(fqn) => format!("✗ unresolved in {}", fqn).red().to_string(),
                None => "✗ unresolved".red().to_string(),
            },
        };
        let _ = writeln!(
            out,
            "{}{}{}  {}{}",
            prefix,
            branch,
            call_text(&node.edge),
            target,
            edge_suffix(&node.edge)
        );
        let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_nodes(out, &node.children, &child_prefix);
    }
}

/// Render callers of `target`, indented by depth.
pub fn render_callers(target: &MemberSummary, entries: &[CallerEntry]) -> String {
    let mut out = String::new();
    write_member_line(&mut out, target);
    if entries.is_empty() {
        let _ = writeln!(out, "  {}", "(no callers)".dimmed());
        return out;
    }
    for entry in entries {
        let indent = "  ".repeat(entry.depth);
        let _ = writeln!(
            out,
            "  {}← {} {}  {}{}",
            indent,
            format!("[{}]", entry.caller.id).dimmed(),
            member_label(&entry.caller),
            format!("{}:{}", entry.caller.location, entry.edge.line).blue(),
            context_tags(&entry.edge.context)
                .map(|t| format!("  {}", t.dimmed()))
                .unwrap_or_default()
        );
    }
    out
}

/// Render a bidirectional trace, outgoing section first.
pub fn render_bidirectional(target: &MemberSummary, edges: &[DirectedEdge]) -> String {
    let mut out = String::new();
    write_member_line(&mut out, target);
    for (direction, title) in [(Direction::Outgoing, "Calls"), (Direction::Incoming, "Called by")] {
        let section: Vec<_> = edges.iter().filter(|e| e.direction == direction).collect();
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} ({}):", title.bold(), section.len());
        for e in section {
            let indent = "  ".repeat(e.depth);
            let line = match direction {
                Direction::Outgoing => format!(
                    "{} → {}",
                    member_label(&e.caller),
                    e.target
                        .as_ref()
                        .map(member_label)
                        .unwrap_or_else(|| format!("{} (unresolved)", call_text(&e.edge)))
                ),
                Direction::Incoming => format!(
                    "{} ← {}",
                    e.target.as_ref().map(member_label).unwrap_or_default(),
                    member_label(&e.caller)
                ),
            };
            let _ = writeln!(out, "  {}{}{}", indent, line, edge_suffix(&e.edge));
        }
    }
    out
}

/// Render a call-context listing, one call site per line.
pub fn render_calls(title: &str, entries: &[CallEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {} ({}):", title.bold(), entries.len());
    for entry in entries {
        let target = entry
            .target
            .as_ref()
            .map(member_label)
            .unwrap_or_else(|| format!("{} (unresolved)", call_text(&entry.edge)));
        let _ = writeln!(
            out,
            "    {:>6} {} → {}  {}{}",
            format!("[{}]", entry.caller.id).dimmed(),
            member_label(&entry.caller),
            target,
            format!("{}:{}", entry.caller.location, entry.edge.line).blue(),
            context_tags(&entry.edge.context)
                .map(|t| format!("  {}", t.dimmed()))
                .unwrap_or_default()
        );
    }
    out
}

pub fn render_types(types: &[TypeSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {} ({}):", "Types".bold(), types.len());
    for t in types {
        let kind = if t.is_interface {
            "interface"
        } else if t.is_abstract {
            "abstract"
        } else {
            "class"
        };
        let _ = writeln!(
            out,
            "    {:<10} {}  {}  {}",
            kind.dimmed(),
            t.qualified_name.bold(),
            format!("{} members", t.member_count).dimmed(),
            t.location.blue()
        );
    }
    out
}

pub fn render_members(title: &str, members: &[MemberSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {} ({}):", title.bold(), members.len());
    for m in members {
        let modifiers = match (m.is_public, m.is_static) {
            (true, true) => "public static",
            (true, false) => "public",
            (false, true) => "static",
            (false, false) => "",
        };
        let _ = writeln!(
            out,
            "    {:>6} {:<14} {} {}  {}",
            format!("[{}]", m.id).dimmed(),
            modifiers.dimmed(),
            m.return_type,
            member_label(m).bold(),
            format!("{}:{}", m.location, m.line).blue()
        );
    }
    out
}

pub fn render_build(root: &str, database: &str, stats: &BuildStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  {} v{}", "calltrace".cyan().bold(), env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}{}", "Analyzed: ".dimmed(), root);
    let _ = writeln!(out, "  {}{}", "Database: ".dimmed(), database);
    let _ = writeln!(out);

    let r = &stats.registry;
    let _ = writeln!(
        out,
        "  Files: {} analyzed, {} skipped",
        stats.files_analyzed,
        stats.skipped.len()
    );
    let _ = writeln!(
        out,
        "  Types: {}  Members: {}  Fields: {}  Imports: {}",
        r.types, r.members, r.fields, r.imports
    );
    let percent = if r.edges == 0 {
        100
    } else {
        r.resolved_edges * 100 / r.edges
    };
    let _ = writeln!(
        out,
        "  Call edges: {} ({} resolved, {}%)",
        r.edges,
        r.resolved_edges.to_string().green(),
        percent
    );

    if !stats.skipped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} ({}):", "Skipped".yellow(), stats.skipped.len());
        for s in &stats.skipped {
            let _ = writeln!(out, "    {}  {}", s.path.blue(), s.reason.dimmed());
        }
    }
    out
}
