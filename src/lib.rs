//! calltrace - static call-graph analysis for Java codebases.
//!
//! calltrace builds a cross-file symbol table (types, members, fields,
//! imports) from a source tree and a best-effort static call graph over it,
//! then answers structural queries: what does this member call, who calls
//! it, and how does it connect in both directions.
//!
//! # Architecture
//!
//! The analysis runs in two passes with a hard barrier between them:
//!
//! - `analysis`: tree-sitter front-end producing per-file declarations and
//!   call sites
//! - `registry`: the flat-arena declaration store, sole owner of every record
//! - `resolve`: import resolution, overload scoring and call-target resolution
//! - `graph`: the two-pass builder and the read-only query engine
//! - `store`: SQLite persistence of the registry
//! - `config`, `report`, `cli`: configuration, output and the command line
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use calltrace::{CallGraphBuilder, Config, QueryEngine, Registry, TraceOptions};
//!
//! let config = Config::default();
//! let mut registry = Registry::new();
//! CallGraphBuilder::new(&config).build(Path::new("src/main/java"), &mut registry)?;
//!
//! let engine = QueryEngine::new(&registry, &config);
//! for member in engine.search_members("handle", calltrace::SearchMode::Substring)? {
//!     let tree = engine.forward(member.id, TraceOptions::default())?;
//!     println!("{} calls {} members", member.signature, tree.nodes().len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod store;

pub use analysis::{register_analyzers, FileDeclarations, JavaAnalyzer, LanguageAnalyzer, SourceSet};
pub use cancel::CancelToken;
pub use config::Config;
pub use error::{AnalysisError, ConfigError, QueryError, StoreError};
pub use graph::{BuildStats, CallGraphBuilder, CallTree, QueryEngine, SearchMode, TraceOptions};
pub use registry::{MemberId, Registry, TypeId};
pub use resolve::{CallResolver, ImportResolver, OverloadResolver, ResolveOptions};
pub use store::Store;
