//! Source front-end.
//!
//! Turns source files into [`FileDeclarations`]: package, imports, type
//! declarations with fields and members, and for each member body the
//! ordered call-like expressions it contains.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ Source Files    │────▶│ Analyzers    │────▶│ FileDeclarations │
//! └─────────────────┘     │ (Java)       │     │ (types, members, │
//!                         └──────────────┘     │  call sites)     │
//!                                              └──────────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌──────────────────┐
//!                         │ Call-graph   │◀────│ SourceSet        │
//!                         │ builder      │     │ (cached, sorted) │
//!                         └──────────────┘     └──────────────────┘
//! ```

mod context;
mod facts;
mod languages;
mod traits;

pub use context::{ExtractOutcome, SourceSet};
pub use facts::{
    format_signature, parse_signature_params, simple_type_name, strip_generics, CallContext,
    CallKind, CallSite, ConditionalKind, ExprDescriptor, FieldDecl, FileDeclarations, ImportDecl,
    LineSpan, LiteralKind, LoopKind, MemberBody, MemberDecl, MemberKind, TypeDecl, TypeKind,
    CONSTRUCTOR_NAME, STATIC_INIT_NAME,
};
pub use languages::{get_analyzer, register_analyzers, JavaAnalyzer};
pub use traits::{LanguageAnalyzer, ParsedFile};
