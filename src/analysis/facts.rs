//! Declaration facts extracted from a single source file.
//!
//! These structures are the boundary between the front-end and the rest of
//! the engine: pass 1 consumes the declarations, pass 2 consumes the call
//! sites recorded in member bodies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved member name for constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Reserved member name for static initializer blocks.
pub const STATIC_INIT_NAME: &str = "<clinit>";

/// Source line span (1-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

impl LineSpan {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        Self {
            start: node.start_position().row as u32 + 1, // tree-sitter is 0-indexed
            end: node.end_position().row as u32 + 1,
        }
    }
}

impl fmt::Display for LineSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Kind of type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
}

/// Kind of member declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Constructor,
    Initializer,
}

/// Kind of call-like expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// `foo(..)` or `recv.foo(..)`.
    Invocation,
    /// `new Foo(..)`.
    Construction,
    /// `Foo::bar` or `Foo::new`.
    Reference,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Invocation => "invocation",
            CallKind::Construction => "construction",
            CallKind::Reference => "reference",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invocation" => Some(CallKind::Invocation),
            "construction" => Some(CallKind::Construction),
            "reference" => Some(CallKind::Reference),
            _ => None,
        }
    }
}

/// Literal categories the front-end can distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    String,
    Char,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Null,
}

/// Loop construct enclosing a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopKind {
    For,
    Foreach,
    While,
    Do,
}

impl LoopKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopKind::For => "for",
            LoopKind::Foreach => "foreach",
            LoopKind::While => "while",
            LoopKind::Do => "do",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "for" => Some(LoopKind::For),
            "foreach" => Some(LoopKind::Foreach),
            "while" => Some(LoopKind::While),
            "do" => Some(LoopKind::Do),
            _ => None,
        }
    }
}

/// Conditional construct enclosing a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionalKind {
    If,
    Switch,
    Ternary,
}

impl ConditionalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionalKind::If => "if",
            ConditionalKind::Switch => "switch",
            ConditionalKind::Ternary => "ternary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "if" => Some(ConditionalKind::If),
            "switch" => Some(ConditionalKind::Switch),
            "ternary" => Some(ConditionalKind::Ternary),
            _ => None,
        }
    }
}

/// Syntactic context of a call site, innermost construct wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallContext {
    pub in_try: bool,
    pub in_catch: bool,
    pub in_finally: bool,
    pub loop_kind: Option<LoopKind>,
    pub conditional: Option<ConditionalKind>,
    pub in_lambda: bool,
}

/// Static description of an argument or receiver expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprDescriptor {
    /// The front-end already knows the static type (cast, `new`, typed local).
    Typed(String),
    /// A nested call whose return type is the expression type.
    Call(Box<CallSite>),
    Literal(LiteralKind),
    /// A bare identifier with no local declaration in scope.
    Name(String),
    Other,
}

/// A call-like expression inside a member body.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub kind: CallKind,
    /// Raw receiver text (`this`, `super`, `Foo`, `helper`, `a.b`), if any.
    pub qualifier: Option<String>,
    /// Structured view of the receiver for best-effort type inference.
    pub receiver: Option<Box<ExprDescriptor>>,
    /// Called member name; constructors use [`CONSTRUCTOR_NAME`].
    pub name: String,
    pub args: Vec<ExprDescriptor>,
    pub line: u32,
    pub context: CallContext,
}

/// Call sites of one member body, in walk order.
#[derive(Debug, Clone, Default)]
pub struct MemberBody {
    pub calls: Vec<CallSite>,
}

/// A method, constructor or initializer declaration.
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub name: String,
    pub kind: MemberKind,
    /// Normalized parameter type names, in order.
    pub params: Vec<String>,
    pub return_type: String,
    pub is_static: bool,
    pub is_public: bool,
    pub span: LineSpan,
    pub body: Option<MemberBody>,
}

impl MemberDecl {
    /// Normalized signature: `name(T1,T2)`.
    pub fn signature(&self) -> String {
        format_signature(&self.name, &self.params)
    }
}

/// Build the normalized `name(T1,T2)` signature used as the member key.
pub fn format_signature(name: &str, params: &[String]) -> String {
    format!("{}({})", name, params.join(","))
}

/// Split a normalized signature back into its parameter types.
pub fn parse_signature_params(signature: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (signature.find('('), signature.rfind(')')) else {
        return Vec::new();
    };
    if close <= open + 1 {
        return Vec::new();
    }
    signature[open + 1..close]
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Strip generic arguments, annotations and whitespace from a written type.
///
/// Package qualifiers are kept; varargs become `[]`.
pub fn strip_generics(raw: &str) -> String {
    let tokens: Vec<&str> = raw
        .split_whitespace()
        .filter(|t| !t.starts_with('@'))
        .collect();
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in tokens.concat().chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out.replace("...", "[]")
}

/// Normalize a written type to its simple name: `java.util.List<String>` is
/// `List`, `byte[]` stays `byte[]`, `String...` is `String[]`.
pub fn simple_type_name(raw: &str) -> String {
    let stripped = strip_generics(raw);
    let split = stripped.find('[').unwrap_or(stripped.len());
    let (base, dims) = stripped.split_at(split);
    let simple = base.rsplit('.').next().unwrap_or(base);
    format!("{}{}", simple, dims)
}

/// A field declaration.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub type_name: String,
    pub is_static: bool,
}

/// A class, interface, enum or record declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub is_abstract: bool,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub members: Vec<MemberDecl>,
}

impl TypeDecl {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

/// An import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Package or package+type path, without the trailing `.*`.
    pub path: String,
    pub is_wildcard: bool,
    pub is_static: bool,
    pub line: u32,
}

/// All declarations extracted from a single file.
#[derive(Debug, Clone)]
pub struct FileDeclarations {
    pub path: String,
    pub package: Option<String>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    pub has_syntax_errors: bool,
}

impl FileDeclarations {
    /// Create empty declarations for a file.
    pub fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            package: None,
            imports: Vec::new(),
            types: Vec::new(),
            has_syntax_errors: false,
        }
    }

    /// Find a type declaration by name.
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Total number of call sites across all member bodies.
    pub fn call_count(&self) -> usize {
        self.types
            .iter()
            .flat_map(|t| &t.members)
            .filter_map(|m| m.body.as_ref())
            .map(|b| b.calls.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_roundtrip() {
        let params = vec!["int".to_string(), "String[]".to_string()];
        let sig = format_signature("run", &params);
        assert_eq!(sig, "run(int,String[])");
        assert_eq!(parse_signature_params(&sig), params);
    }

    #[test]
    fn test_type_normalization() {
        assert_eq!(simple_type_name("java.util.List<String>"), "List");
        assert_eq!(simple_type_name("Map<String, List<Integer>>"), "Map");
        assert_eq!(simple_type_name("String..."), "String[]");
        assert_eq!(simple_type_name("java.lang.String[][]"), "String[][]");
        assert_eq!(simple_type_name("@NonNull Foo"), "Foo");
        assert_eq!(strip_generics("com.acme.Box<T>"), "com.acme.Box");
    }

    #[test]
    fn test_empty_signature_params() {
        assert!(parse_signature_params("run()").is_empty());
        assert!(parse_signature_params("garbage").is_empty());
    }
}
