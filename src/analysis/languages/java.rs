//! Java front-end using tree-sitter.
//!
//! Produces one [`FileDeclarations`] per file: the package clause, imports in
//! source order, every type declaration (nested types flattened under their
//! simple name) and the call-like expressions of each member body.

use std::collections::HashMap;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::{
    simple_type_name, strip_generics, CallContext, CallKind, CallSite, ConditionalKind,
    ExprDescriptor, FieldDecl, FileDeclarations, ImportDecl, LanguageAnalyzer, LineSpan,
    LiteralKind, LoopKind, MemberBody, MemberDecl, MemberKind, ParsedFile, TypeDecl, TypeKind,
    CONSTRUCTOR_NAME, STATIC_INIT_NAME,
};

/// Tree-sitter query for the package declaration.
const PACKAGE_QUERY: &str = r#"
(package_declaration
  [(identifier) (scoped_identifier)] @package_name
)
"#;

/// Tree-sitter query for imports (static and wildcard flags are read from
/// the node's children).
const IMPORT_QUERY: &str = r#"
(import_declaration) @import
"#;

pub struct JavaAnalyzer {
    language: Language,
}

impl JavaAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    fn extract_package(&self, parsed: &ParsedFile) -> Option<String> {
        let query = Query::new(&self.language, PACKAGE_QUERY).ok()?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return Some(parsed.node_text(capture.node).to_string());
                }
            }
        }
        None
    }

    fn extract_imports(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<ImportDecl>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        // Source order matters: static wildcards are tried in declaration order.
        let mut imports: Vec<ImportDecl> = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let Some(import) = import_from_node(parsed, capture.node) else {
                    continue;
                };
                let duplicate = imports.iter().any(|i| {
                    i.path == import.path
                        && i.is_wildcard == import.is_wildcard
                        && i.is_static == import.is_static
                });
                if !duplicate {
                    imports.push(import);
                }
            }
        }

        Ok(imports)
    }

    fn extract_types(&self, parsed: &ParsedFile) -> Vec<TypeDecl> {
        let root = parsed.tree.root_node();
        let mut types = Vec::new();
        let children: Vec<Node> = root.named_children(&mut root.walk()).collect();
        for child in children {
            self.collect_type(parsed, child, &mut types);
        }
        types
    }

    /// Build the declaration for `node` and append it, followed by its nested
    /// types, to `out`.
    fn collect_type(&self, parsed: &ParsedFile, node: Node, out: &mut Vec<TypeDecl>) {
        let Some(kind) = type_kind(node.kind()) else {
            return;
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let modifiers = Modifiers::of(node);

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|s| s.named_child(0))
            .map(|t| strip_generics(parsed.node_text(t)));

        let interfaces: Vec<String> = {
            let mut cursor = node.walk();
            let lists: Vec<Node> = node
                .named_children(&mut cursor)
                .filter(|c| matches!(c.kind(), "super_interfaces" | "extends_interfaces"))
                .collect();
            lists
                .into_iter()
                .flat_map(|l| type_list_names(parsed, l))
                .collect()
        };

        // Record components double as fields.
        let record_params = if kind == TypeKind::Record {
            formal_params(parsed, node.child_by_field_name("parameters"))
        } else {
            Vec::new()
        };

        let mut fields: Vec<FieldDecl> = record_params
            .iter()
            .map(|p| FieldDecl {
                name: p.name.clone(),
                type_name: p.written.clone(),
                is_static: false,
            })
            .collect();
        let mut members = Vec::new();
        let mut nested = Vec::new();
        let in_interface = kind == TypeKind::Interface;

        for child in body_members(node) {
            match child.kind() {
                "field_declaration" | "constant_declaration" => {
                    fields.extend(field_decls(parsed, child, in_interface));
                }
                "method_declaration" => {
                    if let Some(m) = self.method_decl(parsed, child, in_interface) {
                        members.push(m);
                    }
                }
                "constructor_declaration" => {
                    let params = formal_params(parsed, child.child_by_field_name("parameters"));
                    members.push(self.constructor_decl(parsed, child, &params));
                }
                "compact_constructor_declaration" => {
                    members.push(self.constructor_decl(parsed, child, &record_params));
                }
                "static_initializer" => {
                    members.push(self.static_initializer(parsed, child));
                }
                k if type_kind(k).is_some() => self.collect_type(parsed, child, &mut nested),
                _ => {}
            }
        }

        out.push(TypeDecl {
            name: parsed.node_text(name_node).to_string(),
            kind,
            is_abstract: modifiers.is_abstract || in_interface,
            superclass,
            interfaces,
            fields,
            members,
        });
        out.extend(nested);
    }

    fn method_decl(&self, parsed: &ParsedFile, node: Node, in_interface: bool) -> Option<MemberDecl> {
        let name = parsed.node_text(node.child_by_field_name("name")?).to_string();
        let modifiers = Modifiers::of(node);
        let params = formal_params(parsed, node.child_by_field_name("parameters"));
        let return_type = node
            .child_by_field_name("type")
            .map(|t| simple_type_name(parsed.node_text(t)))
            .unwrap_or_else(|| "void".to_string());
        let body = node
            .child_by_field_name("body")
            .map(|b| walk_body(parsed, b, &params));

        Some(MemberDecl {
            name,
            kind: MemberKind::Method,
            params: params.iter().map(|p| p.normalized.clone()).collect(),
            return_type,
            is_static: modifiers.is_static,
            is_public: modifiers.is_public || in_interface,
            span: LineSpan::from_node(node),
            body,
        })
    }

    fn constructor_decl(&self, parsed: &ParsedFile, node: Node, params: &[Param]) -> MemberDecl {
        let modifiers = Modifiers::of(node);
        let body = node
            .child_by_field_name("body")
            .map(|b| walk_body(parsed, b, params));
        let return_type = node
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n).to_string())
            .unwrap_or_else(|| "void".to_string());

        MemberDecl {
            name: CONSTRUCTOR_NAME.to_string(),
            kind: MemberKind::Constructor,
            params: params.iter().map(|p| p.normalized.clone()).collect(),
            return_type,
            is_static: false,
            is_public: modifiers.is_public,
            span: LineSpan::from_node(node),
            body,
        }
    }

    fn static_initializer(&self, parsed: &ParsedFile, node: Node) -> MemberDecl {
        let body = node
            .named_children(&mut node.walk())
            .find(|c| c.kind() == "block")
            .map(|b| walk_body(parsed, b, &[]));

        MemberDecl {
            name: STATIC_INIT_NAME.to_string(),
            kind: MemberKind::Initializer,
            params: Vec::new(),
            return_type: "void".to_string(),
            is_static: true,
            is_public: false,
            span: LineSpan::from_node(node),
            body,
        }
    }
}

impl Default for JavaAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn language_id(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Java source: {}", path.display()))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn extract(&self, parsed: &ParsedFile) -> anyhow::Result<FileDeclarations> {
        Ok(FileDeclarations {
            path: parsed.path.clone(),
            package: self.extract_package(parsed),
            imports: self.extract_imports(parsed)?,
            types: self.extract_types(parsed),
            has_syntax_errors: parsed.has_syntax_errors(),
        })
    }
}

fn type_kind(kind: &str) -> Option<TypeKind> {
    match kind {
        "class_declaration" => Some(TypeKind::Class),
        "interface_declaration" => Some(TypeKind::Interface),
        "enum_declaration" => Some(TypeKind::Enum),
        "record_declaration" => Some(TypeKind::Record),
        _ => None,
    }
}

fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

#[derive(Debug, Default, Clone, Copy)]
struct Modifiers {
    is_static: bool,
    is_public: bool,
    is_abstract: bool,
}

impl Modifiers {
    fn of(node: Node) -> Self {
        let mut m = Modifiers::default();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "modifiers" {
                continue;
            }
            let mut inner = child.walk();
            for token in child.children(&mut inner) {
                match token.kind() {
                    "static" => m.is_static = true,
                    "public" => m.is_public = true,
                    "abstract" => m.is_abstract = true,
                    _ => {}
                }
            }
        }
        m
    }
}

/// A declared parameter: the written type (generics stripped, qualifier
/// kept), its simple normalized form, and the parameter name.
#[derive(Debug, Clone)]
struct Param {
    written: String,
    normalized: String,
    name: String,
}

fn formal_params(parsed: &ParsedFile, params: Option<Node>) -> Vec<Param> {
    let Some(params) = params else {
        return Vec::new();
    };
    let children: Vec<Node> = params.named_children(&mut params.walk()).collect();
    children
        .into_iter()
        .filter_map(|p| match p.kind() {
            "formal_parameter" => {
                let mut written = strip_generics(parsed.node_text(p.child_by_field_name("type")?));
                if let Some(dims) = p.child_by_field_name("dimensions") {
                    written.push_str(&strip_generics(parsed.node_text(dims)));
                }
                let name = parsed.node_text(p.child_by_field_name("name")?).to_string();
                Some(Param {
                    normalized: simple_type_name(&written),
                    written,
                    name,
                })
            }
            "spread_parameter" => {
                let mut cursor = p.walk();
                let children: Vec<Node> = p.named_children(&mut cursor).collect();
                let ty = children
                    .iter()
                    .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"))?;
                let declarator = children.iter().find(|c| c.kind() == "variable_declarator")?;
                let written = format!("{}[]", strip_generics(parsed.node_text(*ty)));
                let name = parsed
                    .node_text(declarator.child_by_field_name("name")?)
                    .to_string();
                Some(Param {
                    normalized: simple_type_name(&written),
                    written,
                    name,
                })
            }
            _ => None,
        })
        .collect()
}

fn import_from_node(parsed: &ParsedFile, node: Node) -> Option<ImportDecl> {
    let mut is_static = false;
    let mut is_wildcard = false;
    let mut path = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "static" => is_static = true,
            "asterisk" => is_wildcard = true,
            "identifier" | "scoped_identifier" => path = Some(parsed.node_text(child).to_string()),
            _ => {}
        }
    }

    path.map(|path| ImportDecl {
        path,
        is_wildcard,
        is_static,
        line: line_of(node),
    })
}

fn type_list_names(parsed: &ParsedFile, node: Node) -> Vec<String> {
    let mut cursor = node.walk();
    let lists: Vec<Node> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "type_list")
        .collect();
    lists
        .into_iter()
        .flat_map(|list| {
            let types: Vec<Node> = list.named_children(&mut list.walk()).collect();
            types
                .into_iter()
                .map(|t| strip_generics(parsed.node_text(t)))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Member-level children of a type body. Enum bodies keep their members in
/// a nested `enum_body_declarations` node.
fn body_members(type_node: Node) -> Vec<Node> {
    let Some(body) = type_node.child_by_field_name("body") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let children: Vec<Node> = body.named_children(&mut body.walk()).collect();
    for child in children {
        if child.kind() == "enum_body_declarations" {
            out.extend(child.named_children(&mut child.walk()));
        } else {
            out.push(child);
        }
    }
    out
}

fn field_decls(parsed: &ParsedFile, node: Node, in_interface: bool) -> Vec<FieldDecl> {
    let Some(type_node) = node.child_by_field_name("type") else {
        return Vec::new();
    };
    let type_name = strip_generics(parsed.node_text(type_node));
    // Interface constants are implicitly static.
    let is_static = Modifiers::of(node).is_static || in_interface;

    let mut cursor = node.walk();
    let declarators: Vec<Node> = node
        .children_by_field_name("declarator", &mut cursor)
        .collect();
    declarators
        .into_iter()
        .filter_map(|d| d.child_by_field_name("name"))
        .map(|n| FieldDecl {
            name: parsed.node_text(n).to_string(),
            type_name: type_name.clone(),
            is_static,
        })
        .collect()
}

fn walk_body(parsed: &ParsedFile, body: Node, params: &[Param]) -> MemberBody {
    let mut walker = BodyWalker {
        parsed,
        locals: params
            .iter()
            .map(|p| (p.name.clone(), p.written.clone()))
            .collect(),
        calls: Vec::new(),
    };
    walker.walk(body, CallContext::default());
    MemberBody {
        calls: walker.calls,
    }
}

/// Collects call sites of one member body in pre-order, tracking typed
/// locals and the syntactic context of each call.
struct BodyWalker<'a> {
    parsed: &'a ParsedFile,
    /// Identifier -> written type for parameters and locals seen so far.
    locals: HashMap<String, String>,
    calls: Vec<CallSite>,
}

impl<'a> BodyWalker<'a> {
    fn text(&self, node: Node) -> &'a str {
        let parsed: &'a ParsedFile = self.parsed;
        parsed.node_text(node)
    }

    fn walk(&mut self, node: Node, ctx: CallContext) {
        match node.kind() {
            // Local and nested type declarations are not attributed to this member.
            k if type_kind(k).is_some() => return,
            "local_variable_declaration" => self.declare_locals(node),
            "enhanced_for_statement" | "catch_formal_parameter" | "resource" => {
                self.declare_binding(node)
            }
            "lambda_expression" => {
                let params = node
                    .child_by_field_name("parameters")
                    .filter(|p| p.kind() == "formal_parameters");
                for p in formal_params(self.parsed, params) {
                    self.locals.insert(p.name, p.written);
                }
            }
            _ => {}
        }

        match node.kind() {
            "method_invocation" => {
                let site = self.invocation(node, ctx);
                self.calls.push(site);
            }
            "object_creation_expression" => {
                let site = self.construction(node, ctx);
                self.calls.push(site);
            }
            "explicit_constructor_invocation" => {
                let site = self.delegation(node, ctx);
                self.calls.push(site);
            }
            "method_reference" => {
                let site = self.reference(node, ctx);
                self.calls.push(site);
            }
            _ => {}
        }

        let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
        for child in children {
            let child_ctx = descend(node, child, ctx);
            self.walk(child, child_ctx);
        }
    }

    fn declare_locals(&mut self, node: Node) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let declared = strip_generics(self.text(type_node));

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();
        for declarator in declarators {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let ty = if declared == "var" {
                match declarator.child_by_field_name("value").map(|v| self.describe(v)) {
                    Some(ExprDescriptor::Typed(t)) => t,
                    _ => continue,
                }
            } else {
                declared.clone()
            };
            let name = self.text(name).to_string();
            self.locals.insert(name, ty);
        }
    }

    fn declare_binding(&mut self, node: Node) {
        let ty = match node.kind() {
            "catch_formal_parameter" => node
                .named_children(&mut node.walk())
                .find(|c| c.kind() == "catch_type")
                .and_then(|c| c.named_child(0)),
            _ => node.child_by_field_name("type"),
        };
        let (Some(ty), Some(name)) = (ty, node.child_by_field_name("name")) else {
            return;
        };
        let written = strip_generics(self.text(ty));
        if written != "var" {
            let name = self.text(name).to_string();
            self.locals.insert(name, written);
        }
    }

    fn invocation(&self, node: Node, ctx: CallContext) -> CallSite {
        let name = node.child_by_field_name("name");
        let object = node.child_by_field_name("object");

        CallSite {
            kind: CallKind::Invocation,
            qualifier: object.map(|o| self.text(o).trim().to_string()),
            receiver: object.map(|o| Box::new(self.describe(o))),
            name: name.map(|n| self.text(n).to_string()).unwrap_or_default(),
            args: self.arguments(node),
            line: line_of(name.unwrap_or(node)),
            context: ctx,
        }
    }

    fn construction(&self, node: Node, ctx: CallContext) -> CallSite {
        CallSite {
            kind: CallKind::Construction,
            qualifier: node
                .child_by_field_name("type")
                .map(|t| strip_generics(self.text(t))),
            receiver: None,
            name: CONSTRUCTOR_NAME.to_string(),
            args: self.arguments(node),
            line: line_of(node),
            context: ctx,
        }
    }

    /// `this(..)` or `super(..)` inside a constructor.
    fn delegation(&self, node: Node, ctx: CallContext) -> CallSite {
        CallSite {
            kind: CallKind::Construction,
            qualifier: node
                .child_by_field_name("constructor")
                .map(|c| self.text(c).to_string()),
            receiver: None,
            name: CONSTRUCTOR_NAME.to_string(),
            args: self.arguments(node),
            line: line_of(node),
            context: ctx,
        }
    }

    fn reference(&self, node: Node, ctx: CallContext) -> CallSite {
        let children: Vec<Node> = node.children(&mut node.walk()).collect();
        let target = children.first().copied();
        let name = match children.last() {
            Some(last) if last.kind() == "new" => CONSTRUCTOR_NAME.to_string(),
            Some(last) => self.text(*last).to_string(),
            None => String::new(),
        };

        CallSite {
            kind: CallKind::Reference,
            qualifier: target.map(|t| strip_generics(self.text(t))),
            receiver: target.map(|t| Box::new(self.describe(t))),
            name,
            args: Vec::new(),
            line: line_of(node),
            context: ctx,
        }
    }

    fn arguments(&self, node: Node) -> Vec<ExprDescriptor> {
        let Some(args) = node.child_by_field_name("arguments") else {
            return Vec::new();
        };
        let children: Vec<Node> = args.named_children(&mut args.walk()).collect();
        children
            .into_iter()
            .filter(|a| !a.kind().ends_with("comment"))
            .map(|a| self.describe(a))
            .collect()
    }

    /// Static description of an expression, used for argument typing and
    /// receiver inference.
    fn describe(&self, node: Node) -> ExprDescriptor {
        match node.kind() {
            "cast_expression" | "object_creation_expression" => node
                .child_by_field_name("type")
                .map(|t| ExprDescriptor::Typed(strip_generics(self.text(t))))
                .unwrap_or(ExprDescriptor::Other),
            "array_creation_expression" => node
                .child_by_field_name("type")
                .map(|t| ExprDescriptor::Typed(format!("{}[]", strip_generics(self.text(t)))))
                .unwrap_or(ExprDescriptor::Other),
            "method_invocation" => {
                ExprDescriptor::Call(Box::new(self.invocation(node, CallContext::default())))
            }
            "string_literal" | "text_block" => ExprDescriptor::Literal(LiteralKind::String),
            "character_literal" => ExprDescriptor::Literal(LiteralKind::Char),
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => {
                if self.text(node).ends_with(&['l', 'L'][..]) {
                    ExprDescriptor::Literal(LiteralKind::Long)
                } else {
                    ExprDescriptor::Literal(LiteralKind::Int)
                }
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                if self.text(node).ends_with(&['f', 'F'][..]) {
                    ExprDescriptor::Literal(LiteralKind::Float)
                } else {
                    ExprDescriptor::Literal(LiteralKind::Double)
                }
            }
            "true" | "false" => ExprDescriptor::Literal(LiteralKind::Boolean),
            "null_literal" => ExprDescriptor::Literal(LiteralKind::Null),
            "identifier" => {
                let name = self.text(node);
                match self.locals.get(name) {
                    Some(ty) => ExprDescriptor::Typed(ty.clone()),
                    None => ExprDescriptor::Name(name.to_string()),
                }
            }
            "this" => ExprDescriptor::Name("this".to_string()),
            "field_access" => {
                let object = node.child_by_field_name("object");
                let field = node.child_by_field_name("field");
                match (object, field) {
                    (Some(o), Some(f)) if o.kind() == "this" => {
                        ExprDescriptor::Name(self.text(f).to_string())
                    }
                    _ => ExprDescriptor::Other,
                }
            }
            "parenthesized_expression" => node
                .named_child(0)
                .map(|inner| self.describe(inner))
                .unwrap_or(ExprDescriptor::Other),
            "binary_expression" => {
                let is_plus = node
                    .child_by_field_name("operator")
                    .map(|op| self.text(op) == "+")
                    .unwrap_or(false);
                let is_string = |side: Option<Node>| match side.map(|s| self.describe(s)) {
                    Some(ExprDescriptor::Literal(LiteralKind::String)) => true,
                    Some(ExprDescriptor::Typed(t)) => t == "String",
                    _ => false,
                };
                if is_plus
                    && (is_string(node.child_by_field_name("left"))
                        || is_string(node.child_by_field_name("right")))
                {
                    ExprDescriptor::Typed("String".to_string())
                } else {
                    ExprDescriptor::Other
                }
            }
            _ => ExprDescriptor::Other,
        }
    }
}

/// Context for `child` given its parent and the parent's context.
fn descend(parent: Node, child: Node, mut ctx: CallContext) -> CallContext {
    match parent.kind() {
        "try_statement" | "try_with_resources_statement" => {
            if parent.child_by_field_name("body") == Some(child)
                || child.kind() == "resource_specification"
            {
                ctx.in_try = true;
            }
        }
        "object_creation_expression" if child.kind() == "class_body" => ctx.in_lambda = true,
        _ => {}
    }

    match child.kind() {
        "catch_clause" => ctx.in_catch = true,
        "finally_clause" => ctx.in_finally = true,
        "for_statement" => ctx.loop_kind = Some(LoopKind::For),
        "enhanced_for_statement" => ctx.loop_kind = Some(LoopKind::Foreach),
        "while_statement" => ctx.loop_kind = Some(LoopKind::While),
        "do_statement" => ctx.loop_kind = Some(LoopKind::Do),
        "if_statement" => ctx.conditional = Some(ConditionalKind::If),
        "switch_expression" | "switch_statement" => ctx.conditional = Some(ConditionalKind::Switch),
        "ternary_expression" => ctx.conditional = Some(ConditionalKind::Ternary),
        "lambda_expression" => ctx.in_lambda = true,
        _ => {}
    }
    ctx
}
