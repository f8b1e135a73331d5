//! Core traits for source front-ends.

use std::path::Path;

use super::FileDeclarations;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// Kept separate from [`FileDeclarations`] so a tree can be inspected
/// (e.g. for syntax errors) before extraction.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Whether the tree contains ERROR or MISSING nodes.
    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Language front-end trait.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so implementations create parsers per
/// call instead of sharing one.
pub trait LanguageAnalyzer: Send + Sync {
    /// Returns the language identifier (e.g., "java").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Partial parse errors are still returned as a valid tree with ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Extract package, imports, type declarations and member call sites.
    fn extract(&self, parsed: &ParsedFile) -> anyhow::Result<FileDeclarations>;

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
