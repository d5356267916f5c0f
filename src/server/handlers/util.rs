use crate::analysis::document::DocumentState;
use crate::analysis::path_resolver::extension_of;
use crate::analysis::tree_store::WorkspaceTree;
use crate::analysis::WorkspaceTrees;
use crate::server::error::LspError;
use crate::server::state::ServerState;
use crate::types::ImportBinding;
use ropey::Rope;
use std::path::PathBuf;
use std::sync::Arc;
use tower_lsp::lsp_types::{Position, Range, Url};

/// Text of `line` without its line terminator.
pub(crate) fn line_text(content: &str, line: u32) -> Option<String> {
    let rope = Rope::from_str(content);
    let slice = rope.get_line(line as usize)?;
    let text = slice.to_string();
    Some(text.trim_end_matches(['\n', '\r']).to_string())
}

/// Byte column of `character` in `line`, clamped to the line and moved back
/// to a char boundary.
pub(crate) fn clamp_column(line: &str, character: u32) -> usize {
    let mut column = (character as usize).min(line.len());
    while !line.is_char_boundary(column) {
        column -= 1;
    }
    column
}

/// Byte offset of `position` in `content`.
pub(crate) fn position_to_byte(content: &str, position: Position) -> Option<usize> {
    let rope = Rope::from_str(content);
    let line_start = rope.try_line_to_byte(position.line as usize).ok()?;
    let line = line_text(content, position.line)?;
    Some(line_start + clamp_column(&line, position.character))
}

/// A string literal on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuotedString {
    pub quote: char,
    /// Column of the opening quote.
    pub open: usize,
    /// Column of the closing quote, or the line length when unterminated.
    pub close: usize,
    pub terminated: bool,
    pub text: String,
}

impl QuotedString {
    /// Contents between the opening quote and `column`.
    pub fn typed_prefix(&self, column: usize) -> &str {
        let end = column.clamp(self.open + 1, self.close) - self.open - 1;
        &self.text[..end]
    }

    /// Range of the literal including both quotes.
    pub fn range(&self, line: u32) -> Range {
        let end = if self.terminated { self.close + 1 } else { self.close };
        Range::new(
            Position::new(line, self.open as u32),
            Position::new(line, end as u32),
        )
    }
}

/// The `'…'` or `"…"` literal on `line` that encloses `column`.
///
/// The cursor counts as inside when it sits anywhere from just after the
/// opening quote up to and including the closing quote.
pub(crate) fn quoted_at(line: &str, column: usize) -> Option<QuotedString> {
    let mut open: Option<(usize, char)> = None;
    let mut escaped = false;

    for (i, ch) in line.char_indices() {
        match open {
            Some((start, quote)) => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == quote {
                    if column > start && column <= i {
                        return Some(QuotedString {
                            quote,
                            open: start,
                            close: i,
                            terminated: true,
                            text: line[start + 1..i].to_string(),
                        });
                    }
                    open = None;
                }
            }
            None if ch == '\'' || ch == '"' => open = Some((i, ch)),
            None => {}
        }
    }

    match open {
        Some((start, quote)) if column > start => Some(QuotedString {
            quote,
            open: start,
            close: line.len(),
            terminated: false,
            text: line[start + 1..].to_string(),
        }),
        _ => None,
    }
}

/// Identifier under the cursor: its text, range, and the local name it binds
/// when it sits inside an import specifier.
pub(crate) struct IdentifierAt {
    pub name: String,
    pub local_name: String,
    pub range: Range,
}

pub(crate) fn identifier_at(doc: &DocumentState, position: Position) -> Option<IdentifierAt> {
    let tree = doc.tree.as_ref()?;
    let offset = position_to_byte(&doc.content, position)?;
    let root = tree.root_node();

    let node = root
        .descendant_for_byte_range(offset, offset)
        .filter(is_identifier)
        .or_else(|| {
            // Cursor just past the last character.
            offset
                .checked_sub(1)
                .and_then(|prev| root.descendant_for_byte_range(prev, prev))
                .filter(is_identifier)
        })?;

    let name = node.utf8_text(doc.content.as_bytes()).ok()?.to_string();
    let local_name = node
        .parent()
        .filter(|p| p.kind() == "import_specifier")
        .and_then(|spec| spec.child_by_field_name("alias").or_else(|| spec.child_by_field_name("name")))
        .and_then(|local| local.utf8_text(doc.content.as_bytes()).ok())
        .map(str::to_string)
        .unwrap_or_else(|| name.clone());

    Some(IdentifierAt {
        name,
        local_name,
        range: crate::types::ts_range_to_lsp(node.range()),
    })
}

fn is_identifier(node: &tree_sitter::Node) -> bool {
    matches!(
        node.kind(),
        "identifier" | "type_identifier" | "shorthand_property_identifier"
    )
}

/// A document opened in a workspace, with the tree snapshot for that
/// workspace held for the whole request.
pub(crate) struct DocumentContext {
    pub doc: DocumentState,
    pub path: PathBuf,
    trees: Arc<WorkspaceTrees>,
    index: usize,
}

impl DocumentContext {
    pub fn load(uri: &Url, state: &ServerState) -> Result<Self, LspError> {
        let doc = state
            .document_manager
            .get(uri)
            .ok_or_else(|| LspError::document_not_found(uri))?;
        let path = doc.path().ok_or_else(|| LspError::not_a_file(uri))?;
        let (trees, index) = state
            .workspace_snapshot(&path)
            .ok_or_else(|| LspError::outside_workspace(uri))?;
        Ok(Self {
            doc,
            path,
            trees,
            index,
        })
    }

    /// Text of the cursor's line.
    pub fn line(&self, position: Position) -> Result<String, LspError> {
        line_text(&self.doc.content, position.line)
            .ok_or_else(|| LspError::invalid_position(&self.doc.uri, position))
    }

    pub fn workspace(&self) -> Option<&WorkspaceTree> {
        self.trees.get(self.index)
    }

    pub fn extension(&self) -> &str {
        extension_of(&self.path)
    }

    /// Absolute file behind an aliased `specifier`.
    pub fn resolve(&self, specifier: &str) -> Option<PathBuf> {
        self.workspace()?
            .resolve(specifier, self.extension())
            .map(|resolution| resolution.path)
    }

    /// Imports of this document whose specifier goes through an alias.
    pub fn aliased_imports(&self) -> impl Iterator<Item = (&ImportBinding, PathBuf)> {
        self.doc
            .imports
            .iter()
            .filter_map(|binding| Some((binding, self.resolve(&binding.specifier)?)))
    }
}
