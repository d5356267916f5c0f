use crate::analysis::path_resolver::{extension_of, walk};
use crate::analysis::AliasMatcher;
use crate::error_ext::ResultExt;
use crate::server::config::CompletionConfig;
use crate::server::error::LspError;
use crate::server::handlers::util::{clamp_column, position_to_byte, quoted_at, DocumentContext};
use crate::server::state::ServerState;
use crate::types::{AliasEntry, ExportKind};
use std::path::Path;
use std::time::Instant;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionParams, CompletionTextEdit, Documentation,
    MarkupContent, MarkupKind, Position, Range, TextEdit,
};

pub async fn handle_completion(
    params: CompletionParams,
    state: &ServerState,
) -> Option<Vec<CompletionItem>> {
    let uri = &params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;
    tracing::debug!(
        "[HANDLE_COMPLETION_ENTER] uri={} pos={}:{}",
        uri,
        position.line,
        position.character
    );
    let start = Instant::now();

    if !state.config.current().await.features.completion {
        LspError::feature_disabled("completion").log_debug();
        tracing::debug!(
            "[HANDLE_COMPLETION_EXIT] disabled elapsed_ms={}",
            start.elapsed().as_millis()
        );
        return None;
    }

    let Some(ctx) = DocumentContext::load(uri, state).ok_debug("completion") else {
        tracing::debug!(
            "[HANDLE_COMPLETION_EXIT] no workspace document elapsed_ms={}",
            start.elapsed().as_millis()
        );
        return None;
    };

    let items = match ctx.line(position).ok_debug("completion") {
        Some(line) => {
            let column = clamp_column(&line, position.character);
            match quoted_at(&line, column) {
                Some(quoted) => {
                    let typed = quoted.typed_prefix(column).to_string();
                    let options = match ctx.workspace() {
                        Some(ws) => state.config.config_for_root(&ws.root).await.completion,
                        None => CompletionConfig::default(),
                    };
                    path_items(&ctx, &typed, position, &options)
                }
                None => member_items(&ctx, position, state),
            }
        }
        None => Vec::new(),
    };

    tracing::debug!(
        "[HANDLE_COMPLETION_EXIT] count={} elapsed_ms={}",
        items.len(),
        start.elapsed().as_millis()
    );
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Items for the path typed so far inside a string literal.
fn path_items(
    ctx: &DocumentContext,
    typed: &str,
    position: Position,
    options: &CompletionConfig,
) -> Vec<CompletionItem> {
    let Some(ws) = ctx.workspace() else {
        return Vec::new();
    };

    if !typed.contains('/') {
        let range = replace_range(position, typed);
        return ws
            .tree
            .aliases()
            .iter()
            .filter(|alias| alias.starts_with(typed))
            .map(|alias| CompletionItem {
                label: alias.to_string(),
                kind: Some(CompletionItemKind::FOLDER),
                text_edit: Some(CompletionTextEdit::Edit(TextEdit::new(
                    range,
                    alias.to_string(),
                ))),
                ..Default::default()
            })
            .collect();
    }

    let Some(alias) = ws.matcher.find(ws.tree.aliases(), typed) else {
        return Vec::new();
    };
    let Some(root) = ws.tree.get(alias) else {
        return Vec::new();
    };

    let segments = AliasMatcher::split(alias, typed);
    let (complete, partial) = if typed.ends_with('/') {
        (segments.as_slice(), "")
    } else {
        match segments.split_last() {
            Some((last, rest)) => (rest, *last),
            None => (segments.as_slice(), ""),
        }
    };

    let Some(dir) = walk(root, complete).filter(|entry| entry.is_directory()) else {
        return Vec::new();
    };

    let range = replace_range(position, partial);
    dir.children
        .values()
        .map(|child| entry_item(child, range, options))
        .collect()
}

fn entry_item(entry: &AliasEntry, range: Range, options: &CompletionConfig) -> CompletionItem {
    let label = entry.name.to_string();
    let insert = if entry.is_file() {
        insert_name(&entry.absolute_path, &label, options)
    } else {
        label.clone()
    };
    CompletionItem {
        kind: Some(if entry.is_directory() {
            CompletionItemKind::FOLDER
        } else {
            CompletionItemKind::FILE
        }),
        filter_text: Some(insert.clone()),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit::new(range, insert))),
        label,
        ..Default::default()
    }
}

/// File name as it should be written in an import.
fn insert_name(path: &Path, name: &str, options: &CompletionConfig) -> String {
    let extension = extension_of(path);
    let drop = !options.include_extension
        && !extension.is_empty()
        && options.extensionless.iter().any(|e| e == extension);
    if drop {
        name.strip_suffix(&format!(".{}", extension))
            .unwrap_or(name)
            .to_string()
    } else {
        name.to_string()
    }
}

fn replace_range(position: Position, partial: &str) -> Range {
    let start = position.character.saturating_sub(partial.len() as u32);
    Range::new(Position::new(position.line, start), position)
}

/// Exported names of the module when the cursor is inside the braces of an
/// aliased `import { … } from '…'`.
fn member_items(ctx: &DocumentContext, position: Position, state: &ServerState) -> Vec<CompletionItem> {
    let Some(specifier) = import_braces_at(ctx, position) else {
        return Vec::new();
    };
    let Some(target) = ctx.resolve(&specifier) else {
        return Vec::new();
    };
    let Some(exports) = state.exports.exports_for_file(&target, false) else {
        return Vec::new();
    };

    exports
        .tokens
        .iter()
        .filter(|token| token.identifier != crate::constants::DEFAULT_EXPORT_NAME)
        .map(|token| CompletionItem {
            label: token.identifier.to_string(),
            kind: Some(match token.kind {
                ExportKind::Function => CompletionItemKind::FUNCTION,
                ExportKind::Variable => CompletionItemKind::PROPERTY,
            }),
            documentation: Some(Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: format!("```typescript\n{}\n```", token.description),
            })),
            ..Default::default()
        })
        .collect()
}

/// Specifier of the import statement whose named-import braces enclose
/// `position`.
fn import_braces_at(ctx: &DocumentContext, position: Position) -> Option<String> {
    let tree = ctx.doc.tree.as_ref()?;
    let offset = position_to_byte(&ctx.doc.content, position)?;
    let source = ctx.doc.content.as_bytes();

    let mut node = tree.root_node().descendant_for_byte_range(offset, offset)?;
    let mut inside_braces = false;
    loop {
        match node.kind() {
            "named_imports" => {
                inside_braces = offset > node.start_byte() && offset < node.end_byte();
            }
            "import_statement" => break,
            _ => {}
        }
        node = node.parent()?;
    }
    if !inside_braces {
        return None;
    }

    let string = node.child_by_field_name("source")?;
    let text = string.utf8_text(source).ok()?;
    Some(text.trim_matches(['\'', '"']).to_string())
}
