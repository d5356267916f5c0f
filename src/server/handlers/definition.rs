use crate::error_ext::ResultExt;
use crate::server::error::LspError;
use crate::server::handlers::util::{clamp_column, identifier_at, quoted_at, DocumentContext};
use crate::server::state::ServerState;
use crate::types::ImportedName;
use std::path::Path;
use std::time::Instant;
use tower_lsp::lsp_types::{GotoDefinitionParams, GotoDefinitionResponse, Location, Position, Range, Url};

pub async fn handle_definition(
    params: GotoDefinitionParams,
    state: &ServerState,
) -> Option<GotoDefinitionResponse> {
    let uri = &params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;
    tracing::debug!(
        "[HANDLE_DEFINITION_ENTER] uri={} pos={}:{}",
        uri,
        position.line,
        position.character
    );
    let start = Instant::now();

    if !state.config.current().await.features.definition {
        LspError::feature_disabled("definition").log_debug();
        tracing::debug!(
            "[HANDLE_DEFINITION_EXIT] disabled elapsed_ms={}",
            start.elapsed().as_millis()
        );
        return None;
    }

    let location = DocumentContext::load(uri, state).ok_debug("definition").and_then(|ctx| {
        source_string_target(&ctx, position)
            .or_else(|| imported_symbol_target(&ctx, position, state))
            .or_else(|| component_tag_target(&ctx, position))
    });

    tracing::debug!(
        "[HANDLE_DEFINITION_EXIT] found={} elapsed_ms={}",
        location.is_some(),
        start.elapsed().as_millis()
    );
    location.map(GotoDefinitionResponse::Scalar)
}

/// Cursor on an aliased path string: the file it resolves to.
fn source_string_target(ctx: &DocumentContext, position: Position) -> Option<Location> {
    let line = ctx.line(position).ok_debug("definition")?;
    let quoted = quoted_at(&line, clamp_column(&line, position.character))?;
    let Some(target) = ctx.resolve(&quoted.text) else {
        LspError::unresolved(&quoted.text).log_debug();
        return None;
    };
    location(&target, Position::new(0, 0))
}

/// Cursor on a name bound by an aliased import, at the import or at a use.
fn imported_symbol_target(
    ctx: &DocumentContext,
    position: Position,
    state: &ServerState,
) -> Option<Location> {
    let identifier = identifier_at(&ctx.doc, position)?;
    let binding = ctx.doc.import_for(&identifier.local_name)?;
    let target = ctx.resolve(&binding.specifier)?;

    let at = binding
        .export_name()
        .and_then(|name| {
            let exports = state.exports.exports_for_file(&target, false)?;
            exports.find(name).map(|token| token.position)
        })
        .unwrap_or_default();
    location(&target, at)
}

/// Cursor on a component tag in a Vue template: the file of the default
/// import with the same PascalCase name.
fn component_tag_target(ctx: &DocumentContext, position: Position) -> Option<Location> {
    if ctx.doc.language_id != "vue" {
        return None;
    }
    let line = ctx.line(position).ok_debug("definition")?;
    let tag = tag_at(&line, clamp_column(&line, position.character))?;
    let wanted = pascal_case(tag);

    let binding = ctx.doc.imports.iter().find(|binding| {
        binding.imported == ImportedName::Default && pascal_case(&binding.local_name) == wanted
    })?;
    let Some(target) = ctx.resolve(&binding.specifier) else {
        LspError::unresolved(&binding.specifier).log_debug();
        return None;
    };
    location(&target, Position::new(0, 0))
}

/// Name of the `<tag` or `</tag` the column falls on.
fn tag_at(line: &str, column: usize) -> Option<&str> {
    let is_tag_char = |c: char| c.is_alphanumeric() || c == '-' || c == '_';
    let start = line[..column]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_tag_char(*c))
        .last()
        .map_or(column, |(i, _)| i);
    let end = line[column..]
        .char_indices()
        .find(|(_, c)| !is_tag_char(*c))
        .map_or(line.len(), |(i, _)| column + i);

    let before = line[..start].strip_suffix('/').unwrap_or(&line[..start]);
    (start < end && before.ends_with('<')).then(|| &line[start..end])
}

/// `my-button` and `myButton` -> `MyButton`.
fn pascal_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .flat_map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .into_iter()
                .flat_map(char::to_uppercase)
                .chain(chars)
        })
        .collect()
}

fn location(path: &Path, at: Position) -> Option<Location> {
    let uri = Url::from_file_path(path).ok()?;
    Some(Location::new(uri, Range::new(at, at)))
}
