use crate::analysis::path_resolver::resolve_relative;
use crate::analysis::WorkspaceTree;
use crate::error_ext::ResultExt;
use crate::server::handlers::util::{clamp_column, quoted_at, DocumentContext};
use crate::server::state::ServerState;
use std::collections::HashMap;
use std::path::{Component, Path};
use std::time::Instant;
use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams, CodeActionResponse,
    TextEdit, WorkspaceEdit,
};

pub async fn handle_code_action(
    params: CodeActionParams,
    state: &ServerState,
) -> Option<CodeActionResponse> {
    let uri = &params.text_document.uri;
    let range = params.range;
    tracing::debug!(
        "[HANDLE_CODE_ACTION_ENTER] uri={} pos={}:{}",
        uri,
        range.start.line,
        range.start.character
    );
    let start = Instant::now();

    if !state.config.current().await.features.code_action || range.start != range.end {
        tracing::debug!(
            "[HANDLE_CODE_ACTION_EXIT] skipped elapsed_ms={}",
            start.elapsed().as_millis()
        );
        return None;
    }

    let actions = DocumentContext::load(uri, state)
        .ok_debug("code action")
        .and_then(|ctx| {
            let line = ctx.line(range.start).ok_debug("code action")?;
            let quoted = quoted_at(&line, clamp_column(&line, range.start.character))?;
            let target = resolve_relative(&ctx.path, &quoted.text)?;
            let ws = ctx.workspace()?;

            let edit_range = quoted.range(range.start.line);
            let actions: Vec<CodeActionOrCommand> = alias_forms(ws, &target)
                .into_iter()
                .map(|aliased| {
                    let new_text = format!("{}{}{}", quoted.quote, aliased, quoted.quote);
                    let changes = HashMap::from([(uri.clone(), vec![TextEdit::new(edit_range, new_text)])]);
                    CodeActionOrCommand::CodeAction(CodeAction {
                        title: format!("Convert to {}", aliased),
                        kind: Some(CodeActionKind::REFACTOR),
                        edit: Some(WorkspaceEdit {
                            changes: Some(changes),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })
                })
                .collect();
            Some(actions)
        })
        .unwrap_or_default();

    tracing::debug!(
        "[HANDLE_CODE_ACTION_EXIT] count={} elapsed_ms={}",
        actions.len(),
        start.elapsed().as_millis()
    );
    if actions.is_empty() {
        None
    } else {
        Some(actions)
    }
}

/// `target` written against every directory alias whose root contains it.
fn alias_forms(ws: &WorkspaceTree, target: &Path) -> Vec<String> {
    ws.tree
        .roots()
        .filter(|(_, entry)| entry.is_directory())
        .filter_map(|(alias, entry)| {
            let rest = target.strip_prefix(&entry.absolute_path).ok()?;
            Some(join_alias(alias, rest))
        })
        .collect()
}

fn join_alias(alias: &str, rest: &Path) -> String {
    let segments: Vec<&str> = rest
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        alias.to_string()
    } else {
        format!("{}/{}", alias.trim_end_matches('/'), segments.join("/"))
    }
}
