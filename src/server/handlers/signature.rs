use crate::constants::MAX_CALL_LOOKBACK_LINES;
use crate::error_ext::ResultExt;
use crate::server::error::LspError;
use crate::server::handlers::util::{clamp_column, line_text, DocumentContext};
use crate::server::state::ServerState;
use crate::types::FunctionSignature;
use std::time::Instant;
use tower_lsp::lsp_types::{
    Documentation, ParameterInformation, ParameterLabel, Position, SignatureHelp,
    SignatureHelpParams, SignatureInformation,
};

pub async fn handle_signature_help(
    params: SignatureHelpParams,
    state: &ServerState,
) -> Option<SignatureHelp> {
    let uri = &params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;
    tracing::debug!(
        "[HANDLE_SIGNATURE_HELP_ENTER] uri={} pos={}:{}",
        uri,
        position.line,
        position.character
    );
    let start = Instant::now();

    if !state.config.current().await.features.signature_help {
        LspError::feature_disabled("signature_help").log_debug();
        tracing::debug!(
            "[HANDLE_SIGNATURE_HELP_EXIT] disabled elapsed_ms={}",
            start.elapsed().as_millis()
        );
        return None;
    }

    let help = DocumentContext::load(uri, state).ok_debug("signature help").and_then(|ctx| {
        let call = enclosing_call(&ctx.doc.content, position)?;
        let signature = find_signature(&ctx, &call.callee, state)?;
        Some(to_signature_help(&signature, call.commas))
    });

    tracing::debug!(
        "[HANDLE_SIGNATURE_HELP_EXIT] found={} elapsed_ms={}",
        help.is_some(),
        start.elapsed().as_millis()
    );
    help
}

/// The call whose argument list contains the cursor.
#[derive(Debug, PartialEq, Eq)]
struct CallSite {
    callee: String,
    /// Top-level commas between the open paren and the cursor.
    commas: usize,
}

fn enclosing_call(content: &str, position: Position) -> Option<CallSite> {
    let first_line = position.line.saturating_sub(MAX_CALL_LOOKBACK_LINES);
    // Closers seen and not yet matched, over `()`, `[]` and `{}`.
    let mut balance = 0i32;
    let mut commas = 0usize;

    for line_nr in (first_line..=position.line).rev() {
        let text = line_text(content, line_nr)?;
        let end = if line_nr == position.line {
            clamp_column(&text, position.character)
        } else {
            text.len()
        };

        for (i, ch) in text[..end].char_indices().rev() {
            match ch {
                '(' => {
                    balance -= 1;
                    if balance < 0 {
                        let callee = word_before(&text[..i])?;
                        return Some(CallSite { callee, commas });
                    }
                }
                // Cursor inside a literal argument: commas so far belong to the literal.
                '[' | '{' => {
                    balance -= 1;
                    if balance < 0 {
                        balance = 0;
                        commas = 0;
                    }
                }
                ')' | ']' | '}' => balance += 1,
                ',' if balance == 0 => commas += 1,
                _ => {}
            }
        }
    }
    None
}

/// Identifier ending right before `text`'s trailing whitespace.
fn word_before(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '$')
        .last()
        .map(|(i, _)| i)?;
    Some(trimmed[start..].to_string())
}

/// Signature of the aliased import bound to `callee`.
fn find_signature(ctx: &DocumentContext, callee: &str, state: &ServerState) -> Option<FunctionSignature> {
    ctx.aliased_imports()
        .filter(|(binding, _)| binding.local_name == callee)
        .find_map(|(binding, target)| {
            let name = binding.export_name()?;
            let exports = state.exports.exports_for_file(&target, true)?;
            exports.signature(name).cloned()
        })
}

fn to_signature_help(signature: &FunctionSignature, commas: usize) -> SignatureHelp {
    let parameters: Vec<ParameterInformation> = signature
        .parameters
        .iter()
        .map(|p| ParameterInformation {
            label: ParameterLabel::Simple(p.label()),
            documentation: None,
        })
        .collect();
    let active = commas.min(parameters.len().saturating_sub(1)) as u32;

    SignatureHelp {
        signatures: vec![SignatureInformation {
            label: signature.label(),
            documentation: (!signature.documentation.is_empty())
                .then(|| Documentation::String(signature.documentation.clone())),
            parameters: Some(parameters),
            active_parameter: None,
        }],
        active_signature: Some(0),
        active_parameter: Some(active),
    }
}
