pub mod config;
pub mod error;
pub mod handlers;
pub mod rebuild;
pub mod state;

pub use error::LspError;

use crate::server::config::is_config_file;
use crate::server::state::ServerState;
use std::path::PathBuf;
use std::time::Duration;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info};

pub struct PathAliasServer {
    pub client: Client,
    pub state: ServerState,
}

impl PathAliasServer {
    pub fn new(client: Client) -> Self {
        Self::with_state(client, ServerState::new())
    }

    pub fn with_state(client: Client, state: ServerState) -> Self {
        Self { client, state }
    }

    pub async fn register_watched_files(&self) {
        let mut watchers = vec![FileSystemWatcher {
            glob_pattern: GlobPattern::String("**/*".to_string()),
            kind: Some(WatchKind::Create | WatchKind::Delete),
        }];
        for pattern in [
            "**/pathalias.toml",
            "**/.pathaliasrc",
            "**/package.json",
            "**/webpack.*.js",
        ] {
            watchers.push(FileSystemWatcher {
                glob_pattern: GlobPattern::String(pattern.to_string()),
                kind: None,
            });
        }

        let options = match serde_json::to_value(DidChangeWatchedFilesRegistrationOptions { watchers }) {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!("Failed to encode watcher registration: {}", e);
                return;
            }
        };
        let registration = Registration {
            id: "pathalias-file-watcher".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(options),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            self.client
                .log_message(
                    MessageType::ERROR,
                    format!("Failed to register watcher: {}", e),
                )
                .await;
        }
    }

    async fn reload(&self) {
        self.state.rebuild_trees().await;
        let trees = self.state.trees.snapshot();
        let aliases: usize = trees.iter().map(|ws| ws.tree.len()).sum();
        self.client
            .log_message(
                MessageType::INFO,
                format!("Loaded {} aliases across {} workspace roots", aliases, trees.len()),
            )
            .await;
    }
}

fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
    let from_folders: Vec<PathBuf> = params
        .workspace_folders
        .iter()
        .flatten()
        .filter_map(|folder| folder.uri.to_file_path().ok())
        .collect();
    if !from_folders.is_empty() {
        return from_folders;
    }

    #[allow(deprecated)]
    let root_uri = params.root_uri.as_ref();
    root_uri
        .and_then(|uri| uri.to_file_path().ok())
        .into_iter()
        .collect()
}

#[tower_lsp::async_trait]
impl LanguageServer for PathAliasServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let roots = workspace_roots(&params);
        info!("Initializing with {} workspace roots", roots.len());
        self.state.set_workspace_roots(roots);
        self.state
            .config
            .set_init_settings(params.initialization_options)
            .await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        ["/", "'", "\"", "{", ","].iter().map(|c| c.to_string()).collect(),
                    ),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions {
                        work_done_progress: None,
                    },
                }),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![CodeActionKind::REFACTOR]),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..Default::default()
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "pathalias-lsp initialized!")
            .await;

        self.reload().await;

        let debounce = self.state.config.current().await.watcher.debounce_ms;
        self.state
            .start_rebuild_worker(Duration::from_millis(debounce));

        self.register_watched_files().await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.stop_rebuild_worker();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.state.document_manager.open(
            params.text_document.uri,
            params.text_document.language_id,
            params.text_document.text,
            params.text_document.version,
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        self.state.document_manager.change(
            &params.text_document.uri,
            params.content_changes,
            params.text_document.version,
        );
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.state
            .document_manager
            .close(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        info!("Configuration changed, rebuilding alias trees");
        self.state.config.set_init_settings(Some(params.settings)).await;
        self.state.request_immediate_rebuild();
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let mut config_changed = false;
        let mut tree_changed = false;

        for change in params.changes {
            let Ok(path) = change.uri.to_file_path() else {
                continue;
            };
            if path.components().any(|c| c.as_os_str() == "node_modules") {
                continue;
            }

            if is_config_file(&path) {
                config_changed = true;
            } else if matches!(change.typ, FileChangeType::CREATED | FileChangeType::DELETED) {
                tree_changed = true;
            }
        }

        if config_changed {
            debug!("Alias configuration changed");
            self.state.request_immediate_rebuild();
        } else if tree_changed {
            self.state.request_rebuild();
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        match handlers::handle_completion(params, &self.state).await {
            Some(items) => Ok(Some(CompletionResponse::Array(items))),
            None => Ok(None),
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        Ok(handlers::handle_definition(params, &self.state).await)
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        Ok(handlers::handle_signature_help(params, &self.state).await)
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        Ok(handlers::handle_code_action(params, &self.state).await)
    }
}
