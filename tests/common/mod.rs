#![allow(dead_code)]

use pathalias_lsp::ServerState;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower_lsp::lsp_types::{
    Position, TextDocumentIdentifier, TextDocumentPositionParams, Url,
};

/// A temporary workspace with a `ServerState` rooted at it.
pub struct TestFixture {
    _dir: TempDir,
    pub root: PathBuf,
    pub state: ServerState,
}

impl TestFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let state = ServerState::new();
        state.set_workspace_roots(vec![root.clone()]);
        Self {
            _dir: dir,
            root,
            state,
        }
    }

    /// Point `@` at `src/` and build the trees. Files must already exist.
    pub async fn alias_src(&self) {
        self.mkdir("src");
        self.configure(serde_json::json!({
            "alias": { "map": { "@": "${cwd}/src" } }
        }))
        .await;
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn uri(&self, rel: &str) -> Url {
        Url::from_file_path(self.path(rel)).unwrap()
    }

    pub fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.path(rel)).unwrap();
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Apply editor settings and rebuild the alias trees.
    pub async fn configure(&self, settings: serde_json::Value) {
        self.state.config.set_init_settings(Some(settings)).await;
        self.rebuild().await;
    }

    pub async fn rebuild(&self) {
        self.state.rebuild_trees().await;
    }

    /// Write `rel` to disk and open it in the document manager.
    pub fn open(&self, rel: &str, content: &str) -> Url {
        self.write(rel, content);
        let uri = self.uri(rel);
        let language_id = match Path::new(rel).extension().and_then(|e| e.to_str()) {
            Some("ts") => "typescript",
            Some("tsx") => "typescriptreact",
            Some("vue") => "vue",
            _ => "javascript",
        };
        self.state
            .document_manager
            .open(uri.clone(), language_id.to_string(), content.to_string(), 1);
        uri
    }
}

/// Position just after the first occurrence of `needle` in `content`.
pub fn position_after(content: &str, needle: &str) -> Position {
    let offset = content.find(needle).expect("needle not found") + needle.len();
    position_at(content, offset)
}

/// Position of the first character of `needle` in `content`.
pub fn position_of(content: &str, needle: &str) -> Position {
    let offset = content.find(needle).expect("needle not found");
    position_at(content, offset)
}

fn position_at(content: &str, offset: usize) -> Position {
    let before = &content[..offset];
    let line = before.matches('\n').count() as u32;
    let column = before.rfind('\n').map(|i| offset - i - 1).unwrap_or(offset) as u32;
    Position::new(line, column)
}

pub fn text_position(uri: &Url, position: Position) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        position,
    }
}
