use crate::analysis::QueryEngine;
use crate::languages::{LanguageRegistry, LanguageSupport};
use crate::types::ImportBinding;
use compact_str::CompactString;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};
use tree_sitter::Tree;

/// An open document and what was parsed out of it.
///
/// Cheap to clone: content and analysis results are shared.
#[derive(Clone)]
pub struct DocumentState {
    pub uri: Url,
    pub language_id: CompactString,
    pub content: Arc<String>,
    pub version: i32,
    pub tree: Option<Tree>,
    pub imports: Arc<Vec<ImportBinding>>,
}

impl DocumentState {
    pub fn new(uri: Url, language_id: CompactString, content: String, version: i32) -> Self {
        Self {
            uri,
            language_id,
            content: Arc::new(content),
            version,
            tree: None,
            imports: Arc::new(Vec::new()),
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.uri.to_file_path().ok()
    }

    /// Binding for `local_name`, if an import statement introduces it.
    pub fn import_for(&self, local_name: &str) -> Option<&ImportBinding> {
        self.imports.iter().find(|b| b.local_name == local_name)
    }
}

struct Analysis {
    tree: Option<Tree>,
    imports: Vec<ImportBinding>,
}

pub struct DocumentManager {
    documents: DashMap<Url, DocumentState>,
    query_engine: Arc<QueryEngine>,
    languages: Arc<LanguageRegistry>,
}

impl DocumentManager {
    pub fn new(query_engine: Arc<QueryEngine>, languages: Arc<LanguageRegistry>) -> Self {
        Self {
            documents: DashMap::new(),
            query_engine,
            languages,
        }
    }

    pub fn open(&self, uri: Url, language_id: String, content: String, version: i32) {
        let mut doc = DocumentState::new(uri.clone(), CompactString::from(&language_id), content, version);

        if let Some(lang) = self.language_for(&uri, &language_id) {
            let analysis = self.analyze(&doc.content, lang.as_ref());
            doc.tree = analysis.tree;
            doc.imports = Arc::new(analysis.imports);
        }

        self.documents.insert(uri, doc);
    }

    pub fn change(&self, uri: &Url, changes: Vec<TextDocumentContentChangeEvent>, version: i32) {
        let (content, language_id) = {
            let Some(mut entry) = self.documents.get_mut(uri) else {
                return;
            };
            // Full sync: the last whole-document change wins.
            for change in changes {
                if change.range.is_none() {
                    entry.content = Arc::new(change.text);
                }
            }
            entry.version = version;
            (entry.content.clone(), entry.language_id.clone())
        };

        let Some(lang) = self.language_for(uri, &language_id) else {
            return;
        };
        let analysis = self.analyze(&content, lang.as_ref());

        if let Some(mut entry) = self.documents.get_mut(uri) {
            if entry.version == version {
                entry.tree = analysis.tree;
                entry.imports = Arc::new(analysis.imports);
            }
        }
    }

    pub fn close(&self, uri: &Url) {
        self.documents.remove(uri);
    }

    /// Snapshot of an open document.
    pub fn get(&self, uri: &Url) -> Option<DocumentState> {
        self.documents.get(uri).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn language_for(&self, uri: &Url, language_id: &str) -> Option<Arc<dyn LanguageSupport>> {
        self.languages
            .get_by_language_id(language_id)
            .or_else(|| self.languages.get_for_uri(uri))
    }

    fn analyze(&self, content: &str, language: &dyn LanguageSupport) -> Analysis {
        let script = language.script_source(content);
        let Some(tree) = self.query_engine.parse(language, &script) else {
            return Analysis {
                tree: None,
                imports: Vec::new(),
            };
        };
        let imports = self.query_engine.extract_imports(language, &tree, script.as_bytes());

        Analysis {
            tree: Some(tree),
            imports,
        }
    }
}
