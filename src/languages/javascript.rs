use crate::languages::{compile_query, LanguageSupport, IMPORT_QUERY_SOURCE};
use std::sync::OnceLock;
use tree_sitter::{Language, Query};

pub struct JavaScript;

static IMPORT_QUERY: OnceLock<Query> = OnceLock::new();

impl LanguageSupport for JavaScript {
    fn id(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn language_ids(&self) -> &'static [&'static str] {
        &["javascript", "javascriptreact"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn import_query(&self) -> &Query {
        IMPORT_QUERY.get_or_init(|| {
            compile_query(&self.grammar(), IMPORT_QUERY_SOURCE, self.id(), "imports")
        })
    }
}
