use std::borrow::Cow;
use tracing::error;
use tree_sitter::{Language, Query};

pub mod javascript;
pub mod registry;
pub mod typescript;
pub mod vue;

pub use registry::LanguageRegistry;

/// A grammar the server can parse, and the queries it runs over it.
pub trait LanguageSupport: Send + Sync {
    fn id(&self) -> &'static str;

    fn extensions(&self) -> &'static [&'static str];

    fn language_ids(&self) -> &'static [&'static str];

    fn grammar(&self) -> Language;

    /// Captures `@import_stmt` and its `@source` string for every statement
    /// that names a module.
    fn import_query(&self) -> &Query;

    /// Text handed to the parser. Byte offsets and line breaks must match
    /// `content` so positions carry over unchanged.
    fn script_source<'a>(&self, content: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(content)
    }

    fn strip_quotes<'a>(&self, text: &'a str) -> &'a str {
        text.trim_matches(|c| c == '"' || c == '\'' || c == '`')
    }
}

/// Import query shared by the JavaScript and TypeScript grammars.
pub(crate) const IMPORT_QUERY_SOURCE: &str = include_str!("../../queries/imports.scm");

/// Compiles a tree-sitter query, logging an error and returning an empty fallback on failure.
/// A broken query then matches nothing instead of taking the server down.
pub(crate) fn compile_query(
    grammar: &Language,
    source: &str,
    lang_id: &str,
    query_name: &str,
) -> Query {
    match Query::new(grammar, source) {
        Ok(query) => query,
        Err(e) => {
            error!(
                language = lang_id,
                query = query_name,
                error = %e,
                "Failed to compile query, using empty fallback"
            );
            Query::new(grammar, "").unwrap_or_else(|_| {
                panic!(
                    "Failed to create empty fallback query for {} {}",
                    lang_id, query_name
                )
            })
        }
    }
}
