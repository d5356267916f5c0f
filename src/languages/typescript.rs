use crate::languages::{compile_query, LanguageSupport, IMPORT_QUERY_SOURCE};
use std::sync::OnceLock;
use tree_sitter::{Language, Query};

pub struct TypeScript;
pub struct TypeScriptReact;

static TS_IMPORT_QUERY: OnceLock<Query> = OnceLock::new();
static TSX_IMPORT_QUERY: OnceLock<Query> = OnceLock::new();

/// Implements LanguageSupport for TypeScript-family languages.
/// TypeScript and TypeScriptReact differ only in id, extensions, language_ids and grammar.
macro_rules! impl_typescript_language {
    (
        $struct_name:ty,
        id: $id:literal,
        language_ids: $lang_ids:expr,
        extensions: $extensions:expr,
        grammar: $grammar:expr,
        import_query: $import_query:ident
    ) => {
        impl LanguageSupport for $struct_name {
            fn id(&self) -> &'static str {
                $id
            }

            fn extensions(&self) -> &'static [&'static str] {
                $extensions
            }

            fn language_ids(&self) -> &'static [&'static str] {
                $lang_ids
            }

            fn grammar(&self) -> Language {
                $grammar.into()
            }

            fn import_query(&self) -> &Query {
                $import_query.get_or_init(|| {
                    compile_query(&self.grammar(), IMPORT_QUERY_SOURCE, $id, "imports")
                })
            }
        }
    };
}

impl_typescript_language!(
    TypeScript,
    id: "typescript",
    language_ids: &["typescript"],
    extensions: &["ts", "mts", "cts"],
    grammar: tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
    import_query: TS_IMPORT_QUERY
);

impl_typescript_language!(
    TypeScriptReact,
    id: "typescriptreact",
    language_ids: &["typescriptreact"],
    extensions: &["tsx"],
    grammar: tree_sitter_typescript::LANGUAGE_TSX,
    import_query: TSX_IMPORT_QUERY
);
