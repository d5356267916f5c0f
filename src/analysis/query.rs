use crate::languages::LanguageSupport;
use crate::types::{ts_range_to_lsp, ImportBinding, ImportedName};
use compact_str::CompactString;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::error;
use tree_sitter::{Node, Parser, Query, QueryCursor, QueryMatch, Tree};

/// Pool of parsers to reuse allocations
pub struct ParserPool {
    parsers: HashMap<&'static str, Vec<Parser>>,
}

impl Default for ParserPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserPool {
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    pub fn acquire(&mut self, language: &dyn LanguageSupport) -> Option<Parser> {
        if let Some(parser) = self
            .parsers
            .get_mut(language.id())
            .and_then(|parsers| parsers.pop())
        {
            return Some(parser);
        }

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&language.grammar()) {
            error!(language = language.id(), error = %e, "Failed to set parser language");
            return None;
        }
        Some(parser)
    }

    pub fn release(&mut self, language_id: &'static str, mut parser: Parser) {
        parser.reset();
        self.parsers.entry(language_id).or_default().push(parser);
    }
}

/// Parses documents and runs tree-sitter queries over them.
pub struct QueryEngine {
    parser_pool: Mutex<ParserPool>,

    /// Query cursor pool to reduce allocations
    cursor_pool: Mutex<Vec<QueryCursor>>,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    pub fn new() -> Self {
        Self {
            parser_pool: Mutex::new(ParserPool::new()),
            cursor_pool: Mutex::new(Vec::new()),
        }
    }

    pub fn parse(&self, language: &dyn LanguageSupport, content: &str) -> Option<Tree> {
        // The pool lock is not held while parsing.
        let mut parser = self.parser_pool.lock().acquire(language)?;
        let tree = parser.parse(content, None);
        self.parser_pool.lock().release(language.id(), parser);
        tree
    }

    pub fn execute_query<'a, F, T>(
        &self,
        query: &Query,
        tree: &'a Tree,
        source: &'a [u8],
        mut extractor: F,
    ) -> Vec<T>
    where
        F: FnMut(&QueryMatch<'_, 'a>, &[u8]) -> Option<T>,
    {
        let mut cursor = self.cursor_pool.lock().pop().unwrap_or_else(QueryCursor::new);

        let mut results = Vec::new();

        {
            use streaming_iterator::StreamingIterator;
            let mut matches = cursor.matches(query, tree.root_node(), source);
            while let Some(m) = matches.next() {
                if let Some(item) = extractor(m, source) {
                    results.push(item);
                }
            }
        }

        self.cursor_pool.lock().push(cursor);

        results
    }

    /// Local names bound by import statements.
    pub fn extract_imports(
        &self,
        language: &dyn LanguageSupport,
        tree: &Tree,
        source: &[u8],
    ) -> Vec<ImportBinding> {
        let query = language.import_query();
        let idx_source = query.capture_index_for_name("source");
        let idx_stmt = query.capture_index_for_name("import_stmt");

        let per_statement = self.execute_query(query, tree, source, |m, src| {
            let mut stmt = None;
            let mut source_node = None;
            for capture in m.captures {
                let idx = Some(capture.index);
                if idx == idx_stmt {
                    stmt = Some(capture.node);
                } else if idx == idx_source {
                    source_node = Some(capture.node);
                }
            }
            let stmt = stmt?;
            if stmt.kind() != "import_statement" {
                return None;
            }
            let source_node = source_node?;
            let specifier = language.strip_quotes(source_node.utf8_text(src).ok()?);
            Some(bindings_of_import(stmt, source_node, specifier, src))
        });

        per_statement.into_iter().flatten().collect()
    }
}

fn bindings_of_import(
    stmt: Node,
    source_node: Node,
    specifier: &str,
    src: &[u8],
) -> Vec<ImportBinding> {
    let mut bindings = Vec::new();
    let specifier_range = ts_range_to_lsp(source_node.range());

    let mut push = |local: Node, imported: ImportedName| {
        if let Ok(name) = local.utf8_text(src) {
            bindings.push(ImportBinding {
                local_name: CompactString::from(name),
                imported,
                specifier: CompactString::from(specifier),
                local_range: ts_range_to_lsp(local.range()),
                specifier_range,
            });
        }
    };

    let mut cursor = stmt.walk();
    for clause in stmt
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "import_clause")
    {
        let mut clause_cursor = clause.walk();
        for part in clause.named_children(&mut clause_cursor) {
            match part.kind() {
                "identifier" => push(part, ImportedName::Default),
                "namespace_import" => {
                    let mut ns_cursor = part.walk();
                    let ident = part
                        .named_children(&mut ns_cursor)
                        .find(|n| n.kind() == "identifier");
                    if let Some(ident) = ident {
                        push(ident, ImportedName::Namespace);
                    }
                }
                "named_imports" => {
                    let mut spec_cursor = part.walk();
                    for spec in part
                        .named_children(&mut spec_cursor)
                        .filter(|n| n.kind() == "import_specifier")
                    {
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let Ok(imported) = name.utf8_text(src) else {
                            continue;
                        };
                        let imported = ImportedName::Named(CompactString::from(
                            imported.trim_matches(|c| c == '"' || c == '\''),
                        ));
                        let local = spec.child_by_field_name("alias").unwrap_or(name);
                        push(local, imported);
                    }
                }
                _ => {}
            }
        }
    }

    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::javascript::JavaScript;
    use crate::languages::typescript::TypeScript;

    fn imports_of(lang: &dyn LanguageSupport, code: &str) -> Vec<ImportBinding> {
        let engine = QueryEngine::new();
        let tree = engine.parse(lang, code).unwrap();
        engine.extract_imports(lang, &tree, code.as_bytes())
    }

    #[test]
    fn test_parse_reuses_parser() {
        let engine = QueryEngine::new();
        assert!(engine.parse(&JavaScript, "const a = 1;").is_some());
        assert!(engine.parse(&JavaScript, "const b = 2;").is_some());
        assert_eq!(
            engine.parser_pool.lock().parsers.get("javascript").map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn test_named_default_and_namespace_imports() {
        let code = r#"
import helper, { add, sub as minus } from '@/utils/math';
import * as fmt from "@/utils/format";
import './side-effect';
"#;
        let bindings = imports_of(&JavaScript, code);
        assert_eq!(bindings.len(), 4);

        assert_eq!(bindings[0].local_name, "helper");
        assert_eq!(bindings[0].imported, ImportedName::Default);
        assert_eq!(bindings[0].specifier, "@/utils/math");

        assert_eq!(bindings[1].local_name, "add");
        assert_eq!(bindings[1].imported, ImportedName::Named("add".into()));

        assert_eq!(bindings[2].local_name, "minus");
        assert_eq!(bindings[2].imported, ImportedName::Named("sub".into()));
        assert_eq!(bindings[2].local_range.start.line, 1);

        assert_eq!(bindings[3].local_name, "fmt");
        assert_eq!(bindings[3].imported, ImportedName::Namespace);
        assert_eq!(bindings[3].specifier, "@/utils/format");
    }

    #[test]
    fn test_typescript_type_imports() {
        let code = "import { type Props, render } from '@/view';";
        let bindings = imports_of(&TypeScript, code);
        let names: Vec<&str> = bindings.iter().map(|b| b.local_name.as_str()).collect();
        assert!(names.contains(&"render"));
    }
}
