//! Shallow extraction of exported symbols.
//!
//! Only the first two levels of the syntax tree are inspected. Each candidate
//! node is first classified into a [`SyntaxItem`]; token and signature
//! emission then match on the item, never on raw node kinds.

use crate::analysis::query::QueryEngine;
use crate::constants::{DEFAULT_EXPORT_NAME, MAX_EXTRACT_DEPTH};
use crate::languages::{LanguageRegistry, LanguageSupport};
use crate::types::{
    ts_point_to_position, ExportKind, ExportToken, FileExports, FunctionSignature, ParameterInfo,
};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use tree_sitter::Node;

/// Which declarations count as exported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportRule {
    /// Only declarations carrying the `export` keyword.
    #[default]
    ExplicitModifier,
    /// Also plain function and variable declarations at the top level.
    ExplicitOrTopLevel,
}

/// A declaration that could not be read.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("syntax error in declaration at line {line}")]
    Syntax { line: usize },

    #[error("{kind} at line {line} has no name")]
    MissingName { kind: &'static str, line: usize },

    #[error("invalid UTF-8 at line {line}")]
    Utf8 { line: usize },
}

/// Syntax nodes the extractor knows how to read.
#[derive(Debug, Clone, Copy)]
pub enum SyntaxItem<'t> {
    /// `function f() {}`, optionally behind `export`.
    FunctionDeclaration {
        statement: Node<'t>,
        declaration: Node<'t>,
        exported: bool,
    },
    /// `const a = 1, b = 2;` / `let` / `var`, optionally behind `export`.
    VariableStatement {
        statement: Node<'t>,
        declaration: Node<'t>,
        exported: bool,
    },
    /// `export { a, b as c }` and `export * as ns from '…'`.
    ExportDeclaration { statement: Node<'t> },
    /// `export default …` and `export = …`. `function` is set when the
    /// default value is a function declaration or expression.
    ExportAssignment {
        statement: Node<'t>,
        keyword: Node<'t>,
        function: Option<Node<'t>>,
    },
}

impl<'t> SyntaxItem<'t> {
    /// Classify `node`, or `None` when it declares nothing of interest.
    pub fn classify(node: Node<'t>) -> Option<Self> {
        match node.kind() {
            kind if is_function_kind(kind) => Some(Self::FunctionDeclaration {
                statement: node,
                declaration: node,
                exported: false,
            }),
            kind if is_variable_kind(kind) => Some(Self::VariableStatement {
                statement: node,
                declaration: node,
                exported: false,
            }),
            "export_statement" => Self::classify_export(node),
            _ => None,
        }
    }

    fn classify_export(statement: Node<'t>) -> Option<Self> {
        let mut cursor = statement.walk();
        let keyword = statement
            .children(&mut cursor)
            .find(|c| matches!(c.kind(), "default" | "="));
        if let Some(keyword) = keyword {
            let function = statement
                .child_by_field_name("declaration")
                .or_else(|| statement.child_by_field_name("value"))
                .filter(|n| is_function_kind(n.kind()) || is_function_value(n.kind()));
            return Some(Self::ExportAssignment {
                statement,
                keyword,
                function,
            });
        }

        if let Some(mut declaration) = statement.child_by_field_name("declaration") {
            // `export declare function f(): void;`
            if declaration.kind() == "ambient_declaration" {
                declaration = declaration.named_child(0)?;
            }
            return match declaration.kind() {
                kind if is_function_kind(kind) => Some(Self::FunctionDeclaration {
                    statement,
                    declaration,
                    exported: true,
                }),
                kind if is_variable_kind(kind) => Some(Self::VariableStatement {
                    statement,
                    declaration,
                    exported: true,
                }),
                _ => None,
            };
        }

        let mut cursor = statement.walk();
        let has_names = statement
            .named_children(&mut cursor)
            .any(|c| matches!(c.kind(), "export_clause" | "namespace_export"));
        has_names.then_some(Self::ExportDeclaration { statement })
    }

    pub fn statement(&self) -> Node<'t> {
        match *self {
            Self::FunctionDeclaration { statement, .. }
            | Self::VariableStatement { statement, .. }
            | Self::ExportDeclaration { statement }
            | Self::ExportAssignment { statement, .. } => statement,
        }
    }

    /// Whether the item is visible to importers under `rule`.
    pub fn is_exported(&self, rule: ExportRule, depth: usize) -> bool {
        match *self {
            Self::FunctionDeclaration { exported, .. } | Self::VariableStatement { exported, .. } => {
                exported || (rule == ExportRule::ExplicitOrTopLevel && depth == 1)
            }
            Self::ExportDeclaration { .. } | Self::ExportAssignment { .. } => true,
        }
    }
}

fn is_function_kind(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration" | "generator_function_declaration" | "function_signature"
    )
}

fn is_variable_kind(kind: &str) -> bool {
    matches!(kind, "lexical_declaration" | "variable_declaration")
}

fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// Extracts exported tokens and signatures from JavaScript and TypeScript.
#[derive(Clone)]
pub struct ExportExtractor {
    registry: Arc<LanguageRegistry>,
    engine: Arc<QueryEngine>,
    rule: ExportRule,
}

impl ExportExtractor {
    pub fn new(registry: Arc<LanguageRegistry>, engine: Arc<QueryEngine>, rule: ExportRule) -> Self {
        Self {
            registry,
            engine,
            rule,
        }
    }

    pub fn rule(&self) -> ExportRule {
        self.rule
    }

    pub fn with_rule(&self, rule: ExportRule) -> Self {
        Self {
            rule,
            ..self.clone()
        }
    }

    /// Extract the exports of `text`, the content of `path`.
    ///
    /// The grammar is picked from the file extension; unknown extensions
    /// yield nothing.
    pub fn extract(&self, path: &Path, text: &str, want_signatures: bool) -> FileExports {
        let Some(language) = self.registry.get_for_path(path) else {
            debug!("No grammar for {}", path.display());
            return FileExports::default();
        };
        self.extract_with(language.as_ref(), path, text, want_signatures)
    }

    pub fn extract_with(
        &self,
        language: &dyn LanguageSupport,
        path: &Path,
        text: &str,
        want_signatures: bool,
    ) -> FileExports {
        let script = language.script_source(text);
        let Some(tree) = self.engine.parse(language, &script) else {
            debug!("Parse failed for {}", path.display());
            return FileExports::default();
        };
        let source = script.as_bytes();
        let mut exports = FileExports::default();

        let mut visit = |node: Node, depth: usize| -> bool {
            let Some(item) = SyntaxItem::classify(node) else {
                return false;
            };
            if item.is_exported(self.rule, depth) {
                match emit(item, source, path, want_signatures) {
                    Ok(emitted) => {
                        exports.tokens.extend(emitted.tokens);
                        exports.signatures.extend(emitted.signatures);
                        if emitted.default_function.is_some() {
                            exports.default_function = emitted.default_function;
                        }
                    }
                    Err(e) => debug!("Skipping declaration in {}: {}", path.display(), e),
                }
            }
            true
        };

        walk_levels(tree.root_node(), 1, &mut visit);

        exports
    }
}

/// Visit named children down to `MAX_EXTRACT_DEPTH`. Classified nodes and
/// error nodes are not descended into.
fn walk_levels(node: Node, depth: usize, visit: &mut dyn FnMut(Node, usize) -> bool) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if visit(child, depth) || child.is_error() {
            continue;
        }
        if depth < MAX_EXTRACT_DEPTH {
            walk_levels(child, depth + 1, visit);
        }
    }
}

struct Emitted {
    tokens: Vec<ExportToken>,
    signatures: Vec<FunctionSignature>,
    default_function: Option<CompactString>,
}

fn emit(item: SyntaxItem, src: &[u8], path: &Path, want_signatures: bool) -> Result<Emitted, ExtractError> {
    let statement = item.statement();
    let line = statement.start_position().row;
    if statement.has_error() {
        return Err(ExtractError::Syntax { line });
    }
    let description = text_of(statement, src)?.to_string();

    let mut tokens = Vec::new();
    let mut signatures = Vec::new();
    let mut default_function = None;

    match item {
        SyntaxItem::FunctionDeclaration { declaration, .. } => {
            let name = declaration
                .child_by_field_name("name")
                .ok_or(ExtractError::MissingName {
                    kind: "function",
                    line,
                })?;
            let identifier = CompactString::from(text_of(name, src)?);
            let mut token = token(identifier.clone(), ExportKind::Function, name, description);
            if want_signatures {
                let signature = read_signature(identifier, declaration, statement, src, path)?;
                token.params = Some(signature.parameters.iter().map(ParameterInfo::label).collect());
                signatures.push(signature);
            }
            tokens.push(token);
        }
        SyntaxItem::VariableStatement { declaration, .. } => {
            let mut cursor = declaration.walk();
            for declarator in declaration
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "variable_declarator")
            {
                let pattern = declarator
                    .child_by_field_name("name")
                    .ok_or(ExtractError::MissingName {
                        kind: "variable",
                        line,
                    })?;
                let mut names = Vec::new();
                pattern_identifiers(pattern, &mut names);

                let function_value = declarator
                    .child_by_field_name("value")
                    .filter(|v| is_function_value(v.kind()));

                for name in names {
                    let identifier = CompactString::from(text_of(name, src)?);
                    let mut token =
                        token(identifier.clone(), ExportKind::Variable, name, description.clone());
                    if let (true, Some(value)) = (want_signatures, function_value) {
                        let signature = read_signature(identifier, value, statement, src, path)?;
                        token.params =
                            Some(signature.parameters.iter().map(ParameterInfo::label).collect());
                        signatures.push(signature);
                    }
                    tokens.push(token);
                }
            }
        }
        SyntaxItem::ExportDeclaration { statement } => {
            let mut cursor = statement.walk();
            for part in statement.named_children(&mut cursor) {
                match part.kind() {
                    "export_clause" => {
                        let mut spec_cursor = part.walk();
                        for spec in part
                            .named_children(&mut spec_cursor)
                            .filter(|n| n.kind() == "export_specifier")
                        {
                            let exported = spec
                                .child_by_field_name("alias")
                                .or_else(|| spec.child_by_field_name("name"))
                                .ok_or(ExtractError::MissingName {
                                    kind: "export specifier",
                                    line,
                                })?;
                            let identifier = CompactString::from(unquote(text_of(exported, src)?));
                            tokens.push(token(
                                identifier,
                                ExportKind::Variable,
                                exported,
                                description.clone(),
                            ));
                        }
                    }
                    "namespace_export" => {
                        let name = part.named_child(0).ok_or(ExtractError::MissingName {
                            kind: "namespace export",
                            line,
                        })?;
                        let identifier = CompactString::from(unquote(text_of(name, src)?));
                        tokens.push(token(identifier, ExportKind::Variable, name, description.clone()));
                    }
                    _ => {}
                }
            }
        }
        SyntaxItem::ExportAssignment {
            keyword, function, ..
        } => {
            let mut default = token(
                CompactString::const_new(DEFAULT_EXPORT_NAME),
                ExportKind::Variable,
                keyword,
                description.clone(),
            );
            if let Some(function) = function {
                // `export default function add() {}` also declares `add`.
                let named = match function.child_by_field_name("name") {
                    Some(name) => Some((CompactString::from(text_of(name, src)?), name)),
                    None => None,
                };
                let signature_name = named
                    .as_ref()
                    .map(|(identifier, _)| identifier.clone())
                    .unwrap_or(CompactString::const_new(DEFAULT_EXPORT_NAME));
                let signature = if want_signatures {
                    Some(read_signature(signature_name, function, statement, src, path)?)
                } else {
                    None
                };
                let params: Option<Vec<String>> = signature
                    .as_ref()
                    .map(|s| s.parameters.iter().map(ParameterInfo::label).collect());

                if let Some((identifier, name)) = named {
                    let mut named_token = token(identifier.clone(), ExportKind::Function, name, description);
                    named_token.params = params.clone();
                    tokens.push(named_token);
                    default_function = Some(identifier);
                }
                default.params = params;
                signatures.extend(signature);
            }
            tokens.push(default);
        }
    }

    Ok(Emitted {
        tokens,
        signatures,
        default_function,
    })
}

fn token(identifier: CompactString, kind: ExportKind, at: Node, description: String) -> ExportToken {
    ExportToken {
        identifier,
        kind,
        position: ts_point_to_position(at.start_position()),
        description,
        params: None,
    }
}

fn text_of<'s>(node: Node, src: &'s [u8]) -> Result<&'s str, ExtractError> {
    node.utf8_text(src).map_err(|_| ExtractError::Utf8 {
        line: node.start_position().row,
    })
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '\'')
}

/// Identifiers bound by a declarator's name, looking through destructuring.
fn pattern_identifiers<'t>(pattern: Node<'t>, out: &mut Vec<Node<'t>>) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(pattern),
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                pattern_identifiers(value, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                pattern_identifiers(left, out);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut cursor = pattern.walk();
            for child in pattern.named_children(&mut cursor) {
                pattern_identifiers(child, out);
            }
        }
        _ => {}
    }
}

/// Signature of a function-like node: a declaration, arrow function or
/// function expression.
fn read_signature(
    name: CompactString,
    function: Node,
    statement: Node,
    src: &[u8],
    path: &Path,
) -> Result<FunctionSignature, ExtractError> {
    let mut parameters = Vec::new();

    if let Some(params) = function.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            if let Some(info) = read_parameter(param, src)? {
                parameters.push(info);
            }
        }
    } else if let Some(param) = function.child_by_field_name("parameter") {
        // `x => x * 2`
        parameters.push(ParameterInfo {
            name: CompactString::from(text_of(param, src)?),
            type_text: "any".to_string(),
            optional: false,
        });
    }

    let return_type = match function.child_by_field_name("return_type") {
        Some(annotation) => annotation_text(text_of(annotation, src)?),
        None => "any".to_string(),
    };

    let params_text: Vec<String> = parameters.iter().map(ParameterInfo::label).collect();
    let type_text = format!("({}) => {}", params_text.join(", "), return_type);

    Ok(FunctionSignature {
        name,
        file_name: path.to_path_buf(),
        type_text,
        parameters,
        return_type,
        documentation: doc_comment(statement, src),
    })
}

fn read_parameter(param: Node, src: &[u8]) -> Result<Option<ParameterInfo>, ExtractError> {
    let info = match param.kind() {
        "comment" => return Ok(None),
        "identifier" | "object_pattern" | "array_pattern" | "rest_pattern" => ParameterInfo {
            name: CompactString::from(text_of(param, src)?),
            type_text: "any".to_string(),
            optional: false,
        },
        "assignment_pattern" => {
            let left = param.child_by_field_name("left").unwrap_or(param);
            ParameterInfo {
                name: CompactString::from(text_of(left, src)?),
                type_text: "any".to_string(),
                optional: true,
            }
        }
        "required_parameter" | "optional_parameter" => {
            let pattern = param.child_by_field_name("pattern").unwrap_or(param);
            let type_text = match param.child_by_field_name("type") {
                Some(annotation) => annotation_text(text_of(annotation, src)?),
                None => "any".to_string(),
            };
            ParameterInfo {
                name: CompactString::from(text_of(pattern, src)?),
                type_text,
                optional: param.kind() == "optional_parameter"
                    || param.child_by_field_name("value").is_some(),
            }
        }
        _ => ParameterInfo {
            name: CompactString::from(text_of(param, src)?),
            type_text: "any".to_string(),
            optional: false,
        },
    };
    Ok(Some(info))
}

/// `: number` -> `number`
fn annotation_text(text: &str) -> String {
    text.trim_start()
        .strip_prefix(':')
        .unwrap_or(text)
        .trim()
        .to_string()
}

/// Body of a `/** … */` comment directly above `statement`.
fn doc_comment(statement: Node, src: &[u8]) -> String {
    let Some(comment) = statement.prev_sibling().filter(|n| n.kind() == "comment") else {
        return String::new();
    };
    if comment.end_position().row + 1 < statement.start_position().row {
        return String::new();
    }
    let Ok(text) = comment.utf8_text(src) else {
        return String::new();
    };
    let Some(body) = text
        .strip_prefix("/**")
        .and_then(|t| t.strip_suffix("*/"))
    else {
        return String::new();
    };

    body.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').map(str::trim_start).unwrap_or(line)
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
