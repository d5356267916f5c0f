use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tower_lsp::lsp_types::{Position, Range};

/// Whether a stat tree node mirrors a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One node of an alias stat tree.
///
/// Directories own their children keyed by segment name; files never have
/// children. The root of a tree carries the alias token as its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub name: CompactString,
    pub kind: EntryKind,
    pub absolute_path: PathBuf,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<CompactString, AliasEntry>,
}

impl AliasEntry {
    pub fn file(name: impl Into<CompactString>, absolute_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            absolute_path,
            children: BTreeMap::new(),
        }
    }

    pub fn directory(name: impl Into<CompactString>, absolute_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            absolute_path,
            children: BTreeMap::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn child(&self, name: &str) -> Option<&AliasEntry> {
        self.children.get(name)
    }

    /// Child `name` if it exists and is a file.
    pub fn child_file(&self, name: &str) -> Option<&Path> {
        self.children
            .get(name)
            .filter(|c| c.is_file())
            .map(|c| c.absolute_path.as_path())
    }
}

/// Kind of an exported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Function,
    Variable,
}

/// A symbol a file exposes to importers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportToken {
    /// Exported name, or `"default"` for default exports.
    pub identifier: CompactString,
    pub kind: ExportKind,
    /// Zero-based position of the identifier.
    pub position: Position,
    /// Source text of the declaring statement.
    pub description: String,
    /// `name: type` strings, only filled when signatures were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: CompactString,
    pub type_text: String,
    pub optional: bool,
}

impl ParameterInfo {
    /// Label shown in signature help, e.g. `b?: string`.
    pub fn label(&self) -> String {
        format!(
            "{}{}: {}",
            self.name,
            if self.optional { "?" } else { "" },
            self.type_text
        )
    }
}

/// Call signature of an exported function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: CompactString,
    pub file_name: PathBuf,
    /// Human readable type, e.g. `(a: number, b: number) => number`.
    pub type_text: String,
    pub parameters: Vec<ParameterInfo>,
    pub return_type: String,
    pub documentation: String,
}

impl FunctionSignature {
    pub fn label(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(ParameterInfo::label).collect();
        format!("{} ({}): {}", self.name, params.join(", "), self.return_type)
    }
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileExports {
    pub tokens: Vec<ExportToken>,
    /// Empty unless signatures were requested.
    pub signatures: Vec<FunctionSignature>,
    /// Name of the function declared by `export default function name`.
    pub default_function: Option<CompactString>,
}

impl FileExports {
    pub fn find(&self, identifier: &str) -> Option<&ExportToken> {
        self.tokens.iter().find(|t| t.identifier == identifier)
    }

    /// Signature importers see under `export_name`. A default import of a
    /// named function resolves to that function's signature.
    pub fn signature(&self, export_name: &str) -> Option<&FunctionSignature> {
        let name = match &self.default_function {
            Some(function) if export_name == crate::constants::DEFAULT_EXPORT_NAME => function.as_str(),
            _ => export_name,
        };
        self.signatures.iter().find(|s| s.name == name)
    }
}

/// What an import statement pulls out of its module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    /// `import { a } from` / `import { a as b } from`
    Named(CompactString),
    /// `import a from`
    Default,
    /// `import * as ns from`
    Namespace,
}

/// A local name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local_name: CompactString,
    pub imported: ImportedName,
    /// Module specifier without quotes.
    pub specifier: CompactString,
    /// Range of the local identifier.
    pub local_range: Range,
    /// Range of the specifier string including quotes.
    pub specifier_range: Range,
}

impl ImportBinding {
    /// Name looked up in the target module's exports.
    pub fn export_name(&self) -> Option<&str> {
        match &self.imported {
            ImportedName::Named(name) => Some(name.as_str()),
            ImportedName::Default => Some(crate::constants::DEFAULT_EXPORT_NAME),
            ImportedName::Namespace => None,
        }
    }
}

pub(crate) fn ts_point_to_position(point: tree_sitter::Point) -> Position {
    Position::new(point.row as u32, point.column as u32)
}

pub(crate) fn ts_range_to_lsp(range: tree_sitter::Range) -> Range {
    Range::new(
        ts_point_to_position(range.start_point),
        ts_point_to_position(range.end_point),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_label() {
        let p = ParameterInfo {
            name: "b".into(),
            type_text: "string".into(),
            optional: true,
        };
        assert_eq!(p.label(), "b?: string");
    }

    #[test]
    fn test_signature_label() {
        let sig = FunctionSignature {
            name: "add".into(),
            file_name: PathBuf::from("/p/math.ts"),
            type_text: "(a: number, b: number) => number".into(),
            parameters: vec![
                ParameterInfo {
                    name: "a".into(),
                    type_text: "number".into(),
                    optional: false,
                },
                ParameterInfo {
                    name: "b".into(),
                    type_text: "number".into(),
                    optional: false,
                },
            ],
            return_type: "number".into(),
            documentation: String::new(),
        };
        assert_eq!(sig.label(), "add (a: number, b: number): number");
    }

    #[test]
    fn test_alias_entry_serializes_kind_lowercase() {
        let entry = AliasEntry::file("a.ts", PathBuf::from("/p/a.ts"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "file");
        assert!(json.get("children").is_none());
    }

    #[test]
    fn test_import_binding_export_name() {
        let range = Range::default();
        let b = ImportBinding {
            local_name: "x".into(),
            imported: ImportedName::Default,
            specifier: "@/x".into(),
            local_range: range,
            specifier_range: range,
        };
        assert_eq!(b.export_name(), Some("default"));
    }
}
