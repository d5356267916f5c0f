//! Where alias maps come from.
//!
//! Every source yields `alias -> target` strings for one workspace root.
//! [`AliasConfigLoader`] merges them per key, later sources winning, and
//! substitutes `${cwd}` with the root.

use crate::analysis::path_resolver::normalize_path;
use crate::analysis::query::QueryEngine;
use crate::constants::{
    CWD_PLACEHOLDER, MAX_BUNDLER_SEARCH_DEPTH, PACKAGE_JSON_FIELD, PATHALIASRC_FILE,
};
use crate::languages::javascript::JavaScript;
use crate::languages::LanguageSupport;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use tree_sitter::Node;

/// Raw alias targets, before `${cwd}` substitution.
pub type AliasMap = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {reason}")]
    Shape { path: PathBuf, reason: String },
}

pub trait AliasSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Aliases this source defines for `root`. A missing backing file is an
    /// empty map, not an error.
    fn load(&self, root: &Path) -> Result<AliasMap, SourceError>;
}

/// Aliases from editor settings (`alias.map`).
pub struct SettingsAliasSource {
    map: AliasMap,
}

impl SettingsAliasSource {
    pub fn new(map: AliasMap) -> Self {
        Self { map }
    }
}

impl AliasSource for SettingsAliasSource {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn load(&self, _root: &Path) -> Result<AliasMap, SourceError> {
        Ok(self.map.clone())
    }
}

/// The `"pathalias"` object of `package.json`.
pub struct PackageJsonAliasSource;

impl AliasSource for PackageJsonAliasSource {
    fn name(&self) -> &'static str {
        "package.json"
    }

    fn load(&self, root: &Path) -> Result<AliasMap, SourceError> {
        let path = root.join("package.json");
        let Some(json) = read_json(&path)? else {
            return Ok(AliasMap::new());
        };
        match json.get(PACKAGE_JSON_FIELD) {
            None | Some(serde_json::Value::Null) => Ok(AliasMap::new()),
            Some(value) => string_map(&path, value),
        }
    }
}

/// `.pathaliasrc`: a JSON object of alias to target.
pub struct PathaliasrcAliasSource;

impl AliasSource for PathaliasrcAliasSource {
    fn name(&self) -> &'static str {
        PATHALIASRC_FILE
    }

    fn load(&self, root: &Path) -> Result<AliasMap, SourceError> {
        let path = root.join(PATHALIASRC_FILE);
        match read_json(&path)? {
            Some(json) => string_map(&path, &json),
            None => Ok(AliasMap::new()),
        }
    }
}

fn read_json(path: &Path) -> Result<Option<serde_json::Value>, SourceError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SourceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn string_map(path: &Path, value: &serde_json::Value) -> Result<AliasMap, SourceError> {
    let object = value.as_object().ok_or_else(|| SourceError::Shape {
        path: path.to_path_buf(),
        reason: "alias configuration must be an object".to_string(),
    })?;
    let mut map = AliasMap::new();
    for (alias, target) in object {
        match target.as_str() {
            Some(target) => {
                map.insert(alias.clone(), target.to_string());
            }
            None => warn!("{}: alias {} is not a string, ignoring", path.display(), alias),
        }
    }
    Ok(map)
}

/// Best-effort static read of webpack `resolve.alias`.
///
/// Active only when `package.json` depends on webpack. Config files are the
/// ones named by `--config` in scripts that run webpack (or
/// `webpack.config.js`), plus any `webpack.*.js` found below the root. The
/// configs are parsed, never executed: only string values and
/// `path.resolve/join(__dirname, …)` calls are understood.
pub struct WebpackAliasSource {
    engine: Arc<QueryEngine>,
}

impl WebpackAliasSource {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    fn config_paths(root: &Path, package: &serde_json::Value) -> Vec<PathBuf> {
        let from_scripts = package
            .get("scripts")
            .and_then(|s| s.as_object())
            .into_iter()
            .flat_map(|scripts| scripts.values())
            .filter_map(|script| config_from_script(script.as_str()?))
            .map(|config| normalize_path(&root.join(config)));

        let mut seen = FxHashSet::default();
        from_scripts
            .chain(search_config_files(root))
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }

    fn aliases_in_config(&self, root: &Path, config: &Path) -> AliasMap {
        let Ok(text) = fs::read_to_string(config) else {
            debug!("Webpack config {} not readable", config.display());
            return AliasMap::new();
        };
        let Some(tree) = self.engine.parse(&JavaScript, &text) else {
            return AliasMap::new();
        };
        let config_dir = config.parent().unwrap_or(root);
        let reader = StaticAliasReader {
            src: text.as_bytes(),
            root,
            config_dir,
        };
        let mut map = AliasMap::new();
        reader.collect(tree.root_node(), &mut map);
        map
    }
}

impl AliasSource for WebpackAliasSource {
    fn name(&self) -> &'static str {
        "webpack"
    }

    fn load(&self, root: &Path) -> Result<AliasMap, SourceError> {
        let Some(package) = read_json(&root.join("package.json"))? else {
            return Ok(AliasMap::new());
        };
        if !depends_on_webpack(&package) {
            return Ok(AliasMap::new());
        }

        let mut map = AliasMap::new();
        for config in Self::config_paths(root, &package) {
            let found = self.aliases_in_config(root, &config);
            debug!("{} aliases from {}", found.len(), config.display());
            map.extend(found);
        }
        Ok(map)
    }
}

fn depends_on_webpack(package: &serde_json::Value) -> bool {
    ["dependencies", "devDependencies"]
        .iter()
        .any(|field| package.get(field).and_then(|d| d.get("webpack")).is_some())
}

/// Config file a script passes to webpack, if the script runs webpack.
fn config_from_script(script: &str) -> Option<&str> {
    let tokens: Vec<&str> = script.split_whitespace().collect();
    let webpack = tokens.iter().position(|t| *t == "webpack")?;
    let config = tokens
        .iter()
        .position(|t| *t == "--config")
        .filter(|&i| i > webpack)
        .and_then(|i| tokens.get(i + 1).copied());
    Some(config.unwrap_or("./webpack.config.js"))
}

const SKIPPED_SEARCH_DIRS: &[&str] = &["node_modules", "test", "dist"];

fn search_config_files(root: &Path) -> Vec<PathBuf> {
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(false)
        .max_depth(Some(MAX_BUNDLER_SEARCH_DEPTH))
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !SKIPPED_SEARCH_DIRS.contains(&name))
                .unwrap_or(false)
        })
        .build();

    walker
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(is_webpack_config_name)
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// `webpack.<anything>.js`
pub(crate) fn is_webpack_config_name(name: &str) -> bool {
    name.strip_prefix("webpack.")
        .and_then(|rest| rest.strip_suffix(".js"))
        .is_some_and(|middle| !middle.is_empty())
}

struct StaticAliasReader<'a> {
    src: &'a [u8],
    root: &'a Path,
    config_dir: &'a Path,
}

impl StaticAliasReader<'_> {
    /// Find `alias: { … }` pairs nested directly in a `resolve: { … }` pair.
    fn collect(&self, node: Node, map: &mut AliasMap) {
        if node.kind() == "pair" && self.key_of(node).as_deref() == Some("alias") {
            let in_resolve = node
                .parent()
                .and_then(|object| object.parent())
                .filter(|pair| pair.kind() == "pair")
                .and_then(|pair| self.key_of(pair))
                .is_some_and(|key| key == "resolve");
            if let (true, Some(value)) = (in_resolve, node.child_by_field_name("value")) {
                if value.kind() == "object" {
                    self.read_alias_object(value, map);
                }
                return;
            }
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect(child, map);
        }
    }

    fn read_alias_object(&self, object: Node, map: &mut AliasMap) {
        let mut cursor = object.walk();
        for pair in object
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "pair")
        {
            let Some(alias) = self.key_of(pair) else {
                continue;
            };
            let Some(target) = pair
                .child_by_field_name("value")
                .and_then(|value| self.target_of(value))
            else {
                debug!("Skipping non-static webpack alias {}", alias);
                continue;
            };
            map.insert(alias, target.to_string_lossy().into_owned());
        }
    }

    fn key_of(&self, pair: Node) -> Option<String> {
        let key = pair.child_by_field_name("key")?;
        match key.kind() {
            "property_identifier" | "string" => Some(self.string_text(key)?.to_string()),
            _ => None,
        }
    }

    fn string_text(&self, node: Node) -> Option<&str> {
        let text = node.utf8_text(self.src).ok()?;
        Some(JavaScript.strip_quotes(text))
    }

    fn target_of(&self, value: Node) -> Option<PathBuf> {
        match value.kind() {
            "string" => {
                let text = self.string_text(value)?;
                Some(self.root.join(text))
            }
            "call_expression" => {
                let function = value.child_by_field_name("function")?;
                let name = match function.kind() {
                    "member_expression" => function.child_by_field_name("property")?,
                    "identifier" => function,
                    _ => return None,
                };
                let name = name.utf8_text(self.src).ok()?;
                if name != "resolve" && name != "join" {
                    return None;
                }

                let args = value.child_by_field_name("arguments")?;
                let mut path = PathBuf::new();
                let mut cursor = args.walk();
                for arg in args.named_children(&mut cursor) {
                    match arg.kind() {
                        "identifier" if arg.utf8_text(self.src).ok()? == "__dirname" => {
                            path.push(self.config_dir)
                        }
                        "string" => path.push(self.string_text(arg)?),
                        "comment" => {}
                        _ => return None,
                    }
                }
                if path.is_relative() {
                    path = self.root.join(path);
                }
                Some(normalize_path(&path))
            }
            _ => None,
        }
    }
}

/// Merges alias sources for a workspace root.
pub struct AliasConfigLoader {
    sources: Vec<Box<dyn AliasSource>>,
}

impl AliasConfigLoader {
    /// Sources in ascending precedence.
    pub fn new(sources: Vec<Box<dyn AliasSource>>) -> Self {
        Self { sources }
    }

    /// Standard chain: settings, optional webpack discovery, `package.json`,
    /// `.pathaliasrc`.
    pub fn standard(settings: AliasMap, discover_bundler: bool, engine: Arc<QueryEngine>) -> Self {
        let mut sources: Vec<Box<dyn AliasSource>> = vec![Box::new(SettingsAliasSource::new(settings))];
        if discover_bundler {
            sources.push(Box::new(WebpackAliasSource::new(engine)));
        }
        sources.push(Box::new(PackageJsonAliasSource));
        sources.push(Box::new(PathaliasrcAliasSource));
        Self::new(sources)
    }

    /// Alias targets for `root`, `${cwd}` substituted. A failing source is
    /// logged and contributes nothing.
    pub fn load(&self, root: &Path) -> BTreeMap<String, PathBuf> {
        let mut merged = AliasMap::new();
        for source in &self.sources {
            match source.load(root) {
                Ok(map) => {
                    debug!("{} aliases from {}", map.len(), source.name());
                    merged.extend(map);
                }
                Err(e) => warn!("Alias source {} failed: {}", source.name(), e),
            }
        }

        let root_text = root.to_string_lossy();
        merged
            .into_iter()
            .map(|(alias, target)| {
                let target = target.replacen(CWD_PLACEHOLDER, &root_text, 1);
                (alias, PathBuf::from(target))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine() -> Arc<QueryEngine> {
        Arc::new(QueryEngine::new())
    }

    #[test]
    fn test_later_sources_win_per_key() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(
            root.join("package.json"),
            r#"{"name":"x","pathalias":{"@":"${cwd}/pkg","@shared":"${cwd}/shared"}}"#,
        )
        .unwrap();
        fs::write(root.join(".pathaliasrc"), r#"{"@":"${cwd}/rc"}"#).unwrap();

        let mut settings = AliasMap::new();
        settings.insert("@".into(), "/settings".into());
        settings.insert("~".into(), "/home".into());

        let merged = AliasConfigLoader::standard(settings, false, engine()).load(root);
        assert_eq!(merged["@"], root.join("rc"));
        assert_eq!(merged["@shared"], root.join("shared"));
        assert_eq!(merged["~"], PathBuf::from("/home"));
    }

    #[test]
    fn test_malformed_sources_contribute_nothing() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("package.json"), r#"{"pathalias":{"@":"${cwd}/src"}}"#).unwrap();
        fs::write(root.join(".pathaliasrc"), "{ not json").unwrap();

        let merged = AliasConfigLoader::standard(AliasMap::new(), false, engine()).load(root);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["@"], root.join("src"));
    }

    #[test]
    fn test_missing_files_are_empty() {
        let temp = TempDir::new().unwrap();
        assert!(PackageJsonAliasSource.load(temp.path()).unwrap().is_empty());
        assert!(PathaliasrcAliasSource.load(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_non_object_is_shape_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".pathaliasrc"), r#"["@"]"#).unwrap();
        let err = PathaliasrcAliasSource.load(temp.path()).unwrap_err();
        assert!(matches!(err, SourceError::Shape { .. }));
    }

    #[test]
    fn test_config_from_script() {
        assert_eq!(
            config_from_script("webpack --mode production --config build/webpack.prod.js"),
            Some("build/webpack.prod.js")
        );
        assert_eq!(config_from_script("webpack serve"), Some("./webpack.config.js"));
        assert_eq!(config_from_script("--config x.js webpack"), Some("./webpack.config.js"));
        assert_eq!(config_from_script("jest --watch"), None);
    }

    #[test]
    fn test_webpack_config_names() {
        assert!(is_webpack_config_name("webpack.dev.js"));
        assert!(is_webpack_config_name("webpack.config.js"));
        assert!(!is_webpack_config_name("webpack.js"));
        assert!(!is_webpack_config_name("webpack.dev.ts"));
    }

    #[test]
    fn test_webpack_source_reads_static_aliases() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::write(
            root.join("package.json"),
            r#"{"devDependencies":{"webpack":"^5"},"scripts":{"build":"webpack --config build/webpack.prod.js"}}"#,
        )
        .unwrap();
        fs::write(
            root.join("build/webpack.prod.js"),
            r#"
const path = require('path');
module.exports = {
  entry: './src/index.js',
  resolve: {
    extensions: ['.js'],
    alias: {
      '@': path.resolve(__dirname, '..', 'src'),
      utils: 'src/utils',
      dynamic: computeIt(),
    },
  },
};
"#,
        )
        .unwrap();
        fs::write(
            root.join("node_modules/lib/webpack.lib.js"),
            "module.exports = { resolve: { alias: { lib: '/nope' } } };",
        )
        .unwrap();

        let map = WebpackAliasSource::new(engine()).load(root).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(PathBuf::from(&map["@"]), root.join("src"));
        assert_eq!(PathBuf::from(&map["utils"]), root.join("src/utils"));
    }

    #[test]
    fn test_webpack_source_requires_dependency() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), r#"{"dependencies":{}}"#).unwrap();
        fs::write(
            temp.path().join("webpack.config.js"),
            "module.exports = { resolve: { alias: { '@': 'src' } } };",
        )
        .unwrap();
        assert!(WebpackAliasSource::new(engine()).load(temp.path()).unwrap().is_empty());
    }
}
