use crate::analysis::alias_matcher::MatchPolicy;
use crate::analysis::exports::ExportRule;
use crate::constants::{CONFIG_FILE, DEFAULT_CACHE_CAPACITY, REBUILD_DEBOUNCE_MS};
use crate::error_ext::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

/// Key editors may nest the settings under in `didChangeConfiguration`.
const SETTINGS_SECTION: &str = "pathalias";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize defaults: {0}")]
    Defaults(#[source] serde_json::Error),

    #[error("Failed to deserialize merged config: {0}")]
    Invalid(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PathAliasConfig {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub alias: AliasConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeatureConfig {
    #[serde(default = "true_bool")]
    pub completion: bool,
    #[serde(default = "true_bool")]
    pub definition: bool,
    #[serde(default = "true_bool")]
    pub signature_help: bool,
    #[serde(default = "true_bool")]
    pub code_action: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            completion: true,
            definition: true,
            signature_help: true,
            code_action: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AliasConfig {
    /// Alias token to target path; `${cwd}` is the workspace root.
    #[serde(default)]
    pub map: BTreeMap<String, String>,
    #[serde(default)]
    pub match_policy: MatchPolicy,
    #[serde(default)]
    pub export_rule: ExportRule,
    /// Read `resolve.alias` out of webpack configs.
    #[serde(default)]
    pub discover_bundler: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompletionConfig {
    /// Keep file extensions in inserted paths.
    #[serde(default)]
    pub include_extension: bool,
    /// Extensions dropped from inserted paths unless `include_extension`.
    #[serde(default = "default_extensionless")]
    pub extensionless: Vec<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            include_extension: false,
            extensionless: default_extensionless(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WatcherConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: REBUILD_DEBOUNCE_MS,
        }
    }
}

pub struct ConfigManager {
    /// Configuration of the first workspace root; drives features, cache
    /// and watcher settings.
    config: Arc<RwLock<PathAliasConfig>>,

    init_settings: Arc<RwLock<Option<serde_json::Value>>>,

    workspace_configs: Arc<RwLock<HashMap<PathBuf, PathAliasConfig>>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(PathAliasConfig::default())),
            init_settings: Arc::new(RwLock::new(None)),
            workspace_configs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn current(&self) -> PathAliasConfig {
        self.config.read().await.clone()
    }

    /// Replace the editor settings. Settings nested under `"pathalias"` are
    /// unwrapped.
    pub async fn set_init_settings(&self, settings: Option<serde_json::Value>) {
        let settings = settings.map(|value| match value.get(SETTINGS_SECTION) {
            Some(section) if section.is_object() => section.clone(),
            _ => value,
        });
        let mut lock = self.init_settings.write().await;
        *lock = settings;
    }

    /// Defaults, then editor settings, then `pathalias.toml` in `root`.
    pub async fn load_from_workspace(&self, root: &Path) -> Result<PathAliasConfig, ConfigError> {
        let mut config_json =
            serde_json::to_value(PathAliasConfig::default()).map_err(ConfigError::Defaults)?;

        {
            let init_settings = self.init_settings.read().await;
            if let Some(settings) = init_settings.as_ref() {
                merge_json(&mut config_json, settings);
            }
        }

        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            let toml_content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;

            let toml_value: toml::Value =
                toml::from_str(&toml_content).map_err(|source| ConfigError::Toml {
                    path: config_path.clone(),
                    source,
                })?;
            let toml_json = toml_to_json(&toml_value);

            merge_json(&mut config_json, &toml_json);
        }

        serde_json::from_value(config_json).map_err(ConfigError::Invalid)
    }

    /// Reload every root. A root whose configuration fails to load keeps its
    /// previous configuration.
    pub async fn reload(&self, roots: &[PathBuf]) -> Vec<PathAliasConfig> {
        let mut loaded = Vec::with_capacity(roots.len());
        for root in roots {
            let context = format!("load configuration for {}", root.display());
            let config = match self.load_from_workspace(root).await.ok_warn(&context) {
                Some(config) => config,
                None => match self.workspace_configs.read().await.get(root) {
                    Some(previous) => previous.clone(),
                    None => self.settings_only().await,
                },
            };
            loaded.push(config);
        }

        {
            let mut configs = self.workspace_configs.write().await;
            configs.clear();
            for (root, config) in roots.iter().zip(&loaded) {
                configs.insert(root.clone(), config.clone());
            }
        }

        let primary = match loaded.first() {
            Some(config) => config.clone(),
            None => self.settings_only().await,
        };
        *self.config.write().await = primary;

        loaded
    }

    pub async fn config_for_root(&self, root: &Path) -> PathAliasConfig {
        match self.workspace_configs.read().await.get(root) {
            Some(config) => config.clone(),
            None => self.current().await,
        }
    }

    /// Defaults merged with the editor settings only.
    async fn settings_only(&self) -> PathAliasConfig {
        let init_settings = self.init_settings.read().await;
        let Some(settings) = init_settings.as_ref() else {
            return PathAliasConfig::default();
        };
        let Ok(mut json) = serde_json::to_value(PathAliasConfig::default()) else {
            return PathAliasConfig::default();
        };
        merge_json(&mut json, settings);
        serde_json::from_value(json).unwrap_or_else(|e| {
            warn!("Ignoring invalid settings: {}", e);
            PathAliasConfig::default()
        })
    }
}

/// Whether `path` is a file that feeds configuration or alias maps.
pub fn is_config_file(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(CONFIG_FILE | crate::constants::PATHALIASRC_FILE | "package.json") => true,
        Some(name) => crate::analysis::alias_sources::is_webpack_config_name(name),
        None => false,
    }
}

fn toml_to_json(toml: &toml::Value) -> serde_json::Value {
    match toml {
        toml::Value::String(s) => serde_json::Value::String(s.clone()),
        toml::Value::Integer(i) => serde_json::Value::Number((*i).into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        toml::Value::Boolean(b) => serde_json::Value::Bool(*b),
        toml::Value::Array(arr) => serde_json::Value::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
    }
}

fn merge_json(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                if overlay_val.is_null() {
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(base_val) => merge_json(base_val, overlay_val),
                    None => {
                        base_map.insert(key.clone(), overlay_val.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            if !overlay.is_null() {
                *base = overlay.clone();
            }
        }
    }
}

fn true_bool() -> bool {
    true
}

fn default_extensionless() -> Vec<String> {
    vec!["js".to_string(), "ts".to_string()]
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_debounce_ms() -> u64 {
    REBUILD_DEBOUNCE_MS
}
