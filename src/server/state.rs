//! Server state management.
//!
//! `ServerState` is a thin coordinator over the analysis components. It is
//! cheap to clone; every component sits behind an `Arc`.

use crate::analysis::alias_sources::AliasConfigLoader;
use crate::analysis::{
    AliasMatcher, AliasStatTree, DocumentManager, ExportExtractor, ExportIndex, ExportRule,
    QueryEngine, TreeStore, WorkspaceTree, WorkspaceTrees,
};
use crate::constants::DEFAULT_CACHE_CAPACITY;
use crate::languages::LanguageRegistry;
use crate::server::config::{ConfigManager, PathAliasConfig};
use crate::server::rebuild::RebuildScheduler;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Clone)]
pub struct ServerState {
    pub document_manager: Arc<DocumentManager>,
    pub languages: Arc<LanguageRegistry>,
    pub query_engine: Arc<QueryEngine>,
    pub config: Arc<ConfigManager>,
    /// Published alias trees; replaced wholesale on rebuild.
    pub trees: Arc<TreeStore>,
    pub exports: Arc<ExportIndex>,
    workspace_roots: Arc<RwLock<Vec<PathBuf>>>,
    scheduler: Arc<Mutex<Option<RebuildScheduler>>>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    pub fn new() -> Self {
        let languages = Arc::new(LanguageRegistry::with_defaults());
        let query_engine = Arc::new(QueryEngine::new());
        let document_manager = Arc::new(DocumentManager::new(
            Arc::clone(&query_engine),
            Arc::clone(&languages),
        ));
        let extractor = ExportExtractor::new(
            Arc::clone(&languages),
            Arc::clone(&query_engine),
            ExportRule::default(),
        );

        Self {
            document_manager,
            languages,
            query_engine,
            config: Arc::new(ConfigManager::new()),
            trees: Arc::new(TreeStore::new()),
            exports: Arc::new(ExportIndex::new(extractor, DEFAULT_CACHE_CAPACITY)),
            workspace_roots: Arc::new(RwLock::new(Vec::new())),
            scheduler: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_workspace_roots(&self, roots: Vec<PathBuf>) {
        *self.workspace_roots.write() = roots;
    }

    pub fn workspace_roots(&self) -> Vec<PathBuf> {
        self.workspace_roots.read().clone()
    }

    /// Reload configuration for every root, rebuild all alias trees and
    /// publish them.
    pub async fn rebuild_trees(&self) {
        let start = Instant::now();
        let roots = self.workspace_roots();
        let configs = self.config.reload(&roots).await;

        if let Some(primary) = configs.first() {
            self.exports
                .reconfigure(primary.alias.export_rule, primary.cache.capacity);
        }

        let engine = Arc::clone(&self.query_engine);
        let jobs: Vec<(PathBuf, PathAliasConfig)> = roots.into_iter().zip(configs).collect();
        let built = tokio::task::spawn_blocking(move || build_workspaces(&engine, jobs)).await;

        let trees = match built {
            Ok(trees) => trees,
            Err(e) => {
                warn!("Stat tree rebuild task failed: {}", e);
                return;
            }
        };

        let aliases: usize = trees.iter().map(|ws| ws.tree.len()).sum();
        let nodes: usize = trees.iter().map(|ws| ws.tree.node_count()).sum();
        let roots = trees.len();
        self.trees.publish(trees);
        info!(
            "Rebuilt stat trees: {} roots, {} aliases, {} nodes in {:?}",
            roots,
            aliases,
            nodes,
            start.elapsed()
        );
    }

    /// Spawn the debounced rebuild worker, replacing any previous one.
    pub fn start_rebuild_worker(&self, debounce: Duration) {
        let state = self.clone();
        let (scheduler, _handle) = RebuildScheduler::spawn(debounce, move || {
            let state = state.clone();
            async move { state.rebuild_trees().await }
        });
        if let Some(previous) = self.scheduler.lock().replace(scheduler) {
            previous.shutdown();
        }
    }

    pub fn request_rebuild(&self) {
        if let Some(scheduler) = self.scheduler.lock().as_ref() {
            scheduler.notify_change();
        }
    }

    pub fn request_immediate_rebuild(&self) {
        if let Some(scheduler) = self.scheduler.lock().as_ref() {
            scheduler.rebuild_now();
        }
    }

    pub fn stop_rebuild_worker(&self) {
        if let Some(scheduler) = self.scheduler.lock().take() {
            scheduler.shutdown();
        }
    }

    /// Current tree snapshot and the index of the workspace containing `path`.
    pub fn workspace_snapshot(&self, path: &Path) -> Option<(Arc<WorkspaceTrees>, usize)> {
        let snapshot = self.trees.snapshot();
        let index = snapshot.index_for(path)?;
        Some((snapshot, index))
    }
}

fn build_workspaces(engine: &Arc<QueryEngine>, jobs: Vec<(PathBuf, PathAliasConfig)>) -> WorkspaceTrees {
    let workspaces = jobs
        .into_iter()
        .map(|(root, config)| {
            let loader = AliasConfigLoader::standard(
                config.alias.map.clone(),
                config.alias.discover_bundler,
                Arc::clone(engine),
            );
            let targets = loader.load(&root);
            let tree = AliasStatTree::build(
                targets
                    .iter()
                    .map(|(alias, target)| (alias.as_str(), target.as_path())),
            );
            WorkspaceTree {
                root,
                tree,
                matcher: AliasMatcher::new(config.alias.match_policy),
            }
        })
        .collect();
    WorkspaceTrees::new(workspaces)
}
