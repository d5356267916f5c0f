//! Published alias trees for every workspace root.
//!
//! Readers take an `Arc` snapshot and keep it for the whole request; a
//! rebuild publishes a new snapshot by swapping the pointer.

use crate::analysis::alias_matcher::AliasMatcher;
use crate::analysis::path_resolver::{resolve_specifier, AliasResolution};
use crate::analysis::stat_tree::AliasStatTree;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One workspace root, its alias trees and the policy they are matched with.
#[derive(Debug, Clone)]
pub struct WorkspaceTree {
    pub root: PathBuf,
    pub tree: AliasStatTree,
    pub matcher: AliasMatcher,
}

impl WorkspaceTree {
    /// Resolve an aliased specifier written in a file with extension
    /// `requesting_extension`.
    pub fn resolve(&self, specifier: &str, requesting_extension: &str) -> Option<AliasResolution> {
        resolve_specifier(&self.tree, &self.matcher, specifier, requesting_extension)
    }
}

/// Trees indexed by workspace-root index.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceTrees {
    workspaces: Vec<WorkspaceTree>,
}

impl WorkspaceTrees {
    pub fn new(workspaces: Vec<WorkspaceTree>) -> Self {
        Self { workspaces }
    }

    pub fn get(&self, index: usize) -> Option<&WorkspaceTree> {
        self.workspaces.get(index)
    }

    /// Index of the workspace containing `path`; the deepest root wins
    /// when roots are nested.
    pub fn index_for(&self, path: &Path) -> Option<usize> {
        self.workspaces
            .iter()
            .enumerate()
            .filter(|(_, ws)| path.starts_with(&ws.root))
            .max_by_key(|(_, ws)| ws.root.components().count())
            .map(|(i, _)| i)
    }

    pub fn for_path(&self, path: &Path) -> Option<&WorkspaceTree> {
        self.index_for(path).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkspaceTree> {
        self.workspaces.iter()
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }
}

#[derive(Default)]
pub struct TreeStore {
    current: RwLock<Arc<WorkspaceTrees>>,
}

impl TreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<WorkspaceTrees> {
        self.current.read().clone()
    }

    /// Replace the published trees; returns the previous snapshot.
    pub fn publish(&self, trees: WorkspaceTrees) -> Arc<WorkspaceTrees> {
        std::mem::replace(&mut *self.current.write(), Arc::new(trees))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(root: &str) -> WorkspaceTree {
        WorkspaceTree {
            root: PathBuf::from(root),
            tree: AliasStatTree::default(),
            matcher: AliasMatcher::default(),
        }
    }

    #[test]
    fn test_index_for_prefers_deepest_root() {
        let trees = WorkspaceTrees::new(vec![ws("/repo"), ws("/repo/packages/app"), ws("/other")]);
        assert_eq!(trees.index_for(Path::new("/repo/src/a.ts")), Some(0));
        assert_eq!(trees.index_for(Path::new("/repo/packages/app/src/a.ts")), Some(1));
        assert_eq!(trees.index_for(Path::new("/other/x.js")), Some(2));
        assert_eq!(trees.index_for(Path::new("/elsewhere/x.js")), None);
    }

    #[test]
    fn test_index_for_matches_whole_components() {
        let trees = WorkspaceTrees::new(vec![ws("/repo")]);
        assert_eq!(trees.index_for(Path::new("/repository/a.ts")), None);
    }

    #[test]
    fn test_snapshot_survives_publish() {
        let store = TreeStore::new();
        store.publish(WorkspaceTrees::new(vec![ws("/a")]));
        let held = store.snapshot();

        let previous = store.publish(WorkspaceTrees::new(vec![ws("/b"), ws("/c")]));
        assert!(Arc::ptr_eq(&held, &previous));
        assert_eq!(held.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }
}
