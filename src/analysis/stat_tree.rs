//! In-memory mirrors of aliased directories.
//!
//! An [`AliasStatTree`] maps each alias token of one workspace root to an
//! [`AliasEntry`] tree built by listing the alias target once. Path completion
//! and resolution walk these trees instead of stat-ing the filesystem on every
//! keystroke. Trees are never patched: a change on disk produces a new tree.

use crate::constants::{EXCLUDED_DIR_NAMES, MAX_TREE_DEPTH};
use crate::types::AliasEntry;
use compact_str::CompactString;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Why an alias target could not be mirrored.
#[derive(Debug, Error)]
pub enum AliasError {
    #[error("alias {alias}: {path} is not an absolute path")]
    NotAbsolute { alias: String, path: PathBuf },

    #[error("alias {alias}: {path} does not exist")]
    Missing { alias: String, path: PathBuf },

    #[error("alias {alias}: {path} is neither a file nor a directory")]
    UnsupportedTarget { alias: String, path: PathBuf },

    #[error("alias {alias}: failed to read {path}: {source}")]
    Io {
        alias: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Build the tree for one alias.
///
/// A target that is a single file yields a one-node `File` entry. Directories
/// are listed recursively; `node_modules` is skipped at every level.
pub fn build_alias_entry(alias: &str, target: &Path) -> Result<AliasEntry, AliasError> {
    if !target.is_absolute() {
        return Err(AliasError::NotAbsolute {
            alias: alias.to_string(),
            path: target.to_path_buf(),
        });
    }

    let metadata = match fs::metadata(target) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AliasError::Missing {
                alias: alias.to_string(),
                path: target.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(AliasError::Io {
                alias: alias.to_string(),
                path: target.to_path_buf(),
                source,
            })
        }
    };

    if metadata.is_file() {
        return Ok(AliasEntry::file(alias, target.to_path_buf()));
    }
    if !metadata.is_dir() {
        return Err(AliasError::UnsupportedTarget {
            alias: alias.to_string(),
            path: target.to_path_buf(),
        });
    }

    // Surface an unreadable root as an error; deeper failures only warn.
    fs::read_dir(target).map_err(|source| AliasError::Io {
        alias: alias.to_string(),
        path: target.to_path_buf(),
        source,
    })?;

    let mut root = AliasEntry::directory(alias, target.to_path_buf());
    for entry in walk(target) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping part of alias {}: {}", alias, e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        insert_walked(&mut root, target, &entry);
    }

    Ok(root)
}

/// Depth-first walk below `dir` in file-name order.
///
/// Symlinks are followed; a link back to an ancestor is reported as a loop
/// error instead of being descended.
fn walk(dir: &Path) -> ignore::Walk {
    ignore::WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(true)
        .max_depth(Some(MAX_TREE_DEPTH))
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map_or(true, |name| !EXCLUDED_DIR_NAMES.contains(&name))
        })
        .build()
}

/// Hang a walked entry under its parent. Parents are always yielded first.
fn insert_walked(root: &mut AliasEntry, base: &Path, entry: &ignore::DirEntry) {
    let Ok(relative) = entry.path().strip_prefix(base) else {
        return;
    };
    let names: Option<Vec<&str>> = relative.iter().map(|part| part.to_str()).collect();
    let Some((name, parents)) = names.as_deref().and_then(|n| n.split_last()) else {
        debug!("Skipping non UTF-8 entry {}", entry.path().display());
        return;
    };

    let mut parent = root;
    for segment in parents {
        match parent.children.get_mut(*segment) {
            Some(next) => parent = next,
            None => return,
        }
    }

    let path = entry.path().to_path_buf();
    let child = if entry.file_type().is_some_and(|t| t.is_dir()) {
        AliasEntry::directory(*name, path)
    } else {
        AliasEntry::file(*name, path)
    };
    parent.children.insert(CompactString::from(*name), child);
}

/// All alias trees of one workspace root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasStatTree {
    roots: BTreeMap<CompactString, AliasEntry>,
    /// Sorted alias tokens, kept alongside `roots` for matching.
    aliases: Vec<CompactString>,
}

impl AliasStatTree {
    /// Build trees for every `(alias, absolute target)` pair.
    ///
    /// Aliases whose target is unusable are logged and dropped; the others
    /// are still built.
    pub fn build<'a, I>(targets: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Path)>,
    {
        let mut roots = BTreeMap::new();
        for (alias, target) in targets {
            match build_alias_entry(alias, target) {
                Ok(entry) => {
                    roots.insert(CompactString::from(alias), entry);
                }
                Err(e) => warn!("Dropping alias: {}", e),
            }
        }
        Self::from_roots(roots)
    }

    pub fn from_roots(roots: BTreeMap<CompactString, AliasEntry>) -> Self {
        // BTreeMap keys are already in lexicographic order.
        let aliases = roots.keys().cloned().collect();
        Self { roots, aliases }
    }

    pub fn get(&self, alias: &str) -> Option<&AliasEntry> {
        self.roots.get(alias)
    }

    /// Alias tokens in lexicographic order.
    pub fn aliases(&self) -> &[CompactString] {
        &self.aliases
    }

    pub fn roots(&self) -> impl Iterator<Item = (&CompactString, &AliasEntry)> {
        self.roots.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Number of nodes across all trees.
    pub fn node_count(&self) -> usize {
        fn count(entry: &AliasEntry) -> usize {
            1 + entry.children.values().map(count).sum::<usize>()
        }
        self.roots.values().map(count).sum()
    }
}
