//! Module path resolution against alias stat trees.
//!
//! Resolves specifiers such as `@/utils/helper` to absolute file paths by
//! walking the alias's [`AliasEntry`] tree. Missing extensions and directory
//! `index` files are inferred in a fixed probe order:
//!
//! 1. the exact segment (`helper.ts` written out)
//! 2. `<stem>.<requesting ext>`, then `<stem>.js`
//! 3. for directories, `index.<requesting ext>`, then `index.js`, then a
//!    sibling `<dir>.<requesting ext>` / `<dir>.js`
//!
//! Package imports and `node_modules` are out of reach by construction: the
//! trees never contain them.

use crate::analysis::alias_matcher::AliasMatcher;
use crate::analysis::stat_tree::AliasStatTree;
use crate::constants::{FALLBACK_EXTENSION, INDEX_STEM};
use crate::types::AliasEntry;
use std::path::{Component, Path, PathBuf};

/// Resolve `segments` below `entry`.
///
/// `requesting_extension` is the extension of the file the import is written
/// in, without the dot. Returns `None` when nothing matches.
pub fn resolve(
    entry: &AliasEntry,
    segments: &[&str],
    requesting_extension: &str,
) -> Option<PathBuf> {
    if entry.is_file() {
        // A file alias has no children: only the bare alias resolves.
        return segments.is_empty().then(|| entry.absolute_path.clone());
    }

    let mut node = entry;
    let mut parent = None;
    for (i, segment) in segments.iter().enumerate() {
        match node.child(segment) {
            Some(child) => {
                parent = Some(node);
                node = child;
            }
            None if i + 1 == segments.len() => {
                return probe(node, segment, requesting_extension);
            }
            None => return None,
        }
    }

    if node.is_file() {
        return Some(node.absolute_path.clone());
    }
    // `utils/` without an index may sit next to `utils.ts`.
    probe(node, INDEX_STEM, requesting_extension).or_else(|| {
        let (parent, stem) = parent.zip(segments.last())?;
        probe(parent, stem, requesting_extension)
    })
}

/// First existing `<stem>.<ext>` then `<stem>.js` child of `dir`.
fn probe(dir: &AliasEntry, stem: &str, requesting_extension: &str) -> Option<PathBuf> {
    if !dir.is_directory() {
        return None;
    }
    candidate_extensions(requesting_extension)
        .find_map(|ext| dir.child_file(&format!("{}.{}", stem, ext)))
        .map(Path::to_path_buf)
}

fn candidate_extensions(requesting_extension: &str) -> impl Iterator<Item = &str> {
    let first = (!requesting_extension.is_empty()).then_some(requesting_extension);
    let fallback = (requesting_extension != FALLBACK_EXTENSION).then_some(FALLBACK_EXTENSION);
    first.into_iter().chain(fallback)
}

/// A specifier that resolved through an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasResolution {
    pub alias: String,
    pub path: PathBuf,
}

/// Match `specifier` against the tree's aliases and resolve it.
pub fn resolve_specifier(
    tree: &AliasStatTree,
    matcher: &AliasMatcher,
    specifier: &str,
    requesting_extension: &str,
) -> Option<AliasResolution> {
    let alias = matcher.find(tree.aliases(), specifier)?;
    let entry = tree.get(alias)?;
    let segments = AliasMatcher::split(alias, specifier);
    let path = resolve(entry, &segments, requesting_extension)?;
    Some(AliasResolution {
        alias: alias.to_string(),
        path,
    })
}

/// Walk `segments` below `entry` without probing; used for listing directories.
pub fn walk<'a>(entry: &'a AliasEntry, segments: &[&str]) -> Option<&'a AliasEntry> {
    segments
        .iter()
        .try_fold(entry, |node, segment| node.child(segment))
}

/// Check if an import specifier is a relative import.
///
/// Returns `true` for specifiers starting with "./" or "../".
#[inline]
pub fn is_relative_import(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// Absolute target of a relative specifier written in `from_file`.
pub fn resolve_relative(from_file: &Path, specifier: &str) -> Option<PathBuf> {
    if !is_relative_import(specifier) {
        return None;
    }
    let from_dir = from_file.parent()?;
    Some(normalize_path(&from_dir.join(specifier)))
}

/// Normalize a path by resolving `.` and `..` components.
///
/// Unlike `canonicalize()`, this doesn't require the path to exist
/// and doesn't resolve symlinks.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            Component::CurDir => {}
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Extension of `path` without the dot, or `""`.
pub fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}
