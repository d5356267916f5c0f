use crate::analysis::cache::BoundedCache;
use crate::analysis::exports::{ExportExtractor, ExportRule};
use crate::error_ext::ResultExt;
use crate::types::FileExports;
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Identity of a file on disk. A changed file produces a new key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub len: u64,
    pub signatures: bool,
}

impl FileKey {
    pub fn for_path(path: &Path, signatures: bool) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            modified: metadata.modified().ok(),
            len: metadata.len(),
            signatures,
        })
    }
}

/// Extracted exports of files on disk, behind a bounded LRU.
pub struct ExportIndex {
    extractor: RwLock<ExportExtractor>,
    cache: Mutex<BoundedCache<FileKey, Arc<FileExports>>>,
}

impl ExportIndex {
    pub fn new(extractor: ExportExtractor, capacity: usize) -> Self {
        Self {
            extractor: RwLock::new(extractor),
            cache: Mutex::new(BoundedCache::new(capacity)),
        }
    }

    /// Exports of `path`, parsed on a cache miss.
    ///
    /// `None` when the file cannot be read, which is how stale tree nodes
    /// surface.
    pub fn exports_for_file(&self, path: &Path, want_signatures: bool) -> Option<Arc<FileExports>> {
        let key = FileKey::for_path(path, want_signatures).ok_debug("export index stat")?;

        if let Some(hit) = self.cache.lock().get(&key) {
            return Some(hit.clone());
        }

        let text = fs::read_to_string(path).ok_debug("export index read")?;
        let extractor = self.extractor.read().clone();
        let exports = Arc::new(extractor.extract(path, &text, want_signatures));
        debug!(
            "Extracted {} exports from {}",
            exports.tokens.len(),
            path.display()
        );

        if let Some((evicted, _)) = self.cache.lock().push(key, exports.clone()) {
            debug!("Evicted exports of {}", evicted.path.display());
        }
        Some(exports)
    }

    /// Apply new settings. A changed rule invalidates every entry; a changed
    /// capacity starts a fresh cache.
    pub fn reconfigure(&self, rule: ExportRule, capacity: usize) {
        {
            let mut extractor = self.extractor.write();
            if extractor.rule() != rule {
                *extractor = extractor.with_rule(rule);
                self.cache.lock().clear();
            }
        }
        let mut cache = self.cache.lock();
        if cache.capacity() != capacity.max(1) {
            *cache = BoundedCache::new(capacity);
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}
