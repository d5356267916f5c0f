//! Constants used throughout the codebase.
//!
//! Limits, file names and defaults shared across modules.

/// Directory names never mirrored into an alias stat tree.
pub const EXCLUDED_DIR_NAMES: &[&str] = &["node_modules"];

/// Deepest directory level mirrored into a stat tree.
pub const MAX_TREE_DEPTH: usize = 32;

/// Deepest syntax level inspected by the export extractor (0 = program).
pub const MAX_EXTRACT_DEPTH: usize = 2;

/// Extension probed after the requesting file's own extension.
pub const FALLBACK_EXTENSION: &str = "js";

/// Stem probed when an import names a directory.
pub const INDEX_STEM: &str = "index";

/// Placeholder in alias targets replaced by the workspace root.
pub const CWD_PLACEHOLDER: &str = "${cwd}";

/// Identifier reported for `export default` / `export =`.
pub const DEFAULT_EXPORT_NAME: &str = "default";

/// Default capacity of the parsed-exports cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 20;

/// Debounce window for filesystem-triggered tree rebuilds (milliseconds).
pub const REBUILD_DEBOUNCE_MS: u64 = 1000;

/// How many lines signature help walks back looking for the call's open paren.
pub const MAX_CALL_LOOKBACK_LINES: u32 = 30;

/// Workspace-local alias file (JSON object of alias -> path).
pub const PATHALIASRC_FILE: &str = ".pathaliasrc";

/// Field of `package.json` holding embedded alias configuration.
pub const PACKAGE_JSON_FIELD: &str = "pathalias";

/// Workspace-local server configuration.
pub const CONFIG_FILE: &str = "pathalias.toml";

/// Maximum directory depth searched for bundler config files.
pub const MAX_BUNDLER_SEARCH_DEPTH: usize = 5;
