pub mod alias_matcher;
pub mod alias_sources;
pub mod cache;
pub mod document;
pub mod export_index;
pub mod exports;
pub mod path_resolver;
pub mod query;
pub mod stat_tree;
pub mod tree_store;

pub use alias_matcher::{AliasMatcher, MatchPolicy};
pub use alias_sources::{AliasConfigLoader, AliasSource};
pub use cache::BoundedCache;
pub use document::DocumentManager;
pub use export_index::ExportIndex;
pub use exports::{ExportExtractor, ExportRule, SyntaxItem};
pub use query::QueryEngine;
pub use stat_tree::{AliasError, AliasStatTree};
pub use tree_store::{TreeStore, WorkspaceTree, WorkspaceTrees};
