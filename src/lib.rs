pub mod analysis;
pub mod constants;
pub mod error_ext;
pub mod languages;
pub mod server;
pub mod types;

pub use server::config::{ConfigManager, PathAliasConfig};
pub use server::state::ServerState;
pub use server::PathAliasServer;
