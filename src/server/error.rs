//! Structured error types for the LSP server.
//!
//! Handlers answer "nothing found" instead of failing a request, so these
//! errors are logged and dropped rather than sent to the client.

use thiserror::Error;
use tower_lsp::lsp_types::{Position, Url};

#[derive(Debug, Error)]
pub enum LspError {
    #[error("Feature disabled: {feature}")]
    FeatureDisabled { feature: String },

    #[error("Document not found: {uri}")]
    DocumentNotFound { uri: String },

    #[error("Not a file URI: {uri}")]
    NotAFile { uri: String },

    #[error("No workspace contains {uri}")]
    OutsideWorkspace { uri: String },

    #[error("Invalid position: line {line}, char {character} in {uri}")]
    InvalidPosition {
        uri: String,
        line: u32,
        character: u32,
    },

    #[error("Unresolved import {specifier}")]
    Unresolved { specifier: String },
}

impl LspError {
    /// Log the error at debug level.
    pub fn log_debug(&self) {
        tracing::debug!("LSP Error: {}", self);
    }

    /// Log the error at warn level.
    pub fn log_warn(&self) {
        tracing::warn!("LSP Error: {}", self);
    }

    pub fn document_not_found(uri: &Url) -> Self {
        Self::DocumentNotFound {
            uri: uri.to_string(),
        }
    }

    pub fn not_a_file(uri: &Url) -> Self {
        Self::NotAFile {
            uri: uri.to_string(),
        }
    }

    pub fn outside_workspace(uri: &Url) -> Self {
        Self::OutsideWorkspace {
            uri: uri.to_string(),
        }
    }

    pub fn invalid_position(uri: &Url, position: Position) -> Self {
        Self::InvalidPosition {
            uri: uri.to_string(),
            line: position.line,
            character: position.character,
        }
    }

    pub fn feature_disabled(feature: &str) -> Self {
        Self::FeatureDisabled {
            feature: feature.to_string(),
        }
    }

    pub fn unresolved(specifier: &str) -> Self {
        Self::Unresolved {
            specifier: specifier.to_string(),
        }
    }
}
