//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent violations of the layer-tree model.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid CRS '{value}': {reason}")]
    InvalidCrs { value: String, reason: String },

    #[error("invalid layer tree node '{name}': {reason}")]
    InvalidNode { name: String, reason: String },

    #[error("layer source not found: {0}")]
    SourceNotFound(PathBuf),
}
