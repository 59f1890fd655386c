//! Infrastructure-level errors (wraps application errors)

use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project file {path}: {message}")]
    Project { path: PathBuf, message: String },

    #[error("{0}")]
    Container(#[from] ContainerError),
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;

/// Errors raised by a container driver while reading or writing GeoPackages.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid GeoJSON in {path}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("container already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("container not found: {0}")]
    NotFound(PathBuf),

    #[error("layer '{layer}' not found in {path}")]
    LayerNotFound { path: PathBuf, layer: String },

    #[error("layer '{layer}' already exists in {path}")]
    LayerExists { path: PathBuf, layer: String },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl ContainerError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for container driver operations.
pub type ContainerResult<T> = Result<T, ContainerError>;
