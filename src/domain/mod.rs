//! Domain layer: layer tree model, flattening and naming
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod crs;
pub mod error;
pub mod flatten;
pub mod naming;
pub mod tree;

pub use crs::Crs;
pub use error::DomainError;
pub use flatten::{flatten, flatten_with, FlatLayer, DEFAULT_GROUP_SEPARATOR};
pub use naming::UsedNames;
pub use tree::{
    expand_env_vars, LayerGroup, LayerRef, MapLayer, RasterLayer, SourceFormat, TreeNode,
    VectorLayer,
};
