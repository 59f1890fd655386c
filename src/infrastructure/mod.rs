//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits (project files, GeoPackage
//! containers, prompts) and wires up services.

pub mod di;
pub mod error;
pub mod geojson;
pub mod gpkg;
pub mod project;
pub mod traits;

pub use error::{ContainerError, ContainerResult, InfraError, InfraResult};
