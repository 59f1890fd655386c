//! Export every vector layer of a project's layer tree into a single
//! GeoPackage, keeping the group hierarchy in the layer names.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
