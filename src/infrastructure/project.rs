//! Project files: TOML description of a layer tree
//!
//! ```toml
//! name = "city"
//!
//! [[layers]]
//! group = "Transport"
//!
//!   [[layers.layers]]
//!   name = "Roads"
//!   source = "data/roads.geojson"
//!   crs = "EPSG:3857"
//!
//! [[layers]]
//! name = "Elevation"
//! kind = "raster"
//! source = "dem.tif"
//! ```
//!
//! A vector layer without `source` is a broken reference. Relative sources
//! resolve against the project file's directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::domain::{
    expand_env_vars, Crs, DomainError, LayerGroup, LayerRef, RasterLayer, SourceFormat, TreeNode,
    VectorLayer,
};
use crate::infrastructure::traits::{FileSystem, TreeProvider};
use crate::infrastructure::{InfraError, InfraResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProject {
    name: Option<String>,
    #[serde(default)]
    layers: Vec<RawNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    #[default]
    Vector,
    Raster,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    group: Option<String>,
    name: Option<String>,
    #[serde(default)]
    kind: RawKind,
    source: Option<String>,
    source_layer: Option<String>,
    crs: Option<String>,
    #[serde(default)]
    layers: Vec<RawNode>,
}

/// Layer tree loaded from a project file.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub path: PathBuf,
    root: LayerGroup,
}

impl ProjectFile {
    /// Read and parse the project file at `path`.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> InfraResult<Self> {
        let content = fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read project {}", path.display()), e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let default_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&content, path, base_dir, &default_name)
    }

    /// Parse project content; `path` is only used for error messages.
    pub fn parse(
        content: &str,
        path: &Path,
        base_dir: &Path,
        default_name: &str,
    ) -> InfraResult<Self> {
        let raw: RawProject = toml::from_str(content).map_err(|e| InfraError::Project {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut root = LayerGroup::new(raw.name.unwrap_or_else(|| default_name.to_string()));
        for node in raw.layers {
            root.push(convert(node, base_dir).map_err(|e| InfraError::Project {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?);
        }
        debug!(
            "project {}: {} top-level nodes",
            path.display(),
            root.children.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }
}

impl TreeProvider for ProjectFile {
    fn root(&self) -> &LayerGroup {
        &self.root
    }
}

fn convert(node: RawNode, base_dir: &Path) -> Result<TreeNode, DomainError> {
    match (node.group, node.name) {
        (Some(_), Some(name)) => Err(DomainError::InvalidNode {
            name,
            reason: "node has both 'group' and 'name'".to_string(),
        }),
        (None, None) => Err(DomainError::InvalidNode {
            name: String::new(),
            reason: "node needs 'group' or 'name'".to_string(),
        }),
        (Some(group), None) => {
            if node.source.is_some() || node.crs.is_some() || node.source_layer.is_some() {
                return Err(DomainError::InvalidNode {
                    name: group,
                    reason: "groups take no source, source_layer or crs".to_string(),
                });
            }
            let children = node
                .layers
                .into_iter()
                .map(|child| convert(child, base_dir))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TreeNode::Group(LayerGroup {
                name: group,
                children,
            }))
        }
        (None, Some(name)) => {
            if !node.layers.is_empty() {
                return Err(DomainError::InvalidNode {
                    name,
                    reason: "layers cannot have children".to_string(),
                });
            }
            let source = node.source.map(|s| resolve_source(&s, base_dir));
            let layer = match (node.kind, source) {
                (_, None) => LayerRef::broken(name),
                (RawKind::Raster, Some(source)) => LayerRef::raster(RasterLayer { name, source }),
                (RawKind::Vector, Some(source)) => {
                    let format = match node.source_layer {
                        Some(layer) => SourceFormat::GeoPackage { layer: Some(layer) },
                        None => SourceFormat::from_path(&source).ok_or_else(|| {
                            DomainError::InvalidNode {
                                name: name.clone(),
                                reason: format!(
                                    "unsupported vector source {}",
                                    source.display()
                                ),
                            }
                        })?,
                    };
                    let crs = match node.crs {
                        Some(crs) => crs.parse::<Crs>()?,
                        None => Crs::default(),
                    };
                    LayerRef::vector(VectorLayer::new(name, source, format).with_crs(crs))
                }
            };
            Ok(TreeNode::Layer(layer))
        }
    }
}

fn resolve_source(source: &str, base_dir: &Path) -> PathBuf {
    let expanded = PathBuf::from(expand_env_vars(source));
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}
