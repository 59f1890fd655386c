//! Layer tree entities: groups, layer references and the layers they resolve to

use std::path::PathBuf;

use crate::domain::Crs;

/// Node of a project's layer tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Group(LayerGroup),
    Layer(LayerRef),
}

impl TreeNode {
    /// Display name of the node (group name or layer reference name).
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Group(group) => &group.name,
            TreeNode::Layer(layer) => &layer.name,
        }
    }
}

/// Named group with ordered children.
///
/// The root of a project tree is a group whose name is not part of any
/// qualified layer name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerGroup {
    pub name: String,
    pub children: Vec<TreeNode>,
}

impl LayerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: TreeNode) {
        self.children.push(child);
    }
}

/// Leaf entry of the tree pointing at a map layer.
///
/// `layer` is `None` when the reference is broken (its data source is gone).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRef {
    pub name: String,
    pub layer: Option<MapLayer>,
}

impl LayerRef {
    pub fn vector(layer: VectorLayer) -> Self {
        Self {
            name: layer.name.clone(),
            layer: Some(MapLayer::Vector(layer)),
        }
    }

    pub fn raster(layer: RasterLayer) -> Self {
        Self {
            name: layer.name.clone(),
            layer: Some(MapLayer::Raster(layer)),
        }
    }

    pub fn broken(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer: None,
        }
    }

    /// The vector layer behind this reference, if there is one.
    pub fn as_vector(&self) -> Option<&VectorLayer> {
        match &self.layer {
            Some(MapLayer::Vector(layer)) => Some(layer),
            Some(MapLayer::Raster(_)) | None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapLayer {
    Vector(VectorLayer),
    Raster(RasterLayer),
}

/// How a vector layer's content is stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFormat {
    GeoJson,
    /// Existing GeoPackage; `layer` picks the table, `None` means the first
    /// features table in the file.
    GeoPackage { layer: Option<String> },
}

impl SourceFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(SourceFormat::GeoJson),
            "gpkg" => Some(SourceFormat::GeoPackage { layer: None }),
            _ => None,
        }
    }
}

/// Vector dataset owned by the project. The export only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    /// Display name as shown in the layer tree
    pub name: String,
    pub crs: Crs,
    pub source: PathBuf,
    pub format: SourceFormat,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            name: name.into(),
            crs: Crs::default(),
            source: source.into(),
            format,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub name: String,
    pub source: PathBuf,
}

/// Expand environment variables in a path string.
///
/// Supports:
/// - `$VAR` syntax
/// - `${VAR}` syntax
/// - `~` for home directory
///
/// Uses shellexpand crate for robust expansion.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
