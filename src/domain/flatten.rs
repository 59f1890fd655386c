//! Flattening of a layer tree into qualified layer names

use tracing::debug;

use crate::domain::{LayerGroup, TreeNode, VectorLayer};

/// Separator appended to each ancestor group name.
pub const DEFAULT_GROUP_SEPARATOR: &str = "_";

/// A vector layer together with its group-qualified name.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLayer<'a> {
    pub qualified_name: String,
    pub layer: &'a VectorLayer,
}

/// Flatten `root` using the default group separator.
pub fn flatten(root: &LayerGroup) -> Vec<FlatLayer<'_>> {
    flatten_with(root, DEFAULT_GROUP_SEPARATOR)
}

/// Walk the tree depth-first in child order and emit every vector layer.
///
/// The root group's own name is not part of the qualified names. Raster
/// layers and broken references are skipped. Names are not deduplicated
/// here; see [`crate::domain::UsedNames`].
pub fn flatten_with<'a>(root: &'a LayerGroup, separator: &str) -> Vec<FlatLayer<'a>> {
    let mut out = Vec::new();
    walk(root, "", separator, &mut out);
    debug!("flatten: {} vector layers", out.len());
    out
}

fn walk<'a>(group: &'a LayerGroup, prefix: &str, separator: &str, out: &mut Vec<FlatLayer<'a>>) {
    for child in &group.children {
        match child {
            TreeNode::Group(sub) => {
                let path = format!("{prefix}{}{separator}", sub.name);
                walk(sub, &path, separator, out);
            }
            TreeNode::Layer(layer_ref) => match layer_ref.as_vector() {
                Some(layer) => out.push(FlatLayer {
                    qualified_name: format!("{prefix}{}", layer.name),
                    layer,
                }),
                None => debug!("flatten: skipping non-vector layer '{}'", layer_ref.name),
            },
        }
    }
}
