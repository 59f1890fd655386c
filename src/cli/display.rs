//! Layer tree rendering for the `tree` command

use termtree::Tree;

use crate::domain::{LayerGroup, MapLayer, TreeNode};

/// Render a group and its descendants.
///
/// Groups end in `/`, raster layers and broken references are marked.
pub fn layer_tree(group: &LayerGroup) -> Tree<String> {
    let leaves: Vec<Tree<String>> = group.children.iter().map(node_tree).collect();
    Tree::new(format!("{}/", group.name)).with_leaves(leaves)
}

fn node_tree(node: &TreeNode) -> Tree<String> {
    match node {
        TreeNode::Group(group) => layer_tree(group),
        TreeNode::Layer(layer) => {
            let label = match &layer.layer {
                Some(MapLayer::Vector(v)) => format!("{} ({})", layer.name, v.crs),
                Some(MapLayer::Raster(_)) => format!("{} [raster, skipped]", layer.name),
                None => format!("{} [missing]", layer.name),
            };
            Tree::new(label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LayerRef, RasterLayer, SourceFormat, VectorLayer};

    #[test]
    fn given_nested_tree_when_rendering_then_marks_non_vector_layers() {
        let root = LayerGroup::new("city")
            .with_child(TreeNode::Group(LayerGroup::new("Transport").with_child(
                TreeNode::Layer(LayerRef::vector(VectorLayer::new(
                    "Roads",
                    "roads.geojson",
                    SourceFormat::GeoJson,
                ))),
            )))
            .with_child(TreeNode::Layer(LayerRef::raster(RasterLayer {
                name: "dem".into(),
                source: "dem.tif".into(),
            })))
            .with_child(TreeNode::Layer(LayerRef::broken("lost")));

        let rendered = layer_tree(&root).to_string();

        assert!(rendered.starts_with("city/\n"));
        assert!(rendered.contains("Transport/"));
        assert!(rendered.contains("Roads (EPSG:4326)"));
        assert!(rendered.contains("dem [raster, skipped]"));
        assert!(rendered.contains("lost [missing]"));
    }
}
