//! Tests for loading layer trees from project files

use std::fs;
use std::path::Path;

use rstest::rstest;
use tempfile::TempDir;

use gpkg_export::domain::{flatten, Crs, MapLayer, SourceFormat, TreeNode};
use gpkg_export::infrastructure::project::ProjectFile;
use gpkg_export::infrastructure::traits::{RealFileSystem, TreeProvider};
use gpkg_export::infrastructure::InfraError;

const CITY: &str = r#"
name = "city"

[[layers]]
group = "Transport"

  [[layers.layers]]
  name = "Roads"
  source = "data/roads.geojson"
  crs = "EPSG:3857"

  [[layers.layers]]
  name = "Stops"
  source = "/abs/stops.gpkg"
  source_layer = "bus_stops"

[[layers]]
name = "Elevation"
kind = "raster"
source = "dem.tif"

[[layers]]
name = "Orphan"
"#;

fn parse(content: &str) -> Result<ProjectFile, InfraError> {
    ProjectFile::parse(
        content,
        Path::new("/projects/city.toml"),
        Path::new("/projects"),
        "city",
    )
}

#[test]
fn given_project_file_when_parsing_then_builds_tree_in_order() {
    let project = parse(CITY).expect("parse project");
    let root = project.root();

    assert_eq!(root.name, "city");
    let names: Vec<&str> = root.children.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Transport", "Elevation", "Orphan"]);

    match &root.children[1] {
        TreeNode::Layer(r) => assert!(matches!(r.layer, Some(MapLayer::Raster(_)))),
        other => panic!("expected raster layer, got {other:?}"),
    }
    match &root.children[2] {
        TreeNode::Layer(r) => assert!(r.layer.is_none(), "no source means broken"),
        other => panic!("expected broken layer, got {other:?}"),
    }
}

#[test]
fn given_vector_layers_when_parsing_then_resolves_sources_formats_and_crs() {
    let project = parse(CITY).unwrap();
    let entries = flatten(project.root());

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].qualified_name, "Transport_Roads");
    assert_eq!(
        entries[0].layer.source,
        Path::new("/projects/data/roads.geojson")
    );
    assert_eq!(entries[0].layer.format, SourceFormat::GeoJson);
    assert_eq!(entries[0].layer.crs, Crs::epsg(3857));

    assert_eq!(entries[1].qualified_name, "Transport_Stops");
    assert_eq!(entries[1].layer.source, Path::new("/abs/stops.gpkg"));
    assert_eq!(
        entries[1].layer.format,
        SourceFormat::GeoPackage {
            layer: Some("bus_stops".to_string())
        }
    );
    assert_eq!(entries[1].layer.crs, Crs::default());
}

#[test]
fn given_project_without_name_when_loading_then_uses_file_stem() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("harbour.toml");
    fs::write(
        &path,
        "[[layers]]\nname = \"Piers\"\nsource = \"piers.geojson\"\n",
    )
    .unwrap();

    let project = ProjectFile::load(&RealFileSystem, &path).expect("load project");

    assert_eq!(project.root().name, "harbour");
    let entries = flatten(project.root());
    assert_eq!(entries[0].layer.source, temp.path().join("piers.geojson"));
}

#[test]
fn given_missing_project_file_when_loading_then_io_error() {
    let temp = TempDir::new().unwrap();

    let result = ProjectFile::load(&RealFileSystem, &temp.path().join("none.toml"));

    assert!(matches!(result, Err(InfraError::Io { .. })));
}

#[rstest]
#[case::group_and_name("[[layers]]\ngroup = \"G\"\nname = \"L\"\n")]
#[case::neither("[[layers]]\nsource = \"a.geojson\"\n")]
#[case::group_with_source("[[layers]]\ngroup = \"G\"\nsource = \"a.geojson\"\n")]
#[case::layer_with_children(
    "[[layers]]\nname = \"L\"\nsource = \"a.geojson\"\n[[layers.layers]]\nname = \"C\"\n"
)]
#[case::unsupported_extension("[[layers]]\nname = \"L\"\nsource = \"a.shp\"\n")]
#[case::bad_crs("[[layers]]\nname = \"L\"\nsource = \"a.geojson\"\ncrs = \"EPSG:abc\"\n")]
#[case::unknown_key("[[layers]]\nname = \"L\"\nstyle = \"red\"\n")]
#[case::not_toml("this is = = not toml")]
fn given_invalid_project_when_parsing_then_project_error(#[case] content: &str) {
    let result = parse(content);

    assert!(
        matches!(result, Err(InfraError::Project { .. })),
        "got {result:?}"
    );
}
