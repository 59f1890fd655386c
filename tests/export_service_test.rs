//! Integration tests for the export workflow: staging, merging, cleanup

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use gpkg_export::application::services::ExportService;
use gpkg_export::application::{ApplicationError, LayerStatus};
use gpkg_export::domain::{
    LayerGroup, LayerRef, RasterLayer, SourceFormat, TreeNode, VectorLayer,
};
use gpkg_export::infrastructure::gpkg::GpkgDriver;
use gpkg_export::infrastructure::traits::{
    AccessMode, ContainerDriver, Prompter, RealFileSystem, TreeProvider,
};
use gpkg_export::infrastructure::{ContainerError, ContainerResult};
use gpkg_export::util::testing;

const TWO_POINTS: &str = r#"{"type": "FeatureCollection", "features": [
  {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 2]}, "properties": {"id": 1}},
  {"type": "Feature", "geometry": {"type": "Point", "coordinates": [3, 4]}, "properties": {"id": 2}}
]}"#;

const ONE_POLYGON: &str = r#"{"type": "FeatureCollection", "features": [
  {"type": "Feature",
   "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]},
   "properties": {"kind": "park"}}
]}"#;

/// Mock prompter with predetermined answers
struct MockPrompter {
    confirm: bool,
    path: Option<PathBuf>,
    questions: Mutex<Vec<String>>,
}

impl MockPrompter {
    fn new(confirm: bool, path: Option<PathBuf>) -> Self {
        Self {
            confirm,
            path,
            questions: Mutex::new(Vec::new()),
        }
    }

    fn question_count(&self) -> usize {
        self.questions.lock().unwrap().len()
    }
}

impl Prompter for MockPrompter {
    fn confirm(&self, question: &str) -> io::Result<bool> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(self.confirm)
    }

    fn ask_path(&self, question: &str) -> io::Result<Option<PathBuf>> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(self.path.clone())
    }
}

/// Writes through the real driver but refuses to merge one layer
struct FailingMergeDriver {
    inner: GpkgDriver,
    fail_on: String,
}

impl ContainerDriver for FailingMergeDriver {
    fn extension(&self) -> &str {
        self.inner.extension()
    }

    fn write_layer(
        &self,
        layer: &VectorLayer,
        path: &Path,
        layer_name: &str,
    ) -> ContainerResult<usize> {
        self.inner.write_layer(layer, path, layer_name)
    }

    fn merge_layer(
        &self,
        src: &Path,
        layer_name: &str,
        dst: &Path,
        mode: AccessMode,
    ) -> ContainerResult<()> {
        if layer_name == self.fail_on {
            return Err(ContainerError::io(
                format!("merge {layer_name}"),
                io::Error::new(io::ErrorKind::Other, "disk full"),
            ));
        }
        self.inner.merge_layer(src, layer_name, dst, mode)
    }

    fn list_layers(&self, path: &Path) -> ContainerResult<Vec<String>> {
        self.inner.list_layers(path)
    }
}

struct StaticTree(LayerGroup);

impl TreeProvider for StaticTree {
    fn root(&self) -> &LayerGroup {
        &self.0
    }
}

fn write_geojson(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write geojson");
    path
}

fn vector(name: &str, source: &Path) -> TreeNode {
    TreeNode::Layer(LayerRef::vector(VectorLayer::new(
        name,
        source,
        SourceFormat::GeoJson,
    )))
}

fn group(name: &str, children: Vec<TreeNode>) -> TreeNode {
    TreeNode::Group(LayerGroup {
        name: name.to_string(),
        children,
    })
}

/// Root -> [Group1 -> [LayerX, LayerY], LayerZ]
fn scenario_tree(data: &Path) -> StaticTree {
    let points = write_geojson(data, "points.geojson", TWO_POINTS);
    let polygon = write_geojson(data, "polygon.geojson", ONE_POLYGON);
    StaticTree(LayerGroup {
        name: "project".to_string(),
        children: vec![
            group(
                "Group1",
                vec![vector("LayerX", &points), vector("LayerY", &polygon)],
            ),
            vector("LayerZ", &points),
        ],
    })
}

fn service(
    driver: Arc<dyn ContainerDriver>,
    prompter: Arc<dyn Prompter>,
    scratch: &Path,
) -> ExportService {
    ExportService::new(Arc::new(RealFileSystem), driver, prompter).with_scratch_parent(scratch)
}

fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[test]
fn given_grouped_tree_when_exporting_then_output_has_qualified_layers_in_order() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let tree = scenario_tree(temp.path());
    let scratch = temp.path().join("scratch");
    let output = temp.path().join("out");
    let driver = Arc::new(GpkgDriver::new());
    let svc = service(
        driver.clone(),
        Arc::new(MockPrompter::new(false, None)),
        &scratch,
    );

    let report = svc
        .run(&tree, Some(&output), false)
        .expect("export")
        .expect("not aborted");

    let expected_output = temp.path().join("out.gpkg");
    assert_eq!(report.output, expected_output);
    assert!(report.container_written);
    assert_eq!(report.written_count(), 3);
    assert_eq!(
        driver.list_layers(&expected_output).unwrap(),
        vec!["Group1_LayerX", "Group1_LayerY", "LayerZ"]
    );
    assert!(dir_is_empty(&scratch), "scratch dir must be removed");
}

#[test]
fn given_colliding_names_when_exporting_then_suffixes_later_layers() {
    let temp = TempDir::new().unwrap();
    let points = write_geojson(temp.path(), "points.geojson", TWO_POINTS);
    let tree = StaticTree(
        LayerGroup::new("project")
            .with_child(vector("LayerX", &points))
            .with_child(vector("LayerX", &points)),
    );
    let output = temp.path().join("dup.gpkg");
    let driver = Arc::new(GpkgDriver::new());
    let svc = service(
        driver.clone(),
        Arc::new(MockPrompter::new(false, None)),
        &temp.path().join("scratch"),
    );

    let report = svc.run(&tree, Some(&output), false).unwrap().unwrap();

    let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["LayerX", "LayerX_1"]);
    assert_eq!(driver.list_layers(&output).unwrap(), vec!["LayerX", "LayerX_1"]);
}

#[test]
fn given_raster_layer_when_exporting_then_it_is_not_in_output() {
    let temp = TempDir::new().unwrap();
    let points = write_geojson(temp.path(), "points.geojson", TWO_POINTS);
    let tree = StaticTree(
        LayerGroup::new("project")
            .with_child(TreeNode::Layer(LayerRef::raster(RasterLayer {
                name: "Elevation".to_string(),
                source: temp.path().join("dem.tif"),
            })))
            .with_child(vector("Roads", &points)),
    );
    let output = temp.path().join("out.gpkg");
    let driver = Arc::new(GpkgDriver::new());
    let svc = service(
        driver.clone(),
        Arc::new(MockPrompter::new(false, None)),
        &temp.path().join("scratch"),
    );

    let report = svc.run(&tree, Some(&output), false).unwrap().unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(driver.list_layers(&output).unwrap(), vec!["Roads"]);
}

#[test]
fn given_unreadable_layer_when_exporting_then_reports_it_and_continues() {
    let temp = TempDir::new().unwrap();
    let points = write_geojson(temp.path(), "points.geojson", TWO_POINTS);
    let tree = StaticTree(
        LayerGroup::new("project")
            .with_child(vector("Missing", &temp.path().join("missing.geojson")))
            .with_child(vector("Roads", &points)),
    );
    let output = temp.path().join("out.gpkg");
    let driver = Arc::new(GpkgDriver::new());
    let svc = service(
        driver.clone(),
        Arc::new(MockPrompter::new(false, None)),
        &temp.path().join("scratch"),
    );

    let report = svc.run(&tree, Some(&output), false).unwrap().unwrap();

    assert_eq!(report.failed_count(), 1);
    assert!(matches!(
        report.outcomes[0].status,
        LayerStatus::WriteFailed { .. }
    ));
    assert_eq!(
        report.outcomes[1].status,
        LayerStatus::Written { features: 2 }
    );
    assert_eq!(driver.list_layers(&output).unwrap(), vec!["Roads"]);
}

#[test]
fn given_no_layer_written_when_exporting_then_creates_no_container() {
    let temp = TempDir::new().unwrap();
    let tree = StaticTree(
        LayerGroup::new("project").with_child(vector("Missing", &temp.path().join("gone.geojson"))),
    );
    let output = temp.path().join("out.gpkg");
    let svc = service(
        Arc::new(GpkgDriver::new()),
        Arc::new(MockPrompter::new(false, None)),
        &temp.path().join("scratch"),
    );

    let report = svc.run(&tree, Some(&output), false).unwrap().unwrap();

    assert!(!report.container_written);
    assert!(!output.exists());
}

#[test]
fn given_merge_failure_when_exporting_then_errors_and_removes_scratch() {
    let temp = TempDir::new().unwrap();
    let tree = scenario_tree(temp.path());
    let scratch = temp.path().join("scratch");
    let output = temp.path().join("out.gpkg");
    let driver = Arc::new(FailingMergeDriver {
        inner: GpkgDriver::new(),
        fail_on: "Group1_LayerY".to_string(),
    });
    let svc = service(driver, Arc::new(MockPrompter::new(false, None)), &scratch);

    let result = svc.run(&tree, Some(&output), false);

    match result {
        Err(ApplicationError::MergeFailed { layer, .. }) => assert_eq!(layer, "Group1_LayerY"),
        other => panic!("expected MergeFailed, got {other:?}"),
    }
    assert!(dir_is_empty(&scratch), "scratch dir must be removed");
}

#[test]
fn given_existing_output_and_declined_overwrite_when_exporting_then_leaves_it_untouched() {
    let temp = TempDir::new().unwrap();
    let tree = scenario_tree(temp.path());
    let scratch = temp.path().join("scratch");
    let output = temp.path().join("out.gpkg");
    fs::write(&output, b"keep me").unwrap();
    let prompter = Arc::new(MockPrompter::new(false, None));
    let svc = service(Arc::new(GpkgDriver::new()), prompter.clone(), &scratch);

    let result = svc
        .run(&tree, Some(&temp.path().join("out")), false)
        .unwrap();

    assert!(result.is_none());
    assert_eq!(prompter.question_count(), 1);
    assert_eq!(fs::read(&output).unwrap(), b"keep me");
    assert!(!scratch.exists(), "no scratch dir before confirmation");
}

#[test]
fn given_existing_output_and_confirmed_overwrite_when_exporting_then_replaces_it() {
    let temp = TempDir::new().unwrap();
    let tree = scenario_tree(temp.path());
    let output = temp.path().join("out.gpkg");
    fs::write(&output, b"stale").unwrap();
    let driver = Arc::new(GpkgDriver::new());
    let svc = service(
        driver.clone(),
        Arc::new(MockPrompter::new(true, None)),
        &temp.path().join("scratch"),
    );

    svc.run(&tree, Some(&output), false).unwrap().unwrap();

    assert_eq!(driver.list_layers(&output).unwrap().len(), 3);
}

#[test]
fn given_assume_yes_when_exporting_twice_then_second_run_matches_first() {
    let temp = TempDir::new().unwrap();
    let tree = scenario_tree(temp.path());
    let output = temp.path().join("out.gpkg");
    let driver = Arc::new(GpkgDriver::new());
    let prompter = Arc::new(MockPrompter::new(false, None));
    let svc = service(driver.clone(), prompter.clone(), &temp.path().join("scratch"));

    svc.run(&tree, Some(&output), true).unwrap().unwrap();
    let first = driver.list_layers(&output).unwrap();
    svc.run(&tree, Some(&output), true).unwrap().unwrap();
    let second = driver.list_layers(&output).unwrap();

    assert_eq!(first, second);
    assert_eq!(prompter.question_count(), 0);
}

#[test]
fn given_no_output_path_when_exporting_then_asks_for_one() {
    let temp = TempDir::new().unwrap();
    let tree = scenario_tree(temp.path());
    let answer = temp.path().join("asked");
    let prompter = Arc::new(MockPrompter::new(false, Some(answer)));
    let svc = service(
        Arc::new(GpkgDriver::new()),
        prompter.clone(),
        &temp.path().join("scratch"),
    );

    let report = svc.run(&tree, None, false).unwrap().unwrap();

    assert_eq!(report.output, temp.path().join("asked.gpkg"));
    assert!(report.output.exists());
    assert_eq!(prompter.question_count(), 1);
}

#[test]
fn given_cancelled_path_prompt_when_exporting_then_aborts() {
    let temp = TempDir::new().unwrap();
    let tree = scenario_tree(temp.path());
    let scratch = temp.path().join("scratch");
    let svc = service(
        Arc::new(GpkgDriver::new()),
        Arc::new(MockPrompter::new(true, None)),
        &scratch,
    );

    let result = svc.run(&tree, None, false).unwrap();

    assert!(result.is_none());
    assert!(!scratch.exists());
}
