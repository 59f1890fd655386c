//! Export service
//!
//! Writes every flattened layer to its own scratch container, then merges
//! the written ones into the output container in flatten order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::application::output_path::resolve_output_path;
use crate::application::{
    ApplicationError, ApplicationResult, ExportReport, IoResultExt, LayerOutcome,
};
use crate::domain::{flatten_with, FlatLayer, UsedNames, DEFAULT_GROUP_SEPARATOR};
use crate::infrastructure::traits::{AccessMode, ContainerDriver, FileSystem, Prompter, TreeProvider};

const SCRATCH_PREFIX: &str = "gpkg-export-";

/// Layer written to the scratch directory, waiting to be merged.
#[derive(Debug)]
struct StagedLayer {
    name: String,
    path: PathBuf,
}

/// Service exporting a layer tree into one container.
pub struct ExportService {
    fs: Arc<dyn FileSystem>,
    driver: Arc<dyn ContainerDriver>,
    prompter: Arc<dyn Prompter>,
    scratch_parent: Option<PathBuf>,
    group_separator: String,
}

impl ExportService {
    /// Create a new export service.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        driver: Arc<dyn ContainerDriver>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            fs,
            driver,
            prompter,
            scratch_parent: None,
            group_separator: DEFAULT_GROUP_SEPARATOR.to_string(),
        }
    }

    /// Create scratch directories below `dir` instead of the system temp dir.
    pub fn with_scratch_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(dir.into());
        self
    }

    pub fn with_group_separator(mut self, separator: impl Into<String>) -> Self {
        self.group_separator = separator.into();
        self
    }

    /// Full export of a project tree.
    ///
    /// Resolves the output path first; returns `Ok(None)` if the user aborts,
    /// in which case nothing was written and no scratch directory created.
    #[instrument(skip(self, provider))]
    pub fn run(
        &self,
        provider: &dyn TreeProvider,
        requested_output: Option<&Path>,
        assume_yes: bool,
    ) -> ApplicationResult<Option<ExportReport>> {
        let output = match resolve_output_path(
            requested_output,
            self.driver.extension(),
            self.fs.as_ref(),
            self.prompter.as_ref(),
            assume_yes,
        )? {
            Some(output) => output,
            None => return Ok(None),
        };

        let entries = flatten_with(provider.root(), &self.group_separator);
        self.export(&entries, &output).map(Some)
    }

    /// Export flattened layers into the container at `output`.
    ///
    /// Write failures are reported per layer. A merge failure aborts the run
    /// with [`ApplicationError::MergeFailed`]. The scratch directory is gone
    /// when this returns, whatever the outcome.
    #[instrument(skip(self, entries), fields(layers = entries.len()))]
    pub fn export(&self, entries: &[FlatLayer<'_>], output: &Path) -> ApplicationResult<ExportReport> {
        let scratch = self.create_scratch()?;
        let scratch_path = scratch.path().to_path_buf();
        debug!("export: scratch dir {}", scratch_path.display());

        let result = self.export_staged(entries, output, &scratch_path);

        match scratch.close() {
            Ok(()) => debug!("export: removed scratch dir {}", scratch_path.display()),
            Err(e) => {
                warn!(
                    "export: cannot remove scratch dir {}: {}",
                    scratch_path.display(),
                    e
                );
                if result.is_ok() {
                    return Err::<ExportReport, _>(e).with_path_context("remove scratch dir", &scratch_path);
                }
            }
        }
        result
    }

    fn create_scratch(&self) -> ApplicationResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        match &self.scratch_parent {
            Some(parent) => {
                self.fs
                    .create_dir_all(parent)
                    .with_path_context("create scratch parent", parent)?;
                builder
                    .tempdir_in(parent)
                    .with_path_context("create scratch dir", parent)
            }
            None => builder
                .tempdir()
                .with_path_context("create scratch dir", &std::env::temp_dir()),
        }
    }

    fn export_staged(
        &self,
        entries: &[FlatLayer<'_>],
        output: &Path,
        scratch: &Path,
    ) -> ApplicationResult<ExportReport> {
        let mut used = UsedNames::new();
        let mut stems: HashSet<String> = HashSet::new();
        let mut outcomes = Vec::with_capacity(entries.len());
        let mut staged = Vec::new();

        for entry in entries {
            let name = used.reserve(&entry.qualified_name);
            let path = scratch.join(format!(
                "{}.{}",
                staging_stem(&name, &mut stems),
                self.driver.extension()
            ));

            match self.driver.write_layer(entry.layer, &path, &name) {
                Ok(features) => {
                    info!("wrote '{}' ({} features)", name, features);
                    outcomes.push(LayerOutcome::written(name.clone(), features));
                    staged.push(StagedLayer { name, path });
                }
                Err(e) => {
                    warn!("cannot write '{}': {}", name, e);
                    outcomes.push(LayerOutcome::failed(name, e.to_string()));
                }
            }
        }

        for (i, layer) in staged.iter().enumerate() {
            let mode = if i == 0 {
                AccessMode::Overwrite
            } else {
                AccessMode::Append
            };
            debug!("merge '{}' ({:?})", layer.name, mode);
            self.driver
                .merge_layer(&layer.path, &layer.name, output, mode)
                .map_err(|e| ApplicationError::MergeFailed {
                    layer: layer.name.clone(),
                    source: Box::new(e),
                })?;
        }

        if staged.is_empty() {
            warn!("no layer written, {} not created", output.display());
        }

        Ok(ExportReport {
            output: output.to_path_buf(),
            outcomes,
            container_written: !staged.is_empty(),
        })
    }
}

/// File stem for a scratch container: the layer name with characters that
/// are not allowed in file names replaced, made unique case-insensitively.
fn staging_stem(name: &str, taken: &mut HashSet<String>) -> String {
    let mut base: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if base.is_empty() || base.chars().all(|c| c == '.') {
        base = "layer".to_string();
    }

    let mut stem = base.clone();
    let mut k = 1usize;
    while !taken.insert(stem.to_lowercase()) {
        stem = format!("{base}_{k}");
        k += 1;
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_plain_name_when_staging_then_keeps_it() {
        let mut taken = HashSet::new();
        assert_eq!(staging_stem("Group1_LayerX", &mut taken), "Group1_LayerX");
    }

    #[test]
    fn given_path_characters_when_staging_then_replaces_and_dedups() {
        let mut taken = HashSet::new();
        assert_eq!(staging_stem("a/b", &mut taken), "a_b");
        assert_eq!(staging_stem("a_b", &mut taken), "a_b_1");
        assert_eq!(staging_stem("..", &mut taken), "layer");
    }
}
