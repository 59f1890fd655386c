//! I/O boundary traits for testability
//!
//! These traits abstract the host project, the container format library,
//! user prompts and the filesystem, allowing services to be tested with
//! mock implementations.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::domain::{LayerGroup, VectorLayer};
use crate::infrastructure::ContainerResult;

/// Read-only source of a project's layer tree.
pub trait TreeProvider {
    /// Root group of the layer tree.
    fn root(&self) -> &LayerGroup;
}

/// How a merge treats the destination container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Create the container if needed; replace a layer of the same name.
    Overwrite,
    /// Add the layer next to existing ones; the container must exist.
    Append,
}

/// Vector container format library abstraction.
pub trait ContainerDriver: Send + Sync {
    /// File extension of containers written by this driver (without dot).
    fn extension(&self) -> &str;

    /// Write `layer` into a new single-layer container at `path`, naming the
    /// layer `layer_name`. Returns the number of features written.
    fn write_layer(&self, layer: &VectorLayer, path: &Path, layer_name: &str)
        -> ContainerResult<usize>;

    /// Copy layer `layer_name` from container `src` into container `dst`.
    fn merge_layer(
        &self,
        src: &Path,
        layer_name: &str,
        dst: &Path,
        mode: AccessMode,
    ) -> ContainerResult<()>;

    /// Layer names stored in the container, in creation order.
    fn list_layers(&self, path: &Path) -> ContainerResult<Vec<String>>;
}

/// Interactive questions to the user.
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&self, question: &str) -> io::Result<bool>;

    /// Ask for a path. Returns None if the user gives no answer.
    fn ask_path(&self, question: &str) -> io::Result<Option<PathBuf>>;
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Prompter reading answers from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_answer(&self, question: &str) -> io::Result<String> {
        print!("{} ", question.cyan());
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Prompter for StdinPrompter {
    fn confirm(&self, question: &str) -> io::Result<bool> {
        let answer = self.read_answer(&format!("{question} [y/N]"))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn ask_path(&self, question: &str) -> io::Result<Option<PathBuf>> {
        let answer = self.read_answer(question)?;
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(answer)))
        }
    }
}
