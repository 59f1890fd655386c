//! Output container path resolution and overwrite confirmation

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::application::{ApplicationResult, IoResultExt};
use crate::infrastructure::traits::{FileSystem, Prompter};

/// Append `.<extension>` unless the file name already ends with it
/// (case-insensitively). `out.txt` becomes `out.txt.gpkg`.
pub fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let suffix = format!(".{}", extension.to_ascii_lowercase());
    let has_suffix = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase().ends_with(&suffix))
        .unwrap_or(false);
    if has_suffix {
        return path.to_path_buf();
    }
    let mut raw: OsString = path.as_os_str().to_os_string();
    raw.push(&suffix);
    PathBuf::from(raw)
}

/// Decide where the export goes.
///
/// Asks for a path when none was given. An existing file is removed only
/// after confirmation (or when `assume_yes` is set). Returns None when the
/// user aborts; nothing on disk has changed in that case.
pub fn resolve_output_path(
    requested: Option<&Path>,
    extension: &str,
    fs: &dyn FileSystem,
    prompter: &dyn Prompter,
    assume_yes: bool,
) -> ApplicationResult<Option<PathBuf>> {
    let requested = match requested {
        Some(path) => path.to_path_buf(),
        None => {
            let answer = prompter
                .ask_path("Save GeoPackage as:")
                .with_path_context("read output path", Path::new("<stdin>"))?;
            match answer {
                Some(path) if !path.as_os_str().is_empty() => path,
                _ => {
                    info!("no output path given, export aborted");
                    return Ok(None);
                }
            }
        }
    };

    let output = with_extension(&requested, extension);
    debug!("resolve_output_path: {}", output.display());

    if fs.exists(&output) {
        let confirmed = assume_yes
            || prompter
                .confirm(&format!("{} already exists. Overwrite?", output.display()))
                .with_path_context("read confirmation", &output)?;
        if !confirmed {
            info!("overwrite of {} declined, export aborted", output.display());
            return Ok(None);
        }
        fs.remove_file(&output)
            .with_path_context("remove existing output", &output)?;
    }

    Ok(Some(output))
}
