//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::display::layer_tree;
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{flatten_with, UsedNames};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::project::ProjectFile;
use crate::infrastructure::traits::{FileSystem, RealFileSystem, TreeProvider};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Export {
            project,
            output,
            force,
        }) => cmd_export(project, output.as_deref(), *force),
        Some(Commands::List { project }) => cmd_list(project),
        Some(Commands::Tree { project }) => cmd_tree(project),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show { project } => cmd_config_show(project.as_deref()),
            ConfigCommands::Path => cmd_config_path(),
        },
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see --help".to_string(),
        )),
    }
}

fn project_dir(project: &Path) -> Option<&Path> {
    project.parent().filter(|p| !p.as_os_str().is_empty())
}

fn load_project(fs: &dyn FileSystem, project: &Path) -> CliResult<ProjectFile> {
    Ok(ProjectFile::load(fs, project)?)
}

#[instrument]
fn cmd_export(project: &Path, output: Option<&Path>, force: bool) -> CliResult<()> {
    let settings = Settings::load(project_dir(project))?;
    let container = ServiceContainer::new(settings);
    let tree = load_project(container.fs.as_ref(), project)?;

    let assume_yes = force || container.settings.export.assume_yes;
    match container.export_service().run(&tree, output, assume_yes)? {
        Some(report) => output::report(&report),
        None => debug!("export aborted by user"),
    }
    Ok(())
}

#[instrument]
fn cmd_list(project: &Path) -> CliResult<()> {
    let settings = Settings::load(project_dir(project))?;
    let tree = load_project(&RealFileSystem, project)?;

    let mut used = UsedNames::new();
    for entry in flatten_with(tree.root(), &settings.naming.group_separator) {
        output::info(&used.reserve(&entry.qualified_name));
    }
    Ok(())
}

#[instrument]
fn cmd_tree(project: &Path) -> CliResult<()> {
    let tree = load_project(&RealFileSystem, project)?;
    output::info(&layer_tree(tree.root()));
    Ok(())
}

fn cmd_config_show(project: Option<&Path>) -> CliResult<()> {
    let settings = Settings::load(project.and_then(project_dir))?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn cmd_config_path() -> CliResult<()> {
    match global_config_path() {
        Some(path) => output::info(&format!("global: {}", path.display())),
        None => output::warning("cannot determine global config directory"),
    }
    output::info(&format!(
        "local:  {}",
        local_config_path(Path::new("<project dir>")).display()
    ));
    Ok(())
}
