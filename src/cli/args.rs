//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Export all vector layers of a project tree into one GeoPackage
#[derive(Parser, Debug)]
#[command(name = "gpkg-export")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every vector layer into a single GeoPackage
    Export {
        /// Project file describing the layer tree
        #[arg(value_hint = ValueHint::FilePath)]
        project: PathBuf,

        /// Output GeoPackage (asked for when omitted; `.gpkg` is appended if missing)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Overwrite an existing output without asking
        #[arg(short, long)]
        force: bool,
    },

    /// List the layer names an export would produce, in export order
    List {
        /// Project file describing the layer tree
        #[arg(value_hint = ValueHint::FilePath)]
        project: PathBuf,
    },

    /// Show the project layer tree
    Tree {
        /// Project file describing the layer tree
        #[arg(value_hint = ValueHint::FilePath)]
        project: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show {
        /// Project file whose local config is merged in
        #[arg(value_hint = ValueHint::FilePath)]
        project: Option<PathBuf>,
    },

    /// Show config paths
    Path,
}
