//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use mediadir_core::MediaCategory;
use std::path::PathBuf;

/// mediadir - category-based access to a shared content store
#[derive(Parser, Debug)]
#[command(name = "mediadir")]
#[command(about = "Category-based access to a shared content store", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file to load instead of the layered defaults
    #[arg(long, global = true, env = "MEDIADIR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store root, overriding the configured one
    #[arg(long, global = true, env = "MEDIADIR_ROOT")]
    pub root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List records under a category
    List {
        /// Category to list
        category: MediaCategory,

        /// Sub-path under the category root
        #[arg(long)]
        sub_path: Option<String>,

        /// Skip records that are still pending
        #[arg(long)]
        visible_only: bool,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Copy a private file into a category
    Save {
        /// Destination category
        category: MediaCategory,

        /// File to copy
        file: PathBuf,

        /// Sub-path under the category root
        #[arg(long)]
        sub_path: Option<String>,

        /// Keep the record hidden until all bytes are written
        #[arg(long)]
        staged: bool,
    },

    /// Copy a record out to a private file
    Export {
        /// Source category
        category: MediaCategory,

        /// Display name of the record
        name: String,

        /// Destination file
        dest: PathBuf,

        /// Sub-path under the category root
        #[arg(long)]
        sub_path: Option<String>,
    },

    /// Delete a record
    Delete {
        /// Category holding the record
        category: MediaCategory,

        /// Display name of the record
        name: String,

        /// Sub-path under the category root
        #[arg(long)]
        sub_path: Option<String>,
    },

    /// Hide a record from other readers
    Hide {
        /// Category holding the record
        category: MediaCategory,

        /// Display name of the record
        name: String,

        /// Sub-path under the category root
        #[arg(long)]
        sub_path: Option<String>,
    },

    /// Make a hidden record visible again
    Show {
        /// Category holding the record
        category: MediaCategory,

        /// Display name of the record
        name: String,

        /// Sub-path under the category root
        #[arg(long)]
        sub_path: Option<String>,
    },

    /// Print a photo's capture metadata
    Exif {
        /// Category holding the photo
        category: MediaCategory,

        /// Display name of the photo
        name: String,

        /// Sub-path under the category root
        #[arg(long)]
        sub_path: Option<String>,
    },

    /// Print the store location a category sub-path resolves to
    Locate {
        /// Category to resolve
        category: MediaCategory,

        /// Sub-path under the category root
        #[arg(long)]
        sub_path: Option<String>,
    },

    /// List every category with its collection and root
    Categories,
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
