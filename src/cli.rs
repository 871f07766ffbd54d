// src/cli.rs
//! CLI definitions for zarch
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zarch")]
#[command(author = "Zarch Contributors")]
#[command(version)]
#[command(about = "Package manager for SwiftFlow projects", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Registry URL (overrides config and ZARCH_REGISTRY)
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Shared module directory (overrides config and ZARCH_MODULES_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub modules_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project (in ./NAME, or the current directory)
    Init {
        /// Package name
        name: Option<String>,
    },

    /// Pack the project into dist/ and write zarch.lock
    Build,

    /// Upload the project archive to the registry
    Publish {
        /// Publish this archive instead of the one in dist/
        #[arg(long, value_name = "ARCHIVE")]
        file: Option<PathBuf>,
    },

    /// Install a package, or every entry of SwiftList.txt
    Install {
        /// Package spec (@scope/name or name)
        spec: Option<String>,
    },

    /// Map a local file to an alias in zarch.json
    Link {
        /// Local file path, relative to the project
        file: String,

        /// Alias (defaults to the file stem)
        #[arg(long = "as", value_name = "ALIAS")]
        alias: Option<String>,
    },

    /// Log in to the registry
    Login {
        /// Username (prompted when omitted)
        username: Option<String>,
    },

    /// Create a registry account and log in
    Register {
        /// Username (prompted when omitted)
        username: Option<String>,

        /// Email address (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Forget stored credentials
    Logout,

    /// Search the registry
    Search {
        /// Search terms
        query: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
