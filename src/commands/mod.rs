// src/commands/mod.rs
//! Command handlers for the zarch CLI

mod auth;
mod install;
mod project;
mod search;

pub use auth::{cmd_login, cmd_logout, cmd_register};
pub use install::cmd_install;
pub use project::{cmd_build, cmd_init, cmd_link, cmd_publish};
pub use search::{cmd_completions, cmd_search};

use anyhow::{Context, Result};
use console::Term;
use std::path::PathBuf;
use zarch::{Config, ProgressMode};

/// Settings every handler receives
pub struct Session {
    pub config: Config,
    pub progress: ProgressMode,
}

impl Session {
    pub fn new(config: Config, quiet: bool, verbose: bool) -> Self {
        let progress = progress_mode(quiet, verbose, Term::stderr().is_term());
        Self { config, progress }
    }

    /// HTTP client for the commands that talk to the registry
    pub fn registry(&self) -> Result<zarch::HttpRegistry> {
        Ok(zarch::HttpRegistry::new(&self.config)?)
    }
}

/// Project root is always the working directory
fn project_root() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to determine the current directory")
}

/// Bars on an interactive terminal, log lines when verbose or redirected
fn progress_mode(quiet: bool, verbose: bool, stderr_is_tty: bool) -> ProgressMode {
    if quiet {
        ProgressMode::Silent
    } else if verbose || !stderr_is_tty {
        ProgressMode::Log
    } else {
        ProgressMode::Bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_mode_selection() {
        assert_eq!(progress_mode(true, false, true), ProgressMode::Silent);
        assert_eq!(progress_mode(false, false, true), ProgressMode::Bar);
        assert_eq!(progress_mode(false, true, true), ProgressMode::Log);
        assert_eq!(progress_mode(false, false, false), ProgressMode::Log);
    }
}
