// src/commands/search.rs
//! Registry search and shell completion output

use super::Session;
use crate::cli::Cli;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;
use zarch::Lifecycle;

pub fn cmd_search(session: &Session, query: &str) -> Result<()> {
    let registry = session.registry()?;
    let lifecycle = Lifecycle::new(&session.config, &registry);

    let hits = lifecycle.search(query)?;
    if hits.is_empty() {
        println!("No packages found matching '{}'", query);
        return Ok(());
    }

    for hit in &hits {
        println!("{}", hit);
    }
    println!();
    println!("{} package(s) found", hits.len());
    Ok(())
}

pub fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}
