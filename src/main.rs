// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use commands::Session;
use tracing_subscriber::EnvFilter;
use zarch::Config;

/// Exit code for Ctrl+C, matching the shell convention of 128 + SIGINT
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!("\n[ABORT] Operation cancelled by user.");
        std::process::exit(EXIT_INTERRUPTED);
    }) {
        eprintln!("Warning: could not install Ctrl+C handler: {}", e);
    }

    let cli = Cli::parse();

    let default_level = if cli.global.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        let zarch_err = err.chain().find_map(|e| e.downcast_ref::<zarch::Error>());
        if let Some(hint) = zarch_err.and_then(|e| e.hint()) {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(zarch_err.map(|e| e.exit_code()).unwrap_or(1));
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let session = || -> Result<Session> {
        let config = Config::load()?.with_overrides(
            cli.global.registry.as_deref(),
            cli.global.modules_dir.as_deref(),
        );
        Ok(Session::new(config, cli.global.quiet, cli.global.verbose))
    };

    match command {
        Commands::Init { name } => commands::cmd_init(&session()?, name.as_deref()),
        Commands::Build => commands::cmd_build(&session()?),
        Commands::Publish { file } => commands::cmd_publish(&session()?, file.as_deref()),
        Commands::Install { spec } => commands::cmd_install(&session()?, spec.as_deref()),
        Commands::Link { file, alias } => {
            commands::cmd_link(&session()?, &file, alias.as_deref())
        }
        Commands::Login { username } => commands::cmd_login(&session()?, username.as_deref()),
        Commands::Register { username, email } => {
            commands::cmd_register(&session()?, username.as_deref(), email.as_deref())
        }
        Commands::Logout => commands::cmd_logout(&session()?),
        Commands::Search { query } => commands::cmd_search(&session()?, &query),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
