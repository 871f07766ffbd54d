// src/commands/project.rs
//! Project lifecycle commands: init, build, publish, link

use super::{Session, project_root};
use anyhow::Result;
use std::path::Path;
use tracing::info;
use zarch::{BuildReport, Lifecycle};

pub fn cmd_init(session: &Session, name: Option<&str>) -> Result<()> {
    let lifecycle = Lifecycle::local(&session.config);
    let cwd = project_root()?;

    let created = lifecycle.init(&cwd, name)?;
    info!("Initialized project at {}", created.root.display());

    println!(
        "Created {} {} in {}",
        created.manifest.name,
        created.manifest.version,
        created.root.display()
    );
    println!("  zarch.json      package manifest");
    println!("  SwiftList.txt   dependency list");
    println!("  {}    entry point", created.manifest.main);
    println!("  README.md       documentation (embedded at build)");
    println!();
    println!("Next steps:");
    if name.is_some() {
        println!("  cd {}", created.manifest.name);
    }
    println!("  zarch build");
    println!("  zarch publish");
    Ok(())
}

pub fn cmd_build(session: &Session) -> Result<()> {
    let lifecycle = Lifecycle::local(&session.config);
    let root = project_root()?;

    match lifecycle.build(&root)? {
        BuildReport::Skipped { build_mode } => {
            println!(
                "Build skipped: build mode is '{}' (set \"build\": \"all\" to package)",
                build_mode
            );
        }
        BuildReport::Built { archive, lock } => {
            println!("Built {}", display_relative(&root, &archive));
            println!("  files:  {}", lock.files.len());
            println!("  sha256: {}", lock.hash());
        }
    }
    Ok(())
}

pub fn cmd_publish(session: &Session, file: Option<&Path>) -> Result<()> {
    let registry = session.registry()?;
    let lifecycle = Lifecycle::new(&session.config, &registry).with_progress(session.progress);
    let root = project_root()?;

    let published = lifecycle.publish(&root, file)?;
    if published.built {
        println!("Built {}", display_relative(&root, &published.archive));
    }
    println!("Published {} {}", published.spec, published.version);
    if let Some(message) = published.receipt.message {
        println!("  {}", message);
    }
    if let Some(url) = published.receipt.url {
        println!("  {}", url);
    }
    Ok(())
}

pub fn cmd_link(session: &Session, file: &str, alias: Option<&str>) -> Result<()> {
    let lifecycle = Lifecycle::local(&session.config);
    let root = project_root()?;

    let entry = lifecycle.link(&root, file, alias)?;
    println!("Linked {} as '{}'", file, entry.alias);
    Ok(())
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
