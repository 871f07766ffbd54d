// src/commands/install.rs
//! Package installation command

use super::{Session, project_root};
use anyhow::Result;
use zarch::{BatchOutcome, InstallReport, Lifecycle};

/// Install one package, or every entry of SwiftList.txt when no spec is given
pub fn cmd_install(session: &Session, spec: Option<&str>) -> Result<()> {
    let registry = session.registry()?;
    let lifecycle = Lifecycle::new(&session.config, &registry).with_progress(session.progress);
    let root = project_root()?;

    match lifecycle.install(&root, spec)? {
        InstallReport::Single(module) => {
            println!(
                "Installed {} {} into {}",
                module.spec,
                module.version,
                module.dir.display()
            );
        }
        InstallReport::Batch(BatchOutcome::Empty) => {
            println!("SwiftList.txt has no dependencies; nothing to install");
        }
        InstallReport::Batch(BatchOutcome::Installed(modules)) => {
            for module in &modules {
                println!("  {} {} -> {}", module.spec, module.version, module.dir.display());
            }
            println!("Installed {} packages", modules.len());
        }
    }
    Ok(())
}
