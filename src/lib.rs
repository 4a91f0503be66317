// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod serve;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, EntryPoint};
use crate::config::{config_root_dir, load_and_validate};
use crate::orchestrator::Orchestrator;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, assembles the pipeline, then runs the
/// requested entry point.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);
    let orchestrator = Orchestrator::new(root, cfg)?;

    if args.dry_run {
        print_dry_run(&orchestrator, args.entry);
        return Ok(());
    }

    info!(entry = %args.entry, root = ?orchestrator.root(), "starting");
    match args.entry {
        EntryPoint::Clean => {
            let report = orchestrator.clean().await?;
            info!(removed = report.removed, kept = report.kept, "clean finished");
        }
        EntryPoint::Build => orchestrator.build().await?,
        EntryPoint::Default => orchestrator.run_default().await?,
    }
    Ok(())
}

/// Print the assembled pipeline and watch bindings without running anything.
fn print_dry_run(orchestrator: &Orchestrator, entry: EntryPoint) {
    let cfg = orchestrator.config();
    println!("sitepipe dry-run ({entry})");
    println!("  root   = {}", orchestrator.root().display());
    println!("  output = {}", orchestrator.layout().root.display());
    println!("  keep   = {:?}", orchestrator.layout().keep);
    println!();

    println!("build pipeline:");
    print!("{}", orchestrator.pipeline().build);

    if entry == EntryPoint::Default {
        println!();
        println!("watch bindings ({}):", orchestrator.bindings().len());
        for binding in orchestrator.bindings() {
            println!("  - {} <- {:?}", binding.name(), binding.patterns());
        }
        let serve = cfg.serve();
        if serve.enabled {
            println!();
            println!("serve: http://{}:{}", serve.host, serve.port);
        }
    }

    debug!("dry-run complete (no execution)");
}
