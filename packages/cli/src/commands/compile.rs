use super::read_tree;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use vibe_compiler_html::compile_document;

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Tree file to compile (overrides config)
    pub tree: Option<PathBuf>,

    /// Output file (overrides config)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

pub fn compile(args: CompileArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let tree_path = args
        .tree
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| config.tree_path(cwd));

    let tree = read_tree(&tree_path)?;
    let compiled = compile_document(&tree, &config.context());
    debug!(nodes = tree.node_count(), bytes = compiled.html.len(), "Compiled tree");

    for degradation in &compiled.degradations {
        eprintln!(
            "  {} {} - {}",
            "⚠️".yellow(),
            degradation.node_id.bright_white(),
            degradation.reason.describe()
        );
    }

    if args.stdout {
        println!("{}", compiled.html);
        return Ok(());
    }

    let out_path = args
        .out
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| config.out_path(cwd));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out_path, &compiled.html)?;

    println!(
        "  {} {} → {}",
        "✓".green(),
        tree_path.display(),
        out_path.display()
    );
    Ok(())
}
