use super::{read_tree, write_tree};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use vibe_editor::EditSession;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Edit plan: `{"label": .., "actions": [..]}` or a bare action array
    pub plan: PathBuf,

    /// Tree file to edit (overrides config)
    pub tree: Option<PathBuf>,

    /// Report what would change without writing the tree
    #[arg(long)]
    pub dry_run: bool,
}

pub fn apply(args: ApplyArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let tree_path = args
        .tree
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| config.tree_path(cwd));

    let plan_path = cwd.join(&args.plan);
    let plan = fs::read_to_string(&plan_path)
        .with_context(|| format!("Cannot read plan {}", plan_path.display()))?;

    let tree = read_tree(&tree_path)?;
    let mut session = EditSession::with_history(tree, config.context(), config.history())?;
    let report = session.apply_plan_json(&plan)?;

    for label in &report.applied {
        println!("  {} {}", "✓".green(), label);
    }
    for skipped in &report.skipped {
        eprintln!(
            "  {} #{} {} - {}",
            "✗".red(),
            skipped.index,
            skipped.label,
            skipped.error.to_string().red()
        );
    }

    println!();
    if report.is_clean() {
        println!("{} Applied {} actions", "✅".green(), report.applied.len());
    } else {
        println!(
            "{} Applied {} actions, skipped {}",
            "⚠️".yellow(),
            report.applied.len(),
            report.skipped.len()
        );
    }

    if !args.dry_run {
        write_tree(&tree_path, session.tree())?;
    }
    Ok(())
}
