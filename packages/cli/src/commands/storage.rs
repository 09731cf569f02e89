//! Commands that move trees between the working directory and storage

use super::{read_tree, write_tree};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct PushArgs {
    /// Tree file to upload (overrides config)
    pub tree: Option<PathBuf>,

    /// Project id (overrides config)
    #[arg(short, long)]
    pub project: Option<String>,
}

#[derive(Debug, Args)]
pub struct PullArgs {
    /// Project id to download
    pub project: String,

    /// Where to write the tree (overrides config)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Project id to delete
    pub project: String,
}

pub async fn push(args: PushArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let project = config.project(args.project.as_deref())?;
    let tree_path = args
        .tree
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| config.tree_path(cwd));

    let tree = read_tree(&tree_path)?;
    let adapter = config.adapter(cwd);
    adapter.save(config.scope(), project, &tree).await?;

    info!(backend = adapter.name(), project, "Pushed tree");
    println!(
        "  {} {} → {}/{}",
        "✓".green(),
        tree_path.display(),
        config.scope(),
        project
    );
    Ok(())
}

pub async fn pull(args: PullArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let out_path = args
        .out
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| config.tree_path(cwd));

    let adapter = config.adapter(cwd);
    let tree = adapter.load(config.scope(), &args.project).await?;
    write_tree(&out_path, &tree)?;

    println!(
        "  {} {}/{} → {}",
        "✓".green(),
        config.scope(),
        args.project,
        out_path.display()
    );
    Ok(())
}

pub async fn list(cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let adapter = config.adapter(cwd);
    let projects = adapter.list(config.scope()).await?;

    if projects.is_empty() {
        println!("{}", format!("No projects in {}", config.scope()).dimmed());
    }
    for project in projects {
        println!("{project}");
    }
    Ok(())
}

pub async fn remove(args: RemoveArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let adapter = config.adapter(cwd);
    adapter.delete(config.scope(), &args.project).await?;

    println!("  {} Removed {}/{}", "✓".green(), config.scope(), args.project);
    Ok(())
}
