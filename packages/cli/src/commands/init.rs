use super::write_tree;
use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;
use vibe_tree::Tree;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing config and tree
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Vibe project...".bright_blue().bold());

    let config = Config::default();
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let tree_path = config.tree_path(cwd);
    if !tree_path.exists() || args.force {
        write_tree(&tree_path, &Tree::template())?;
        println!("  {} Created {}", "✓".green(), config.tree_file);
    }

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Apply an edit plan: vibe apply plan.json");
    println!("  2. Run: vibe compile");
    println!("  3. Open {}", config.out_file);

    Ok(())
}
