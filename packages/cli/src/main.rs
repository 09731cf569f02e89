mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, compile, init, list, pull, push, remove, ApplyArgs, CompileArgs, InitArgs, PullArgs,
    PushArgs, RemoveArgs,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Vibe CLI - edit, compile and store AI-built sites
#[derive(Parser, Debug)]
#[command(name = "vibe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Vibe project
    Init(InitArgs),

    /// Compile the tree to a single HTML document
    Compile(CompileArgs),

    /// Apply an edit plan to the tree
    Apply(ApplyArgs),

    /// Upload the tree to the configured storage
    Push(PushArgs),

    /// Download a project from storage
    Pull(PullArgs),

    /// List stored projects
    List,

    /// Delete a stored project
    Remove(RemoveArgs),
}

fn run(command: Command, cwd: &Path) -> Result<()> {
    match command {
        Command::Init(args) => init(args, cwd),
        Command::Compile(args) => compile(args, cwd),
        Command::Apply(args) => apply(args, cwd),
        Command::Push(args) => runtime()?.block_on(push(args, cwd)),
        Command::Pull(args) => runtime()?.block_on(pull(args, cwd)),
        Command::List => runtime()?.block_on(list(cwd)),
        Command::Remove(args) => runtime()?.block_on(remove(args, cwd)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

fn main() {
    let cli = Cli::parse();

    // --verbose enables DEBUG, otherwise use RUST_LOG or default to INFO
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| run(cli.command, &cwd));

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
