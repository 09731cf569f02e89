pub mod apply;
pub mod compile;
pub mod init;
pub mod storage;

pub use apply::{apply, ApplyArgs};
pub use compile::{compile, CompileArgs};
pub use init::{init, InitArgs};
pub use storage::{list, pull, push, remove, PullArgs, PushArgs, RemoveArgs};

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use vibe_tree::Tree;

/// Read and validate a tree file
pub(crate) fn read_tree(path: &Path) -> Result<Tree> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read tree file {}", path.display()))?;
    Tree::from_json(&json).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

/// Write a tree as pretty JSON, creating parent directories
pub(crate) fn write_tree(path: &Path, tree: &Tree) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, tree.to_json_pretty()?)
        .with_context(|| format!("Cannot write tree file {}", path.display()))
}
