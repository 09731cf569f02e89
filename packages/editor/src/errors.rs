//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("History error: {0}")]
    History(#[from] crate::history::HistoryError),

    #[error("Tree error: {0}")]
    Tree(#[from] vibe_tree::TreeError),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}
