//! Background autosave driven by editor session changes
//!
//! The session thread never waits on storage: its observer pushes the latest
//! tree onto a channel and returns. A tokio task owns the [`SaveQueue`] and the
//! adapter, writes one snapshot at a time, and publishes progress through a
//! `watch` channel.

use crate::adapter::PersistenceAdapter;
use crate::save_queue::SaveQueue;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vibe_editor::{ChangeKind, SessionChange, SessionObserver};
use vibe_tree::Tree;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    /// Nothing saved yet
    #[default]
    Idle,
    Saving { version: u64 },
    Saved { version: u64 },
    Failed { version: u64, message: String, retryable: bool },
}

impl SaveStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, SaveStatus::Failed { .. })
    }
}

#[derive(Debug)]
struct Snapshot {
    version: u64,
    tree: Tree,
}

#[derive(Debug)]
enum Command {
    Save(Snapshot),
    Shutdown,
}

/// Cloneable sender side of an [`Autosaver`]
#[derive(Debug, Clone)]
pub struct AutosaverHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
}

impl AutosaverHandle {
    /// Queue a tree for saving. Returns false once the autosaver has stopped.
    pub fn save(&self, version: u64, tree: Tree) -> bool {
        self.commands
            .send(Command::Save(Snapshot { version, tree }))
            .is_ok()
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }
}

impl SessionObserver for AutosaverHandle {
    fn on_change(&self, change: &SessionChange<'_>) {
        // Context changes leave the tree untouched
        if change.kind == ChangeKind::Context {
            return;
        }
        if !self.save(change.version, change.tree.clone()) {
            warn!(version = change.version, "Autosaver stopped, change not saved");
        }
    }
}

pub struct Autosaver {
    handle: AutosaverHandle,
    task: JoinHandle<()>,
}

impl Autosaver {
    /// Start the save task on the current tokio runtime
    pub fn spawn(
        adapter: Arc<dyn PersistenceAdapter>,
        scope_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);

        let worker = Worker {
            adapter,
            scope_id: scope_id.into(),
            project_id: project_id.into(),
            status: status_tx,
        };
        let task = tokio::spawn(worker.run(receiver));

        Self {
            handle: AutosaverHandle { commands, status },
            task,
        }
    }

    pub fn handle(&self) -> AutosaverHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.handle.subscribe()
    }

    /// Flush the pending snapshot, stop the task and return the final status
    pub async fn shutdown(self) -> SaveStatus {
        // A send error means the task already exited
        let _ = self.handle.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Autosave task ended abnormally");
        }
        self.handle.status()
    }
}

struct Worker {
    adapter: Arc<dyn PersistenceAdapter>,
    scope_id: String,
    project_id: String,
    status: watch::Sender<SaveStatus>,
}

impl Worker {
    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut queue = SaveQueue::new();
        let mut stopping = false;

        while !stopping {
            let Some(command) = commands.recv().await else {
                break;
            };

            let mut next = match command {
                Command::Save(snapshot) => queue.submit(snapshot),
                Command::Shutdown => break,
            };

            while let Some(snapshot) = next {
                self.write(snapshot).await;

                // Everything that arrived during the write collapses into one slot
                loop {
                    match commands.try_recv() {
                        Ok(Command::Save(snapshot)) => {
                            let _ = queue.submit(snapshot);
                        }
                        Ok(Command::Shutdown) => stopping = true,
                        Err(_) => break,
                    }
                }
                next = queue.complete();
            }
        }

        debug!(
            project = %self.project_id,
            superseded = queue.superseded(),
            "Autosave task stopped"
        );
    }

    async fn write(&self, snapshot: Snapshot) {
        let version = snapshot.version;
        self.status.send_replace(SaveStatus::Saving { version });

        let result = self
            .adapter
            .save(&self.scope_id, &self.project_id, &snapshot.tree)
            .await;

        let status = match result {
            Ok(()) => {
                info!(
                    backend = self.adapter.name(),
                    project = %self.project_id,
                    version,
                    "Autosaved"
                );
                SaveStatus::Saved { version }
            }
            Err(e) => {
                warn!(
                    backend = self.adapter.name(),
                    project = %self.project_id,
                    version,
                    error = %e,
                    "Autosave failed"
                );
                SaveStatus::Failed {
                    version,
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                }
            }
        };
        self.status.send_replace(status);
    }
}
