//! Single-slot coalescing save queue
//!
//! At most one save is in flight. Submissions that arrive while a save is
//! running replace each other in a single pending slot, so only the most
//! recent payload is written next.
//!
//! ```text
//!            submit                 submit
//!   Idle ───────────▶ Saving{None} ───────▶ Saving{Some(latest)}
//!    ▲                   │   ▲                      │
//!    └─── complete ──────┘   └────── complete ──────┘
//! ```

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueState<T> {
    Idle,
    Saving { pending: Option<T> },
}

#[derive(Debug)]
pub struct SaveQueue<T> {
    state: QueueState<T>,
    superseded: u64,
}

impl<T> SaveQueue<T> {
    pub fn new() -> Self {
        Self {
            state: QueueState::Idle,
            superseded: 0,
        }
    }

    /// Offer a payload. Returns it back when the caller should start saving
    /// it now, `None` when it was parked behind the in-flight save.
    pub fn submit(&mut self, payload: T) -> Option<T> {
        match &mut self.state {
            QueueState::Idle => {
                self.state = QueueState::Saving { pending: None };
                Some(payload)
            }
            QueueState::Saving { pending } => {
                if pending.replace(payload).is_some() {
                    self.superseded += 1;
                }
                None
            }
        }
    }

    /// Mark the in-flight save finished, successful or not. Returns the next
    /// payload to save, if one was parked meanwhile.
    pub fn complete(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.state, QueueState::Idle) {
            QueueState::Idle => None,
            QueueState::Saving { pending: None } => None,
            QueueState::Saving {
                pending: Some(next),
            } => {
                self.state = QueueState::Saving { pending: None };
                Some(next)
            }
        }
    }

    pub fn state(&self) -> &QueueState<T> {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, QueueState::Idle)
    }

    pub fn has_pending(&self) -> bool {
        matches!(self.state, QueueState::Saving { pending: Some(_) })
    }

    /// Payloads dropped because a newer one replaced them
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}

impl<T> Default for SaveQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
