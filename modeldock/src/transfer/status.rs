//! Shared status record.

use tokio::sync::watch;

use super::state::ProgressState;

/// Holder of the one observable [`ProgressState`].
///
/// Readers take a cloned snapshot or subscribe for change notifications.
/// Only the transfer supervisor writes, and it always replaces the whole
/// record.
#[derive(Debug)]
pub struct StatusStore {
    tx: watch::Sender<ProgressState>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressState::idle());
        Self { tx }
    }

    /// Consistent copy of the current record.
    pub fn snapshot(&self) -> ProgressState {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every replacement.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.tx.subscribe()
    }

    pub(crate) fn replace(&self, state: ProgressState) {
        self.tx.send_replace(state);
    }
}
