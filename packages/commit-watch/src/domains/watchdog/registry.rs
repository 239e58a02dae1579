//! Registry of live transactions.
//!
//! Owned exclusively by the watchdog actor, so no locking. Each entry holds the
//! cancel capability of its timer and a generation number; a timer reports its
//! generation when it elapses and only a report matching the live entry can
//! retire it as expired.
//!
//! # Invariants
//!
//! - At most one entry per transaction id.
//! - Installing an entry for an id that already has one cancels the old timer
//!   first.
//! - Every removal path (completion, expiry, drain) takes the entry out of the
//!   map, and completion and drain cancel its timer.

use std::collections::HashMap;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::common::TransactionId;

/// Cancel-once capability for a transaction timer.
///
/// Cancelling consumes the handle, so a timer cannot be cancelled twice.
#[derive(Debug)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self(token)
    }

    pub fn cancel(self) {
        self.0.cancel();
    }
}

/// A live transaction between its start signal and its removal.
#[derive(Debug)]
pub struct TransactionEntry {
    pub transaction_id: TransactionId,
    pub callback_path: String,
    pub deadline: Instant,
    generation: u64,
    cancel_handle: CancelHandle,
}

impl TransactionEntry {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel the timer and keep the rest of the entry.
    fn retire(self) -> (TransactionId, String) {
        self.cancel_handle.cancel();
        (self.transaction_id, self.callback_path)
    }
}

/// Result of installing a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installed {
    pub generation: u64,
    /// Whether a live entry for the same id was cancelled and replaced.
    pub replaced: bool,
}

#[derive(Debug, Default)]
pub struct TransactionRegistry {
    entries: HashMap<TransactionId, TransactionEntry>,
    next_generation: u64,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an entry, cancelling any live entry for the same id.
    pub fn start(
        &mut self,
        transaction_id: TransactionId,
        callback_path: String,
        deadline: Instant,
        cancel_handle: CancelHandle,
    ) -> Installed {
        let replaced = match self.entries.remove(&transaction_id) {
            Some(old) => {
                old.retire();
                true
            }
            None => false,
        };

        let generation = self.next_generation;
        self.next_generation += 1;

        self.entries.insert(
            transaction_id.clone(),
            TransactionEntry {
                transaction_id,
                callback_path,
                deadline,
                generation,
                cancel_handle,
            },
        );

        Installed {
            generation,
            replaced,
        }
    }

    /// Remove an entry on completion and cancel its timer.
    ///
    /// Returns `false` when no entry exists for the id.
    pub fn complete(&mut self, transaction_id: impl AsRef<[u8]>) -> bool {
        match self.entries.remove(transaction_id.as_ref()) {
            Some(entry) => {
                entry.retire();
                true
            }
            None => false,
        }
    }

    /// Remove an entry whose timer elapsed.
    ///
    /// A report from a timer that was already replaced or completed carries a
    /// stale generation and leaves the registry untouched.
    pub fn expire(
        &mut self,
        transaction_id: impl AsRef<[u8]>,
        generation: u64,
    ) -> Option<TransactionEntry> {
        let transaction_id = transaction_id.as_ref();
        match self.entries.get(transaction_id) {
            Some(entry) if entry.generation == generation => self.entries.remove(transaction_id),
            _ => None,
        }
    }

    /// Remove every entry, cancelling their timers.
    ///
    /// Returns `(transaction_id, callback_path)` for each drained entry.
    pub fn drain(&mut self) -> Vec<(TransactionId, String)> {
        self.entries
            .drain()
            .map(|(_, entry)| entry.retire())
            .collect()
    }

    pub fn contains(&self, transaction_id: impl AsRef<[u8]>) -> bool {
        self.entries.contains_key(transaction_id.as_ref())
    }

    pub fn get(&self, transaction_id: impl AsRef<[u8]>) -> Option<&TransactionEntry> {
        self.entries.get(transaction_id.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
