//! Transaction table: the per-block store of held transactions.
//!
//! Every block that holds transactions keeps them in a [`TransactTable`]. The
//! table is an insertion-ordered FIFO with direct lookup by id, implemented as
//! a doubly-linked list threaded through an [`IndexMap`].
//!
//! # Locking
//!
//! All operations take a single internal mutex. Sibling blocks push into a
//! table from their own tick tasks while the owning block is advancing it, so
//! the lock is required even though a table is never shared between blocks.
//! Locks are held only for the duration of one call; callers that iterate use
//! [`TransactTable::snapshot`] and must tolerate the snapshot going stale.

use crate::TableError;
use gpss_types::{Transaction, TransactionId};
use indexmap::IndexMap;
use parking_lot::Mutex;

#[derive(Debug)]
struct Entry {
    transaction: Transaction,
    prev: Option<TransactionId>,
    next: Option<TransactionId>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: IndexMap<TransactionId, Entry>,
    first: Option<TransactionId>,
    last: Option<TransactionId>,
}

impl Inner {
    fn push_back(&mut self, transaction: Transaction) -> Result<(), TableError> {
        let id = transaction.id();
        if self.entries.contains_key(&id) {
            return Err(TableError::DuplicateTransaction(id));
        }
        let prev = self.last;
        if let Some(entry) = prev.and_then(|last| self.entries.get_mut(&last)) {
            entry.next = Some(id);
        }
        self.entries.insert(
            id,
            Entry {
                transaction,
                prev,
                next: None,
            },
        );
        if self.first.is_none() {
            self.first = Some(id);
        }
        self.last = Some(id);
        Ok(())
    }

    fn push_front(&mut self, transaction: Transaction) -> Result<(), TableError> {
        let id = transaction.id();
        if self.entries.contains_key(&id) {
            return Err(TableError::DuplicateTransaction(id));
        }
        let next = self.first;
        if let Some(entry) = next.and_then(|first| self.entries.get_mut(&first)) {
            entry.prev = Some(id);
        }
        self.entries.insert(
            id,
            Entry {
                transaction,
                prev: None,
                next,
            },
        );
        if self.last.is_none() {
            self.last = Some(id);
        }
        self.first = Some(id);
        Ok(())
    }

    fn remove(&mut self, id: TransactionId) -> Option<Transaction> {
        let entry = self.entries.swap_remove(&id)?;

        // Patch both neighbours so the remaining chain stays intact
        match entry.prev.and_then(|prev| self.entries.get_mut(&prev)) {
            Some(prev) => prev.next = entry.next,
            None => self.first = entry.next,
        }
        match entry.next.and_then(|next| self.entries.get_mut(&next)) {
            Some(next) => next.prev = entry.prev,
            None => self.last = entry.prev,
        }

        Some(entry.transaction)
    }

    /// Ids in FIFO order.
    fn ordered_ids(&self) -> Vec<TransactionId> {
        let mut ids = Vec::with_capacity(self.entries.len());
        let mut cursor = self.first;
        while let Some(id) = cursor {
            let Some(entry) = self.entries.get(&id) else {
                break;
            };
            ids.push(id);
            cursor = entry.next;
        }
        ids
    }
}

/// Thread-safe, insertion-ordered table of transactions keyed by id.
#[derive(Debug, Default)]
pub struct TransactTable {
    inner: Mutex<Inner>,
}

impl TransactTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction at the tail.
    ///
    /// Fails without touching the table if the id is already present.
    pub fn push(&self, transaction: Transaction) -> Result<(), TableError> {
        self.inner.lock().push_back(transaction)
    }

    /// Insert a transaction at the head.
    pub fn push_front(&self, transaction: Transaction) -> Result<(), TableError> {
        self.inner.lock().push_front(transaction)
    }

    /// Atomically claim an empty table.
    ///
    /// `make` is only called when the table is empty; the transaction it
    /// returns is pushed under the same lock. Returns whether the claim
    /// succeeded. This is the admission gate of single-capacity resources.
    pub fn push_if_empty(&self, make: impl FnOnce() -> Transaction) -> bool {
        let mut inner = self.inner.lock();
        if !inner.entries.is_empty() {
            return false;
        }
        inner.push_back(make()).is_ok()
    }

    /// Remove and return the head.
    pub fn pop(&self) -> Option<Transaction> {
        let mut inner = self.inner.lock();
        let first = inner.first?;
        inner.remove(first)
    }

    /// Remove a transaction by id, wherever it sits.
    pub fn remove(&self, id: TransactionId) -> Option<Transaction> {
        self.inner.lock().remove(id)
    }

    /// Copy of the transaction with the given id.
    pub fn peek(&self, id: TransactionId) -> Option<Transaction> {
        self.inner
            .lock()
            .entries
            .get(&id)
            .map(|e| e.transaction.clone())
    }

    /// Copy of the head transaction.
    pub fn peek_first(&self) -> Option<Transaction> {
        let inner = self.inner.lock();
        let first = inner.first?;
        inner.entries.get(&first).map(|e| e.transaction.clone())
    }

    /// Copy of every transaction, in FIFO order.
    ///
    /// The lock is held only while copying.
    pub fn snapshot(&self) -> Vec<Transaction> {
        let inner = self.inner.lock();
        inner
            .ordered_ids()
            .into_iter()
            .filter_map(|id| inner.entries.get(&id).map(|e| e.transaction.clone()))
            .collect()
    }

    /// Ids in FIFO order.
    pub fn ids(&self) -> Vec<TransactionId> {
        self.inner.lock().ordered_ids()
    }

    /// Mutate one transaction in place.
    pub fn update<R>(&self, id: TransactionId, f: impl FnOnce(&mut Transaction) -> R) -> Option<R> {
        self.inner
            .lock()
            .entries
            .get_mut(&id)
            .map(|e| f(&mut e.transaction))
    }

    /// Mutate every transaction in FIFO order.
    pub fn update_all(&self, mut f: impl FnMut(&mut Transaction)) {
        let mut inner = self.inner.lock();
        for id in inner.ordered_ids() {
            if let Some(entry) = inner.entries.get_mut(&id) {
                f(&mut entry.transaction);
            }
        }
    }

    pub fn contains(&self, id: TransactionId) -> bool {
        self.inner.lock().entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
