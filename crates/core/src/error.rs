//! Error types for block state.

use gpss_types::TransactionId;
use thiserror::Error;

/// Errors from [`TransactTable`](crate::TransactTable) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A transaction with this id is already held by the table.
    #[error("{0} is already in the table")]
    DuplicateTransaction(TransactionId),
}
