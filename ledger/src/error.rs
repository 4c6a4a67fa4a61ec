//! Ledger error types

use thiserror::Error;

/// Token ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Storage error: {0}")]
    Storage(#[from] imlo_storage::StorageError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
