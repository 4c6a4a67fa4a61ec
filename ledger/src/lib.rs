//! IMLO Token Ledger
//!
//! Meters usage of the correction service through a prepaid token balance:
//! - Every user gets an initial grant and spends tokens per request
//! - Running out issues a payment code; a photographed receipt is checked by
//!   an external verifier and, if accepted, tops the balance up
//! - Every mutation rewrites the account snapshot

pub mod account;
pub mod analytics;
pub mod config;
pub mod error;
pub mod ledger;
pub mod payment;
pub mod store;

pub use account::{
    Account, LeaderboardEntry, PaymentReceipt, Transaction, TransactionKind, UserStats,
};
pub use analytics::{Analytics, UsageStats};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::TokenLedger;
pub use payment::{
    PaymentCodeGenerator, PaymentRequest, PaymentState, ReceiptVerification,
    ReceiptVerificationRequest, ReceiptVerifier, VerificationOutcome, DEFAULT_REJECTION_REASON,
    MIN_VERIFICATION_CONFIDENCE, NO_PENDING_PAYMENT_REASON,
};
pub use store::{AccountStore, MemoryAccountStore, SnapshotAccountStore, USERS_SNAPSHOT};
