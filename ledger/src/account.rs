//! Per-user account records
//!
//! Field names serialize in camelCase so existing `users.json` snapshots stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Usage,
    Payment,
}

/// Immutable audit entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Negative for usage, positive for credits
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub timestamp: DateTime<Utc>,
    pub balance_after: u64,
}

/// Metadata of the receipt that completed the last payment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Image reference the verifier was shown
    #[serde(rename = "url")]
    pub source: String,
    pub confidence: f64,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "tokens")]
    pub balance: u64,
    #[serde(default)]
    pub payment_pending: bool,
    #[serde(default)]
    pub pending_payment_code: Option<String>,
    #[serde(default)]
    pub last_payment_request: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_receipt: Option<PaymentReceipt>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    pub join_date: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub total_tokens_used: u64,
    #[serde(default)]
    pub total_payments: u64,
    #[serde(default)]
    pub total_tokens_earned: u64,
}

impl Account {
    /// Fresh account holding the initial grant
    pub fn new(initial_tokens: u64) -> Self {
        let now = Utc::now();
        Self {
            balance: initial_tokens,
            payment_pending: false,
            pending_payment_code: None,
            last_payment_request: None,
            payment_receipt: None,
            transactions: Vec::new(),
            join_date: now,
            last_active: now,
            total_tokens_used: 0,
            total_payments: 0,
            total_tokens_earned: 0,
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// The code a receipt is checked against, only while a payment is pending
    pub fn current_payment_code(&self) -> Option<&str> {
        if self.payment_pending {
            self.pending_payment_code.as_deref()
        } else {
            None
        }
    }

    /// Spend tokens. Returns false and changes nothing when the balance is short.
    pub fn debit(&mut self, amount: u64) -> bool {
        if self.balance < amount {
            return false;
        }

        self.balance -= amount;
        self.total_tokens_used += amount;
        self.record(-(amount as i64), TransactionKind::Usage);
        true
    }

    /// Add tokens unconditionally
    pub fn credit(&mut self, amount: u64, kind: TransactionKind) {
        self.balance += amount;
        self.total_payments += 1;
        self.total_tokens_earned += amount;
        self.record(amount as i64, kind);
    }

    /// Enter (or stay in) the pending state with a new current code
    pub fn begin_payment(&mut self, code: String) {
        self.payment_pending = true;
        self.pending_payment_code = Some(code);
        self.last_payment_request = Some(Utc::now());
    }

    /// Leave the pending state with a credit and the receipt on file
    pub fn complete_payment(&mut self, tokens: u64, receipt: PaymentReceipt) {
        self.payment_pending = false;
        self.payment_receipt = Some(receipt);
        self.credit(tokens, TransactionKind::Payment);
    }

    fn record(&mut self, amount: i64, kind: TransactionKind) {
        self.transactions.push(Transaction {
            amount,
            kind,
            timestamp: Utc::now(),
            balance_after: self.balance,
        });
    }
}

/// Read-only view returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub balance: u64,
    pub total_tokens_used: u64,
    pub total_payments: u64,
    pub total_tokens_earned: u64,
    pub payment_pending: bool,
    pub join_date: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl From<&Account> for UserStats {
    fn from(account: &Account) -> Self {
        Self {
            balance: account.balance,
            total_tokens_used: account.total_tokens_used,
            total_payments: account.total_payments,
            total_tokens_earned: account.total_tokens_earned,
            payment_pending: account.payment_pending,
            join_date: account.join_date,
            last_active: account.last_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub tokens_earned: u64,
    pub total_payments: u64,
    pub last_active: DateTime<Utc>,
}
