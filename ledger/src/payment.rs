//! Payment requests, codes and the receipt verifier boundary

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimum verifier confidence (0-100) for a receipt to be accepted
pub const MIN_VERIFICATION_CONFIDENCE: f64 = 60.0;

pub const NO_PENDING_PAYMENT_REASON: &str = "No pending payment found.";
pub const DEFAULT_REJECTION_REASON: &str = "Verification failed or amount mismatch.";

/// Whether a user owes a receipt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentState {
    Active,
    PaymentPending,
}

/// Instructions handed to a user who ran out of tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: String,
    pub currency: String,
    pub tokens: u64,
    pub receiver: String,
    pub card: String,
    pub card_last4: String,
    pub provider: String,
    pub payment_code: String,
}

/// Issues `PAY-<base36 millis>` codes, strictly increasing within the process
#[derive(Debug, Default)]
pub struct PaymentCodeGenerator {
    last_millis: AtomicU64,
}

impl PaymentCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_code(&self) -> String {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last_millis.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self.last_millis.compare_exchange(
                last,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return format!("PAY-{}", to_base36(candidate)),
                Err(actual) => last = actual,
            }
        }
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Everything the verifier is told about the expected payment.
///
/// `payment_code` is context for the model only; it is never matched
/// against the account record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptVerificationRequest {
    pub image_reference: String,
    pub expected_amount: u64,
    pub currency: String,
    pub card_last4: String,
    pub payment_code: String,
}

/// Structured verifier answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptVerification {
    pub valid: bool,
    pub amount: Option<f64>,
    pub currency: String,
    pub card_last4: String,
    /// 0-100
    pub confidence: f64,
    pub reason: String,
}

impl ReceiptVerification {
    /// Failure-shaped answer used whenever the verifier could not do its job
    pub fn failed(request: &ReceiptVerificationRequest, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            amount: None,
            currency: request.currency.clone(),
            card_last4: request.card_last4.clone(),
            confidence: 0.0,
            reason: reason.into(),
        }
    }

    /// Both conditions are required: a valid but unsure answer is a rejection.
    pub fn is_accepted(&self) -> bool {
        self.valid && self.confidence >= MIN_VERIFICATION_CONFIDENCE
    }
}

/// Checks a receipt image against the expected payment.
///
/// Never fails: transport or parse problems come back as
/// [`ReceiptVerification::failed`] with zero confidence.
#[async_trait]
pub trait ReceiptVerifier: Send + Sync {
    async fn verify_receipt(&self, request: &ReceiptVerificationRequest) -> ReceiptVerification;
}

/// Result of [`crate::TokenLedger::verify_payment`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum VerificationOutcome {
    #[serde(rename_all = "camelCase")]
    Verified {
        tokens_added: u64,
        new_balance: u64,
        confidence: f64,
        reason: String,
    },
    /// `confidence` is `None` when the verifier was never contacted
    Rejected {
        confidence: Option<f64>,
        reason: String,
    },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            VerificationOutcome::Verified { reason, .. } => reason,
            VerificationOutcome::Rejected { reason, .. } => reason,
        }
    }
}
