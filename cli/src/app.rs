//! Wiring of dictionary, ledger and generative client behind one handle

use async_trait::async_trait;
use imlo_ai::{ClientError, GeminiClient};
use imlo_ledger::{
    Analytics, PaymentRequest, ReceiptVerification, ReceiptVerificationRequest,
    ReceiptVerifier, SnapshotAccountStore, TokenLedger,
};
use imlo_spelling::{Corrector, DictionaryIndex};
use imlo_storage::Storage;
use std::sync::Arc;

use crate::config::AppConfig;

pub const VERIFIER_NOT_CONFIGURED_REASON: &str =
    "Receipt verification is unavailable: AI_API_KEY is not set.";

/// Result of one `check` request
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Checked {
        original: String,
        corrected: String,
        balance: u64,
    },
    /// Blank input; nothing was charged
    Empty,
    /// Out of tokens; a fresh payment code was issued instead
    PaymentRequired(PaymentRequest),
}

impl CheckOutcome {
    pub fn changed(&self) -> bool {
        match self {
            CheckOutcome::Checked {
                original,
                corrected,
                ..
            } => original != corrected,
            CheckOutcome::Empty | CheckOutcome::PaymentRequired(_) => false,
        }
    }
}

/// Stands in for the generative verifier when no API key is configured
struct OfflineVerifier;

#[async_trait]
impl ReceiptVerifier for OfflineVerifier {
    async fn verify_receipt(&self, request: &ReceiptVerificationRequest) -> ReceiptVerification {
        ReceiptVerification::failed(request, VERIFIER_NOT_CONFIGURED_REASON)
    }
}

pub struct App {
    pub corrector: Corrector,
    pub ledger: Arc<TokenLedger>,
}

impl App {
    pub fn open(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = Storage::open(&config.data_dir)?;
        let index = Arc::new(DictionaryIndex::load_or_empty(&config.dictionary_path));

        let client = match GeminiClient::new(config.ai.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(ClientError::MissingApiKey) => {
                log::warn!("AI_API_KEY not set; running with dictionary correction only");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let (corrector, verifier): (Corrector, Arc<dyn ReceiptVerifier>) = match client {
            Some(client) => (Corrector::new(index, client.clone()), client),
            None => (
                Corrector::without_fallback(index),
                Arc::new(OfflineVerifier),
            ),
        };

        let store = Arc::new(SnapshotAccountStore::new(storage.clone()));
        let ledger = TokenLedger::open(config.ledger.clone(), store, verifier)
            .with_analytics(Analytics::open(storage));

        Ok(Self {
            corrector,
            ledger: Arc::new(ledger),
        })
    }

    #[cfg(test)]
    pub fn from_parts(corrector: Corrector, ledger: TokenLedger) -> Self {
        Self {
            corrector,
            ledger: Arc::new(ledger),
        }
    }

    /// Spend one token and correct `text`; without tokens, issue a payment request.
    /// Blank text is ignored without touching the balance.
    pub async fn check(
        &self,
        user_id: &str,
        text: &str,
    ) -> Result<CheckOutcome, Box<dyn std::error::Error>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(CheckOutcome::Empty);
        }

        if !self.ledger.debit_one(user_id).await? {
            log::info!("User {} is out of tokens, issuing payment code", user_id);
            let request = self.ledger.request_payment(user_id).await?;
            return Ok(CheckOutcome::PaymentRequired(request));
        }

        let corrected = self.corrector.correct_spelling(text).await;
        self.ledger.record_correction();

        Ok(CheckOutcome::Checked {
            original: text.to_string(),
            corrected,
            balance: self.ledger.balance(user_id)?,
        })
    }
}
