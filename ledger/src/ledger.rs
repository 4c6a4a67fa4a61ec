//! Token ledger and payment state machine
//!
//! Concurrency model:
//! - The account map sits behind a `parking_lot::RwLock` that is never held
//!   across an `.await`; snapshots are written while the write guard is held,
//!   so saves land in the same order as the mutations they capture
//! - Every mutating operation first takes that user's async mutex and keeps it
//!   for the whole check-(await verifier)-mutate-persist sequence, so two
//!   receipts for the same user are verified one after the other

use crate::account::{Account, LeaderboardEntry, PaymentReceipt, TransactionKind, UserStats};
use crate::analytics::{Analytics, UsageStats};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::payment::{
    PaymentCodeGenerator, PaymentRequest, PaymentState, ReceiptVerificationRequest,
    ReceiptVerifier, VerificationOutcome, DEFAULT_REJECTION_REASON, NO_PENDING_PAYMENT_REASON,
};
use crate::store::AccountStore;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct TokenLedger {
    config: LedgerConfig,
    store: Arc<dyn AccountStore>,
    verifier: Arc<dyn ReceiptVerifier>,
    accounts: RwLock<HashMap<String, Account>>,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
    codes: PaymentCodeGenerator,
    analytics: Analytics,
}

impl TokenLedger {
    /// Load every account from the store. A failed or corrupt load starts empty.
    pub fn open(
        config: LedgerConfig,
        store: Arc<dyn AccountStore>,
        verifier: Arc<dyn ReceiptVerifier>,
    ) -> Self {
        let accounts = match store.load() {
            Ok(accounts) => accounts,
            Err(e) => {
                log::error!("❌ Error loading users data, starting empty: {}", e);
                HashMap::new()
            }
        };

        Self {
            config,
            store,
            verifier,
            accounts: RwLock::new(accounts),
            user_locks: DashMap::new(),
            codes: PaymentCodeGenerator::new(),
            analytics: Analytics::in_memory(),
        }
    }

    pub fn with_analytics(mut self, analytics: Analytics) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn usage_stats(&self) -> UsageStats {
        self.analytics.snapshot()
    }

    /// Count one performed correction in the analytics
    pub fn record_correction(&self) {
        self.analytics.record_correction();
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// Run `f` on the (lazily created, touched) account under the write lock.
    ///
    /// `f` returns its value and whether it changed the account; the snapshot
    /// is rewritten on change or creation. If that write fails the account is
    /// put back as it was, so an `Err` never leaves a half-applied change.
    fn with_account<T>(&self, user_id: &str, f: impl FnOnce(&mut Account) -> (T, bool)) -> Result<T> {
        let mut accounts = self.accounts.write();

        let previous = accounts.get(user_id).cloned();
        let account = accounts
            .entry(user_id.to_string())
            .or_insert_with(|| Account::new(self.config.initial_tokens));
        account.touch();

        let (value, changed) = f(account);
        let created = previous.is_none();

        if created || changed {
            if let Err(e) = self.store.save_all(&accounts) {
                log::error!("❌ Failed to save account {}, change rolled back: {}", user_id, e);
                match previous {
                    Some(account) => {
                        accounts.insert(user_id.to_string(), account);
                    }
                    None => {
                        accounts.remove(user_id);
                    }
                }
                return Err(e);
            }
        }

        if created {
            log::info!(
                "👤 New account {} with {} tokens",
                user_id,
                self.config.initial_tokens
            );
        }

        Ok(value)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn balance(&self, user_id: &str) -> Result<u64> {
        self.with_account(user_id, |account| (account.balance, false))
    }

    pub fn is_payment_pending(&self, user_id: &str) -> Result<bool> {
        self.with_account(user_id, |account| (account.payment_pending, false))
    }

    pub fn payment_state(&self, user_id: &str) -> Result<PaymentState> {
        let pending = self.is_payment_pending(user_id)?;
        Ok(if pending {
            PaymentState::PaymentPending
        } else {
            PaymentState::Active
        })
    }

    pub fn user_stats(&self, user_id: &str) -> Result<UserStats> {
        self.with_account(user_id, |account| (UserStats::from(&*account), false))
    }

    /// Copy of the full record, transactions included
    pub fn account(&self, user_id: &str) -> Result<Account> {
        self.with_account(user_id, |account| (account.clone(), false))
    }

    /// Top accounts by tokens earned; ties broken by user id
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let accounts = self.accounts.read();
        let mut entries: Vec<LeaderboardEntry> = accounts
            .iter()
            .map(|(user_id, account)| LeaderboardEntry {
                user_id: user_id.clone(),
                tokens_earned: account.total_tokens_earned,
                total_payments: account.total_payments,
                last_active: account.last_active,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.tokens_earned
                .cmp(&a.tokens_earned)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        entries.truncate(limit);
        entries
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Spend `amount` tokens. `Ok(false)` means the balance was short and nothing changed.
    pub async fn debit(&self, user_id: &str, amount: u64) -> Result<bool> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "debit amount must be positive".to_string(),
            ));
        }

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let debited = self.with_account(user_id, |account| {
            let debited = account.debit(amount);
            (debited, debited)
        })?;

        if debited {
            self.analytics.record_tokens_spent(amount);
        } else {
            log::debug!("Insufficient tokens for {} (needed {})", user_id, amount);
        }
        Ok(debited)
    }

    /// Spend a single token
    pub async fn debit_one(&self, user_id: &str) -> Result<bool> {
        self.debit(user_id, 1).await
    }

    /// Add tokens. Callers decide eligibility; returns the new balance.
    pub async fn credit(&self, user_id: &str, amount: u64, kind: TransactionKind) -> Result<u64> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "credit amount must be positive".to_string(),
            ));
        }

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.with_account(user_id, |account| {
            account.credit(amount, kind);
            (account.balance, true)
        })
    }

    /// Issue a fresh payment code. Any earlier code for the user becomes void.
    pub async fn request_payment(&self, user_id: &str) -> Result<PaymentRequest> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let code = self.codes.next_code();
        self.with_account(user_id, |account| {
            account.begin_payment(code.clone());
            ((), true)
        })?;
        self.analytics.record_payment_request();
        log::info!("💳 Payment code {} issued for {}", code, user_id);

        Ok(PaymentRequest {
            amount: self.config.payment_amount.clone(),
            currency: self.config.currency.clone(),
            tokens: self.config.tokens_per_payment,
            receiver: self.config.payment_receiver.clone(),
            card: self.config.payment_card.clone(),
            card_last4: self.config.card_last4(),
            provider: self.config.payment_provider.clone(),
            payment_code: code,
        })
    }

    /// Check a receipt for the user's pending payment and credit on acceptance.
    ///
    /// Without a pending payment this fails at once and the verifier is not contacted.
    pub async fn verify_payment(
        &self,
        user_id: &str,
        image_reference: &str,
    ) -> Result<VerificationOutcome> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let current_code = self.with_account(user_id, |account| {
            (account.current_payment_code().map(str::to_string), false)
        })?;

        let Some(payment_code) = current_code else {
            return Ok(VerificationOutcome::Rejected {
                confidence: None,
                reason: NO_PENDING_PAYMENT_REASON.to_string(),
            });
        };

        let request = ReceiptVerificationRequest {
            image_reference: image_reference.to_string(),
            expected_amount: self.config.expected_amount(),
            currency: self.config.currency.clone(),
            card_last4: self.config.card_last4(),
            payment_code,
        };

        log::info!(
            "🔍 Verifying receipt for {} (code {})",
            user_id,
            request.payment_code
        );
        let verification = self.verifier.verify_receipt(&request).await;

        if !verification.is_accepted() {
            self.analytics.record_payment_failure();
            log::info!(
                "❌ Receipt rejected for {} (valid: {}, confidence: {})",
                user_id,
                verification.valid,
                verification.confidence
            );
            let reason = if verification.reason.trim().is_empty() {
                DEFAULT_REJECTION_REASON.to_string()
            } else {
                verification.reason
            };
            return Ok(VerificationOutcome::Rejected {
                confidence: Some(verification.confidence),
                reason,
            });
        }

        let tokens = self.config.tokens_per_payment;
        let receipt = PaymentReceipt {
            source: image_reference.to_string(),
            confidence: verification.confidence,
            verified_at: Utc::now(),
        };
        let new_balance = self.with_account(user_id, |account| {
            account.complete_payment(tokens, receipt);
            (account.balance, true)
        })?;
        self.analytics.record_payment_success();
        log::info!(
            "✅ Payment verified for {}: +{} tokens (balance {})",
            user_id,
            tokens,
            new_balance
        );

        Ok(VerificationOutcome::Verified {
            tokens_added: tokens,
            new_balance,
            confidence: verification.confidence,
            reason: verification.reason,
        })
    }
}
