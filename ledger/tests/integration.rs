use async_trait::async_trait;
use imlo_ledger::*;
use imlo_storage::{Storage, StorageError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Verifier that answers with a fixed validity/confidence and records requests
struct ScriptedVerifier {
    valid: bool,
    confidence: f64,
    delay: Option<Duration>,
    requests: Mutex<Vec<ReceiptVerificationRequest>>,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    fn new(valid: bool, confidence: f64) -> Arc<Self> {
        Arc::new(Self {
            valid,
            confidence,
            delay: None,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(valid: bool, confidence: f64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            valid,
            confidence,
            delay: Some(delay),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReceiptVerifier for ScriptedVerifier {
    async fn verify_receipt(&self, request: &ReceiptVerificationRequest) -> ReceiptVerification {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        ReceiptVerification {
            valid: self.valid,
            amount: Some(request.expected_amount as f64),
            currency: request.currency.clone(),
            card_last4: request.card_last4.clone(),
            confidence: self.confidence,
            reason: format!("scripted confidence {}", self.confidence),
        }
    }
}

/// In-memory store whose writes can be switched to fail
#[derive(Default)]
struct FlakyStore {
    inner: MemoryAccountStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl AccountStore for FlakyStore {
    fn load(&self) -> Result<HashMap<String, Account>> {
        self.inner.load()
    }

    fn save_all(&self, accounts: &HashMap<String, Account>) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            ))
            .into());
        }
        self.inner.save_all(accounts)
    }
}

fn config(initial_tokens: u64) -> LedgerConfig {
    LedgerConfig {
        initial_tokens,
        tokens_per_payment: 50,
        ..LedgerConfig::default()
    }
}

fn setup(
    initial_tokens: u64,
    verifier: Arc<ScriptedVerifier>,
) -> (TokenLedger, Arc<MemoryAccountStore>) {
    let store = Arc::new(MemoryAccountStore::new());
    let ledger = TokenLedger::open(config(initial_tokens), store.clone(), verifier);
    (ledger, store)
}

#[tokio::test]
async fn test_sequential_debits_keep_audit_trail() {
    let (ledger, store) = setup(5, ScriptedVerifier::new(true, 90.0));

    for _ in 0..4 {
        assert!(ledger.debit_one("alice").await.unwrap());
    }

    let account = ledger.account("alice").unwrap();
    assert_eq!(account.balance, 1);
    assert_eq!(account.total_tokens_used, 4);
    assert_eq!(account.transactions.len(), 4);
    for (i, tx) in account.transactions.iter().enumerate() {
        assert_eq!(tx.kind, TransactionKind::Usage);
        assert_eq!(tx.amount, -1);
        assert_eq!(tx.balance_after, 5 - (i as u64 + 1));
    }

    // one full rewrite per debit, the first also creating the account
    assert_eq!(store.save_count(), 4);
    assert_eq!(store.snapshot()["alice"].balance, 1);
}

#[tokio::test]
async fn test_debit_with_short_balance_changes_nothing() {
    let (ledger, _store) = setup(2, ScriptedVerifier::new(true, 90.0));

    assert!(!ledger.debit("bob", 3).await.unwrap());

    let account = ledger.account("bob").unwrap();
    assert_eq!(account.balance, 2);
    assert!(account.transactions.is_empty());
    assert_eq!(account.total_tokens_used, 0);
}

#[tokio::test]
async fn test_empty_balance_debit_fails() {
    let (ledger, _store) = setup(0, ScriptedVerifier::new(true, 90.0));

    assert_eq!(ledger.balance("carol").unwrap(), 0);
    assert!(!ledger.debit_one("carol").await.unwrap());
    assert_eq!(ledger.balance("carol").unwrap(), 0);
    assert!(ledger.account("carol").unwrap().transactions.is_empty());
}

#[tokio::test]
async fn test_reissued_code_replaces_previous() {
    let verifier = ScriptedVerifier::new(true, 75.0);
    let (ledger, _store) = setup(0, verifier.clone());

    let first = ledger.request_payment("dave").await.unwrap();
    let second = ledger.request_payment("dave").await.unwrap();
    assert_ne!(first.payment_code, second.payment_code);
    assert_eq!(
        ledger.account("dave").unwrap().current_payment_code(),
        Some(second.payment_code.as_str())
    );

    ledger.verify_payment("dave", "https://files/r1.jpg").await.unwrap();
    let requests = verifier.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].payment_code, second.payment_code);
}

#[tokio::test]
async fn test_payment_request_details() {
    let (ledger, _store) = setup(0, ScriptedVerifier::new(true, 75.0));

    let request = ledger.request_payment("erin").await.unwrap();
    assert_eq!(request.amount, "50000");
    assert_eq!(request.currency, "UZS");
    assert_eq!(request.tokens, 50);
    assert_eq!(request.card_last4, "3764");
    assert_eq!(request.provider, "Uzcard");
    assert!(request.payment_code.starts_with("PAY-"));
    assert_eq!(ledger.payment_state("erin").unwrap(), PaymentState::PaymentPending);
    assert_eq!(ledger.usage_stats().payment_requests, 1);
}

#[tokio::test]
async fn test_verify_without_pending_never_calls_verifier() {
    let verifier = ScriptedVerifier::new(true, 99.0);
    let (ledger, _store) = setup(0, verifier.clone());

    let outcome = ledger.verify_payment("frank", "https://files/r.jpg").await.unwrap();

    assert!(!outcome.is_verified());
    assert_eq!(outcome.reason(), NO_PENDING_PAYMENT_REASON);
    assert_eq!(verifier.calls(), 0);
    assert_eq!(ledger.balance("frank").unwrap(), 0);
}

#[tokio::test]
async fn test_confident_receipt_credits_tokens() {
    let verifier = ScriptedVerifier::new(true, 75.0);
    let (ledger, store) = setup(0, verifier.clone());

    ledger.request_payment("gina").await.unwrap();
    let before = ledger.account("gina").unwrap().transactions.len();

    let outcome = ledger.verify_payment("gina", "https://files/gina.jpg").await.unwrap();

    match outcome {
        VerificationOutcome::Verified {
            tokens_added,
            new_balance,
            confidence,
            ..
        } => {
            assert_eq!(tokens_added, 50);
            assert_eq!(new_balance, 50);
            assert_eq!(confidence, 75.0);
        }
        other => panic!("expected verification, got {:?}", other),
    }

    let account = ledger.account("gina").unwrap();
    assert!(!account.payment_pending);
    assert_eq!(account.balance, 50);
    assert_eq!(account.transactions.len(), before + 1);
    let last = account.transactions.last().unwrap();
    assert_eq!(last.kind, TransactionKind::Payment);
    assert_eq!(last.amount, 50);
    assert_eq!(last.balance_after, 50);

    let receipt = account.payment_receipt.unwrap();
    assert_eq!(receipt.source, "https://files/gina.jpg");
    assert_eq!(receipt.confidence, 75.0);

    let request = verifier.requests.lock().unwrap()[0].clone();
    assert_eq!(request.expected_amount, 50_000);
    assert_eq!(request.currency, "UZS");
    assert_eq!(request.card_last4, "3764");

    assert!(!store.snapshot()["gina"].payment_pending);
    assert_eq!(ledger.usage_stats().payment_successes, 1);
}

#[tokio::test]
async fn test_low_confidence_receipt_is_rejected() {
    let (ledger, _store) = setup(0, ScriptedVerifier::new(true, 40.0));

    ledger.request_payment("hank").await.unwrap();
    let outcome = ledger.verify_payment("hank", "https://files/blurry.jpg").await.unwrap();

    assert_eq!(
        outcome,
        VerificationOutcome::Rejected {
            confidence: Some(40.0),
            reason: "scripted confidence 40".to_string(),
        }
    );
    let account = ledger.account("hank").unwrap();
    assert_eq!(account.balance, 0);
    assert!(account.payment_pending);
    assert!(account.transactions.is_empty());
    assert_eq!(ledger.usage_stats().payment_failures, 1);
}

#[tokio::test]
async fn test_invalid_receipt_is_rejected() {
    let (ledger, _store) = setup(0, ScriptedVerifier::new(false, 95.0));

    ledger.request_payment("ivan").await.unwrap();
    let outcome = ledger.verify_payment("ivan", "https://files/fake.jpg").await.unwrap();

    assert!(!outcome.is_verified());
    assert!(ledger.is_payment_pending("ivan").unwrap());
}

#[tokio::test]
async fn test_second_verify_after_success_fails() {
    let verifier = ScriptedVerifier::new(true, 80.0);
    let (ledger, _store) = setup(0, verifier.clone());

    ledger.request_payment("jane").await.unwrap();
    assert!(ledger.verify_payment("jane", "r.jpg").await.unwrap().is_verified());
    let again = ledger.verify_payment("jane", "r.jpg").await.unwrap();

    assert_eq!(again.reason(), NO_PENDING_PAYMENT_REASON);
    assert_eq!(verifier.calls(), 1);
    assert_eq!(ledger.balance("jane").unwrap(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verifications_credit_once() {
    let verifier = ScriptedVerifier::slow(true, 90.0, Duration::from_millis(50));
    let store = Arc::new(MemoryAccountStore::new());
    let ledger = Arc::new(TokenLedger::open(config(0), store, verifier.clone()));

    ledger.request_payment("kate").await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .verify_payment("kate", &format!("https://files/{}.jpg", i))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut verified = 0;
    for handle in handles {
        if handle.await.unwrap().is_verified() {
            verified += 1;
        }
    }

    assert_eq!(verified, 1);
    assert_eq!(verifier.calls(), 1);
    let account = ledger.account("kate").unwrap();
    assert_eq!(account.balance, 50);
    assert_eq!(account.total_payments, 1);
    assert_eq!(account.transactions.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() {
    let store = Arc::new(MemoryAccountStore::new());
    let ledger = Arc::new(TokenLedger::open(
        config(10),
        store,
        ScriptedVerifier::new(true, 90.0),
    ));

    let handles: Vec<_> = (0..25)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.debit_one("liam").await.unwrap() })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 10);
    let account = ledger.account("liam").unwrap();
    assert_eq!(account.balance, 0);
    let after: Vec<u64> = account.transactions.iter().map(|t| t.balance_after).collect();
    assert_eq!(after, (0..10).rev().collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(SnapshotAccountStore::new(Storage::open(dir.path()).unwrap()));
        let ledger = TokenLedger::open(config(3), store, ScriptedVerifier::new(true, 90.0));
        assert!(ledger.debit_one("mia").await.unwrap());
        ledger.request_payment("mia").await.unwrap();
    }

    let store = Arc::new(SnapshotAccountStore::new(Storage::open(dir.path()).unwrap()));
    let ledger = TokenLedger::open(config(3), store, ScriptedVerifier::new(true, 90.0));

    let account = ledger.account("mia").unwrap();
    assert_eq!(account.balance, 2);
    assert!(account.payment_pending);
    assert_eq!(account.transactions.len(), 1);
}

#[tokio::test]
async fn test_corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("users.json"), "{ definitely not json").unwrap();

    let store = Arc::new(SnapshotAccountStore::new(Storage::open(dir.path()).unwrap()));
    let ledger = TokenLedger::open(config(7), store, ScriptedVerifier::new(true, 90.0));

    assert!(ledger.leaderboard(10).is_empty());
    assert_eq!(ledger.balance("noah").unwrap(), 7);
}

#[tokio::test]
async fn test_failed_save_leaves_debit_unapplied() {
    let store = Arc::new(FlakyStore::default());
    let ledger = TokenLedger::open(config(3), store.clone(), ScriptedVerifier::new(true, 90.0));
    assert_eq!(ledger.balance("olivia").unwrap(), 3);

    store.set_failing(true);
    let result = ledger.debit_one("olivia").await;
    assert!(matches!(result, Err(LedgerError::Storage(_))));
    assert_eq!(ledger.balance("olivia").unwrap(), 3);
    assert!(ledger.account("olivia").unwrap().transactions.is_empty());
    assert_eq!(ledger.usage_stats().tokens_spent, 0);

    // a retry once the disk recovers charges exactly once
    store.set_failing(false);
    assert!(ledger.debit_one("olivia").await.unwrap());
    assert_eq!(ledger.balance("olivia").unwrap(), 2);
    assert_eq!(ledger.usage_stats().tokens_spent, 1);
    assert_eq!(store.inner.snapshot()["olivia"].balance, 2);
}

#[tokio::test]
async fn test_failed_save_leaves_payment_pending() {
    let store = Arc::new(FlakyStore::default());
    let verifier = ScriptedVerifier::new(true, 90.0);
    let ledger = TokenLedger::open(config(0), store.clone(), verifier.clone());
    let request = ledger.request_payment("paul").await.unwrap();

    store.set_failing(true);
    let result = ledger.verify_payment("paul", "https://files/r.jpg").await;
    assert!(matches!(result, Err(LedgerError::Storage(_))));

    let account = ledger.account("paul").unwrap();
    assert_eq!(account.balance, 0);
    assert!(account.payment_pending);
    assert_eq!(account.current_payment_code(), Some(request.payment_code.as_str()));
    assert_eq!(ledger.usage_stats().payment_successes, 0);

    store.set_failing(false);
    let outcome = ledger.verify_payment("paul", "https://files/r.jpg").await.unwrap();
    assert!(outcome.is_verified());
    assert_eq!(ledger.balance("paul").unwrap(), 50);
    assert_eq!(ledger.usage_stats().payment_successes, 1);
    assert_eq!(verifier.calls(), 2);
}

#[tokio::test]
async fn test_failed_save_does_not_create_account() {
    let store = Arc::new(FlakyStore::default());
    store.set_failing(true);
    let ledger = TokenLedger::open(config(5), store.clone(), ScriptedVerifier::new(true, 90.0));

    assert!(ledger.balance("quinn").is_err());
    assert!(ledger.leaderboard(10).is_empty());
}
