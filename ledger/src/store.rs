//! Durable account store
//!
//! The ledger reads the whole map once at startup and hands the whole map
//! back after every mutation. Implementations decide how it hits disk.

use crate::account::Account;
use crate::error::Result;
use imlo_storage::Storage;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Snapshot name of the account map inside the data directory
pub const USERS_SNAPSHOT: &str = "users";

pub trait AccountStore: Send + Sync {
    fn load(&self) -> Result<HashMap<String, Account>>;
    fn save_all(&self, accounts: &HashMap<String, Account>) -> Result<()>;
}

/// File-backed store: `users.json` + `users.bin`, replaced atomically
pub struct SnapshotAccountStore {
    storage: Storage,
}

impl SnapshotAccountStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl AccountStore for SnapshotAccountStore {
    fn load(&self) -> Result<HashMap<String, Account>> {
        if !self.storage.has_snapshot(USERS_SNAPSHOT) {
            log::info!(
                "📂 No existing users snapshot in {}, starting fresh",
                self.storage.data_dir().display()
            );
            return Ok(HashMap::new());
        }

        let accounts: HashMap<String, Account> = self.storage.load_snapshot(USERS_SNAPSHOT)?;
        log::info!("📂 Loaded {} accounts from disk", accounts.len());
        Ok(accounts)
    }

    fn save_all(&self, accounts: &HashMap<String, Account>) -> Result<()> {
        self.storage.save_snapshot(USERS_SNAPSHOT, accounts)?;
        Ok(())
    }
}

/// In-process store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
    saves: Mutex<usize>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded store, as if loaded from disk
    pub fn with_accounts(accounts: HashMap<String, Account>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            saves: Mutex::new(0),
        }
    }

    /// Number of `save_all` calls so far
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    /// Copy of the last saved map
    pub fn snapshot(&self) -> HashMap<String, Account> {
        self.accounts.lock().clone()
    }
}

impl AccountStore for MemoryAccountStore {
    fn load(&self) -> Result<HashMap<String, Account>> {
        Ok(self.accounts.lock().clone())
    }

    fn save_all(&self, accounts: &HashMap<String, Account>) -> Result<()> {
        *self.accounts.lock() = accounts.clone();
        *self.saves.lock() += 1;
        Ok(())
    }
}
