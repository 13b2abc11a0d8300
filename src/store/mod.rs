//! Wallet store boundary.
//!
//! The controller never touches wallet persistence directly; everything goes
//! through the [`WalletStore`] trait. The persistence format and the signing
//! cryptography live behind this seam. [`memory::MemoryWalletStore`] is the
//! reference implementation used by the binary and the tests.

mod memory;

pub use memory::MemoryWalletStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::WalletCoreError;

/// Open/closed lifecycle of the wallet store, published on a watch channel.
///
/// `Init` means no wallet database is open. Coalescing is safe: only the
/// latest state matters to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenState {
    Init,
    Loaded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbMetadata {
    pub wallet_uuid: String,
    pub created_at: DateTime<Utc>,
    pub location: String,
}

/// One wallet key as it appears in key files and the store.
///
/// `secret` is ciphertext inside the store and plaintext only in import files
/// and export output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    #[serde(rename = "accountID")]
    pub account_id: String,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx_id: String,
    pub amount_drops: String,
    pub timestamp: i64,
}

/// Contract of the wallet store collaborator.
///
/// Implementations use interior mutability; the controller holds the store
/// behind an `Arc<dyn WalletStore>` and is its only mutating caller apart
/// from the login flow that opens it.
pub trait WalletStore: Send + Sync {
    /// Subscribe to open-state transitions. The receiver's current value
    /// reflects the state at subscription time.
    fn open_state(&self) -> watch::Receiver<OpenState>;

    fn metadata(&self) -> Result<DbMetadata, WalletCoreError>;

    /// Whether the transaction index matches the account state. When this
    /// returns false the transaction list must be rebuilt from the network.
    fn is_transaction_index_valid(&self) -> bool;

    /// Drop all locally indexed transactions so they are refetched.
    fn clear_transactions(&self);

    /// Native balance in drops, if any account data exists.
    fn balance(&self) -> Option<String>;

    fn tx_count(&self) -> u64;

    fn last_tx(&self) -> Option<TxRecord>;

    /// Verify a candidate password against the stored wallet-password hash.
    fn check_password_hash(&self, password: &str) -> bool;

    /// Decrypt every stored key. Fails when the password does not match.
    fn decrypt_all_keys(&self, password: &str) -> Result<Vec<KeyEntry>, WalletCoreError>;

    /// Import one external key, encrypting its secret under `password`.
    fn import_private_key(&self, key: &KeyEntry, password: &str) -> Result<(), WalletCoreError>;

    /// Look up a key by account identifier.
    fn key(&self, account_id: &str) -> Option<KeyEntry>;

    /// Full serialized snapshot of the store contents.
    fn wallet_dump(&self) -> Result<Vec<u8>, WalletCoreError>;

    /// Replace the store contents with a previously produced dump.
    fn import_wallet_dump(&self, dump: &[u8]) -> Result<(), WalletCoreError>;

    /// Close the store. Drives the open-state channel to `Init` once all
    /// data is flushed.
    fn close(&self);
}
