//! Reference wallet store.
//!
//! Keeps everything in memory, hashes the wallet password with Argon2 and
//! encrypts key secrets with AES-GCM under a password-derived key. The dump
//! format is a private serde_json snapshot; nothing outside this module may
//! rely on it.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{
    password_hash::{rand_core::RngCore, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use zeroize::Zeroize;

use crate::error::{AuthError, StorageError, WalletCoreError};

use super::{DbMetadata, KeyEntry, OpenState, TxRecord, WalletStore};

#[derive(Serialize, Deserialize, Clone)]
struct StoredKey {
    account_id: String,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

/// Snapshot of the store contents; also the dump payload.
#[derive(Serialize, Deserialize, Clone)]
struct Inner {
    metadata: DbMetadata,
    password_hash: String,
    kdf_salt: String,
    keys: Vec<StoredKey>,
    transactions: Vec<TxRecord>,
    balance_drops: Option<String>,
    tx_index_valid: bool,
}

pub struct MemoryWalletStore {
    inner: Mutex<Inner>,
    open_tx: watch::Sender<OpenState>,
}

impl MemoryWalletStore {
    pub fn new(
        wallet_uuid: &str,
        password: &str,
        location: &str,
    ) -> Result<Self, WalletCoreError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StorageError::Crypto(e.to_string()))?
            .to_string();
        let kdf_salt = SaltString::generate(&mut OsRng);

        let (open_tx, _) = watch::channel(OpenState::Init);
        Ok(Self {
            inner: Mutex::new(Inner {
                metadata: DbMetadata {
                    wallet_uuid: wallet_uuid.to_string(),
                    created_at: Utc::now(),
                    location: location.to_string(),
                },
                password_hash,
                kdf_salt: kdf_salt.as_str().to_string(),
                keys: Vec::new(),
                transactions: Vec::new(),
                balance_drops: None,
                tx_index_valid: true,
            }),
            open_tx,
        })
    }

    /// Mark the store loaded, as the login flow does after opening the
    /// database.
    pub fn open(&self) {
        self.open_tx.send_replace(OpenState::Loaded);
    }

    pub fn set_balance(&self, drops: &str) {
        self.lock().balance_drops = Some(drops.to_string());
    }

    pub fn push_transaction(&self, tx: TxRecord) {
        self.lock().transactions.push(tx);
    }

    pub fn invalidate_tx_index(&self) {
        self.lock().tx_index_valid = false;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn derive_key(password: &str, salt: &str) -> Result<[u8; 32], WalletCoreError> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut key)
            .map_err(|e| StorageError::Crypto(e.to_string()))?;
        Ok(key)
    }

    fn verify(inner: &Inner, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&inner.password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

impl WalletStore for MemoryWalletStore {
    fn open_state(&self) -> watch::Receiver<OpenState> {
        self.open_tx.subscribe()
    }

    fn metadata(&self) -> Result<DbMetadata, WalletCoreError> {
        Ok(self.lock().metadata.clone())
    }

    fn is_transaction_index_valid(&self) -> bool {
        self.lock().tx_index_valid
    }

    fn clear_transactions(&self) {
        let mut inner = self.lock();
        inner.transactions.clear();
        inner.tx_index_valid = true;
    }

    fn balance(&self) -> Option<String> {
        self.lock().balance_drops.clone()
    }

    fn tx_count(&self) -> u64 {
        self.lock().transactions.len() as u64
    }

    fn last_tx(&self) -> Option<TxRecord> {
        let inner = self.lock();
        inner
            .transactions
            .iter()
            .max_by_key(|tx| tx.timestamp)
            .cloned()
    }

    fn check_password_hash(&self, password: &str) -> bool {
        Self::verify(&self.lock(), password)
    }

    fn decrypt_all_keys(&self, password: &str) -> Result<Vec<KeyEntry>, WalletCoreError> {
        let inner = self.lock();
        if !Self::verify(&inner, password) {
            return Err(AuthError::WrongPassword.into());
        }

        let mut key = Self::derive_key(password, &inner.kdf_salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| StorageError::Crypto(e.to_string()))?;
        key.zeroize();

        let mut decrypted = Vec::with_capacity(inner.keys.len());
        for stored in &inner.keys {
            let nonce = Nonce::from_slice(&stored.nonce);
            let plaintext = cipher
                .decrypt(nonce, stored.ciphertext.as_ref())
                .map_err(|_| StorageError::Crypto("key decryption failed".to_string()))?;
            let secret = String::from_utf8(plaintext)
                .map_err(|e| StorageError::Crypto(e.to_string()))?;
            decrypted.push(KeyEntry {
                account_id: stored.account_id.clone(),
                secret,
            });
        }
        Ok(decrypted)
    }

    fn import_private_key(&self, entry: &KeyEntry, password: &str) -> Result<(), WalletCoreError> {
        let mut inner = self.lock();
        if !Self::verify(&inner, password) {
            return Err(AuthError::WrongPassword.into());
        }

        let mut key = Self::derive_key(password, &inner.kdf_salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| StorageError::Crypto(e.to_string()))?;
        key.zeroize();

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), entry.secret.as_bytes())
            .map_err(|_| StorageError::Crypto("key encryption failed".to_string()))?;

        inner.keys.retain(|k| k.account_id != entry.account_id);
        inner.keys.push(StoredKey {
            account_id: entry.account_id.clone(),
            nonce: nonce_bytes.to_vec(),
            ciphertext,
        });
        Ok(())
    }

    fn key(&self, account_id: &str) -> Option<KeyEntry> {
        let inner = self.lock();
        inner
            .keys
            .iter()
            .find(|k| k.account_id == account_id)
            .map(|k| KeyEntry {
                account_id: k.account_id.clone(),
                // Ciphertext stays sealed; only the account id is exposed.
                secret: String::new(),
            })
    }

    fn wallet_dump(&self) -> Result<Vec<u8>, WalletCoreError> {
        let inner = self.lock();
        let dump = serde_json::to_vec_pretty(&*inner).map_err(StorageError::Json)?;
        Ok(dump)
    }

    fn import_wallet_dump(&self, dump: &[u8]) -> Result<(), WalletCoreError> {
        let restored: Inner = serde_json::from_slice(dump).map_err(StorageError::Json)?;
        *self.lock() = restored;
        Ok(())
    }

    fn close(&self) {
        log::debug!("wallet store closing");
        self.open_tx.send_replace(OpenState::Init);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryWalletStore {
        MemoryWalletStore::new("test-wallet", "correct horse", "/tmp").unwrap()
    }

    #[test]
    fn test_password_hash_check() {
        let store = store();
        assert!(store.check_password_hash("correct horse"));
        assert!(!store.check_password_hash("battery staple"));
        assert!(!store.check_password_hash(""));
    }

    #[test]
    fn test_import_and_decrypt_round_trip() {
        let store = store();
        let entry = KeyEntry {
            account_id: "cAccount1".to_string(),
            secret: "ssSecretSeed1".to_string(),
        };
        store.import_private_key(&entry, "correct horse").unwrap();

        let decrypted = store.decrypt_all_keys("correct horse").unwrap();
        assert_eq!(decrypted, vec![entry]);

        assert!(store.decrypt_all_keys("wrong").is_err());
    }

    #[test]
    fn test_key_lookup_hides_secret() {
        let store = store();
        let entry = KeyEntry {
            account_id: "cAccount1".to_string(),
            secret: "ssSecretSeed1".to_string(),
        };
        store.import_private_key(&entry, "correct horse").unwrap();

        let found = store.key("cAccount1").unwrap();
        assert_eq!(found.account_id, "cAccount1");
        assert!(found.secret.is_empty());
        assert!(store.key("cUnknown").is_none());
    }

    #[test]
    fn test_dump_import_round_trip() {
        let store = store();
        store.set_balance("12345");
        store.push_transaction(TxRecord {
            tx_id: "tx1".to_string(),
            amount_drops: "1000".to_string(),
            timestamp: 42,
        });
        store
            .import_private_key(
                &KeyEntry {
                    account_id: "cAccount1".to_string(),
                    secret: "ssSecretSeed1".to_string(),
                },
                "correct horse",
            )
            .unwrap();

        let dump = store.wallet_dump().unwrap();

        let other = MemoryWalletStore::new("other", "unrelated", "/tmp").unwrap();
        other.import_wallet_dump(&dump).unwrap();

        assert_eq!(other.balance(), Some("12345".to_string()));
        assert_eq!(other.tx_count(), 1);
        assert_eq!(
            other.decrypt_all_keys("correct horse").unwrap().len(),
            1
        );
    }

    #[test]
    fn test_open_state_transitions() {
        let store = store();
        let rx = store.open_state();
        assert_eq!(*rx.borrow(), OpenState::Init);
        store.open();
        assert_eq!(*rx.borrow(), OpenState::Loaded);
        store.close();
        assert_eq!(*rx.borrow(), OpenState::Init);
    }
}
