//! Private key import and export pipeline.
//!
//! Import parses an external key file and keeps only accounts the store does
//! not already hold; the resulting batch is then gated behind the password
//! check. Export decrypts every stored key under the verified password and
//! writes them to a dated file; the plaintext buffer is zeroed as soon as
//! the file is written.

use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

use crate::config::dated_filename;
use crate::error::{StorageError, WalletCoreError};
use crate::home::password_gate::SecurePassword;
use crate::store::{KeyEntry, WalletStore};

/// Keys parsed from an import file, already filtered against the store.
#[derive(Debug, Default)]
pub struct KeyImportBatch {
    entries: Vec<KeyEntry>,
}

impl KeyImportBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }
}

/// Parse a key file and drop entries whose account already exists in the
/// store. An empty result means there is nothing to import; it is not an
/// error.
pub fn prepare_import(
    store: &dyn WalletStore,
    file: &Path,
) -> Result<KeyImportBatch, WalletCoreError> {
    let contents = fs::read_to_string(file).map_err(StorageError::Io)?;
    let keys: Vec<KeyEntry> = serde_json::from_str(&contents).map_err(StorageError::Json)?;

    let total = keys.len();
    let entries: Vec<KeyEntry> = keys
        .into_iter()
        .filter(|key| store.key(&key.account_id).is_none())
        .collect();
    log::debug!(
        "key import: {} of {} entries are new",
        entries.len(),
        total
    );
    Ok(KeyImportBatch { entries })
}

/// Import every batch entry into the store under the verified password.
/// Returns the number of imported keys.
pub fn import_batch(
    store: &dyn WalletStore,
    batch: &KeyImportBatch,
    password: &SecurePassword,
) -> Result<usize, WalletCoreError> {
    for entry in batch.entries() {
        store.import_private_key(entry, password.as_str())?;
    }
    Ok(batch.len())
}

/// Decrypt all stored keys and write them as `<timestamp>-<walletId>.keys`
/// into the chosen directory. The caller has already verified the password;
/// the store verifies it again before releasing plaintext.
pub fn export_all(
    store: &dyn WalletStore,
    wallet_uuid: &str,
    dest_dir: &Path,
    password: &SecurePassword,
) -> Result<PathBuf, WalletCoreError> {
    let mut keys = store.decrypt_all_keys(password.as_str())?;

    fs::create_dir_all(dest_dir).map_err(StorageError::Io)?;
    let path = dated_filename(dest_dir, wallet_uuid, "keys");
    let mut json = serde_json::to_string(&keys).map_err(StorageError::Json)?;
    let result = fs::write(&path, &json).map_err(StorageError::Io);

    // Plaintext leaves this function only inside the written file.
    json.zeroize();
    let count = keys.len();
    for key in &mut keys {
        key.secret.zeroize();
    }
    result?;

    log::info!("exported {} keys to {}", count, path.display());
    Ok(path)
}
