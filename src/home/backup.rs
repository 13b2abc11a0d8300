//! Wallet backup and restore.
//!
//! A backup is the store's full serialized dump written to a dated file.
//! The same routine serves the user-initiated flow (explicit directory) and
//! the quit-time flow (configured backup directory). Restore feeds a dump
//! back into the store; the restored wallet is then reopened through the
//! normal login path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::dated_filename;
use crate::error::{StorageError, WalletCoreError};
use crate::store::WalletStore;

/// Write the wallet dump to `<timestamp>-<walletId>.backup` in `dest_dir`.
pub fn backup(
    store: &dyn WalletStore,
    wallet_uuid: &str,
    dest_dir: &Path,
) -> Result<PathBuf, WalletCoreError> {
    let dump = store.wallet_dump()?;

    fs::create_dir_all(dest_dir).map_err(StorageError::Io)?;
    let path = dated_filename(dest_dir, wallet_uuid, "backup");
    fs::write(&path, &dump).map_err(StorageError::Io)?;

    log::info!("wallet backup written to {}", path.display());
    Ok(path)
}

/// Load a dump file into the store. An empty or unreadable file is reported
/// as an error and leaves the store untouched.
pub fn restore(store: &dyn WalletStore, file: &Path) -> Result<(), WalletCoreError> {
    let dump = fs::read(file).map_err(StorageError::Io)?;
    if dump.is_empty() {
        return Err(WalletCoreError::EmptyInput(format!(
            "backup file {} is empty",
            file.display()
        )));
    }
    store.import_wallet_dump(&dump)?;
    log::info!("wallet restored from {}", file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyEntry, MemoryWalletStore, TxRecord};
    use tempfile::TempDir;

    #[test]
    fn test_backup_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = MemoryWalletStore::new("wallet-1", "pw", "/tmp").unwrap();
        store.set_balance("5000000");
        store.push_transaction(TxRecord {
            tx_id: "tx1".to_string(),
            amount_drops: "5000000".to_string(),
            timestamp: 7,
        });
        store
            .import_private_key(
                &KeyEntry {
                    account_id: "acct".to_string(),
                    secret: "ssSeed".to_string(),
                },
                "pw",
            )
            .unwrap();

        let path = backup(&store, "wallet-1", dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("-wallet-1.backup"));

        let restored = MemoryWalletStore::new("other", "other-pw", "/tmp").unwrap();
        restore(&restored, &path).unwrap();

        assert_eq!(restored.balance(), store.balance());
        assert_eq!(restored.tx_count(), store.tx_count());
        assert_eq!(
            restored.decrypt_all_keys("pw").unwrap(),
            store.decrypt_all_keys("pw").unwrap()
        );
    }

    #[test]
    fn test_restore_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.backup");
        fs::write(&path, b"").unwrap();

        let store = MemoryWalletStore::new("w", "pw", "/tmp").unwrap();
        store.set_balance("42");

        let err = restore(&store, &path).unwrap_err();
        assert!(matches!(err, WalletCoreError::EmptyInput(_)));
        // No state change.
        assert_eq!(store.balance(), Some("42".to_string()));
    }

    #[test]
    fn test_restore_rejects_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = MemoryWalletStore::new("w", "pw", "/tmp").unwrap();
        assert!(restore(&store, &dir.path().join("nope.backup")).is_err());
    }
}
