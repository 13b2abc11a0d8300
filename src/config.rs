//! Configuration and local key-value storage.
//!
//! `CoreConfig` comes from environment variables with logged defaults.
//! `LocalConfig` persists the wallet settings record and the known-wallet
//! list as JSON files under the configuration directory; both are opaque
//! key-value entries to the rest of the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

const SETTINGS_FILE: &str = "wallet_settings.json";
const KNOWN_WALLETS_FILE: &str = "known_wallets.json";

#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// Directory holding settings and the known-wallet list.
    pub config_dir: PathBuf,
    /// Fixed destination for the quit-time wallet backup.
    pub backup_dir: PathBuf,
    /// Base URL of the market price API.
    pub market_url: String,
}

impl CoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CSC_WALLET_CONFIG_DIR`: config directory (default "./wallet-config")
    /// - `CSC_WALLET_BACKUP_DIR`: quit-time backup directory (default
    ///   "<config dir>/backups")
    /// - `CSC_MARKET_URL`: market price API base URL
    pub fn from_env() -> Self {
        let config_dir = env::var("CSC_WALLET_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./wallet-config"));

        let backup_dir = env::var("CSC_WALLET_BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join("backups"));

        let market_url = env::var("CSC_MARKET_URL")
            .unwrap_or_else(|_| "https://api.casinocoin.info/market".to_string());

        log::info!("config dir: {}", config_dir.display());
        log::info!("backup dir: {}", backup_dir.display());
        log::info!("market API: {}", market_url);

        Self {
            config_dir,
            backup_dir,
            market_url,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("./wallet-config"),
            backup_dir: PathBuf::from("./wallet-config/backups"),
            market_url: "https://api.casinocoin.info/market".to_string(),
        }
    }
}

/// Per-user wallet settings, persisted across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSettings {
    pub fiat_currency: String,
    pub show_notifications: bool,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            fiat_currency: "USD".to_string(),
            show_notifications: true,
        }
    }
}

/// One wallet known to the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownWallet {
    #[serde(rename = "walletUUID")]
    pub wallet_uuid: String,
    #[serde(rename = "importedDate")]
    pub imported_date: DateTime<Utc>,
    pub location: String,
    pub hash: String,
}

/// JSON-file-backed local configuration storage.
pub struct LocalConfig {
    base_path: PathBuf,
}

impl LocalConfig {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.base_path.join(file)
    }

    /// Load the settings record, creating it with defaults on first use.
    pub fn load_settings(&self) -> Result<WalletSettings, StorageError> {
        let path = self.path(SETTINGS_FILE);
        if !path.exists() {
            let settings = WalletSettings::default();
            self.save_settings(&settings)?;
            return Ok(settings);
        }
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &WalletSettings) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path)?;
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(self.path(SETTINGS_FILE), json)?;
        Ok(())
    }

    pub fn known_wallets(&self) -> Result<Vec<KnownWallet>, StorageError> {
        let path = self.path(KNOWN_WALLETS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(path)?;
        let wallets = serde_json::from_str(&contents)?;
        Ok(wallets)
    }

    pub fn find_wallet(&self, wallet_uuid: &str) -> Result<Option<KnownWallet>, StorageError> {
        Ok(self
            .known_wallets()?
            .into_iter()
            .find(|w| w.wallet_uuid == wallet_uuid))
    }

    pub fn add_known_wallet(&self, wallet: KnownWallet) -> Result<(), StorageError> {
        let mut wallets = self.known_wallets()?;
        wallets.push(wallet);
        fs::create_dir_all(&self.base_path)?;
        let json = serde_json::to_string_pretty(&wallets)?;
        fs::write(self.path(KNOWN_WALLETS_FILE), json)?;
        Ok(())
    }
}

/// Filename prefix for dated artifacts, matching the backup and key-export
/// naming scheme.
pub fn timestamp_prefix(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d-%H-%M-%S").to_string()
}

pub fn dated_filename(dir: &Path, wallet_uuid: &str, extension: &str) -> PathBuf {
    dir.join(format!(
        "{}-{}.{}",
        timestamp_prefix(Utc::now()),
        wallet_uuid,
        extension
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default_created_on_first_load() {
        let dir = TempDir::new().unwrap();
        let config = LocalConfig::new(dir.path().to_path_buf());

        let settings = config.load_settings().unwrap();
        assert_eq!(settings, WalletSettings::default());
        assert!(dir.path().join(SETTINGS_FILE).exists());
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = LocalConfig::new(dir.path().to_path_buf());

        let settings = WalletSettings {
            fiat_currency: "EUR".to_string(),
            show_notifications: false,
        };
        config.save_settings(&settings).unwrap();
        assert_eq!(config.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_known_wallets_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = LocalConfig::new(dir.path().to_path_buf());
        assert!(config.known_wallets().unwrap().is_empty());

        let wallet = KnownWallet {
            wallet_uuid: "abc-123".to_string(),
            imported_date: Utc::now(),
            location: "/wallets".to_string(),
            hash: "hash".to_string(),
        };
        config.add_known_wallet(wallet.clone()).unwrap();

        assert_eq!(config.known_wallets().unwrap(), vec![wallet.clone()]);
        assert_eq!(config.find_wallet("abc-123").unwrap(), Some(wallet));
        assert_eq!(config.find_wallet("missing").unwrap(), None);
    }

    #[test]
    fn test_default_config_paths() {
        let config = CoreConfig::default();
        assert_eq!(config.config_dir, PathBuf::from("./wallet-config"));
        assert_eq!(
            config.backup_dir,
            PathBuf::from("./wallet-config/backups")
        );
    }

    #[test]
    fn test_timestamp_prefix_format() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T07:09:11Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(timestamp_prefix(ts), "2024-03-05-07-09-11");
    }
}
