//! Session lifecycle operations.
//!
//! The session is the open/closed lifecycle of one local wallet store. The
//! controller resolves the selected wallet against the known-wallet list at
//! startup, reacts to the store's open-state transitions, and handles the
//! host shell's suspend/quit signals. The store handle is owned here; no
//! other component touches it directly.

use aes_gcm::aead::OsRng;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use zeroize::Zeroize;

use crate::config::KnownWallet;
use crate::error::{StorageError, WalletCoreError};
use crate::events::{Route, ShellAck, ShellSignal, UiEvent};
use crate::home::password_gate::SecurePassword;
use crate::home::{backup, HomeController, Subscriptions};
use crate::store::OpenState;

impl HomeController {
    /// Resolve the selected wallet, load settings and market data, then
    /// navigate and connect. A missing wallet record redirects to login
    /// instead of failing.
    pub(crate) fn startup(&mut self, subs: &mut Subscriptions) {
        match self.local_config.load_settings() {
            Ok(settings) => self.settings = settings,
            Err(err) => {
                log::error!("could not load wallet settings, using defaults: {}", err);
            }
        }
        self.send_ui(UiEvent::FiatCurrencies(self.market.fiat_currencies()));
        self.market.change_currency(&self.settings.fiat_currency);

        match self.resolve_session() {
            Ok(wallet) => {
                log::info!("session wallet: {}", wallet.wallet_uuid);
                self.send_ui(UiEvent::NavigateTo(Route::Transactions));
                self.connect_network(subs);
            }
            Err(err) => {
                log::warn!("no wallet session: {}", err);
                self.current_wallet = None;
                self.send_ui(UiEvent::NavigateTo(Route::Login));
            }
        }
    }

    /// Look up the current session id in the known-wallet list.
    pub(crate) fn resolve_session(&self) -> Result<KnownWallet, WalletCoreError> {
        let id = self
            .current_wallet
            .as_deref()
            .ok_or_else(|| WalletCoreError::WalletNotFound("no wallet selected".to_string()))?;
        self.local_config
            .find_wallet(id)?
            .ok_or_else(|| WalletCoreError::WalletNotFound(id.to_string()))
    }

    /// Close the store, disconnect and return to login.
    pub(crate) fn close_session(&mut self) {
        log::debug!("closing wallet session");
        self.store.close();
        self.network.disconnect();
        self.current_wallet = None;
        self.send_ui(UiEvent::NavigateTo(Route::Login));
    }

    /// Close everything and hand off to the wallet setup flow. Creates no
    /// wallet data itself.
    pub(crate) fn create_session(&mut self) {
        log::debug!("handing off to wallet setup");
        self.store.close();
        self.network.disconnect();
        self.current_wallet = None;
        self.create_wallet_running = true;
        log::debug!("create-wallet-running: {}", self.create_wallet_running);
        self.send_ui(UiEvent::NavigateTo(Route::WalletSetup));
    }

    pub(crate) fn handle_shell_signal(&mut self, signal: ShellSignal) {
        match signal {
            ShellSignal::Suspend => {
                log::info!("suspend signal: closing wallet");
                self.close_session();
            }
            ShellSignal::Quit => {
                log::info!("quit signal: backing up and closing wallet");
                self.quit_in_progress = true;
                let wallet_uuid = self.quit_backup_name();
                // A failed backup must not block process teardown.
                if let Err(err) =
                    backup::backup(self.store.as_ref(), &wallet_uuid, &self.backup_dir)
                {
                    log::error!("quit-time backup failed: {}", err);
                }
                self.store.close();
            }
        }
    }

    fn quit_backup_name(&self) -> String {
        self.current_wallet
            .clone()
            .or_else(|| {
                self.db_metadata
                    .as_ref()
                    .map(|meta| meta.wallet_uuid.clone())
            })
            .unwrap_or_else(|| "csc-wallet".to_string())
    }

    /// React to a store open-state transition. Returns true when the loop
    /// should terminate (quit acknowledged).
    pub(crate) fn handle_open_state(&mut self, state: OpenState) -> bool {
        match state {
            OpenState::Loaded => {
                log::debug!("wallet store loaded");
                match self.store.metadata() {
                    Ok(meta) => {
                        log::debug!("store metadata: {:?}", meta);
                        self.db_metadata = Some(meta);
                    }
                    Err(err) => log::error!("could not read store metadata: {}", err),
                }
                if !self.store.is_transaction_index_valid() {
                    log::info!("transaction index invalid, rebuilding from network");
                    self.store.clear_transactions();
                }
                self.refresh_balance();
                self.refresh_transactions();
                false
            }
            OpenState::Init => {
                if self.quit_in_progress {
                    // The backup is flushed and the store confirmed closed;
                    // the shell may tear the process down now.
                    log::info!("store closed, acknowledging quit");
                    self.quit_in_progress = false;
                    let _ = self.shell_ack_tx.send(ShellAck::WalletClosed);
                    true
                } else if self.current_wallet.is_some() {
                    log::warn!("session present but store not open, forcing logout");
                    self.current_wallet = None;
                    self.send_ui(UiEvent::NavigateTo(Route::Login));
                    false
                } else {
                    false
                }
            }
        }
    }

    /// Register an external wallet database in the known-wallet list. The
    /// verified password seeds the record's hash; the wallet itself opens
    /// later through the login flow.
    pub(crate) fn import_wallet_record(
        &mut self,
        db_file: &std::path::Path,
        password: &SecurePassword,
    ) -> Result<(), WalletCoreError> {
        let wallet_uuid = db_file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                WalletCoreError::EmptyInput(format!(
                    "wallet file has no usable name: {}",
                    db_file.display()
                ))
            })?
            .to_string();
        let location = db_file
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();

        let record = KnownWallet {
            hash: wallet_password_hash(&wallet_uuid, password)?,
            wallet_uuid,
            imported_date: Utc::now(),
            location,
        };
        log::info!("registering imported wallet {}", record.wallet_uuid);
        self.local_config.add_known_wallet(record)?;

        self.current_wallet = None;
        self.send_ui(UiEvent::NavigateTo(Route::Login));
        Ok(())
    }
}

/// Hash stored in a known-wallet record, checked again by the login flow.
pub fn wallet_password_hash(
    wallet_uuid: &str,
    password: &SecurePassword,
) -> Result<String, WalletCoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let mut material = format!("{}{}", wallet_uuid, password.as_str());
    let hash = Argon2::default()
        .hash_password(material.as_bytes(), &salt)
        .map_err(|e| StorageError::Crypto(e.to_string()))
        .map(|h| h.to_string());
    material.zeroize();
    Ok(hash?)
}
