//! Main-screen controller.
//!
//! Coordinates the wallet session, network connectivity and password-gated
//! sensitive operations. All mutable state is owned by [`HomeController`]
//! and driven from a single `select!` loop, so every transition is applied
//! in arrival order; channels queue while a handler runs.
//!
//! - `session.rs` - session lifecycle and host shell signals
//! - `connectivity.rs` - connection state machine and dedup guard
//! - `password_gate.rs` - authorization of sensitive operations
//! - `keys.rs` - private key import/export pipeline
//! - `backup.rs` - wallet dump backup and restore
//! - `cache.rs` - balance/transaction display cache

pub mod backup;
pub mod cache;
pub mod connectivity;
pub mod keys;
pub mod password_gate;
mod session;

pub use session::wallet_password_hash;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::{CoreConfig, LocalConfig, WalletSettings};
use crate::events::{Command, Route, ShellAck, UiEvent};
use crate::market::MarketService;
use crate::network::{AccountEvent, ConnectionEvent, NetworkClient};
use crate::store::{DbMetadata, TxRecord, WalletStore};

use cache::DisplayCache;
use connectivity::{Connectivity, ConnectionStatus};
use password_gate::{Authorized, PasswordGate, SecurePassword, SensitiveOp};

/// The controller's collaborators, injected at construction.
pub struct Collaborators {
    pub store: Arc<dyn WalletStore>,
    pub network: Arc<dyn NetworkClient>,
    pub market: Arc<dyn MarketService>,
}

/// Live network subscriptions drained by the run loop. All `None` until a
/// connection is established.
#[derive(Default)]
struct Subscriptions {
    conn: Option<mpsc::UnboundedReceiver<ConnectionEvent>>,
    transactions: Option<mpsc::UnboundedReceiver<TxRecord>>,
    accounts: Option<mpsc::UnboundedReceiver<AccountEvent>>,
}

async fn next_event<T>(slot: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match slot.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

pub struct HomeController {
    store: Arc<dyn WalletStore>,
    network: Arc<dyn NetworkClient>,
    market: Arc<dyn MarketService>,
    local_config: LocalConfig,
    backup_dir: PathBuf,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    shell_ack_tx: mpsc::UnboundedSender<ShellAck>,
    settings: WalletSettings,
    current_wallet: Option<String>,
    db_metadata: Option<DbMetadata>,
    create_wallet_running: bool,
    quit_in_progress: bool,
    connectivity: Connectivity,
    gate: PasswordGate,
    cache: DisplayCache,
}

impl HomeController {
    pub fn new(
        collaborators: Collaborators,
        config: &CoreConfig,
        current_wallet: Option<String>,
        manual_disconnect: Arc<AtomicBool>,
        ui_tx: mpsc::UnboundedSender<UiEvent>,
        shell_ack_tx: mpsc::UnboundedSender<ShellAck>,
    ) -> Self {
        Self {
            store: collaborators.store,
            network: collaborators.network,
            market: collaborators.market,
            local_config: LocalConfig::new(config.config_dir.clone()),
            backup_dir: config.backup_dir.clone(),
            ui_tx,
            shell_ack_tx,
            settings: WalletSettings::default(),
            current_wallet,
            db_metadata: None,
            create_wallet_running: false,
            quit_in_progress: false,
            connectivity: Connectivity::with_flag(manual_disconnect),
            gate: PasswordGate::new(),
            cache: DisplayCache::default(),
        }
    }

    /// Subscribe to connection state before handing the controller to
    /// [`run`](Self::run).
    pub fn connection_updates(&self) -> watch::Receiver<ConnectionStatus> {
        self.connectivity.subscribe()
    }

    /// Drive the controller until the token fires or quit completes.
    ///
    /// This is the single writer of controller state; all event sources
    /// funnel through the loop below.
    pub async fn run(
        mut self,
        token: CancellationToken,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
        mut shell_rx: mpsc::UnboundedReceiver<crate::events::ShellSignal>,
    ) {
        let mut subs = Subscriptions::default();
        let mut open_rx = self.store.open_state();

        self.startup(&mut subs);
        let initial = *open_rx.borrow_and_update();
        if self.handle_open_state(initial) {
            return;
        }

        log::info!("home controller loop started");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    log::info!("home controller shutting down");
                    break;
                }

                Some(command) = command_rx.recv() => {
                    self.handle_command(command, &mut subs);
                }

                Some(signal) = shell_rx.recv() => {
                    self.handle_shell_signal(signal);
                }

                Ok(()) = open_rx.changed() => {
                    let state = *open_rx.borrow_and_update();
                    if self.handle_open_state(state) {
                        break;
                    }
                }

                event = next_event(&mut subs.conn), if subs.conn.is_some() => {
                    match event {
                        Some(ev) => self.handle_connection_event(ev, &mut subs),
                        None => subs.conn = None,
                    }
                }

                event = next_event(&mut subs.transactions), if subs.transactions.is_some() => {
                    match event {
                        Some(tx) => self.on_transaction_event(tx),
                        None => subs.transactions = None,
                    }
                }

                event = next_event(&mut subs.accounts), if subs.accounts.is_some() => {
                    match event {
                        Some(ev) => self.on_account_event(ev),
                        None => subs.accounts = None,
                    }
                }
            }
        }

        log::info!("home controller loop exited");
    }

    fn handle_command(&mut self, command: Command, subs: &mut Subscriptions) {
        log::debug!("command: {:?}", command);
        match command {
            Command::Connect => self.connect_network(subs),

            Command::Disconnect => {
                if self.connectivity.request_disconnect() {
                    self.network.disconnect();
                }
            }

            Command::ServerInfo => {
                self.send_ui(UiEvent::ServerInfo(self.network.current_server()));
            }

            Command::ImportPrivateKeys { file } => self.start_key_import(&file),

            Command::ExportPrivateKeys { dest_dir } => {
                self.request_authorization(SensitiveOp::ExportKeys { dest_dir });
            }

            Command::AddWallet { db_file } => {
                self.request_authorization(SensitiveOp::ImportWallet { db_file });
            }

            Command::BackupWallet { dest_dir } => self.backup_to(&dest_dir),

            Command::RestoreBackup { file } => self.restore_from(&file),

            Command::CreateWallet => self.create_session(),

            Command::CloseWallet => self.close_session(),

            Command::Quit => self.send_ui(UiEvent::QuitRequested),

            Command::SubmitPassword { password } => {
                self.on_password_submitted(password);
            }

            Command::CancelAuthorization => self.gate.cancel(),

            Command::SaveSettings { settings } => self.save_settings(settings),
        }
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    pub(crate) fn connect_network(&mut self, subs: &mut Subscriptions) {
        if self.connectivity.request_connect() {
            subs.conn = Some(self.network.connect());
        }
    }

    fn handle_connection_event(&mut self, event: ConnectionEvent, subs: &mut Subscriptions) {
        match event {
            ConnectionEvent::Connected => {
                let server = self.network.current_server();
                log::info!("connected to network: {:?}", server);
                self.connectivity.on_connected(server);
                subs.transactions = Some(self.network.transaction_stream());
                subs.accounts = Some(self.network.account_stream());
            }
            ConnectionEvent::Disconnected => {
                log::info!("disconnected from network");
                self.connectivity.on_disconnected();
                subs.transactions = None;
                subs.accounts = None;
            }
        }
    }

    fn on_transaction_event(&mut self, tx: TxRecord) {
        log::debug!("transaction event: {}", tx.tx_id);
        self.refresh_transactions();
    }

    fn on_account_event(&mut self, event: AccountEvent) {
        log::debug!("account event: {}", event.account_id);
        self.refresh_balance();
    }

    // ========================================================================
    // Sensitive operations
    // ========================================================================

    fn start_key_import(&mut self, file: &std::path::Path) {
        match keys::prepare_import(self.store.as_ref(), file) {
            Ok(batch) if batch.is_empty() => {
                self.send_ui(UiEvent::Info(
                    "There are no new keys to be imported from the selected file.".to_string(),
                ));
            }
            Ok(batch) => {
                let count = batch.len();
                match self.gate.request(SensitiveOp::ImportKeys { batch }) {
                    Ok(kind) => {
                        self.send_ui(UiEvent::KeyImportPrepared { count });
                        self.send_ui(UiEvent::PasswordRequired { operation: kind });
                    }
                    Err(err) => self.send_ui(UiEvent::AuthorizationFailed {
                        message: err.to_string(),
                    }),
                }
            }
            Err(err) => self.send_ui(UiEvent::Error(format!(
                "Could not read the key file: {}",
                err
            ))),
        }
    }

    fn request_authorization(&mut self, op: SensitiveOp) {
        match self.gate.request(op) {
            Ok(kind) => self.send_ui(UiEvent::PasswordRequired { operation: kind }),
            Err(err) => self.send_ui(UiEvent::AuthorizationFailed {
                message: err.to_string(),
            }),
        }
    }

    fn on_password_submitted(&mut self, password: SecurePassword) {
        match self.gate.verify(password, self.store.as_ref()) {
            Ok(authorized) => self.execute_sensitive(authorized),
            Err(err) => self.send_ui(UiEvent::AuthorizationFailed {
                message: err.to_string(),
            }),
        }
    }

    /// Execute a released operation. The verified password lives only for
    /// the duration of this call and is zeroed when it returns.
    fn execute_sensitive(&mut self, authorized: Authorized) {
        let Authorized {
            operation,
            password,
        } = authorized;

        match operation {
            SensitiveOp::ImportKeys { batch } => {
                match keys::import_batch(self.store.as_ref(), &batch, &password) {
                    Ok(count) => {
                        self.network.check_all_accounts();
                        self.send_ui(UiEvent::KeyImportCompleted { count });
                    }
                    Err(err) => self.send_ui(UiEvent::Error(format!(
                        "Key import failed: {}",
                        err
                    ))),
                }
            }

            SensitiveOp::ExportKeys { dest_dir } => {
                let Some(wallet_uuid) = self.current_wallet.clone() else {
                    self.send_ui(UiEvent::Error("No wallet session is open.".to_string()));
                    return;
                };
                match keys::export_all(self.store.as_ref(), &wallet_uuid, &dest_dir, &password) {
                    Ok(path) => {
                        self.send_ui(UiEvent::ExportCompleted { path });
                        self.send_ui(UiEvent::Info(
                            "Your private keys have been saved. Keep the file safe: it contains \
                             your decrypted private keys."
                                .to_string(),
                        ));
                    }
                    Err(err) => self.send_ui(UiEvent::Error(format!(
                        "Error saving private keys: {}",
                        err
                    ))),
                }
            }

            SensitiveOp::ImportWallet { db_file } => {
                if let Err(err) = self.import_wallet_record(&db_file, &password) {
                    self.send_ui(UiEvent::Error(format!("Wallet import failed: {}", err)));
                }
            }
        }
    }

    // ========================================================================
    // Backup / restore / settings
    // ========================================================================

    fn backup_to(&mut self, dest_dir: &std::path::Path) {
        let Some(wallet_uuid) = self.current_wallet.clone() else {
            self.send_ui(UiEvent::Error("No wallet session is open.".to_string()));
            return;
        };
        match backup::backup(self.store.as_ref(), &wallet_uuid, dest_dir) {
            Ok(path) => {
                self.send_ui(UiEvent::Info(format!(
                    "The backup has been successfully saved to: {}",
                    path.display()
                )));
                self.send_ui(UiEvent::BackupCompleted { path });
            }
            Err(err) => self.send_ui(UiEvent::Error(format!(
                "An error occurred creating the backup file: {}",
                err
            ))),
        }
    }

    fn restore_from(&mut self, file: &std::path::Path) {
        match backup::restore(self.store.as_ref(), file) {
            Ok(()) => {
                // Reopen the restored wallet through the normal login path.
                self.current_wallet = None;
                self.send_ui(UiEvent::NavigateTo(Route::Login));
            }
            Err(err) => self.send_ui(UiEvent::Error(format!(
                "An error occurred reading the backup file: {}",
                err
            ))),
        }
    }

    fn save_settings(&mut self, settings: WalletSettings) {
        if let Err(err) = self.local_config.save_settings(&settings) {
            self.send_ui(UiEvent::Error(format!("Could not save settings: {}", err)));
            return;
        }
        self.settings = settings;
        self.market.change_currency(&self.settings.fiat_currency);
        // The fiat value tracks the newly selected currency.
        self.refresh_balance();
    }

    // ========================================================================
    // Display cache
    // ========================================================================

    pub(crate) fn refresh_balance(&mut self) {
        match self
            .cache
            .refresh_balance(self.store.as_ref(), self.market.as_ref())
        {
            Ok(()) => self.send_ui(UiEvent::BalanceUpdated {
                balance_csc: self.cache.balance_csc.clone(),
                fiat_value: self.cache.fiat_value.clone(),
            }),
            Err(err) => log::error!("balance refresh failed: {}", err),
        }
    }

    pub(crate) fn refresh_transactions(&mut self) {
        self.cache.refresh_transactions(self.store.as_ref());
        self.send_ui(UiEvent::TransactionsUpdated {
            count: self.cache.transaction_count,
            last_transaction: self.cache.last_transaction,
        });
    }

    pub(crate) fn send_ui(&self, event: UiEvent) {
        let _ = self.ui_tx.send(event);
    }
}
