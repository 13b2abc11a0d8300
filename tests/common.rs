//! Shared test infrastructure for controller integration tests.
//!
//! Provides a fully wired controller harness: memory store, loopback
//! network, scripted market service and temp-dir config storage, plus
//! helpers for awaiting UI events with a timeout.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use csc_wallet::config::{CoreConfig, KnownWallet, LocalConfig};
use csc_wallet::events::{Command, ShellAck, ShellSignal, UiEvent};
use csc_wallet::home::connectivity::ConnectionStatus;
use csc_wallet::home::password_gate::SecurePassword;
use csc_wallet::home::wallet_password_hash;
use csc_wallet::market::{CoinMarketInfo, MarketService};
use csc_wallet::network::LoopbackNetwork;
use csc_wallet::store::MemoryWalletStore;
use csc_wallet::{Collaborators, HomeController};

pub const WALLET_UUID: &str = "wallet-1";
pub const PASSWORD: &str = "hunter2";

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Market service with a scripted price.
pub struct FixedMarketService {
    price: Mutex<Option<CoinMarketInfo>>,
}

impl FixedMarketService {
    pub fn new(price: Option<CoinMarketInfo>) -> Self {
        Self {
            price: Mutex::new(price),
        }
    }

    pub fn set_price(&self, price: Option<CoinMarketInfo>) {
        *self.price.lock().unwrap() = price;
    }
}

impl MarketService for FixedMarketService {
    fn fiat_currencies(&self) -> Vec<String> {
        vec!["USD".to_string(), "EUR".to_string()]
    }

    fn change_currency(&self, _code: &str) {}

    fn current_price(&self) -> Option<CoinMarketInfo> {
        self.price.lock().unwrap().clone()
    }
}

pub struct Harness {
    pub store: Arc<MemoryWalletStore>,
    pub network: Arc<LoopbackNetwork>,
    pub market: Arc<FixedMarketService>,
    pub command_tx: mpsc::UnboundedSender<Command>,
    pub shell_tx: mpsc::UnboundedSender<ShellSignal>,
    pub ui_rx: mpsc::UnboundedReceiver<UiEvent>,
    pub ack_rx: mpsc::UnboundedReceiver<ShellAck>,
    pub connection_rx: watch::Receiver<ConnectionStatus>,
    pub token: CancellationToken,
    pub handle: JoinHandle<()>,
    pub config: CoreConfig,
    // Held for cleanup.
    _config_dir: TempDir,
}

pub struct HarnessOptions {
    /// Session id handed to the controller at start.
    pub current_wallet: Option<String>,
    /// Register the wallet in the known-wallet list.
    pub register_wallet: bool,
    /// Mark the store loaded before the controller starts.
    pub open_store: bool,
    pub price: Option<CoinMarketInfo>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            current_wallet: Some(WALLET_UUID.to_string()),
            register_wallet: true,
            open_store: true,
            price: None,
        }
    }
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(HarnessOptions::default()).await
    }

    pub async fn start_with(options: HarnessOptions) -> Self {
        init_logging();

        let config_dir = TempDir::new().expect("temp dir");
        let config = CoreConfig {
            config_dir: config_dir.path().to_path_buf(),
            backup_dir: config_dir.path().join("backups"),
            market_url: "http://localhost:0".to_string(),
        };

        if options.register_wallet {
            let local = LocalConfig::new(config.config_dir.clone());
            let password = SecurePassword::new(PASSWORD.to_string());
            local
                .add_known_wallet(KnownWallet {
                    hash: wallet_password_hash(WALLET_UUID, &password).expect("hash"),
                    wallet_uuid: WALLET_UUID.to_string(),
                    imported_date: chrono::Utc::now(),
                    location: config_dir.path().display().to_string(),
                })
                .expect("register wallet");
        }

        let store = Arc::new(
            MemoryWalletStore::new(
                WALLET_UUID,
                PASSWORD,
                &config_dir.path().display().to_string(),
            )
            .expect("store"),
        );
        if options.open_store {
            store.open();
        }

        let manual_flag = Arc::new(AtomicBool::new(false));
        let network = Arc::new(LoopbackNetwork::new(Arc::clone(&manual_flag)));
        let market = Arc::new(FixedMarketService::new(options.price));

        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shell_tx, shell_rx) = mpsc::unbounded_channel();

        let controller = HomeController::new(
            Collaborators {
                store: store.clone(),
                network: network.clone(),
                market: market.clone(),
            },
            &config,
            options.current_wallet,
            manual_flag,
            ui_tx,
            ack_tx,
        );
        let connection_rx = controller.connection_updates();

        let token = CancellationToken::new();
        let handle = tokio::spawn(controller.run(token.clone(), command_rx, shell_rx));

        Self {
            store,
            network,
            market,
            command_tx,
            shell_tx,
            ui_rx,
            ack_rx,
            connection_rx,
            token,
            handle,
            config,
            _config_dir: config_dir,
        }
    }

    pub fn send(&self, command: Command) {
        self.command_tx.send(command).expect("controller alive");
    }

    pub fn submit_password(&self, password: &str) {
        self.send(Command::SubmitPassword {
            password: SecurePassword::new(password.to_string()),
        });
    }

    /// Next UI event, or panic after the timeout.
    pub async fn next_ui(&mut self) -> UiEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.ui_rx.recv())
            .await
            .expect("timed out waiting for ui event")
            .expect("ui channel closed")
    }

    /// Drain UI events until one matches, or panic after the timeout.
    pub async fn wait_for<F>(&mut self, mut matches: F) -> UiEvent
    where
        F: FnMut(&UiEvent) -> bool,
    {
        loop {
            let event = self.next_ui().await;
            if matches(&event) {
                return event;
            }
        }
    }

    /// Assert no matching UI event arrives within a short window.
    pub async fn assert_no_ui<F>(&mut self, mut matches: F)
    where
        F: FnMut(&UiEvent) -> bool,
    {
        let deadline = tokio::time::sleep(Duration::from_millis(200));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => return,
                event = self.ui_rx.recv() => {
                    match event {
                        Some(event) if matches(&event) => {
                            panic!("unexpected ui event: {:?}", event)
                        }
                        Some(_) => continue,
                        None => return,
                    }
                }
            }
        }
    }

    /// Wait until the published connection state satisfies the predicate.
    pub async fn wait_for_connection<F>(&mut self, mut matches: F) -> ConnectionStatus
    where
        F: FnMut(&ConnectionStatus) -> bool,
    {
        let result = tokio::time::timeout(EVENT_TIMEOUT, async {
            loop {
                if matches(&self.connection_rx.borrow()) {
                    return self.connection_rx.borrow().clone();
                }
                if self.connection_rx.changed().await.is_err() {
                    panic!("connection channel closed");
                }
            }
        })
        .await;
        result.expect("timed out waiting for connection state")
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
