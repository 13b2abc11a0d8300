use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use csc_wallet::config::{CoreConfig, KnownWallet, LocalConfig};
use csc_wallet::events::{Command, ShellAck, ShellSignal, UiEvent};
use csc_wallet::home::password_gate::SecurePassword;
use csc_wallet::home::wallet_password_hash;
use csc_wallet::market::HttpMarketService;
use csc_wallet::network::LoopbackNetwork;
use csc_wallet::store::MemoryWalletStore;
use csc_wallet::{Collaborators, HomeController};

/// Demo session: an in-memory wallet driven through one connect, a balance
/// refresh and a quit-time backup. Real deployments replace the loopback
/// collaborators with live ones.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = CoreConfig::from_env();
    let wallet_uuid = uuid::Uuid::new_v4().to_string();
    let password = SecurePassword::new("demo-password".to_string());

    let local = LocalConfig::new(config.config_dir.clone());
    local.add_known_wallet(KnownWallet {
        hash: wallet_password_hash(&wallet_uuid, &password)?,
        wallet_uuid: wallet_uuid.clone(),
        imported_date: chrono::Utc::now(),
        location: config.config_dir.display().to_string(),
    })?;

    let store = Arc::new(MemoryWalletStore::new(
        &wallet_uuid,
        password.as_str(),
        &config.config_dir.display().to_string(),
    )?);
    store.set_balance("100000000");
    store.open();

    let manual_flag = Arc::new(AtomicBool::new(false));
    let network = Arc::new(LoopbackNetwork::new(Arc::clone(&manual_flag)));
    let market = Arc::new(HttpMarketService::new(config.market_url.clone()));

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (ack_tx, mut ack_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (shell_tx, shell_rx) = mpsc::unbounded_channel();

    let controller = HomeController::new(
        Collaborators {
            store: store.clone(),
            network: network.clone(),
            market: market.clone(),
        },
        &config,
        Some(wallet_uuid),
        manual_flag,
        ui_tx,
        ack_tx,
    );

    let token = CancellationToken::new();
    let controller_handle = tokio::spawn(controller.run(token.clone(), command_rx, shell_rx));

    let ui_handle = tokio::spawn(async move {
        while let Some(event) = ui_rx.recv().await {
            log::info!("ui event: {:?}", event);
            if matches!(event, UiEvent::QuitRequested) {
                break;
            }
        }
    });

    // Market data is optional; a failed fetch only logs.
    if let Err(err) = market.refresh().await {
        log::warn!("market refresh failed: {}", err);
    }
    network.emit_account_update("demo-account");

    command_tx.send(Command::Quit)?;
    shell_tx.send(ShellSignal::Quit)?;

    match ack_rx.recv().await {
        Some(ShellAck::WalletClosed) => log::info!("wallet closed, exiting"),
        None => log::warn!("controller exited without acknowledging quit"),
    }

    token.cancel();
    let _ = controller_handle.await;
    let _ = ui_handle.await;
    Ok(())
}
