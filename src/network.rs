//! Network client boundary.
//!
//! The wire protocol to peers belongs to the collaborating network client;
//! the controller only consumes its event streams. Subscriptions are handed
//! out as mpsc receivers so the controller can drain them from its own
//! select loop. Transaction and account streams are lossless channels; a
//! missed item would leave the display cache stale until the next event.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::store::TxRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDefinition {
    pub server_id: String,
    pub server_url: String,
    pub response_time_ms: i64,
}

/// Connection lifecycle events reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
}

/// An account changed on-ledger; the balance display must be recomputed.
#[derive(Debug, Clone)]
pub struct AccountEvent {
    pub account_id: String,
}

pub trait NetworkClient: Send + Sync {
    /// Start connecting and subscribe to connection lifecycle events.
    fn connect(&self) -> mpsc::UnboundedReceiver<ConnectionEvent>;

    fn disconnect(&self);

    /// The server currently serving this client, if connected.
    fn current_server(&self) -> Option<ServerDefinition>;

    /// Subscribe to validated transactions touching wallet accounts.
    fn transaction_stream(&self) -> mpsc::UnboundedReceiver<TxRecord>;

    /// Subscribe to account state updates.
    fn account_stream(&self) -> mpsc::UnboundedReceiver<AccountEvent>;

    /// Ask the client to re-query every wallet account against the ledger.
    fn check_all_accounts(&self);
}

// ============================================================================
// Loopback client
// ============================================================================

struct LoopbackInner {
    conn_tx: Option<mpsc::UnboundedSender<ConnectionEvent>>,
    tx_tx: Option<mpsc::UnboundedSender<TxRecord>>,
    account_tx: Option<mpsc::UnboundedSender<AccountEvent>>,
    server: Option<ServerDefinition>,
}

/// In-process network client for the demo binary and the integration tests.
///
/// Reports a successful connection immediately and lets callers inject
/// transaction and account events. Honors the controller's manual-disconnect
/// flag the way a reconnecting client would: reconnect attempts are skipped
/// while the flag is set.
pub struct LoopbackNetwork {
    inner: Mutex<LoopbackInner>,
    manual_disconnect: Arc<AtomicBool>,
}

impl LoopbackNetwork {
    pub fn new(manual_disconnect: Arc<AtomicBool>) -> Self {
        Self {
            inner: Mutex::new(LoopbackInner {
                conn_tx: None,
                tx_tx: None,
                account_tx: None,
                server: None,
            }),
            manual_disconnect,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inject a validated transaction, as a connected peer would push it.
    pub fn emit_transaction(&self, tx: TxRecord) {
        if let Some(sender) = &self.lock().tx_tx {
            let _ = sender.send(tx);
        }
    }

    /// Inject an account update.
    pub fn emit_account_update(&self, account_id: &str) {
        if let Some(sender) = &self.lock().account_tx {
            let _ = sender.send(AccountEvent {
                account_id: account_id.to_string(),
            });
        }
    }

    /// Simulate a connection failure reported by the transport.
    pub fn emit_connection_lost(&self) {
        let mut inner = self.lock();
        inner.server = None;
        if let Some(sender) = &inner.conn_tx {
            let _ = sender.send(ConnectionEvent::Disconnected);
        }
    }

    /// Whether a reconnect attempt would currently be made.
    pub fn would_reconnect(&self) -> bool {
        !self.manual_disconnect.load(Ordering::SeqCst)
    }
}

impl NetworkClient for LoopbackNetwork {
    fn connect(&self) -> mpsc::UnboundedReceiver<ConnectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        inner.server = Some(ServerDefinition {
            server_id: "loopback".to_string(),
            server_url: "wss://localhost".to_string(),
            response_time_ms: 0,
        });
        let _ = tx.send(ConnectionEvent::Connected);
        inner.conn_tx = Some(tx);
        rx
    }

    fn disconnect(&self) {
        let mut inner = self.lock();
        inner.server = None;
        if let Some(sender) = inner.conn_tx.take() {
            let _ = sender.send(ConnectionEvent::Disconnected);
        }
        inner.tx_tx = None;
        inner.account_tx = None;
    }

    fn current_server(&self) -> Option<ServerDefinition> {
        self.lock().server.clone()
    }

    fn transaction_stream(&self) -> mpsc::UnboundedReceiver<TxRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().tx_tx = Some(tx);
        rx
    }

    fn account_stream(&self) -> mpsc::UnboundedReceiver<AccountEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().account_tx = Some(tx);
        rx
    }

    fn check_all_accounts(&self) {
        log::debug!("loopback: re-checking all accounts");
        let inner = self.lock();
        if let Some(sender) = &inner.account_tx {
            let _ = sender.send(AccountEvent {
                account_id: "*".to_string(),
            });
        }
    }
}
