//! Connection state machine.
//!
//! Owns the `Disconnected -> Connecting -> Connected` lifecycle, the dedup
//! guard against repeated identical menu commands, and the manual-disconnect
//! flag read by the network client's reconnect logic. State is published on
//! a watch channel; observers only ever need the latest value, so coalescing
//! is safe here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::network::ServerDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Published connection state. `current_server` is set only while
/// `Connected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub current_server: Option<ServerDefinition>,
}

impl ConnectionStatus {
    fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            current_server: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// The last applied connect/disconnect menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionCommand {
    Connect,
    Disconnect,
}

/// Visibility of the connection menu entries, derived from connectedness.
/// "Connect" is the exact inverse of "Disconnect"/"Server Information".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuVisibility {
    pub connect: bool,
    pub disconnect: bool,
    pub server_info: bool,
}

impl MenuVisibility {
    pub fn from_connected(connected: bool) -> Self {
        Self {
            connect: !connected,
            disconnect: connected,
            server_info: connected,
        }
    }
}

pub struct Connectivity {
    status_tx: watch::Sender<ConnectionStatus>,
    last_command: Option<ConnectionCommand>,
    manual_disconnect: Arc<AtomicBool>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::with_flag(Arc::new(AtomicBool::new(false)))
    }

    /// Build around an externally shared manual-disconnect flag, so the
    /// network client can read it.
    pub fn with_flag(manual_disconnect: Arc<AtomicBool>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::disconnected());
        Self {
            status_tx,
            last_command: None,
            manual_disconnect,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status_tx.borrow().clone()
    }

    /// Shared flag handed to the network client so its reconnect logic can
    /// tell user-initiated disconnects from failures.
    pub fn manual_disconnect_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.manual_disconnect)
    }

    /// Apply a connect menu command. Returns false when the guard suppresses
    /// it as a repeat of the last applied command.
    pub fn request_connect(&mut self) -> bool {
        if self.last_command == Some(ConnectionCommand::Connect) {
            log::debug!("duplicate connect command suppressed");
            return false;
        }
        self.last_command = Some(ConnectionCommand::Connect);
        self.manual_disconnect.store(false, Ordering::SeqCst);
        self.publish(ConnectionState::Connecting, None);
        true
    }

    /// Apply a disconnect menu command, marking it as user-initiated.
    /// Returns false when deduplicated.
    pub fn request_disconnect(&mut self) -> bool {
        if self.last_command == Some(ConnectionCommand::Disconnect) {
            log::debug!("duplicate disconnect command suppressed");
            return false;
        }
        self.last_command = Some(ConnectionCommand::Disconnect);
        self.manual_disconnect.store(true, Ordering::SeqCst);
        true
    }

    /// The network client reported a live connection.
    pub fn on_connected(&mut self, server: Option<ServerDefinition>) {
        self.publish(ConnectionState::Connected, server);
    }

    /// The network client reported the connection gone, whether by request
    /// or by failure. Does not touch the dedup guard: only menu commands do.
    pub fn on_disconnected(&mut self) {
        self.publish(ConnectionState::Disconnected, None);
    }

    fn publish(&self, state: ConnectionState, server: Option<ServerDefinition>) {
        // Keep the invariant: a server is only exposed while connected.
        let current_server = match state {
            ConnectionState::Connected => server,
            _ => None,
        };
        self.status_tx.send_replace(ConnectionStatus {
            state,
            current_server,
        });
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}
