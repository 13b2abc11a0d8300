//! Event types for communication between the display layer, the host shell
//! and the controller task.
//!
//! These enums are the only interface between the synchronous UI (menus,
//! dialogs, file pickers) and the asynchronous controller. Menu entries and
//! dialog buttons map one-to-one onto [`Command`] variants; everything the
//! display needs to render flows back as [`UiEvent`]s.

use std::path::PathBuf;

use crate::config::WalletSettings;
use crate::home::password_gate::{SecurePassword, SensitiveKind};
use crate::network::ServerDefinition;

// ============================================================================
// UI → Controller
// ============================================================================

/// Commands sent from the display layer to the controller task.
///
/// File and directory paths are already resolved: the file-picker dialog is a
/// collaborator of the display layer, not of the core.
#[derive(Debug)]
pub enum Command {
    /// Connect to the network.
    Connect,

    /// Disconnect from the network (manual, suppresses auto-reconnect).
    Disconnect,

    /// Show information about the currently connected server.
    ServerInfo,

    /// Parse a key file and, if it holds new keys, gate an import.
    ImportPrivateKeys { file: PathBuf },

    /// Export all private keys to the chosen directory, after authorization.
    ExportPrivateKeys { dest_dir: PathBuf },

    /// Write a wallet dump to the chosen directory.
    BackupWallet { dest_dir: PathBuf },

    /// Load a wallet dump and reopen through the login flow.
    RestoreBackup { file: PathBuf },

    /// Register an external wallet database file, after authorization.
    AddWallet { db_file: PathBuf },

    /// Close the current wallet and hand off to the wallet setup flow.
    CreateWallet,

    /// Close the current wallet and return to login.
    CloseWallet,

    /// Ask the host shell to quit the application.
    Quit,

    /// Password entered into the authorization dialog. The buffer redacts
    /// its debug output and zeroes itself on drop.
    SubmitPassword { password: SecurePassword },

    /// Authorization dialog dismissed; the pending operation is discarded.
    CancelAuthorization,

    /// Persist changed wallet settings.
    SaveSettings { settings: WalletSettings },
}

/// Navigation targets of the hosting application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    WalletSetup,
    Transactions,
}

// ============================================================================
// Controller → UI
// ============================================================================

/// Events sent from the controller task back to the display layer.
///
/// Delivered over an unbounded mpsc channel in emission order; none of these
/// may be dropped. Connection state is additionally published on a coalescing
/// watch channel, see [`crate::home::connectivity`].
#[derive(Debug)]
pub enum UiEvent {
    NavigateTo(Route),

    /// Recomputed balance display values.
    BalanceUpdated {
        balance_csc: String,
        fiat_value: Option<String>,
    },

    /// Recomputed transaction display values.
    TransactionsUpdated {
        count: u64,
        last_transaction: Option<i64>,
    },

    /// Fiat currencies available for the settings dialog.
    FiatCurrencies(Vec<String>),

    /// A sensitive operation is armed and waits for a password.
    PasswordRequired { operation: SensitiveKind },

    /// Password check failed; the footer error region becomes visible.
    AuthorizationFailed { message: String },

    /// A key file was parsed and new keys await confirmation.
    KeyImportPrepared { count: usize },

    /// Gated key import finished.
    KeyImportCompleted { count: usize },

    /// Key export finished; the file contains decrypted keys.
    ExportCompleted { path: PathBuf },

    /// Wallet dump written.
    BackupCompleted { path: PathBuf },

    /// Current server details for the server info dialog.
    ServerInfo(Option<ServerDefinition>),

    /// Forward to the host shell: the user asked to quit.
    QuitRequested,

    /// Informational message (growl/toast).
    Info(String),

    /// Non-fatal error to display.
    Error(String),
}

// ============================================================================
// Host shell ↔ Controller
// ============================================================================

/// Lifecycle signals delivered by the hosting shell over its messaging
/// channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellSignal {
    /// The machine is suspending; the wallet must be closed.
    Suspend,

    /// The application is quitting; backup and close, then acknowledge.
    Quit,
}

/// Acknowledgements sent back to the hosting shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAck {
    /// Quit-time backup and close finished; teardown may proceed.
    WalletClosed,
}
