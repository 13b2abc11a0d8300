use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletCoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session state inconsistent: {0}")]
    StateInconsistency(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Market error: {0}")]
    Market(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of the password gate. All variants are recoverable: the pending
/// operation stays armed and the user may retry or cancel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Please enter your password.")]
    EmptyPassword,

    #[error("You entered an invalid password.")]
    WrongPassword,

    #[error("Another operation is already awaiting authorization.")]
    AuthorizationPending,

    #[error("No operation is awaiting authorization.")]
    NothingPending,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}
