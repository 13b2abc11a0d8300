//! Password gate for sensitive operations.
//!
//! One operation at a time may wait behind the gate. Verification delegates
//! to the wallet store's hash check; on success the operation is released
//! exactly once, together with the verified password in a zeroize-on-drop
//! guard. Every exit path, including failures and cancellation, leaves no
//! plaintext password behind.

use std::fmt;
use std::path::PathBuf;
use zeroize::ZeroizeOnDrop;

use crate::error::AuthError;
use crate::home::keys::KeyImportBatch;
use crate::store::WalletStore;

/// Password buffer that zeroes its memory on drop.
#[derive(ZeroizeOnDrop)]
pub struct SecurePassword(String);

impl SecurePassword {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecurePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurePassword(***)")
    }
}

/// An operation waiting for password authorization.
#[derive(Debug)]
pub enum SensitiveOp {
    ImportKeys { batch: KeyImportBatch },
    ExportKeys { dest_dir: PathBuf },
    ImportWallet { db_file: PathBuf },
}

impl SensitiveOp {
    pub fn kind(&self) -> SensitiveKind {
        match self {
            SensitiveOp::ImportKeys { .. } => SensitiveKind::ImportKeys,
            SensitiveOp::ExportKeys { .. } => SensitiveKind::ExportKeys,
            SensitiveOp::ImportWallet { .. } => SensitiveKind::ImportWallet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveKind {
    ImportKeys,
    ExportKeys,
    ImportWallet,
}

/// A released operation plus the password that authorized it. The password
/// dies with this value at the end of the executing scope.
#[derive(Debug)]
pub struct Authorized {
    pub operation: SensitiveOp,
    pub password: SecurePassword,
}

pub struct PasswordGate {
    pending: Option<SensitiveOp>,
    error_message: Option<String>,
    footer_visible: bool,
}

impl PasswordGate {
    pub fn new() -> Self {
        Self {
            pending: None,
            error_message: None,
            footer_visible: false,
        }
    }

    /// Arm the gate with an operation, clearing stale error state. A second
    /// request while one is pending is rejected, never silently replaced.
    pub fn request(&mut self, op: SensitiveOp) -> Result<SensitiveKind, AuthError> {
        if self.pending.is_some() {
            return Err(AuthError::AuthorizationPending);
        }
        self.error_message = None;
        self.footer_visible = false;
        let kind = op.kind();
        self.pending = Some(op);
        Ok(kind)
    }

    /// Discard the pending operation without invoking it.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.error_message = None;
        self.footer_visible = false;
    }

    /// Check the password against the store's hash. Failure keeps the
    /// operation pending for a retry and records a user-visible message;
    /// success releases it exactly once.
    pub fn verify(
        &mut self,
        password: SecurePassword,
        store: &dyn WalletStore,
    ) -> Result<Authorized, AuthError> {
        if password.is_empty() {
            return Err(self.fail(AuthError::EmptyPassword));
        }
        if self.pending.is_none() {
            return Err(self.fail(AuthError::NothingPending));
        }
        if !store.check_password_hash(password.as_str()) {
            return Err(self.fail(AuthError::WrongPassword));
        }

        self.error_message = None;
        self.footer_visible = false;
        let operation = self
            .pending
            .take()
            .ok_or(AuthError::NothingPending)?;
        Ok(Authorized {
            operation,
            password,
        })
    }

    fn fail(&mut self, err: AuthError) -> AuthError {
        self.error_message = Some(err.to_string());
        self.footer_visible = true;
        err
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn footer_visible(&self) -> bool {
        self.footer_visible
    }
}

impl Default for PasswordGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryWalletStore;

    fn export_op() -> SensitiveOp {
        SensitiveOp::ExportKeys {
            dest_dir: PathBuf::from("/tmp"),
        }
    }

    fn store() -> MemoryWalletStore {
        MemoryWalletStore::new("w", "secret", "/tmp").unwrap()
    }

    #[test]
    fn test_empty_password_rejected() {
        let store = store();
        let mut gate = PasswordGate::new();
        gate.request(export_op()).unwrap();

        let err = gate
            .verify(SecurePassword::new(String::new()), &store)
            .unwrap_err();
        assert_eq!(err, AuthError::EmptyPassword);
        assert!(gate.has_pending());
        assert!(gate.footer_visible());
    }

    #[test]
    fn test_wrong_password_keeps_operation_pending() {
        let store = store();
        let mut gate = PasswordGate::new();
        gate.request(export_op()).unwrap();

        let err = gate
            .verify(SecurePassword::new("nope".to_string()), &store)
            .unwrap_err();
        assert_eq!(err, AuthError::WrongPassword);
        assert!(gate.has_pending());
        assert_eq!(
            gate.error_message(),
            Some("You entered an invalid password.")
        );
    }

    #[test]
    fn test_correct_password_releases_exactly_once() {
        let store = store();
        let mut gate = PasswordGate::new();
        gate.request(export_op()).unwrap();

        let authorized = gate
            .verify(SecurePassword::new("secret".to_string()), &store)
            .unwrap();
        assert_eq!(authorized.operation.kind(), SensitiveKind::ExportKeys);
        assert!(!gate.has_pending());
        assert!(!gate.footer_visible());

        // The slot is empty now; a second verification finds nothing.
        let err = gate
            .verify(SecurePassword::new("secret".to_string()), &store)
            .unwrap_err();
        assert_eq!(err, AuthError::NothingPending);
    }

    #[test]
    fn test_concurrent_request_rejected() {
        let mut gate = PasswordGate::new();
        gate.request(export_op()).unwrap();

        let err = gate.request(export_op()).unwrap_err();
        assert_eq!(err, AuthError::AuthorizationPending);
        assert!(gate.has_pending());
    }

    #[test]
    fn test_request_clears_stale_error_state() {
        let store = store();
        let mut gate = PasswordGate::new();
        gate.request(export_op()).unwrap();
        let _ = gate.verify(SecurePassword::new("nope".to_string()), &store);
        gate.cancel();

        gate.request(export_op()).unwrap();
        assert_eq!(gate.error_message(), None);
        assert!(!gate.footer_visible());
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut gate = PasswordGate::new();
        gate.request(export_op()).unwrap();
        gate.cancel();
        assert!(!gate.has_pending());
    }
}
