//! Password-based entry encryption.
//!
//! Two schemes are supported, matching what common ZIP tools produce:
//!
//! - [`traditional`]: the original PKWARE stream cipher ("ZipCrypto").
//!   Weak, kept for compatibility with tools that only speak it.
//! - [`winzip_aes`]: WinZip AES (AE-1/AE-2) in three key-size tiers.

pub mod traditional;
pub mod winzip_aes;

use thiserror::Error;

/// Failure inside a cipher, mapped to archive errors by the entry codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Encrypted data is shorter than the scheme's fixed overhead
    #[error("encrypted data is truncated")]
    Truncated,
    /// Header check byte or password verifier did not match
    #[error("password check failed")]
    PasswordMismatch,
    /// WinZip AES authentication code did not match the ciphertext
    #[error("authentication code mismatch")]
    AuthenticationFailed,
    /// A derived key had an unexpected length
    #[error("invalid derived key length")]
    InvalidKeyLength,
}
