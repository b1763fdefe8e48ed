//! # healthdid crypto
//!
//! Key material and encryption for health profiles.
//!
//! - [`Wallet`]: a P-256 signing key standing in for the user's wallet. Its [`WalletAddress`] is
//!   derived from the public key.
//! - [`AuthSig`]: a signed, expiring sign-in message proving control of a wallet.
//! - [`AccessPolicy`]: access control conditions deciding which wallets may decrypt.
//! - [`Encryptor`]: encrypts a serialized profile under a policy; [`LocalKeyEncryptor`] is the
//!   offline implementation (XChaCha20-Poly1305 keyed from a local master key).

mod address;
mod auth;
mod conditions;
mod encryptor;
mod wallet;

pub use address::WalletAddress;
pub use auth::{AuthSig, SignedMessage, DEFAULT_AUTH_TTL_HOURS};
pub use conditions::{
    AccessControlCondition, AccessPolicy, BooleanOperator, ConditionEntry, OperatorEntryWire,
    ReturnValueTest,
};
pub use encryptor::{EncryptedBlob, Encryptor, LocalKeyEncryptor, MasterKey};
pub use wallet::Wallet;

use chrono::{DateTime, Utc};

/// Errors raised by key handling, signature checks and encryption.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("failed to parse private key: {0}")]
    PrivateKey(String),

    #[error("malformed auth signature: {0}")]
    MalformedAuthSig(String),

    #[error("auth signature does not verify")]
    BadSignature,

    #[error("auth signature claims {claimed} but its key derives {derived}")]
    AddressMismatch {
        claimed: WalletAddress,
        derived: WalletAddress,
    },

    #[error("auth signature expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("unsupported access control condition: {0}")]
    UnsupportedCondition(String),

    #[error("access control conditions are malformed: {0}")]
    MalformedPolicy(String),

    #[error("wallet {0} does not satisfy the access control conditions")]
    AccessDenied(WalletAddress),

    #[error("invalid master key: {0}")]
    InvalidMasterKey(String),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: ciphertext or conditions were altered")]
    Decrypt,

    #[error("decrypted data hash {actual} does not match expected {expected}")]
    HashMismatch { expected: String, actual: String },

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
