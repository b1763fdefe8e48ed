//! # healthdid registry
//!
//! The registry maps a health DID's registry id (six-digit chain prefix plus suffix, e.g.
//! `000005sarah`) to a [`HealthDid`] entry holding the owner's wallet address and the URI of
//! the encrypted profile.
//!
//! [`DidRegistry`] states the contract: a DID can be registered once, only on the chain its
//! prefix names, and only its owner may change it afterwards. [`LocalRegistry`] implements it
//! over a YAML ledger file.

mod did;
mod local;

pub use did::{resolve_chain_id, HealthDid, TxReceipt, INITIAL_REPUTATION_SCORE};
pub use local::LocalRegistry;

use healthdid_crypto::WalletAddress;
use healthdid_types::ChainId;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("DID already exists: {0}")]
    AlreadyExists(String),

    #[error("DID not found: {0}")]
    NotFound(String),

    #[error("{sender} is not the owner of {health_did}")]
    Unauthorized {
        sender: WalletAddress,
        health_did: String,
    },

    #[error("Incorrect Chain Id in DID: expected {expected}, found {found}")]
    IncorrectChainId { expected: u64, found: u64 },

    #[error("invalid DID '{did}': {reason}")]
    InvalidDid { did: String, reason: &'static str },

    #[error("This address isn't a delegate address: {0}")]
    NotDelegate(WalletAddress),

    #[error("Cannot transfer ownership to existing owner")]
    TransferToSelf,

    #[error("ledger belongs to chain {ledger}, registry configured for {configured}")]
    LedgerChainMismatch { ledger: ChainId, configured: ChainId },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid ledger YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry of health DIDs.
///
/// Every write takes the authenticated `sender` and returns a [`TxReceipt`]. A failed write
/// leaves the registry unchanged.
pub trait DidRegistry {
    /// Chain the registry accepts DIDs for.
    fn chain_id(&self) -> ChainId;

    /// Creates the entry for `health_did` owned by `sender`.
    ///
    /// Fails if the DID exists or its first six characters are not the registry's chain id.
    fn register_did(
        &self,
        sender: &WalletAddress,
        health_did: &str,
        uri: &str,
    ) -> RegistryResult<TxReceipt>;

    /// Replaces the primary URI. Owner only.
    fn update_did_data(
        &self,
        sender: &WalletAddress,
        health_did: &str,
        uri: &str,
    ) -> RegistryResult<TxReceipt>;

    /// Appends alternate URIs. Owner only.
    fn add_alt_data(
        &self,
        sender: &WalletAddress,
        health_did: &str,
        uris: &[String],
    ) -> RegistryResult<TxReceipt>;

    /// Owner only.
    fn add_delegate_address(
        &self,
        sender: &WalletAddress,
        peer: &WalletAddress,
        health_did: &str,
    ) -> RegistryResult<TxReceipt>;

    /// Owner only. Fails if `peer` is not a delegate.
    fn remove_delegate_address(
        &self,
        sender: &WalletAddress,
        peer: &WalletAddress,
        health_did: &str,
    ) -> RegistryResult<TxReceipt>;

    /// Owner only. Fails when `new_owner` is already the owner.
    fn transfer_ownership(
        &self,
        sender: &WalletAddress,
        new_owner: &WalletAddress,
        health_did: &str,
    ) -> RegistryResult<TxReceipt>;

    fn get_health_did(&self, health_did: &str) -> RegistryResult<HealthDid>;
}
