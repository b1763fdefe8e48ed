use crate::{RegistryError, RegistryResult};
use healthdid_crypto::WalletAddress;
use serde::{Deserialize, Serialize};

/// Reputation every new DID starts with.
pub const INITIAL_REPUTATION_SCORE: u8 = 10;

/// A registry entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDid {
    pub owner: WalletAddress,
    pub delegate_addresses: Vec<WalletAddress>,
    pub health_did: String,
    pub ipfs_uri: String,
    pub alt_ipfs_uris: Vec<String>,
    pub reputation_score: u8,
    pub has_world_id: bool,
    pub has_polygon_id: bool,
    pub has_social_id: bool,
}

impl HealthDid {
    pub(crate) fn new(owner: WalletAddress, health_did: &str, uri: &str) -> Self {
        Self {
            owner,
            delegate_addresses: Vec::new(),
            health_did: health_did.to_owned(),
            ipfs_uri: uri.to_owned(),
            alt_ipfs_uris: Vec::new(),
            reputation_score: INITIAL_REPUTATION_SCORE,
            has_world_id: false,
            has_polygon_id: false,
            has_social_id: false,
        }
    }

    pub fn is_delegate(&self, address: &WalletAddress) -> bool {
        self.delegate_addresses.contains(address)
    }
}

/// Outcome of a registry write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// `0x`-prefixed hex digest identifying the write.
    pub tx_hash: String,
    pub block_number: u64,
    /// Registry method name, e.g. `register_did`.
    pub method: String,
    pub confirmations: u64,
}

/// Reads the chain id from the first six characters of a registry id.
///
/// # Errors
///
/// [`RegistryError::InvalidDid`] if the id is shorter than six bytes or any of the first six
/// is not an ASCII digit.
pub fn resolve_chain_id(health_did: &str) -> RegistryResult<u64> {
    let bytes = health_did.as_bytes();
    if bytes.len() < 6 {
        return Err(RegistryError::InvalidDid {
            did: health_did.to_owned(),
            reason: "Input string too short",
        });
    }

    bytes[..6].iter().try_fold(0u64, |acc, &b| {
        if b.is_ascii_digit() {
            Ok(acc * 10 + u64::from(b - b'0'))
        } else {
            Err(RegistryError::InvalidDid {
                did: health_did.to_owned(),
                reason: "Not a valid number",
            })
        }
    })
}
