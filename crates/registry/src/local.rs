//! File-backed registry.
//!
//! The whole ledger is one YAML document. Each write clones the in-memory ledger, applies the
//! change to the clone, persists it and only then replaces the in-memory copy, so a rejected
//! or failed write leaves both untouched.

use crate::did::{resolve_chain_id, HealthDid, TxReceipt};
use crate::{DidRegistry, RegistryError, RegistryResult};
use healthdid_crypto::WalletAddress;
use healthdid_types::ChainId;
use healthdid_uuid::Sha256Hash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Ledger {
    chain_id: ChainId,
    block_number: u64,
    dids: BTreeMap<String, HealthDid>,
}

/// [`DidRegistry`] persisted to a YAML ledger.
#[derive(Debug)]
pub struct LocalRegistry {
    path: PathBuf,
    chain_id: ChainId,
    confirmations: u64,
    ledger: Mutex<Ledger>,
}

impl LocalRegistry {
    /// Opens the ledger at `path`, creating an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::LedgerChainMismatch`] if the ledger was created for another chain.
    /// - [`RegistryError::Io`] or [`RegistryError::Yaml`] if the ledger cannot be read.
    pub fn open(path: &Path, chain_id: ChainId, confirmations: u64) -> RegistryResult<Self> {
        let ledger = if path.exists() {
            let text = fs::read_to_string(path)?;
            let ledger: Ledger = serde_yaml::from_str(&text)?;
            if ledger.chain_id != chain_id {
                return Err(RegistryError::LedgerChainMismatch {
                    ledger: ledger.chain_id,
                    configured: chain_id,
                });
            }
            tracing::debug!(
                "opened registry ledger {} with {} DIDs",
                path.display(),
                ledger.dids.len()
            );
            ledger
        } else {
            let ledger = Ledger {
                chain_id,
                block_number: 0,
                dids: BTreeMap::new(),
            };
            persist(path, &ledger)?;
            tracing::info!("created registry ledger {} for chain {}", path.display(), chain_id);
            ledger
        };

        Ok(Self {
            path: path.to_path_buf(),
            chain_id,
            confirmations,
            ledger: Mutex::new(ledger),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `change` to the entry for `health_did` on behalf of its owner.
    fn write_owned<F>(
        &self,
        method: &str,
        sender: &WalletAddress,
        health_did: &str,
        change: F,
    ) -> RegistryResult<TxReceipt>
    where
        F: FnOnce(&mut HealthDid) -> RegistryResult<()>,
    {
        self.commit(method, sender, health_did, |dids| {
            let entry = dids
                .get_mut(health_did)
                .ok_or_else(|| RegistryError::NotFound(health_did.to_owned()))?;
            if &entry.owner != sender {
                return Err(RegistryError::Unauthorized {
                    sender: sender.clone(),
                    health_did: health_did.to_owned(),
                });
            }
            change(entry)
        })
    }

    fn commit<F>(
        &self,
        method: &str,
        sender: &WalletAddress,
        health_did: &str,
        change: F,
    ) -> RegistryResult<TxReceipt>
    where
        F: FnOnce(&mut BTreeMap<String, HealthDid>) -> RegistryResult<()>,
    {
        let mut guard = self.lock();
        let mut next = guard.clone();
        change(&mut next.dids)?;
        next.block_number += 1;
        persist(&self.path, &next)?;

        let receipt = TxReceipt {
            tx_hash: tx_hash(self.chain_id, next.block_number, method, sender, health_did),
            block_number: next.block_number,
            method: method.to_owned(),
            confirmations: self.confirmations,
        };
        *guard = next;

        tracing::info!(
            "{} {} by {} in block {}",
            method,
            health_did,
            sender,
            receipt.block_number
        );
        Ok(receipt)
    }
}

impl DidRegistry for LocalRegistry {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn register_did(
        &self,
        sender: &WalletAddress,
        health_did: &str,
        uri: &str,
    ) -> RegistryResult<TxReceipt> {
        let found = resolve_chain_id(health_did)?;
        if found != self.chain_id.get() {
            return Err(RegistryError::IncorrectChainId {
                expected: self.chain_id.get(),
                found,
            });
        }

        self.commit("register_did", sender, health_did, |dids| {
            if dids.contains_key(health_did) {
                return Err(RegistryError::AlreadyExists(health_did.to_owned()));
            }
            dids.insert(
                health_did.to_owned(),
                HealthDid::new(sender.clone(), health_did, uri),
            );
            Ok(())
        })
    }

    fn update_did_data(
        &self,
        sender: &WalletAddress,
        health_did: &str,
        uri: &str,
    ) -> RegistryResult<TxReceipt> {
        self.write_owned("update_did_data", sender, health_did, |entry| {
            entry.ipfs_uri = uri.to_owned();
            Ok(())
        })
    }

    fn add_alt_data(
        &self,
        sender: &WalletAddress,
        health_did: &str,
        uris: &[String],
    ) -> RegistryResult<TxReceipt> {
        self.write_owned("add_alt_data", sender, health_did, |entry| {
            entry.alt_ipfs_uris.extend_from_slice(uris);
            Ok(())
        })
    }

    fn add_delegate_address(
        &self,
        sender: &WalletAddress,
        peer: &WalletAddress,
        health_did: &str,
    ) -> RegistryResult<TxReceipt> {
        self.write_owned("add_delegate_address", sender, health_did, |entry| {
            if !entry.is_delegate(peer) {
                entry.delegate_addresses.push(peer.clone());
            }
            Ok(())
        })
    }

    fn remove_delegate_address(
        &self,
        sender: &WalletAddress,
        peer: &WalletAddress,
        health_did: &str,
    ) -> RegistryResult<TxReceipt> {
        self.write_owned("remove_delegate_address", sender, health_did, |entry| {
            if !entry.is_delegate(peer) {
                return Err(RegistryError::NotDelegate(peer.clone()));
            }
            entry.delegate_addresses.retain(|d| d != peer);
            Ok(())
        })
    }

    fn transfer_ownership(
        &self,
        sender: &WalletAddress,
        new_owner: &WalletAddress,
        health_did: &str,
    ) -> RegistryResult<TxReceipt> {
        self.write_owned("transfer_ownership", sender, health_did, |entry| {
            if &entry.owner == new_owner {
                return Err(RegistryError::TransferToSelf);
            }
            entry.owner = new_owner.clone();
            Ok(())
        })
    }

    fn get_health_did(&self, health_did: &str) -> RegistryResult<HealthDid> {
        self.lock()
            .dids
            .get(health_did)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(health_did.to_owned()))
    }
}

fn tx_hash(
    chain_id: ChainId,
    block_number: u64,
    method: &str,
    sender: &WalletAddress,
    health_did: &str,
) -> String {
    let preimage = format!("{chain_id}\n{block_number}\n{method}\n{sender}\n{health_did}");
    format!("0x{}", Sha256Hash::digest(preimage))
}

fn persist(path: &Path, ledger: &Ledger) -> RegistryResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(ledger)?;
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, yaml)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DID: &str = "000005sarah";

    fn chain() -> ChainId {
        ChainId::new(5).unwrap()
    }

    fn addr(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", hex_byte(n).repeat(20))).unwrap()
    }

    fn hex_byte(n: u8) -> String {
        format!("{n:02x}")
    }

    fn registry(temp: &TempDir) -> LocalRegistry {
        LocalRegistry::open(&temp.path().join("registry.yaml"), chain(), 2).unwrap()
    }

    #[test]
    fn register_and_get() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);

        let receipt = reg.register_did(&addr(1), DID, "ipfs://abc").unwrap();
        assert_eq!(receipt.block_number, 1);
        assert_eq!(receipt.method, "register_did");
        assert_eq!(receipt.confirmations, 2);
        assert!(receipt.tx_hash.starts_with("0x"));
        assert_eq!(receipt.tx_hash.len(), 66);

        let entry = reg.get_health_did(DID).unwrap();
        assert_eq!(entry.owner, addr(1));
        assert_eq!(entry.ipfs_uri, "ipfs://abc");
        assert_eq!(entry.reputation_score, 10);
        assert!(entry.delegate_addresses.is_empty());
        assert!(entry.alt_ipfs_uris.is_empty());
        assert!(!entry.has_world_id && !entry.has_polygon_id && !entry.has_social_id);
    }

    #[test]
    fn register_rejects_duplicates_and_wrong_chain() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        reg.register_did(&addr(1), DID, "ipfs://a").unwrap();

        assert!(matches!(
            reg.register_did(&addr(2), DID, "ipfs://b"),
            Err(RegistryError::AlreadyExists(_))
        ));
        assert!(matches!(
            reg.register_did(&addr(1), "080001bob", "ipfs://b"),
            Err(RegistryError::IncorrectChainId { expected: 5, found: 80001 })
        ));
        assert!(matches!(
            reg.register_did(&addr(1), "0005", "ipfs://b"),
            Err(RegistryError::InvalidDid { .. })
        ));

        // rejected writes leave the ledger as it was
        assert_eq!(reg.get_health_did(DID).unwrap().ipfs_uri, "ipfs://a");
        assert_eq!(reg.lock().block_number, 1);
    }

    #[test]
    fn only_owner_can_update() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        reg.register_did(&addr(1), DID, "ipfs://a").unwrap();

        assert!(matches!(
            reg.update_did_data(&addr(2), DID, "ipfs://evil"),
            Err(RegistryError::Unauthorized { .. })
        ));
        reg.update_did_data(&addr(1), DID, "ipfs://b").unwrap();
        reg.add_alt_data(&addr(1), DID, &["ipfs://c".into(), "ipfs://d".into()])
            .unwrap();

        let entry = reg.get_health_did(DID).unwrap();
        assert_eq!(entry.ipfs_uri, "ipfs://b");
        assert_eq!(entry.alt_ipfs_uris, vec!["ipfs://c", "ipfs://d"]);

        assert!(matches!(
            reg.update_did_data(&addr(1), "000005nobody", "ipfs://x"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn delegates_are_managed_by_owner() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        reg.register_did(&addr(1), DID, "ipfs://a").unwrap();

        reg.add_delegate_address(&addr(1), &addr(3), DID).unwrap();
        reg.add_delegate_address(&addr(1), &addr(3), DID).unwrap();
        assert_eq!(reg.get_health_did(DID).unwrap().delegate_addresses, vec![addr(3)]);

        assert!(matches!(
            reg.remove_delegate_address(&addr(3), &addr(3), DID),
            Err(RegistryError::Unauthorized { .. })
        ));
        reg.remove_delegate_address(&addr(1), &addr(3), DID).unwrap();
        assert!(matches!(
            reg.remove_delegate_address(&addr(1), &addr(3), DID),
            Err(RegistryError::NotDelegate(_))
        ));
    }

    #[test]
    fn transfer_ownership_moves_control() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        reg.register_did(&addr(1), DID, "ipfs://a").unwrap();

        assert!(matches!(
            reg.transfer_ownership(&addr(1), &addr(1), DID),
            Err(RegistryError::TransferToSelf)
        ));
        reg.transfer_ownership(&addr(1), &addr(2), DID).unwrap();
        assert_eq!(reg.get_health_did(DID).unwrap().owner, addr(2));
        assert!(reg.update_did_data(&addr(1), DID, "ipfs://x").is_err());
        reg.update_did_data(&addr(2), DID, "ipfs://y").unwrap();
    }

    #[test]
    fn ledger_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.yaml");
        {
            let reg = LocalRegistry::open(&path, chain(), 1).unwrap();
            reg.register_did(&addr(1), DID, "ipfs://a").unwrap();
        }

        let reg = LocalRegistry::open(&path, chain(), 1).unwrap();
        assert_eq!(reg.get_health_did(DID).unwrap().owner, addr(1));
        let receipt = reg.update_did_data(&addr(1), DID, "ipfs://b").unwrap();
        assert_eq!(receipt.block_number, 2);

        assert!(matches!(
            LocalRegistry::open(&path, ChainId::new(80001).unwrap(), 1),
            Err(RegistryError::LedgerChainMismatch { .. })
        ));
    }

    #[test]
    fn distinct_writes_get_distinct_hashes() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        let a = reg.register_did(&addr(1), DID, "ipfs://a").unwrap();
        let b = reg.update_did_data(&addr(1), DID, "ipfs://a").unwrap();
        assert_ne!(a.tx_hash, b.tx_hash);
    }
}
