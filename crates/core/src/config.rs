//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services behind an
//! `Arc`. Request handling never reads environment variables.

use crate::constants::{
    CONTENT_DIR_NAME, DEFAULT_BLOCK_CONFIRMATIONS, DEFAULT_CHAIN_ID, DEFAULT_DATA_DIR,
    DEFAULT_GATEWAY, ENCRYPTION_KEY_FILE_NAME, EXPORTS_DIR_NAME, GATEWAY_CID_PLACEHOLDER,
    REGISTRY_FILE_NAME,
};
use crate::{ProfileError, ProfileResult};
use healthdid_crypto::MasterKey;
use healthdid_types::ChainId;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    chain_id: ChainId,
    gateway: String,
    block_confirmations: u64,
    encryption_key: Option<MasterKey>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `gateway` must contain the `{cid}` placeholder. Without an `encryption_key` the local
    /// encryptor reads (or creates) a key file in `data_dir`.
    pub fn new(
        data_dir: PathBuf,
        chain_id: ChainId,
        gateway: String,
        block_confirmations: u64,
        encryption_key: Option<MasterKey>,
    ) -> ProfileResult<Self> {
        if !gateway.contains(GATEWAY_CID_PLACEHOLDER) {
            return Err(ProfileError::Config(format!(
                "gateway template '{gateway}' must contain {GATEWAY_CID_PLACEHOLDER}"
            )));
        }

        Ok(Self {
            data_dir,
            chain_id,
            gateway,
            block_confirmations,
            encryption_key,
        })
    }

    /// Resolve the configuration from `HEALTHDID_*` environment variables.
    ///
    /// Call once from a binary's `main`, after loading any `.env` file.
    pub fn from_env() -> ProfileResult<Self> {
        let var = |name: &str| std::env::var(name).ok();

        Self::new(
            var("HEALTHDID_DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            chain_id_from_env_value(var("HEALTHDID_CHAIN_ID"))?,
            var("HEALTHDID_GATEWAY")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GATEWAY.into()),
            block_confirmations_from_env_value(var("HEALTHDID_BLOCK_CONFIRMATIONS"))?,
            encryption_key_from_env_value(var("HEALTHDID_ENCRYPTION_KEY"))?,
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn content_dir(&self) -> PathBuf {
        self.data_dir.join(CONTENT_DIR_NAME)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join(EXPORTS_DIR_NAME)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(REGISTRY_FILE_NAME)
    }

    pub fn encryption_key_path(&self) -> PathBuf {
        self.data_dir.join(ENCRYPTION_KEY_FILE_NAME)
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    pub fn block_confirmations(&self) -> u64 {
        self.block_confirmations
    }

    pub fn encryption_key(&self) -> Option<&MasterKey> {
        self.encryption_key.as_ref()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the chain id from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default chain.
pub fn chain_id_from_env_value(value: Option<String>) -> ProfileResult<ChainId> {
    present(value)
        .map(|v| v.parse::<ChainId>())
        .unwrap_or_else(|| ChainId::new(DEFAULT_CHAIN_ID))
        .map_err(|e| ProfileError::Config(format!("HEALTHDID_CHAIN_ID: {e}")))
}

pub fn block_confirmations_from_env_value(value: Option<String>) -> ProfileResult<u64> {
    match present(value) {
        None => Ok(DEFAULT_BLOCK_CONFIRMATIONS),
        Some(v) => v.parse::<u64>().map_err(|_| {
            ProfileError::Config(format!(
                "HEALTHDID_BLOCK_CONFIRMATIONS must be a whole number, got '{v}'"
            ))
        }),
    }
}

/// Parse a 64-hex-character master key. `None` means "use the key file".
pub fn encryption_key_from_env_value(value: Option<String>) -> ProfileResult<Option<MasterKey>> {
    present(value)
        .map(|v| MasterKey::from_hex(&v))
        .transpose()
        .map_err(|e| ProfileError::Config(format!("HEALTHDID_ENCRYPTION_KEY: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_values_fall_back_to_defaults() {
        assert_eq!(chain_id_from_env_value(None).unwrap().get(), 5);
        assert_eq!(chain_id_from_env_value(Some("  ".into())).unwrap().get(), 5);
        assert_eq!(block_confirmations_from_env_value(None).unwrap(), 10);
        assert!(encryption_key_from_env_value(None).unwrap().is_none());
    }

    #[test]
    fn env_values_are_parsed() {
        assert_eq!(
            chain_id_from_env_value(Some("80001".into())).unwrap().get(),
            80001
        );
        assert_eq!(
            block_confirmations_from_env_value(Some("3".into())).unwrap(),
            3
        );
        let key = MasterKey::generate();
        let parsed = encryption_key_from_env_value(Some(key.to_hex())).unwrap().unwrap();
        assert_eq!(parsed.to_hex(), key.to_hex());
    }

    #[test]
    fn invalid_env_values_are_config_errors() {
        assert!(matches!(
            chain_id_from_env_value(Some("0".into())),
            Err(ProfileError::Config(_))
        ));
        assert!(matches!(
            chain_id_from_env_value(Some("1000000".into())),
            Err(ProfileError::Config(_))
        ));
        assert!(matches!(
            block_confirmations_from_env_value(Some("ten".into())),
            Err(ProfileError::Config(_))
        ));
        assert!(matches!(
            encryption_key_from_env_value(Some("abc".into())),
            Err(ProfileError::Config(_))
        ));
    }

    #[test]
    fn gateway_needs_cid_placeholder() {
        let chain = ChainId::new(5).unwrap();
        assert!(CoreConfig::new("d".into(), chain, "https://gw.example".into(), 1, None).is_err());

        let cfg = CoreConfig::new("d".into(), chain, DEFAULT_GATEWAY.into(), 1, None).unwrap();
        assert_eq!(cfg.registry_path(), Path::new("d").join("registry.yaml"));
        assert_eq!(cfg.exports_dir(), Path::new("d").join("exports"));
    }
}
