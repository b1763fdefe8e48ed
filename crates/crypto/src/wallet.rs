use crate::auth::DERIVED_VIA;
use crate::{AuthSig, CryptoError, CryptoResult, SignedMessage, WalletAddress, DEFAULT_AUTH_TTL_HOURS};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use healthdid_types::ChainId;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use std::fs;
use std::path::Path;

/// A P-256 key pair acting as the user's wallet.
#[derive(Clone)]
pub struct Wallet {
    key: SigningKey,
}

impl Wallet {
    pub fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    pub fn from_pkcs8_pem(pem: &str) -> CryptoResult<Self> {
        let key = SigningKey::from_pkcs8_pem(pem.trim())
            .map_err(|e| CryptoError::PrivateKey(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn to_pkcs8_pem(&self) -> CryptoResult<String> {
        self.key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.as_str().to_owned())
            .map_err(|e| CryptoError::PrivateKey(e.to_string()))
    }

    /// Loads a PKCS#8 PEM private key from disk.
    pub fn load(path: &Path) -> CryptoResult<Self> {
        let pem = fs::read_to_string(path)?;
        Self::from_pkcs8_pem(&pem)
    }

    /// Writes the private key as PKCS#8 PEM, refusing to overwrite an existing file.
    pub fn save(&self, path: &Path) -> CryptoResult<()> {
        let pem = self.to_pkcs8_pem()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        std::io::Write::write_all(&mut file, pem.as_bytes())?;
        Ok(())
    }

    /// Uncompressed SEC1 encoding of the public key.
    pub fn public_key_sec1(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    pub fn address(&self) -> WalletAddress {
        WalletAddress::from_verifying_key(self.key.verifying_key())
    }

    /// Signs a sign-in message for `chain` valid for `ttl` (24 hours when `None`).
    pub fn sign_auth_message(&self, chain: ChainId, ttl: Option<Duration>) -> AuthSig {
        let issued_at = Utc::now();
        let ttl = ttl.unwrap_or_else(|| Duration::hours(DEFAULT_AUTH_TTL_HOURS));
        self.sign_auth_message_at(chain, issued_at, issued_at + ttl)
    }

    pub fn sign_auth_message_at(
        &self,
        chain: ChainId,
        issued_at: DateTime<Utc>,
        expiration_time: DateTime<Utc>,
    ) -> AuthSig {
        let message = SignedMessage {
            address: self.address(),
            public_key: self.public_key_sec1(),
            chain_id: chain,
            issued_at,
            expiration_time,
        }
        .render();

        let signature: Signature = self.key.sign(message.as_bytes());

        AuthSig {
            sig: general_purpose::STANDARD.encode(signature.to_bytes()),
            derived_via: DERIVED_VIA.to_string(),
            signed_message: message,
            address: self.address().to_string(),
        }
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
