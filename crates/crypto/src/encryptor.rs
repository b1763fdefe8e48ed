//! Profile encryption.

use crate::{AccessPolicy, AuthSig, CryptoError, CryptoResult};
use base64::{engine::general_purpose, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use chrono::Utc;
use healthdid_types::ChainId;
use healthdid_uuid::Sha256Hash;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

const NONCE_LEN: usize = 24;

/// Ciphertext plus the hash of the plaintext it seals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBlob {
    /// Base64 of `nonce || sealed bytes`.
    pub ciphertext: String,
    /// SHA-256 of the plaintext; decryption checks the recovered bytes against it.
    pub data_to_encrypt_hash: Sha256Hash,
}

/// Encrypts serialized profiles so only wallets satisfying a policy can read them.
pub trait Encryptor {
    /// Seals `plaintext` under `policy`.
    ///
    /// The caller proves control of a wallet with `auth_sig`.
    fn encrypt(
        &self,
        policy: &AccessPolicy,
        auth_sig: &AuthSig,
        chain: ChainId,
        plaintext: &[u8],
    ) -> CryptoResult<EncryptedBlob>;

    /// Opens `ciphertext` for the wallet behind `auth_sig` if it satisfies `policy`.
    fn decrypt(
        &self,
        policy: &AccessPolicy,
        auth_sig: &AuthSig,
        chain: ChainId,
        ciphertext: &str,
        expected_hash: &Sha256Hash,
    ) -> CryptoResult<Vec<u8>>;
}

/// 32-byte secret from which per-artifact keys are derived.
#[derive(Clone)]
pub struct MasterKey([u8; 32]);

impl MasterKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parses 64 hex characters.
    pub fn from_hex(input: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(input.trim())
            .map_err(|e| CryptoError::InvalidMasterKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            CryptoError::InvalidMasterKey(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Reads the key file at `path`, creating it with a fresh key if it does not exist.
    pub fn load_or_create(path: &Path) -> CryptoResult<Self> {
        if path.exists() {
            let text = fs::read_to_string(path)?;
            return Self::from_hex(&text);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let key = Self::generate();
        fs::write(path, key.to_hex())?;
        tracing::info!("created encryption key file at {}", path.display());
        Ok(key)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

/// Offline [`Encryptor`] using XChaCha20-Poly1305.
///
/// The key for an artifact is `sha256(master || chain prefix || policy JSON)`, and the policy
/// JSON is also bound as associated data, so a ciphertext only opens under the exact policy it
/// was sealed with.
#[derive(Clone, Debug)]
pub struct LocalKeyEncryptor {
    master: MasterKey,
}

impl LocalKeyEncryptor {
    pub fn new(master: MasterKey) -> Self {
        Self { master }
    }

    fn cipher(&self, chain: ChainId, policy_json: &[u8]) -> XChaCha20Poly1305 {
        let mut hasher = Sha256::new();
        hasher.update(self.master.0);
        hasher.update(chain.did_prefix().as_bytes());
        hasher.update(policy_json);
        let key = hasher.finalize();
        XChaCha20Poly1305::new(Key::from_slice(&key))
    }
}

impl Encryptor for LocalKeyEncryptor {
    fn encrypt(
        &self,
        policy: &AccessPolicy,
        auth_sig: &AuthSig,
        chain: ChainId,
        plaintext: &[u8],
    ) -> CryptoResult<EncryptedBlob> {
        let signer = auth_sig.verify(Utc::now())?;
        policy.validate()?;
        let policy_json = policy.canonical_json()?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher(chain, &policy_json)
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &policy_json,
                },
            )
            .map_err(|_| CryptoError::Encrypt)?;

        let mut combined = Vec::with_capacity(NONCE_LEN + sealed.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&sealed);

        tracing::debug!(
            "encrypted {} bytes for {} on chain {}",
            plaintext.len(),
            signer,
            chain
        );

        Ok(EncryptedBlob {
            ciphertext: general_purpose::STANDARD.encode(combined),
            data_to_encrypt_hash: Sha256Hash::digest(plaintext),
        })
    }

    fn decrypt(
        &self,
        policy: &AccessPolicy,
        auth_sig: &AuthSig,
        chain: ChainId,
        ciphertext: &str,
        expected_hash: &Sha256Hash,
    ) -> CryptoResult<Vec<u8>> {
        let reader = auth_sig.verify(Utc::now())?;
        policy.authorize(&reader)?;
        let policy_json = policy.canonical_json()?;

        let combined = general_purpose::STANDARD.decode(ciphertext.trim())?;
        if combined.len() < NONCE_LEN {
            return Err(CryptoError::Decrypt);
        }
        let (nonce, sealed) = combined.split_at(NONCE_LEN);

        let plaintext = self
            .cipher(chain, &policy_json)
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: &policy_json,
                },
            )
            .map_err(|_| CryptoError::Decrypt)?;

        let actual = Sha256Hash::digest(&plaintext);
        if &actual != expected_hash {
            return Err(CryptoError::HashMismatch {
                expected: expected_hash.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessControlCondition, Wallet};
    use tempfile::TempDir;

    fn chain() -> ChainId {
        ChainId::new(5).unwrap()
    }

    fn setup() -> (LocalKeyEncryptor, Wallet, AuthSig) {
        let encryptor = LocalKeyEncryptor::new(MasterKey::generate());
        let wallet = Wallet::generate();
        let auth = wallet.sign_auth_message(chain(), None);
        (encryptor, wallet, auth)
    }

    #[test]
    fn owner_can_decrypt() {
        let (encryptor, wallet, auth) = setup();
        let policy = AccessPolicy::owner(&wallet.address());
        let plaintext = br#"{"resourceType":"Patient"}"#;

        let blob = encryptor.encrypt(&policy, &auth, chain(), plaintext).unwrap();
        assert_ne!(blob.ciphertext.as_bytes(), plaintext);
        assert_eq!(blob.data_to_encrypt_hash, Sha256Hash::digest(plaintext));

        let opened = encryptor
            .decrypt(&policy, &auth, chain(), &blob.ciphertext, &blob.data_to_encrypt_hash)
            .unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn granted_wallet_can_decrypt_and_stranger_cannot() {
        let (encryptor, owner, auth) = setup();
        let doctor = Wallet::generate();
        let stranger = Wallet::generate();
        let policy = AccessPolicy::owner(&owner.address())
            .or(AccessControlCondition::wallet_owner(&doctor.address()));

        let blob = encryptor.encrypt(&policy, &auth, chain(), b"record").unwrap();

        let doctor_auth = doctor.sign_auth_message(chain(), None);
        assert_eq!(
            encryptor
                .decrypt(&policy, &doctor_auth, chain(), &blob.ciphertext, &blob.data_to_encrypt_hash)
                .unwrap(),
            b"record"
        );

        let stranger_auth = stranger.sign_auth_message(chain(), None);
        assert!(matches!(
            encryptor.decrypt(&policy, &stranger_auth, chain(), &blob.ciphertext, &blob.data_to_encrypt_hash),
            Err(CryptoError::AccessDenied(_))
        ));
    }

    #[test]
    fn altered_policy_does_not_open() {
        let (encryptor, owner, auth) = setup();
        let policy = AccessPolicy::owner(&owner.address());
        let blob = encryptor.encrypt(&policy, &auth, chain(), b"record").unwrap();

        let widened = policy.or(AccessControlCondition::wallet_owner(&Wallet::generate().address()));
        assert!(matches!(
            encryptor.decrypt(&widened, &auth, chain(), &blob.ciphertext, &blob.data_to_encrypt_hash),
            Err(CryptoError::Decrypt)
        ));
    }

    #[test]
    fn wrong_hash_is_reported() {
        let (encryptor, owner, auth) = setup();
        let policy = AccessPolicy::owner(&owner.address());
        let blob = encryptor.encrypt(&policy, &auth, chain(), b"record").unwrap();

        assert!(matches!(
            encryptor.decrypt(&policy, &auth, chain(), &blob.ciphertext, &Sha256Hash::digest(b"other")),
            Err(CryptoError::HashMismatch { .. })
        ));
    }

    #[test]
    fn encrypt_requires_valid_auth_sig() {
        let (encryptor, owner, mut auth) = setup();
        auth.sig = general_purpose::STANDARD.encode([0u8; 64]);

        assert!(encryptor
            .encrypt(&AccessPolicy::owner(&owner.address()), &auth, chain(), b"x")
            .is_err());
    }

    #[test]
    fn master_key_file_is_created_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("encryption.key");

        let first = MasterKey::load_or_create(&path).unwrap();
        let second = MasterKey::load_or_create(&path).unwrap();
        assert_eq!(first.to_hex(), second.to_hex());
        assert_eq!(first.to_hex().len(), 64);
    }

    #[test]
    fn master_key_rejects_short_hex() {
        assert!(matches!(
            MasterKey::from_hex("abcd"),
            Err(CryptoError::InvalidMasterKey(_))
        ));
    }
}
