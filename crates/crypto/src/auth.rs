//! Signed sign-in messages.
//!
//! An [`AuthSig`] carries a plain-text message, its ECDSA P-256 signature and the address it
//! claims to come from. The message embeds the signer's public key so a verifier needs nothing
//! else to check it:
//!
//! ```text
//! healthdid wants you to sign in with your wallet:
//! 0x1f0c...
//!
//! Public Key: 04ab...
//! Chain ID: 5
//! Issued At: 2026-10-19T12:00:00Z
//! Expiration Time: 2026-10-20T12:00:00Z
//! ```

use crate::{CryptoError, CryptoResult, WalletAddress};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use healthdid_types::ChainId;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Lifetime of an auth signature when the caller does not choose one.
pub const DEFAULT_AUTH_TTL_HOURS: i64 = 24;

pub(crate) const DERIVED_VIA: &str = "healthdid.p256.sign";

const HEADER: &str = "healthdid wants you to sign in with your wallet:";
const PUBLIC_KEY: &str = "Public Key";
const CHAIN_ID: &str = "Chain ID";
const ISSUED_AT: &str = "Issued At";
const EXPIRATION_TIME: &str = "Expiration Time";

/// The structured content of a sign-in message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedMessage {
    pub address: WalletAddress,
    /// Uncompressed SEC1 public key bytes.
    pub public_key: Vec<u8>,
    pub chain_id: ChainId,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
}

impl SignedMessage {
    pub fn render(&self) -> String {
        format!(
            "{HEADER}\n{}\n\n{PUBLIC_KEY}: {}\n{CHAIN_ID}: {}\n{ISSUED_AT}: {}\n{EXPIRATION_TIME}: {}",
            self.address,
            hex::encode(&self.public_key),
            self.chain_id,
            self.issued_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.expiration_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    pub fn parse(text: &str) -> CryptoResult<Self> {
        let mut lines = text.lines();

        if lines.next() != Some(HEADER) {
            return Err(malformed("missing sign-in header"));
        }
        let address = WalletAddress::parse(lines.next().unwrap_or_default())?;
        if lines.next() != Some("") {
            return Err(malformed("expected a blank line after the address"));
        }

        let mut public_key = None;
        let mut chain_id = None;
        let mut issued_at = None;
        let mut expiration_time = None;

        for line in lines {
            let (key, value) = line
                .split_once(": ")
                .ok_or_else(|| malformed(&format!("unexpected line '{line}'")))?;
            match key {
                PUBLIC_KEY => {
                    public_key =
                        Some(hex::decode(value).map_err(|_| malformed("public key is not hex"))?)
                }
                CHAIN_ID => {
                    chain_id = Some(
                        value
                            .parse::<ChainId>()
                            .map_err(|e| malformed(&e.to_string()))?,
                    )
                }
                ISSUED_AT => issued_at = Some(parse_time(value)?),
                EXPIRATION_TIME => expiration_time = Some(parse_time(value)?),
                other => return Err(malformed(&format!("unknown field '{other}'"))),
            }
        }

        Ok(Self {
            address,
            public_key: public_key.ok_or_else(|| missing(PUBLIC_KEY))?,
            chain_id: chain_id.ok_or_else(|| missing(CHAIN_ID))?,
            issued_at: issued_at.ok_or_else(|| missing(ISSUED_AT))?,
            expiration_time: expiration_time.ok_or_else(|| missing(EXPIRATION_TIME))?,
        })
    }
}

fn parse_time(value: &str) -> CryptoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| malformed(&format!("invalid timestamp '{value}'")))
}

fn malformed(msg: &str) -> CryptoError {
    CryptoError::MalformedAuthSig(msg.to_owned())
}

fn missing(field: &str) -> CryptoError {
    malformed(&format!("missing field '{field}'"))
}

/// A signed sign-in message, in the JSON shape wallets hand to encryption networks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSig {
    /// Base64 of the raw 64-byte `r||s` signature.
    pub sig: String,
    pub derived_via: String,
    pub signed_message: String,
    pub address: String,
}

impl AuthSig {
    pub fn message(&self) -> CryptoResult<SignedMessage> {
        SignedMessage::parse(&self.signed_message)
    }

    pub fn chain_id(&self) -> CryptoResult<ChainId> {
        self.message().map(|m| m.chain_id)
    }

    /// Verifies the signature and expiry, returning the authenticated wallet address.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::MalformedAuthSig`] if the message cannot be parsed or disagrees with
    ///   the `address` field,
    /// - [`CryptoError::AddressMismatch`] if the embedded key does not derive the address,
    /// - [`CryptoError::BadSignature`] if the signature does not verify,
    /// - [`CryptoError::Expired`] if `now` is at or past the expiration time.
    pub fn verify(&self, now: DateTime<Utc>) -> CryptoResult<WalletAddress> {
        if self.derived_via != DERIVED_VIA {
            return Err(malformed(&format!(
                "unsupported derivation '{}'",
                self.derived_via
            )));
        }

        let message = self.message()?;
        let claimed = WalletAddress::parse(&self.address)?;
        if claimed != message.address {
            return Err(malformed("address differs from the signed message"));
        }

        let key = VerifyingKey::from_sec1_bytes(&message.public_key)
            .map_err(|_| malformed("public key is not a P-256 point"))?;
        let derived = WalletAddress::from_verifying_key(&key);
        if derived != claimed {
            return Err(CryptoError::AddressMismatch { claimed, derived });
        }

        let sig_bytes = general_purpose::STANDARD.decode(&self.sig)?;
        let signature = Signature::from_slice(&sig_bytes).map_err(|_| CryptoError::BadSignature)?;
        key.verify(self.signed_message.as_bytes(), &signature)
            .map_err(|_| CryptoError::BadSignature)?;

        if now >= message.expiration_time {
            return Err(CryptoError::Expired(message.expiration_time));
        }

        Ok(claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Wallet;
    use chrono::Duration;

    fn chain() -> ChainId {
        ChainId::new(5).unwrap()
    }

    #[test]
    fn message_renders_and_parses() {
        let wallet = Wallet::generate();
        let issued = "2026-10-19T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let message = SignedMessage {
            address: wallet.address(),
            public_key: wallet.public_key_sec1(),
            chain_id: chain(),
            issued_at: issued,
            expiration_time: issued + Duration::hours(DEFAULT_AUTH_TTL_HOURS),
        };

        let text = message.render();
        assert!(text.contains("Chain ID: 5"));
        assert!(text.contains("Expiration Time: 2026-10-20T12:00:00Z"));
        assert_eq!(SignedMessage::parse(&text).unwrap(), message);
    }

    #[test]
    fn verify_returns_signer_address() {
        let wallet = Wallet::generate();
        let auth = wallet.sign_auth_message(chain(), None);

        assert_eq!(auth.verify(Utc::now()).unwrap(), wallet.address());
        assert_eq!(auth.chain_id().unwrap(), chain());
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let wallet = Wallet::generate();
        let mut auth = wallet.sign_auth_message(chain(), None);
        auth.signed_message = auth.signed_message.replace("Chain ID: 5", "Chain ID: 137");

        assert!(matches!(
            auth.verify(Utc::now()),
            Err(CryptoError::BadSignature)
        ));
    }

    #[test]
    fn verify_rejects_foreign_address() {
        let wallet = Wallet::generate();
        let other = Wallet::generate();
        let mut auth = wallet.sign_auth_message(chain(), None);
        auth.signed_message = auth
            .signed_message
            .replace(wallet.address().as_str(), other.address().as_str());
        auth.address = other.address().to_string();

        assert!(matches!(
            auth.verify(Utc::now()),
            Err(CryptoError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn verify_rejects_expired_signature() {
        let wallet = Wallet::generate();
        let auth = wallet.sign_auth_message(chain(), Some(Duration::minutes(5)));

        let later = Utc::now() + Duration::minutes(10);
        assert!(matches!(auth.verify(later), Err(CryptoError::Expired(_))));
    }

    #[test]
    fn auth_sig_uses_camel_case_json() {
        let auth = Wallet::generate().sign_auth_message(chain(), None);
        let json = serde_json::to_value(&auth).unwrap();

        assert_eq!(json["derivedVia"], DERIVED_VIA);
        assert!(json["signedMessage"].as_str().unwrap().starts_with(HEADER));
    }
}
