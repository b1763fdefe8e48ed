use crate::{CryptoError, CryptoResult};
use p256::ecdsa::VerifyingKey;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A wallet address: `0x` followed by 40 lowercase hex characters.
///
/// Derived from a P-256 public key as the last 20 bytes of the SHA-256 of its uncompressed SEC1
/// encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let digest = Sha256::digest(point.as_bytes());
        Self(format!("0x{}", hex::encode(&digest[12..])))
    }

    /// Parses an address, accepting upper- or mixed-case hex and normalising to lowercase.
    pub fn parse(input: &str) -> CryptoResult<Self> {
        let trimmed = input.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| CryptoError::InvalidAddress(format!("missing 0x prefix: '{input}'")))?;

        if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidAddress(format!(
                "expected 40 hex characters after 0x: '{input}'"
            )));
        }
        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WalletAddress::parse(s)
    }
}

impl serde::Serialize for WalletAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for WalletAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        WalletAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::SigningKey;

    #[test]
    fn derives_lowercase_address_from_key() {
        let key = SigningKey::random(&mut rand::thread_rng());
        let address = WalletAddress::from_verifying_key(key.verifying_key());

        assert_eq!(address.as_str().len(), 42);
        assert!(address.as_str().starts_with("0x"));
        assert_eq!(WalletAddress::parse(address.as_str()).unwrap(), address);
    }

    #[test]
    fn parse_normalises_case() {
        let parsed = WalletAddress::parse("0xABCDEFabcdef0123456789ABCDEFabcdef012345").unwrap();
        assert_eq!(parsed.as_str(), "0xabcdefabcdef0123456789abcdefabcdef012345");
    }

    #[test]
    fn parse_rejects_bad_input() {
        for input in [
            "abcdefabcdef0123456789abcdefabcdef012345",
            "0x1234",
            "0xzzcdefabcdef0123456789abcdefabcdef012345",
            "",
        ] {
            assert!(WalletAddress::parse(input).is_err(), "{input}");
        }
    }
}
