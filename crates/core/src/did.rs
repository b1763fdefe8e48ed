//! Health DID naming.
//!
//! A DID is `did:health:` followed by its registry id, and the registry id is the chain id
//! zero-padded to six digits followed by a user-chosen suffix:
//!
//! ```text
//! did:health:000005sarah.williams
//!            └────┘└────────────┘
//!            chain     suffix
//! ```

use crate::constants::DID_METHOD_PREFIX;
use crate::{ProfileError, ProfileResult};
use healthdid_types::ChainId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A health DID split into its chain and suffix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DidName {
    chain: ChainId,
    suffix: String,
}

impl DidName {
    /// # Errors
    ///
    /// [`ProfileError::InvalidDidSuffix`] if `suffix` is empty or uses characters outside
    /// `[A-Za-z0-9._-]`.
    pub fn new(chain: ChainId, suffix: &str) -> ProfileResult<Self> {
        validate_suffix(suffix)?;
        Ok(Self {
            chain,
            suffix: suffix.to_owned(),
        })
    }

    /// Parses either a full DID (`did:health:000005sarah`) or a bare registry id.
    pub fn parse(input: &str) -> ProfileResult<Self> {
        let trimmed = input.trim();
        let registry_id = trimmed.strip_prefix(DID_METHOD_PREFIX).unwrap_or(trimmed);

        let width = ChainId::PREFIX_WIDTH;
        let prefix = registry_id.get(..width).filter(|p| p.bytes().all(|b| b.is_ascii_digit()));
        let Some(prefix) = prefix else {
            return Err(ProfileError::InvalidInput(format!(
                "registry id must start with {width} digits: '{registry_id}'"
            )));
        };

        let chain = prefix
            .parse::<ChainId>()
            .map_err(|e| ProfileError::InvalidInput(format!("'{registry_id}': {e}")))?;
        Self::new(chain, &registry_id[width..])
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The key under which the DID is registered, e.g. `000005sarah`.
    pub fn registry_id(&self) -> String {
        format!("{}{}", self.chain.did_prefix(), self.suffix)
    }

    /// The full DID, e.g. `did:health:000005sarah`.
    pub fn did(&self) -> String {
        format!("{DID_METHOD_PREFIX}{}", self.registry_id())
    }
}

impl fmt::Display for DidName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.did())
    }
}

pub(crate) fn validate_suffix(suffix: &str) -> ProfileResult<()> {
    let valid = !suffix.is_empty()
        && suffix
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(ProfileError::InvalidDidSuffix(suffix.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(id: u64) -> ChainId {
        ChainId::new(id).unwrap()
    }

    #[test]
    fn builds_registry_id_and_did() {
        let name = DidName::new(chain(5), "sarah.williams").unwrap();
        assert_eq!(name.registry_id(), "000005sarah.williams");
        assert_eq!(name.did(), "did:health:000005sarah.williams");
        assert_eq!(name.to_string(), name.did());

        let name = DidName::new(chain(80001), "clinic-1").unwrap();
        assert_eq!(name.registry_id(), "080001clinic-1");
    }

    #[test]
    fn rejects_bad_suffixes() {
        for suffix in ["", "sarah williams", "a/b", "ü", "x:y"] {
            assert!(
                matches!(
                    DidName::new(chain(5), suffix),
                    Err(ProfileError::InvalidDidSuffix(_))
                ),
                "{suffix:?} should be rejected"
            );
        }
    }

    #[test]
    fn parses_did_and_registry_id() {
        let from_did = DidName::parse("did:health:000005sarah").unwrap();
        let from_id = DidName::parse("000005sarah").unwrap();
        assert_eq!(from_did, from_id);
        assert_eq!(from_did.chain(), chain(5));
        assert_eq!(from_did.suffix(), "sarah");
    }

    #[test]
    fn parse_rejects_bad_prefixes() {
        assert!(DidName::parse("00005").is_err());
        assert!(DidName::parse("00x005sarah").is_err());
        assert!(DidName::parse("000000sarah").is_err());
        assert!(matches!(
            DidName::parse("000005"),
            Err(ProfileError::InvalidDidSuffix(_))
        ));
    }
}
