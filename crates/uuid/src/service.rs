//! Resource identifiers.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// A FHIR resource id in canonical form (hyphenated lowercase UUID).
///
/// # Construction
/// - [`ResourceId::new`] generates a fresh random id (used when a profile is submitted).
/// - [`ResourceId::parse`] validates an externally supplied id.
///
/// # Errors
/// [`ResourceId::parse`] returns [`UuidError::InvalidInput`] if the input is not already
/// canonical. Uppercase, braced, URN and simple (unhyphenated) forms are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(Uuid);

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceId {
    /// Generates a new random resource id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a resource id that must already be in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "resource id must be a lowercase hyphenated UUID, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid resource id '{input}': {e}")))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is a lowercase hyphenated UUID (8-4-4-4-12).
    ///
    /// This is a purely syntactic check.
    pub fn is_canonical(input: &str) -> bool {
        const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

        let mut parts = input.split('-');
        for expected in GROUPS {
            match parts.next() {
                Some(part)
                    if part.len() == expected
                        && part.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) => {}
                _ => return false,
            }
        }
        parts.next().is_none()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ResourceId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = ResourceId::new();
        let rendered = id.to_string();

        assert_eq!(rendered.len(), 36);
        assert!(ResourceId::is_canonical(&rendered));
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let canonical = "550e8400-e29b-41d4-a716-446655440000";
        let id = ResourceId::parse(canonical).unwrap();

        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_simple_form() {
        let result = ResourceId::parse("550e8400e29b41d4a716446655440000");

        match result {
            Err(UuidError::InvalidInput(msg)) => assert!(msg.contains("hyphenated")),
            other => panic!("Expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        assert!(ResourceId::parse("550E8400-E29B-41D4-A716-446655440000").is_err());
    }

    #[test]
    fn test_is_canonical_invalid() {
        // Wrong group lengths
        assert!(!ResourceId::is_canonical(
            "550e840-0e29b-41d4-a716-446655440000"
        ));

        // Extra group
        assert!(!ResourceId::is_canonical(
            "550e8400-e29b-41d4-a716-446655440000-00"
        ));

        // Braced
        assert!(!ResourceId::is_canonical(
            "{550e8400-e29b-41d4-a716-446655440000}"
        ));

        // Empty string
        assert!(!ResourceId::is_canonical(""));
    }

    #[test]
    fn test_from_str_matches_parse() {
        let canonical = "00000000-0000-4000-8000-000000000001";
        let parsed: ResourceId = canonical.parse().unwrap();

        assert_eq!(parsed, ResourceId::parse(canonical).unwrap());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ResourceId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(serde_json::from_str::<ResourceId>("\"not-a-uuid\"").is_err());
    }
}
