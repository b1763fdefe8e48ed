//! Validated primitive types shared across the healthdid crates.

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when creating a [`ChainId`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainIdError {
    /// Chain id zero is not a valid network.
    #[error("Chain id must be greater than zero")]
    Zero,

    /// The chain id does not fit in the six-digit DID prefix.
    #[error("Chain id {0} does not fit in {width} digits", width = ChainId::PREFIX_WIDTH)]
    TooLarge(u64),

    /// The input was not a decimal number.
    #[error("Chain id is not a number: '{0}'")]
    NotANumber(String),
}

/// Numeric identifier of the network a DID is registered on.
///
/// Health DIDs carry the chain id as a fixed-width, zero-padded decimal prefix
/// (`5` becomes `000005`), so only ids that fit in [`ChainId::PREFIX_WIDTH`] digits are
/// representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(u64);

impl ChainId {
    /// Number of digits in the DID chain prefix.
    pub const PREFIX_WIDTH: usize = 6;

    const MAX: u64 = 999_999;

    pub fn new(id: u64) -> Result<Self, ChainIdError> {
        if id == 0 {
            return Err(ChainIdError::Zero);
        }
        if id > Self::MAX {
            return Err(ChainIdError::TooLarge(id));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Returns the zero-padded prefix used in DIDs and registry keys.
    pub fn did_prefix(self) -> String {
        format!("{:0width$}", self.0, width = Self::PREFIX_WIDTH)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = ChainIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let id = trimmed
            .parse::<u64>()
            .map_err(|_| ChainIdError::NotANumber(trimmed.to_string()))?;
        Self::new(id)
    }
}

impl serde::Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = u64::deserialize(deserializer)?;
        ChainId::new(id).map_err(serde::de::Error::custom)
    }
}
