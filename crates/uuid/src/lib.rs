//! Identifier utilities.
//!
//! Two identifier families are used throughout healthdid:
//!
//! - [`ResourceId`]: the FHIR `id` assigned to a resource when its profile is submitted. This is a
//!   random (v4) UUID in its **canonical hyphenated lowercase** form, for example
//!   `550e8400-e29b-41d4-a716-446655440000`. The same value names the uploaded artifact
//!   (`Patient/<id>`) and the local export file.
//! - [`Sha256Hash`]: a SHA-256 digest in **64 lowercase hexadecimal characters**. Used for
//!   plaintext integrity hashes, blob addresses and content identifiers.
//!
//! Both types guarantee their canonical form once constructed, so their `Display` output can be
//! embedded in paths and URIs without further checks.
//!
//! ## Sharded directory layout
//! For a digest `h`, storage lives under `parent_dir/<h[0..2]>/<h[2..4]>/<h>`, which keeps any
//! single directory from growing without bound.

mod hash;
mod service;

pub use hash::Sha256Hash;
pub use service::{ResourceId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
