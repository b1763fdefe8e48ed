//! healthdid content-addressed storage
//!
//! Encrypted profiles are uploaded as small directories of named files and addressed by a
//! content identifier ([`ContentId`]) derived from what they contain.
//!
//! ## Design Principles
//!
//! - Blobs are stored once, keyed by the SHA-256 of their bytes
//! - Blobs are immutable once added
//! - An upload is described by a YAML manifest listing each file's name, hash and size
//! - Uploading the same files again yields the same identifier
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//! ├── blobs/
//! │   └── sha256/
//! │       └── ab/
//! │           └── cd/
//! │               └── abcd3f9e…     # blob bytes
//! └── dirs/
//!     └── 9f/
//!         └── 2c/
//!             └── 9f2c41…yaml       # DirectoryManifest
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use healthdid_files::{ContentStore, LocalContentStore, NamedBlob};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = LocalContentStore::new(Path::new("healthdid_data/ipfs"))?;
//! let blob = NamedBlob::new("Patient/550e8400-e29b-41d4-a716-446655440000", b"ciphertext".to_vec())?;
//! let cid = store.put(&[blob])?;
//! let bytes = store.get(&cid, "Patient/550e8400-e29b-41d4-a716-446655440000")?;
//! # Ok(())
//! # }
//! ```

mod blob;
mod store;

pub use blob::NamedBlob;
pub use store::{ContentId, ContentStore, DirectoryManifest, FileMetadata, LocalContentStore};

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory exists but is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Blob name is absolute, empty or escapes its directory
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Nothing to upload
    #[error("Upload must contain at least one file")]
    EmptyUpload,

    /// Two blobs in one upload share a name
    #[error("Duplicate file name in upload: {0}")]
    DuplicateName(String),

    /// Unknown content identifier or file name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored bytes no longer match their hash
    #[error("Stored blob is corrupt: expected {expected}, found {actual}")]
    Corrupt { expected: String, actual: String },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest could not be (de)serialised
    #[error("Manifest error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed content identifier
    #[error("Invalid content identifier: {0}")]
    Uuid(#[from] healthdid_uuid::UuidError),
}
