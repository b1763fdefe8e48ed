//! Content-addressed store implementation
//!
//! [`LocalContentStore`] keeps every blob once under its SHA-256 and records each upload as a
//! [`DirectoryManifest`]. The upload's [`ContentId`] is the SHA-256 over the sorted list of
//! `(name, hash)` pairs, so it depends only on what was uploaded and never on when.

use crate::blob::validate_name;
use crate::{FilesError, NamedBlob};
use chrono::{DateTime, Utc};
use healthdid_types::NonEmptyText;
use healthdid_uuid::Sha256Hash;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const BLOBS_FOLDER_NAME: &str = "blobs";
const DIRS_FOLDER_NAME: &str = "dirs";

/// Identifier of an uploaded directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ContentId(Sha256Hash);

impl ContentId {
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        Ok(Self(Sha256Hash::parse(input)?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn for_entries<'a>(entries: impl Iterator<Item = (&'a str, &'a Sha256Hash)>) -> Self {
        let sorted: BTreeSet<(&str, &str)> = entries.map(|(n, h)| (n, h.as_str())).collect();
        let mut listing = String::new();
        for (name, hash) in sorted {
            listing.push_str(name);
            listing.push('\0');
            listing.push_str(hash);
            listing.push('\n');
        }
        Self(Sha256Hash::digest(listing))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ContentId {
    type Err = FilesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentId::parse(s)
    }
}

/// Metadata for a stored file
///
/// Serialised to YAML inside the upload's manifest. It carries no patient identifiers; the
/// file name is the resource type and id.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// Name of the file within the upload, e.g. `Patient/<uuid>`
    pub name: NonEmptyText,

    /// Hashing algorithm used (always "sha256" for current implementation)
    pub hash_algorithm: NonEmptyText,

    /// Hexadecimal digest of the file content
    pub hash: Sha256Hash,

    /// Path relative to the store root where the blob is stored
    pub relative_path: NonEmptyText,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Detected media type (MIME type), if available
    ///
    /// This is a best-effort detection and should not be considered authoritative.
    pub media_type: Option<NonEmptyText>,

    /// UTC timestamp when the file was stored
    pub stored_at: DateTime<Utc>,
}

/// Listing of one upload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct DirectoryManifest {
    pub cid: ContentId,
    pub files: Vec<FileMetadata>,
    pub created_at: DateTime<Utc>,
}

impl DirectoryManifest {
    pub fn file(&self, name: &str) -> Option<&FileMetadata> {
        self.files.iter().find(|f| f.name.as_str() == name)
    }
}

/// Storage that addresses uploads by their content.
pub trait ContentStore {
    /// Stores `blobs` as one directory and returns its identifier.
    fn put(&self, blobs: &[NamedBlob]) -> Result<ContentId, FilesError>;

    /// Reads the file called `name` from the directory `cid`.
    fn get(&self, cid: &ContentId, name: &str) -> Result<Vec<u8>, FilesError>;
}

/// Filesystem-backed [`ContentStore`].
#[derive(Debug)]
pub struct LocalContentStore {
    /// Canonicalised store root
    root_directory: PathBuf,
}

impl LocalContentStore {
    /// Opens the store at `root_directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the path exists but is not a directory
    /// - the directory cannot be created or canonicalised
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory)?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Reads the manifest of an upload.
    pub fn manifest(&self, cid: &ContentId) -> Result<DirectoryManifest, FilesError> {
        let path = self.manifest_path(cid);
        if !path.exists() {
            return Err(FilesError::NotFound(format!("content id {cid}")));
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    fn store_blob(&self, blob: &NamedBlob) -> Result<FileMetadata, FilesError> {
        let hash = Sha256Hash::digest(blob.bytes());
        let relative_path = Self::compute_relative_path(&hash);
        let storage_path = self.root_directory.join(relative_path.as_str());

        // Identical content is already present.
        if !storage_path.exists() {
            write_atomically(&storage_path, blob.bytes())?;
        }

        let media_type = infer::get(blob.bytes())
            .map(|kind| NonEmptyText::new(kind.mime_type()).expect("mime type is non-empty"));

        Ok(FileMetadata {
            name: NonEmptyText::new(blob.name()).expect("validated blob names are non-empty"),
            hash_algorithm: NonEmptyText::new("sha256").expect("sha256 is non-empty"),
            hash,
            relative_path,
            size_bytes: blob.bytes().len() as u64,
            media_type,
            stored_at: Utc::now(),
        })
    }

    /// Relative path of a blob: `blobs/sha256/<s1>/<s2>/<hash>`
    fn compute_relative_path(hash: &Sha256Hash) -> NonEmptyText {
        let base = Path::new(BLOBS_FOLDER_NAME).join("sha256");
        let path = hash.sharded_path(&base);
        NonEmptyText::new(path.to_string_lossy()).expect("computed path is non-empty")
    }

    fn manifest_path(&self, cid: &ContentId) -> PathBuf {
        let hex = cid.as_str();
        self.root_directory
            .join(DIRS_FOLDER_NAME)
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(format!("{hex}.yaml"))
    }
}

impl ContentStore for LocalContentStore {
    fn put(&self, blobs: &[NamedBlob]) -> Result<ContentId, FilesError> {
        if blobs.is_empty() {
            return Err(FilesError::EmptyUpload);
        }

        let mut seen = BTreeSet::new();
        for blob in blobs {
            if !seen.insert(blob.name()) {
                return Err(FilesError::DuplicateName(blob.name().to_owned()));
            }
        }

        let files = blobs
            .iter()
            .map(|blob| self.store_blob(blob))
            .collect::<Result<Vec<_>, _>>()?;

        let cid = ContentId::for_entries(files.iter().map(|f| (f.name.as_str(), &f.hash)));

        let manifest_path = self.manifest_path(&cid);
        if !manifest_path.exists() {
            let manifest = DirectoryManifest {
                cid: cid.clone(),
                files,
                created_at: Utc::now(),
            };
            let yaml = serde_yaml::to_string(&manifest)?;
            write_atomically(&manifest_path, yaml.as_bytes())?;
        }

        tracing::debug!("stored {} file(s) as {}", blobs.len(), cid);
        Ok(cid)
    }

    fn get(&self, cid: &ContentId, name: &str) -> Result<Vec<u8>, FilesError> {
        validate_name(name)?;
        let manifest = self.manifest(cid)?;
        let entry = manifest
            .file(name)
            .ok_or_else(|| FilesError::NotFound(format!("{name} in {cid}")))?;

        let bytes = fs::read(self.root_directory.join(entry.relative_path.as_str()))?;

        let actual = Sha256Hash::digest(&bytes);
        if actual != entry.hash {
            return Err(FilesError::Corrupt {
                expected: entry.hash.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(bytes)
    }
}

/// Writes via a temporary sibling and a rename so readers never see partial files.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), FilesError> {
    let parent = path
        .parent()
        .ok_or_else(|| FilesError::InvalidPath(format!("no parent for {}", path.display())))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{file_name}.tmp"));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
