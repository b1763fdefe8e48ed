use fhir::FhirError;
use healthdid_crypto::CryptoError;
use healthdid_files::FilesError;
use healthdid_record::PathError;
use healthdid_registry::RegistryError;
use healthdid_types::ChainId;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("a DID suffix is required before submitting")]
    MissingDidSuffix,
    #[error("invalid DID suffix '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidDidSuffix(String),
    #[error("auth signature is for chain {found}, expected {expected}")]
    ChainMismatch { expected: ChainId, found: ChainId },
    #[error("invalid field path: {0}")]
    Path(#[from] PathError),
    #[error("resource validation failed: {0}")]
    Fhir(#[from] FhirError),

    #[error("failed to serialize profile: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to write export file: {0}")]
    Export(std::io::Error),

    #[error("encryption failed: {0}")]
    Encryption(CryptoError),

    #[error("upload failed: {0}")]
    Upload(FilesError),

    #[error("failed to authenticate registry sender: {0}")]
    SenderAuthentication(CryptoError),
    #[error("registry write failed: {0}")]
    ChainWrite(RegistryError),

    #[error("failed to resolve DID: {0}")]
    Resolve(RegistryError),
    #[error("invalid profile URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("failed to download profile: {0}")]
    Download(FilesError),
    #[error("failed to decrypt profile: {0}")]
    Decryption(CryptoError),
    #[error("downloaded profile is not valid JSON: {0}")]
    Deserialization(serde_json::Error),
}

pub type ProfileResult<T> = std::result::Result<T, ProfileError>;

/// The workflow stage a [`ProfileError`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    Validation,
    Encryption,
    Upload,
    ChainWrite,
    Export,
    Retrieval,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Encryption => "encryption",
            ErrorKind::Upload => "upload",
            ErrorKind::ChainWrite => "chain write",
            ErrorKind::Export => "export",
            ErrorKind::Retrieval => "retrieval",
        };
        f.write_str(name)
    }
}

impl ProfileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProfileError::InvalidInput(_)
            | ProfileError::Config(_)
            | ProfileError::MissingDidSuffix
            | ProfileError::InvalidDidSuffix(_)
            | ProfileError::ChainMismatch { .. }
            | ProfileError::Path(_)
            | ProfileError::Fhir(_) => ErrorKind::Validation,
            ProfileError::Serialization(_) | ProfileError::Export(_) => ErrorKind::Export,
            ProfileError::Encryption(_) => ErrorKind::Encryption,
            ProfileError::Upload(_) => ErrorKind::Upload,
            ProfileError::SenderAuthentication(_) | ProfileError::ChainWrite(_) => {
                ErrorKind::ChainWrite
            }
            ProfileError::Resolve(_)
            | ProfileError::InvalidUri { .. }
            | ProfileError::Download(_)
            | ProfileError::Decryption(_)
            | ProfileError::Deserialization(_) => ErrorKind::Retrieval,
        }
    }

    /// True when the error means a DID or stored file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ProfileError::Resolve(RegistryError::NotFound(_))
                | ProfileError::ChainWrite(RegistryError::NotFound(_))
                | ProfileError::Download(FilesError::NotFound(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_workflow_stage() {
        assert_eq!(ProfileError::MissingDidSuffix.kind(), ErrorKind::Validation);
        assert_eq!(
            ProfileError::Encryption(CryptoError::Encrypt).kind(),
            ErrorKind::Encryption
        );
        assert_eq!(
            ProfileError::Upload(FilesError::EmptyUpload).kind(),
            ErrorKind::Upload
        );
        assert_eq!(
            ProfileError::ChainWrite(RegistryError::TransferToSelf).kind(),
            ErrorKind::ChainWrite
        );
        assert_eq!(
            ProfileError::Export(std::io::Error::other("disk full")).kind(),
            ErrorKind::Export
        );
        assert_eq!(
            ProfileError::Decryption(CryptoError::Decrypt).kind(),
            ErrorKind::Retrieval
        );
    }

    #[test]
    fn not_found_is_detected_across_stages() {
        assert!(ProfileError::Resolve(RegistryError::NotFound("000005x".into())).is_not_found());
        assert!(ProfileError::Download(FilesError::NotFound("cid".into())).is_not_found());
        assert!(!ProfileError::MissingDidSuffix.is_not_found());
    }
}
