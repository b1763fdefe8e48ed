//! Constants used throughout the healthdid core crate.
//!
//! Directory names, file names and configuration defaults live here so the CLI, the REST
//! server and the tests agree on the on-disk layout.

/// Default directory for all local state when `HEALTHDID_DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "healthdid_data";

/// Chain used when `HEALTHDID_CHAIN_ID` is unset.
pub const DEFAULT_CHAIN_ID: u64 = 5;

/// Gateway URL template; `{cid}` is replaced by the content identifier.
pub const DEFAULT_GATEWAY: &str = "https://{cid}.ipfs.dweb.link";

/// Placeholder substituted in the gateway template.
pub const GATEWAY_CID_PLACEHOLDER: &str = "{cid}";

/// Confirmations reported on registry receipts when `HEALTHDID_BLOCK_CONFIRMATIONS` is unset.
pub const DEFAULT_BLOCK_CONFIRMATIONS: u64 = 10;

/// Directory name for the content-addressed store.
pub const CONTENT_DIR_NAME: &str = "ipfs";

/// Directory name for plaintext download copies of submitted profiles.
pub const EXPORTS_DIR_NAME: &str = "exports";

/// Filename for the registry ledger.
pub const REGISTRY_FILE_NAME: &str = "registry.yaml";

/// Filename for the generated master encryption key.
pub const ENCRYPTION_KEY_FILE_NAME: &str = "encryption.key";

/// Suffix of the uploaded file holding the access policy next to its ciphertext.
pub const CONDITIONS_FILE_SUFFIX: &str = ".conditions.json";

/// Prefix of every health DID.
pub const DID_METHOD_PREFIX: &str = "did:health:";

/// Query parameter carrying the plaintext hash on profile URIs.
pub const ENC_HASH_PARAM: &str = "encHash";

/// Record path the DID is written to on submit.
pub const DID_IDENTIFIER_PATH: &str = "identifier.0.value";
