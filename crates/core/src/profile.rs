//! Profile submission and registration.
//!
//! A profile moves through three states:
//!
//! ```text
//! Draft ──submit──▶ Submitted ──register──▶ Registered
//! ```
//!
//! - **submit** stamps the DID and a fresh resource id into the form's record, validates it,
//!   exports a plaintext copy, encrypts it for the signer (plus any extra grants) and uploads the
//!   ciphertext to the content store.
//! - **register** writes the DID and the resulting profile URI to the registry.
//!
//! Both transitions borrow the current state and return a new service, so a failed stage can be
//! retried from where it stopped.

use crate::config::CoreConfig;
use crate::constants::{CONDITIONS_FILE_SUFFIX, DID_IDENTIFIER_PATH};
use crate::did::DidName;
use crate::error::{ProfileError, ProfileResult};
use crate::export::write_export;
use crate::form::ProfileForm;
use crate::uri::ProfileUri;
use chrono::Utc;
use fhir::{ResourceKind, ResourceSummary};
use healthdid_crypto::{
    AccessControlCondition, AccessPolicy, AuthSig, Encryptor, LocalKeyEncryptor, MasterKey,
    WalletAddress,
};
use healthdid_files::{ContentId, ContentStore, LocalContentStore, NamedBlob};
use healthdid_record::Record;
use healthdid_registry::{DidRegistry, LocalRegistry, TxReceipt};
use healthdid_uuid::ResourceId;
use std::path::PathBuf;
use std::sync::Arc;

/// The external services a profile is written to.
#[derive(Clone)]
pub struct Collaborators {
    pub encryptor: Arc<dyn Encryptor + Send + Sync>,
    pub store: Arc<dyn ContentStore + Send + Sync>,
    pub registry: Arc<dyn DidRegistry + Send + Sync>,
}

impl Collaborators {
    pub fn new(
        encryptor: Arc<dyn Encryptor + Send + Sync>,
        store: Arc<dyn ContentStore + Send + Sync>,
        registry: Arc<dyn DidRegistry + Send + Sync>,
    ) -> Self {
        Self {
            encryptor,
            store,
            registry,
        }
    }

    /// File-backed collaborators rooted at the configured data directory.
    ///
    /// Uses the configured master key, or the key file in the data directory (created on first
    /// use).
    pub fn local(cfg: &CoreConfig) -> ProfileResult<Self> {
        let master = match cfg.encryption_key() {
            Some(key) => key.clone(),
            None => MasterKey::load_or_create(&cfg.encryption_key_path())
                .map_err(|e| ProfileError::Config(format!("encryption key: {e}")))?,
        };
        let store = LocalContentStore::new(&cfg.content_dir())
            .map_err(|e| ProfileError::Config(format!("content store: {e}")))?;
        let registry = LocalRegistry::open(
            &cfg.registry_path(),
            cfg.chain_id(),
            cfg.block_confirmations(),
        )
        .map_err(|e| ProfileError::Config(format!("registry: {e}")))?;

        Ok(Self::new(
            Arc::new(LocalKeyEncryptor::new(master)),
            Arc::new(store),
            Arc::new(registry),
        ))
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

// ============================================================================
// TYPE-STATE MARKERS
// ============================================================================

/// Marker type: the form is still being edited.
#[derive(Clone, Debug)]
pub struct Draft {
    form: ProfileForm,
}

/// Marker type: the encrypted profile is uploaded but not yet registered.
#[derive(Clone, Debug)]
pub struct Submitted {
    submission: Submission,
}

/// Marker type: the DID points at the uploaded profile.
#[derive(Clone, Debug)]
pub struct Registered {
    submission: Submission,
    receipt: TxReceipt,
}

/// Everything produced by a successful submit.
#[derive(Clone, Debug)]
pub struct Submission {
    /// The form as it was when submitted.
    pub form: ProfileForm,
    pub did: DidName,
    pub resource_id: ResourceId,
    /// The record exactly as serialized, exported and encrypted.
    pub record: Record,
    pub summary: ResourceSummary,
    pub signer: WalletAddress,
    pub policy: AccessPolicy,
    pub export_path: PathBuf,
    pub content_id: ContentId,
    pub uri: ProfileUri,
}

// ============================================================================
// PROFILE SERVICE
// ============================================================================

/// Drives one profile from form to registered DID.
///
/// Generic parameter `S` is one of [`Draft`], [`Submitted`] or [`Registered`].
#[derive(Clone, Debug)]
pub struct ProfileService<S> {
    cfg: Arc<CoreConfig>,
    collaborators: Collaborators,
    state: S,
}

impl<S> ProfileService<S> {
    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }
}

impl ProfileService<Draft> {
    pub fn new(cfg: Arc<CoreConfig>, collaborators: Collaborators, form: ProfileForm) -> Self {
        Self {
            cfg,
            collaborators,
            state: Draft { form },
        }
    }

    pub fn form(&self) -> &ProfileForm {
        &self.state.form
    }

    pub fn form_mut(&mut self) -> &mut ProfileForm {
        &mut self.state.form
    }

    /// Encrypts the profile for the signer of `auth_sig` and uploads it.
    ///
    /// Each condition in `grants` is added as an alternative to the signer's own condition, so
    /// any wallet satisfying one of them can decrypt too.
    ///
    /// # Errors
    ///
    /// - Validation: no DID suffix, the auth signature names another chain, or the completed
    ///   record fails resource validation.
    /// - Export: the record cannot be serialized or the download copy cannot be written.
    /// - Encryption: the auth signature does not verify or a grant is unsupported.
    /// - Upload: the content store rejects the files.
    pub fn submit(
        &self,
        auth_sig: &AuthSig,
        grants: &[AccessControlCondition],
    ) -> ProfileResult<ProfileService<Submitted>> {
        let form = &self.state.form;
        let chain = self.cfg.chain_id();
        let suffix = form.did_suffix().ok_or(ProfileError::MissingDidSuffix)?;
        let did = DidName::new(chain, suffix)?;
        check_auth_chain(auth_sig, &self.cfg)?;

        let kind = form.kind();
        let resource_id = ResourceId::new();
        let mut record = form.record().clone();
        record.apply(DID_IDENTIFIER_PATH, did.did())?;
        record.apply("id", resource_id.to_string())?;
        let summary = kind.validate(&record)?;

        let json = record.to_json_bytes().map_err(ProfileError::Serialization)?;
        let export_path =
            write_export(&self.cfg.exports_dir(), &resource_id, &json).map_err(ProfileError::Export)?;
        tracing::info!("exported {} to {}", summary, export_path.display());

        let signer = auth_sig
            .verify(Utc::now())
            .map_err(ProfileError::Encryption)?;
        let policy = grants
            .iter()
            .cloned()
            .fold(AccessPolicy::owner(&signer), AccessPolicy::or);
        policy.validate().map_err(ProfileError::Encryption)?;

        let encrypted = self
            .collaborators
            .encryptor
            .encrypt(&policy, auth_sig, chain, &json)
            .map_err(ProfileError::Encryption)?;
        tracing::info!(
            "encrypted {} for {} ({} grants)",
            did,
            signer,
            grants.len()
        );

        let policy_json = policy.canonical_json().map_err(ProfileError::Encryption)?;
        let file_name = format!("{}/{}", kind.resource_type(), resource_id);
        let files = [
            NamedBlob::new(file_name.clone(), encrypted.ciphertext.into_bytes()),
            NamedBlob::new(
                format!("{file_name}{CONDITIONS_FILE_SUFFIX}"),
                policy_json,
            ),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(ProfileError::Upload)?;

        let content_id = self
            .collaborators
            .store
            .put(&files)
            .map_err(ProfileError::Upload)?;

        let uri = ProfileUri::new(
            self.cfg.gateway(),
            content_id.clone(),
            kind,
            resource_id,
            encrypted.data_to_encrypt_hash,
        );
        tracing::info!("uploaded {} as {}", did, uri);

        Ok(ProfileService {
            cfg: self.cfg.clone(),
            collaborators: self.collaborators.clone(),
            state: Submitted {
                submission: Submission {
                    form: form.clone(),
                    did,
                    resource_id,
                    record,
                    summary,
                    signer,
                    policy,
                    export_path,
                    content_id,
                    uri,
                },
            },
        })
    }
}

impl ProfileService<Submitted> {
    pub fn submission(&self) -> &Submission {
        &self.state.submission
    }

    pub fn uri(&self) -> &ProfileUri {
        &self.state.submission.uri
    }

    /// Registers the DID with the uploaded profile's URI on behalf of the signer of `auth_sig`.
    pub fn register(&self, auth_sig: &AuthSig) -> ProfileResult<ProfileService<Registered>> {
        let submission = &self.state.submission;
        let receipt = register_uri(
            &self.cfg,
            &self.collaborators,
            &submission.did,
            &submission.uri,
            auth_sig,
        )?;

        Ok(ProfileService {
            cfg: self.cfg.clone(),
            collaborators: self.collaborators.clone(),
            state: Registered {
                submission: submission.clone(),
                receipt,
            },
        })
    }
}

impl ProfileService<Registered> {
    pub fn submission(&self) -> &Submission {
        &self.state.submission
    }

    pub fn receipt(&self) -> &TxReceipt {
        &self.state.receipt
    }
}

/// Registers `did` with `uri` for the wallet behind `auth_sig`.
///
/// Used by [`ProfileService::register`] and for registering a profile uploaded earlier.
pub fn register_uri(
    cfg: &CoreConfig,
    collaborators: &Collaborators,
    did: &DidName,
    uri: &ProfileUri,
    auth_sig: &AuthSig,
) -> ProfileResult<TxReceipt> {
    if did.chain() != cfg.chain_id() {
        return Err(ProfileError::ChainMismatch {
            expected: cfg.chain_id(),
            found: did.chain(),
        });
    }
    check_auth_chain(auth_sig, cfg)?;

    let sender = auth_sig
        .verify(Utc::now())
        .map_err(ProfileError::SenderAuthentication)?;
    let receipt = collaborators
        .registry
        .register_did(&sender, &did.registry_id(), &uri.to_string())
        .map_err(ProfileError::ChainWrite)?;

    tracing::info!(
        "registered {} in block {} (tx {}, {} confirmations)",
        did,
        receipt.block_number,
        receipt.tx_hash,
        receipt.confirmations
    );
    Ok(receipt)
}

fn check_auth_chain(auth_sig: &AuthSig, cfg: &CoreConfig) -> ProfileResult<()> {
    let found = auth_sig
        .chain_id()
        .map_err(|e| ProfileError::InvalidInput(format!("auth signature: {e}")))?;
    if found != cfg.chain_id() {
        return Err(ProfileError::ChainMismatch {
            expected: cfg.chain_id(),
            found,
        });
    }
    Ok(())
}

/// Starts a draft for a new form of `kind`.
pub fn draft(
    cfg: Arc<CoreConfig>,
    collaborators: Collaborators,
    kind: ResourceKind,
) -> ProfileService<Draft> {
    ProfileService::new(cfg, collaborators, ProfileForm::new(kind))
}

/// Test helpers shared by the workflow and retrieval tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use healthdid_types::ChainId;
    use std::path::Path;
    use tempfile::TempDir;

    pub(crate) fn config(dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(
                dir.to_path_buf(),
                ChainId::new(5).expect("valid chain"),
                crate::constants::DEFAULT_GATEWAY.into(),
                2,
                Some(MasterKey::generate()),
            )
            .expect("CoreConfig::new should succeed"),
        )
    }

    pub(crate) fn setup() -> (TempDir, Arc<CoreConfig>, Collaborators) {
        let temp = TempDir::new().expect("tempdir");
        let cfg = config(temp.path());
        let collaborators = Collaborators::local(&cfg).expect("local collaborators");
        (temp, cfg, collaborators)
    }

    pub(crate) fn filled_patient(
        cfg: Arc<CoreConfig>,
        collaborators: Collaborators,
    ) -> ProfileService<Draft> {
        let mut service = draft(cfg, collaborators, ResourceKind::Patient);
        let form = service.form_mut();
        form.set_field("name.0.family", "Williams").expect("family");
        form.set_field("name.0.given", "Sarah").expect("given");
        form.set_field("gender", "female").expect("gender");
        form.set_field("birthDate", "1990-04-12").expect("birthDate");
        form.set_did_suffix("sarah").expect("suffix");
        service
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use healthdid_crypto::Wallet;
    use healthdid_registry::RegistryError;
    use healthdid_types::ChainId;

    #[test]
    fn submit_uploads_encrypted_profile() {
        let (_temp, cfg, collaborators) = setup();
        let wallet = Wallet::generate();
        let auth = wallet.sign_auth_message(cfg.chain_id(), None);

        let service = filled_patient(cfg.clone(), collaborators.clone());
        let submitted = service.submit(&auth, &[]).unwrap();
        let submission = submitted.submission();

        assert_eq!(submission.did.did(), "did:health:000005sarah");
        assert_eq!(submission.signer, wallet.address());
        assert_eq!(
            submission.record.get_str(DID_IDENTIFIER_PATH),
            Some("did:health:000005sarah")
        );
        assert_eq!(
            submission.record.get_str("id"),
            Some(submission.resource_id.to_string().as_str())
        );
        assert_eq!(submission.summary.did(), Some("did:health:000005sarah"));

        // the export holds exactly the bytes that were encrypted
        let exported = std::fs::read(&submission.export_path).unwrap();
        assert_eq!(exported, submission.record.to_json_bytes().unwrap());
        assert_eq!(
            submission.uri.enc_hash(),
            &healthdid_uuid::Sha256Hash::digest(&exported)
        );

        // the upload holds ciphertext, never the plaintext
        let stored = collaborators
            .store
            .get(&submission.content_id, &submission.uri.file_name())
            .unwrap();
        assert_ne!(stored, exported);
        assert!(submission.uri.to_string().starts_with(&format!(
            "https://{}.ipfs.dweb.link/Patient/{}?encHash=",
            submission.content_id, submission.resource_id
        )));

        // the draft is untouched and can be submitted again
        assert_eq!(service.form().record().get_str("id"), Some(""));
    }

    #[test]
    fn submit_requires_did_suffix() {
        let (_temp, cfg, collaborators) = setup();
        let auth = Wallet::generate().sign_auth_message(cfg.chain_id(), None);
        let service = draft(cfg, collaborators, ResourceKind::Organization);

        let err = service.submit(&auth, &[]).unwrap_err();
        assert!(matches!(err, ProfileError::MissingDidSuffix));
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn submit_rejects_invalid_record() {
        let (temp, cfg, collaborators) = setup();
        let auth = Wallet::generate().sign_auth_message(cfg.chain_id(), None);
        let mut service = draft(cfg, collaborators, ResourceKind::Patient);
        service.form_mut().set_did_suffix("x").unwrap();
        service.form_mut().set_field("nickname", "Sal").unwrap();

        let err = service.submit(&auth, &[]).unwrap_err();
        assert!(matches!(err, ProfileError::Fhir(_)));
        assert!(!temp.path().join("exports").exists());
    }

    #[test]
    fn submit_rejects_auth_for_other_chain() {
        let (_temp, cfg, collaborators) = setup();
        let auth = Wallet::generate().sign_auth_message(ChainId::new(80001).unwrap(), None);
        let service = filled_patient(cfg, collaborators);

        assert!(matches!(
            service.submit(&auth, &[]),
            Err(ProfileError::ChainMismatch { .. })
        ));
    }

    #[test]
    fn submit_rejects_expired_auth() {
        let (_temp, cfg, collaborators) = setup();
        let wallet = Wallet::generate();
        let issued = Utc::now() - chrono::Duration::hours(48);
        let auth =
            wallet.sign_auth_message_at(cfg.chain_id(), issued, issued + chrono::Duration::hours(1));
        let service = filled_patient(cfg, collaborators);

        let err = service.submit(&auth, &[]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Encryption);
    }

    #[test]
    fn register_writes_registry_entry() {
        let (_temp, cfg, collaborators) = setup();
        let wallet = Wallet::generate();
        let auth = wallet.sign_auth_message(cfg.chain_id(), None);

        let submitted = filled_patient(cfg.clone(), collaborators.clone())
            .submit(&auth, &[])
            .unwrap();
        let registered = submitted.register(&auth).unwrap();

        assert_eq!(registered.receipt().method, "register_did");
        assert_eq!(registered.receipt().confirmations, 2);
        let entry = collaborators.registry.get_health_did("000005sarah").unwrap();
        assert_eq!(entry.owner, wallet.address());
        assert_eq!(entry.ipfs_uri, submitted.uri().to_string());

        // a second registration of the same DID fails and leaves the entry alone
        let err = submitted.register(&auth).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::ChainWrite(RegistryError::AlreadyExists(_))
        ));
        assert_eq!(err.kind(), crate::ErrorKind::ChainWrite);
    }
}
