//! Reading a registered profile back.

use crate::config::CoreConfig;
use crate::did::DidName;
use crate::error::{ProfileError, ProfileResult};
use crate::profile::Collaborators;
use crate::uri::ProfileUri;
use healthdid_crypto::{AccessPolicy, AuthSig};
use healthdid_record::Record;
use healthdid_registry::HealthDid;

/// A decrypted profile and where it came from.
#[derive(Clone, Debug)]
pub struct RetrievedProfile {
    pub entry: HealthDid,
    pub uri: ProfileUri,
    pub record: Record,
}

/// Looks up the registry entry for a DID or registry id.
pub fn resolve(
    cfg: &CoreConfig,
    collaborators: &Collaborators,
    did_or_registry_id: &str,
) -> ProfileResult<HealthDid> {
    let did = DidName::parse(did_or_registry_id)?;
    if did.chain() != cfg.chain_id() {
        return Err(ProfileError::ChainMismatch {
            expected: cfg.chain_id(),
            found: did.chain(),
        });
    }
    collaborators
        .registry
        .get_health_did(&did.registry_id())
        .map_err(ProfileError::Resolve)
}

/// Resolves `did_or_registry_id`, downloads the ciphertext its URI names and decrypts it for the
/// wallet behind `auth_sig`.
///
/// # Errors
///
/// Retrieval errors when the DID is unknown, the stored URI is malformed, the files are missing
/// or the wallet does not satisfy the profile's access policy.
pub fn fetch_profile(
    cfg: &CoreConfig,
    collaborators: &Collaborators,
    did_or_registry_id: &str,
    auth_sig: &AuthSig,
) -> ProfileResult<RetrievedProfile> {
    let entry = resolve(cfg, collaborators, did_or_registry_id)?;
    let uri = ProfileUri::parse(&entry.ipfs_uri, cfg.gateway())?;

    let ciphertext = collaborators
        .store
        .get(uri.cid(), &uri.file_name())
        .map_err(ProfileError::Download)?;
    let policy_json = collaborators
        .store
        .get(uri.cid(), &uri.conditions_file_name())
        .map_err(ProfileError::Download)?;
    let policy: AccessPolicy =
        serde_json::from_slice(&policy_json).map_err(ProfileError::Deserialization)?;

    let ciphertext = String::from_utf8(ciphertext).map_err(|_| ProfileError::InvalidUri {
        uri: entry.ipfs_uri.clone(),
        reason: "ciphertext is not base64 text".into(),
    })?;
    let plaintext = collaborators
        .encryptor
        .decrypt(&policy, auth_sig, cfg.chain_id(), &ciphertext, uri.enc_hash())
        .map_err(ProfileError::Decryption)?;
    let record = Record::from_json_slice(&plaintext).map_err(ProfileError::Deserialization)?;

    tracing::info!("retrieved {} from {}", entry.health_did, uri.cid());
    Ok(RetrievedProfile { entry, uri, record })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::testing::{filled_patient, setup};
    use crate::ErrorKind;
    use healthdid_crypto::{AccessControlCondition, CryptoError, Wallet};

    #[test]
    fn owner_fetches_registered_profile() {
        let (_temp, cfg, collaborators) = setup();
        let wallet = Wallet::generate();
        let auth = wallet.sign_auth_message(cfg.chain_id(), None);

        let registered = filled_patient(cfg.clone(), collaborators.clone())
            .submit(&auth, &[])
            .unwrap()
            .register(&auth)
            .unwrap();

        let fetched = fetch_profile(&cfg, &collaborators, "did:health:000005sarah", &auth).unwrap();
        assert_eq!(fetched.record, registered.submission().record);
        assert_eq!(fetched.entry.owner, wallet.address());
        assert_eq!(fetched.uri, registered.submission().uri);
    }

    #[test]
    fn grantee_can_fetch_but_stranger_cannot() {
        let (_temp, cfg, collaborators) = setup();
        let owner = Wallet::generate();
        let doctor = Wallet::generate();
        let stranger = Wallet::generate();
        let owner_auth = owner.sign_auth_message(cfg.chain_id(), None);

        filled_patient(cfg.clone(), collaborators.clone())
            .submit(
                &owner_auth,
                &[AccessControlCondition::wallet_owner(&doctor.address())],
            )
            .unwrap()
            .register(&owner_auth)
            .unwrap();

        let doctor_auth = doctor.sign_auth_message(cfg.chain_id(), None);
        assert!(fetch_profile(&cfg, &collaborators, "000005sarah", &doctor_auth).is_ok());

        let stranger_auth = stranger.sign_auth_message(cfg.chain_id(), None);
        let err = fetch_profile(&cfg, &collaborators, "000005sarah", &stranger_auth).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Decryption(CryptoError::AccessDenied(_))
        ));
        assert_eq!(err.kind(), ErrorKind::Retrieval);
    }

    #[test]
    fn unknown_did_is_not_found() {
        let (_temp, cfg, collaborators) = setup();
        let auth = Wallet::generate().sign_auth_message(cfg.chain_id(), None);

        let err = fetch_profile(&cfg, &collaborators, "000005nobody", &auth).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::Retrieval);
    }

    #[test]
    fn other_chain_is_rejected() {
        let (_temp, cfg, collaborators) = setup();
        assert!(matches!(
            resolve(&cfg, &collaborators, "080001sarah"),
            Err(ProfileError::ChainMismatch { .. })
        ));
    }
}
