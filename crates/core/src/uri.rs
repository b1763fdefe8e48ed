//! Profile URIs stored in the registry.
//!
//! ```text
//! https://<cid>.ipfs.dweb.link/<ResourceType>/<uuid>?encHash=<sha256 of plaintext>
//! ```
//!
//! The part before `/<ResourceType>/<uuid>` is the configured gateway template with `{cid}`
//! substituted.

use crate::constants::{CONDITIONS_FILE_SUFFIX, ENC_HASH_PARAM, GATEWAY_CID_PLACEHOLDER};
use crate::{ProfileError, ProfileResult};
use fhir::ResourceKind;
use healthdid_files::ContentId;
use healthdid_uuid::{ResourceId, Sha256Hash};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileUri {
    base: String,
    cid: ContentId,
    kind: ResourceKind,
    resource_id: ResourceId,
    enc_hash: Sha256Hash,
}

impl ProfileUri {
    pub fn new(
        gateway: &str,
        cid: ContentId,
        kind: ResourceKind,
        resource_id: ResourceId,
        enc_hash: Sha256Hash,
    ) -> Self {
        let base = gateway
            .replace(GATEWAY_CID_PLACEHOLDER, cid.as_str())
            .trim_end_matches('/')
            .to_owned();
        Self {
            base,
            cid,
            kind,
            resource_id,
            enc_hash,
        }
    }

    /// Parses a profile URI rendered with the gateway template `gateway`.
    ///
    /// The content identifier is whatever stands in the template's `{cid}` slot.
    pub fn parse(input: &str, gateway: &str) -> ProfileResult<Self> {
        let invalid = |reason: &str| ProfileError::InvalidUri {
            uri: input.to_owned(),
            reason: reason.to_owned(),
        };

        let (location, query) = input
            .trim()
            .split_once('?')
            .ok_or_else(|| invalid("missing query string"))?;

        let enc_hash = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == ENC_HASH_PARAM)
            .map(|(_, value)| value)
            .ok_or_else(|| invalid("missing encHash parameter"))?;
        let enc_hash = Sha256Hash::parse(enc_hash).map_err(|e| invalid(&e.to_string()))?;

        let (rest, id) = location
            .rsplit_once('/')
            .ok_or_else(|| invalid("missing resource id"))?;
        let (base, resource_type) = rest
            .rsplit_once('/')
            .ok_or_else(|| invalid("missing resource type"))?;

        let resource_id = ResourceId::parse(id).map_err(|e| invalid(&e.to_string()))?;
        let kind = resource_type
            .parse::<ResourceKind>()
            .map_err(|e| invalid(&e.to_string()))?;
        if kind.resource_type() != resource_type {
            return Err(invalid("resource type must be written as in FHIR"));
        }

        let (prefix, suffix) = gateway
            .split_once(GATEWAY_CID_PLACEHOLDER)
            .ok_or_else(|| invalid("gateway template has no {cid} placeholder"))?;
        let cid = base
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix.trim_end_matches('/')))
            .ok_or_else(|| invalid("does not match the gateway template"))?;
        let cid = ContentId::parse(cid).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            base: base.to_owned(),
            cid,
            kind,
            resource_id,
            enc_hash,
        })
    }

    pub fn cid(&self) -> &ContentId {
        &self.cid
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn enc_hash(&self) -> &Sha256Hash {
        &self.enc_hash
    }

    /// Name of the ciphertext within the upload, `<ResourceType>/<uuid>`.
    pub fn file_name(&self) -> String {
        format!("{}/{}", self.kind.resource_type(), self.resource_id)
    }

    /// Name of the access policy uploaded next to the ciphertext.
    pub fn conditions_file_name(&self) -> String {
        format!("{}{CONDITIONS_FILE_SUFFIX}", self.file_name())
    }
}

impl fmt::Display for ProfileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}?{}={}",
            self.base,
            self.file_name(),
            ENC_HASH_PARAM,
            self.enc_hash
        )
    }
}
