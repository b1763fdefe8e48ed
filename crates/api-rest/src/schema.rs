//! Request and response bodies.

use fhir::{FormField, InputKind, SelectOption};
use healthdid_crypto::AuthSig;
use healthdid_registry::{HealthDid, TxReceipt};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SelectOptionRes {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FieldRes {
    /// Dotted path written by `PUT /forms/{id}/fields`.
    pub name: String,
    pub label: String,
    /// One of `text`, `date`, `tel`, `email`, `select`.
    pub input: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOptionRes>,
}

impl From<&FormField> for FieldRes {
    fn from(field: &FormField) -> Self {
        let (input, options): (&str, &[SelectOption]) = match field.input {
            InputKind::Text => ("text", &[]),
            InputKind::Date => ("date", &[]),
            InputKind::Tel => ("tel", &[]),
            InputKind::Email => ("email", &[]),
            InputKind::Select(options) => ("select", options),
        };
        Self {
            name: field.name.into(),
            label: field.label.into(),
            input: input.into(),
            options: options
                .iter()
                .map(|o| SelectOptionRes {
                    value: o.value.into(),
                    label: o.label.into(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FieldsRes {
    pub kind: String,
    pub fields: Vec<FieldRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateFormReq {
    /// `Patient` or `Organization`.
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormRes {
    pub id: String,
    pub kind: String,
    /// `draft`, `submitted` or `registered`.
    pub status: String,
    pub did_suffix: Option<String>,
    /// DID the form will register, once a suffix is set.
    pub did: Option<String>,
    #[schema(value_type = Object)]
    pub record: serde_json::Value,
    pub uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetFieldReq {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetFieldRes {
    /// False when the path runs through a non-empty scalar and the write was dropped.
    pub applied: bool,
    pub form: FormRes,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetDidReq {
    pub suffix: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReq {
    #[schema(value_type = Object)]
    pub auth_sig: AuthSig,
    /// Wallet addresses that may also decrypt the profile.
    #[serde(default)]
    pub allow: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitRes {
    pub did: String,
    pub registry_id: String,
    pub resource_id: String,
    pub content_id: String,
    pub uri: String,
    pub export_path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
    #[schema(value_type = Object)]
    pub auth_sig: AuthSig,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRes {
    pub did: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub confirmations: u64,
}

impl RegisterRes {
    pub fn new(did: String, receipt: &TxReceipt) -> Self {
        Self {
            did,
            tx_hash: receipt.tx_hash.clone(),
            block_number: receipt.block_number,
            confirmations: receipt.confirmations,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DidRes {
    pub health_did: String,
    pub owner: String,
    pub delegate_addresses: Vec<String>,
    pub ipfs_uri: String,
    pub alt_ipfs_uris: Vec<String>,
    pub reputation_score: u8,
    pub has_world_id: bool,
    pub has_polygon_id: bool,
    pub has_social_id: bool,
}

impl From<HealthDid> for DidRes {
    fn from(entry: HealthDid) -> Self {
        Self {
            health_did: entry.health_did,
            owner: entry.owner.to_string(),
            delegate_addresses: entry
                .delegate_addresses
                .iter()
                .map(ToString::to_string)
                .collect(),
            ipfs_uri: entry.ipfs_uri,
            alt_ipfs_uris: entry.alt_ipfs_uris,
            reputation_score: entry.reputation_score,
            has_world_id: entry.has_world_id,
            has_polygon_id: entry.has_polygon_id,
            has_social_id: entry.has_social_id,
        }
    }
}
