//! Wire representations of the FHIR datatypes shared by Patient and Organization.

use crate::{FhirError, FhirResult};
use healthdid_record::Record;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Identifier system marking the entry that carries the profile's DID.
pub const DID_IDENTIFIER_SYSTEM: &str = "https://www.w3.org/ns/did";

/// Code system of the identifier type codes (DL, MR, NPI, ...).
pub const IDENTIFIER_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";

/// Code system of the organization type codes.
pub const ORGANIZATION_TYPE_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/organization-type";

// Fields are parsed for schema strictness; summaries read only some of them.
#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HumanNameWire {
    #[serde(rename = "use", default)]
    pub use_type: Option<String>,

    #[serde(default)]
    pub family: Option<String>,

    #[serde(default)]
    pub given: Vec<String>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ContactPointWire {
    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(rename = "use", default)]
    pub use_type: Option<String>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AddressWire {
    #[serde(rename = "use", default)]
    pub use_type: Option<String>,

    #[serde(default)]
    pub line: Vec<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,

    #[serde(default)]
    pub country: Option<String>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CodingWire {
    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub display: Option<String>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CodeableConceptWire {
    #[serde(default)]
    pub coding: Vec<CodingWire>,

    #[serde(default)]
    pub text: Option<String>,
}

impl CodeableConceptWire {
    /// First non-empty code, if any.
    pub fn first_code(&self) -> Option<&str> {
        self.coding
            .iter()
            .filter_map(|c| c.code.as_deref())
            .find(|code| !code.is_empty())
    }
}

#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct IdentifierWire {
    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(rename = "type", default)]
    pub type_: Option<CodeableConceptWire>,
}

/// Returns the DID stored in the identifier list, ignoring empty placeholders.
pub(crate) fn did_identifier(identifiers: &[IdentifierWire]) -> Option<String> {
    identifiers
        .iter()
        .filter(|id| id.system.as_deref() == Some(DID_IDENTIFIER_SYSTEM))
        .filter_map(|id| id.value.clone())
        .find(|value| !value.is_empty())
}

/// Returns `(type code, value)` for the first typed identifier with a code.
pub(crate) fn typed_identifier(identifiers: &[IdentifierWire]) -> Option<(String, String)> {
    identifiers.iter().find_map(|id| {
        let code = id.type_.as_ref()?.first_code()?;
        Some((code.to_owned(), id.value.clone().unwrap_or_default()))
    })
}

/// Maps an empty string to `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Deserializes `record` into a strict wire struct, reporting the failing path on mismatch.
pub(crate) fn from_record<T: DeserializeOwned>(record: &Record, resource: &str) -> FhirResult<T> {
    let value = record.to_value();

    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(FhirError::Translation(format!(
                "{resource} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// Checks the `resourceType` discriminator.
pub(crate) fn expect_resource_type(found: &str, expected: &str) -> FhirResult<()> {
    if found != expected {
        return Err(FhirError::InvalidInput(format!(
            "Expected resourceType '{expected}', got '{found}'"
        )));
    }
    Ok(())
}

/// Parses a resource id that is either empty (not yet assigned) or a canonical UUID.
pub(crate) fn parse_resource_id(
    id: Option<String>,
) -> FhirResult<Option<healthdid_uuid::ResourceId>> {
    match non_empty(id) {
        None => Ok(None),
        Some(id) => healthdid_uuid::ResourceId::parse(&id)
            .map(Some)
            .map_err(|e| FhirError::InvalidInput(format!("invalid resource id: {e}"))),
    }
}
