//! FHIR Organization: skeleton, strict wire model and validation.

use crate::datatypes::{
    did_identifier, expect_resource_type, from_record, non_empty, parse_resource_id,
    typed_identifier, AddressWire, CodeableConceptWire, ContactPointWire, IdentifierWire,
    DID_IDENTIFIER_SYSTEM, IDENTIFIER_TYPE_SYSTEM, ORGANIZATION_TYPE_SYSTEM,
};
use crate::fields::{ORGANIZATION_FIELDS, ORGANIZATION_TYPES};
use crate::{FhirError, FhirResult, FormField};
use healthdid_record::Record;
use healthdid_uuid::ResourceId;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

pub const RESOURCE_TYPE: &str = "Organization";

/// Fields extracted from a validated organization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrganizationSummary {
    pub id: Option<ResourceId>,
    pub name: Option<String>,
    /// Code from the organization-type code system, e.g. `prov`.
    pub org_type: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub identifier: Option<(String, String)>,
    pub did: Option<String>,
}

impl fmt::Display for OrganizationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Organization {}",
            self.name.as_deref().unwrap_or("<unnamed>")
        )?;
        if let Some(code) = &self.org_type {
            write!(f, " ({code})")?;
        }
        Ok(())
    }
}

/// Organization resource operations.
pub struct Organization;

impl Organization {
    /// The record a new organization form starts from.
    pub fn skeleton() -> Record {
        Record::from_value(json!({
            "resourceType": RESOURCE_TYPE,
            "id": "",
            "name": "",
            "type": [{ "coding": [{ "code": "", "system": ORGANIZATION_TYPE_SYSTEM }] }],
            "address": [{ "line": [], "city": "", "state": "", "postalCode": "", "country": "" }],
            "identifier": [
                { "system": DID_IDENTIFIER_SYSTEM, "value": "" },
                { "type": { "coding": [{ "code": "", "system": IDENTIFIER_TYPE_SYSTEM }] } }
            ]
        }))
        .expect("organization skeleton is a JSON object")
    }

    pub fn fields() -> &'static [FormField] {
        ORGANIZATION_FIELDS
    }

    /// Validates an organization record against the strict wire model.
    pub fn validate(record: &Record) -> FhirResult<OrganizationSummary> {
        let wire: OrganizationWire = from_record(record, RESOURCE_TYPE)?;
        expect_resource_type(&wire.resource_type, RESOURCE_TYPE)?;

        let org_type = wire
            .type_
            .iter()
            .find_map(CodeableConceptWire::first_code)
            .map(str::to_owned);
        if let Some(code) = &org_type {
            if !ORGANIZATION_TYPES.iter().any(|o| o.value == code) {
                return Err(FhirError::InvalidInput(format!(
                    "unknown organization type '{code}'"
                )));
            }
        }

        let first_address = wire.address.first();

        Ok(OrganizationSummary {
            id: parse_resource_id(wire.id)?,
            name: non_empty(wire.name),
            org_type,
            city: first_address.and_then(|a| non_empty(a.city.clone())),
            country: first_address.and_then(|a| non_empty(a.country.clone())),
            identifier: typed_identifier(&wire.identifier),
            did: did_identifier(&wire.identifier),
        })
    }
}

/// Wire representation of an organization resource.
#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrganizationWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    active: Option<bool>,

    #[serde(default)]
    name: Option<String>,

    #[serde(rename = "type", default)]
    type_: Vec<CodeableConceptWire>,

    #[serde(default)]
    telecom: Vec<ContactPointWire>,

    #[serde(default)]
    address: Vec<AddressWire>,

    #[serde(default)]
    identifier: Vec<IdentifierWire>,
}
