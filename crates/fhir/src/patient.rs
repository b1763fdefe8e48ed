//! FHIR Patient: skeleton, strict wire model and validation.
//!
//! The skeleton is the state a new patient form starts from. It pre-creates every sequence the
//! field catalog addresses (`name`, `telecom`, `address`, `identifier`), so catalog writes walk
//! existing elements instead of creating containers.

use crate::datatypes::{
    did_identifier, expect_resource_type, from_record, non_empty, parse_resource_id,
    typed_identifier, AddressWire, ContactPointWire, HumanNameWire, IdentifierWire,
    DID_IDENTIFIER_SYSTEM, IDENTIFIER_TYPE_SYSTEM,
};
use crate::fields::{parse_date, PATIENT_FIELDS};
use crate::{FhirError, FhirResult, FormField};
use chrono::NaiveDate;
use healthdid_record::Record;
use healthdid_uuid::ResourceId;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

pub const RESOURCE_TYPE: &str = "Patient";

/// Administrative gender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    pub fn to_wire(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            "unknown" => Some(Gender::Unknown),
            _ => None,
        }
    }
}

/// Fields extracted from a validated patient, used for logging and listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientSummary {
    /// `None` until the profile is submitted.
    pub id: Option<ResourceId>,
    pub family: Option<String>,
    pub given: Vec<String>,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// `(type code, value)` of the typed identifier, e.g. `("MR", "12345")`.
    pub identifier: Option<(String, String)>,
    pub did: Option<String>,
}

impl fmt::Display for PatientSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut name = self.given.join(" ");
        if let Some(family) = &self.family {
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(family);
        }
        if name.is_empty() {
            name.push_str("<unnamed>");
        }
        write!(f, "Patient {name} ({})", self.gender.to_wire())
    }
}

/// Patient resource operations.
///
/// This is a zero-sized type used for namespacing patient-related operations.
pub struct Patient;

impl Patient {
    /// The record a new patient form starts from.
    pub fn skeleton() -> Record {
        Record::from_value(json!({
            "resourceType": RESOURCE_TYPE,
            "id": "",
            "name": [{ "given": [], "family": "" }],
            "gender": "unknown",
            "birthDate": "",
            "telecom": [
                { "use": "home" },
                { "system": "phone", "value": "" },
                { "system": "email", "value": "" }
            ],
            "address": [{ "line": [], "city": "", "state": "", "postalCode": "", "country": "" }],
            "identifier": [
                { "system": DID_IDENTIFIER_SYSTEM, "value": "" },
                { "type": { "coding": [{ "code": "", "system": IDENTIFIER_TYPE_SYSTEM }] } }
            ]
        }))
        .expect("patient skeleton is a JSON object")
    }

    pub fn fields() -> &'static [FormField] {
        PATIENT_FIELDS
    }

    /// Validates a patient record against the strict wire model.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] naming the failing path if a field has an unexpected
    /// type or an unknown key is present, and [`FhirError::InvalidInput`] if `resourceType`,
    /// `gender`, `birthDate` or `id` hold invalid values.
    pub fn validate(record: &Record) -> FhirResult<PatientSummary> {
        let wire: PatientWire = from_record(record, RESOURCE_TYPE)?;
        expect_resource_type(&wire.resource_type, RESOURCE_TYPE)?;

        let gender = match non_empty(wire.gender) {
            None => Gender::Unknown,
            Some(code) => Gender::from_wire(&code).ok_or_else(|| {
                FhirError::InvalidInput(format!(
                    "gender must be one of male, female, other, unknown; got '{code}'"
                ))
            })?,
        };

        let birth_date = non_empty(wire.birth_date)
            .map(|date| parse_date(&date))
            .transpose()?;

        let first_name = wire.name.into_iter().next();
        let first_address = wire.address.first();
        let contact = |system: &str| {
            wire.telecom
                .iter()
                .filter(|c| c.system.as_deref() == Some(system))
                .find_map(|c| non_empty(c.value.clone()))
        };

        Ok(PatientSummary {
            id: parse_resource_id(wire.id)?,
            family: first_name.as_ref().and_then(|n| non_empty(n.family.clone())),
            given: first_name
                .map(|n| n.given.into_iter().filter(|g| !g.is_empty()).collect())
                .unwrap_or_default(),
            gender,
            birth_date,
            phone: contact("phone"),
            email: contact("email"),
            city: first_address.and_then(|a| non_empty(a.city.clone())),
            country: first_address.and_then(|a| non_empty(a.country.clone())),
            identifier: typed_identifier(&wire.identifier),
            did: did_identifier(&wire.identifier),
        })
    }
}

/// Wire representation of a patient resource.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatientWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    name: Vec<HumanNameWire>,

    #[serde(default)]
    gender: Option<String>,

    #[serde(rename = "birthDate", default)]
    birth_date: Option<String>,

    #[serde(default)]
    telecom: Vec<ContactPointWire>,

    #[serde(default)]
    address: Vec<AddressWire>,

    #[serde(default)]
    identifier: Vec<IdentifierWire>,
}
