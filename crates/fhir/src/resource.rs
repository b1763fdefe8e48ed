//! Dispatch over the supported resource kinds.

use crate::{
    FhirError, FhirResult, FormField, Organization, OrganizationSummary, Patient, PatientSummary,
};
use healthdid_record::Record;
use healthdid_uuid::ResourceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The profile kinds a form can build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Patient,
    Organization,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Patient, ResourceKind::Organization];

    /// The FHIR `resourceType` string, also used as the upload directory name.
    pub fn resource_type(self) -> &'static str {
        match self {
            ResourceKind::Patient => crate::patient::RESOURCE_TYPE,
            ResourceKind::Organization => crate::organization::RESOURCE_TYPE,
        }
    }

    pub fn skeleton(self) -> Record {
        match self {
            ResourceKind::Patient => Patient::skeleton(),
            ResourceKind::Organization => Organization::skeleton(),
        }
    }

    pub fn fields(self) -> &'static [FormField] {
        match self {
            ResourceKind::Patient => Patient::fields(),
            ResourceKind::Organization => Organization::fields(),
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FormField> {
        crate::fields::find(self.fields(), name)
    }

    pub fn validate(self, record: &Record) -> FhirResult<ResourceSummary> {
        match self {
            ResourceKind::Patient => Patient::validate(record).map(ResourceSummary::Patient),
            ResourceKind::Organization => {
                Organization::validate(record).map(ResourceSummary::Organization)
            }
        }
    }

    /// Determines the kind from a record's `resourceType`.
    pub fn of_record(record: &Record) -> FhirResult<Self> {
        let resource_type = record
            .as_map()
            .get("resourceType")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FhirError::InvalidInput("record has no resourceType".into()))?;
        resource_type.parse()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

impl FromStr for ResourceKind {
    type Err = FhirError;

    /// Accepts the resource type in any ASCII case (`Patient`, `patient`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.resource_type().eq_ignore_ascii_case(s))
            .ok_or_else(|| FhirError::InvalidInput(format!("unsupported resource type '{s}'")))
    }
}

/// Result of validating a record of either kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceSummary {
    Patient(PatientSummary),
    Organization(OrganizationSummary),
}

impl ResourceSummary {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSummary::Patient(_) => ResourceKind::Patient,
            ResourceSummary::Organization(_) => ResourceKind::Organization,
        }
    }

    pub fn id(&self) -> Option<ResourceId> {
        match self {
            ResourceSummary::Patient(p) => p.id,
            ResourceSummary::Organization(o) => o.id,
        }
    }

    pub fn did(&self) -> Option<&str> {
        match self {
            ResourceSummary::Patient(p) => p.did.as_deref(),
            ResourceSummary::Organization(o) => o.did.as_deref(),
        }
    }
}

impl fmt::Display for ResourceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceSummary::Patient(p) => fmt::Display::fmt(p, f),
            ResourceSummary::Organization(o) => fmt::Display::fmt(o, f),
        }
    }
}
