//! FHIR R4 boundary support for health profiles.
//!
//! This crate provides:
//! - the initial [`Record`](healthdid_record::Record) (skeleton) of each profile form
//! - the form field catalogs, whose dotted names are the contract between a form view and the
//!   path updater
//! - strict wire models used to validate a finished record before it leaves the process
//!
//! Validation deserializes the record into `#[serde(deny_unknown_fields)]` structs through
//! `serde_path_to_error`, so a mismatch is reported with the path of the failing field.

mod datatypes;
pub mod fields;
pub mod organization;
pub mod patient;
pub mod resource;

pub use datatypes::{DID_IDENTIFIER_SYSTEM, IDENTIFIER_TYPE_SYSTEM, ORGANIZATION_TYPE_SYSTEM};
pub use fields::{FormField, InputKind, SelectOption};
pub use organization::{Organization, OrganizationSummary};
pub use patient::{Gender, Patient, PatientSummary};
pub use resource::{ResourceKind, ResourceSummary};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    Record(#[from] healthdid_record::PathError),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
