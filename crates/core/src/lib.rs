//! # healthdid core
//!
//! Profile workflow for health DIDs.
//!
//! This crate ties the building blocks together:
//! - [`ProfileForm`]: form state, updated one dotted field path at a time
//! - [`ProfileService`]: submit (validate, export, encrypt, upload) and register a profile
//! - [`fetch_profile`]: resolve a DID and decrypt its profile
//! - [`CoreConfig`]: configuration resolved once at startup
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest` and `cli`.

pub mod config;
pub mod constants;
pub mod did;
pub mod error;
pub mod export;
pub mod form;
pub mod profile;
pub mod retrieve;
pub mod uri;

pub use config::CoreConfig;
pub use did::DidName;
pub use error::{ErrorKind, ProfileError, ProfileResult};
pub use form::ProfileForm;
pub use profile::{
    draft, register_uri, Collaborators, Draft, ProfileService, Registered, Submission, Submitted,
};
pub use retrieve::{fetch_profile, resolve, RetrievedProfile};
pub use uri::ProfileUri;

pub use fhir::{FormField, ResourceKind, ResourceSummary};
pub use healthdid_types::ChainId;
