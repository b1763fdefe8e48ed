//! Form state for a profile under construction.
//!
//! A [`ProfileForm`] holds the resource kind, the record being edited and the chosen DID
//! suffix. Every input change is one call to [`ProfileForm::set_field`] (or its pure
//! counterpart [`ProfileForm::with_field`]), which runs the nested path updater.

use crate::did::{validate_suffix, DidName};
use crate::ProfileResult;
use fhir::{FormField, ResourceKind};
use healthdid_record::{FieldPath, Record, WriteOutcome};
use healthdid_types::ChainId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileForm {
    kind: ResourceKind,
    record: Record,
    did_suffix: Option<String>,
}

impl ProfileForm {
    /// A blank form starting from the kind's skeleton.
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            record: kind.skeleton(),
            did_suffix: None,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn did_suffix(&self) -> Option<&str> {
        self.did_suffix.as_deref()
    }

    pub fn fields(&self) -> &'static [FormField] {
        self.kind.fields()
    }

    /// Writes `value` at the dotted path `name`.
    ///
    /// Values for catalog fields are checked against the field's input kind first. Names outside
    /// the catalog are written as-is and left to validation at submit time.
    ///
    /// # Errors
    ///
    /// - [`crate::ProfileError::Path`] if `name` is empty.
    /// - [`crate::ProfileError::Fhir`] if a catalog field rejects the value.
    pub fn set_field(&mut self, name: &str, value: &str) -> ProfileResult<WriteOutcome> {
        let path = FieldPath::parse(name)?;
        match self.kind.field(name) {
            Some(field) => field.check(value)?,
            None => tracing::debug!("{} has no catalog field '{}'", self.kind, name),
        }
        Ok(self.record.set(&path, value))
    }

    /// The form after writing `value` at `name`; `self` is left unchanged.
    pub fn with_field(&self, name: &str, value: &str) -> ProfileResult<ProfileForm> {
        let mut next = self.clone();
        next.set_field(name, value)?;
        Ok(next)
    }

    pub fn set_did_suffix(&mut self, suffix: &str) -> ProfileResult<()> {
        let suffix = suffix.trim();
        validate_suffix(suffix)?;
        self.did_suffix = Some(suffix.to_owned());
        Ok(())
    }

    /// Preview of the DID the form will register on `chain`, once a suffix is set.
    pub fn did(&self, chain: ChainId) -> Option<DidName> {
        self.did_suffix
            .as_deref()
            .and_then(|suffix| DidName::new(chain, suffix).ok())
    }
}
