//! Form field catalogs.
//!
//! Each editable input of a profile form is described by a [`FormField`]. The field's `name` is
//! the dotted path handed to the updater, so renaming one is a breaking change for every view.

use crate::{FhirError, FhirResult};
use chrono::NaiveDate;
use healthdid_record::FieldPath;
use serde::Serialize;

/// One choice of a select input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// The kind of input rendered for a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "options", rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Date,
    Tel,
    Email,
    Select(&'static [SelectOption]),
}

/// An editable input of a profile form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FormField {
    /// Dotted path into the record, e.g. `identifier.1.type.coding.0.code`.
    pub name: &'static str,
    pub label: &'static str,
    pub input: InputKind,
}

impl FormField {
    pub fn path(&self) -> FieldPath {
        FieldPath::parse(self.name).expect("catalog field names are non-empty")
    }

    /// Checks a value typed into this field.
    ///
    /// Select inputs accept one of their option values or `""` (nothing chosen). Date inputs
    /// accept `""` or `YYYY-MM-DD`. Other inputs accept any text.
    pub fn check(&self, value: &str) -> FhirResult<()> {
        match self.input {
            InputKind::Select(options) => {
                if value.is_empty() || options.iter().any(|o| o.value == value) {
                    Ok(())
                } else {
                    Err(FhirError::InvalidInput(format!(
                        "'{value}' is not an option of {}",
                        self.name
                    )))
                }
            }
            InputKind::Date => {
                if value.is_empty() {
                    return Ok(());
                }
                parse_date(value).map(|_| ())
            }
            InputKind::Text | InputKind::Tel | InputKind::Email => Ok(()),
        }
    }
}

/// Parses a FHIR `date` restricted to full `YYYY-MM-DD` precision.
pub(crate) fn parse_date(value: &str) -> FhirResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        FhirError::InvalidInput(format!("date must be YYYY-MM-DD, got '{value}'"))
    })
}

/// Looks up a field of `catalog` by its dotted name.
pub fn find<'a>(catalog: &'a [FormField], name: &str) -> Option<&'a FormField> {
    catalog.iter().find(|f| f.name == name)
}

pub const GENDER_OPTIONS: &[SelectOption] = &[
    SelectOption { value: "male", label: "Male" },
    SelectOption { value: "female", label: "Female" },
    SelectOption { value: "other", label: "Other" },
    SelectOption { value: "unknown", label: "Unknown" },
];

pub const PATIENT_IDENTIFIER_TYPES: &[SelectOption] = &[
    SelectOption { value: "DL", label: "Driver's License Number" },
    SelectOption { value: "MR", label: "Medical Record Number" },
    SelectOption { value: "SSN", label: "Social Security Number" },
];

pub const ORGANIZATION_IDENTIFIER_TYPES: &[SelectOption] = &[
    SelectOption { value: "NPI", label: "National Provider Identifier (NPI)" },
    SelectOption { value: "TAX", label: "Taxpayer Identification Number (TIN)" },
    SelectOption { value: "PAYERID", label: "Payer Identifier (PAYERID)" },
    SelectOption { value: "HIN", label: "Health Industry Number (HIN)" },
];

pub const ORGANIZATION_TYPES: &[SelectOption] = &[
    SelectOption { value: "prov", label: "Healthcare Provider" },
    SelectOption { value: "dept", label: "Hospital Department" },
    SelectOption { value: "team", label: "Organizational team" },
    SelectOption { value: "govt", label: "Government" },
    SelectOption { value: "ins", label: "Insurance Company" },
    SelectOption { value: "pay", label: "Payer" },
    SelectOption { value: "edu", label: "Educational Institute" },
    SelectOption { value: "reli", label: "Religious Institution" },
    SelectOption { value: "crs", label: "Clinical Research Sponsor" },
    SelectOption { value: "cg", label: "Community Group" },
    SelectOption { value: "bus", label: "Non-Healthcare Business or Corporation" },
    SelectOption { value: "other", label: "Other" },
];

const fn field(name: &'static str, label: &'static str, input: InputKind) -> FormField {
    FormField { name, label, input }
}

pub const PATIENT_FIELDS: &[FormField] = &[
    field("name.0.given.0", "First Name", InputKind::Text),
    field("name.0.family", "Last Name", InputKind::Text),
    field("gender", "Gender", InputKind::Select(GENDER_OPTIONS)),
    field("birthDate", "Birth Date", InputKind::Date),
    field("telecom.1.value", "Phone", InputKind::Tel),
    field("telecom.2.value", "Email", InputKind::Email),
    field("address.0.line.0", "Address Line", InputKind::Text),
    field("address.0.city", "City", InputKind::Text),
    field("address.0.state", "State", InputKind::Text),
    field("address.0.postalCode", "Postal Code", InputKind::Text),
    field("address.0.country", "Country", InputKind::Text),
    field(
        "identifier.1.type.coding.0.code",
        "Identifier Type",
        InputKind::Select(PATIENT_IDENTIFIER_TYPES),
    ),
    field("identifier.1.value", "Identifier Value", InputKind::Text),
];

pub const ORGANIZATION_FIELDS: &[FormField] = &[
    field("name", "Organization Name", InputKind::Text),
    field(
        "type.0.coding.0.code",
        "Organization Type",
        InputKind::Select(ORGANIZATION_TYPES),
    ),
    field("address.0.line.0", "Address Line", InputKind::Text),
    field("address.0.city", "City", InputKind::Text),
    field("address.0.state", "State", InputKind::Text),
    field("address.0.postalCode", "Postal Code", InputKind::Text),
    field("address.0.country", "Country", InputKind::Text),
    field(
        "identifier.1.type.coding.0.code",
        "Identifier Type",
        InputKind::Select(ORGANIZATION_IDENTIFIER_TYPES),
    ),
    field("identifier.1.value", "Identifier Value", InputKind::Text),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_accepts_options_and_placeholder() {
        let gender = find(PATIENT_FIELDS, "gender").unwrap();

        assert!(gender.check("female").is_ok());
        assert!(gender.check("").is_ok());
        assert!(matches!(
            gender.check("F"),
            Err(FhirError::InvalidInput(msg)) if msg.contains("gender")
        ));
    }

    #[test]
    fn date_requires_full_precision() {
        let birth = find(PATIENT_FIELDS, "birthDate").unwrap();

        assert!(birth.check("1992-03-20").is_ok());
        assert!(birth.check("").is_ok());
        assert!(birth.check("1992-03").is_err());
        assert!(birth.check("20/03/1992").is_err());
    }

    #[test]
    fn every_catalog_name_parses() {
        for field in PATIENT_FIELDS.iter().chain(ORGANIZATION_FIELDS) {
            assert_eq!(field.path().to_string(), field.name);
        }
    }

    #[test]
    fn serializes_select_options() {
        let json = serde_json::to_value(find(ORGANIZATION_FIELDS, "identifier.1.type.coding.0.code").unwrap())
            .unwrap();

        assert_eq!(json["input"]["type"], "select");
        assert_eq!(json["input"]["options"][0]["value"], "NPI");
        assert_eq!(
            serde_json::to_value(find(PATIENT_FIELDS, "name.0.family").unwrap()).unwrap()["input"]
                ["type"],
            "text"
        );
    }
}
