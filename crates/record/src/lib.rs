//! # healthdid record
//!
//! Form state for resource profiles.
//!
//! A [`Record`] is the JSON-shaped resource under construction. Every editable form input is
//! named by a dotted [`FieldPath`] (for example `address.0.line.0`), and every keystroke turns
//! into one call to [`update`], which writes a [`Scalar`] at that path and creates any missing
//! intermediate containers.
//!
//! ```
//! use healthdid_record::Record;
//!
//! let record = Record::new()
//!     .with_field("name.0.family", "Williams")
//!     .expect("non-empty path");
//!
//! assert_eq!(record.to_value()["name"]["0"]["family"], "Williams");
//! ```

mod path;
mod record;
mod update;

pub use path::{FieldPath, Segment};
pub use record::{Record, Scalar};
pub use update::{update, update_with, CreationPolicy, WriteOutcome};

/// Errors raised while parsing field paths or building records.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("field path cannot be empty")]
    Empty,

    #[error("record root must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

pub type PathResult<T> = Result<T, PathError>;
