//! Parsed dotted field paths.
//!
//! A path is parsed once from the dotted form used as an input's `name` and then walked many
//! times. Each segment is either a key (for mappings) or an index (for sequences).

use crate::{PathError, PathResult};
use std::fmt;
use std::str::FromStr;

/// A single segment in a field path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key. May be empty when the dotted form contains `..`.
    Key(String),
    /// Sequence index, parsed from a canonical decimal segment.
    Index(usize),
}

impl Segment {
    /// Classifies one dotted segment.
    ///
    /// Only canonical decimals are indices: `"0"` and `"12"` are, `"01"`, `"+1"` and `""` are
    /// keys. This keeps `parse` and `Display` exact inverses.
    pub fn parse(raw: &str) -> Self {
        let canonical_decimal = !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && (raw == "0" || !raw.starts_with('0'));

        if canonical_decimal {
            if let Ok(index) = raw.parse::<usize>() {
                return Segment::Index(index);
            }
        }
        Segment::Key(raw.to_owned())
    }

    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }

    /// The mapping key this segment addresses when the container is a mapping.
    pub fn as_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// An ordered, non-empty list of segments, e.g. `identifier.1.type.coding.0.code`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// Parses a dotted path.
    ///
    /// Every string except the empty string is accepted. Leading, trailing or doubled dots
    /// produce empty-string keys rather than errors.
    pub fn parse(dotted: &str) -> PathResult<Self> {
        if dotted.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(dotted.split('.').map(Segment::parse).collect()))
    }

    /// Builds a path from already-typed segments. Returns `None` for an empty list.
    pub fn from_segments(segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: a `FieldPath` has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits off the terminal segment.
    pub fn split_last(&self) -> (&Segment, &[Segment]) {
        self.0
            .split_last()
            .expect("field path always has at least one segment")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        FieldPath::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_and_indices() {
        let path = FieldPath::parse("identifier.1.type.coding.0.code").unwrap();

        assert_eq!(
            path.segments(),
            &[
                Segment::Key("identifier".into()),
                Segment::Index(1),
                Segment::Key("type".into()),
                Segment::Key("coding".into()),
                Segment::Index(0),
                Segment::Key("code".into()),
            ]
        );
    }

    #[test]
    fn rejects_only_the_empty_string() {
        assert_eq!(FieldPath::parse(""), Err(PathError::Empty));
        assert!(FieldPath::parse(".").is_ok());
    }

    #[test]
    fn doubled_dots_produce_empty_keys() {
        let path = FieldPath::parse("a..b").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("a".into()),
                Segment::Key(String::new()),
                Segment::Key("b".into()),
            ]
        );
    }

    #[test]
    fn non_canonical_numbers_stay_keys() {
        assert_eq!(Segment::parse("01"), Segment::Key("01".into()));
        assert_eq!(Segment::parse("-1"), Segment::Key("-1".into()));
        assert_eq!(Segment::parse("1e3"), Segment::Key("1e3".into()));
        assert_eq!(Segment::parse("0"), Segment::Index(0));
        assert_eq!(
            Segment::parse("99999999999999999999999"),
            Segment::Key("99999999999999999999999".into())
        );
    }

    #[test]
    fn display_reproduces_dotted_form() {
        for dotted in ["name.0.given.0", "a..b", ".lead", "trail.", "01.x"] {
            assert_eq!(FieldPath::parse(dotted).unwrap().to_string(), dotted);
        }
    }

    #[test]
    fn index_segment_addresses_decimal_key_in_mappings() {
        assert_eq!(Segment::Index(3).as_key(), "3");
        assert_eq!(Segment::Key("x".into()).as_key(), "x");
    }

    #[test]
    fn from_segments_rejects_empty() {
        assert!(FieldPath::from_segments(vec![]).is_none());
        let path = FieldPath::from_segments(vec![Segment::Key("gender".into())]).unwrap();
        assert_eq!(path.split_last().0, &Segment::Key("gender".into()));
    }
}
