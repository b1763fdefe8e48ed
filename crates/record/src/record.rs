//! The record under construction and the scalars written into it.

use crate::{update, FieldPath, PathError, PathResult, Segment, WriteOutcome};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// A JSON-shaped resource whose root is always a mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// An empty record (`{}`).
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps a JSON value. Fails unless the value is an object.
    pub fn from_value(value: Value) -> PathResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PathError::NotAnObject(kind_name(&other))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Reads the value at `path` using the same addressing rules as [`update`].
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut cursor = self.0.get(&first.as_key())?;
        for segment in rest {
            cursor = match (cursor, segment) {
                (Value::Object(map), seg) => map.get(&seg.as_key())?,
                (Value::Array(items), Segment::Index(i)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(cursor)
    }

    /// Reads a text value by dotted path. Non-text values yield `None`.
    pub fn get_str(&self, dotted: &str) -> Option<&str> {
        let path = FieldPath::parse(dotted).ok()?;
        self.get(&path).and_then(Value::as_str)
    }

    /// Writes `value` at `path` in place.
    pub fn set(&mut self, path: &FieldPath, value: impl Into<Scalar>) -> WriteOutcome {
        update(self, path, value.into())
    }

    /// Parses `dotted` and writes `value` in place.
    pub fn apply(&mut self, dotted: &str, value: impl Into<Scalar>) -> PathResult<WriteOutcome> {
        let path = FieldPath::parse(dotted)?;
        Ok(self.set(&path, value))
    }

    /// The pure transition `(state, path, value) -> state'`.
    pub fn with_field(&self, dotted: &str, value: impl Into<Scalar>) -> PathResult<Record> {
        let mut next = self.clone();
        next.apply(dotted, value)?;
        Ok(next)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Serializes the record as pretty-printed JSON.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.0)
    }

    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl TryFrom<Value> for Record {
    type Error = PathError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Record::from_value(value)
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A leaf value. Form inputs produce [`Scalar::Text`].
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
    Null,
}

impl Scalar {
    pub fn into_value(self) -> Value {
        match self {
            Scalar::Text(s) => Value::String(s),
            Scalar::Number(n) => Value::Number(n),
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Null => Value::Null,
        }
    }

    /// Converts a JSON value, rejecting arrays and objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Scalar::Text(s)),
            Value::Number(n) => Some(Scalar::Number(n)),
            Value::Bool(b) => Some(Scalar::Bool(b)),
            Value::Null => Some(Scalar::Null),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(value.into())
    }
}

impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Scalar::Text(s) => serializer.serialize_str(s),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Scalar::from_value(value)
            .ok_or_else(|| serde::de::Error::custom("expected a string, number, boolean or null"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_requires_object_root() {
        assert!(Record::from_value(json!({"a": 1})).is_ok());
        assert_eq!(
            Record::from_value(json!([1, 2])),
            Err(PathError::NotAnObject("an array"))
        );
        assert_eq!(
            Record::from_value(json!("x")),
            Err(PathError::NotAnObject("a string"))
        );
    }

    #[test]
    fn with_field_leaves_original_untouched() {
        let before = Record::from_value(json!({"gender": "unknown"})).unwrap();
        let after = before.with_field("gender", "female").unwrap();

        assert_eq!(before.get_str("gender"), Some("unknown"));
        assert_eq!(after.get_str("gender"), Some("female"));
    }

    #[test]
    fn apply_rejects_empty_path() {
        let mut record = Record::new();
        assert_eq!(record.apply("", "v"), Err(PathError::Empty));
        assert_eq!(record, Record::new());
    }

    #[test]
    fn get_follows_sequences_and_decimal_keys() {
        let record = Record::from_value(json!({
            "name": [{"given": ["Sarah"]}],
            "address": {"0": {"city": "Leeds"}}
        }))
        .unwrap();

        assert_eq!(record.get_str("name.0.given.0"), Some("Sarah"));
        assert_eq!(record.get_str("address.0.city"), Some("Leeds"));
        assert_eq!(record.get_str("name.given"), None);
        assert_eq!(record.get_str("name.3.family"), None);
    }

    #[test]
    fn scalar_serde_rejects_containers() {
        let scalar: Scalar = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(scalar, Scalar::from(42u64));
        assert!(serde_json::from_value::<Scalar>(json!({"a": 1})).is_err());
        assert_eq!(serde_json::to_value(Scalar::Null).unwrap(), Value::Null);
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let record = Record::new()
            .with_field("telecom.1.value", "555-0100")
            .unwrap();
        let bytes = record.to_json_bytes().unwrap();

        assert_eq!(Record::from_json_slice(&bytes).unwrap(), record);
    }
}
