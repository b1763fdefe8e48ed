//! The nested path updater.
//!
//! [`update`] installs a scalar at a [`FieldPath`] inside a [`Record`], creating missing
//! intermediate containers on the way down.
//!
//! Rules, applied segment by segment:
//!
//! - A key addresses a mapping entry; an index addresses the decimal key (`"0"`) of a mapping or
//!   the element of a sequence. Writing past the end of a sequence pads it with nulls.
//! - A missing or falsy child (null, `""`, `0`, `false`) on the way down is replaced by a fresh
//!   container whose shape is chosen by the [`CreationPolicy`].
//! - At the end of the path, a sequence is never written element-wise: if the target slot holds a
//!   sequence, or the path ends in an index into a sequence, the whole sequence becomes `[value]`.
//!   Form fields backed by sequences are single-valued.
//! - A key into a sequence, or any segment below a non-empty scalar, has no place in the
//!   serialized record. The write is dropped and [`WriteOutcome::Detached`] is returned.

use crate::{FieldPath, Record, Scalar, Segment};
use serde_json::Value;

/// Upper bound on how far past the end of a sequence an index may reach.
const MAX_INDEX_PADDING: usize = 1024;

/// How missing intermediate containers are created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CreationPolicy {
    /// Always create a mapping.
    ///
    /// This is the behaviour every existing form relies on: the original lookahead inspected the
    /// next segment's *value* rather than its kind and so never produced a sequence. Numeric
    /// segments below a created container therefore become mapping keys (`{"0": ...}`).
    #[default]
    MappingOnly,

    /// Create a sequence when the next segment is an index, otherwise a mapping.
    IndexAware,
}

impl CreationPolicy {
    fn container_for(self, next: &Segment) -> Value {
        match (self, next) {
            (CreationPolicy::IndexAware, Segment::Index(_)) => Value::Array(Vec::new()),
            _ => Value::Object(serde_json::Map::new()),
        }
    }
}

/// Result of a single write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value is now reachable at the path.
    Applied,
    /// The value could not be attached; `depth` is the index of the segment that failed.
    Detached { depth: usize },
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// Writes `value` at `path` using the default [`CreationPolicy::MappingOnly`].
pub fn update(root: &mut Record, path: &FieldPath, value: Scalar) -> WriteOutcome {
    update_with(root, path, value, CreationPolicy::default())
}

/// Writes `value` at `path`, creating intermediate containers per `policy`.
///
/// Sibling branches are never touched. The root stays a mapping. A detached write leaves the
/// record exactly as it was.
pub fn update_with(
    root: &mut Record,
    path: &FieldPath,
    value: Scalar,
    policy: CreationPolicy,
) -> WriteOutcome {
    // Containers created on the way down are discarded with a detached write.
    let mut tree = Value::Object(root.as_map().clone());

    match write(&mut tree, path, value.into_value(), policy) {
        WriteOutcome::Applied => {
            if let Value::Object(map) = tree {
                *root.as_map_mut() = map;
            }
            WriteOutcome::Applied
        }
        WriteOutcome::Detached { depth } => {
            tracing::warn!(
                "field write dropped: '{}' cannot be attached at segment {}",
                path,
                depth
            );
            WriteOutcome::Detached { depth }
        }
    }
}

fn write(root: &mut Value, path: &FieldPath, value: Value, policy: CreationPolicy) -> WriteOutcome {
    let segments = path.segments();
    let (last, parents) = path.split_last();

    let mut cursor = root;
    for (depth, segment) in parents.iter().enumerate() {
        let next = &segments[depth + 1];
        cursor = match child_slot(cursor, segment) {
            Some(slot) => {
                if is_falsy(slot) {
                    *slot = policy.container_for(next);
                }
                slot
            }
            None => return WriteOutcome::Detached { depth },
        };
    }

    if let (Value::Array(_), Segment::Index(_)) = (&*cursor, last) {
        *cursor = Value::Array(vec![value]);
        return WriteOutcome::Applied;
    }

    match child_slot(cursor, last) {
        Some(slot) if slot.is_array() => {
            *slot = Value::Array(vec![value]);
            WriteOutcome::Applied
        }
        Some(slot) => {
            *slot = value;
            WriteOutcome::Applied
        }
        None => WriteOutcome::Detached {
            depth: parents.len(),
        },
    }
}

/// Returns the slot `segment` addresses inside `container`, inserting a null if absent.
fn child_slot<'a>(container: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (container, segment) {
        (Value::Object(map), seg) => Some(map.entry(seg.as_key()).or_insert(Value::Null)),
        (Value::Array(items), Segment::Index(index)) => {
            let index = *index;
            if index >= items.len() {
                if index - items.len() >= MAX_INDEX_PADDING {
                    return None;
                }
                items.resize(index + 1, Value::Null);
            }
            items.get_mut(index)
        }
        _ => None,
    }
}

/// Falsy values are overwritten by fresh containers when walked through.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f.is_nan()),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).expect("object root")
    }

    fn apply(root: &mut Record, dotted: &str, value: &str) -> WriteOutcome {
        let path = FieldPath::parse(dotted).unwrap();
        update(root, &path, Scalar::from(value))
    }

    #[test]
    fn creates_nested_mappings() {
        let mut root = Record::new();
        let outcome = apply(&mut root, "a.b", "v");

        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(root.to_value(), json!({"a": {"b": "v"}}));
    }

    #[test]
    fn trailing_index_replaces_whole_sequence() {
        let mut root = record(json!({"a": ["x", "y", "z"]}));
        apply(&mut root, "a.0", "v");
        assert_eq!(root.to_value(), json!({"a": ["v"]}));

        let mut empty = record(json!({"a": []}));
        apply(&mut empty, "a.0", "v");
        assert_eq!(empty.to_value(), json!({"a": ["v"]}));
    }

    #[test]
    fn terminal_key_holding_sequence_is_replaced() {
        let mut root = record(json!({"name": [{"given": ["Sarah", "Jane"]}]}));
        apply(&mut root, "name.0.given", "Sally");

        assert_eq!(root.to_value(), json!({"name": [{"given": ["Sally"]}]}));
    }

    #[test]
    fn sibling_keys_survive() {
        let mut root = Record::new();
        apply(&mut root, "x.y", "1");
        apply(&mut root, "x.z", "2");

        assert_eq!(root.to_value(), json!({"x": {"y": "1", "z": "2"}}));
    }

    #[test]
    fn same_update_twice_is_idempotent() {
        let mut once = record(json!({"a": ["old", "older"], "b": {"c": "keep"}}));
        apply(&mut once, "a.0", "v");
        apply(&mut once, "b.d.e", "w");

        let mut twice = once.clone();
        apply(&mut twice, "a.0", "v");
        apply(&mut twice, "b.d.e", "w");

        assert_eq!(once, twice);
    }

    #[test]
    fn empty_segments_become_empty_keys() {
        let mut root = Record::new();
        let outcome = apply(&mut root, "a..b", "v");

        assert!(outcome.is_applied());
        assert_eq!(root.to_value(), json!({"a": {"": {"b": "v"}}}));
    }

    #[test]
    fn leading_and_trailing_dots() {
        let mut root = Record::new();
        apply(&mut root, ".a", "1");
        apply(&mut root, "b.", "2");

        assert_eq!(root.to_value(), json!({"": {"a": "1"}, "b": {"": "2"}}));
    }

    #[test]
    fn mapping_only_policy_uses_decimal_keys() {
        let mut root = Record::new();
        apply(&mut root, "address.0.line.0", "1 Main St");

        assert_eq!(
            root.to_value(),
            json!({"address": {"0": {"line": {"0": "1 Main St"}}}})
        );
    }

    #[test]
    fn index_aware_policy_creates_sequences() {
        let mut root = Record::new();
        let path = FieldPath::parse("address.0.line.0").unwrap();
        update_with(
            &mut root,
            &path,
            Scalar::from("1 Main St"),
            CreationPolicy::IndexAware,
        );

        assert_eq!(root.to_value(), json!({"address": [{"line": ["1 Main St"]}]}));
    }

    #[test]
    fn walks_existing_sequences_by_index() {
        let mut root = record(json!({
            "telecom": [{"use": "home"}, {"system": "phone", "value": ""}],
            "gender": "unknown"
        }));
        apply(&mut root, "telecom.1.value", "555-0100");

        assert_eq!(
            root.to_value(),
            json!({
                "telecom": [{"use": "home"}, {"system": "phone", "value": "555-0100"}],
                "gender": "unknown"
            })
        );
    }

    #[test]
    fn pads_sequences_when_walking_past_the_end() {
        let mut root = record(json!({"telecom": [{"use": "home"}]}));
        apply(&mut root, "telecom.2.value", "a@b.c");

        assert_eq!(
            root.to_value(),
            json!({"telecom": [{"use": "home"}, null, {"value": "a@b.c"}]})
        );
    }

    #[test]
    fn falsy_intermediates_are_replaced() {
        let mut root = record(json!({"a": "", "b": 0, "c": false, "d": null}));
        for key in ["a", "b", "c", "d"] {
            apply(&mut root, &format!("{key}.x"), "v");
        }

        assert_eq!(
            root.to_value(),
            json!({"a": {"x": "v"}, "b": {"x": "v"}, "c": {"x": "v"}, "d": {"x": "v"}})
        );
    }

    #[test]
    fn writes_below_scalars_are_detached() {
        let mut root = record(json!({"gender": "female"}));
        let before = root.clone();
        let outcome = apply(&mut root, "gender.code", "F");

        assert_eq!(outcome, WriteOutcome::Detached { depth: 1 });
        assert_eq!(root, before);
    }

    #[test]
    fn keys_into_sequences_are_detached() {
        let mut root = record(json!({"name": [{"family": "Williams"}]}));
        let before = root.clone();
        let outcome = apply(&mut root, "name.family", "Smith");

        assert_eq!(outcome, WriteOutcome::Detached { depth: 1 });
        assert_eq!(root, before);
    }

    #[test]
    fn excessive_index_padding_is_detached() {
        let mut root = record(json!({"a": []}));
        let outcome = apply(&mut root, "a.5000.b", "v");

        assert_eq!(outcome, WriteOutcome::Detached { depth: 1 });
        assert_eq!(root.to_value(), json!({"a": []}));
    }

    #[test]
    fn detached_write_leaves_no_created_containers() {
        let policy = CreationPolicy::IndexAware;
        let path = FieldPath::parse("x.5000.y").unwrap();

        let mut root = Record::new();
        let outcome = update_with(&mut root, &path, Scalar::from("v"), policy);
        assert_eq!(outcome, WriteOutcome::Detached { depth: 1 });
        assert_eq!(root.to_value(), json!({}));

        let mut falsy = record(json!({"x": "", "keep": 1}));
        let outcome = update_with(&mut falsy, &path, Scalar::from("v"), policy);
        assert_eq!(outcome, WriteOutcome::Detached { depth: 1 });
        assert_eq!(falsy.to_value(), json!({"x": "", "keep": 1}));
    }

    #[test]
    fn unrelated_branches_are_untouched() {
        let mut root = record(json!({
            "identifier": [
                {"system": "https://www.w3.org/ns/did", "value": ""},
                {"type": {"coding": [{"code": "", "system": "v2-0203"}]}}
            ],
            "birthDate": "1992-03-20"
        }));
        apply(&mut root, "identifier.1.type.coding.0.code", "MR");

        assert_eq!(
            root.to_value(),
            json!({
                "identifier": [
                    {"system": "https://www.w3.org/ns/did", "value": ""},
                    {"type": {"coding": [{"code": "MR", "system": "v2-0203"}]}}
                ],
                "birthDate": "1992-03-20"
            })
        );
    }
}
