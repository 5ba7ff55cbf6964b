//! Alignment of dotted `group.field` variables into per-position records.

use indexmap::IndexMap;

use super::VariableValue;
use crate::error::{Error, Result};

/// One independent axis of the cartesian product.
#[derive(Debug, Clone, PartialEq)]
pub enum Axis {
    Scalar(String),
    List(Vec<String>),
    /// Records of a group, each mapping field name to value.
    Group(Vec<IndexMap<String, String>>),
}

impl Axis {
    pub fn len(&self) -> usize {
        match self {
            Axis::Scalar(_) => 1,
            Axis::List(values) => values.len(),
            Axis::Group(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `group.field` at the last dot.
pub fn split_group_name(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('.')
}

#[derive(Default)]
struct PendingGroup {
    fields: Vec<(String, VariableValue)>,
    /// Length fixed by the first list-valued field, with that field's name.
    length: Option<(usize, String)>,
}

/// Convert raw variables into ordered axes.
///
/// Scalar group fields are broadcast to every record. List-valued fields of
/// one group must all have the same length.
pub fn align(raw: &IndexMap<String, VariableValue>) -> Result<IndexMap<String, Axis>> {
    let mut order: Vec<(String, bool)> = Vec::new();
    let mut plain: IndexMap<String, Axis> = IndexMap::new();
    let mut groups: IndexMap<String, PendingGroup> = IndexMap::new();

    for (name, value) in raw {
        if let Some((group, field)) = split_group_name(name) {
            if !groups.contains_key(group) {
                order.push((group.to_string(), true));
            }
            let pending = groups.entry(group.to_string()).or_default();

            if let VariableValue::List(values) = value {
                match &pending.length {
                    None => pending.length = Some((values.len(), field.to_string())),
                    Some((expected, _)) if *expected != values.len() => {
                        return Err(Error::group_misaligned(
                            group,
                            field,
                            *expected,
                            values.len(),
                        ));
                    }
                    Some(_) => {}
                }
            }
            pending.fields.push((field.to_string(), value.clone()));
        } else {
            order.push((name.clone(), false));
            let axis = match value {
                VariableValue::Scalar(s) => Axis::Scalar(s.clone()),
                VariableValue::List(values) => Axis::List(values.clone()),
            };
            plain.insert(name.clone(), axis);
        }
    }

    for (group, pending) in &groups {
        if plain.contains_key(group) {
            let field = pending.fields.first().map(|(f, _)| f.as_str()).unwrap_or_default();
            return Err(Error::config_invalid_value(
                group.clone(),
                None,
                format!(
                    "'{}' is both a variable and the group of '{}.{}'",
                    group, group, field
                ),
            ));
        }
    }

    let mut axes = IndexMap::new();
    for (name, is_group) in order {
        if is_group {
            if let Some(pending) = groups.shift_remove(&name) {
                axes.insert(name, Axis::Group(build_records(pending)));
            }
        } else if let Some(axis) = plain.shift_remove(&name) {
            axes.insert(name, axis);
        }
    }

    Ok(axes)
}

fn build_records(pending: PendingGroup) -> Vec<IndexMap<String, String>> {
    let count = pending.length.map(|(len, _)| len).unwrap_or(1);
    let mut records: Vec<IndexMap<String, String>> = vec![IndexMap::new(); count];

    for (field, value) in pending.fields {
        for (index, record) in records.iter_mut().enumerate() {
            let item = match &value {
                VariableValue::Scalar(s) => s.clone(),
                VariableValue::List(values) => values[index].clone(),
            };
            record.insert(field.clone(), item);
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn list(values: &[&str]) -> VariableValue {
        VariableValue::List(values.iter().map(|v| v.to_string()).collect())
    }

    fn scalar(value: &str) -> VariableValue {
        VariableValue::Scalar(value.to_string())
    }

    #[test]
    fn equal_lengths_zip_into_records() {
        let mut raw = IndexMap::new();
        raw.insert("g.h".to_string(), list(&["h1", "h2"]));
        raw.insert("g.k".to_string(), list(&["k1", "k2"]));

        let axes = align(&raw).unwrap();
        let Axis::Group(records) = &axes["g"] else {
            panic!("expected group axis");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["h"], "h1");
        assert_eq!(records[0]["k"], "k1");
        assert_eq!(records[1]["h"], "h2");
        assert_eq!(records[1]["k"], "k2");
    }

    #[test]
    fn mismatched_lengths_fail() {
        let mut raw = IndexMap::new();
        raw.insert("g.h".to_string(), list(&["h1", "h2"]));
        raw.insert("g.k".to_string(), list(&["k1"]));

        let err = align(&raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigGroupMisaligned);
        assert_eq!(err.details["group"], "g");
        assert_eq!(err.details["field"], "k");
    }

    #[test]
    fn scalar_fields_broadcast_across_records() {
        let mut raw = IndexMap::new();
        raw.insert("host.user".to_string(), scalar("u"));
        raw.insert("host.hostname".to_string(), list(&["h1", "h2", "h3"]));

        let axes = align(&raw).unwrap();
        let Axis::Group(records) = &axes["host"] else {
            panic!("expected group axis");
        };
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r["user"] == "u"));
        assert_eq!(records[2]["hostname"], "h3");
    }

    #[test]
    fn axis_order_follows_first_seen_key() {
        let mut raw = IndexMap::new();
        raw.insert("x".to_string(), list(&["1"]));
        raw.insert("g.a".to_string(), scalar("a"));
        raw.insert("y".to_string(), scalar("y"));
        raw.insert("g.b".to_string(), scalar("b"));

        let axes = align(&raw).unwrap();
        let keys: Vec<&str> = axes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["x", "g", "y"]);
    }

    #[test]
    fn plain_name_reused_as_group_fails() {
        let mut raw = IndexMap::new();
        raw.insert("host".to_string(), scalar("x"));
        raw.insert("host.name".to_string(), list(&["a", "b"]));

        let err = align(&raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert_eq!(err.details["key"], "host");
        assert!(err.message.contains("host.name"));
    }

    #[test]
    fn dotted_names_split_at_last_dot() {
        assert_eq!(split_group_name("a.b.c"), Some(("a.b", "c")));
        assert_eq!(split_group_name("plain"), None);
    }
}
