//! Attribute value trees stored as data records on objects.

use crate::ids::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A configuring data record or a fragment of one.
///
/// Records map attribute names to values; arrays carry the elements of
/// attributes with a count other than one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Data {
    Record(BTreeMap<String, Data>),
    Array(Vec<Data>),
    Text(String),
    Integer(i64),
    Float(f64),
    /// Milliseconds; absolute values count from the unix epoch.
    Time(i64),
    Reference(ObjectId),
}

impl Data {
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Data)>,
        K: Into<String>,
    {
        Data::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    pub fn field(&self, name: &str) -> Option<&Data> {
        match self {
            Data::Record(fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Data::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Data::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Data::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Data]> {
        match self {
            Data::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Whether every scalar leaf satisfies `predicate`. Empty containers count as satisfied.
    pub fn all_leaves(&self, predicate: &impl Fn(&Data) -> bool) -> bool {
        match self {
            Data::Record(fields) => fields.values().all(|value| value.all_leaves(predicate)),
            Data::Array(items) => items.iter().all(|value| value.all_leaves(predicate)),
            leaf => predicate(leaf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_field_lookup() {
        let record = Data::record([
            ("name", Data::Text("x".to_string())),
            ("target", Data::Reference(ObjectId(9))),
        ]);
        assert_eq!(record.field("name").and_then(Data::as_text), Some("x"));
        assert_eq!(
            record.field("target").and_then(Data::as_reference),
            Some(ObjectId(9))
        );
        assert!(record.field("missing").is_none());
    }

    #[test]
    fn all_leaves_walks_nested_arrays() {
        let record = Data::record([
            ("a", Data::Time(0)),
            ("b", Data::Array(vec![Data::Time(0), Data::Time(0)])),
        ]);
        assert!(record.all_leaves(&|leaf| matches!(leaf, Data::Time(0))));

        let mixed = Data::record([("a", Data::Time(0)), ("b", Data::Time(5))]);
        assert!(!mixed.all_leaves(&|leaf| matches!(leaf, Data::Time(0))));
    }

    #[test]
    fn data_round_trips_through_tagged_json() {
        let raw = r#"{"kind":"record","value":{"count":{"kind":"integer","value":3}}}"#;
        let data: Data = serde_json::from_str(raw).expect("tagged data must parse");
        assert_eq!(data.field("count").and_then(Data::as_integer), Some(3));
    }
}
