//! Attribute type definitions: default parsing and undefined values.

use crate::data::Data;
use crate::ids::ObjectId;
use crate::kinds::ReferenceType;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Text value that marks an undefined text attribute.
pub const UNDEFINED_TEXT: &str = "_undefined_";

/// Errors raised when a textual default does not fit its attribute type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeValueError {
    #[error("`{0}` is not a number")]
    NotANumber(String),

    #[error("{value} is neither a state nor inside {minimum}..={maximum}")]
    OutOfRange { value: i64, minimum: i64, maximum: i64 },

    #[error("{value} does not fit into {byte_count} bytes")]
    ExceedsByteCount { value: i64, byte_count: u8 },

    #[error("`{0}` is not a valid point in time")]
    InvalidTime(String),

    #[error("empty reference default")]
    EmptyReference,

    #[error("list attributes carry no default of their own")]
    ListDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegerRange {
    pub minimum: i64,
    pub maximum: i64,
}

impl IntegerRange {
    pub fn contains(&self, value: i64) -> bool {
        (self.minimum..=self.maximum).contains(&value)
    }
}

/// Named value of an integer attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerState {
    pub name: String,
    pub value: i64,
}

/// The value domain of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeTypeSpec {
    Text,
    Integer {
        byte_count: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<IntegerRange>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        states: Vec<IntegerState>,
    },
    Float,
    Time {
        #[serde(default)]
        relative: bool,
    },
    Reference {
        /// Required target type; `None` accepts any object.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_type: Option<ObjectId>,
        reference: ReferenceType,
        #[serde(default)]
        undefined_allowed: bool,
    },
    List {
        attribute_list: ObjectId,
    },
}

impl AttributeTypeSpec {
    /// Check that `text` is a legal default for this type.
    pub fn validate_default(&self, text: &str) -> Result<(), AttributeValueError> {
        match self {
            AttributeTypeSpec::Text => Ok(()),
            AttributeTypeSpec::Integer {
                byte_count,
                range,
                states,
            } => {
                let trimmed = text.trim();
                if states.iter().any(|state| state.name == trimmed) {
                    return Ok(());
                }
                let value: i64 = trimmed
                    .parse()
                    .map_err(|_| AttributeValueError::NotANumber(trimmed.to_string()))?;
                let (low, high) = integer_bounds(*byte_count);
                if value < low || value > high {
                    return Err(AttributeValueError::ExceedsByteCount {
                        value,
                        byte_count: *byte_count,
                    });
                }
                if states.iter().any(|state| state.value == value) {
                    return Ok(());
                }
                match range {
                    Some(range) if !range.contains(value) => Err(AttributeValueError::OutOfRange {
                        value,
                        minimum: range.minimum,
                        maximum: range.maximum,
                    }),
                    _ => Ok(()),
                }
            }
            AttributeTypeSpec::Float => text
                .trim()
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| AttributeValueError::NotANumber(text.trim().to_string())),
            AttributeTypeSpec::Time { relative } => {
                let trimmed = text.trim();
                if trimmed.parse::<i64>().is_ok() {
                    return Ok(());
                }
                if !relative && DateTime::parse_from_rfc3339(trimmed).is_ok() {
                    return Ok(());
                }
                Err(AttributeValueError::InvalidTime(trimmed.to_string()))
            }
            AttributeTypeSpec::Reference { .. } => {
                if text.trim().is_empty() {
                    Err(AttributeValueError::EmptyReference)
                } else {
                    Ok(())
                }
            }
            AttributeTypeSpec::List { .. } => Err(AttributeValueError::ListDefault),
        }
    }

    /// The value that marks this attribute as not set, when the type has one.
    ///
    /// Lists have no undefined value of their own; their members decide.
    pub fn undefined_value(&self) -> Option<Data> {
        match self {
            AttributeTypeSpec::Text => Some(Data::Text(UNDEFINED_TEXT.to_string())),
            AttributeTypeSpec::Integer {
                byte_count,
                range,
                states,
            } => {
                let (low, _) = integer_bounds(*byte_count);
                let in_range = range.as_ref().is_some_and(|range| range.contains(low));
                let is_state = states.iter().any(|state| state.value == low);
                if range.is_none() && !states.is_empty() {
                    // Pure state types: every non-state value is free.
                    return (!is_state).then_some(Data::Integer(low));
                }
                (range.is_some() && !in_range && !is_state).then_some(Data::Integer(low))
            }
            AttributeTypeSpec::Float => None,
            AttributeTypeSpec::Time { relative } => (!relative).then_some(Data::Time(0)),
            AttributeTypeSpec::Reference { .. } => Some(Data::Reference(ObjectId::UNDEFINED)),
            AttributeTypeSpec::List { .. } => None,
        }
    }

    /// Whether `value` counts as "not set" for this type.
    pub fn is_undefined(&self, value: &Data) -> bool {
        match (self, value) {
            (
                AttributeTypeSpec::Reference {
                    undefined_allowed, ..
                },
                Data::Reference(id),
            ) => id.is_undefined() && !undefined_allowed,
            (AttributeTypeSpec::Text, Data::Text(text)) => text == UNDEFINED_TEXT,
            (AttributeTypeSpec::List { .. }, _) => false,
            (spec, value) => spec.undefined_value().as_ref() == Some(value),
        }
    }
}

/// Smallest and largest value representable in `byte_count` signed bytes.
pub fn integer_bounds(byte_count: u8) -> (i64, i64) {
    match byte_count {
        0 | 8.. => (i64::MIN, i64::MAX),
        bytes => {
            let bits = u32::from(bytes) * 8 - 1;
            (-(1_i64 << bits), (1_i64 << bits) - 1)
        }
    }
}
