//! Identity primitives: object ids and area version numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Area version number. Versions are counted per configuration area.
pub type Version = u16;

/// `notValidSince` value of a configuration object that is still valid.
pub const NOT_VALID: Version = 0;

/// Globally unique, immutable 64-bit object identity.
///
/// Id 0 is reserved as the "undefined" reference value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub const UNDEFINED: ObjectId = ObjectId(0);

    pub fn is_undefined(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for ObjectId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A lightweight `(id, pid)` handle used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pid: String,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pid.is_empty() {
            write!(f, "[id {}]", self.id)
        } else {
            write!(f, "{} [id {}]", self.pid, self.id)
        }
    }
}
