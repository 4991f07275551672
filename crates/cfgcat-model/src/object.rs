//! System objects and the meta-object payloads the checker reads.
//!
//! Everything in the catalog is a [`SystemObject`]: plain configuration
//! objects as well as types, sets, attribute groups and areas. The
//! meta-object payload lives in [`ObjectKind`]; references between objects
//! are plain [`ObjectId`]s resolved through a catalog.

use crate::attribute::AttributeTypeSpec;
use crate::data::Data;
use crate::ids::{NOT_VALID, ObjectId, ObjectRef, Version};
use crate::kinds::{PersistenceMode, ReferenceType, Usage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Validity window of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validity {
    /// Validity in versions of the owning area. `not_valid_since == 0` means still valid.
    Configuration {
        valid_since: Version,
        #[serde(default)]
        not_valid_since: Version,
    },
    /// Validity in wall-clock time.
    Dynamic {
        valid_since: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        not_valid_since: Option<DateTime<Utc>>,
        #[serde(default)]
        transient: bool,
    },
}

impl Validity {
    /// `valid_since <= version < not_valid_since` (an open end when still valid).
    ///
    /// Dynamic objects are judged by whether they are currently valid.
    pub fn is_valid_in(&self, version: Version) -> bool {
        match self {
            Validity::Configuration {
                valid_since,
                not_valid_since,
            } => {
                *valid_since <= version
                    && (*not_valid_since == NOT_VALID || version < *not_valid_since)
            }
            Validity::Dynamic {
                not_valid_since, ..
            } => not_valid_since.is_none(),
        }
    }
}

/// An object of the configuration catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemObject {
    pub id: ObjectId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type")]
    pub type_id: ObjectId,
    #[serde(rename = "area")]
    pub area_id: ObjectId,
    pub validity: Validity,
    /// Owned object sets (configuration objects only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sets: Vec<ObjectId>,
    /// Configuring data records keyed by attribute-group-usage id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<ObjectId, Data>,
    #[serde(default)]
    pub kind: ObjectKind,
}

impl SystemObject {
    pub fn is_configuration_object(&self) -> bool {
        matches!(self.validity, Validity::Configuration { .. })
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.validity, Validity::Dynamic { .. })
    }

    pub fn handle(&self) -> ObjectRef {
        ObjectRef {
            id: self.id,
            pid: self.pid.clone(),
        }
    }

    /// Pid when set, otherwise the name, otherwise the id.
    pub fn label(&self) -> String {
        if !self.pid.is_empty() {
            self.pid.clone()
        } else if !self.name.is_empty() {
            self.name.clone()
        } else {
            format!("[id {}]", self.id)
        }
    }

    pub fn type_spec(&self) -> Option<&TypeSpec> {
        match &self.kind {
            ObjectKind::Type(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn set_type_spec(&self) -> Option<&SetTypeSpec> {
        match &self.kind {
            ObjectKind::SetType(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn set_use_spec(&self) -> Option<&SetUseSpec> {
        match &self.kind {
            ObjectKind::SetUse(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn object_set(&self) -> Option<&ObjectSetSpec> {
        match &self.kind {
            ObjectKind::ObjectSet(spec) => Some(spec),
            _ => None,
        }
    }

    /// Attribute group or attribute list payload.
    pub fn attribute_set(&self) -> Option<&AttributeSetSpec> {
        match &self.kind {
            ObjectKind::AttributeGroup(spec) => Some(&spec.attributes),
            ObjectKind::AttributeList(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn attribute_group(&self) -> Option<&AttributeGroupSpec> {
        match &self.kind {
            ObjectKind::AttributeGroup(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn usage_spec(&self) -> Option<&UsageSpec> {
        match &self.kind {
            ObjectKind::AttributeGroupUsage(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn attribute_spec(&self) -> Option<&AttributeSpec> {
        match &self.kind {
            ObjectKind::Attribute(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn attribute_type(&self) -> Option<&AttributeTypeSpec> {
        match &self.kind {
            ObjectKind::AttributeType(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Meta-object payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Plain,
    Type(TypeSpec),
    SetType(SetTypeSpec),
    SetUse(SetUseSpec),
    ObjectSet(ObjectSetSpec),
    AttributeGroup(AttributeGroupSpec),
    AttributeList(AttributeSetSpec),
    AttributeGroupUsage(UsageSpec),
    Aspect,
    Attribute(AttributeSpec),
    AttributeType(AttributeTypeSpec),
    Area,
    Authority,
}

/// A `SystemObjectType`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSpec {
    #[serde(default)]
    pub configuring: bool,
    #[serde(default)]
    pub persistence: PersistenceMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub super_types: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_groups: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_uses: Vec<ObjectId>,
}

/// An `ObjectSetType`: bounds, mutability and reference kind of a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTypeSpec {
    /// Allowed element types.
    #[serde(default)]
    pub object_types: Vec<ObjectId>,
    #[serde(default)]
    pub minimum: u32,
    /// Upper bound; 0 means unbounded.
    #[serde(default)]
    pub maximum: u32,
    /// Dynamic sets change membership at runtime; static sets are versioned.
    #[serde(default)]
    pub mutable: bool,
    pub reference: ReferenceType,
}

/// Declaration that instances of a type carry a set of `set_type` named `set_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUseSpec {
    pub set_name: String,
    pub set_type: ObjectId,
    #[serde(default)]
    pub required: bool,
}

/// Membership entry of an object set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetElement {
    /// `None` is a dangling null entry left behind by a deleted object.
    pub object: Option<ObjectId>,
    #[serde(default)]
    pub valid_since: Version,
    #[serde(default)]
    pub not_valid_since: Version,
}

impl SetElement {
    pub fn member(object: ObjectId, valid_since: Version) -> Self {
        Self {
            object: Some(object),
            valid_since,
            not_valid_since: NOT_VALID,
        }
    }

    pub fn is_member_in(&self, version: Version) -> bool {
        self.valid_since <= version
            && (self.not_valid_since == NOT_VALID || version < self.not_valid_since)
    }
}

/// An object set's membership. Its set type is the owning object's type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSetSpec {
    #[serde(default)]
    pub elements: Vec<SetElement>,
}

/// Attribute group or attribute list payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSetSpec {
    #[serde(default)]
    pub attributes: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeGroupSpec {
    #[serde(flatten)]
    pub attributes: AttributeSetSpec,
    #[serde(default)]
    pub configuring: bool,
    /// Usages binding this group to aspects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<ObjectId>,
}

/// An `AttributeGroupUsage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSpec {
    pub attribute_group: ObjectId,
    pub aspect: ObjectId,
    pub usage: Usage,
    #[serde(default)]
    pub explicit_defined: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSpec {
    /// 1-based position inside the group or list.
    pub position: u32,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub variable_count: bool,
    pub attribute_type: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl AttributeSpec {
    pub fn is_array(&self) -> bool {
        self.variable_count || self.count != 1
    }
}

fn default_count() -> u32 {
    1
}
