//! Closed classification enums of the meta model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an attribute group is used under one aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Usage {
    RequiredConfigurationData,
    ChangeableRequiredConfigurationData,
    OptionalConfigurationData,
    ChangeableOptionalConfigurationData,
    OnlineDataAsSourceReceiver,
    OnlineDataAsSenderDrain,
    OnlineDataAsSourceReceiverOrSenderDrain,
}

impl Usage {
    /// Whether records of this usage are stored with the object (configuring data).
    pub fn is_configuring(self) -> bool {
        match self {
            Usage::RequiredConfigurationData
            | Usage::ChangeableRequiredConfigurationData
            | Usage::OptionalConfigurationData
            | Usage::ChangeableOptionalConfigurationData => true,
            Usage::OnlineDataAsSourceReceiver
            | Usage::OnlineDataAsSenderDrain
            | Usage::OnlineDataAsSourceReceiverOrSenderDrain => false,
        }
    }

    /// Whether every object of the group's type must carry a record.
    pub fn is_required(self) -> bool {
        match self {
            Usage::RequiredConfigurationData | Usage::ChangeableRequiredConfigurationData => true,
            Usage::OptionalConfigurationData
            | Usage::ChangeableOptionalConfigurationData
            | Usage::OnlineDataAsSourceReceiver
            | Usage::OnlineDataAsSenderDrain
            | Usage::OnlineDataAsSourceReceiverOrSenderDrain => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Usage::RequiredConfigurationData => "required-configuration-data",
            Usage::ChangeableRequiredConfigurationData => "changeable-required-configuration-data",
            Usage::OptionalConfigurationData => "optional-configuration-data",
            Usage::ChangeableOptionalConfigurationData => "changeable-optional-configuration-data",
            Usage::OnlineDataAsSourceReceiver => "online-data-as-source-receiver",
            Usage::OnlineDataAsSenderDrain => "online-data-as-sender-drain",
            Usage::OnlineDataAsSourceReceiverOrSenderDrain => {
                "online-data-as-source-receiver-or-sender-drain"
            }
        }
    }
}

/// Containment/reference strictness of a set or reference attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceType {
    /// Target lives in the same area and has exactly one owner.
    Composition,
    /// Shared reference that may cross areas; target must stay valid.
    Aggregation,
    /// Loose reference that may cross areas.
    Association,
}

impl ReferenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceType::Composition => "composition",
            ReferenceType::Aggregation => "aggregation",
            ReferenceType::Association => "association",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistence mode of dynamic object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistenceMode {
    /// Not persisted across restarts.
    Transient,
    #[default]
    Persistent,
    /// Persisted, but invalidated on restart.
    PersistentAndInvalidOnRestart,
}

impl PersistenceMode {
    pub fn is_transient(self) -> bool {
        matches!(self, PersistenceMode::Transient)
    }
}

/// Classification of a cross-area dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyKind {
    Required,
    Optional,
}

impl DependencyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyKind::Required => "REQUIRED",
            DependencyKind::Optional => "OPTIONAL",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
