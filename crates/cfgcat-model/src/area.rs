//! Per-area metadata: version counters, activation history and dependency records.

use crate::ids::{ObjectId, Version};
use crate::kinds::DependencyKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// The four version counters of a configuration area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaVersions {
    /// Currently live version.
    pub active: Version,
    /// Next version being edited.
    pub modifiable: Version,
    #[serde(default)]
    pub transferable: Version,
    #[serde(default)]
    pub activatable: Version,
}

/// A directed dependency of one area on another.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDependency {
    /// Version of the depending area from which on the dependency exists.
    pub dependent_version: Version,
    /// Area depended upon.
    pub area: ObjectId,
    /// Minimum version the depended-upon area must be at.
    pub needed_version: Version,
    pub kind: DependencyKind,
}

/// The persisted dependency snapshot of one area.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    /// Area version the snapshot was computed for.
    pub version: Version,
    #[serde(default)]
    pub dependencies: BTreeSet<AreaDependency>,
}

impl DependencyRecord {
    /// Stable digest of the dependency set, independent of insertion order.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_be_bytes());
        for dependency in &self.dependencies {
            hasher.update(dependency.dependent_version.to_be_bytes());
            hasher.update(dependency.area.0.to_be_bytes());
            hasher.update(dependency.needed_version.to_be_bytes());
            hasher.update(dependency.kind.as_str().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Dependencies that apply to the area at `version`.
    pub fn applicable_to(&self, version: Version) -> impl Iterator<Item = &AreaDependency> {
        self.dependencies
            .iter()
            .filter(move |dependency| dependency.dependent_version <= version)
    }
}

/// Metadata the storage layer keeps for each configuration area.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaMetadata {
    pub versions: AreaVersions,
    /// Activation time of each version that has been active.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub activation_history: BTreeMap<Version, DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyRecord>,
}

impl AreaMetadata {
    /// The version that was active at `at`.
    ///
    /// An activation at exactly `at` counts as already active. Times before the
    /// first recorded activation fall back to the oldest version in the history
    /// (or the current active version when there is no history).
    pub fn version_active_at(&self, at: DateTime<Utc>) -> Version {
        let mut best: Option<(Version, DateTime<Utc>)> = None;
        for (version, activated) in &self.activation_history {
            if *activated > at {
                continue;
            }
            let newer = match best {
                None => true,
                Some((best_version, best_time)) => {
                    *activated > best_time || (*activated == best_time && *version > best_version)
                }
            };
            if newer {
                best = Some((*version, *activated));
            }
        }
        match best {
            Some((version, _)) => version,
            None => self
                .activation_history
                .keys()
                .next()
                .copied()
                .unwrap_or(self.versions.active),
        }
    }

    /// Version of the last persisted dependency snapshot, 0 when none exists.
    pub fn dependency_snapshot_version(&self) -> Version {
        self.dependencies
            .as_ref()
            .map_or(0, |record| record.version)
    }
}
