//! Kinds of consistency check and their persistence policy.

use crate::result::ConsistencyCheckResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KindOfConsistencyCheck {
    LocalActivation,
    ReleaseForTransfer,
    ReleaseForActivation,
    ReleaseForActivationWithoutLocalActivation,
    ConsistencyCheck,
}

impl KindOfConsistencyCheck {
    pub const ALL: [KindOfConsistencyCheck; 5] = [
        KindOfConsistencyCheck::LocalActivation,
        KindOfConsistencyCheck::ReleaseForTransfer,
        KindOfConsistencyCheck::ReleaseForActivation,
        KindOfConsistencyCheck::ReleaseForActivationWithoutLocalActivation,
        KindOfConsistencyCheck::ConsistencyCheck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            KindOfConsistencyCheck::LocalActivation => "local-activation",
            KindOfConsistencyCheck::ReleaseForTransfer => "release-for-transfer",
            KindOfConsistencyCheck::ReleaseForActivation => "release-for-activation",
            KindOfConsistencyCheck::ReleaseForActivationWithoutLocalActivation => {
                "release-for-activation-without-local-activation"
            }
            KindOfConsistencyCheck::ConsistencyCheck => "consistency-check",
        }
    }

    /// Whether interference errors leave the gated step open.
    pub fn tolerates_interference(self) -> bool {
        matches!(
            self,
            KindOfConsistencyCheck::ReleaseForTransfer
                | KindOfConsistencyCheck::ReleaseForActivationWithoutLocalActivation
                | KindOfConsistencyCheck::ConsistencyCheck
        )
    }

    /// Whether a clean run of this kind persists discovered dependencies.
    pub fn persists_dependencies(self) -> bool {
        !matches!(
            self,
            KindOfConsistencyCheck::ReleaseForActivation | KindOfConsistencyCheck::ConsistencyCheck
        )
    }

    /// Whether `result` stops the step this kind of check gates.
    ///
    /// Local errors always block; interference errors block the activation kinds.
    pub fn blocked_by(self, result: &ConsistencyCheckResult) -> bool {
        result.has_local_errors()
            || (result.has_interference_errors() && !self.tolerates_interference())
    }

    /// Whether discovered dependencies may be persisted after a run with `result`.
    ///
    /// Local activation tolerates no errors at all; the release steps tolerate
    /// interference errors. Plain checks and release for activation never persist.
    pub fn permits_persistence(self, result: &ConsistencyCheckResult) -> bool {
        self.persists_dependencies() && !self.blocked_by(result)
    }
}

impl fmt::Display for KindOfConsistencyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind of consistency check `{0}`")]
pub struct UnknownKind(pub String);

impl FromStr for KindOfConsistencyCheck {
    type Err = UnknownKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownKind(raw.to_string()))
    }
}
