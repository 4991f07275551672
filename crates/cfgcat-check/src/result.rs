//! Findings of a consistency check and their aggregation.

use crate::kind::KindOfConsistencyCheck;
use cfgcat_model::{FixAction, ObjectRef, SystemObject};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Informational; never blocks.
    Warning,
    /// Defect inside one area's own data; blocks every activation.
    LocalError,
    /// Defect arising from the combination of areas and versions under check.
    InterferenceError,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::LocalError => "LOCAL_ERROR",
            Severity::InterferenceError => "INTERFERENCE_ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable class identifiers attached to findings.
pub mod finding_class {
    pub const AREA_DEPENDENCY_MISSING: &str = "area.dependency_missing";
    pub const AREA_DEPENDENCY_VERSION: &str = "area.dependency_version";
    pub const AREA_DEPENDENCY_OPTIONAL: &str = "area.dependency_optional";
    pub const ID_DUPLICATE: &str = "id.duplicate";
    pub const PID_DUPLICATE_IN_AREA: &str = "pid.duplicate_in_area";
    pub const PID_DUPLICATE_ACROSS_AREAS: &str = "pid.duplicate_across_areas";
    pub const ATTRIBUTE_DEFAULT_INVALID: &str = "attribute.default_invalid";
    pub const ATTRIBUTE_NO_DEFAULT: &str = "attribute.no_default";
    pub const ATTRIBUTE_TYPE_INVALID: &str = "attribute.type_invalid";
    pub const ATTRIBUTE_POSITION_DUPLICATE: &str = "attribute.position_duplicate";
    pub const ATTRIBUTE_POSITION_GAP: &str = "attribute.position_gap";
    pub const INTEGER_STATE_NAME_DUPLICATE: &str = "integer.state_name_duplicate";
    pub const INTEGER_STATE_VALUE_DUPLICATE: &str = "integer.state_value_duplicate";
    pub const OBJECT_TYPE_INVALID: &str = "object.type_invalid";
    pub const SET_INVALID: &str = "set.invalid";
    pub const SET_UNDECLARED: &str = "set.undeclared";
    pub const SET_REQUIRED_MISSING: &str = "set.required_missing";
    pub const SET_CARDINALITY: &str = "set.cardinality";
    pub const SET_ELEMENT_INVALID: &str = "set.element_invalid";
    pub const SET_ELEMENT_TYPE: &str = "set.element_type";
    pub const SET_NULL_ELEMENT: &str = "set.null_element";
    pub const COMPOSITION_FOREIGN_AREA: &str = "composition.foreign_area";
    pub const COMPOSITION_DYNAMIC_ELEMENT: &str = "composition.dynamic_element";
    pub const COMPOSITION_MULTIPLE_OWNERS: &str = "composition.multiple_owners";
    pub const DATA_REQUIRED_MISSING: &str = "data.required_missing";
    pub const DATA_USAGE_NOT_ALLOWED: &str = "data.usage_not_allowed";
    pub const DATA_UNDEFINED: &str = "data.undefined";
    pub const REFERENCE_UNDEFINED: &str = "reference.undefined";
    pub const REFERENCE_UNRESOLVED: &str = "reference.unresolved";
    pub const REFERENCE_WRONG_TYPE: &str = "reference.wrong_type";
    pub const REFERENCE_INVALID_TARGET: &str = "reference.invalid_target";
    pub const PARAMETER_DEFAULT_INVALID: &str = "parameter.default_invalid";
    pub const PARAMETER_DEFAULT_MISSING: &str = "parameter.default_missing";
    pub const PARAMETER_DEFAULT_AMBIGUOUS: &str = "parameter.default_ambiguous";
    pub const HIERARCHY_UNKNOWN_PID: &str = "hierarchy.unknown_pid";
    pub const HIERARCHY_SET_NOT_ALLOWED: &str = "hierarchy.set_not_allowed";
    pub const HIERARCHY_SUCCESSOR_NOT_ALLOWED: &str = "hierarchy.successor_not_allowed";
    pub const HIERARCHY_CYCLE: &str = "hierarchy.cycle";
    pub const CHECK_INTERNAL: &str = "check.internal";
}

/// One classified defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ObjectRef>,
    pub message: String,
    /// Automatic repair for the defect; present only on local errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<FixAction>,
}

impl Finding {
    pub fn new(severity: Severity, class: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            class: class.to_string(),
            area: None,
            objects: Vec::new(),
            message: message.into(),
            fix: None,
        }
    }

    pub fn warning(class: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, class, message)
    }

    pub fn local(class: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::LocalError, class, message)
    }

    pub fn interference(class: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::InterferenceError, class, message)
    }

    pub fn in_area(mut self, area: ObjectRef) -> Self {
        self.area = Some(area);
        self
    }

    /// Attach `object` and default the area to the object's area id.
    pub fn with_object(mut self, object: &SystemObject) -> Self {
        if self.area.is_none() {
            self.area = Some(ObjectRef {
                id: object.area_id,
                pid: String::new(),
            });
        }
        self.objects.push(object.handle());
        self
    }

    pub fn with_fix(mut self, fix: FixAction) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn is_fixable(&self) -> bool {
        self.fix.is_some()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.class)?;
        if let Some(area) = &self.area {
            write!(f, " area {area}")?;
        }
        write!(f, ": {}", self.message)?;
        if !self.objects.is_empty() {
            let objects: Vec<String> = self.objects.iter().map(ToString::to_string).collect();
            write!(f, " ({})", objects.join(", "))?;
        }
        if self.fix.is_some() {
            f.write_str(" [fixable]")?;
        }
        Ok(())
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStats {
    pub areas_checked: usize,
    pub objects_checked: usize,
    pub resolutions: usize,
    pub supertype_memo_hits: usize,
    pub supertype_memo_misses: usize,
    pub dependencies_recorded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyCheckResult {
    pub kind: KindOfConsistencyCheck,
    pub findings: Vec<Finding>,
    /// The run stopped early; its findings are diagnostic only.
    #[serde(default)]
    pub cancelled: bool,
    /// Dependency records were written after the run.
    #[serde(default)]
    pub dependencies_persisted: bool,
    #[serde(default)]
    pub stats: CheckStats,
}

impl ConsistencyCheckResult {
    pub fn new(kind: KindOfConsistencyCheck) -> Self {
        Self {
            kind,
            findings: Vec::new(),
            cancelled: false,
            dependencies_persisted: false,
            stats: CheckStats::default(),
        }
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |finding| finding.severity == severity)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::Warning)
    }

    pub fn local_errors(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::LocalError)
    }

    pub fn interference_errors(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::InterferenceError)
    }

    pub fn has_local_errors(&self) -> bool {
        self.local_errors().next().is_some()
    }

    pub fn has_interference_errors(&self) -> bool {
        self.interference_errors().next().is_some()
    }

    /// Findings that carry an automatic repair.
    pub fn fixables(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|finding| finding.is_fixable())
    }

    pub fn count_class(&self, class: &str) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.class == class)
            .count()
    }

    /// Whether the step gated by the run's kind of check may go ahead.
    pub fn accepted(&self) -> bool {
        !self.cancelled && !self.kind.blocked_by(self)
    }
}
