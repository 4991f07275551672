//! Phase 0: persisted area dependencies against the requested pins.

use crate::engine::CheckRun;
use crate::error::CheckError;
use crate::result::{Finding, finding_class};
use cfgcat_model::{Catalog, DependencyKind, ObjectId, ObjectRef};
use tracing::debug;

impl<C: Catalog + ?Sized> CheckRun<'_, '_, C> {
    /// Returns `false` when a required dependency names an area missing from
    /// the pins at a sufficient version; the run must then stop.
    pub(crate) fn check_area_dependencies(&mut self) -> Result<bool, CheckError> {
        let mut proceed = true;
        let pinned: Vec<_> = self
            .view
            .areas()
            .filter(|area| area.pinned)
            .cloned()
            .collect();

        for area in pinned {
            let Some(record) = area.metadata.dependencies.as_ref() else {
                continue;
            };
            debug!(area = %area.area, version = area.version, "checking area dependencies");
            let area_ref = self.area_ref(area.area)?;
            for dependency in record.applicable_to(area.version) {
                let available = self.view.version_of(dependency.area);
                if available.is_some_and(|version| version >= dependency.needed_version) {
                    continue;
                }
                let target = self.area_ref(dependency.area)?;
                let found = match available {
                    Some(version) => format!("version {version}"),
                    None => "no version".to_string(),
                };
                let message = format!(
                    "{} needs area {target} in version {} or later from version {} on, found {found}",
                    dependency.kind, dependency.needed_version, dependency.dependent_version
                );
                let finding = match dependency.kind {
                    DependencyKind::Optional => {
                        Finding::warning(finding_class::AREA_DEPENDENCY_OPTIONAL, message)
                    }
                    DependencyKind::Required if self.view.is_pinned(dependency.area) => {
                        Finding::local(finding_class::AREA_DEPENDENCY_VERSION, message)
                    }
                    DependencyKind::Required => {
                        proceed = false;
                        Finding::local(finding_class::AREA_DEPENDENCY_MISSING, message)
                    }
                };
                self.report(finding.in_area(area_ref.clone()));
            }
        }
        Ok(proceed)
    }

    /// Handle of an area object, falling back to the bare id.
    pub(crate) fn area_ref(&self, area: ObjectId) -> Result<ObjectRef, CheckError> {
        Ok(match self.view.resolve(area)? {
            Some(object) => object.handle(),
            None => ObjectRef {
                id: area,
                pid: String::new(),
            },
        })
    }
}
