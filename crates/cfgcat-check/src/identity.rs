//! Phase 1: object enumeration and identity checks.

use crate::engine::CheckRun;
use crate::error::CheckError;
use crate::result::{Finding, finding_class};
use cfgcat_model::{Catalog, ObjectId, SystemObject, Validity};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use tracing::debug;

/// Identity maps built in phase 1 and read by the later phases.
#[derive(Debug, Default)]
pub(crate) struct ObjectIndex {
    pub(crate) by_id: BTreeMap<ObjectId, Arc<SystemObject>>,
    pub(crate) by_pid: BTreeMap<String, Arc<SystemObject>>,
    /// Objects valid in their area's checked version, per area.
    pub(crate) check_objects: BTreeMap<ObjectId, Vec<Arc<SystemObject>>>,
}

impl ObjectIndex {
    pub(crate) fn check_objects(&self) -> impl Iterator<Item = &Arc<SystemObject>> {
        self.check_objects.values().flatten()
    }
}

impl<C: Catalog + ?Sized> CheckRun<'_, '_, C> {
    pub(crate) fn collect_objects(&mut self) -> Result<ObjectIndex, CheckError> {
        let mut index = ObjectIndex::default();
        let areas: Vec<_> = self.view.areas().cloned().collect();

        for area in areas {
            if self.cancelled() {
                break;
            }
            debug!(
                area = %area.area,
                version = area.version,
                active = area.active_version(),
                "collecting objects"
            );
            self.result.stats.areas_checked += 1;

            let mut area_pids: BTreeMap<String, Arc<SystemObject>> = BTreeMap::new();
            let mut checked = Vec::new();
            for object in self.view.catalog().area_objects(area.area)? {
                // Enumerate what is valid now or becomes valid with the checked
                // version; only the latter is checked.
                let (enumerated, in_check) = match &object.validity {
                    Validity::Configuration { .. } => {
                        let in_check = object.validity.is_valid_in(area.version);
                        (
                            in_check || object.validity.is_valid_in(area.active_version()),
                            in_check,
                        )
                    }
                    Validity::Dynamic { .. } => {
                        let valid = self.view.is_valid(&object);
                        (valid, valid)
                    }
                };
                if !enumerated {
                    continue;
                }
                self.index_identity(&mut index, &object);
                if !in_check {
                    continue;
                }

                if !object.pid.is_empty() {
                    match area_pids.entry(object.pid.clone()) {
                        Entry::Vacant(entry) => {
                            entry.insert(Arc::clone(&object));
                        }
                        Entry::Occupied(entry) => {
                            let first = Arc::clone(entry.get());
                            self.report(
                                Finding::local(
                                    finding_class::PID_DUPLICATE_IN_AREA,
                                    format!(
                                        "pid `{}` designates two objects valid in version {}",
                                        object.pid, area.version
                                    ),
                                )
                                .with_object(&first)
                                .with_object(&object),
                            );
                        }
                    }
                }

                if object.attribute_set().is_some() {
                    self.check_attribute_defaults(&object)?;
                }
                checked.push(object);
            }

            self.result.stats.objects_checked += checked.len();
            index.check_objects.insert(area.area, checked);
        }
        Ok(index)
    }

    fn index_identity(&mut self, index: &mut ObjectIndex, object: &Arc<SystemObject>) {
        match index.by_id.entry(object.id) {
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(object));
            }
            Entry::Occupied(entry) => {
                if !Arc::ptr_eq(entry.get(), object) {
                    let first = Arc::clone(entry.get());
                    self.report(
                        Finding::local(
                            finding_class::ID_DUPLICATE,
                            format!("id {} is used by two different objects", object.id),
                        )
                        .with_object(&first)
                        .with_object(object),
                    );
                }
            }
        }

        if object.pid.is_empty() {
            return;
        }
        match index.by_pid.entry(object.pid.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(object));
            }
            Entry::Occupied(entry) => {
                let first = entry.get();
                if first.area_id == object.area_id || first.id == object.id {
                    return;
                }
                let first = Arc::clone(first);
                let message = format!(
                    "pid `{}` is used in two configuration areas ({} and {})",
                    object.pid, first.area_id, object.area_id
                );
                let finding = if self.config.allow_double_pids {
                    Finding::warning(finding_class::PID_DUPLICATE_ACROSS_AREAS, message)
                } else {
                    Finding::interference(finding_class::PID_DUPLICATE_ACROSS_AREAS, message)
                };
                self.report(finding.with_object(&first).with_object(object));
            }
        }
    }
}
