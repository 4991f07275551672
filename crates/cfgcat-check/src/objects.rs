//! Phase 2: per-object structure.

use crate::attributes::is_legacy_change_information;
use crate::engine::CheckRun;
use crate::error::CheckError;
use crate::identity::ObjectIndex;
use crate::references::CompositionOwners;
use crate::result::{Finding, finding_class};
use cfgcat_model::{
    Catalog, DependencyKind, FixAction, ObjectId, ReferenceType, SetTypeSpec, SystemObject, Usage,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

impl<C: Catalog + ?Sized> CheckRun<'_, '_, C> {
    pub(crate) fn check_objects(&mut self, index: &ObjectIndex) -> Result<(), CheckError> {
        let mut owners = CompositionOwners::new();
        for (area, objects) in &index.check_objects {
            if self.cancelled() {
                break;
            }
            debug!(area = %area, objects = objects.len(), "checking object structure");
            for object in objects {
                self.check_object(object, &mut owners)?;
            }
        }
        Ok(())
    }

    fn check_object(
        &mut self,
        object: &SystemObject,
        owners: &mut CompositionOwners,
    ) -> Result<(), CheckError> {
        let Some(object_type) = self.view.object_type(object.type_id)? else {
            self.report(
                Finding::interference(
                    finding_class::OBJECT_TYPE_INVALID,
                    format!(
                        "type {} of {} is not valid",
                        object.type_id,
                        object.label()
                    ),
                )
                .with_object(object),
            );
            return Ok(());
        };
        self.tracker
            .check_dependency(self.view, object, &object_type, DependencyKind::Required)?;

        if object.is_configuration_object() {
            self.check_sets(object, &object_type, owners)?;
        }
        self.check_records(object, &object_type, owners)?;
        if object.attribute_set().is_some() {
            self.check_attribute_positions(object)?;
        }
        if object.attribute_type().is_some() {
            self.check_integer_states(object);
        }
        if object.is_configuration_object() {
            self.check_default_parameters(object)?;
        }
        Ok(())
    }

    fn check_sets(
        &mut self,
        object: &SystemObject,
        object_type: &SystemObject,
        owners: &mut CompositionOwners,
    ) -> Result<(), CheckError> {
        let uses = self.view.object_set_uses(object_type.id)?;
        let mut matched: BTreeSet<ObjectId> = BTreeSet::new();

        for set_id in &object.sets {
            let set = match self.view.resolve(*set_id)? {
                Some(set) if self.view.is_valid(&set) => set,
                resolved => {
                    let state = if resolved.is_some() { "not valid" } else { "unknown" };
                    self.report(
                        Finding::interference(
                            finding_class::SET_INVALID,
                            format!("set {set_id} of {} is {state}", object.label()),
                        )
                        .with_object(object),
                    );
                    continue;
                }
            };
            self.tracker
                .check_dependency(self.view, object, &set, DependencyKind::Required)?;

            let declared = uses.iter().find(|set_use| {
                set_use
                    .set_use_spec()
                    .is_some_and(|spec| spec.set_type == set.type_id && spec.set_name == set.name)
            });
            let Some(declared) = declared else {
                self.report(
                    Finding::local(
                        finding_class::SET_UNDECLARED,
                        format!(
                            "set `{}` of {} is not declared by type {}",
                            set.name,
                            object.label(),
                            object_type.label()
                        ),
                    )
                    .with_object(object)
                    .with_object(&set),
                );
                continue;
            };
            matched.insert(declared.id);

            let set_type = self
                .view
                .object(set.type_id)?
                .and_then(|set_type| set_type.set_type_spec().cloned());
            if let Some(set_type) = set_type {
                self.check_set_contents(object, &set, &set_type, owners)?;
            }
        }

        for set_use in &uses {
            let Some(spec) = set_use.set_use_spec() else {
                continue;
            };
            if spec.required && !matched.contains(&set_use.id) {
                self.report(
                    Finding::local(
                        finding_class::SET_REQUIRED_MISSING,
                        format!(
                            "{} lacks the required set `{}`",
                            object.label(),
                            spec.set_name
                        ),
                    )
                    .with_object(object),
                );
            }
        }
        Ok(())
    }

    fn check_set_contents(
        &mut self,
        owner: &SystemObject,
        set: &SystemObject,
        set_type: &SetTypeSpec,
        owners: &mut CompositionOwners,
    ) -> Result<(), CheckError> {
        let composition = set_type.reference == ReferenceType::Composition;
        let mut count = 0_u32;
        let mut has_null = false;

        for entry in self.view.elements(set, set_type.mutable) {
            let Some(element_id) = entry else {
                has_null = true;
                continue;
            };
            count += 1;

            let element = match self.view.resolve(element_id)? {
                Some(element) if self.view.is_valid(&element) => element,
                resolved => {
                    let state = if resolved.is_some() { "not valid" } else { "unknown" };
                    let message = format!(
                        "element {element_id} of set `{}` of {} is {state}",
                        set.name,
                        owner.label()
                    );
                    let finding = if composition {
                        Finding::local(finding_class::SET_ELEMENT_INVALID, message)
                    } else {
                        Finding::interference(finding_class::SET_ELEMENT_INVALID, message)
                    };
                    self.report(finding.with_object(owner).with_object(set));
                    continue;
                }
            };

            if !set_type.object_types.is_empty()
                && !self.is_any_of(&element, &set_type.object_types)?
            {
                self.report(
                    Finding::local(
                        finding_class::SET_ELEMENT_TYPE,
                        format!(
                            "element {} of set `{}` of {} has a type the set does not allow",
                            element.label(),
                            set.name,
                            owner.label()
                        ),
                    )
                    .with_object(owner)
                    .with_object(&element),
                );
            }

            if composition {
                self.check_composed(owner, &element, owners)?;
            } else {
                self.tracker
                    .check_dependency(self.view, owner, &element, DependencyKind::Required)?;
            }
        }

        if has_null {
            self.report(
                Finding::local(
                    finding_class::SET_NULL_ELEMENT,
                    format!(
                        "set `{}` of {} holds null entries left by deleted objects",
                        set.name,
                        owner.label()
                    ),
                )
                .with_object(owner)
                .with_object(set)
                .with_fix(FixAction::RemoveNullSetElements { set: set.id }),
            );
        }

        if !set_type.mutable {
            let too_few = count < set_type.minimum;
            let too_many = set_type.maximum > 0 && count > set_type.maximum;
            if too_few || too_many {
                let bound = if set_type.maximum > 0 {
                    format!("{}..={}", set_type.minimum, set_type.maximum)
                } else {
                    format!("at least {}", set_type.minimum)
                };
                self.report(
                    Finding::local(
                        finding_class::SET_CARDINALITY,
                        format!(
                            "set `{}` of {} holds {count} element(s), {bound} required",
                            set.name,
                            owner.label()
                        ),
                    )
                    .with_object(owner)
                    .with_object(set),
                );
            }
        }
        Ok(())
    }

    fn is_any_of(&self, object: &SystemObject, types: &[ObjectId]) -> Result<bool, CheckError> {
        for type_id in types {
            if self.view.is_of_type(object, *type_id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn check_records(
        &mut self,
        object: &SystemObject,
        object_type: &SystemObject,
        owners: &mut CompositionOwners,
    ) -> Result<(), CheckError> {
        let mut allowed: BTreeMap<ObjectId, (Arc<SystemObject>, Usage)> = BTreeMap::new();
        for group in self.view.attribute_groups(object_type.id)? {
            for usage in self.view.usages(&group)? {
                if let Some(spec) = usage.usage_spec()
                    && spec.usage.is_configuring()
                {
                    allowed.insert(usage.id, (Arc::clone(&group), spec.usage));
                }
            }
        }

        for (usage_id, (group, usage)) in &allowed {
            if usage.is_required() && !object.data.contains_key(usage_id) {
                self.report(
                    Finding::local(
                        finding_class::DATA_REQUIRED_MISSING,
                        format!(
                            "{} lacks the required record of {} ({})",
                            object.label(),
                            group.label(),
                            usage.as_str()
                        ),
                    )
                    .with_object(object),
                );
            }
        }

        for (usage_id, record) in &object.data {
            let Some((group, _)) = allowed.get(usage_id) else {
                self.report(
                    Finding::interference(
                        finding_class::DATA_USAGE_NOT_ALLOWED,
                        format!(
                            "{} stores a record under usage {usage_id}, which type {} does not allow",
                            object.label(),
                            object_type.label()
                        ),
                    )
                    .with_object(object),
                );
                continue;
            };
            self.tracker
                .check_dependency(self.view, object, group, DependencyKind::Required)?;

            let complete = self.check_record_references(object, group, record, owners)?;
            if complete
                && !self.record_is_defined(group, record)?
                && !is_legacy_change_information(group, record)
            {
                self.report(
                    Finding::local(
                        finding_class::DATA_UNDEFINED,
                        format!(
                            "record of {} on {} is not fully defined",
                            group.label(),
                            object.label()
                        ),
                    )
                    .with_object(object),
                );
            }
        }
        Ok(())
    }
}
