//! Reference walk over stored records and composition ownership.
//!
//! | target state            | composition | required agg./assoc. | optional |
//! |-------------------------|-------------|----------------------|----------|
//! | undefined (id 0)        | interference| interference         | ok       |
//! | unresolvable            | local       | interference         | warning  |
//! | wrong type              | local       | local                | local    |
//! | not valid in the view   | local       | interference         | warning  |
//!
//! Valid aggregation and association targets record a dependency, optional
//! for associations that allow the undefined value and required otherwise.

use crate::engine::CheckRun;
use crate::error::CheckError;
use crate::result::{Finding, finding_class};
use cfgcat_model::{
    AttributeTypeSpec, Catalog, Data, DependencyKind, ObjectId, ObjectKind, ReferenceType,
    SystemObject, pids,
};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

/// Composed object id to the id of the object composing it.
pub(crate) type CompositionOwners = BTreeMap<ObjectId, ObjectId>;

/// A reference attribute being checked, with the record it sits in.
struct ReferenceField<'a> {
    owner: &'a SystemObject,
    group: &'a SystemObject,
    attribute: &'a SystemObject,
    record: &'a Data,
    target_type: Option<ObjectId>,
    reference: ReferenceType,
    undefined_allowed: bool,
}

impl ReferenceField<'_> {
    fn describe(&self) -> String {
        format!(
            "{} reference `{}` of {}",
            self.reference,
            self.attribute.name,
            self.owner.label()
        )
    }
}

impl<C: Catalog + ?Sized> CheckRun<'_, '_, C> {
    /// Check every reference in `record` stored on `owner` under `group`.
    ///
    /// Returns whether the group's attribute structure resolved completely.
    pub(crate) fn check_record_references(
        &mut self,
        owner: &SystemObject,
        group: &SystemObject,
        record: &Data,
        owners: &mut CompositionOwners,
    ) -> Result<bool, CheckError> {
        let mut complete = true;
        self.walk_attributes(owner, group, group, record, owners, &mut complete)?;
        Ok(complete)
    }

    fn walk_attributes(
        &mut self,
        owner: &SystemObject,
        group: &SystemObject,
        set: &SystemObject,
        record: &Data,
        owners: &mut CompositionOwners,
        complete: &mut bool,
    ) -> Result<(), CheckError> {
        for attribute in self.view.attributes(set)? {
            let Some(spec) = attribute.attribute_spec() else {
                continue;
            };
            let type_spec = self
                .view
                .object(spec.attribute_type)?
                .and_then(|object| object.attribute_type().cloned());
            let Some(type_spec) = type_spec else {
                *complete = false;
                continue;
            };
            let Some(value) = record.field(&attribute.name) else {
                continue;
            };
            let values: Vec<&Data> = match value {
                Data::Array(items) if spec.is_array() => items.iter().collect(),
                other => vec![other],
            };

            match type_spec {
                AttributeTypeSpec::List { attribute_list } => {
                    let Some(list) = self.view.object(attribute_list)? else {
                        *complete = false;
                        continue;
                    };
                    for value in values {
                        self.walk_attributes(owner, group, &list, value, owners, complete)?;
                    }
                }
                AttributeTypeSpec::Reference {
                    target_type,
                    reference,
                    undefined_allowed,
                } => {
                    let field = ReferenceField {
                        owner,
                        group,
                        attribute: &attribute,
                        record,
                        target_type,
                        reference,
                        undefined_allowed,
                    };
                    for value in values {
                        if let Some(id) = value.as_reference() {
                            self.check_reference(&field, id, owners)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_reference(
        &mut self,
        field: &ReferenceField<'_>,
        id: ObjectId,
        owners: &mut CompositionOwners,
    ) -> Result<(), CheckError> {
        let optional = field.undefined_allowed;
        if id.is_undefined() {
            if !optional {
                self.report(
                    Finding::interference(
                        finding_class::REFERENCE_UNDEFINED,
                        format!("{} is undefined but must be set", field.describe()),
                    )
                    .with_object(field.owner),
                );
            }
            return Ok(());
        }

        let Some(target) = self.view.resolve(id)? else {
            let message = format!("{} names unknown object {id}", field.describe());
            let finding = match field.reference {
                ReferenceType::Composition => {
                    Finding::local(finding_class::REFERENCE_UNRESOLVED, message)
                }
                _ if optional => Finding::warning(finding_class::REFERENCE_UNRESOLVED, message),
                _ => Finding::interference(finding_class::REFERENCE_UNRESOLVED, message),
            };
            self.report(finding.with_object(field.owner));
            return Ok(());
        };

        if let Some(target_type) = field.target_type
            && !self.view.is_of_type(&target, target_type)?
        {
            self.report(
                Finding::local(
                    finding_class::REFERENCE_WRONG_TYPE,
                    format!(
                        "{} names {} which is not of type {target_type}",
                        field.describe(),
                        target.label()
                    ),
                )
                .with_object(field.owner)
                .with_object(&target),
            );
            return Ok(());
        }

        match field.reference {
            ReferenceType::Composition => {
                if !self.view.is_valid(&target) {
                    self.report(
                        Finding::local(
                            finding_class::REFERENCE_INVALID_TARGET,
                            format!("{} names {} which is not valid", field.describe(), target.label()),
                        )
                        .with_object(field.owner)
                        .with_object(&target),
                    );
                    return Ok(());
                }
                self.check_composed(field.owner, &target, owners)
            }
            ReferenceType::Aggregation | ReferenceType::Association => {
                if !self.view.is_valid(&target) {
                    if let Some(successor) = self.authority_successor(field)? {
                        self.tracker.check_dependency(
                            self.view,
                            field.owner,
                            &successor,
                            DependencyKind::Required,
                        )?;
                        return Ok(());
                    }
                    let message =
                        format!("{} names {} which is not valid", field.describe(), target.label());
                    let finding = if optional {
                        Finding::warning(finding_class::REFERENCE_INVALID_TARGET, message)
                    } else {
                        Finding::interference(finding_class::REFERENCE_INVALID_TARGET, message)
                    };
                    self.report(finding.with_object(field.owner).with_object(&target));
                    return Ok(());
                }
                let kind = if field.reference == ReferenceType::Association && optional {
                    DependencyKind::Optional
                } else {
                    DependencyKind::Required
                };
                self.tracker
                    .check_dependency(self.view, field.owner, &target, kind)?;
                Ok(())
            }
        }
    }

    /// An area may keep naming its retired authority while its properties
    /// name a valid successor.
    fn authority_successor(
        &self,
        field: &ReferenceField<'_>,
    ) -> Result<Option<Arc<SystemObject>>, CheckError> {
        if !matches!(field.owner.kind, ObjectKind::Area)
            || field.group.pid != pids::ATG_AREA_PROPERTIES
            || field.attribute.name != pids::area_properties::AUTHORITY
        {
            return Ok(None);
        }
        let Some(successor) = field
            .record
            .field(pids::area_properties::NEW_AUTHORITY)
            .and_then(Data::as_reference)
        else {
            return Ok(None);
        };
        Ok(self.view.object(successor)?)
    }

    /// Rules shared by composition sets and composition references: same
    /// area, no dynamic objects, one owner.
    pub(crate) fn check_composed(
        &mut self,
        owner: &SystemObject,
        target: &SystemObject,
        owners: &mut CompositionOwners,
    ) -> Result<(), CheckError> {
        if target.area_id != owner.area_id {
            self.report(
                Finding::local(
                    finding_class::COMPOSITION_FOREIGN_AREA,
                    format!(
                        "{} composes {} from another configuration area",
                        owner.label(),
                        target.label()
                    ),
                )
                .with_object(owner)
                .with_object(target),
            );
        }
        if target.is_dynamic() {
            self.report(
                Finding::local(
                    finding_class::COMPOSITION_DYNAMIC_ELEMENT,
                    format!(
                        "{} composes dynamic object {}",
                        owner.label(),
                        target.label()
                    ),
                )
                .with_object(owner)
                .with_object(target),
            );
        }

        match owners.entry(target.id) {
            Entry::Vacant(entry) => {
                entry.insert(owner.id);
            }
            Entry::Occupied(entry) => {
                let first = *entry.get();
                if first != owner.id {
                    let first_owner = self.view.resolve(first)?;
                    let first_label = first_owner
                        .as_ref()
                        .map_or_else(|| format!("[id {first}]"), |object| object.label());
                    let mut finding = Finding::local(
                        finding_class::COMPOSITION_MULTIPLE_OWNERS,
                        format!(
                            "{} is composed by both {first_label} and {}",
                            target.label(),
                            owner.label()
                        ),
                    )
                    .with_object(target);
                    if let Some(first_owner) = &first_owner {
                        finding = finding.with_object(first_owner);
                    }
                    self.report(finding.with_object(owner));
                }
            }
        }
        Ok(())
    }
}
