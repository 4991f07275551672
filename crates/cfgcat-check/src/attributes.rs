//! Attribute definitions: defaults, positions, integer states, definedness.

use crate::engine::CheckRun;
use crate::error::CheckError;
use crate::result::{Finding, finding_class};
use cfgcat_model::{AttributeTypeSpec, Catalog, Data, SystemObject, pids};
use std::collections::BTreeSet;

impl<C: Catalog + ?Sized> CheckRun<'_, '_, C> {
    /// Every attribute of a group or list needs a parsable default or a type
    /// with an undefined value.
    pub(crate) fn check_attribute_defaults(&mut self, set: &SystemObject) -> Result<(), CheckError> {
        for attribute in self.view.attributes(set)? {
            let Some(spec) = attribute.attribute_spec() else {
                continue;
            };
            let type_spec = self
                .view
                .object(spec.attribute_type)?
                .and_then(|object| object.attribute_type().cloned());
            let Some(type_spec) = type_spec else {
                self.report(
                    Finding::interference(
                        finding_class::ATTRIBUTE_TYPE_INVALID,
                        format!(
                            "attribute `{}` of {} has no valid attribute type {}",
                            attribute.name,
                            set.label(),
                            spec.attribute_type
                        ),
                    )
                    .with_object(set)
                    .with_object(&attribute),
                );
                continue;
            };

            match &spec.default {
                Some(text) => {
                    if let Err(error) = type_spec.validate_default(text) {
                        self.report(
                            Finding::local(
                                finding_class::ATTRIBUTE_DEFAULT_INVALID,
                                format!(
                                    "default `{text}` of attribute `{}` in {}: {error}",
                                    attribute.name,
                                    set.label()
                                ),
                            )
                            .with_object(set)
                            .with_object(&attribute),
                        );
                    }
                }
                None => {
                    let is_list = matches!(type_spec, AttributeTypeSpec::List { .. });
                    if !is_list && type_spec.undefined_value().is_none() {
                        self.report(
                            Finding::local(
                                finding_class::ATTRIBUTE_NO_DEFAULT,
                                format!(
                                    "attribute `{}` in {} has no default and its type has no undefined value",
                                    attribute.name,
                                    set.label()
                                ),
                            )
                            .with_object(set)
                            .with_object(&attribute),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Positions must be unique and run from 1 without gaps.
    pub(crate) fn check_attribute_positions(&mut self, set: &SystemObject) -> Result<(), CheckError> {
        let positions: Vec<u32> = self
            .view
            .attributes(set)?
            .iter()
            .filter_map(|attribute| attribute.attribute_spec().map(|spec| spec.position))
            .collect();

        let mut distinct = BTreeSet::new();
        let duplicates: BTreeSet<u32> = positions
            .iter()
            .copied()
            .filter(|position| !distinct.insert(*position))
            .collect();
        if !duplicates.is_empty() {
            self.report(
                Finding::local(
                    finding_class::ATTRIBUTE_POSITION_DUPLICATE,
                    format!(
                        "attribute positions {duplicates:?} of {} are used more than once",
                        set.label()
                    ),
                )
                .with_object(set),
            );
        }

        let expected: BTreeSet<u32> = (1..).take(distinct.len()).collect();
        if distinct != expected {
            self.report(
                Finding::local(
                    finding_class::ATTRIBUTE_POSITION_GAP,
                    format!(
                        "attribute positions of {} must run 1..={} without gaps, found {distinct:?}",
                        set.label(),
                        distinct.len()
                    ),
                )
                .with_object(set),
            );
        }
        Ok(())
    }

    pub(crate) fn check_integer_states(&mut self, attribute_type: &SystemObject) {
        let Some(AttributeTypeSpec::Integer { states, .. }) = attribute_type.attribute_type() else {
            return;
        };
        let mut names = BTreeSet::new();
        let mut values = BTreeSet::new();
        let duplicate_names: BTreeSet<&str> = states
            .iter()
            .map(|state| state.name.as_str())
            .filter(|name| !names.insert(*name))
            .collect();
        let duplicate_values: BTreeSet<i64> = states
            .iter()
            .map(|state| state.value)
            .filter(|value| !values.insert(*value))
            .collect();

        if !duplicate_names.is_empty() {
            self.report(
                Finding::warning(
                    finding_class::INTEGER_STATE_NAME_DUPLICATE,
                    format!(
                        "state names {duplicate_names:?} of {} are not unique",
                        attribute_type.label()
                    ),
                )
                .with_object(attribute_type),
            );
        }
        if !duplicate_values.is_empty() {
            self.report(
                Finding::warning(
                    finding_class::INTEGER_STATE_VALUE_DUPLICATE,
                    format!(
                        "state values {duplicate_values:?} of {} are not unique",
                        attribute_type.label()
                    ),
                )
                .with_object(attribute_type),
            );
        }
    }

    /// Whether every attribute of `set` carries a defined value in `record`.
    ///
    /// References are left to the reference walk, which reports undefined
    /// references itself. Attributes whose type cannot be resolved are skipped.
    pub(crate) fn record_is_defined(&self, set: &SystemObject, record: &Data) -> Result<bool, CheckError> {
        for attribute in self.view.attributes(set)? {
            let Some(spec) = attribute.attribute_spec() else {
                continue;
            };
            let Some(type_object) = self.view.object(spec.attribute_type)? else {
                continue;
            };
            let Some(type_spec) = type_object.attribute_type() else {
                continue;
            };
            let Some(value) = record.field(&attribute.name) else {
                return Ok(false);
            };

            let elements: Vec<&Data> = if spec.is_array() {
                let Some(items) = value.as_array() else {
                    return Ok(false);
                };
                if !spec.variable_count && items.len() != spec.count as usize {
                    return Ok(false);
                }
                items.iter().collect()
            } else {
                vec![value]
            };

            for element in elements {
                let defined = match type_spec {
                    AttributeTypeSpec::Reference { .. } => true,
                    AttributeTypeSpec::List { attribute_list } => {
                        match self.view.object(*attribute_list)? {
                            Some(list) => self.record_is_defined(&list, element)?,
                            None => true,
                        }
                    }
                    scalar => !scalar.is_undefined(element),
                };
                if !defined {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Old area change-information records were written with every timestamp
/// zero; they are accepted as defined.
pub(crate) fn is_legacy_change_information(group: &SystemObject, record: &Data) -> bool {
    group.pid == pids::ATG_AREA_CHANGE_INFORMATION
        && record.all_leaves(&|leaf| matches!(leaf, Data::Time(0)))
}
