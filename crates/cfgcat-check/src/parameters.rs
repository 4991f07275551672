//! Default parameter datasets on types and configuration objects.
//!
//! Each dataset entry names an object type, a parametrizing attribute group
//! and the serialized default record. Broken entries and parametrizing groups
//! without exactly one entry are warnings: the defaults only seed parameters
//! that nobody has set yet.

use crate::engine::CheckRun;
use crate::error::CheckError;
use crate::result::{Finding, finding_class};
use cfgcat_model::pids::default_parameter;
use cfgcat_model::{Catalog, Data, ObjectId, SystemObject, pids};
use std::collections::BTreeMap;

/// Outcome of decoding one dataset entry.
enum DatasetVerdict {
    Valid { object_type: ObjectId, group: ObjectId },
    Invalid(String),
}

impl<C: Catalog + ?Sized> CheckRun<'_, '_, C> {
    pub(crate) fn check_default_parameters(&mut self, object: &SystemObject) -> Result<(), CheckError> {
        let records = self
            .view
            .records_of_group(object, pids::ATG_DEFAULT_PARAMETER_DATASETS)?;
        if records.is_empty() {
            return Ok(());
        }

        let subject_type = if object.type_spec().is_some() {
            object.id
        } else {
            object.type_id
        };
        let mut coverage: BTreeMap<(ObjectId, ObjectId), usize> = BTreeMap::new();
        let mut types = vec![subject_type];

        for record in records {
            let entries = record
                .field(default_parameter::DATASETS)
                .and_then(Data::as_array)
                .unwrap_or_default();
            for (position, entry) in entries.iter().enumerate() {
                match self.judge_dataset(entry)? {
                    DatasetVerdict::Valid { object_type, group } => {
                        *coverage.entry((object_type, group)).or_default() += 1;
                        if !types.contains(&object_type) {
                            types.push(object_type);
                        }
                    }
                    DatasetVerdict::Invalid(reason) => {
                        self.report(
                            Finding::warning(
                                finding_class::PARAMETER_DEFAULT_INVALID,
                                format!(
                                    "default parameter dataset #{} of {}: {reason}",
                                    position + 1,
                                    object.label()
                                ),
                            )
                            .with_object(object),
                        );
                    }
                }
            }
        }

        for type_id in types {
            let Some(object_type) = self.view.object_type(type_id)? else {
                continue;
            };
            for group in self.view.attribute_groups(type_id)? {
                if !self.view.is_parameter_group(&group)? {
                    continue;
                }
                let count = coverage.get(&(type_id, group.id)).copied().unwrap_or(0);
                let (class, problem) = match count {
                    1 => continue,
                    0 => (finding_class::PARAMETER_DEFAULT_MISSING, "no"),
                    _ => (finding_class::PARAMETER_DEFAULT_AMBIGUOUS, "more than one"),
                };
                self.report(
                    Finding::warning(
                        class,
                        format!(
                            "{} has {problem} default dataset for parameter {} of type {}",
                            object.label(),
                            group.label(),
                            object_type.label()
                        ),
                    )
                    .with_object(object),
                );
            }
        }
        Ok(())
    }

    fn judge_dataset(&self, entry: &Data) -> Result<DatasetVerdict, CheckError> {
        let Some(type_id) = entry
            .field(default_parameter::TYPE)
            .and_then(Data::as_reference)
        else {
            return Ok(DatasetVerdict::Invalid("no object type".to_string()));
        };
        let Some(object_type) = self
            .view
            .object(type_id)?
            .filter(|object| object.type_spec().is_some())
        else {
            return Ok(DatasetVerdict::Invalid(format!(
                "object type {type_id} is not valid"
            )));
        };

        let Some(group_id) = entry
            .field(default_parameter::ATTRIBUTE_GROUP)
            .and_then(Data::as_reference)
        else {
            return Ok(DatasetVerdict::Invalid("no attribute group".to_string()));
        };
        let Some(group) = self
            .view
            .object(group_id)?
            .filter(|object| object.attribute_group().is_some())
        else {
            return Ok(DatasetVerdict::Invalid(format!(
                "attribute group {group_id} is not valid"
            )));
        };
        if !self.view.is_parameter_group(&group)? {
            return Ok(DatasetVerdict::Invalid(format!(
                "{} is not a parameter group",
                group.label()
            )));
        }
        let declared = self
            .view
            .attribute_groups(object_type.id)?
            .iter()
            .any(|candidate| candidate.id == group.id);
        if !declared {
            return Ok(DatasetVerdict::Invalid(format!(
                "{} is not an attribute group of {}",
                group.label(),
                object_type.label()
            )));
        }

        let version = entry
            .field(default_parameter::SERIALIZER_VERSION)
            .and_then(Data::as_integer)
            .and_then(|version| u32::try_from(version).ok());
        let Some(version) = version else {
            return Ok(DatasetVerdict::Invalid("no serializer version".to_string()));
        };
        let Some(bytes) = dataset_bytes(entry) else {
            return Ok(DatasetVerdict::Invalid("data is not a byte array".to_string()));
        };

        let decoded = match self.deserializer.deserialize(version, &bytes) {
            Ok(decoded) => decoded,
            Err(error) => return Ok(DatasetVerdict::Invalid(error.to_string())),
        };
        if !self.record_is_defined(&group, &decoded)? {
            return Ok(DatasetVerdict::Invalid(format!(
                "decoded record is not fully defined for {}",
                group.label()
            )));
        }
        Ok(DatasetVerdict::Valid {
            object_type: object_type.id,
            group: group.id,
        })
    }
}

/// Signed byte values as stored in the dataset's `data` array.
fn dataset_bytes(entry: &Data) -> Option<Vec<u8>> {
    entry
        .field(default_parameter::DATA)?
        .as_array()?
        .iter()
        .map(|value| {
            let signed = i8::try_from(value.as_integer()?).ok()?;
            Some(signed as u8)
        })
        .collect()
}

/// Encode serialized record bytes the way dataset entries store them.
pub fn dataset_entry(object_type: ObjectId, group: ObjectId, version: u32, bytes: &[u8]) -> Data {
    Data::record([
        (default_parameter::TYPE, Data::Reference(object_type)),
        (default_parameter::ATTRIBUTE_GROUP, Data::Reference(group)),
        (
            default_parameter::SERIALIZER_VERSION,
            Data::Integer(i64::from(version)),
        ),
        (
            default_parameter::DATA,
            Data::Array(
                bytes
                    .iter()
                    .map(|byte| Data::Integer(i64::from(*byte as i8)))
                    .collect(),
            ),
        ),
    ])
}
