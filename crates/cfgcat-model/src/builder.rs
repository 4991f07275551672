//! Programmatic catalog assembly.
//!
//! [`CatalogBuilder`] seeds a minimal metamodel area (the meta types every
//! object needs, plus the area-properties attribute group) and then hands
//! out fresh ids for areas, types, sets and objects. Insert failures are
//! collected and reported once by [`CatalogBuilder::build`].

use crate::area::{AreaMetadata, AreaVersions};
use crate::attribute::AttributeTypeSpec;
use crate::catalog::{Catalog, CatalogError};
use crate::data::Data;
use crate::ids::{NOT_VALID, ObjectId, Version};
use crate::kinds::{ReferenceType, Usage};
use crate::memory::{ObjectStore, ObjectStoreError};
use crate::object::{
    AttributeGroupSpec, AttributeSetSpec, AttributeSpec, ObjectKind, ObjectSetSpec, SetElement,
    SetTypeSpec, SetUseSpec, SystemObject, TypeSpec, UsageSpec, Validity,
};
use crate::pids;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub const META_AREA_PID: &str = "kb.metaModel";
pub const META_AUTHORITY_PID: &str = "kv.metaModel";
pub const ASP_PROPERTIES_PID: &str = "asp.properties";

const FIRST_USER_ID: u64 = 1_000;

/// Ids of the seeded metamodel objects.
#[derive(Debug, Clone, Copy)]
pub struct MetaTypes {
    pub area: ObjectId,
    pub authority: ObjectId,
    pub type_type: ObjectId,
    pub area_type: ObjectId,
    pub authority_type: ObjectId,
    pub set_type_type: ObjectId,
    pub set_use_type: ObjectId,
    pub object_set_type: ObjectId,
    pub attribute_group_type: ObjectId,
    pub attribute_list_type: ObjectId,
    pub attribute_type: ObjectId,
    pub attribute_type_type: ObjectId,
    pub usage_type: ObjectId,
    pub aspect_type: ObjectId,
    pub properties_aspect: ObjectId,
    pub area_properties_usage: ObjectId,
}

pub struct CatalogBuilder {
    store: ObjectStore,
    next_id: u64,
    meta: MetaTypes,
    errors: Vec<ObjectStoreError>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        let placeholder = ObjectId::UNDEFINED;
        let mut builder = Self {
            store: ObjectStore::default(),
            next_id: 1,
            meta: MetaTypes {
                area: placeholder,
                authority: placeholder,
                type_type: placeholder,
                area_type: placeholder,
                authority_type: placeholder,
                set_type_type: placeholder,
                set_use_type: placeholder,
                object_set_type: placeholder,
                attribute_group_type: placeholder,
                attribute_list_type: placeholder,
                attribute_type: placeholder,
                attribute_type_type: placeholder,
                usage_type: placeholder,
                aspect_type: placeholder,
                properties_aspect: placeholder,
                area_properties_usage: placeholder,
            },
            errors: Vec::new(),
        };
        builder.seed_metamodel();
        builder.next_id = FIRST_USER_ID;
        builder
    }

    pub fn meta(&self) -> MetaTypes {
        self.meta
    }

    fn seed_metamodel(&mut self) {
        let area = self.fresh_id();
        let authority = self.fresh_id();
        let type_type = self.fresh_id();
        let area_type = self.fresh_id();
        let authority_type = self.fresh_id();
        self.meta.area = area;
        self.meta.authority = authority;
        self.meta.type_type = type_type;
        self.meta.area_type = area_type;
        self.meta.authority_type = authority_type;

        let area_object = raw_object(area, META_AREA_PID, area_type, area, ObjectKind::Area);
        if let Err(error) = self.store.insert_area(
            area_object,
            AreaMetadata {
                versions: AreaVersions {
                    active: 1,
                    modifiable: 2,
                    transferable: 1,
                    activatable: 1,
                },
                ..AreaMetadata::default()
            },
        ) {
            self.errors.push(error);
        }
        self.put(raw_object(
            authority,
            META_AUTHORITY_PID,
            authority_type,
            area,
            ObjectKind::Authority,
        ));
        self.put(raw_object(
            type_type,
            "typ.type",
            type_type,
            area,
            ObjectKind::Type(TypeSpec {
                configuring: true,
                ..TypeSpec::default()
            }),
        ));
        self.put(raw_object(
            authority_type,
            "typ.authority",
            type_type,
            area,
            ObjectKind::Type(TypeSpec {
                configuring: true,
                ..TypeSpec::default()
            }),
        ));

        self.meta.set_type_type = self.meta_type("typ.objectSetType");
        self.meta.set_use_type = self.meta_type("typ.objectSetUse");
        self.meta.object_set_type = self.meta_type("typ.objectSet");
        self.meta.attribute_group_type = self.meta_type("typ.attributeGroup");
        self.meta.attribute_list_type = self.meta_type("typ.attributeList");
        self.meta.attribute_type = self.meta_type("typ.attribute");
        self.meta.attribute_type_type = self.meta_type("typ.attributeType");
        self.meta.usage_type = self.meta_type("typ.attributeGroupUsage");
        self.meta.aspect_type = self.meta_type("typ.aspect");
        self.meta.properties_aspect = self.aspect(area, ASP_PROPERTIES_PID);

        let authority_ref = self.attribute_type(
            area,
            "att.authorityReference",
            AttributeTypeSpec::Reference {
                target_type: Some(authority_type),
                reference: ReferenceType::Aggregation,
                undefined_allowed: false,
            },
        );
        let successor_ref = self.attribute_type(
            area,
            "att.successorAuthorityReference",
            AttributeTypeSpec::Reference {
                target_type: Some(authority_type),
                reference: ReferenceType::Association,
                undefined_allowed: true,
            },
        );
        let authority_attr = self.attribute(area, pids::area_properties::AUTHORITY, 1, authority_ref);
        let successor_attr =
            self.attribute(area, pids::area_properties::NEW_AUTHORITY, 2, successor_ref);
        let group = self.attribute_group(
            area,
            pids::ATG_AREA_PROPERTIES,
            vec![authority_attr, successor_attr],
        );
        let usage = self.usage(
            area,
            group,
            self.meta.properties_aspect,
            Usage::RequiredConfigurationData,
        );
        self.meta.area_properties_usage = usage;

        self.put(raw_object(
            area_type,
            "typ.configurationArea",
            type_type,
            area,
            ObjectKind::Type(TypeSpec {
                configuring: true,
                attribute_groups: vec![group],
                ..TypeSpec::default()
            }),
        ));
        self.set_data(
            area,
            usage,
            area_properties(authority, ObjectId::UNDEFINED),
        );
    }

    fn meta_type(&mut self, pid: &str) -> ObjectId {
        let id = self.fresh_id();
        self.put(raw_object(
            id,
            pid,
            self.meta.type_type,
            self.meta.area,
            ObjectKind::Type(TypeSpec {
                configuring: true,
                ..TypeSpec::default()
            }),
        ));
        id
    }

    fn fresh_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    fn put(&mut self, object: SystemObject) {
        if let Err(error) = self.store.insert_object(object) {
            self.errors.push(error);
        }
    }

    fn create(&mut self, area: ObjectId, pid: &str, type_id: ObjectId, kind: ObjectKind) -> ObjectId {
        let id = self.fresh_id();
        self.put(raw_object(id, pid, type_id, area, kind));
        id
    }

    /// Insert a fully specified object, e.g. one reusing an existing id.
    pub fn insert(&mut self, object: SystemObject) {
        self.put(object);
    }

    pub fn authority(&mut self, area: ObjectId, pid: &str) -> ObjectId {
        let type_id = self.meta.authority_type;
        self.create(area, pid, type_id, ObjectKind::Authority)
    }

    /// Register a configuration area owned by `authority`.
    pub fn area(&mut self, pid: &str, authority: ObjectId, versions: AreaVersions) -> ObjectId {
        let id = self.fresh_id();
        let mut object = raw_object(id, pid, self.meta.area_type, id, ObjectKind::Area);
        object.data.insert(
            self.meta.area_properties_usage,
            area_properties(authority, ObjectId::UNDEFINED),
        );
        if let Err(error) = self.store.insert_area(
            object,
            AreaMetadata {
                versions,
                ..AreaMetadata::default()
            },
        ) {
            self.errors.push(error);
        }
        id
    }

    pub fn area_metadata_mut(&mut self, area: ObjectId) -> Option<&mut AreaMetadata> {
        self.store.metadata_mut(area).ok()
    }

    pub fn object_type(&mut self, area: ObjectId, pid: &str, spec: TypeSpec) -> ObjectId {
        let type_id = self.meta.type_type;
        self.create(area, pid, type_id, ObjectKind::Type(spec))
    }

    pub fn set_type(&mut self, area: ObjectId, pid: &str, spec: SetTypeSpec) -> ObjectId {
        let type_id = self.meta.set_type_type;
        self.create(area, pid, type_id, ObjectKind::SetType(spec))
    }

    /// Declare a set use and attach it to `owner_type`.
    pub fn set_use(
        &mut self,
        area: ObjectId,
        owner_type: ObjectId,
        set_name: &str,
        set_type: ObjectId,
        required: bool,
    ) -> ObjectId {
        let id = self.fresh_id();
        let mut object = raw_object(
            id,
            "",
            self.meta.set_use_type,
            area,
            ObjectKind::SetUse(SetUseSpec {
                set_name: set_name.to_string(),
                set_type,
                required,
            }),
        );
        object.name = set_name.to_string();
        self.put(object);
        self.modify(owner_type, |object| {
            if let ObjectKind::Type(spec) = &mut object.kind {
                spec.set_uses.push(id);
            }
        });
        id
    }

    pub fn attribute_type(&mut self, area: ObjectId, pid: &str, spec: AttributeTypeSpec) -> ObjectId {
        let type_id = self.meta.attribute_type_type;
        self.create(area, pid, type_id, ObjectKind::AttributeType(spec))
    }

    /// Attribute named `name` at `position`; the name is the record field key.
    pub fn attribute(
        &mut self,
        area: ObjectId,
        name: &str,
        position: u32,
        attribute_type: ObjectId,
    ) -> ObjectId {
        self.attribute_with(
            area,
            name,
            AttributeSpec {
                position,
                count: 1,
                variable_count: false,
                attribute_type,
                default: None,
            },
        )
    }

    pub fn attribute_with(&mut self, area: ObjectId, name: &str, spec: AttributeSpec) -> ObjectId {
        let id = self.fresh_id();
        let mut object = raw_object(
            id,
            "",
            self.meta.attribute_type,
            area,
            ObjectKind::Attribute(spec),
        );
        object.name = name.to_string();
        self.put(object);
        id
    }

    pub fn attribute_group(
        &mut self,
        area: ObjectId,
        pid: &str,
        attributes: Vec<ObjectId>,
    ) -> ObjectId {
        let type_id = self.meta.attribute_group_type;
        self.create(
            area,
            pid,
            type_id,
            ObjectKind::AttributeGroup(AttributeGroupSpec {
                attributes: AttributeSetSpec { attributes },
                configuring: true,
                usages: Vec::new(),
            }),
        )
    }

    pub fn attribute_list(
        &mut self,
        area: ObjectId,
        pid: &str,
        attributes: Vec<ObjectId>,
    ) -> ObjectId {
        let type_id = self.meta.attribute_list_type;
        self.create(
            area,
            pid,
            type_id,
            ObjectKind::AttributeList(AttributeSetSpec { attributes }),
        )
    }

    pub fn aspect(&mut self, area: ObjectId, pid: &str) -> ObjectId {
        let type_id = self.meta.aspect_type;
        self.create(area, pid, type_id, ObjectKind::Aspect)
    }

    /// Bind `group` to `aspect` and register the usage with the group.
    pub fn usage(
        &mut self,
        area: ObjectId,
        group: ObjectId,
        aspect: ObjectId,
        usage: Usage,
    ) -> ObjectId {
        let type_id = self.meta.usage_type;
        let id = self.create(
            area,
            "",
            type_id,
            ObjectKind::AttributeGroupUsage(UsageSpec {
                attribute_group: group,
                aspect,
                usage,
                explicit_defined: false,
            }),
        );
        self.modify(group, |object| {
            if let ObjectKind::AttributeGroup(spec) = &mut object.kind {
                spec.usages.push(id);
            }
        });
        id
    }

    /// Configuration object valid since version 1.
    pub fn object(&mut self, area: ObjectId, pid: &str, type_id: ObjectId) -> ObjectId {
        self.create(area, pid, type_id, ObjectKind::Plain)
    }

    pub fn dynamic_object(
        &mut self,
        area: ObjectId,
        pid: &str,
        type_id: ObjectId,
        valid_since: DateTime<Utc>,
        transient: bool,
    ) -> ObjectId {
        let id = self.fresh_id();
        let mut object = raw_object(id, pid, type_id, area, ObjectKind::Plain);
        object.validity = Validity::Dynamic {
            valid_since,
            not_valid_since: None,
            transient,
        };
        self.put(object);
        id
    }

    /// Create a set of `set_type` named `name` owned by `owner`, with members valid since 1.
    pub fn object_set(
        &mut self,
        area: ObjectId,
        owner: ObjectId,
        set_type: ObjectId,
        name: &str,
        members: &[ObjectId],
    ) -> ObjectId {
        let id = self.fresh_id();
        let mut set = raw_object(
            id,
            "",
            set_type,
            area,
            ObjectKind::ObjectSet(ObjectSetSpec {
                elements: members
                    .iter()
                    .map(|member| SetElement::member(*member, 1))
                    .collect(),
            }),
        );
        set.name = name.to_string();
        self.put(set);
        self.modify(owner, |object| object.sets.push(id));
        id
    }

    pub fn set_data(&mut self, object: ObjectId, usage: ObjectId, data: Data) {
        self.modify(object, |target| {
            target.data.insert(usage, data);
        });
    }

    pub fn set_validity(&mut self, object: ObjectId, valid_since: Version, not_valid_since: Version) {
        self.modify(object, |target| {
            target.validity = Validity::Configuration {
                valid_since,
                not_valid_since,
            };
        });
    }

    /// Apply `edit` to the stored object with id `id`.
    pub fn modify(&mut self, id: ObjectId, edit: impl FnOnce(&mut SystemObject)) {
        let Some(current) = self.lookup(id) else {
            self.errors
                .push(CatalogError::ObjectNotFound(id).into());
            return;
        };
        let mut updated = current;
        edit(&mut updated);
        if let Err(error) = self.store.update_object(updated) {
            self.errors.push(error);
        }
    }

    fn lookup(&self, id: ObjectId) -> Option<SystemObject> {
        self.store
            .object(id)
            .ok()
            .flatten()
            .map(|object| (*object).clone())
    }

    pub fn build(self) -> Result<ObjectStore, ObjectStoreError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.store),
        }
    }
}

/// Area properties record naming the responsible authority and an optional successor.
pub fn area_properties(authority: ObjectId, new_authority: ObjectId) -> Data {
    Data::Record(BTreeMap::from([
        (
            pids::area_properties::AUTHORITY.to_string(),
            Data::Reference(authority),
        ),
        (
            pids::area_properties::NEW_AUTHORITY.to_string(),
            Data::Reference(new_authority),
        ),
    ]))
}

fn raw_object(
    id: ObjectId,
    pid: &str,
    type_id: ObjectId,
    area: ObjectId,
    kind: ObjectKind,
) -> SystemObject {
    SystemObject {
        id,
        pid: pid.to_string(),
        name: String::new(),
        type_id,
        area_id: area,
        validity: Validity::Configuration {
            valid_since: 1,
            not_valid_since: NOT_VALID,
        },
        sets: Vec::new(),
        data: BTreeMap::new(),
        kind,
    }
}
