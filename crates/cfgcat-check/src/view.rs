//! Version-pinned projection of a catalog.
//!
//! A [`VersionedView`] answers every question the checker asks as if each
//! pinned area were frozen at its pinned version and every other area stayed
//! at its active version. Absence is an answer, not an error: lookups return
//! `Ok(None)` for unknown or invalid objects and fail only when the catalog
//! itself fails.

use crate::error::CheckError;
use crate::result::CheckStats;
use cfgcat_model::{
    AreaMetadata, Catalog, CatalogError, Data, ObjectId, PersistenceMode, SystemObject, TypeSpec,
    Validity, Version, pids,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One area as seen by a check run.
#[derive(Debug, Clone)]
pub struct AreaView {
    pub area: ObjectId,
    pub metadata: AreaMetadata,
    /// Pinned version, or the active version when not pinned.
    pub version: Version,
    pub pinned: bool,
}

impl AreaView {
    pub fn active_version(&self) -> Version {
        self.metadata.versions.active
    }
}

pub struct VersionedView<'c, C: Catalog + ?Sized> {
    catalog: &'c C,
    areas: BTreeMap<ObjectId, AreaView>,
    super_types: Mutex<HashMap<ObjectId, Arc<BTreeSet<ObjectId>>>>,
    resolutions: AtomicUsize,
    memo_hits: AtomicUsize,
    memo_misses: AtomicUsize,
}

impl<'c, C: Catalog + ?Sized> VersionedView<'c, C> {
    pub fn new(catalog: &'c C, pins: &[(ObjectId, Version)]) -> Result<Self, CheckError> {
        let pinned: BTreeMap<ObjectId, Version> = pins.iter().copied().collect();
        let known = catalog.area_ids()?;
        if let Some(unknown) = pinned.keys().find(|area| !known.contains(area)) {
            return Err(CheckError::UnknownPinnedArea(*unknown));
        }

        let mut areas = BTreeMap::new();
        for area in known {
            let metadata = catalog.area_metadata(area)?;
            let (version, is_pinned) = match pinned.get(&area) {
                Some(version) => (*version, true),
                None => (metadata.versions.active, false),
            };
            areas.insert(
                area,
                AreaView {
                    area,
                    metadata,
                    version,
                    pinned: is_pinned,
                },
            );
        }

        Ok(Self {
            catalog,
            areas,
            super_types: Mutex::new(HashMap::new()),
            resolutions: AtomicUsize::new(0),
            memo_hits: AtomicUsize::new(0),
            memo_misses: AtomicUsize::new(0),
        })
    }

    pub fn catalog(&self) -> &'c C {
        self.catalog
    }

    pub fn areas(&self) -> impl Iterator<Item = &AreaView> {
        self.areas.values()
    }

    pub fn area(&self, area: ObjectId) -> Option<&AreaView> {
        self.areas.get(&area)
    }

    pub fn version_of(&self, area: ObjectId) -> Option<Version> {
        self.areas.get(&area).map(|view| view.version)
    }

    pub fn is_pinned(&self, area: ObjectId) -> bool {
        self.areas.get(&area).is_some_and(|view| view.pinned)
    }

    /// Configuration objects are judged at their area's version, dynamic
    /// objects by whether they are currently valid.
    pub fn is_valid(&self, object: &SystemObject) -> bool {
        match &object.validity {
            Validity::Configuration { .. } => self
                .version_of(object.area_id)
                .is_some_and(|version| object.validity.is_valid_in(version)),
            Validity::Dynamic {
                not_valid_since, ..
            } => not_valid_since.is_none(),
        }
    }

    /// Dynamic objects flagged transient, or typed by a transient type.
    pub fn is_transient(&self, object: &SystemObject) -> Result<bool, CatalogError> {
        let Validity::Dynamic { transient, .. } = &object.validity else {
            return Ok(false);
        };
        if *transient {
            return Ok(true);
        }
        Ok(self
            .object_type(object.type_id)?
            .and_then(|object_type| object_type.type_spec().map(|spec| spec.persistence))
            .is_some_and(PersistenceMode::is_transient))
    }

    /// Resolve `id` regardless of validity.
    pub fn resolve(&self, id: ObjectId) -> Result<Option<Arc<SystemObject>>, CatalogError> {
        if id.is_undefined() {
            return Ok(None);
        }
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.catalog.object(id)
    }

    /// Resolve `id` to an object valid in this view.
    pub fn object(&self, id: ObjectId) -> Result<Option<Arc<SystemObject>>, CatalogError> {
        Ok(self.resolve(id)?.filter(|object| self.is_valid(object)))
    }

    pub fn object_by_pid(&self, pid: &str) -> Result<Option<Arc<SystemObject>>, CatalogError> {
        if pid.is_empty() {
            return Ok(None);
        }
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .catalog
            .objects_by_pid(pid)?
            .into_iter()
            .find(|object| self.is_valid(object)))
    }

    /// Valid type or set type, i.e. something instances can be typed by.
    pub fn object_type(&self, id: ObjectId) -> Result<Option<Arc<SystemObject>>, CatalogError> {
        Ok(self
            .object(id)?
            .filter(|object| object.type_spec().is_some() || object.set_type_spec().is_some()))
    }

    /// `type_id` plus every transitive supertype valid in this view.
    ///
    /// Computed breadth first and memoized for the lifetime of the view.
    pub fn super_types(&self, type_id: ObjectId) -> Result<Arc<BTreeSet<ObjectId>>, CatalogError> {
        if let Some(hit) = self.super_types.lock().get(&type_id).cloned() {
            self.memo_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }
        self.memo_misses.fetch_add(1, Ordering::Relaxed);

        let mut closure = BTreeSet::new();
        let mut queue = VecDeque::from([type_id]);
        while let Some(next) = queue.pop_front() {
            if !closure.insert(next) {
                continue;
            }
            if let Some(object) = self.object(next)?
                && let Some(spec) = object.type_spec()
            {
                queue.extend(spec.super_types.iter().copied());
            }
        }

        let closure = Arc::new(closure);
        self.super_types
            .lock()
            .insert(type_id, Arc::clone(&closure));
        Ok(closure)
    }

    pub fn inherits_from(&self, type_id: ObjectId, ancestor: ObjectId) -> Result<bool, CatalogError> {
        Ok(self.super_types(type_id)?.contains(&ancestor))
    }

    pub fn is_of_type(&self, object: &SystemObject, type_id: ObjectId) -> Result<bool, CatalogError> {
        self.inherits_from(object.type_id, type_id)
    }

    fn collect_from_types(
        &self,
        type_id: ObjectId,
        members: impl Fn(&TypeSpec) -> &[ObjectId],
    ) -> Result<Vec<Arc<SystemObject>>, CatalogError> {
        let mut seen = BTreeSet::new();
        let mut collected = Vec::new();
        for ancestor in self.super_types(type_id)?.iter() {
            let Some(object) = self.object(*ancestor)? else {
                continue;
            };
            let Some(spec) = object.type_spec() else {
                continue;
            };
            for member in members(spec) {
                if seen.insert(*member)
                    && let Some(resolved) = self.object(*member)?
                {
                    collected.push(resolved);
                }
            }
        }
        Ok(collected)
    }

    /// Set uses declared by `type_id` or any of its supertypes.
    pub fn object_set_uses(&self, type_id: ObjectId) -> Result<Vec<Arc<SystemObject>>, CatalogError> {
        self.collect_from_types(type_id, |spec| spec.set_uses.as_slice())
    }

    /// Attribute groups declared by `type_id` or any of its supertypes.
    pub fn attribute_groups(&self, type_id: ObjectId) -> Result<Vec<Arc<SystemObject>>, CatalogError> {
        self.collect_from_types(type_id, |spec| spec.attribute_groups.as_slice())
    }

    pub fn usages(&self, group: &SystemObject) -> Result<Vec<Arc<SystemObject>>, CatalogError> {
        let Some(spec) = group.attribute_group() else {
            return Ok(Vec::new());
        };
        let mut usages = Vec::with_capacity(spec.usages.len());
        for id in &spec.usages {
            if let Some(usage) = self.object(*id)?
                && usage.usage_spec().is_some()
            {
                usages.push(usage);
            }
        }
        Ok(usages)
    }

    /// Valid attributes of a group or list, ordered by position.
    pub fn attributes(&self, set: &SystemObject) -> Result<Vec<Arc<SystemObject>>, CatalogError> {
        let Some(spec) = set.attribute_set() else {
            return Ok(Vec::new());
        };
        let mut attributes = Vec::with_capacity(spec.attributes.len());
        for id in &spec.attributes {
            if let Some(attribute) = self.object(*id)?
                && attribute.attribute_spec().is_some()
            {
                attributes.push(attribute);
            }
        }
        attributes.sort_by_key(|attribute| {
            attribute
                .attribute_spec()
                .map_or(u32::MAX, |spec| spec.position)
        });
        Ok(attributes)
    }

    /// Entries of `set` in this view; `None` marks a null entry.
    ///
    /// Mutable sets are not versioned and list all their entries.
    pub fn elements(&self, set: &SystemObject, mutable: bool) -> Vec<Option<ObjectId>> {
        let Some(spec) = set.object_set() else {
            return Vec::new();
        };
        if mutable {
            return spec.elements.iter().map(|element| element.object).collect();
        }
        let Some(version) = self.version_of(set.area_id) else {
            return Vec::new();
        };
        spec.elements
            .iter()
            .filter(|element| element.is_member_in(version))
            .map(|element| element.object)
            .collect()
    }

    /// The attribute group a stored record belongs to, via its usage.
    pub fn record_group(&self, usage: ObjectId) -> Result<Option<Arc<SystemObject>>, CatalogError> {
        let Some(usage) = self.object(usage)? else {
            return Ok(None);
        };
        let Some(spec) = usage.usage_spec() else {
            return Ok(None);
        };
        Ok(self
            .object(spec.attribute_group)?
            .filter(|group| group.attribute_group().is_some()))
    }

    /// Records of `object` stored under a group with pid `group_pid`.
    pub fn records_of_group<'o>(
        &self,
        object: &'o SystemObject,
        group_pid: &str,
    ) -> Result<Vec<&'o Data>, CatalogError> {
        let mut records = Vec::new();
        for (usage, data) in &object.data {
            if let Some(group) = self.record_group(*usage)?
                && group.pid == group_pid
            {
                records.push(data);
            }
        }
        Ok(records)
    }

    /// Authority named by an area object's properties record.
    pub fn area_authority(&self, area: &SystemObject) -> Result<Option<ObjectId>, CatalogError> {
        Ok(self
            .records_of_group(area, pids::ATG_AREA_PROPERTIES)?
            .into_iter()
            .find_map(|record| {
                record
                    .field(pids::area_properties::AUTHORITY)
                    .and_then(Data::as_reference)
            }))
    }

    /// Whether `group` is used under both parameter aspects.
    pub fn is_parameter_group(&self, group: &SystemObject) -> Result<bool, CatalogError> {
        let mut desired = false;
        let mut target = false;
        for usage in self.usages(group)? {
            let Some(spec) = usage.usage_spec() else {
                continue;
            };
            if let Some(aspect) = self.object(spec.aspect)? {
                desired |= aspect.pid == pids::ASP_PARAMETER_DESIRED;
                target |= aspect.pid == pids::ASP_PARAMETER_TARGET;
            }
        }
        Ok(desired && target)
    }

    pub fn record_stats(&self, stats: &mut CheckStats) {
        stats.resolutions = self.resolutions.load(Ordering::Relaxed);
        stats.supertype_memo_hits = self.memo_hits.load(Ordering::Relaxed);
        stats.supertype_memo_misses = self.memo_misses.load(Ordering::Relaxed);
    }
}
