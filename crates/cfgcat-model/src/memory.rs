//! Canonical in-memory catalog.
//!
//! Objects are grouped per configuration area and indexed by id through an
//! [`ObjectArena`]. The per-area lists keep every object handed to the store,
//! including ones whose id collides with an earlier object, so that the
//! checker can report the collision instead of silently losing data.

use crate::arena::ObjectArena;
use crate::area::{AreaMetadata, DependencyRecord};
use crate::catalog::{Catalog, CatalogError, CatalogWriter, FixAction};
use crate::ids::ObjectId;
use crate::object::{ObjectKind, SystemObject, Validity};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Metamodel version stored catalogs default to.
pub const DEFAULT_METAMODEL_VERSION: u32 = 9;

/// Errors raised while assembling or mutating the store.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("area {0} is already registered")]
    AreaAlreadyExists(ObjectId),

    #[error("area object {0} must have the area kind and belong to itself")]
    NotAnArea(ObjectId),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Default)]
struct AreaEntry {
    metadata: AreaMetadata,
    objects: Vec<Arc<SystemObject>>,
}

/// In-memory [`Catalog`] and [`CatalogWriter`].
#[derive(Debug, Clone)]
pub struct ObjectStore {
    metamodel_version: u32,
    arena: ObjectArena,
    areas: BTreeMap<ObjectId, AreaEntry>,
    pids: BTreeMap<String, Vec<ObjectId>>,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new(DEFAULT_METAMODEL_VERSION)
    }
}

impl ObjectStore {
    pub fn new(metamodel_version: u32) -> Self {
        Self {
            metamodel_version,
            arena: ObjectArena::default(),
            areas: BTreeMap::new(),
            pids: BTreeMap::new(),
        }
    }

    pub fn set_metamodel_version(&mut self, version: u32) {
        self.metamodel_version = version;
    }

    /// Register a configuration area. The area object belongs to itself.
    pub fn insert_area(
        &mut self,
        area: SystemObject,
        metadata: AreaMetadata,
    ) -> Result<(), ObjectStoreError> {
        if !matches!(area.kind, ObjectKind::Area) || area.area_id != area.id {
            return Err(ObjectStoreError::NotAnArea(area.id));
        }
        if self.areas.contains_key(&area.id) {
            return Err(ObjectStoreError::AreaAlreadyExists(area.id));
        }
        self.areas.insert(
            area.id,
            AreaEntry {
                metadata,
                objects: Vec::new(),
            },
        );
        self.insert_object(area)?;
        Ok(())
    }

    /// Add an object to its area.
    ///
    /// Returns `false` when the id was already taken by another object; the
    /// object is still listed in its area.
    pub fn insert_object(&mut self, object: SystemObject) -> Result<bool, ObjectStoreError> {
        let entry = self
            .areas
            .get_mut(&object.area_id)
            .ok_or(CatalogError::UnknownArea(object.area_id))?;
        let object = Arc::new(object);
        entry.objects.push(object.clone());
        if !object.pid.is_empty() {
            let ids = self.pids.entry(object.pid.clone()).or_default();
            if !ids.contains(&object.id) {
                ids.push(object.id);
            }
        }
        let fresh = self.arena.insert(object.clone());
        if !fresh {
            warn!(id = %object.id, area = %object.area_id, "object id already in use");
        }
        Ok(fresh)
    }

    /// Replace a stored object in place (same id, same area).
    pub fn update_object(&mut self, object: SystemObject) -> Result<(), ObjectStoreError> {
        let entry = self
            .areas
            .get_mut(&object.area_id)
            .ok_or(CatalogError::UnknownArea(object.area_id))?;
        let slot = entry
            .objects
            .iter_mut()
            .find(|stored| stored.id == object.id)
            .ok_or(CatalogError::ObjectNotFound(object.id))?;
        let object = Arc::new(object);
        *slot = object.clone();
        self.arena.replace(object);
        Ok(())
    }

    /// Invalidate a dynamic object at `at` and start its grace period.
    pub fn invalidate_dynamic(
        &mut self,
        id: ObjectId,
        at: DateTime<Utc>,
    ) -> Result<(), ObjectStoreError> {
        let current = self.arena.get(id).ok_or(CatalogError::ObjectNotFound(id))?;
        let mut updated = (*current).clone();
        match &mut updated.validity {
            Validity::Dynamic {
                not_valid_since, ..
            } => *not_valid_since = Some(at),
            Validity::Configuration { .. } => {
                return Err(CatalogError::Storage(format!(
                    "{id} is a configuration object and changes only through new versions"
                ))
                .into());
            }
        }
        self.update_object(updated)?;
        self.arena.retire(id, at);
        Ok(())
    }

    /// Drop invalidated dynamic objects whose grace period ended before `now`.
    ///
    /// They stay resolvable by id for as long as someone else holds them.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let downgraded = self.arena.sweep(now);
        for id in &downgraded {
            for entry in self.areas.values_mut() {
                entry.objects.retain(|object| object.id != *id);
            }
        }
        if !downgraded.is_empty() {
            debug!(count = downgraded.len(), "swept invalidated dynamic objects");
        }
        downgraded.len()
    }

    pub fn metadata_mut(&mut self, area: ObjectId) -> Result<&mut AreaMetadata, CatalogError> {
        self.areas
            .get_mut(&area)
            .map(|entry| &mut entry.metadata)
            .ok_or(CatalogError::UnknownArea(area))
    }

    /// Number of listed objects across all areas.
    pub fn len(&self) -> usize {
        self.areas.values().map(|entry| entry.objects.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(area id, metadata, objects)` in area id order.
    pub fn areas(&self) -> impl Iterator<Item = (ObjectId, &AreaMetadata, &[Arc<SystemObject>])> {
        self.areas
            .iter()
            .map(|(id, entry)| (*id, &entry.metadata, entry.objects.as_slice()))
    }
}

impl Catalog for ObjectStore {
    fn object(&self, id: ObjectId) -> Result<Option<Arc<SystemObject>>, CatalogError> {
        Ok(self.arena.get(id))
    }

    fn objects_by_pid(&self, pid: &str) -> Result<Vec<Arc<SystemObject>>, CatalogError> {
        Ok(self
            .pids
            .get(pid)
            .into_iter()
            .flatten()
            .filter_map(|id| self.arena.get(*id))
            .collect())
    }

    fn area_ids(&self) -> Result<Vec<ObjectId>, CatalogError> {
        Ok(self.areas.keys().copied().collect())
    }

    fn area_objects(&self, area: ObjectId) -> Result<Vec<Arc<SystemObject>>, CatalogError> {
        self.areas
            .get(&area)
            .map(|entry| entry.objects.clone())
            .ok_or(CatalogError::UnknownArea(area))
    }

    fn area_metadata(&self, area: ObjectId) -> Result<AreaMetadata, CatalogError> {
        self.areas
            .get(&area)
            .map(|entry| entry.metadata.clone())
            .ok_or(CatalogError::UnknownArea(area))
    }

    fn metamodel_version(&self) -> u32 {
        self.metamodel_version
    }
}

impl CatalogWriter for ObjectStore {
    fn write_dependencies(
        &mut self,
        area: ObjectId,
        record: DependencyRecord,
    ) -> Result<(), CatalogError> {
        debug!(
            area = %area,
            version = record.version,
            count = record.dependencies.len(),
            "writing dependency record"
        );
        self.metadata_mut(area)?.dependencies = Some(record);
        Ok(())
    }

    fn apply_fix(&mut self, action: &FixAction) -> Result<(), CatalogError> {
        match action {
            FixAction::RemoveNullSetElements { set } => {
                let current = self
                    .arena
                    .get(*set)
                    .ok_or(CatalogError::ObjectNotFound(*set))?;
                let mut updated = (*current).clone();
                let ObjectKind::ObjectSet(spec) = &mut updated.kind else {
                    return Err(CatalogError::NotASet(*set));
                };
                let before = spec.elements.len();
                spec.elements.retain(|element| element.object.is_some());
                debug!(set = %set, removed = before - spec.elements.len(), "removed null set elements");
                self.update_object(updated).map_err(|error| match error {
                    ObjectStoreError::Catalog(inner) => inner,
                    other => CatalogError::Storage(other.to_string()),
                })
            }
        }
    }
}
