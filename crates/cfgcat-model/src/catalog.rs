//! Collaborator interfaces the checker consumes.
//!
//! A [`Catalog`] resolves objects and area metadata; a [`CatalogWriter`]
//! accepts the few mutations a check may produce (dependency records and
//! fixes for benign defects). Both are implemented by
//! [`ObjectStore`](crate::memory::ObjectStore); remote-backed catalogs may
//! block and fail on any call.

use crate::area::{AreaMetadata, DependencyRecord};
use crate::ids::ObjectId;
use crate::object::SystemObject;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Errors raised by catalog implementations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown configuration area: {0}")]
    UnknownArea(ObjectId),

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("{0} is not an object set")]
    NotASet(ObjectId),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Read access to the object graph and per-area metadata.
pub trait Catalog {
    /// Resolve one object by id.
    fn object(&self, id: ObjectId) -> Result<Option<Arc<SystemObject>>, CatalogError>;

    /// Every object that ever carried `pid`, across all areas and versions.
    fn objects_by_pid(&self, pid: &str) -> Result<Vec<Arc<SystemObject>>, CatalogError>;

    /// Ids of all known configuration areas.
    fn area_ids(&self) -> Result<Vec<ObjectId>, CatalogError>;

    /// All objects stored in `area`, regardless of validity.
    fn area_objects(&self, area: ObjectId) -> Result<Vec<Arc<SystemObject>>, CatalogError>;

    fn area_metadata(&self, area: ObjectId) -> Result<AreaMetadata, CatalogError>;

    /// Installed metamodel version.
    fn metamodel_version(&self) -> u32;
}

/// Automatic repair of a benign, well-understood defect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FixAction {
    /// Strip dangling null entries from an object set.
    RemoveNullSetElements { set: ObjectId },
}

/// Write access used after a check.
pub trait CatalogWriter {
    /// Replace the dependency snapshot of `area`.
    fn write_dependencies(
        &mut self,
        area: ObjectId,
        record: DependencyRecord,
    ) -> Result<(), CatalogError>;

    fn apply_fix(&mut self, action: &FixAction) -> Result<(), CatalogError>;
}
