//! # cfgcat-model
//!
//! Versioned object model of the configuration catalog.
//!
//! This crate provides:
//! - `SystemObject` and the meta-object payloads (types, sets, attribute groups, areas)
//! - per-area metadata: version counters, activation history, dependency records
//! - the `Catalog` / `CatalogWriter` collaborator traits the checker consumes
//! - `ObjectStore` (canonical in-memory catalog) with JSON snapshot persistence
//! - `CatalogBuilder` for assembling catalogs in code
//!
//! It intentionally does not validate anything; consistency checking lives in
//! `cfgcat-check`.
//!
//! ## Data model
//!
//! ```text
//! snapshot JSON (on disk, one document per catalog)
//!     ↕  load / save
//! ObjectStore (areas → objects, id arena, pid index)
//!     ↓  Catalog trait
//! checker
//! ```

pub mod area;
pub mod arena;
pub mod attribute;
pub mod builder;
pub mod catalog;
pub mod data;
pub mod deserialize;
pub mod ids;
pub mod kinds;
pub mod memory;
pub mod object;
pub mod pids;
pub mod snapshot;

pub use area::{AreaDependency, AreaMetadata, AreaVersions, DependencyRecord};
pub use arena::ObjectArena;
pub use attribute::{
    AttributeTypeSpec, AttributeValueError, IntegerRange, IntegerState, UNDEFINED_TEXT,
};
pub use builder::{CatalogBuilder, MetaTypes, area_properties};
pub use catalog::{Catalog, CatalogError, CatalogWriter, FixAction};
pub use data::Data;
pub use deserialize::{DeserializeError, JsonRecordDeserializer, RecordDeserializer};
pub use ids::{NOT_VALID, ObjectId, ObjectRef, Version};
pub use kinds::{DependencyKind, PersistenceMode, ReferenceType, Usage};
pub use memory::{DEFAULT_METAMODEL_VERSION, ObjectStore, ObjectStoreError};
pub use object::{
    AttributeGroupSpec, AttributeSetSpec, AttributeSpec, ObjectKind, ObjectSetSpec, SetElement,
    SetTypeSpec, SetUseSpec, SystemObject, TypeSpec, UsageSpec, Validity,
};
pub use snapshot::{AreaSnapshot, CatalogSnapshot, SnapshotError};
