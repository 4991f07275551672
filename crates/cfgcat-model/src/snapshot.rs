//! JSON snapshot storage of a whole catalog.
//!
//! The portable interchange format: one JSON document listing every area
//! with its metadata and objects. Writes go through a temp file and a rename
//! so a crash never leaves a truncated snapshot behind.

use crate::area::AreaMetadata;
use crate::catalog::Catalog;
use crate::ids::ObjectId;
use crate::memory::{ObjectStore, ObjectStoreError};
use crate::object::SystemObject;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const SNAPSHOT_SCHEMA: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub schema: u32,
    pub metamodel_version: u32,
    pub areas: Vec<AreaSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSnapshot {
    pub area: ObjectId,
    pub metadata: AreaMetadata,
    /// All objects of the area, including the area object itself.
    pub objects: Vec<SystemObject>,
}

/// Errors from snapshot operations.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("unsupported snapshot schema {0}")]
    UnsupportedSchema(u32),

    #[error("area {0} does not contain its own area object")]
    MissingAreaObject(ObjectId),

    #[error(transparent)]
    Store(#[from] ObjectStoreError),
}

impl ObjectStore {
    /// Build a store from a snapshot. Areas are registered before any objects
    /// so that cross-area objects resolve regardless of order.
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self, SnapshotError> {
        if snapshot.schema != SNAPSHOT_SCHEMA {
            return Err(SnapshotError::UnsupportedSchema(snapshot.schema));
        }
        let mut store = ObjectStore::new(snapshot.metamodel_version);
        let mut remaining = Vec::with_capacity(snapshot.areas.len());
        for area in snapshot.areas {
            let mut objects = area.objects;
            let position = objects
                .iter()
                .position(|object| object.id == area.area)
                .ok_or(SnapshotError::MissingAreaObject(area.area))?;
            let area_object = objects.remove(position);
            store.insert_area(area_object, area.metadata)?;
            remaining.push(objects);
        }
        for object in remaining.into_iter().flatten() {
            store.insert_object(object)?;
        }
        Ok(store)
    }

    pub fn to_snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            schema: SNAPSHOT_SCHEMA,
            metamodel_version: self.metamodel_version(),
            areas: self
                .areas()
                .map(|(area, metadata, objects)| AreaSnapshot {
                    area,
                    metadata: metadata.clone(),
                    objects: objects.iter().map(|object| (**object).clone()).collect(),
                })
                .collect(),
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        Self::from_snapshot(read_snapshot_from_path(path)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        write_snapshot_to_path(path, &self.to_snapshot())
    }
}

pub fn read_snapshot_from_path(path: impl AsRef<Path>) -> Result<CatalogSnapshot, SnapshotError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| SnapshotError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SnapshotError::Parse(format!("{}: {e}", path.display())))
}

pub fn write_snapshot_to_path(
    path: impl AsRef<Path>,
    snapshot: &CatalogSnapshot,
) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| SnapshotError::Io(format!("{parent:?}: {e}")))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), SnapshotError> {
        let file = File::create(&tmp_path)
            .map_err(|e| SnapshotError::Io(format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)
            .map_err(|e| SnapshotError::Serialize(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| SnapshotError::Io(format!("{}: {e}", tmp_path.display())))?;
        let file = writer
            .into_inner()
            .map_err(|e| SnapshotError::Io(format!("{}: {e}", tmp_path.display())))?;
        file.sync_all()
            .map_err(|e| SnapshotError::Io(format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SnapshotError::Io(format!("{} -> {}: {e}", tmp_path.display(), path.display()))
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}
