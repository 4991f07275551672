//! Cross-area dependency tracking.

use crate::view::VersionedView;
use cfgcat_model::{
    AreaDependency, Catalog, CatalogError, CatalogWriter, DependencyKind, DependencyRecord,
    ObjectId, SystemObject, Validity, Version,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Dependency record that a finished run wants to write for one area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDependencies {
    pub area: ObjectId,
    pub record: DependencyRecord,
}

/// Collects the dependencies of locally owned areas discovered during a check.
///
/// Insertion goes through a lock so areas may be checked concurrently.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    local_areas: BTreeSet<ObjectId>,
    recorded: Mutex<BTreeMap<ObjectId, BTreeSet<AreaDependency>>>,
}

impl DependencyTracker {
    /// Track dependencies of `local_areas` only.
    pub fn new(local_areas: BTreeSet<ObjectId>) -> Self {
        Self {
            local_areas,
            recorded: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn is_local(&self, area: ObjectId) -> bool {
        self.local_areas.contains(&area)
    }

    /// Record that `subject` needs `dependency`.
    ///
    /// Nothing is recorded within one area, for transient objects, or for
    /// subjects in areas owned by another authority.
    pub fn check_dependency<C: Catalog + ?Sized>(
        &self,
        view: &VersionedView<'_, C>,
        subject: &SystemObject,
        dependency: &SystemObject,
        kind: DependencyKind,
    ) -> Result<(), CatalogError> {
        if subject.area_id == dependency.area_id
            || !self.is_local(subject.area_id)
            || view.is_transient(subject)?
            || view.is_transient(dependency)?
        {
            return Ok(());
        }
        let entry = AreaDependency {
            dependent_version: version_needed(view, subject),
            area: dependency.area_id,
            needed_version: version_needed(view, dependency),
            kind,
        };
        let inserted = self
            .recorded
            .lock()
            .entry(subject.area_id)
            .or_default()
            .insert(entry);
        if inserted {
            debug!(
                subject = %subject.handle(),
                dependency = %dependency.handle(),
                kind = %kind,
                "recorded area dependency"
            );
        }
        Ok(())
    }

    /// Dependencies recorded so far, per depending area.
    pub fn dependencies(&self) -> BTreeMap<ObjectId, BTreeSet<AreaDependency>> {
        self.recorded.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.recorded.lock().values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records to write for every pinned local area whose saved snapshot is
    /// older than its pinned version. Areas with a current snapshot are skipped.
    pub fn pending<C: Catalog + ?Sized>(
        &self,
        view: &VersionedView<'_, C>,
    ) -> Vec<PendingDependencies> {
        let recorded = self.recorded.lock();
        view.areas()
            .filter(|area| area.pinned && self.is_local(area.area))
            .filter(|area| area.metadata.dependency_snapshot_version() < area.version)
            .map(|area| PendingDependencies {
                area: area.area,
                record: DependencyRecord {
                    version: area.version,
                    dependencies: recorded.get(&area.area).cloned().unwrap_or_default(),
                },
            })
            .collect()
    }

    /// Write the pending records of `view`. Returns how many areas were written.
    pub fn persist<C: Catalog + ?Sized, W: CatalogWriter + ?Sized>(
        &self,
        view: &VersionedView<'_, C>,
        writer: &mut W,
    ) -> Result<usize, CatalogError> {
        write_pending(writer, self.pending(view))
    }
}

pub fn write_pending<W: CatalogWriter + ?Sized>(
    writer: &mut W,
    pending: Vec<PendingDependencies>,
) -> Result<usize, CatalogError> {
    let count = pending.len();
    for PendingDependencies { area, record } in pending {
        debug!(
            area = %area,
            version = record.version,
            dependencies = record.dependencies.len(),
            digest = %record.digest(),
            "persisting dependency record"
        );
        writer.write_dependencies(area, record)?;
    }
    Ok(count)
}

/// Area version from which on `object` exists.
///
/// Dynamic objects map their creation time onto the version active in their
/// area at that instant.
fn version_needed<C: Catalog + ?Sized>(view: &VersionedView<'_, C>, object: &SystemObject) -> Version {
    match &object.validity {
        Validity::Configuration { valid_since, .. } => *valid_since,
        Validity::Dynamic { valid_since, .. } => view
            .area(object.area_id)
            .map_or(0, |area| area.metadata.version_active_at(*valid_since)),
    }
}
