//! Entry points of the consistency check.
//!
//! [`ConsistencyChecker::check`] runs the phases against a read-only catalog
//! and returns a [`CheckOutcome`]: the findings plus the dependency records
//! the run would persist. [`CheckOutcome::commit`] applies the persistence
//! policy of the requested kind of check against a writer. The two steps are
//! split so the same store can be read during the check and written after it.
//!
//! ```text
//! phase 0  area dependency pre-check   (may abort the run)
//! phase 1  object enumeration, id/pid identity, attribute defaults
//! phase 2  per-object structure: types, sets, records, references
//! phase 3  parameter type hierarchy and its cycles
//! ```

use crate::config::CheckConfig;
use crate::dependency::{DependencyTracker, PendingDependencies, write_pending};
use crate::error::CheckError;
use crate::kind::KindOfConsistencyCheck;
use crate::result::{ConsistencyCheckResult, Finding, finding_class};
use crate::view::VersionedView;
use cfgcat_model::{
    Catalog, CatalogWriter, JsonRecordDeserializer, ObjectId, RecordDeserializer, Version,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Shared flag that stops a running check at the next area boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ConsistencyChecker<'c, C: Catalog + ?Sized> {
    catalog: &'c C,
    config: CheckConfig,
    deserializer: Arc<dyn RecordDeserializer>,
    cancel: CancelToken,
}

impl<'c, C: Catalog + ?Sized> ConsistencyChecker<'c, C> {
    pub fn new(catalog: &'c C, config: CheckConfig) -> Self {
        Self {
            catalog,
            config,
            deserializer: Arc::new(JsonRecordDeserializer),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_deserializer(mut self, deserializer: Arc<dyn RecordDeserializer>) -> Self {
        self.deserializer = deserializer;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Check every area, the pinned ones at their pinned version.
    ///
    /// Never fails: internal faults become a single `check.internal` local error.
    pub fn check(&self, pins: &[(ObjectId, Version)], kind: KindOfConsistencyCheck) -> CheckOutcome {
        info!(kind = %kind, pins = pins.len(), "consistency check started");
        let mut result = ConsistencyCheckResult::new(kind);

        let view = match VersionedView::new(self.catalog, pins) {
            Ok(view) => view,
            Err(error) => {
                report_internal(&mut result, &error);
                return CheckOutcome {
                    result,
                    pending: Vec::new(),
                };
            }
        };
        let tracks_dependencies = self
            .config
            .tracks_dependencies(self.catalog.metamodel_version());
        let tracker = if tracks_dependencies {
            match local_areas(&view, &self.config) {
                Ok(local) => DependencyTracker::new(local),
                Err(error) => {
                    report_internal(&mut result, &error);
                    DependencyTracker::default()
                }
            }
        } else {
            DependencyTracker::default()
        };

        let mut run = CheckRun {
            view: &view,
            tracker: &tracker,
            config: &self.config,
            deserializer: self.deserializer.as_ref(),
            cancel: &self.cancel,
            result,
        };
        let status = run.execute(tracks_dependencies);
        let mut result = run.result;
        if let Err(error) = status {
            report_internal(&mut result, &error);
        }

        view.record_stats(&mut result.stats);
        result.stats.dependencies_recorded = tracker.len();
        let pending = if tracks_dependencies && !result.cancelled {
            tracker.pending(&view)
        } else {
            Vec::new()
        };

        info!(
            kind = %kind,
            warnings = result.warnings().count(),
            local_errors = result.local_errors().count(),
            interference_errors = result.interference_errors().count(),
            cancelled = result.cancelled,
            "consistency check finished"
        );
        CheckOutcome { result, pending }
    }
}

/// Findings of a run plus the dependency records it would persist.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub result: ConsistencyCheckResult,
    pub pending: Vec<PendingDependencies>,
}

impl CheckOutcome {
    pub fn persistence_permitted(&self) -> bool {
        !self.result.cancelled && self.result.kind.permits_persistence(&self.result)
    }

    /// Persist pending dependency records when the kind of check allows it.
    ///
    /// A failing write is reported as a `check.internal` local error.
    pub fn commit<W: CatalogWriter + ?Sized>(self, writer: &mut W) -> ConsistencyCheckResult {
        let permitted = self.persistence_permitted();
        let CheckOutcome {
            mut result,
            pending,
        } = self;
        if !permitted {
            debug!(kind = %result.kind, "dependency persistence not permitted");
            return result;
        }
        match write_pending(writer, pending) {
            Ok(written) => {
                debug!(areas = written, "dependency records persisted");
                result.dependencies_persisted = true;
            }
            Err(error) => report_internal(&mut result, &CheckError::from(error)),
        }
        result
    }
}

/// Check `store` and persist dependencies as the kind of check allows.
pub fn run_consistency_check<S: Catalog + CatalogWriter + ?Sized>(
    store: &mut S,
    pins: &[(ObjectId, Version)],
    kind: KindOfConsistencyCheck,
    config: &CheckConfig,
) -> ConsistencyCheckResult {
    let outcome = ConsistencyChecker::new(&*store, config.clone()).check(pins, kind);
    outcome.commit(store)
}

fn report_internal(result: &mut ConsistencyCheckResult, error: &CheckError) {
    warn!(error = %error, "consistency check hit an internal fault");
    result.push(Finding::local(
        finding_class::CHECK_INTERNAL,
        format!("check aborted by internal fault: {error}"),
    ));
}

/// Areas whose properties name the configured local authority.
fn local_areas<C: Catalog + ?Sized>(
    view: &VersionedView<'_, C>,
    config: &CheckConfig,
) -> Result<BTreeSet<ObjectId>, CheckError> {
    let mut local = BTreeSet::new();
    let Some(pid) = config.local_authority.as_deref() else {
        return Ok(local);
    };
    let Some(authority) = view.object_by_pid(pid)? else {
        warn!(authority = pid, "local authority is not valid; no dependencies are tracked");
        return Ok(local);
    };
    for area in view.areas() {
        let Some(area_object) = view.resolve(area.area)? else {
            return Err(CheckError::MissingSystemData(format!(
                "configuration area {} has no area object",
                area.area
            )));
        };
        if view.area_authority(&area_object)? == Some(authority.id) {
            local.insert(area.area);
        }
    }
    Ok(local)
}

/// State of one run, shared by the phase implementations.
pub(crate) struct CheckRun<'r, 'c, C: Catalog + ?Sized> {
    pub(crate) view: &'r VersionedView<'c, C>,
    pub(crate) tracker: &'r DependencyTracker,
    pub(crate) config: &'r CheckConfig,
    pub(crate) deserializer: &'r dyn RecordDeserializer,
    pub(crate) cancel: &'r CancelToken,
    pub(crate) result: ConsistencyCheckResult,
}

impl<C: Catalog + ?Sized> CheckRun<'_, '_, C> {
    fn execute(&mut self, tracks_dependencies: bool) -> Result<(), CheckError> {
        if tracks_dependencies {
            if !self.check_area_dependencies()? {
                warn!("required area dependencies unsatisfied; check aborted");
                return Ok(());
            }
        } else {
            debug!("metamodel predates area dependencies; skipping dependency pre-check");
        }

        let index = self.collect_objects()?;
        if self.result.cancelled {
            return Ok(());
        }
        self.check_objects(&index)?;
        if self.result.cancelled {
            return Ok(());
        }
        self.check_hierarchies(&index)
    }

    pub(crate) fn report(&mut self, finding: Finding) {
        debug!(finding = %finding, "finding");
        self.result.push(finding);
    }

    /// Poll the cancel token; marks the result once.
    pub(crate) fn cancelled(&mut self) -> bool {
        if !self.cancel.is_cancelled() {
            return false;
        }
        if !self.result.cancelled {
            warn!("consistency check cancelled; remaining areas skipped");
            self.result.cancelled = true;
        }
        true
    }
}
