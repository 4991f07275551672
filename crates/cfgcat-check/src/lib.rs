//! # cfgcat-check
//!
//! Consistency check gating the activation and release of configuration
//! area versions.
//!
//! This crate provides:
//! - `VersionedView`: the catalog as seen with some areas pinned to a version
//! - `DependencyTracker`: cross-area dependencies inferred while checking
//! - `ConsistencyChecker`: phases 0-3 producing a `ConsistencyCheckResult`
//! - `KindOfConsistencyCheck`: which severities block dependency persistence
//!
//! ## Flow
//!
//! ```text
//! Catalog ──▶ VersionedView ──▶ phases 0-3 ──▶ CheckOutcome
//!                                   │              │ commit (policy-gated)
//!                          DependencyTracker ──────┴──▶ CatalogWriter
//! ```

mod area_dependency;
mod attributes;
pub mod config;
pub mod dependency;
pub mod engine;
pub mod error;
mod hierarchy;
mod identity;
pub mod kind;
mod objects;
pub mod parameters;
mod references;
pub mod result;
pub mod view;

pub use config::CheckConfig;
pub use dependency::{DependencyTracker, PendingDependencies, write_pending};
pub use engine::{CancelToken, CheckOutcome, ConsistencyChecker, run_consistency_check};
pub use error::{CheckError, ConfigError};
pub use kind::{KindOfConsistencyCheck, UnknownKind};
pub use parameters::dataset_entry;
pub use result::{CheckStats, ConsistencyCheckResult, Finding, Severity, finding_class};
pub use view::{AreaView, VersionedView};
