//! Conduit Reconciler
//!
//! Keeps locally tracked pipeline records in step with stream-processing
//! pipelines running on a remote data plane.
//!
//! Architecture:
//! - Configuration: polling cadence, timeouts and credentials
//! - Connect: per-operation API handles and cluster endpoint resolution
//! - Convergence: start/stop commands followed by a bounded, backed-off wait
//! - Lifecycle: create, read, update, delete and import orchestration
//! - Store: the local JSON file holding the tracked records
//!
//! Operations never fail with `Err`; they return an [`Outcome`] carrying the
//! record disposition and the diagnostics collected along the way.

pub mod config;
pub mod connect;
pub mod convergence;
pub mod diagnostics;
pub mod lifecycle;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::ReconcilerConfig;
pub use connect::{ConnectError, Connector, HttpConnector, ImportId};
pub use convergence::{Cancellation, cancellation};
pub use diagnostics::{Diagnostic, Diagnostics, Disposition, Outcome, Severity};
pub use lifecycle::PipelineReconciler;
pub use store::{RecordStore, StoreError, StoredRecord};
