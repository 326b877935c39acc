//! Capability and callback traits
//!
//! The reconciler never talks to YunoHost directly. It is handed an
//! observer and an applier, so the policy can run against the real CLI, a
//! recording fake, or plain closures.

use crate::error::{ExecError, ObservationError, ReconcileError};
use crate::operation::Operation;
use crate::types::LiveState;

/// Queries the live state of an instance
pub trait Observe {
    /// Current state of `instance`, `None` if no such instance exists
    fn observe(&self, instance: &str) -> Result<Option<LiveState>, ObservationError>;
}

impl<F> Observe for F
where
    F: Fn(&str) -> Result<Option<LiveState>, ObservationError>,
{
    fn observe(&self, instance: &str) -> Result<Option<LiveState>, ObservationError> {
        self(instance)
    }
}

/// What the system reports back for an applied operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Id the system gave a newly installed instance, when it reports one
    pub instance_id: Option<String>,
}

impl Applied {
    /// Operation done, nothing to report
    pub fn done() -> Self {
        Self::default()
    }

    /// Install done; the new instance is known as `id`
    pub fn installed(id: impl Into<String>) -> Self {
        Self {
            instance_id: Some(id.into()),
        }
    }
}

/// Performs exactly one external mutating action per call
pub trait Apply {
    fn apply(&self, instance: &str, operation: &Operation) -> Result<Applied, ExecError>;
}

impl<F> Apply for F
where
    F: Fn(&str, &Operation) -> Result<Applied, ExecError>,
{
    fn apply(&self, instance: &str, operation: &Operation) -> Result<Applied, ExecError> {
        self(instance, operation)
    }
}

/// Progress callback for a reconciliation pass
pub trait ProgressCallback {
    /// Called before live state is queried
    fn on_observe(&mut self, instance: &str);

    /// Called before an operation is handed to the applier
    fn on_operation_start(&mut self, instance: &str, operation: &Operation);

    /// Called after an operation succeeded
    fn on_operation_complete(&mut self, instance: &str, operation: &Operation);

    /// Called when the pass stops on an error
    fn on_failure(&mut self, instance: &str, error: &ReconcileError);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_observe(&mut self, _instance: &str) {}
    fn on_operation_start(&mut self, _instance: &str, _operation: &Operation) {}
    fn on_operation_complete(&mut self, _instance: &str, _operation: &Operation) {}
    fn on_failure(&mut self, _instance: &str, _error: &ReconcileError) {}
}

/// Progress callback that reports through the `log` facade
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_observe(&mut self, instance: &str) {
        log::debug!("observing {instance}");
    }

    fn on_operation_start(&mut self, instance: &str, operation: &Operation) {
        log::debug!("{instance}: {operation}");
    }

    fn on_operation_complete(&mut self, instance: &str, operation: &Operation) {
        log::info!("{instance}: {operation} done");
    }

    fn on_failure(&mut self, instance: &str, error: &ReconcileError) {
        log::error!("{instance}: {error}");
    }
}
