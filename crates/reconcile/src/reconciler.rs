//! Reconciliation pass - observes, plans and applies

use crate::context::{Applied, Apply, NoProgress, Observe, ProgressCallback};
use crate::error::{ExecError, ObservationError, ReconcileError, Result};
use crate::operation::Operation;
use crate::planner::{permission_change, permission_operations, plan, validate};
use crate::types::{DesiredState, LiveState, Presence, ReconciliationResult};

/// Reconcile one app instance toward `desired`
///
/// Live state is observed once before any mutation and again after
/// operations that change existence or the URL. After an install the
/// instance is followed under the id the system assigned. The first failing
/// operation aborts the pass; operations applied before it are not
/// rolled back.
pub fn reconcile<O, A>(
    desired: &DesiredState,
    observer: &O,
    applier: &A,
) -> Result<ReconciliationResult>
where
    O: Observe + ?Sized,
    A: Apply + ?Sized,
{
    reconcile_with_progress(desired, observer, applier, &mut NoProgress)
}

/// [`reconcile`] with a progress callback
pub fn reconcile_with_progress<O, A, P>(
    desired: &DesiredState,
    observer: &O,
    applier: &A,
    progress: &mut P,
) -> Result<ReconciliationResult>
where
    O: Observe + ?Sized,
    A: Apply + ?Sized,
    P: ProgressCallback,
{
    let instance = validate(desired)?.to_string();
    let mut pass = Pass {
        instance,
        observer,
        applier,
        progress,
        result: ReconciliationResult::default(),
    };
    let outcome = pass.run(desired);
    if let Err(e) = &outcome {
        pass.progress.on_failure(&pass.instance, e);
    }
    outcome.map(|()| pass.result)
}

struct Pass<'a, O: ?Sized, A: ?Sized, P> {
    instance: String,
    observer: &'a O,
    applier: &'a A,
    progress: &'a mut P,
    result: ReconciliationResult,
}

impl<O, A, P> Pass<'_, O, A, P>
where
    O: Observe + ?Sized,
    A: Apply + ?Sized,
    P: ProgressCallback,
{
    fn run(&mut self, desired: &DesiredState) -> Result<()> {
        let live = self.observe()?;
        let planned = plan(desired, live.as_ref())?;
        self.result.diff = planned.diff;

        match (desired.presence, live) {
            (Presence::Absent, None) => Ok(()),
            (Presence::Absent, Some(_)) => {
                self.apply(Operation::Uninstall)?;
                if self.observe()?.is_some() {
                    return Err(ReconcileError::OperationFailed {
                        operation: Operation::Uninstall,
                        cause: ExecError::new("instance still present after removal"),
                    });
                }
                Ok(())
            }
            (Presence::Present, None) => {
                for operation in planned.operations {
                    if let Some(id) = self.apply(operation)?.instance_id
                        && id != self.instance
                    {
                        log::info!("{} was installed as {id}", self.instance);
                        self.instance = id;
                    }
                }
                let installed = self.observe()?.ok_or_else(|| {
                    ObservationError::new(format!(
                        "{} not found after a successful install",
                        self.instance
                    ))
                })?;
                // fresh installs come with a default permission set
                let operations = desired
                    .permissions
                    .as_ref()
                    .map(|spec| permission_operations(spec, &installed))
                    .unwrap_or_default();
                if !operations.is_empty() {
                    self.result
                        .diff
                        .push(permission_change(&installed, &operations));
                }
                self.result.final_state = Some(installed);
                for operation in operations {
                    self.apply(operation)?;
                }
                Ok(())
            }
            (Presence::Present, Some(live)) => {
                let reobserve = planned.operations.iter().any(Operation::requires_reobserve);
                self.result.final_state = Some(live);
                for operation in planned.operations {
                    self.apply(operation)?;
                }
                if reobserve {
                    self.result.final_state = self.observe()?;
                }
                Ok(())
            }
        }
    }

    fn observe(&mut self) -> Result<Option<LiveState>> {
        self.progress.on_observe(&self.instance);
        Ok(self.observer.observe(&self.instance)?)
    }

    /// Apply one operation and record it in the result
    fn apply(&mut self, operation: Operation) -> Result<Applied> {
        self.progress.on_operation_start(&self.instance, &operation);
        let applied = match self.applier.apply(&self.instance, &operation) {
            Ok(applied) => applied,
            Err(cause) => return Err(ReconcileError::OperationFailed { operation, cause }),
        };
        self.progress.on_operation_complete(&self.instance, &operation);

        if let Some(state) = self.result.final_state.as_mut() {
            state.record(&operation);
        }
        self.result.changed = true;
        self.result.operations.push(operation);
        Ok(applied)
    }
}
