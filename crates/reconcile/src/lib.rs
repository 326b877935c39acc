//! # Reconcile
//!
//! Idempotent reconciliation of a single YunoHost app instance.
//!
//! Given a declared [`DesiredState`] and a way to observe and mutate the
//! live system, the reconciler computes the minimal ordered set of
//! [`Operation`]s that converge the instance and applies them, reporting
//! whether anything changed.
//!
//! ## Core Concepts
//!
//! - **DesiredState**: declared target (identity, url, settings, permissions)
//! - **LiveState**: what the system reports for the instance right now
//! - **Plan**: ordered operations plus a before/after diff, computed purely
//! - **Reconciler**: observes, plans, applies, re-observes where needed
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{reconcile, DesiredState, PermissionSpec};
//!
//! let desired = DesiredState::present("wordpress")
//!     .with_domain("example.org")
//!     .with_path("/blog")
//!     .with_permissions(PermissionSpec::exact(["visitors"]));
//!
//! let result = reconcile(&desired, &system, &system)?;
//! if result.changed {
//!     println!("applied {} operations", result.operations.len());
//! }
//! ```
//!
//! ## Capability Traits
//!
//! - [`Observe`]: returns the live state of an instance, or `None`
//! - [`Apply`]: performs one external call for one operation
//! - [`ProgressCallback`]: receives progress updates
//!
//! Both capabilities are implemented for plain closures, so a policy test
//! needs no backing system at all.

pub mod context;
pub mod error;
pub mod operation;
pub mod planner;
pub mod reconciler;
pub mod types;

// Re-export main types at crate root
pub use context::{Applied, Apply, LogProgress, NoProgress, Observe, ProgressCallback};
pub use error::{ExecError, ObservationError, ReconcileError, Result};
pub use operation::Operation;
pub use planner::{permission_operations, plan, validate};
pub use reconciler::{reconcile, reconcile_with_progress};
pub use types::{
    AppIdentity, DesiredState, FieldChange, LiveState, PermissionSpec, Plan, Presence,
    ReconciliationResult, URL_SETTING_KEYS, default_instance_id,
};
