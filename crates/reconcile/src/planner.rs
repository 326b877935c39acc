//! Minimal-diff planner
//!
//! Turns desired state plus observed live state into the ordered list of
//! operations that converge them. Pure: no external calls.

use crate::error::{ReconcileError, Result};
use crate::operation::Operation;
use crate::types::{DesiredState, FieldChange, LiveState, PermissionSpec, Plan, Presence};
use std::collections::BTreeMap;

/// Check the desired state names an instance and return its id
///
/// An install source (`name`) is required unless the instance should be
/// absent and is addressed by id alone.
pub fn validate(desired: &DesiredState) -> Result<&str> {
    let identity = &desired.identity;
    if identity.name.is_none() && desired.presence == Presence::Present {
        return Err(ReconcileError::missing(
            "name",
            "an app name is required unless state is absent",
        ));
    }
    identity
        .instance_id()
        .ok_or_else(|| ReconcileError::missing("id", "either name or id must be given"))
}

/// Compute the operations that bring `live` to `desired`
///
/// For a missing instance the plan is the install alone: permissions of a
/// fresh install are only known once it exists.
pub fn plan(desired: &DesiredState, live: Option<&LiveState>) -> Result<Plan> {
    validate(desired)?;

    match (desired.presence, live) {
        (Presence::Absent, None) => Ok(Plan::default()),
        (Presence::Absent, Some(_)) => Ok(Plan {
            operations: vec![Operation::Uninstall],
            diff: vec![presence_change("present", "absent")],
        }),
        (Presence::Present, None) => Ok(Plan {
            operations: vec![install_operation(desired)?],
            diff: vec![presence_change("absent", "present")],
        }),
        (Presence::Present, Some(live)) => Ok(update_plan(desired, live)),
    }
}

fn presence_change(before: &str, after: &str) -> FieldChange {
    FieldChange::new("state", Some(before.to_string()), Some(after.to_string()))
}

fn install_operation(desired: &DesiredState) -> Result<Operation> {
    let name = desired
        .identity
        .name
        .clone()
        .ok_or_else(|| ReconcileError::missing("name", "install needs an app name"))?;
    let domain = desired
        .effective_domain()
        .ok_or_else(|| ReconcileError::missing("domain", format!("installing {name}")))?;
    let path = desired
        .effective_path()
        .ok_or_else(|| ReconcileError::missing("path", format!("installing {name}")))?;

    Ok(Operation::Install {
        label: desired.identity.label.clone(),
        domain: domain.to_string(),
        path: path.to_string(),
        settings: desired
            .asserted_settings()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        name,
    })
}

/// Operations for an existing instance, in application order:
/// url, label, settings, permission removals, permission additions, upgrade
fn update_plan(desired: &DesiredState, live: &LiveState) -> Plan {
    let mut plan = Plan::default();

    let domain = desired
        .effective_domain()
        .filter(|d| live.domain.as_deref() != Some(*d));
    let path = desired
        .effective_path()
        .filter(|p| live.path.as_deref() != Some(*p));
    if domain.is_some() || path.is_some() {
        if let Some(domain) = domain {
            plan.diff.push(FieldChange::new(
                "domain",
                live.domain.clone(),
                Some(domain.to_string()),
            ));
        }
        if let Some(path) = path {
            plan.diff
                .push(FieldChange::new("path", live.path.clone(), Some(path.to_string())));
        }
        plan.operations.push(Operation::ChangeUrl {
            domain: domain.map(str::to_string),
            path: path.map(str::to_string),
        });
    }

    if let Some(label) = &desired.identity.label
        && live.identity.label.as_ref() != Some(label)
    {
        plan.diff.push(FieldChange::new(
            "label",
            live.identity.label.clone(),
            Some(label.clone()),
        ));
        plan.operations.push(Operation::ChangeLabel(label.clone()));
    }

    let changed_settings: BTreeMap<String, String> = desired
        .asserted_settings()
        .filter(|(key, value)| live.settings.get(*key) != Some(*value))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !changed_settings.is_empty() {
        for (key, value) in &changed_settings {
            plan.diff.push(FieldChange::new(
                format!("settings.{key}"),
                live.settings.get(key).cloned(),
                Some(value.clone()),
            ));
        }
        plan.operations
            .push(Operation::UpdateSettings(changed_settings));
    }

    if let Some(spec) = &desired.permissions {
        let permission_ops = permission_operations(spec, live);
        if !permission_ops.is_empty() {
            plan.diff.push(permission_change(live, &permission_ops));
            plan.operations.extend(permission_ops);
        }
    }

    if desired.upgrade && live.upgradable {
        plan.diff.push(FieldChange::new(
            "version",
            Some("upgradable".to_string()),
            Some("latest".to_string()),
        ));
        plan.operations.push(Operation::Upgrade);
    }

    plan
}

/// Permission operations for `spec` against the groups currently allowed
///
/// Removals come before additions so the allowed set never grows beyond
/// the union of the old and new sets. With `append`, nothing is removed.
pub fn permission_operations(spec: &PermissionSpec, live: &LiveState) -> Vec<Operation> {
    let removals = live
        .permissions
        .difference(&spec.list)
        .filter(|_| !spec.append)
        .map(|p| Operation::RemovePermission(p.clone()));
    let additions = spec
        .list
        .difference(&live.permissions)
        .map(|p| Operation::AddPermission(p.clone()));
    removals.chain(additions).collect()
}

/// Before/after view of the allowed groups once `operations` are applied
pub fn permission_change(live: &LiveState, operations: &[Operation]) -> FieldChange {
    let mut after = live.clone();
    for operation in operations {
        after.record(operation);
    }
    let join = |state: &LiveState| {
        state
            .permissions
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    };
    FieldChange::new("permissions", Some(join(live)), Some(join(&after)))
}
