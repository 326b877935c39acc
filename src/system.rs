//! YunoHost as a reconciliation target
//!
//! Adapts the ynhkit client to the reconciler's observe/apply
//! capabilities. Each operation becomes exactly one yunohost call.

use reconcile::{
    AppIdentity, Applied, Apply, ExecError, LiveState, ObservationError, Observe, Operation,
};
use ynhkit::{AppSnapshot, Client, InstallRequest};

pub struct YunohostSystem {
    client: Client,
}

impl YunohostSystem {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Observe for YunohostSystem {
    fn observe(&self, instance: &str) -> Result<Option<LiveState>, ObservationError> {
        let snapshot = self
            .client
            .inspect(instance)
            .map_err(|e| ObservationError::new(format!("inspecting {instance}: {e}")))?;
        Ok(snapshot.map(live_state))
    }
}

impl Apply for YunohostSystem {
    fn apply(&self, instance: &str, operation: &Operation) -> Result<Applied, ExecError> {
        let client = &self.client;
        let outcome = match operation {
            Operation::Install {
                name,
                label,
                domain,
                path,
                settings,
            } => {
                let request = install_request(name, label.as_deref(), domain, path, settings);
                return client
                    .install(&request)
                    .map(|id| id.map_or_else(Applied::done, Applied::installed))
                    .map_err(exec_error);
            }
            Operation::Uninstall => client.remove(instance),
            Operation::ChangeUrl { domain, path } => {
                client.change_url(instance, domain.as_deref(), path.as_deref())
            }
            Operation::ChangeLabel(label) => client.change_label(instance, label),
            Operation::UpdateSettings(settings) => client.set_config(instance, settings),
            Operation::AddPermission(group) => client.permission_add(instance, group),
            Operation::RemovePermission(group) => client.permission_remove(instance, group),
            Operation::Upgrade => client.upgrade(instance),
        };
        outcome.map(|()| Applied::done()).map_err(exec_error)
    }
}

fn install_request(
    name: &str,
    label: Option<&str>,
    domain: &str,
    path: &str,
    settings: &std::collections::BTreeMap<String, String>,
) -> InstallRequest {
    let mut request = InstallRequest::new(name)
        .with_arg("domain", domain)
        .with_arg("path", path);
    request
        .args
        .extend(settings.iter().map(|(k, v)| (k.clone(), v.clone())));
    if let Some(label) = label {
        request = request.with_label(label);
    }
    request
}

/// Convert a client error, keeping the exit status and stderr
fn exec_error(error: ynhkit::Error) -> ExecError {
    let message = match &error {
        ynhkit::Error::CommandFailed { stderr, .. } if !stderr.is_empty() => {
            format!("{error}: {stderr}")
        }
        _ => format!("{error} ({})", error.category().advice()),
    };
    let exec = ExecError::new(message);
    match error.exit_code() {
        Some(code) => exec.with_exit_code(code),
        None => exec,
    }
}

/// Map what YunoHost reports onto the reconciler's view of an instance
fn live_state(snapshot: AppSnapshot) -> LiveState {
    let AppSnapshot { info, allowed } = snapshot;
    LiveState {
        identity: AppIdentity {
            name: None,
            instance_id: Some(info.id.clone()),
            label: info.label.clone(),
        },
        domain: info.domain(),
        path: info.path(),
        settings: info.setting_strings(),
        permissions: allowed,
        upgradable: info.is_upgradable(),
    }
}
