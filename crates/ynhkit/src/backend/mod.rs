//! Backend abstraction for YunoHost operations.
//!
//! The [`Backend`] trait defines the interface for interacting with
//! YunoHost, allowing for different implementations (real CLI, mock for
//! testing).

pub mod cli;

use crate::error::Result;
use crate::types::{AppInfo, InstallRequest, PermissionList};
use std::collections::BTreeMap;

/// Backend trait for YunoHost app operations.
///
/// Every method maps to one `yunohost` invocation.
pub trait Backend: Send + Sync {
    /// Check if YunoHost is available.
    fn is_available(&self) -> bool;

    /// Full info for an installed app, `None` if no such instance exists.
    fn app_info(&self, app: &str) -> Result<Option<AppInfo>>;

    /// Permissions of an installed app.
    fn permissions(&self, app: &str) -> Result<PermissionList>;

    /// Install an app, returning the instance id YunoHost assigned when it
    /// reports one.
    fn install(&self, request: &InstallRequest) -> Result<Option<String>>;

    /// Remove an installed app.
    fn remove(&self, app: &str) -> Result<()>;

    /// Move an app to a new domain and/or path.
    fn change_url(&self, app: &str, domain: Option<&str>, path: Option<&str>) -> Result<()>;

    /// Change the portal label of the app's main permission.
    fn change_label(&self, app: &str, label: &str) -> Result<()>;

    /// Set several settings through the app config panel in one call.
    fn set_config(&self, app: &str, settings: &BTreeMap<String, String>) -> Result<()>;

    /// Allow a group or user on the app's main permission.
    fn permission_add(&self, app: &str, group: &str) -> Result<()>;

    /// Disallow a group or user on the app's main permission.
    fn permission_remove(&self, app: &str, group: &str) -> Result<()>;

    /// Upgrade an app to its latest version.
    fn upgrade(&self, app: &str) -> Result<()>;
}
