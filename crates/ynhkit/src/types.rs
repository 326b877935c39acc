//! Core types for YunoHost app management.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Output of `yunohost app info --full --output-as json <app>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfo {
    /// Instance id (e.g. `wordpress__2`)
    pub id: String,
    /// Label shown in the portal
    #[serde(default)]
    pub label: Option<String>,
    /// Installed version
    #[serde(default)]
    pub version: Option<String>,
    /// `"yes"` when a newer version is available
    #[serde(default)]
    pub upgradable: Option<String>,
    /// Raw app settings; values are not always strings
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    /// Permissions of the app keyed by full permission name (`wiki.main`)
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionInfo>,
}

impl AppInfo {
    /// Domain the app is served on.
    pub fn domain(&self) -> Option<String> {
        self.settings.get("domain").map(setting_string)
    }

    /// URL path the app is served on.
    pub fn path(&self) -> Option<String> {
        self.settings.get("path").map(setting_string)
    }

    /// Settings rendered as strings; non-string JSON values keep their
    /// literal form (`10`, `true`).
    pub fn setting_strings(&self) -> BTreeMap<String, String> {
        self.settings
            .iter()
            .map(|(k, v)| (k.clone(), setting_string(v)))
            .collect()
    }

    /// Whether YunoHost reports an available upgrade.
    pub fn is_upgradable(&self) -> bool {
        self.upgradable.as_deref() == Some("yes")
    }

    /// The app's main permission, if the info output carried permissions.
    pub fn main_permission(&self) -> Option<&PermissionInfo> {
        main_permission(&self.id, &self.permissions)
    }
}

/// Render a settings value the way it reads in YunoHost's settings.yml
fn setting_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// One permission of an app.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionInfo {
    /// Groups and users allowed
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Label of the permission tile
    #[serde(default)]
    pub label: Option<String>,
}

impl PermissionInfo {
    /// Allowed groups as a set.
    pub fn allowed_set(&self) -> BTreeSet<String> {
        self.allowed.iter().cloned().collect()
    }
}

/// Output of `yunohost user permission list <app> --output-as json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionList {
    /// Permissions keyed by full permission name
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionInfo>,
}

impl PermissionList {
    /// Main permission of `app`.
    pub fn main_for(&self, app: &str) -> Option<&PermissionInfo> {
        main_permission(app, &self.permissions)
    }
}

/// Look up `<app>.main`, falling back to the first permission of the app.
fn main_permission<'a>(
    app: &str,
    permissions: &'a BTreeMap<String, PermissionInfo>,
) -> Option<&'a PermissionInfo> {
    permissions.get(&format!("{app}.main")).or_else(|| {
        let prefix = format!("{app}.");
        permissions
            .iter()
            .find(|(name, _)| name.starts_with(&prefix))
            .map(|(_, info)| info)
    })
}

/// An installed app together with the groups allowed on its main
/// permission.
#[derive(Debug, Clone, Default)]
pub struct AppSnapshot {
    /// Output of `app info --full`
    pub info: AppInfo,
    /// Groups and users allowed on the main permission
    pub allowed: BTreeSet<String>,
}

/// Everything `yunohost app install` needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    /// Catalog id, local path or git URL
    pub name: String,
    /// Portal label
    pub label: Option<String>,
    /// Install arguments (`domain`, `path` and app-specific questions)
    pub args: BTreeMap<String, String>,
}

impl InstallRequest {
    /// Create a request to install `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the portal label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add an install argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// Configuration for retry logic with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_INFO: &str = r#"{
        "id": "wiki",
        "label": "Wiki",
        "description": "Lightweight wiki",
        "version": "2024-02-06a~ynh1",
        "upgradable": "yes",
        "domain_path": "a.org/x",
        "settings": {
            "domain": "a.org",
            "path": "/x",
            "language": "fr",
            "max_upload": 10,
            "public": true,
            "unset": null
        },
        "permissions": {
            "wiki.admin": {"allowed": ["admins"]},
            "wiki.main": {"allowed": ["visitors", "all_users"], "label": "Wiki"}
        }
    }"#;

    #[test]
    fn test_parse_app_info() {
        let info: AppInfo = serde_json::from_str(APP_INFO).unwrap();
        assert_eq!(info.id, "wiki");
        assert_eq!(info.domain().as_deref(), Some("a.org"));
        assert_eq!(info.path().as_deref(), Some("/x"));
        assert!(info.is_upgradable());

        let settings = info.setting_strings();
        assert_eq!(settings["language"], "fr");
        assert_eq!(settings["max_upload"], "10");
        assert_eq!(settings["public"], "true");
        assert_eq!(settings["unset"], "");

        let main = info.main_permission().unwrap();
        assert_eq!(
            main.allowed_set().into_iter().collect::<Vec<_>>(),
            vec!["all_users", "visitors"]
        );
    }

    #[test]
    fn test_parse_minimal_app_info() {
        let info: AppInfo = serde_json::from_str(r#"{"id": "wiki"}"#).unwrap();
        assert!(!info.is_upgradable());
        assert!(info.domain().is_none());
        assert!(info.main_permission().is_none());
    }

    #[test]
    fn test_permission_list_fallback() {
        let json = r#"{"permissions": {"nextcloud.files": {"allowed": ["alice"]}, "other.main": {"allowed": []}}}"#;
        let list: PermissionList = serde_json::from_str(json).unwrap();
        assert_eq!(list.main_for("nextcloud").unwrap().allowed, vec!["alice"]);
        assert!(list.main_for("wiki").is_none());
    }

    #[test]
    fn test_retry_config_delay() {
        let config = RetryConfig::new(5, Duration::from_secs(5), 2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(10));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(20));
        // capped at max_delay
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(60));
    }
}
