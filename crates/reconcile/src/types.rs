//! Core types for app reconciliation

use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Settings keys that describe the app URL rather than app configuration
pub const URL_SETTING_KEYS: [&str; 2] = ["domain", "path"];

/// Identifies one installed app instance
///
/// `name` is what YunoHost installs from (catalog id, local path or git URL).
/// `instance_id` is the id YunoHost assigned to the installed copy, e.g.
/// `grav__2` for a second grav instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AppIdentity {
    /// Identity of an app to install from `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Identity of an existing instance, without an install source
    pub fn instance(id: impl Into<String>) -> Self {
        Self {
            instance_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The instance id, falling back to the id an install of `name` gets
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref().or_else(|| {
            self.name
                .as_deref()
                .map(default_instance_id)
                .filter(|id| !id.is_empty())
        })
    }
}

/// Id YunoHost gives the first instance installed from `name`
///
/// Catalog ids are used as-is. A git URL or local path installs under its
/// last path segment without the `.git` and `_ynh` suffixes, so
/// `https://github.com/YunoHost-Apps/grav_ynh` becomes `grav`.
pub fn default_instance_id(name: &str) -> &str {
    let trimmed = name.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let segment = segment.strip_suffix(".git").unwrap_or(segment);
    segment.strip_suffix("_ynh").unwrap_or(segment)
}

/// Whether the app instance should exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Present,
    Absent,
}

/// Declared permission groups for the app's main permission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSpec {
    /// Groups and users allowed to access the app (`all_users` and
    /// `visitors` are special groups)
    pub list: BTreeSet<String>,
    /// Only add missing entries, never remove existing ones
    #[serde(default)]
    pub append: bool,
}

impl PermissionSpec {
    pub fn exact<I, S>(list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            list: list.into_iter().map(Into::into).collect(),
            append: false,
        }
    }

    pub fn append<I, S>(list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            append: true,
            ..Self::exact(list)
        }
    }
}

/// Declared target configuration for one app instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(flatten)]
    pub identity: AppIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Settings merged into the app configuration. Keys not listed are
    /// left untouched.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSpec>,
    #[serde(default, rename = "state")]
    pub presence: Presence,
    /// Upgrade the instance when YunoHost reports an available upgrade
    #[serde(default)]
    pub upgrade: bool,
}

impl DesiredState {
    /// An app that should be installed from `name`
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            identity: AppIdentity::named(name),
            ..Default::default()
        }
    }

    /// An instance that should not exist
    pub fn absent(instance_id: impl Into<String>) -> Self {
        Self {
            identity: AppIdentity::instance(instance_id),
            presence: Presence::Absent,
            ..Default::default()
        }
    }

    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.identity.instance_id = Some(id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.identity.label = Some(label.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionSpec) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }

    /// Domain to serve the app on: the explicit field wins over the
    /// `domain` setting
    pub fn effective_domain(&self) -> Option<&str> {
        self.domain
            .as_deref()
            .or_else(|| self.settings.get("domain").map(String::as_str))
    }

    /// URL path of the app: the explicit field wins over the `path` setting
    pub fn effective_path(&self) -> Option<&str> {
        self.path
            .as_deref()
            .or_else(|| self.settings.get("path").map(String::as_str))
    }

    /// Settings that go through the app configuration, i.e. everything
    /// except the URL keys
    pub fn asserted_settings(&self) -> impl Iterator<Item = (&String, &String)> {
        self.settings
            .iter()
            .filter(|(key, _)| !URL_SETTING_KEYS.contains(&key.as_str()))
    }
}

/// Observed state of an installed app instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    pub identity: AppIdentity,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub settings: BTreeMap<String, String>,
    /// Groups allowed on the main permission
    pub permissions: BTreeSet<String>,
    /// YunoHost reports a newer version of the app
    #[serde(default)]
    pub upgradable: bool,
}

impl LiveState {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            identity: AppIdentity::instance(instance_id),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.identity.label = Some(label.into());
        self
    }

    pub fn with_url(mut self, domain: impl Into<String>, path: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self.path = Some(path.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_upgradable(mut self, upgradable: bool) -> Self {
        self.upgradable = upgradable;
        self
    }

    /// Fold the effect of a successfully applied operation into this state
    ///
    /// Install and Uninstall change existence and are not representable
    /// here; they leave the state untouched.
    pub fn record(&mut self, operation: &Operation) {
        match operation {
            Operation::ChangeUrl { domain, path } => {
                if let Some(domain) = domain {
                    self.domain = Some(domain.clone());
                }
                if let Some(path) = path {
                    self.path = Some(path.clone());
                }
            }
            Operation::ChangeLabel(label) => self.identity.label = Some(label.clone()),
            Operation::UpdateSettings(settings) => self
                .settings
                .extend(settings.iter().map(|(k, v)| (k.clone(), v.clone()))),
            Operation::AddPermission(name) => {
                self.permissions.insert(name.clone());
            }
            Operation::RemovePermission(name) => {
                self.permissions.remove(name);
            }
            Operation::Upgrade => self.upgradable = false,
            Operation::Install { .. } | Operation::Uninstall => {}
        }
    }
}

/// Before/after record for one field touched by a reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, before: Option<String>, after: Option<String>) -> Self {
        Self {
            field: field.into(),
            before,
            after,
        }
    }
}

/// Ordered operations that bring live state to desired state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub operations: Vec<Operation>,
    pub diff: Vec<FieldChange>,
}

impl Plan {
    /// Nothing to do
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of external calls the plan makes
    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

/// Outcome of a successful reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// At least one operation was applied
    pub changed: bool,
    /// Operations applied, in order
    pub operations: Vec<Operation>,
    /// Live state after the pass, `None` when the instance no longer exists
    pub final_state: Option<LiveState>,
    pub diff: Vec<FieldChange>,
}

impl ReconciliationResult {
    /// Result of a pass that found nothing to do
    pub fn unchanged(state: Option<LiveState>) -> Self {
        Self {
            final_state: state,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_defaults_to_name() {
        let identity = AppIdentity::named("grav");
        assert_eq!(identity.instance_id(), Some("grav"));

        let identity = identity.with_instance_id("grav__2");
        assert_eq!(identity.instance_id(), Some("grav__2"));

        assert_eq!(AppIdentity::default().instance_id(), None);
    }

    #[test]
    fn test_instance_id_from_install_source() {
        let identity = AppIdentity::named("https://github.com/YunoHost-Apps/grav_ynh");
        assert_eq!(identity.instance_id(), Some("grav"));

        assert_eq!(
            default_instance_id("https://github.com/YunoHost-Apps/grav_ynh.git"),
            "grav"
        );
        assert_eq!(default_instance_id("/home/admin/wiki_ynh/"), "wiki");
        assert_eq!(default_instance_id("nextcloud"), "nextcloud");

        // nothing usable to derive from
        assert_eq!(AppIdentity::named("/").instance_id(), None);
    }

    #[test]
    fn test_effective_url_prefers_explicit_fields() {
        let desired = DesiredState::present("wordpress")
            .with_setting("domain", "old.example.org")
            .with_setting("path", "/wp");
        assert_eq!(desired.effective_domain(), Some("old.example.org"));
        assert_eq!(desired.effective_path(), Some("/wp"));

        let desired = desired.with_domain("new.example.org").with_path("/");
        assert_eq!(desired.effective_domain(), Some("new.example.org"));
        assert_eq!(desired.effective_path(), Some("/"));
    }

    #[test]
    fn test_asserted_settings_skip_url_keys() {
        let desired = DesiredState::present("wordpress")
            .with_setting("domain", "example.org")
            .with_setting("path", "/")
            .with_setting("admin", "alice");
        let keys: Vec<&String> = desired.asserted_settings().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["admin"]);
    }

    #[test]
    fn test_record_folds_operations() {
        let mut state = LiveState::new("wiki")
            .with_url("a.org", "/x")
            .with_permissions(["visitors"]);

        state.record(&Operation::ChangeUrl {
            domain: None,
            path: Some("/y".into()),
        });
        state.record(&Operation::ChangeLabel("Wiki".into()));
        state.record(&Operation::RemovePermission("visitors".into()));
        state.record(&Operation::AddPermission("all_users".into()));

        assert_eq!(state.domain.as_deref(), Some("a.org"));
        assert_eq!(state.path.as_deref(), Some("/y"));
        assert_eq!(state.identity.label.as_deref(), Some("Wiki"));
        assert!(state.permissions.contains("all_users"));
        assert!(!state.permissions.contains("visitors"));
    }

    #[test]
    fn test_desired_state_deserializes_flat() {
        let json = r#"{
            "name": "wordpress",
            "id": "wordpress__2",
            "label": "Blog",
            "domain": "example.org",
            "settings": {"admin": "alice"},
            "permissions": {"list": ["visitors"], "append": true},
            "state": "absent"
        }"#;
        let desired: DesiredState = serde_json::from_str(json).unwrap();
        assert_eq!(desired.identity.instance_id(), Some("wordpress__2"));
        assert_eq!(desired.identity.label.as_deref(), Some("Blog"));
        assert_eq!(desired.presence, Presence::Absent);
        assert!(desired.permissions.unwrap().append);
        assert!(!desired.upgrade);
    }
}
