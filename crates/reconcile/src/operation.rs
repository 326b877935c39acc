//! Operations the reconciler asks the backing system to perform
//!
//! Each operation maps to exactly one external call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single atomic change to an app instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Operation {
    /// Install the app from `name`
    Install {
        name: String,
        label: Option<String>,
        domain: String,
        path: String,
        settings: BTreeMap<String, String>,
    },
    /// Remove the instance
    Uninstall,
    /// Move the app to a new domain and/or path in one step
    ChangeUrl {
        domain: Option<String>,
        path: Option<String>,
    },
    ChangeLabel(String),
    /// Set several settings in one call
    UpdateSettings(BTreeMap<String, String>),
    AddPermission(String),
    RemovePermission(String),
    /// Upgrade to the latest available version
    Upgrade,
}

impl Operation {
    /// Short machine-friendly name of the operation kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::Uninstall => "uninstall",
            Self::ChangeUrl { .. } => "change_url",
            Self::ChangeLabel(_) => "change_label",
            Self::UpdateSettings(_) => "update_settings",
            Self::AddPermission(_) => "add_permission",
            Self::RemovePermission(_) => "remove_permission",
            Self::Upgrade => "upgrade",
        }
    }

    /// Whether live state must be queried again once this operation has run
    ///
    /// These operations change existence or the URL of the instance, and
    /// YunoHost may normalize what it was given.
    pub fn requires_reobserve(&self) -> bool {
        matches!(
            self,
            Self::Install { .. } | Self::Uninstall | Self::ChangeUrl { .. } | Self::Upgrade
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install {
                name, domain, path, ..
            } => write!(f, "install {name} at {domain}{path}"),
            Self::Uninstall => write!(f, "uninstall"),
            Self::ChangeUrl { domain, path } => {
                write!(f, "change url to ")?;
                match (domain, path) {
                    (Some(d), Some(p)) => write!(f, "{d}{p}"),
                    (Some(d), None) => write!(f, "domain {d}"),
                    (None, Some(p)) => write!(f, "path {p}"),
                    (None, None) => write!(f, "(unchanged)"),
                }
            }
            Self::ChangeLabel(label) => write!(f, "change label to '{label}'"),
            Self::UpdateSettings(settings) => {
                let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
                write!(f, "update settings {}", keys.join(", "))
            }
            Self::AddPermission(name) => write!(f, "allow {name}"),
            Self::RemovePermission(name) => write!(f, "disallow {name}"),
            Self::Upgrade => write!(f, "upgrade"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let op = Operation::ChangeUrl {
            domain: Some("a.org".into()),
            path: Some("/y".into()),
        };
        assert_eq!(op.to_string(), "change url to a.org/y");

        let op = Operation::ChangeUrl {
            domain: None,
            path: Some("/y".into()),
        };
        assert_eq!(op.to_string(), "change url to path /y");

        let settings = BTreeMap::from([
            ("admin".to_string(), "alice".to_string()),
            ("language".to_string(), "fr".to_string()),
        ]);
        assert_eq!(
            Operation::UpdateSettings(settings).to_string(),
            "update settings admin, language"
        );
    }

    #[test]
    fn test_requires_reobserve() {
        assert!(Operation::Uninstall.requires_reobserve());
        assert!(Operation::Upgrade.requires_reobserve());
        assert!(!Operation::ChangeLabel("x".into()).requires_reobserve());
        assert!(!Operation::AddPermission("visitors".into()).requires_reobserve());
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(Operation::AddPermission("visitors".into())).unwrap();
        assert_eq!(json["op"], "add_permission");
    }
}
