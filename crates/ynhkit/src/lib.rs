//! # ynhkit
//!
//! Typed Rust client for the YunoHost CLI.
//!
//! This crate provides functionality for:
//! - Inspecting installed apps (`app info`, `user permission list`)
//! - Installing, removing and upgrading apps
//! - Changing an app's URL, label, settings and permissions
//! - Retrying transient failures (lock contention, network) with backoff
//!
//! ## Example
//!
//! ```no_run
//! use ynhkit::{Client, InstallRequest};
//!
//! let client = Client::new().expect("YunoHost not available");
//!
//! if client.inspect("wordpress").unwrap().is_none() {
//!     let request = InstallRequest::new("wordpress")
//!         .with_arg("domain", "example.org")
//!         .with_arg("path", "/blog");
//!     client.install(&request).unwrap();
//! }
//! client.permission_add("wordpress", "visitors").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod backend;
pub mod error;
pub mod retry;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use types::{
    AppInfo, AppSnapshot, InstallRequest, PermissionInfo, PermissionList, RetryConfig,
};

use backend::{Backend, cli::CliBackend};
use std::collections::BTreeMap;

/// High-level client for YunoHost app operations.
///
/// Every call goes through [`retry::with_retry`] with the client's
/// [`RetryConfig`], so a command that hits YunoHost's lock is tried again.
pub struct Client {
    backend: Box<dyn Backend>,
    retry: RetryConfig,
}

impl Client {
    /// Create a new Client with the default backend.
    ///
    /// Returns an error if YunoHost is not installed.
    pub fn new() -> Result<Self> {
        let backend = CliBackend::new()?;
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
        }
    }

    /// Replace the retry configuration.
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Check if YunoHost is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    fn retrying<T>(&self, operation: impl FnMut() -> Result<T>) -> Result<T> {
        retry::with_retry(&self.retry, Some(&retry::LogCallback), operation)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Full info for an installed app, `None` if it does not exist.
    pub fn app_info(&self, app: &str) -> Result<Option<AppInfo>> {
        self.retrying(|| self.backend.app_info(app))
    }

    /// Info plus main-permission groups for an installed app.
    ///
    /// Uses the permissions embedded in `app info --full` when present and
    /// falls back to `user permission list` otherwise.
    pub fn inspect(&self, app: &str) -> Result<Option<AppSnapshot>> {
        let Some(info) = self.app_info(app)? else {
            return Ok(None);
        };

        let allowed = match info.main_permission() {
            Some(permission) => permission.allowed_set(),
            None => {
                let list = self.retrying(|| self.backend.permissions(app))?;
                list.main_for(app)
                    .map(PermissionInfo::allowed_set)
                    .unwrap_or_default()
            }
        };

        Ok(Some(AppSnapshot { info, allowed }))
    }

    // =========================================================================
    // App Operations
    // =========================================================================

    /// Install an app, returning the instance id YunoHost assigned when it
    /// reports one.
    pub fn install(&self, request: &InstallRequest) -> Result<Option<String>> {
        self.retrying(|| self.backend.install(request))
    }

    /// Remove an app.
    pub fn remove(&self, app: &str) -> Result<()> {
        self.retrying(|| self.backend.remove(app))
    }

    /// Move an app to a new domain and/or path.
    pub fn change_url(&self, app: &str, domain: Option<&str>, path: Option<&str>) -> Result<()> {
        self.retrying(|| self.backend.change_url(app, domain, path))
    }

    /// Change an app's portal label.
    pub fn change_label(&self, app: &str, label: &str) -> Result<()> {
        self.retrying(|| self.backend.change_label(app, label))
    }

    /// Set settings through the config panel in one call.
    pub fn set_config(&self, app: &str, settings: &BTreeMap<String, String>) -> Result<()> {
        self.retrying(|| self.backend.set_config(app, settings))
    }

    /// Allow a group or user on the app.
    pub fn permission_add(&self, app: &str, group: &str) -> Result<()> {
        self.retrying(|| self.backend.permission_add(app, group))
    }

    /// Disallow a group or user on the app.
    pub fn permission_remove(&self, app: &str, group: &str) -> Result<()> {
        self.retrying(|| self.backend.permission_remove(app, group))
    }

    /// Upgrade an app.
    pub fn upgrade(&self, app: &str) -> Result<()> {
        self.retrying(|| self.backend.upgrade(app))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Backend serving canned info and recording mutating calls
    #[derive(Default)]
    struct MockBackend {
        info: Option<AppInfo>,
        list: PermissionList,
        busy_failures: Mutex<u32>,
        calls: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn record(&self, call: String) -> Result<()> {
            let mut busy = self.busy_failures.lock().unwrap();
            if *busy > 0 {
                *busy -= 1;
                return Err(Error::Busy {
                    message: "Another YunoHost command is running".to_string(),
                });
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    impl Backend for MockBackend {
        fn is_available(&self) -> bool {
            true
        }
        fn app_info(&self, _app: &str) -> Result<Option<AppInfo>> {
            Ok(self.info.clone())
        }
        fn permissions(&self, app: &str) -> Result<PermissionList> {
            self.record(format!("permission list {app}"))?;
            Ok(self.list.clone())
        }
        fn install(&self, request: &InstallRequest) -> Result<Option<String>> {
            self.record(format!("install {}", request.name))?;
            Ok(Some(format!("{}__2", request.name)))
        }
        fn remove(&self, app: &str) -> Result<()> {
            self.record(format!("remove {app}"))
        }
        fn change_url(&self, app: &str, domain: Option<&str>, path: Option<&str>) -> Result<()> {
            self.record(format!("change-url {app} {domain:?} {path:?}"))
        }
        fn change_label(&self, app: &str, label: &str) -> Result<()> {
            self.record(format!("label {app} {label}"))
        }
        fn set_config(&self, app: &str, settings: &BTreeMap<String, String>) -> Result<()> {
            self.record(format!("config {app} {}", args::encode_args(settings)))
        }
        fn permission_add(&self, app: &str, group: &str) -> Result<()> {
            self.record(format!("permission add {app} {group}"))
        }
        fn permission_remove(&self, app: &str, group: &str) -> Result<()> {
            self.record(format!("permission remove {app} {group}"))
        }
        fn upgrade(&self, app: &str) -> Result<()> {
            self.record(format!("upgrade {app}"))
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_inspect_missing_app() {
        let client = Client::with_backend(Box::new(MockBackend::default()));
        assert!(client.inspect("wiki").unwrap().is_none());
    }

    #[test]
    fn test_inspect_uses_embedded_permissions() {
        let info: AppInfo = serde_json::from_str(
            r#"{"id": "wiki", "permissions": {"wiki.main": {"allowed": ["visitors"]}}}"#,
        )
        .unwrap();
        let backend = MockBackend {
            info: Some(info),
            ..Default::default()
        };
        let client = Client::with_backend(Box::new(backend));

        let snapshot = client.inspect("wiki").unwrap().unwrap();
        assert_eq!(snapshot.allowed.into_iter().collect::<Vec<_>>(), vec!["visitors"]);
    }

    #[test]
    fn test_inspect_falls_back_to_permission_list() {
        let info: AppInfo = serde_json::from_str(r#"{"id": "wiki"}"#).unwrap();
        let list: PermissionList =
            serde_json::from_str(r#"{"permissions": {"wiki.main": {"allowed": ["all_users"]}}}"#)
                .unwrap();
        let backend = MockBackend {
            info: Some(info),
            list,
            ..Default::default()
        };
        let client = Client::with_backend(Box::new(backend));

        let snapshot = client.inspect("wiki").unwrap().unwrap();
        assert!(snapshot.allowed.contains("all_users"));
    }

    #[test]
    fn test_install_reports_assigned_id() {
        let client = Client::with_backend(Box::new(MockBackend::default()));
        let request = InstallRequest::new("grav").with_arg("domain", "a.org");
        assert_eq!(client.install(&request).unwrap().as_deref(), Some("grav__2"));
    }

    #[test]
    fn test_busy_backend_is_retried() {
        let backend = MockBackend {
            busy_failures: Mutex::new(2),
            ..Default::default()
        };
        let client = Client::with_backend(Box::new(backend)).with_retry(fast_retry());
        client.permission_add("wiki", "visitors").unwrap();
    }

    #[test]
    fn test_busy_backend_gives_up() {
        let backend = MockBackend {
            busy_failures: Mutex::new(5),
            ..Default::default()
        };
        let client = Client::with_backend(Box::new(backend)).with_retry(fast_retry());
        let err = client.remove("wiki").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Busy);
    }
}
