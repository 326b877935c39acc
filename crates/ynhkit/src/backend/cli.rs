//! Real YunoHost CLI backend using `yunohost` commands.

use crate::args::encode_args;
use crate::backend::Backend;
use crate::error::{Error, ErrorCategory, Result};
use crate::types::{AppInfo, InstallRequest, PermissionList};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Output};

/// Where YunoHost installs its CLI.
pub const DEFAULT_YUNOHOST_PATH: &str = "/usr/bin/yunohost";

/// Backend that executes real `yunohost` commands.
pub struct CliBackend {
    /// Path to the yunohost executable
    yunohost_path: String,
}

impl CliBackend {
    /// Create a backend using the default yunohost location.
    ///
    /// Returns an error if YunoHost is not installed there.
    pub fn new() -> Result<Self> {
        if !Path::new(DEFAULT_YUNOHOST_PATH).exists() {
            return Err(Error::YunohostNotFound(DEFAULT_YUNOHOST_PATH.to_string()));
        }
        Ok(Self::with_path(DEFAULT_YUNOHOST_PATH))
    }

    /// Create a backend using a specific executable.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            yunohost_path: path.into(),
        }
    }

    /// Path of the executable this backend runs.
    pub fn path(&self) -> &str {
        &self.yunohost_path
    }

    /// Run a yunohost command and return output.
    fn run(&self, args: &[String]) -> Result<Output> {
        log::debug!("running {} {}", self.yunohost_path, args.join(" "));
        Command::new(&self.yunohost_path)
            .args(args)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::YunohostNotFound(self.yunohost_path.clone())
                } else {
                    Error::CommandFailed {
                        message: format!("failed to execute yunohost: {e}"),
                        stderr: String::new(),
                        exit_code: None,
                    }
                }
            })
    }

    /// Run a yunohost command and check for success.
    fn run_checked(&self, args: &[String], app: Option<&str>) -> Result<String> {
        let output = self.run(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_yunohost_output(
                &stderr,
                app,
                output.status.code(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Backend for CliBackend {
    fn is_available(&self) -> bool {
        self.run(&strings(&["--version"]))
            .is_ok_and(|output| output.status.success())
    }

    fn app_info(&self, app: &str) -> Result<Option<AppInfo>> {
        match self.run_checked(&info_args(app), Some(app)) {
            Ok(stdout) => Ok(Some(serde_json::from_str(&stdout)?)),
            Err(e) if e.category() == ErrorCategory::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn permissions(&self, app: &str) -> Result<PermissionList> {
        let stdout = self.run_checked(
            &strings(&["user", "permission", "list", app, "--output-as", "json"]),
            Some(app),
        )?;
        Ok(serde_json::from_str(&stdout)?)
    }

    fn install(&self, request: &InstallRequest) -> Result<Option<String>> {
        let stdout = self.run_checked(&install_args(request), Some(&request.name))?;
        let id = installed_id(&stdout);
        if id.is_none() {
            log::debug!("install of {} did not report an instance id", request.name);
        }
        Ok(id)
    }

    fn remove(&self, app: &str) -> Result<()> {
        self.run_checked(&strings(&["app", "remove", app]), Some(app))?;
        Ok(())
    }

    fn change_url(&self, app: &str, domain: Option<&str>, path: Option<&str>) -> Result<()> {
        self.run_checked(&change_url_args(app, domain, path), Some(app))?;
        Ok(())
    }

    fn change_label(&self, app: &str, label: &str) -> Result<()> {
        let permission = format!("{app}.main");
        self.run_checked(
            &strings(&["user", "permission", "update", &permission, "--label", label]),
            Some(app),
        )?;
        Ok(())
    }

    fn set_config(&self, app: &str, settings: &BTreeMap<String, String>) -> Result<()> {
        let encoded = encode_args(settings);
        self.run_checked(
            &strings(&["app", "config", "set", app, "--args", &encoded]),
            Some(app),
        )?;
        Ok(())
    }

    fn permission_add(&self, app: &str, group: &str) -> Result<()> {
        self.run_checked(&strings(&["user", "permission", "add", app, group]), Some(app))?;
        Ok(())
    }

    fn permission_remove(&self, app: &str, group: &str) -> Result<()> {
        self.run_checked(
            &strings(&["user", "permission", "remove", app, group]),
            Some(app),
        )?;
        Ok(())
    }

    fn upgrade(&self, app: &str) -> Result<()> {
        self.run_checked(&strings(&["app", "upgrade", app]), Some(app))?;
        Ok(())
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_string()).collect()
}

fn info_args(app: &str) -> Vec<String> {
    strings(&["app", "info", "--full", "--output-as", "json", app])
}

fn install_args(request: &InstallRequest) -> Vec<String> {
    let mut args = strings(&["app", "install", &request.name]);
    if let Some(label) = &request.label {
        args.extend(strings(&["--label", label]));
    }
    args.extend(strings(&[
        "--args",
        &encode_args(&request.args),
        "--force",
        "--output-as",
        "json",
    ]));
    args
}

/// Instance id from `app install --output-as json`, if the output has one
fn installed_id(stdout: &str) -> Option<String> {
    let output: serde_json::Value = serde_json::from_str(stdout.trim()).ok()?;
    output
        .get("id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn change_url_args(app: &str, domain: Option<&str>, path: Option<&str>) -> Vec<String> {
    let mut args = strings(&["app", "change-url", app]);
    if let Some(domain) = domain {
        args.extend(strings(&["-d", domain]));
    }
    if let Some(path) = path {
        args.extend(strings(&["-p", path]));
    }
    args
}
