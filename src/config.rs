//! Desired state loading
//!
//! A desired state comes from a TOML or JSON file, from command line flags,
//! or from both. Flags override what the file declares.

use anyhow::{Context, Result, bail};
use reconcile::{DesiredState, PermissionSpec, Presence};
use std::fs;
use std::path::Path;

use crate::cli::StateArgs;

/// Build the desired state from a file and/or flags
pub fn load_desired(args: &StateArgs) -> Result<DesiredState> {
    let mut desired = match &args.file {
        Some(path) => load_file(path)?,
        None => DesiredState::default(),
    };
    apply_flags(&mut desired, args)?;
    Ok(desired)
}

/// Parse a desired state file, picking the format from the extension
pub fn load_file(path: &Path) -> Result<DesiredState> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid desired state in {}", path.display()))
    } else {
        toml::from_str(&content)
            .with_context(|| format!("Invalid desired state in {}", path.display()))
    }
}

fn apply_flags(desired: &mut DesiredState, args: &StateArgs) -> Result<()> {
    if let Some(name) = &args.name {
        desired.identity.name = Some(name.clone());
    }
    if let Some(id) = &args.id {
        desired.identity.instance_id = Some(id.clone());
    }
    if let Some(label) = &args.label {
        desired.identity.label = Some(label.clone());
    }
    if let Some(domain) = &args.domain {
        desired.domain = Some(domain.clone());
    }
    if let Some(path) = &args.path {
        desired.path = Some(path.clone());
    }

    for setting in &args.settings {
        let (key, value) = parse_setting(setting)?;
        desired.settings.insert(key.to_string(), value.to_string());
    }

    if !args.permissions.is_empty() {
        desired.permissions = Some(PermissionSpec {
            list: args.permissions.iter().cloned().collect(),
            append: args.append,
        });
    } else if args.append
        && let Some(spec) = desired.permissions.as_mut()
    {
        spec.append = true;
    }

    if args.absent {
        desired.presence = Presence::Absent;
    }
    if args.upgrade {
        desired.upgrade = true;
    }
    Ok(())
}

/// Split `key=value`; the value may be empty or contain `=`
fn parse_setting(setting: &str) -> Result<(&str, &str)> {
    match setting.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("Invalid setting '{setting}', expected KEY=VALUE"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_setting() {
        assert_eq!(parse_setting("admin=alice").unwrap(), ("admin", "alice"));
        assert_eq!(parse_setting("motd=").unwrap(), ("motd", ""));
        assert_eq!(parse_setting("query=a=b").unwrap(), ("query", "a=b"));
        assert!(parse_setting("admin").is_err());
        assert!(parse_setting("=alice").is_err());
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "wordpress.toml",
            r#"
name = "wordpress"
label = "Blog"
domain = "example.org"
path = "/blog"
upgrade = true

[settings]
admin = "alice"

[permissions]
list = ["visitors", "all_users"]
"#,
        );

        let desired = load_file(&path).unwrap();
        assert_eq!(desired.identity.instance_id(), Some("wordpress"));
        assert_eq!(desired.identity.label.as_deref(), Some("Blog"));
        assert_eq!(desired.effective_path(), Some("/blog"));
        assert_eq!(desired.settings["admin"], "alice");
        assert!(desired.upgrade);
        assert_eq!(desired.presence, Presence::Present);

        let permissions = desired.permissions.unwrap();
        assert!(!permissions.append);
        assert_eq!(permissions.list.len(), 2);
    }

    #[test]
    fn test_load_json_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "old.json", r#"{"id": "grav__2", "state": "absent"}"#);

        let desired = load_file(&path).unwrap();
        assert_eq!(desired.presence, Presence::Absent);
        assert_eq!(desired.identity.instance_id(), Some("grav__2"));
        assert!(desired.identity.name.is_none());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.toml", "state = \"sideways\"");
        assert!(load_file(&path).is_err());
        assert!(load_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "wiki.toml",
            r#"
name = "wiki"
domain = "a.org"
path = "/x"

[permissions]
list = ["visitors"]
"#,
        );

        let args = StateArgs {
            file: Some(path),
            domain: Some("b.org".to_string()),
            settings: vec!["language=fr".to_string()],
            append: true,
            ..Default::default()
        };
        let desired = load_desired(&args).unwrap();
        assert_eq!(desired.domain.as_deref(), Some("b.org"));
        assert_eq!(desired.path.as_deref(), Some("/x"));
        assert_eq!(desired.settings["language"], "fr");
        assert!(desired.permissions.unwrap().append);
    }

    #[test]
    fn test_flags_only() {
        let args = StateArgs {
            name: Some("wiki".to_string()),
            id: Some("wiki__2".to_string()),
            permissions: vec!["p2".to_string(), "p1".to_string()],
            absent: true,
            ..Default::default()
        };
        let desired = load_desired(&args).unwrap();
        assert_eq!(desired.identity.instance_id(), Some("wiki__2"));
        assert_eq!(desired.presence, Presence::Absent);
        let list: Vec<String> = desired.permissions.unwrap().list.into_iter().collect();
        assert_eq!(list, vec!["p1", "p2"]);
    }
}
