use colored::{ColoredString, Colorize};
use reconcile::{FieldChange, LiveState, Operation, Plan};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Plan Display
// ============================================================================

/// Render an optional field value; an empty string is a real value
pub fn format_value(value: Option<&str>) -> String {
    match value {
        None => "(unset)".to_string(),
        Some("") => "\"\"".to_string(),
        Some(v) => v.to_string(),
    }
}

fn operation_symbol(operation: &Operation) -> ColoredString {
    match operation {
        Operation::Install { .. } | Operation::AddPermission(_) => "+".green(),
        Operation::Uninstall | Operation::RemovePermission(_) => "-".red(),
        _ => "~".yellow(),
    }
}

fn change_line(change: &FieldChange) -> String {
    format!(
        "{:<24} {} → {}",
        change.field,
        format_value(change.before.as_deref()).dimmed(),
        format_value(change.after.as_deref())
    )
}

/// Display the operations and field changes of a plan
pub fn display_plan(instance: &str, plan: &Plan) {
    if plan.is_empty() {
        println!();
        println!("  {} {} is up to date", "✓".green(), instance.bold());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        format!("Plan for {instance}").bold()
    );
    println!("│");
    println!("│ {}", "Operations".bold());
    for operation in &plan.operations {
        println!("│   {} {}", operation_symbol(operation), operation);
    }

    if !plan.diff.is_empty() {
        println!("│");
        println!("│ {}", "Changes".bold());
        for change in &plan.diff {
            println!("│   {}", change_line(change));
        }
    }

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} operations, {} fields",
        plan.len().to_string().bold(),
        plan.diff.len().to_string().bold()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display the observed state of an instance
pub fn display_state(state: &LiveState) {
    let id = state.identity.instance_id().unwrap_or("?");
    header(&format!("App: {id}"));

    kv("Label", &format_value(state.identity.label.as_deref()));
    let url = match (&state.domain, &state.path) {
        (Some(domain), Some(path)) => format!("{domain}{path}"),
        (Some(domain), None) => domain.clone(),
        _ => format_value(None),
    };
    kv("URL", &url);

    let permissions: Vec<&str> = state.permissions.iter().map(String::as_str).collect();
    kv(
        "Allowed",
        &if permissions.is_empty() {
            "(nobody)".to_string()
        } else {
            permissions.join(", ")
        },
    );
    kv(
        "Upgrade",
        &if state.upgradable {
            "available".yellow().to_string()
        } else {
            "up to date".green().to_string()
        },
    );

    if !state.settings.is_empty() {
        section("Settings");
        for (key, value) in &state.settings {
            kv(key, &format_value(Some(value)));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
