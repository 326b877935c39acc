//! `apply` and `plan` commands

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use reconcile::{
    DesiredState, FieldChange, LiveState, LogProgress, Observe, Operation, ProgressCallback,
    ReconcileError, ReconciliationResult,
};
use serde::Serialize;

use crate::Context;
use crate::cli::{ApplyArgs, StateArgs};
use crate::config;
use crate::system::YunohostSystem;
use crate::ui;

/// Machine-readable outcome printed with `--json`
#[derive(Debug, Serialize)]
struct Report<'a> {
    changed: bool,
    operations: &'a [Operation],
    diff: &'a [FieldChange],
    state: Option<&'a LiveState>,
}

impl<'a> Report<'a> {
    fn from_result(result: &'a ReconciliationResult) -> Self {
        Self {
            changed: result.changed,
            operations: &result.operations,
            diff: &result.diff,
            state: result.final_state.as_ref(),
        }
    }
}

/// Prints each operation as it runs, on top of logging it
struct ConsoleProgress {
    log: LogProgress,
    quiet: bool,
    applied: usize,
}

impl ConsoleProgress {
    fn new(quiet: bool) -> Self {
        Self {
            log: LogProgress,
            quiet,
            applied: 0,
        }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_observe(&mut self, instance: &str) {
        self.log.on_observe(instance);
    }

    fn on_operation_start(&mut self, instance: &str, operation: &Operation) {
        self.applied += 1;
        self.log.on_operation_start(instance, operation);
        if !self.quiet {
            println!(
                "{} {}",
                format!("[{}]", self.applied).blue().bold(),
                operation
            );
        }
    }

    fn on_operation_complete(&mut self, instance: &str, operation: &Operation) {
        self.log.on_operation_complete(instance, operation);
    }

    fn on_failure(&mut self, instance: &str, error: &ReconcileError) {
        self.log.on_failure(instance, error);
    }
}

/// Reconcile one instance toward the desired state
pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    check_flags(&args)?;
    let desired = config::load_desired(&args.state)?;
    let instance = reconcile::validate(&desired)?.to_string();
    let system = super::connect(ctx)?;

    if args.dry_run {
        return show_plan(ctx, &system, &desired, &instance, args.state.json);
    }

    let json = args.state.json;
    if !args.yes {
        let live = system.observe(&instance)?;
        let plan = reconcile::plan(&desired, live.as_ref())?;
        ui::display_plan(&instance, &plan);
        if plan.is_empty() {
            return Ok(());
        }
        println!();
        if !confirm_proceed()? {
            ui::info("Cancelled");
            return Ok(());
        }
    }

    let mut progress = ConsoleProgress::new(ctx.quiet || json);
    let result = reconcile::reconcile_with_progress(&desired, &system, &system, &mut progress)
        .with_context(|| format!("Failed to reconcile {instance}"))?;

    if json {
        print_json(&Report::from_result(&result))?;
    } else if !ctx.quiet {
        report(&instance, &result);
    }
    Ok(())
}

/// JSON output leaves no room for the confirmation prompt
fn check_flags(args: &ApplyArgs) -> Result<()> {
    if args.state.json && !args.yes && !args.dry_run {
        bail!("--json changes the app without asking; pass --yes as well, or --dry-run");
    }
    Ok(())
}

/// Show what apply would do
pub fn plan(ctx: &Context, args: StateArgs) -> Result<()> {
    let desired = config::load_desired(&args)?;
    let instance = reconcile::validate(&desired)?.to_string();
    let system = super::connect(ctx)?;
    show_plan(ctx, &system, &desired, &instance, args.json)
}

fn show_plan(
    ctx: &Context,
    system: &YunohostSystem,
    desired: &DesiredState,
    instance: &str,
    json: bool,
) -> Result<()> {
    let live = system.observe(instance)?;
    let plan = reconcile::plan(desired, live.as_ref())?;

    if json {
        let report = Report {
            changed: !plan.is_empty(),
            operations: &plan.operations,
            diff: &plan.diff,
            state: live.as_ref(),
        };
        return print_json(&report);
    }

    if !ctx.quiet {
        ui::warn("Dry run - no changes will be made");
    }
    ui::display_plan(instance, &plan);
    if plan.operations.iter().any(|op| matches!(op, Operation::Install { .. })) {
        ui::dim("Permissions are checked again once the app is installed");
    }
    Ok(())
}

fn report(instance: &str, result: &ReconciliationResult) {
    println!();
    if !result.changed {
        ui::success(&format!("{instance} is up to date"));
        return;
    }

    match &result.final_state {
        Some(state) => ui::success(&format!(
            "{} reconciled ({} operations)",
            state.identity.instance_id().unwrap_or(instance),
            result.operations.len()
        )),
        None => ui::success(&format!("{instance} removed")),
    }
    for change in &result.diff {
        ui::dim(&format!(
            "{}: {} → {}",
            change.field,
            ui::format_value(change.before.as_deref()),
            ui::format_value(change.after.as_deref())
        ));
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Apply these changes?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() {
        let result = ReconciliationResult {
            changed: true,
            operations: vec![Operation::AddPermission("visitors".into())],
            final_state: Some(LiveState::new("wiki").with_permissions(["visitors"])),
            diff: vec![FieldChange::new(
                "permissions",
                Some(String::new()),
                Some("visitors".into()),
            )],
        };

        let value = serde_json::to_value(Report::from_result(&result)).unwrap();
        assert_eq!(value["changed"], true);
        assert_eq!(value["operations"][0]["op"], "add_permission");
        assert_eq!(value["operations"][0]["args"], "visitors");
        assert_eq!(value["diff"][0]["field"], "permissions");
        assert_eq!(value["state"]["permissions"][0], "visitors");
    }

    #[test]
    fn test_report_after_removal_has_null_state() {
        let result = ReconciliationResult {
            changed: true,
            operations: vec![Operation::Uninstall],
            final_state: None,
            diff: Vec::new(),
        };

        let value = serde_json::to_value(Report::from_result(&result)).unwrap();
        assert!(value["state"].is_null());
        assert_eq!(value["operations"][0]["op"], "uninstall");
    }

    #[test]
    fn test_json_apply_requires_yes() {
        let mut args = ApplyArgs {
            state: StateArgs {
                name: Some("wiki".to_string()),
                json: true,
                ..Default::default()
            },
            dry_run: false,
            yes: false,
        };
        assert!(check_flags(&args).is_err());

        args.yes = true;
        assert!(check_flags(&args).is_ok());

        args.yes = false;
        args.dry_run = true;
        assert!(check_flags(&args).is_ok());

        args.state.json = false;
        args.dry_run = false;
        assert!(check_flags(&args).is_ok());
    }

    #[test]
    fn test_console_progress_counts_operations() {
        let mut progress = ConsoleProgress::new(true);
        progress.on_operation_start("wiki", &Operation::Upgrade);
        progress.on_operation_start("wiki", &Operation::ChangeLabel("Wiki".into()));
        assert_eq!(progress.applied, 2);
    }
}
