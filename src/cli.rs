use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ynh-app")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declaratively manage apps installed on a YunoHost server", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the yunohost executable
    #[arg(
        long,
        global = true,
        env = "YNH_APP_YUNOHOST",
        default_value = ynhkit::backend::cli::DEFAULT_YUNOHOST_PATH
    )]
    pub yunohost: String,

    /// Attempts per yunohost call when YunoHost is busy or the network fails
    #[arg(long, global = true, default_value = "3")]
    pub retries: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile an app instance toward its desired state
    Apply(ApplyArgs),

    /// Show what apply would change, without changing anything
    Plan(StateArgs),

    /// Show the live state of an installed app
    Status {
        /// Instance id (e.g. wordpress or wordpress__2)
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Only show what would change
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Do not ask for confirmation (required together with --json)
    #[arg(short, long)]
    pub yes: bool,
}

/// Desired state, from a file and/or flags (flags win)
#[derive(Args, Default)]
pub struct StateArgs {
    /// Desired state file (.toml or .json)
    pub file: Option<PathBuf>,

    /// Name, local path or git URL of the app to install
    #[arg(long)]
    pub name: Option<String>,

    /// Id of an installed instance (defaults to the name)
    #[arg(long)]
    pub id: Option<String>,

    /// Portal label
    #[arg(long)]
    pub label: Option<String>,

    /// Domain to serve the app on
    #[arg(long)]
    pub domain: Option<String>,

    /// URL path to serve the app on
    #[arg(long)]
    pub path: Option<String>,

    /// App setting as key=value (repeatable)
    #[arg(long = "setting", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Group or user allowed on the app (repeatable)
    #[arg(long = "permission", value_name = "GROUP")]
    pub permissions: Vec<String>,

    /// Only add the given permissions, never remove others
    #[arg(long)]
    pub append: bool,

    /// Make sure the instance is not installed
    #[arg(long)]
    pub absent: bool,

    /// Upgrade the app if an upgrade is available
    #[arg(long)]
    pub upgrade: bool,

    /// Print as JSON; apply also needs --yes, since no prompt is shown
    #[arg(long)]
    pub json: bool,
}
