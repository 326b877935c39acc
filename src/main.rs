mod cli;
mod commands;
mod config;
mod system;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Path to the yunohost executable
    pub yunohost: String,
    /// Attempts per yunohost call
    pub retries: u32,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        yunohost: cli.yunohost,
        retries: cli.retries,
    };

    if let Err(e) = run(&ctx, cli.command) {
        ui::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    log::trace!("verbosity {}", ctx.verbose);
    match command {
        Command::Apply(args) => commands::apply::apply(ctx, args),
        Command::Plan(args) => commands::apply::plan(ctx, args),
        Command::Status { id, json } => commands::status::run(ctx, &id, json),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ynh-app", &mut io::stdout());
            Ok(())
        }
    }
}
