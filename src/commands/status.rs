//! `status` command

use anyhow::{Context as _, Result};
use reconcile::Observe;

use crate::Context;
use crate::ui;

/// Print the observed live state of an instance
pub fn run(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let system = super::connect(ctx)?;
    let state = system.observe(id)?;

    if json {
        let json = serde_json::to_string_pretty(&state).context("Failed to serialize state")?;
        println!("{json}");
        return Ok(());
    }

    match state {
        Some(state) => ui::display_state(&state),
        None => ui::warn(&format!("{id} is not installed")),
    }
    Ok(())
}
