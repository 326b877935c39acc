pub mod apply;
pub mod status;

use anyhow::{Result, bail};
use ynhkit::backend::cli::CliBackend;
use ynhkit::{Client, ErrorCategory, RetryConfig};

use crate::Context;
use crate::system::YunohostSystem;

/// Connect to the yunohost executable named on the command line
pub fn connect(ctx: &Context) -> Result<YunohostSystem> {
    let backend = CliBackend::with_path(&ctx.yunohost);
    let retry = RetryConfig {
        max_attempts: ctx.retries.max(1),
        ..RetryConfig::default()
    };
    let client = Client::with_backend(Box::new(backend)).with_retry(retry);

    if !client.is_available() {
        bail!(
            "{} at {} ({})",
            ErrorCategory::YunohostNotFound.description(),
            ctx.yunohost,
            ErrorCategory::YunohostNotFound.advice()
        );
    }
    log::debug!("using yunohost at {}", ctx.yunohost);
    Ok(YunohostSystem::new(client))
}
