use std::path::Path;

use crate::adapters::remote::firecloud_client::FirecloudClient;
use crate::cli::{context, output};
use crate::config::app_config::AppConfig;
use crate::core::errors::Result;

/// Execute the `anvil-audit status` command.
///
/// Calls `/status` and `/me` to show subsystem health and confirm the
/// configured token authenticates.
pub fn execute(verbose: bool) -> Result<()> {
    let config = AppConfig::load(context::config_path())?;
    let client = FirecloudClient::new(
        &config.anvil.api_url,
        &config.anvil.service_account_email,
        Path::new(&config.anvil.token_file),
    )?;

    if verbose {
        println!("API: {}", config.anvil.api_url);
    }

    output::header("AnVIL API status");
    let status = client.status()?;
    if status["ok"].as_bool().unwrap_or(false) {
        output::success("All systems ok");
    } else {
        output::warning("Some systems report problems");
    }
    if let Some(systems) = status["systems"].as_object() {
        for (name, details) in systems {
            if details["ok"].as_bool().unwrap_or(false) {
                output::success(name);
            } else {
                output::warning(&format!("{name} is down"));
            }
        }
    }

    output::header("Authenticated identity");
    let me = client.me()?;
    match me["userInfo"]["userEmail"].as_str() {
        Some(email) => output::success(email),
        None => output::warning("Authenticated, but no user email in response"),
    }

    Ok(())
}
