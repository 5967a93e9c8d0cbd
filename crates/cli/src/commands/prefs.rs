//! `vap config` commands

use anyhow::Result;
use colored::Colorize;
use playground_lib::ControllerConfig;

use crate::config::Config;
use crate::output::{print_json, print_success, OutputFormat};

fn or_unset(value: &Option<String>) -> String {
    value
        .clone()
        .unwrap_or_else(|| "(unset)".dimmed().to_string())
}

/// Print stored preferences and the effective controller settings
pub fn show(preferences: &Config, settings: &ControllerConfig, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "preferences": preferences,
            "controller": settings,
        }))?,
        OutputFormat::Table => {
            println!("{}", "Preferences".bold());
            println!("{}", "-".repeat(50));
            println!("api_url:                {}", or_unset(&preferences.api_url));
            println!("default_format:         {}", or_unset(&preferences.default_format));
            println!("chat_url:               {}", or_unset(&preferences.chat_url));
            println!("chat_model:             {}", or_unset(&preferences.chat_model));
            println!();
            println!("{}", "Controller".bold());
            println!("{}", "-".repeat(50));
            println!("Backend:                {}", settings.api_url.cyan());
            println!("Poll interval:          {}s", settings.poll_interval_secs);
            println!("Request timeout:        {}s", settings.request_timeout_secs);
            println!("Notification lifetime:  {}ms", settings.notification_ttl_ms);
            println!("NPU count:              {}", settings.npu_count);
            println!(
                "Create form devices:    {}",
                String::from(settings.modal_devices)
            );
        }
    }
    Ok(true)
}

/// Update one preference and write the file back
pub fn set(mut preferences: Config, key: &str, value: &str) -> Result<bool> {
    preferences.set(key, value)?;
    preferences.save()?;
    print_success(&format!("Set {}", key));
    Ok(true)
}
