//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use playground_lib::notify::{Level, Notification};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a stored preference, falling back to the table format
    pub fn from_preference(value: Option<&str>) -> Self {
        value
            .and_then(|v| OutputFormat::from_str(v, true).ok())
            .unwrap_or_default()
    }
}

/// Render rows as a rounded table, or print `placeholder` when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, placeholder: &str) {
    if rows.is_empty() {
        println!("{}", placeholder.yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print controller notifications in arrival order
pub fn print_notifications(notifications: &[Notification]) {
    for notification in notifications {
        match notification.level {
            Level::Success => print_success(&notification.message),
            Level::Info => print_info(&notification.message),
            Level::Warning => print_warning(&notification.message),
            Level::Error => print_error(&notification.message),
        }
    }
}

#[derive(Serialize)]
struct NotificationLine<'a> {
    level: Level,
    message: &'a str,
}

/// Notifications as JSON lines on stderr
pub fn print_notification_lines(notifications: &[Notification]) {
    for notification in notifications {
        let line = NotificationLine {
            level: notification.level,
            message: &notification.message,
        };
        if let Ok(json) = serde_json::to_string(&line) {
            eprintln!("{}", json);
        }
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    let lower = status.to_lowercase();
    if lower.starts_with("up") || lower == "running" || lower == "ok" || lower == "healthy" {
        status.green().to_string()
    } else if lower.starts_with("exited") || lower == "failed" || lower == "error" {
        status.red().to_string()
    } else if lower.starts_with("created") || lower == "unknown" || lower == "warning" {
        status.yellow().to_string()
    } else {
        status.to_string()
    }
}

/// Yes/no marker for boolean columns
pub fn color_flag(value: bool) -> String {
    if value {
        "●".green().to_string()
    } else {
        "○".dimmed().to_string()
    }
}

/// Color utilization percentage based on load
pub fn color_utilization(percent: f64) -> String {
    let formatted = format!("{:.0}%", percent);
    if percent >= 80.0 {
        formatted.red().to_string()
    } else if percent >= 40.0 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}
