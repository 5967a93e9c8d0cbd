//! Subcommand implementations

pub mod bench;
pub mod chat;
pub mod containers;
pub mod logs;
pub mod models;
pub mod prefs;
pub mod serve;
pub mod status;

use crate::output::{self, OutputFormat};
use playground_lib::{CollectionKind, Controller, Mutation, Outcome};
use std::sync::Arc;

/// Controller plus the chosen output format, shared by every command
pub struct Session {
    pub controller: Arc<Controller>,
    pub format: OutputFormat,
}

impl Session {
    pub fn new(controller: Arc<Controller>, format: OutputFormat) -> Self {
        Self { controller, format }
    }

    /// Print and clear pending notifications
    pub fn flush(&self) {
        let pending = self.controller.notifications().drain();
        match self.format {
            OutputFormat::Table => output::print_notifications(&pending),
            // Keep stdout parseable.
            OutputFormat::Json => output::print_notification_lines(&pending),
        }
    }

    /// Load one collection; false when the backend call failed
    pub async fn load(&self, kind: CollectionKind) -> bool {
        let outcome = self.controller.refresh(kind).await;
        self.flush();
        outcome.is_applied()
    }

    /// Submit a mutation and report whether it went through
    pub async fn submit(&self, mutation: Mutation) -> bool {
        let outcome = self.controller.submit(mutation).await;
        self.flush();
        match outcome {
            Outcome::Completed { .. } | Outcome::Skipped(_) => true,
            Outcome::Cancelled => {
                output::print_info("Cancelled");
                false
            }
            Outcome::Rejected(_) | Outcome::Failed(_) => false,
        }
    }
}
