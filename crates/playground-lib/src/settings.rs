//! Controller configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default checked state of the create-container device checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModalDevices {
    /// Every listed device starts checked
    All,
    /// Only the first N devices start checked
    FirstN(u32),
}

impl ModalDevices {
    /// Devices checked when the form opens, given the checklist size
    pub fn defaults(&self, npu_count: u32) -> Vec<u32> {
        match self {
            ModalDevices::All => (0..npu_count).collect(),
            ModalDevices::FirstN(n) => (0..npu_count.min(*n)).collect(),
        }
    }
}

impl TryFrom<String> for ModalDevices {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim().to_lowercase();
        if value == "all" {
            return Ok(ModalDevices::All);
        }
        value
            .strip_prefix("first:")
            .and_then(|n| n.trim().parse().ok())
            .map(ModalDevices::FirstN)
            .ok_or_else(|| format!("invalid modal_devices '{}', expected 'all' or 'first:N'", value))
    }
}

impl From<ModalDevices> for String {
    fn from(value: ModalDevices) -> Self {
        match value {
            ModalDevices::All => "all".to_string(),
            ModalDevices::FirstN(n) => format!("first:{}", n),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Backend base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Status poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Notification lifetime in milliseconds
    #[serde(default = "default_notification_ttl")]
    pub notification_ttl_ms: u64,

    /// Number of devices offered by the selectors
    #[serde(default = "default_npu_count")]
    pub npu_count: u32,

    #[serde(default = "default_modal_devices")]
    pub modal_devices: ModalDevices,
}

fn default_api_url() -> String {
    "http://localhost:7860".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    // Benchmarks and chat completions can take minutes.
    300
}

fn default_notification_ttl() -> u64 {
    3000
}

fn default_npu_count() -> u32 {
    8
}

fn default_modal_devices() -> ModalDevices {
    ModalDevices::All
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            notification_ttl_ms: default_notification_ttl(),
            npu_count: default_npu_count(),
            modal_devices: default_modal_devices(),
        }
    }
}

impl ControllerConfig {
    /// Load from an optional config file, then `VAP_*` environment variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("VAP").try_parsing(true))
            .build()
            .context("Failed to read controller configuration")?;

        config
            .try_deserialize()
            .context("Invalid controller configuration")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}
