//! Sequence-stamped cache cells for backend collections
//!
//! A cell is only ever replaced wholesale. Responses carry the sequence
//! number assigned when their request was issued, and a response older
//! than the last applied one is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend collections the controller mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Containers,
    Models,
    Services,
    BenchmarkHistory,
    NpuStatus,
    /// Lightweight aggregate refreshed by the poller
    Status,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 6] = [
        CollectionKind::Containers,
        CollectionKind::Models,
        CollectionKind::Services,
        CollectionKind::BenchmarkHistory,
        CollectionKind::NpuStatus,
        CollectionKind::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Containers => "containers",
            CollectionKind::Models => "models",
            CollectionKind::Services => "services",
            CollectionKind::BenchmarkHistory => "benchmark_history",
            CollectionKind::NpuStatus => "npu_status",
            CollectionKind::Status => "status",
        }
    }

    /// Human label for notifications
    pub fn label(&self) -> &'static str {
        match self {
            CollectionKind::Containers => "containers",
            CollectionKind::Models => "models",
            CollectionKind::Services => "running services",
            CollectionKind::BenchmarkHistory => "benchmark history",
            CollectionKind::NpuStatus => "NPU status",
            CollectionKind::Status => "status",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one cache cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionState {
    /// Never successfully loaded
    Empty,
    /// At least one request in flight
    Loading,
    Ready,
    /// Last refresh failed; the previous snapshot is retained
    Stale,
}

/// What happened to a completed response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Replaced,
    /// A later-issued response was already applied
    Superseded,
}

#[derive(Debug, Clone, Default)]
pub struct Cached<T> {
    data: T,
    issued_seq: u64,
    applied_seq: u64,
    in_flight: u32,
    loaded: bool,
    stale: bool,
    last_error: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl<T: Default> Cached<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> Cached<T> {
    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn state(&self) -> CollectionState {
        if self.in_flight > 0 {
            CollectionState::Loading
        } else if !self.loaded {
            CollectionState::Empty
        } else if self.stale {
            CollectionState::Stale
        } else {
            CollectionState::Ready
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    /// Stamp a new request; the returned sequence must be handed back on completion
    pub fn begin(&mut self) -> u64 {
        self.issued_seq += 1;
        self.in_flight += 1;
        self.issued_seq
    }

    /// Apply a successful response if it is the newest seen so far
    pub fn complete(&mut self, seq: u64, data: T) -> Applied {
        self.in_flight = self.in_flight.saturating_sub(1);
        if seq <= self.applied_seq {
            return Applied::Superseded;
        }
        self.data = data;
        self.applied_seq = seq;
        self.loaded = true;
        self.stale = false;
        self.last_error = None;
        self.updated_at = Some(Utc::now());
        Applied::Replaced
    }

    /// Record a failed request; the snapshot is never touched
    pub fn fail(&mut self, seq: u64, error: impl Into<String>) -> Applied {
        self.in_flight = self.in_flight.saturating_sub(1);
        if seq <= self.applied_seq {
            return Applied::Superseded;
        }
        self.stale = self.loaded;
        self.last_error = Some(error.into());
        Applied::Replaced
    }
}
