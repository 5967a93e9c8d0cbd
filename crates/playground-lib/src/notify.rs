//! Transient operator notifications
//!
//! Each entry expires after a fixed lifetime. Renderers either poll
//! `active()` or consume entries with `drain()`.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub message: String,
    created_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant, lifetime: Duration) -> bool {
        now.duration_since(self.created_at) >= lifetime
    }
}

#[derive(Debug)]
struct Queue {
    next_id: u64,
    entries: VecDeque<Notification>,
}

/// Oldest entries are dropped beyond this many pending notifications
pub const MAX_PENDING: usize = 100;

/// Auto-expiring notification queue
#[derive(Debug)]
pub struct Notifications {
    lifetime: Duration,
    queue: Mutex<Queue>,
}

impl Notifications {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            queue: Mutex::new(Queue {
                next_id: 1,
                entries: VecDeque::new(),
            }),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue> {
        // A panicked writer cannot leave the queue half-updated.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, level: Level, message: impl Into<String>) -> u64 {
        let message = message.into();
        match level {
            Level::Error | Level::Warning => warn!(level = ?level, message = %message, "notification"),
            _ => debug!(level = ?level, message = %message, "notification"),
        }

        let now = Instant::now();
        let lifetime = self.lifetime;
        let mut queue = self.lock();
        queue.entries.retain(|n| !n.is_expired(now, lifetime));
        while queue.entries.len() >= MAX_PENDING {
            queue.entries.pop_front();
        }

        let id = queue.next_id;
        queue.next_id += 1;
        queue.entries.push_back(Notification {
            id,
            level,
            message,
            created_at: now,
        });
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Error, message)
    }

    /// Unexpired entries, oldest first; expired ones are pruned
    pub fn active(&self) -> Vec<Notification> {
        self.active_at(Instant::now())
    }

    pub fn active_at(&self, now: Instant) -> Vec<Notification> {
        let lifetime = self.lifetime;
        let mut queue = self.lock();
        queue.entries.retain(|n| !n.is_expired(now, lifetime));
        queue.entries.iter().cloned().collect()
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let mut queue = self.lock();
        let before = queue.entries.len();
        queue.entries.retain(|n| n.id != id);
        queue.entries.len() != before
    }

    /// Take every pending entry, including expired ones not yet pruned
    pub fn drain(&self) -> Vec<Notification> {
        self.lock().entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}
