//! Periodic status polling
//!
//! Refreshes a fixed set of collections on an interval until stopped.
//! Responses go through the same sequence-stamped refresh path as manual
//! refreshes, so a slow poll can never overwrite newer data.

use crate::cache::CollectionKind;
use crate::controller::{Controller, RefreshOutcome};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

/// Configuration for the polling loop
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between polls (default: 5 seconds)
    pub interval: Duration,
    /// Collections refreshed on every tick, in order
    pub kinds: Vec<CollectionKind>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            kinds: vec![CollectionKind::Status],
        }
    }
}

/// Polling loop bound to one controller
pub struct StatusPoller {
    controller: Arc<Controller>,
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(controller: Arc<Controller>, config: PollerConfig) -> Self {
        Self { controller, config }
    }

    /// Poll until a shutdown signal arrives; returns the number of completed polls
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        let logger = self.controller.logger().clone();
        logger.log_poller_started(self.config.interval.as_secs_f64());

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let failures = self.poll_once().await;
                    polls += 1;

                    debug!(
                        polls = polls,
                        failures = failures,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Poll cycle complete"
                    );
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }

        logger.log_poller_stopped(polls);
        polls
    }

    /// Refresh each configured kind once; returns how many failed
    async fn poll_once(&self) -> usize {
        let mut failures = 0;
        for kind in &self.config.kinds {
            if let RefreshOutcome::Failed(_) = self.controller.refresh(*kind).await {
                failures += 1;
            }
        }
        failures
    }

    /// Run on a background task
    pub fn spawn(self) -> PollerHandle {
        let (shutdown, rx) = broadcast::channel(1);
        let task = tokio::spawn(self.run(rx));
        PollerHandle { shutdown, task }
    }
}

/// Handle to a spawned poller
pub struct PollerHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<u64>,
}

impl PollerHandle {
    /// Signal the loop and wait for it to exit; returns the number of polls
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown.send(());
        self.task.await.unwrap_or_default()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Builder for creating a poller
pub struct PollerBuilder {
    controller: Option<Arc<Controller>>,
    config: PollerConfig,
}

impl PollerBuilder {
    pub fn new() -> Self {
        Self {
            controller: None,
            config: PollerConfig::default(),
        }
    }

    pub fn controller(mut self, controller: Arc<Controller>) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Replace the polled collections
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = CollectionKind>) -> Self {
        self.config.kinds = kinds.into_iter().collect();
        self
    }

    pub fn build(self) -> Result<StatusPoller> {
        let controller = self
            .controller
            .ok_or_else(|| anyhow::anyhow!("Controller is required"))?;
        if self.config.interval.is_zero() {
            anyhow::bail!("Poll interval must be greater than zero");
        }
        if self.config.kinds.is_empty() {
            anyhow::bail!("At least one collection must be polled");
        }

        Ok(StatusPoller::new(controller, self.config))
    }
}

impl Default for PollerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{AlwaysConfirm, ViewEvent};
    use crate::settings::ControllerConfig;
    use crate::test_support::MockApi;

    fn controller(api: Arc<MockApi>) -> Arc<Controller> {
        Arc::new(Controller::new(
            api,
            Arc::new(AlwaysConfirm),
            ControllerConfig::default(),
        ))
    }

    #[test]
    fn test_poller_config_default() {
        let config = PollerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.kinds, vec![CollectionKind::Status]);
    }

    #[tokio::test]
    async fn test_builder_requires_controller() {
        assert!(PollerBuilder::new().build().is_err());

        let api = Arc::new(MockApi::new());
        let result = PollerBuilder::new()
            .controller(controller(api.clone()))
            .interval(Duration::ZERO)
            .build();
        assert!(result.is_err());

        let result = PollerBuilder::new()
            .controller(controller(api))
            .kinds([])
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_poller_refreshes_until_stopped() {
        let api = Arc::new(MockApi::new());
        let controller = controller(api.clone());

        let handle = PollerBuilder::new()
            .controller(controller.clone())
            .interval(Duration::from_millis(20))
            .build()
            .unwrap()
            .spawn();

        tokio::time::sleep(Duration::from_millis(90)).await;
        let polls = handle.stop().await;
        assert!(polls >= 2, "expected at least two polls, got {}", polls);

        let calls = api.calls("status");
        assert_eq!(calls as u64, polls);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(api.calls("status"), calls);
        assert_eq!(
            controller.state(CollectionKind::Status).await,
            crate::cache::CollectionState::Ready
        );
    }

    #[tokio::test]
    async fn test_poll_failure_keeps_polling() {
        let api = Arc::new(MockApi::new());
        api.fail_reads("status", "backend down");
        let controller = controller(api.clone());

        let poller = StatusPoller::new(
            controller.clone(),
            PollerConfig {
                interval: Duration::from_millis(10),
                kinds: vec![CollectionKind::Status, CollectionKind::NpuStatus],
            },
        );
        assert_eq!(poller.poll_once().await, 1);
        assert_eq!(api.calls("npu_status"), 1);
        assert_eq!(
            controller.state(CollectionKind::Status).await,
            crate::cache::CollectionState::Empty
        );
    }

    #[tokio::test]
    async fn test_outage_is_surfaced_on_every_poll() {
        let api = Arc::new(MockApi::new());
        api.fail_reads("status", "backend down");
        let controller = controller(api.clone());
        let mut events = controller.subscribe();

        let handle = PollerBuilder::new()
            .controller(controller.clone())
            .interval(Duration::from_millis(10))
            .build()
            .unwrap()
            .spawn();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let polls = handle.stop().await;

        let mut failed = 0u64;
        while let Ok(event) = events.try_recv() {
            assert_eq!(event, ViewEvent::Failed(CollectionKind::Status));
            failed += 1;
        }
        assert!(polls >= 2, "expected at least two polls, got {}", polls);
        assert_eq!(failed, polls);
    }
}
