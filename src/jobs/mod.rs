//! Scheduled Jobs
//!
//! Background workers for the consistency pipeline. The only periodic job is
//! the outbox publisher tick; it runs on a plain ticker with a shutdown
//! signal rather than a cron framework.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::outbox::OutboxPublisher;

/// Configuration for the pipeline scheduler
#[derive(Debug, Clone)]
pub struct PipelineSchedulerConfig {
    /// Interval between outbox publisher ticks (default: 1 second)
    pub publish_interval: Duration,
}

impl Default for PipelineSchedulerConfig {
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_secs(1),
        }
    }
}

/// Pipeline Scheduler - drives the outbox publisher
pub struct PipelineScheduler {
    publisher: Arc<OutboxPublisher>,
    config: PipelineSchedulerConfig,
}

impl PipelineScheduler {
    pub fn new(publisher: Arc<OutboxPublisher>) -> Self {
        Self {
            publisher,
            config: PipelineSchedulerConfig::default(),
        }
    }

    pub fn with_config(publisher: Arc<OutboxPublisher>, config: PipelineSchedulerConfig) -> Self {
        Self { publisher, config }
    }

    /// Start the scheduler in the background.
    ///
    /// The returned handle completes once the shutdown signal fires and the
    /// in-flight tick (if any) has finished.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Pipeline scheduler started");

        let mut publish_interval = tokio::time::interval(self.config.publish_interval);
        publish_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = publish_interval.tick() => {
                    if let Err(e) = self.publisher.tick().await {
                        tracing::error!(error = %e, "Outbox publish tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Pipeline scheduler stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = PipelineSchedulerConfig::default();
        assert_eq!(config.publish_interval, Duration::from_secs(1));
    }
}
