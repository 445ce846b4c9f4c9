//! Reconnect supervisor
//!
//! Wraps a [`StreamIngestor`] in a reconnect loop with capped exponential
//! backoff. The same consumer (and therefore the same aggregator state) is
//! kept across sessions. Without a policy the supervisor runs exactly one
//! session, matching the ingestor's own no-retry behaviour.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::aggregator::SubBlockConsumer;
use crate::ingestion::{SessionEnd, StreamIngestor};
use crate::metrics::FeedMetrics;

/// Largest exponent applied to the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Capped exponential backoff between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Retries allowed in a row; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (zero-based): `base * 2^attempt`,
    /// capped at `max`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Whether retry number `attempt` (zero-based) may still be made.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Runs ingestor sessions until shutdown or until the policy gives up.
pub struct FeedSupervisor<C: SubBlockConsumer> {
    ingestor: StreamIngestor<C>,
    policy: Option<BackoffPolicy>,
    metrics: Arc<FeedMetrics>,
}

impl<C: SubBlockConsumer> FeedSupervisor<C> {
    pub fn new(
        ingestor: StreamIngestor<C>,
        policy: Option<BackoffPolicy>,
        metrics: Arc<FeedMetrics>,
    ) -> Self {
        Self {
            ingestor,
            policy,
            metrics,
        }
    }

    pub fn ingestor(&self) -> &StreamIngestor<C> {
        &self.ingestor
    }

    /// Drive sessions until done, then hand back the consumer.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> C {
        // Consecutive unproductive sessions; reset once a session delivers
        // a sub-block, so a feed that accepts and hangs up still backs off.
        let mut attempt: u32 = 0;

        loop {
            let delivered_before = self.ingestor.events_delivered();
            match self.ingestor.run(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::RemoteClosed) => {
                    info!(url = %self.ingestor.url(), "Flashblock feed session ended by remote");
                }
                Ok(SessionEnd::Errored(e)) => {
                    warn!(error = %e, "Flashblock feed session failed");
                }
                Err(e) if self.ingestor.state().is_terminal() => {
                    warn!(error = %e, "Could not open flashblock feed session");
                }
                Err(e) => {
                    error!(error = %e, "Ingestor in unexpected state; stopping feed");
                    break;
                }
            }

            let Some(policy) = self.policy else {
                info!("Reconnect disabled; flashblock feed stopped");
                break;
            };

            if self.ingestor.events_delivered() > delivered_before {
                attempt = 0;
            }
            if !policy.allows(attempt) {
                warn!(attempts = attempt, "Giving up on flashblock feed");
                break;
            }

            let delay = policy.delay_for(attempt);
            attempt += 1;
            self.metrics.record_reconnect_attempt();
            info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to flashblock feed"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // Err means the sender is gone, which also ends the feed
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        info!(
            sessions = self.ingestor.sessions_started(),
            events = self.ingestor.events_delivered(),
            "Flashblock feed supervisor stopped"
        );
        self.ingestor.into_consumer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::block::SubBlockEvent;

    #[derive(Debug, Default)]
    struct Counter(u64);

    impl SubBlockConsumer for Counter {
        fn on_sub_block(&mut self, _event: SubBlockEvent) {
            self.0 += 1;
        }
    }

    fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{addr}/ws")
    }

    #[test]
    fn test_delay_doubles_until_cap() {
        let policy = BackoffPolicy {
            base: Duration::from_millis(100),
            max: Duration::from_millis(1000),
            max_attempts: None,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_attempt_limit() {
        let unlimited = BackoffPolicy::default();
        assert!(unlimited.allows(1_000_000));

        let limited = BackoffPolicy {
            max_attempts: Some(2),
            ..BackoffPolicy::default()
        };
        assert!(limited.allows(0));
        assert!(limited.allows(1));
        assert!(!limited.allows(2));
    }

    #[tokio::test]
    async fn test_single_session_without_policy() {
        let metrics = Arc::new(FeedMetrics::new());
        let ingestor = StreamIngestor::new(unreachable_url(), Counter::default(), metrics.clone());
        let supervisor = FeedSupervisor::new(ingestor, None, metrics.clone());

        let (_tx, rx) = watch::channel(false);
        let consumer = supervisor.run(rx).await;

        assert_eq!(consumer.0, 0);
        assert_eq!(metrics.export()["connection_errors"], 1);
        assert_eq!(metrics.export()["reconnect_attempts"], 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let metrics = Arc::new(FeedMetrics::new());
        let ingestor = StreamIngestor::new(unreachable_url(), Counter::default(), metrics.clone());
        let policy = BackoffPolicy {
            base: Duration::from_millis(1),
            max: Duration::from_millis(5),
            max_attempts: Some(2),
        };
        let supervisor = FeedSupervisor::new(ingestor, Some(policy), metrics.clone());

        let (_tx, rx) = watch::channel(false);
        supervisor.run(rx).await;

        assert_eq!(metrics.export()["reconnect_attempts"], 2);
        assert_eq!(metrics.export()["connection_errors"], 3);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_backoff() {
        let metrics = Arc::new(FeedMetrics::new());
        let ingestor = StreamIngestor::new(unreachable_url(), Counter::default(), metrics.clone());
        let policy = BackoffPolicy {
            base: Duration::from_secs(60),
            max: Duration::from_secs(60),
            max_attempts: None,
        };
        let supervisor = FeedSupervisor::new(ingestor, Some(policy), metrics.clone());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(supervisor.run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(finished.is_ok());
        assert_eq!(metrics.export()["reconnect_attempts"], 1);
    }
}
