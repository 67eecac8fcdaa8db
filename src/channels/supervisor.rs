//! Supervised channel start-up
//!
//! A channel that fails to connect is retried with exponential backoff
//! instead of taking the process down.

use super::adapter::{ChannelAdapter, ChannelEvent};
use crate::config::SupervisorConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Retry policy for adapter start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Delay to wait after `current`
    pub fn next(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

impl From<&SupervisorConfig> for Backoff {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_backoff_ms),
            max: Duration::from_millis(config.max_backoff_ms.max(config.initial_backoff_ms)),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from(&SupervisorConfig::default())
    }
}

/// Start `adapter` in the background, retrying until it connects
pub fn spawn_supervised(
    adapter: Arc<dyn ChannelAdapter>,
    event_tx: mpsc::Sender<ChannelEvent>,
    backoff: Backoff,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut delay = backoff.initial;
        let mut attempt = 1u32;
        loop {
            match adapter.start(event_tx.clone()).await {
                Ok(()) => {
                    tracing::info!(
                        channel = adapter.name(),
                        attempt,
                        "Channel started"
                    );
                    return;
                }
                Err(e) => {
                    tracing::error!(
                        channel = adapter.name(),
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed to start channel: {}",
                        e
                    );
                    let _ = event_tx
                        .send(ChannelEvent::Error {
                            channel: adapter.name().to_string(),
                            error: e.to_string(),
                        })
                        .await;
                    tokio::time::sleep(delay).await;
                    delay = backoff.next(delay);
                    attempt += 1;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::testing::RecordingAdapter;

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let backoff = Backoff {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(60),
        };
        assert_eq!(backoff.next(Duration::from_secs(2)), Duration::from_secs(4));
        assert_eq!(backoff.next(Duration::from_secs(32)), Duration::from_secs(60));
        assert_eq!(backoff.next(Duration::from_secs(60)), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_from_config() {
        let backoff = Backoff::default();
        assert_eq!(backoff.initial, Duration::from_secs(2));
        assert_eq!(backoff.max, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_retries_until_started() {
        let adapter = Arc::new(RecordingAdapter::new("telegram"));
        adapter.fail_starts(2);
        let (tx, mut rx) = mpsc::channel(10);

        let handle = spawn_supervised(
            adapter.clone(),
            tx,
            Backoff {
                initial: Duration::from_millis(1),
                max: Duration::from_millis(4),
            },
        );
        handle.await.unwrap();

        assert!(adapter.is_connected());
        let mut errors = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ChannelEvent::Error { .. }) {
                errors += 1;
            }
        }
        assert_eq!(errors, 2);
    }
}
