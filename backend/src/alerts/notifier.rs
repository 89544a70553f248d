// =============================================================================
// Notifier sinks
// =============================================================================
//
// Alert delivery is best effort: a failing sink is logged and skipped, it
// never fails the refresh cycle.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::alerts::gate::AlertEvent;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, event: &AlertEvent) -> Result<()>;
}

/// Writes every event to the tracing log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        info!(topic = ?event.topic, direction = ?event.direction, "ALERT: {}", event.message);
        Ok(())
    }
}

/// POSTs each event as JSON to a fixed URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .with_context(|| format!("webhook POST to {} failed", self.url))?
            .error_for_status()
            .context("webhook rejected alert")?;
        Ok(())
    }
}

/// Delivers every event to every registered sink.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Returns the number of successful deliveries.
    pub async fn deliver(&self, events: &[AlertEvent]) -> usize {
        let mut delivered = 0;
        for event in events {
            for sink in &self.sinks {
                match sink.notify(event).await {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!(sink = sink.name(), error = %e, "alert delivery failed"),
                }
            }
        }
        delivered
    }
}

/// Test sink that keeps everything it receives.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: parking_lot::Mutex<Vec<AlertEvent>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::gate::AlertTopic;
    use chrono::Utc;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn notify(&self, _event: &AlertEvent) -> Result<()> {
            anyhow::bail!("sink offline")
        }
    }

    fn event() -> AlertEvent {
        AlertEvent {
            topic: AlertTopic::Heat,
            direction: None,
            previous: "0".into(),
            current: "1".into(),
            message: "heat level rose".into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fanout_skips_failing_sinks() {
        let recorder = Arc::new(RecordingNotifier::default());
        let fanout = FanoutNotifier::default()
            .with(Arc::new(FailingNotifier))
            .with(Arc::new(LogNotifier))
            .with(recorder.clone());

        let delivered = fanout.deliver(&[event(), event()]).await;
        assert_eq!(delivered, 4);
        assert_eq!(recorder.count(), 2);
        assert_eq!(fanout.sink_names(), vec!["failing", "log", "recording"]);
    }

    #[tokio::test]
    async fn webhook_to_unreachable_host_errors() {
        let hook = WebhookNotifier::new("http://127.0.0.1:9/alerts", Duration::from_millis(200)).unwrap();
        assert!(hook.notify(&event()).await.is_err());
    }
}
