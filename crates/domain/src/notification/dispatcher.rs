//! Post-commit delivery of notification intents.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DomainError;

use super::NotificationIntent;

/// Destination for notification intents.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Persists the notification. Delivering an intent that already exists
    /// must succeed without creating a duplicate.
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), DomainError>;
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,

    /// Intents that were still failing after the last attempt, kept whole
    /// so they can be delivered again later.
    pub failed: Vec<NotificationIntent>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delivers intents with bounded retries and linear backoff.
///
/// Failures are logged and reported, never returned as errors: the writes
/// that produced the intents have already committed.
pub struct NotificationDispatcher<K> {
    sink: K,
    max_attempts: u32,
    backoff: Duration,
}

impl<K: NotificationSink> NotificationDispatcher<K> {
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }

    /// Sets the number of attempts per intent. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the base backoff; attempt `n` waits `n * backoff` before retrying.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    #[tracing::instrument(skip_all, fields(intents = intents.len()))]
    pub async fn dispatch(&self, intents: &[NotificationIntent]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for intent in intents {
            if self.deliver_with_retry(intent).await {
                report.delivered += 1;
                metrics::counter!("notifications_dispatched_total").increment(1);
            } else {
                tracing::warn!(
                    notification_id = %intent.notification_id,
                    audience = %intent.audience,
                    kind = %intent.kind,
                    intent = %serde_json::to_string(intent).unwrap_or_default(),
                    "notification abandoned after retries"
                );
                report.failed.push(intent.clone());
                metrics::counter!("notifications_dispatch_failed_total").increment(1);
            }
        }

        if !report.is_complete() {
            tracing::warn!(
                delivered = report.delivered,
                failed = report.failed.len(),
                "some notifications could not be delivered"
            );
        }

        report
    }

    async fn deliver_with_retry(&self, intent: &NotificationIntent) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.sink.deliver(intent).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        notification_id = %intent.notification_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "notification delivery failed"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationService;
    use common::AggregateId;
    use crate::order::VendorId;
    use event_store::{EventStoreError, InMemoryEventStore};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fails each intent a configured number of times before accepting it.
    #[derive(Default)]
    struct FlakySink {
        failures_left: Mutex<HashMap<AggregateId, u32>>,
        delivered: Mutex<Vec<AggregateId>>,
    }

    impl FlakySink {
        fn failing(intent: &NotificationIntent, times: u32) -> Self {
            let sink = Self::default();
            sink.failures_left
                .lock()
                .unwrap()
                .insert(intent.notification_id, times);
            sink
        }
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn deliver(&self, intent: &NotificationIntent) -> Result<(), DomainError> {
            let mut failures = self.failures_left.lock().unwrap();
            if let Some(left) = failures.get_mut(&intent.notification_id)
                && *left > 0
            {
                *left -= 1;
                return Err(DomainError::EventStore(EventStoreError::InvalidAppend(
                    "store unavailable".into(),
                )));
            }
            self.delivered.lock().unwrap().push(intent.notification_id);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let intent = NotificationIntent::admin_new_order(1);
        let dispatcher = NotificationDispatcher::new(FlakySink::failing(&intent, 2));

        let report = dispatcher.dispatch(std::slice::from_ref(&intent)).await;

        assert_eq!(report.delivered, 1);
        assert!(report.is_complete());
        assert_eq!(
            *dispatcher.sink().delivered.lock().unwrap(),
            vec![intent.notification_id]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_is_reported_not_raised() {
        let broken = NotificationIntent::vendor_new_order(VendorId::new(), 1);
        let fine = NotificationIntent::admin_new_order(1);
        let dispatcher =
            NotificationDispatcher::new(FlakySink::failing(&broken, 10)).with_max_attempts(3);

        let report = dispatcher.dispatch(&[broken.clone(), fine.clone()]).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec![broken.clone()]);
        assert!(!report.is_complete());
        assert_eq!(
            dispatcher.sink().failures_left.lock().unwrap()[&broken.notification_id],
            7
        );
    }

    #[tokio::test]
    async fn test_dispatch_into_notification_service() {
        let store = InMemoryEventStore::new();
        let dispatcher = NotificationDispatcher::new(NotificationService::new(store.clone()));
        let intents = vec![
            NotificationIntent::vendor_new_order(VendorId::new(), 2),
            NotificationIntent::admin_new_order(2),
        ];

        let first = dispatcher.dispatch(&intents).await;
        let replay = dispatcher.dispatch(&intents).await;

        assert_eq!(first.delivered, 2);
        assert_eq!(replay.delivered, 2);
        assert_eq!(store.event_count().await, 2);
    }
}
