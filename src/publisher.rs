//! Domain event fan-out
//!
//! Events are fire-and-forget: a failed publish is logged and never fails
//! the request that produced it.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}

/// Publishes JSON payloads to `<prefix>.<event subject>` on NATS.
#[derive(Clone, Debug)]
pub struct NatsPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self { client, prefix: prefix.into() }
    }

    pub fn subject_for(&self, event: &DomainEvent) -> String {
        format!("{}.{}", self.prefix, event.subject())
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: DomainEvent) {
        let subject = self.subject_for(&event);
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%subject, %error, "failed to encode event");
                return;
            }
        };

        match self.client.publish(subject.clone(), payload.into()).await {
            Ok(()) => debug!(%subject, "event published"),
            Err(error) => warn!(%subject, %error, "failed to publish event"),
        }
    }
}

/// Used when no broker is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: DomainEvent) {
        debug!(subject = event.subject(), "event dropped, no broker configured");
    }
}
