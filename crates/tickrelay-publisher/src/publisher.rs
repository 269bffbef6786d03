//! Publisher appending feed events to the topic log

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

use tickrelay_middleware::{LogError, TopicLog};
use tickrelay_schema::{BboUpdate, PublicTrade, RecordCodec, RecordId};

use crate::feed::FeedHandler;
use crate::metrics::PublisherMetrics;

/// Appends each event to its topic with a log-assigned id.
///
/// Calls are independent: nothing is buffered, batched or retried, and a
/// transport failure is returned to the caller as is.
pub struct EventPublisher {
    log: Arc<dyn TopicLog>,
    metrics: PublisherMetrics,
    connected: Arc<AtomicBool>,
}

impl EventPublisher {
    pub fn new(log: Arc<dyn TopicLog>) -> Self {
        Self {
            log,
            metrics: PublisherMetrics::new(),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Feed connectivity as last reported by the feed, for the health endpoint
    pub fn connected_handle(&self) -> Arc<AtomicBool> {
        self.connected.clone()
    }

    async fn publish<E: RecordCodec>(&self, event: &E) -> Result<RecordId, LogError> {
        let fields = event.encode();
        match self.log.append(E::TOPIC, &fields).await {
            Ok(id) => {
                self.metrics.record_published(E::TOPIC);
                trace!(topic = E::TOPIC, id = %id, "Published");
                Ok(id)
            }
            Err(e) => {
                self.metrics.record_failure(E::TOPIC);
                Err(e)
            }
        }
    }

    pub async fn publish_bbo(&self, update: &BboUpdate) -> Result<RecordId, LogError> {
        self.publish(update).await
    }

    pub async fn publish_trade(&self, trade: &PublicTrade) -> Result<RecordId, LogError> {
        self.publish(trade).await
    }
}

#[async_trait]
impl FeedHandler for EventPublisher {
    async fn on_bbo(&self, update: &BboUpdate) -> Result<(), LogError> {
        self.publish_bbo(update).await.map(|_| ())
    }

    async fn on_public_trade(&self, trade: &PublicTrade) -> Result<(), LogError> {
        self.publish_trade(trade).await.map(|_| ())
    }

    fn on_error(&self, message: &str) {
        error!(error = %message, "Feed error");
    }

    fn on_connection_change(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        if connected {
            info!("Feed connected");
        } else {
            warn!("Feed disconnected");
        }
    }
}
