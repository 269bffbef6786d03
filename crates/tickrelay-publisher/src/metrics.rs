//! Prometheus metrics for the publisher

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

const LABEL_TOPIC: &str = "topic";

/// Events appended to the log per topic
static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickrelay_publisher_events_total",
        "Total events appended to the topic log",
        &[LABEL_TOPIC]
    )
    .expect("Failed to register events_total metric")
});

/// Failed appends per topic
static FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickrelay_publisher_failures_total",
        "Total failed appends to the topic log",
        &[LABEL_TOPIC]
    )
    .expect("Failed to register failures_total metric")
});

/// Feed messages that could not be turned into events
static INVALID_MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickrelay_publisher_invalid_messages_total",
        "Total feed messages dropped as invalid",
        &["channel"]
    )
    .expect("Failed to register invalid_messages_total metric")
});

#[derive(Clone, Default)]
pub struct PublisherMetrics;

impl PublisherMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_published(&self, topic: &str) {
        EVENTS_TOTAL.with_label_values(&[topic]).inc();
    }

    pub fn record_failure(&self, topic: &str) {
        FAILURES_TOTAL.with_label_values(&[topic]).inc();
    }

    pub fn record_invalid(&self, channel: &str) {
        INVALID_MESSAGES_TOTAL.with_label_values(&[channel]).inc();
    }
}

/// Encode all registered metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
