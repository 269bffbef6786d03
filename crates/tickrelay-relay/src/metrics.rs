//! Prometheus metrics for the relay
//!
//! Per-topic counters for the read, decode and flush stages plus a gauge of
//! rows currently buffered.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge_vec, Encoder, IntCounter,
    IntCounterVec, IntGaugeVec, TextEncoder,
};

const LABEL_TOPIC: &str = "topic";

/// Records returned by the log per topic
static RECORDS_READ_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickrelay_relay_records_read_total",
        "Total records read from the topic log",
        &[LABEL_TOPIC]
    )
    .expect("Failed to register records_read_total metric")
});

/// Rows committed to the sink per topic
static ROWS_FLUSHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickrelay_relay_rows_flushed_total",
        "Total rows committed to the columnar sink",
        &[LABEL_TOPIC]
    )
    .expect("Failed to register rows_flushed_total metric")
});

/// Failed or timed out batch inserts per topic
static FLUSH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickrelay_relay_flush_failures_total",
        "Total failed batch inserts",
        &[LABEL_TOPIC]
    )
    .expect("Failed to register flush_failures_total metric")
});

/// Records skipped because they could not be decoded
static DECODE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickrelay_relay_decode_failures_total",
        "Total records skipped as malformed",
        &[LABEL_TOPIC]
    )
    .expect("Failed to register decode_failures_total metric")
});

/// Failed reads from the log
static READ_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tickrelay_relay_read_failures_total",
        "Total failed reads from the topic log"
    )
    .expect("Failed to register read_failures_total metric")
});

/// Rows waiting in each buffer
static BUFFERED_ROWS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "tickrelay_relay_buffered_rows",
        "Rows currently buffered awaiting flush",
        &[LABEL_TOPIC]
    )
    .expect("Failed to register buffered_rows metric")
});

#[derive(Clone, Default)]
pub struct RelayMetrics;

impl RelayMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_read(&self, topic: &str) {
        RECORDS_READ_TOTAL.with_label_values(&[topic]).inc();
    }

    pub fn record_flushed(&self, topic: &str, rows: usize) {
        ROWS_FLUSHED_TOTAL
            .with_label_values(&[topic])
            .inc_by(rows as u64);
    }

    pub fn record_flush_failure(&self, topic: &str) {
        FLUSH_FAILURES_TOTAL.with_label_values(&[topic]).inc();
    }

    pub fn record_decode_failure(&self, topic: &str) {
        DECODE_FAILURES_TOTAL.with_label_values(&[topic]).inc();
    }

    pub fn record_read_failure(&self) {
        READ_FAILURES_TOTAL.inc();
    }

    pub fn set_buffered(&self, topic: &str, rows: usize) {
        BUFFERED_ROWS.with_label_values(&[topic]).set(rows as i64);
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
