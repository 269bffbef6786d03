//! Batch relay loop
//!
//! One relay owns its cursors and buffers outright; the only suspension
//! points are the bounded log read and the bounded batch insert, so nothing
//! inside needs a lock.
//!
//! Each iteration reads every topic past its cursor, advances the cursor per
//! record, decodes into the topic's buffer and then decides per topic whether
//! to flush: the buffer reached `size_threshold`, or the shared timer has run
//! for `time_threshold` and the buffer is non-empty. The timer is restarted
//! whenever it is found elapsed, flush or not.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tickrelay_middleware::{ColumnarSink, LogRecord, SinkError, TopicLog};
use tickrelay_schema::{BboRow, TradeRow};

use crate::buffer::{RowBuffer, TopicBuffer};
use crate::config::RelayConfig;
use crate::cursor::Cursors;
use crate::error::RelayError;
use crate::metrics::RelayMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Polling,
    Flushing,
    /// Terminal: entered once on shutdown
    Draining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Size,
    Time,
    Drain,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Time => "time",
            FlushTrigger::Drain => "drain",
        }
    }
}

/// What a single polling iteration did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub records_read: usize,
    pub rows_buffered: usize,
    pub decode_failures: usize,
    pub rows_flushed: usize,
    pub read_failed: bool,
}

/// Totals over the relay's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub records_read: u64,
    pub rows_flushed: u64,
    pub flushes: u64,
    pub flush_failures: u64,
    pub decode_failures: u64,
    pub read_failures: u64,
}

/// Liveness shared with the health server
#[derive(Debug, Default)]
pub struct RelayHealth {
    last_read_epoch_secs: AtomicU64,
    draining: AtomicBool,
}

impl RelayHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_read(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.last_read_epoch_secs.store(now, Ordering::SeqCst);
    }

    /// Unix seconds of the last successful read, 0 if none
    pub fn last_read_epoch_secs(&self) -> u64 {
        self.last_read_epoch_secs.load(Ordering::SeqCst)
    }

    pub fn set_draining(&self) {
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}

pub struct Relay {
    log: Arc<dyn TopicLog>,
    sink: Arc<dyn ColumnarSink>,
    config: RelayConfig,
    buffers: Vec<Box<dyn TopicBuffer>>,
    cursors: Cursors,
    state: RelayState,
    timer_started: Instant,
    stats: RelayStats,
    metrics: RelayMetrics,
    health: Arc<RelayHealth>,
}

impl Relay {
    /// Relay for the `bbo` and `trades` topics
    pub fn new(log: Arc<dyn TopicLog>, sink: Arc<dyn ColumnarSink>, config: RelayConfig) -> Self {
        Self::with_buffers(
            log,
            sink,
            config,
            vec![RowBuffer::<BboRow>::boxed(), RowBuffer::<TradeRow>::boxed()],
        )
    }

    /// Relay over an arbitrary set of topics, one buffer each
    pub fn with_buffers(
        log: Arc<dyn TopicLog>,
        sink: Arc<dyn ColumnarSink>,
        config: RelayConfig,
        buffers: Vec<Box<dyn TopicBuffer>>,
    ) -> Self {
        let cursors = Cursors::at_tail(buffers.iter().map(|b| b.topic()));
        Self {
            log,
            sink,
            config,
            buffers,
            cursors,
            state: RelayState::Polling,
            timer_started: Instant::now(),
            stats: RelayStats::default(),
            metrics: RelayMetrics::new(),
            health: Arc::new(RelayHealth::new()),
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn cursors(&self) -> &Cursors {
        &self.cursors
    }

    pub fn health(&self) -> Arc<RelayHealth> {
        Arc::clone(&self.health)
    }

    /// Rows buffered for `topic`, 0 for an unknown topic
    pub fn buffered(&self, topic: &str) -> usize {
        self.buffers
            .iter()
            .find(|b| b.topic() == topic)
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Poll until `shutdown` is cancelled, then drain.
    ///
    /// Cancellation is checked at the top of each iteration, so a read in
    /// flight completes first.
    pub async fn run(&mut self, shutdown: CancellationToken) -> RelayStats {
        info!(
            topics = ?self.cursors.topics().collect::<Vec<_>>(),
            size_threshold = self.config.size_threshold,
            time_threshold_ms = self.config.time_threshold.as_millis() as u64,
            poll_wait_ms = self.config.poll_wait.as_millis() as u64,
            "Relay running"
        );

        while !shutdown.is_cancelled() {
            self.poll_once().await;
        }

        info!("Shutdown requested, draining buffers");
        let rows = self.drain().await;
        info!(rows_drained = rows, stats = ?self.stats, "Relay stopped");
        self.stats
    }

    /// One polling iteration: read, buffer, flush decision.
    ///
    /// A no-op once the relay is draining.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        if self.state == RelayState::Draining {
            return outcome;
        }
        self.state = RelayState::Polling;

        match self.read().await {
            Ok(records) => {
                self.health.mark_read();
                outcome.records_read = records.len();
                self.ingest(records, &mut outcome);
            }
            Err(e) => {
                warn!(error = %e, "Read from topic log failed");
                self.metrics.record_read_failure();
                self.stats.read_failures += 1;
                outcome.read_failed = true;
                // failed reads return immediately; wait out the poll interval
                tokio::time::sleep(self.config.poll_wait).await;
            }
        }

        let timer_elapsed = self.timer_started.elapsed() >= self.config.time_threshold;
        if timer_elapsed {
            self.timer_started = Instant::now();
        }

        for idx in 0..self.buffers.len() {
            let len = self.buffers[idx].len();
            let trigger = if len >= self.config.size_threshold {
                FlushTrigger::Size
            } else if timer_elapsed && len > 0 {
                FlushTrigger::Time
            } else {
                continue;
            };
            self.state = RelayState::Flushing;
            outcome.rows_flushed += self.flush_topic(idx, trigger).await;
        }

        self.state = RelayState::Polling;
        self.update_buffered_gauge();
        outcome
    }

    /// Flush every non-empty buffer once, ignoring thresholds, and stop.
    ///
    /// Returns rows committed. Only the first call does anything.
    pub async fn drain(&mut self) -> usize {
        if self.state == RelayState::Draining {
            return 0;
        }
        self.state = RelayState::Draining;
        self.health.set_draining();

        let mut rows = 0;
        for idx in 0..self.buffers.len() {
            if !self.buffers[idx].is_empty() {
                rows += self.flush_topic(idx, FlushTrigger::Drain).await;
            }
        }

        for buffer in &self.buffers {
            if !buffer.is_empty() {
                error!(
                    topic = %buffer.topic(),
                    rows = buffer.len(),
                    "Rows left unflushed at shutdown"
                );
            }
        }
        self.update_buffered_gauge();
        rows
    }

    async fn read(&mut self) -> Result<Vec<LogRecord>, RelayError> {
        for topic in self.cursors.unresolved() {
            let tail = self.log.tail(&topic).await?;
            debug!(topic = %topic, tail = %tail, "Resolved tail cursor");
            self.cursors.resolve(&topic, tail);
        }

        let positions = self.cursors.positions().unwrap_or_default();
        Ok(self.log.read(&positions, self.config.poll_wait).await?)
    }

    fn ingest(&mut self, records: Vec<LogRecord>, outcome: &mut PollOutcome) {
        for record in records {
            // cursor moves at read time, before the row is flushed
            if !self.cursors.advance(&record.topic, record.id) {
                warn!(topic = %record.topic, id = %record.id, "Ignoring record outside cursor range");
                continue;
            }
            self.stats.records_read += 1;
            self.metrics.record_read(&record.topic);

            let Some(buffer) = self.buffers.iter_mut().find(|b| b.topic() == record.topic) else {
                continue;
            };
            let pushed = match &record.malformed {
                Some(reason) => Err(reason.clone()),
                None => buffer
                    .push_record(&record.id, &record.fields)
                    .map_err(|e| e.to_string()),
            };
            match pushed {
                Ok(()) => outcome.rows_buffered += 1,
                Err(e) => {
                    warn!(
                        topic = %record.topic,
                        id = %record.id,
                        error = %e,
                        "Skipping malformed record"
                    );
                    self.stats.decode_failures += 1;
                    self.metrics.record_decode_failure(&record.topic);
                    outcome.decode_failures += 1;
                }
            }
        }
    }

    async fn flush_topic(&mut self, idx: usize, trigger: FlushTrigger) -> usize {
        let topic = self.buffers[idx].topic();
        let table = self.buffers[idx].table();

        match self.flush_buffer(idx).await {
            Ok(rows) => {
                info!(
                    topic = %topic,
                    table = %table,
                    rows,
                    trigger = trigger.as_str(),
                    "Flushed batch"
                );
                self.stats.flushes += 1;
                self.stats.rows_flushed += rows as u64;
                self.metrics.record_flushed(topic, rows);
                rows
            }
            Err(e) => {
                error!(
                    topic = %topic,
                    table = %table,
                    rows = self.buffers[idx].len(),
                    trigger = trigger.as_str(),
                    error = %e,
                    "Flush failed, keeping buffer"
                );
                self.stats.flush_failures += 1;
                self.metrics.record_flush_failure(topic);
                0
            }
        }
    }

    /// One insert of the whole buffer. Cleared only on success.
    async fn flush_buffer(&mut self, idx: usize) -> Result<usize, RelayError> {
        let buffer = &mut self.buffers[idx];
        if buffer.is_empty() {
            return Ok(0);
        }

        let block = buffer.to_block();
        let rows = block.row_count();
        match tokio::time::timeout(self.config.insert_timeout, self.sink.insert_batch(&block)).await
        {
            Ok(Ok(())) => {
                buffer.clear();
                Ok(rows)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(SinkError::Timeout(self.config.insert_timeout).into()),
        }
    }

    fn update_buffered_gauge(&self) {
        for buffer in &self.buffers {
            self.metrics.set_buffered(buffer.topic(), buffer.len());
        }
    }
}
