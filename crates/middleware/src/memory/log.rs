use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Notify, RwLock};

use tickrelay_schema::{FieldMap, RecordId};

use crate::error::LogError;
use crate::log::{LogRecord, TopicLog};

/// Topic log held in process memory.
///
/// Ids follow the Redis Streams scheme (`<millis>-<seq>`), reads block on a
/// [`Notify`] until something is appended or the wait elapses.
pub struct InMemoryTopicLog {
    topics: RwLock<HashMap<String, Vec<LogRecord>>>,
    appended: Notify,
    unavailable: AtomicBool,
}

impl InMemoryTopicLog {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            appended: Notify::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every call fail as if the log were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of all records in `topic`
    pub async fn records(&self, topic: &str) -> Vec<LogRecord> {
        let topics = self.topics.read().await;
        topics.get(topic).cloned().unwrap_or_default()
    }

    pub async fn len(&self, topic: &str) -> usize {
        let topics = self.topics.read().await;
        topics.get(topic).map(Vec::len).unwrap_or(0)
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), LogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(LogError::ConnectionFailed("log unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    async fn collect_after(&self, cursors: &[(String, RecordId)]) -> Vec<LogRecord> {
        let topics = self.topics.read().await;
        let mut out = Vec::new();
        for (topic, after) in cursors {
            if let Some(entries) = topics.get(topic) {
                // ids are sorted; skip everything at or before the cursor
                let start = entries.partition_point(|r| r.id <= *after);
                out.extend(entries[start..].iter().cloned());
            }
        }
        out
    }
}

impl Default for InMemoryTopicLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopicLog for InMemoryTopicLog {
    async fn append(&self, topic: &str, fields: &FieldMap) -> Result<RecordId, LogError> {
        self.check_available()?;
        let id = {
            let mut topics = self.topics.write().await;
            let entries = topics.entry(topic.to_string()).or_default();
            let last = entries.last().map(|r| r.id).unwrap_or(RecordId::ZERO);
            let id = last.successor_at(Self::now_millis());
            entries.push(LogRecord::new(topic, id, fields.clone()));
            id
        };
        self.appended.notify_waiters();
        Ok(id)
    }

    async fn read(
        &self,
        cursors: &[(String, RecordId)],
        wait: Duration,
    ) -> Result<Vec<LogRecord>, LogError> {
        self.check_available()?;
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            // Register interest before looking so an append in between is not missed
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let records = self.collect_after(cursors).await;
            if !records.is_empty() {
                return Ok(records);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn tail(&self, topic: &str) -> Result<RecordId, LogError> {
        self.check_available()?;
        let topics = self.topics.read().await;
        Ok(topics
            .get(topic)
            .and_then(|entries| entries.last().map(|r| r.id))
            .unwrap_or(RecordId::ZERO))
    }
}
