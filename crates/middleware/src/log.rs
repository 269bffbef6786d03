use async_trait::async_trait;
use std::time::Duration;

use tickrelay_schema::{FieldMap, RecordId};

use crate::error::LogError;

/// A record read back from a topic log
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub topic: String,
    pub id: RecordId,
    pub fields: FieldMap,
    /// Set when the stored entry could not be turned into text fields;
    /// `fields` is empty then. The id is still valid for advancing past it.
    pub malformed: Option<String>,
}

impl LogRecord {
    pub fn new(topic: impl Into<String>, id: RecordId, fields: FieldMap) -> Self {
        Self {
            topic: topic.into(),
            id,
            fields,
            malformed: None,
        }
    }

    pub fn malformed(topic: impl Into<String>, id: RecordId, reason: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            id,
            fields: FieldMap::new(),
            malformed: Some(reason.into()),
        }
    }
}

/// Append-only, per-topic ordered log with server-assigned record ids.
///
/// Implementations must allow concurrent `append` calls; order is only
/// guaranteed within a single topic.
#[async_trait]
pub trait TopicLog: Send + Sync {
    /// Append a record and return the id the log assigned to it
    async fn append(&self, topic: &str, fields: &FieldMap) -> Result<RecordId, LogError>;

    /// Read every record strictly after each topic's cursor.
    ///
    /// Blocks up to `wait` when nothing is available yet; an empty result
    /// means the wait elapsed. Records of one topic are returned in log order.
    async fn read(
        &self,
        cursors: &[(String, RecordId)],
        wait: Duration,
    ) -> Result<Vec<LogRecord>, LogError>;

    /// Id of the newest record in `topic`, or [`RecordId::ZERO`] if it is empty
    async fn tail(&self, topic: &str) -> Result<RecordId, LogError>;
}
