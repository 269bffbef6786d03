use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamRangeReply, StreamReadReply};
use redis::{AsyncConnectionConfig, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use tickrelay_schema::{FieldMap, RecordId};

use crate::error::LogError;
use crate::log::{LogRecord, TopicLog};

/// Slack on top of the XREAD block time before the client gives up on a reply
const READ_RESPONSE_MARGIN: Duration = Duration::from_secs(2);

/// Longest XREAD block the read connection is configured for
const MAX_READ_BLOCK: Duration = Duration::from_secs(30);

pub struct RedisTopicLog {
    /// Shared by concurrent appends
    write_conn: MultiplexedConnection,
    /// Dedicated to blocking reads so they never stall appends
    read_conn: MultiplexedConnection,
}

impl RedisTopicLog {
    pub async fn connect(redis_url: &str) -> Result<Self, LogError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| LogError::ConnectionFailed(e.to_string()))?;

        let mut write_conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| LogError::ConnectionFailed(e.to_string()))?;

        let read_config = AsyncConnectionConfig::new()
            .set_response_timeout(Some(MAX_READ_BLOCK + READ_RESPONSE_MARGIN));
        let read_conn = client
            .get_multiplexed_async_connection_with_config(&read_config)
            .await
            .map_err(|e| LogError::ConnectionFailed(e.to_string()))?;

        // Test connection
        let _: String = redis::cmd("PING")
            .query_async(&mut write_conn)
            .await
            .map_err(|e| LogError::ConnectionFailed(e.to_string()))?;

        info!("Connected to Redis");
        Ok(Self {
            write_conn,
            read_conn,
        })
    }
}

fn parse_id(raw: &str) -> Result<RecordId, LogError> {
    raw.parse()
        .map_err(|e: tickrelay_schema::DecodeError| LogError::InvalidRecord(e.to_string()))
}

/// Only nil is treated as an absent field; any other value that is not
/// text fails the whole record.
fn to_fields(id: &str, map: &HashMap<String, Value>) -> Result<FieldMap, LogError> {
    let mut fields = FieldMap::new();
    for (key, value) in map {
        let text = match value {
            Value::Nil => continue,
            Value::BulkString(bytes) => String::from_utf8(bytes.clone()).map_err(|_| {
                LogError::InvalidRecord(format!("{}: field {} is not utf-8", id, key))
            })?,
            Value::SimpleString(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            other => {
                return Err(LogError::InvalidRecord(format!(
                    "{}: field {} has unexpected value {:?}",
                    id, key, other
                )))
            }
        };
        fields.insert(key.clone(), text);
    }
    Ok(fields)
}

/// A bad id fails the read; bad field values only mark the record malformed
fn to_record(topic: &str, entry: &StreamId) -> Result<LogRecord, LogError> {
    let id = parse_id(&entry.id)?;
    match to_fields(&entry.id, &entry.map) {
        Ok(fields) => Ok(LogRecord::new(topic, id, fields)),
        Err(e) => {
            warn!(topic, id = %id, error = %e, "Malformed stream entry");
            Ok(LogRecord::malformed(topic, id, e.to_string()))
        }
    }
}

#[async_trait]
impl TopicLog for RedisTopicLog {
    async fn append(&self, topic: &str, fields: &FieldMap) -> Result<RecordId, LogError> {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(topic).arg("*");
        for (key, value) in fields {
            cmd.arg(key).arg(value);
        }

        let mut conn = self.write_conn.clone();
        let raw: String = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| LogError::AppendFailed(e.to_string()))?;

        trace!(topic, id = %raw, "XADD");
        parse_id(&raw)
    }

    async fn read(
        &self,
        cursors: &[(String, RecordId)],
        wait: Duration,
    ) -> Result<Vec<LogRecord>, LogError> {
        if cursors.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XREAD");
        // BLOCK 0 would wait forever; a zero wait is a plain poll
        if !wait.is_zero() {
            cmd.arg("BLOCK").arg(wait.min(MAX_READ_BLOCK).as_millis() as u64);
        }
        cmd.arg("STREAMS");
        for (topic, _) in cursors {
            cmd.arg(topic);
        }
        for (_, after) in cursors {
            cmd.arg(after.to_string());
        }

        let mut conn = self.read_conn.clone();
        let reply: Option<StreamReadReply> = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| LogError::ReadFailed(e.to_string()))?;

        let Some(reply) = reply else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for stream in &reply.keys {
            for entry in &stream.ids {
                records.push(to_record(&stream.key, entry)?);
            }
        }
        debug!(count = records.len(), "XREAD");
        Ok(records)
    }

    async fn tail(&self, topic: &str) -> Result<RecordId, LogError> {
        let mut cmd = redis::cmd("XREVRANGE");
        cmd.arg(topic).arg("+").arg("-").arg("COUNT").arg(1);

        let mut conn = self.write_conn.clone();
        let reply: StreamRangeReply = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| LogError::ReadFailed(e.to_string()))?;

        match reply.ids.first() {
            Some(entry) => parse_id(&entry.id),
            None => Ok(RecordId::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_rejects_special_ids() {
        assert!(matches!(parse_id("$"), Err(LogError::InvalidRecord(_))));
        assert_eq!(parse_id("0-0").unwrap(), RecordId::ZERO);
    }

    fn bulk(s: &[u8]) -> Value {
        Value::BulkString(s.to_vec())
    }

    #[test]
    fn test_to_fields_skips_only_nil() {
        let mut map = HashMap::new();
        map.insert("market".to_string(), bulk(b"BTC-EUR"));
        map.insert("best_bid".to_string(), bulk(b"50000"));
        map.insert("best_ask".to_string(), Value::Nil);

        let fields = to_fields("1-0", &map).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["best_bid"], "50000");
        assert!(!fields.contains_key("best_ask"));
    }

    #[test]
    fn test_to_fields_rejects_non_utf8() {
        let mut map = HashMap::new();
        map.insert("market".to_string(), bulk(b"BTC-EUR"));
        map.insert("best_bid".to_string(), bulk(&[0xff, 0xfe]));

        assert!(matches!(
            to_fields("1-0", &map),
            Err(LogError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_to_fields_rejects_nested_value() {
        let mut map = HashMap::new();
        map.insert("best_bid".to_string(), Value::Array(vec![bulk(b"1")]));

        assert!(matches!(
            to_fields("1-0", &map),
            Err(LogError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_parse_id_server_format() {
        assert_eq!(
            parse_id("1700000000000-12").unwrap(),
            RecordId::new(1_700_000_000_000, 12)
        );
    }
}
