//! Integration tests for the Redis Streams topic log
//!
//! Run with: cargo test -p tickrelay-middleware --test redis_integration -- --ignored
//! Requires: docker run -p 6379:6379 redis:7

#![cfg(feature = "redis")]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tickrelay_middleware::{RedisTopicLog, TopicLog};
use tickrelay_schema::{FieldMap, RecordId};

fn unique_topic(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test-{}-{}", name, nanos)
}

fn fields(market: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("market".to_string(), market.to_string());
    fields.insert("best_bid".to_string(), "50000".to_string());
    fields
}

#[tokio::test]
#[ignore]
async fn test_append_then_read_after_tail() {
    let log = RedisTopicLog::connect("redis://localhost:6379")
        .await
        .expect("Failed to connect to Redis");
    let topic = unique_topic("bbo");

    let tail = log.tail(&topic).await.expect("Failed to read tail");
    assert_eq!(tail, RecordId::ZERO);

    let first = log.append(&topic, &fields("BTC-EUR")).await.unwrap();
    let second = log.append(&topic, &fields("ETH-EUR")).await.unwrap();
    assert!(first < second);
    assert_eq!(log.tail(&topic).await.unwrap(), second);

    let records = log
        .read(&[(topic.clone(), tail)], Duration::from_millis(100))
        .await
        .expect("Failed to read");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, first);
    assert_eq!(records[1].fields["market"], "ETH-EUR");
}

#[tokio::test]
#[ignore]
async fn test_read_times_out_empty() {
    let log = RedisTopicLog::connect("redis://localhost:6379")
        .await
        .expect("Failed to connect to Redis");
    let topic = unique_topic("trades");

    let records = log
        .read(&[(topic, RecordId::ZERO)], Duration::from_millis(100))
        .await
        .expect("Failed to read");
    assert!(records.is_empty());
}
