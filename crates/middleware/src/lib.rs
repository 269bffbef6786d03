//! tickrelay-middleware: pluggable backends for the topic log and the sink
//!
//! Trait-based abstractions for the append-only topic log ([`TopicLog`]) and
//! the columnar store ([`ColumnarSink`]), with in-memory implementations for
//! testing plus Redis Streams and ClickHouse backends.

#[cfg(feature = "clickhouse")]
pub mod clickhouse;
pub mod error;
pub mod factory;
pub mod log;
pub mod memory;
pub mod sink;
#[cfg(feature = "redis")]
pub mod streams;

pub use error::{LogError, SinkError};
pub use factory::{FactoryError, MiddlewareFactory, SinkOptions};
pub use log::{LogRecord, TopicLog};
pub use memory::{InMemorySink, InMemoryTopicLog};
pub use sink::ColumnarSink;

#[cfg(feature = "clickhouse")]
pub use clickhouse::{ClickHouseConfig, ClickHouseSink};
#[cfg(feature = "redis")]
pub use streams::RedisTopicLog;
