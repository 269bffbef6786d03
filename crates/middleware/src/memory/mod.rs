//! In-memory implementations for testing
pub mod log;
pub mod sink;

pub use log::InMemoryTopicLog;
pub use sink::InMemorySink;
