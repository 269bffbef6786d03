//! tickrelay-relay: batch relay from the topic log into the columnar store
//!
//! Polls the `bbo` and `trades` topics from in-memory cursors, buffers decoded
//! rows per topic and commits each buffer as one batch when it reaches the
//! size threshold, when the shared flush timer elapses, or on shutdown.

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod error;
pub mod metrics;
pub mod relay;
pub mod server;

pub use buffer::{RowBuffer, TopicBuffer};
pub use config::{parse_duration, RelayConfig};
pub use cursor::{Cursor, Cursors};
pub use error::RelayError;
pub use relay::{FlushTrigger, PollOutcome, Relay, RelayHealth, RelayState, RelayStats};
