//! tickrelay-publisher: exchange feed to topic log
//!
//! Turns every feed callback into exactly one append on the matching topic
//! log. No buffering and no retries on the publish path.

pub mod bitvavo;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod publisher;
pub mod server;

pub use error::FeedError;
pub use feed::FeedHandler;
pub use publisher::EventPublisher;
