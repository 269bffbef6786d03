//! Redis Streams topic log
//!
//! One stream per topic. Appends use `XADD <topic> *`, reads use a single
//! blocking `XREAD` across every topic, and tails come from `XREVRANGE`.

mod log;

pub use log::RedisTopicLog;
