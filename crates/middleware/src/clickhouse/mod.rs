//! ClickHouse sink over the HTTP interface
//!
//! Each batch is one `INSERT ... FORMAT JSONEachRow` request; ClickHouse
//! applies a single insert atomically, so a failed request inserts nothing.

mod encode;
mod sink;

pub use encode::{encode_json_each_row, insert_query};
pub use sink::{ClickHouseConfig, ClickHouseSink};
