use async_trait::async_trait;

use tickrelay_schema::Block;

use crate::error::SinkError;

/// Columnar store accepting whole-batch inserts
#[async_trait]
pub trait ColumnarSink: Send + Sync {
    /// Insert every row of `block` into `block.table`.
    ///
    /// Either the whole batch is inserted or the call fails; no partial
    /// inserts are assumed.
    async fn insert_batch(&self, block: &Block) -> Result<(), SinkError>;
}
