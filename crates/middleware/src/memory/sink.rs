use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use tickrelay_schema::Block;

use crate::error::SinkError;
use crate::sink::ColumnarSink;

/// Sink that keeps every inserted block, with failure injection for tests
pub struct InMemorySink {
    blocks: Mutex<Vec<Block>>,
    failing: AtomicBool,
    fail_next: AtomicUsize,
    attempts: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            fail_next: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            delay: Mutex::new(None),
        }
    }

    /// Fail every insert until switched off
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail the next `n` inserts, then succeed
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Stall every insert for `delay` before completing it
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    /// Successfully inserted blocks, in insert order
    pub async fn blocks(&self) -> Vec<Block> {
        self.blocks.lock().await.clone()
    }

    /// Successfully inserted blocks for one table
    pub async fn blocks_for(&self, table: &str) -> Vec<Block> {
        self.blocks
            .lock()
            .await
            .iter()
            .filter(|b| b.table == table)
            .cloned()
            .collect()
    }

    /// Total rows inserted into `table`
    pub async fn row_count(&self, table: &str) -> usize {
        self.blocks_for(table).await.iter().map(Block::row_count).sum()
    }

    /// Insert calls seen, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ColumnarSink for InMemorySink {
    async fn insert_batch(&self, block: &Block) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.take_failure() {
            return Err(SinkError::InsertFailed(format!(
                "injected failure for table {}",
                block.table
            )));
        }

        self.blocks.lock().await.push(block.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickrelay_schema::ColumnData;

    fn block(rows: usize) -> Block {
        let mut b = Block::new("trades");
        b.append_column("price", ColumnData::Float64(vec![1.0; rows]));
        b
    }

    #[tokio::test]
    async fn test_insert_and_inspect() {
        let sink = InMemorySink::new();
        sink.insert_batch(&block(3)).await.unwrap();
        sink.insert_batch(&block(2)).await.unwrap();

        assert_eq!(sink.blocks().await.len(), 2);
        assert_eq!(sink.row_count("trades").await, 5);
        assert_eq!(sink.row_count("bbo").await, 0);
        assert_eq!(sink.attempts(), 2);
    }

    #[tokio::test]
    async fn test_fail_next() {
        let sink = InMemorySink::new();
        sink.fail_next(1);
        assert!(sink.insert_batch(&block(1)).await.is_err());
        assert!(sink.insert_batch(&block(1)).await.is_ok());
        assert_eq!(sink.attempts(), 2);
        assert_eq!(sink.blocks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_set_failing() {
        let sink = InMemorySink::new();
        sink.set_failing(true);
        assert!(matches!(
            sink.insert_batch(&block(1)).await,
            Err(SinkError::InsertFailed(_))
        ));
        sink.set_failing(false);
        assert!(sink.insert_batch(&block(1)).await.is_ok());
    }
}
