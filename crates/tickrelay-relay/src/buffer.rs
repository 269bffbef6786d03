//! Per-topic row buffers

use tickrelay_schema::{Block, DecodeError, FieldMap, RecordId, TableRow};

/// Decoded rows for one topic awaiting a flush.
///
/// Object-safe so the relay can hold buffers for different row types side
/// by side.
pub trait TopicBuffer: Send {
    fn topic(&self) -> &'static str;

    fn table(&self) -> &'static str;

    /// Decode one log record and append its row. Nothing is buffered on error.
    fn push_record(&mut self, id: &RecordId, fields: &FieldMap) -> Result<(), DecodeError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Columnar snapshot of the buffered rows, in buffer order
    fn to_block(&self) -> Block;

    fn clear(&mut self);
}

pub struct RowBuffer<R: TableRow> {
    rows: Vec<R>,
}

impl<R: TableRow> RowBuffer<R> {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn boxed() -> Box<dyn TopicBuffer> {
        Box::new(Self::new())
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }
}

impl<R: TableRow> Default for RowBuffer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TableRow> TopicBuffer for RowBuffer<R> {
    fn topic(&self) -> &'static str {
        R::TOPIC
    }

    fn table(&self) -> &'static str {
        R::TABLE
    }

    fn push_record(&mut self, id: &RecordId, fields: &FieldMap) -> Result<(), DecodeError> {
        self.rows.push(R::from_record(id, fields)?);
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn to_block(&self) -> Block {
        R::to_block(&self.rows)
    }

    fn clear(&mut self) {
        self.rows.clear();
    }
}
