//! Sink rows, one type per target table
//!
//! A row's `timestamp_ms` is the millisecond prefix of the log record id,
//! so storage is ordered by log arrival rather than by exchange time.

use crate::block::{Block, ColumnData};
use crate::codec::{DecodeError, FieldMap, RecordCodec};
use crate::event::{BboUpdate, PublicTrade};
use crate::record_id::RecordId;

/// A fixed-width row of one sink table, decodable from a log record
pub trait TableRow: Sized + Send + Sync + 'static {
    /// Topic the rows are read from
    const TOPIC: &'static str;
    /// Table the rows are inserted into
    const TABLE: &'static str;

    fn from_record(id: &RecordId, fields: &FieldMap) -> Result<Self, DecodeError>;

    fn to_block(rows: &[Self]) -> Block;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BboRow {
    pub timestamp_ms: i64,
    pub market: String,
    pub best_bid: Option<f64>,
    pub best_bid_size: Option<f64>,
    pub best_ask: Option<f64>,
    pub best_ask_size: Option<f64>,
}

impl TableRow for BboRow {
    const TOPIC: &'static str = crate::BBO_TOPIC;
    const TABLE: &'static str = "bbo";

    fn from_record(id: &RecordId, fields: &FieldMap) -> Result<Self, DecodeError> {
        let update = BboUpdate::decode(fields)?;
        Ok(BboRow {
            timestamp_ms: id.timestamp_millis(),
            market: update.market,
            best_bid: update.best_bid,
            best_bid_size: update.best_bid_size,
            best_ask: update.best_ask,
            best_ask_size: update.best_ask_size,
        })
    }

    fn to_block(rows: &[Self]) -> Block {
        let mut block = Block::new(Self::TABLE);
        block.append_column(
            "timestamp",
            ColumnData::DateTime64Millis(rows.iter().map(|r| r.timestamp_ms).collect()),
        );
        block.append_column(
            "market",
            ColumnData::String(rows.iter().map(|r| r.market.clone()).collect()),
        );
        block.append_column(
            "best_bid",
            ColumnData::NullableFloat64(rows.iter().map(|r| r.best_bid).collect()),
        );
        block.append_column(
            "best_bid_size",
            ColumnData::NullableFloat64(rows.iter().map(|r| r.best_bid_size).collect()),
        );
        block.append_column(
            "best_ask",
            ColumnData::NullableFloat64(rows.iter().map(|r| r.best_ask).collect()),
        );
        block.append_column(
            "best_ask_size",
            ColumnData::NullableFloat64(rows.iter().map(|r| r.best_ask_size).collect()),
        );
        block
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub timestamp_ms: i64,
    pub market: String,
    pub id: String,
    pub price: f64,
    pub amount: f64,
    pub side: String,
}

impl TableRow for TradeRow {
    const TOPIC: &'static str = crate::TRADES_TOPIC;
    const TABLE: &'static str = "trades";

    fn from_record(id: &RecordId, fields: &FieldMap) -> Result<Self, DecodeError> {
        let trade = PublicTrade::decode(fields)?;
        Ok(TradeRow {
            timestamp_ms: id.timestamp_millis(),
            market: trade.market,
            id: trade.id,
            price: trade.price,
            amount: trade.amount,
            side: trade.side.as_str().to_string(),
        })
    }

    fn to_block(rows: &[Self]) -> Block {
        let mut block = Block::new(Self::TABLE);
        block.append_column(
            "timestamp",
            ColumnData::DateTime64Millis(rows.iter().map(|r| r.timestamp_ms).collect()),
        );
        block.append_column(
            "market",
            ColumnData::String(rows.iter().map(|r| r.market.clone()).collect()),
        );
        block.append_column(
            "id",
            ColumnData::String(rows.iter().map(|r| r.id.clone()).collect()),
        );
        block.append_column(
            "price",
            ColumnData::Float64(rows.iter().map(|r| r.price).collect()),
        );
        block.append_column(
            "amount",
            ColumnData::Float64(rows.iter().map(|r| r.amount).collect()),
        );
        block.append_column(
            "side",
            ColumnData::String(rows.iter().map(|r| r.side.clone()).collect()),
        );
        block
    }
}
