//! tickrelay-schema: shared data model for the publisher and the relay
//!
//! Domain events ([`BboUpdate`], [`PublicTrade`]), the flat string-keyed
//! record representation used by the topic log ([`RecordCodec`]), and the
//! columnar rows the relay commits to the sink ([`TableRow`], [`Block`]).

pub mod block;
pub mod codec;
pub mod event;
pub mod record_id;
pub mod row;

pub use block::{Block, Column, ColumnData};
pub use codec::{DecodeError, FieldMap, RecordCodec};
pub use event::{BboUpdate, PublicTrade, Side};
pub use record_id::RecordId;
pub use row::{BboRow, TableRow, TradeRow};

/// Topic carrying best bid/offer updates
pub const BBO_TOPIC: &str = "bbo";

/// Topic carrying public trades
pub const TRADES_TOPIC: &str = "trades";
