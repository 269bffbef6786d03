//! Record codec: typed events <-> flat string field maps
//!
//! Absent optional fields are omitted from the map entirely; a missing key
//! decodes back to `None`, never to zero or an empty string. Numbers use
//! Rust's shortest round-trip `Display`, which is locale independent.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::event::{BboUpdate, PublicTrade, Side};
use crate::{BBO_TOPIC, TRADES_TOPIC};

/// Field name -> string value, as stored on a log record
pub type FieldMap = BTreeMap<String, String>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid number in field {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid side: {0:?}")]
    InvalidSide(String),
    #[error("invalid record id: {0:?}")]
    InvalidRecordId(String),
}

/// Symmetric mapping between an event and its log record fields
pub trait RecordCodec: Sized {
    /// Topic the event is appended to
    const TOPIC: &'static str;

    fn encode(&self) -> FieldMap;

    fn decode(fields: &FieldMap) -> Result<Self, DecodeError>;
}

pub(crate) fn required<'a>(fields: &'a FieldMap, field: &'static str) -> Result<&'a str, DecodeError> {
    fields
        .get(field)
        .map(String::as_str)
        .ok_or(DecodeError::MissingField(field))
}

pub(crate) fn required_f64(fields: &FieldMap, field: &'static str) -> Result<f64, DecodeError> {
    parse_f64(field, required(fields, field)?)
}

pub(crate) fn optional_f64(fields: &FieldMap, field: &'static str) -> Result<Option<f64>, DecodeError> {
    fields
        .get(field)
        .map(|value| parse_f64(field, value))
        .transpose()
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, DecodeError> {
    value.trim().parse().map_err(|_| DecodeError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Finite values only: NaN and infinities have no column representation
fn parse_f64(field: &'static str, value: &str) -> Result<f64, DecodeError> {
    let number: f64 = parse_number(field, value)?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err(DecodeError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }
}

fn put_optional(fields: &mut FieldMap, field: &str, value: Option<f64>) {
    if let Some(v) = value {
        fields.insert(field.to_string(), v.to_string());
    }
}

impl RecordCodec for BboUpdate {
    const TOPIC: &'static str = BBO_TOPIC;

    fn encode(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("market".to_string(), self.market.clone());
        put_optional(&mut fields, "best_bid", self.best_bid);
        put_optional(&mut fields, "best_bid_size", self.best_bid_size);
        put_optional(&mut fields, "best_ask", self.best_ask);
        put_optional(&mut fields, "best_ask_size", self.best_ask_size);
        fields
    }

    fn decode(fields: &FieldMap) -> Result<Self, DecodeError> {
        Ok(BboUpdate {
            market: required(fields, "market")?.to_string(),
            best_bid: optional_f64(fields, "best_bid")?,
            best_bid_size: optional_f64(fields, "best_bid_size")?,
            best_ask: optional_f64(fields, "best_ask")?,
            best_ask_size: optional_f64(fields, "best_ask_size")?,
        })
    }
}

impl RecordCodec for PublicTrade {
    const TOPIC: &'static str = TRADES_TOPIC;

    fn encode(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("market".to_string(), self.market.clone());
        fields.insert("id".to_string(), self.id.clone());
        fields.insert("price".to_string(), self.price.to_string());
        fields.insert("amount".to_string(), self.amount.to_string());
        fields.insert("side".to_string(), self.side.as_str().to_string());
        fields.insert("timestamp".to_string(), self.timestamp.to_string());
        fields
    }

    fn decode(fields: &FieldMap) -> Result<Self, DecodeError> {
        Ok(PublicTrade {
            market: required(fields, "market")?.to_string(),
            id: required(fields, "id")?.to_string(),
            price: required_f64(fields, "price")?,
            amount: required_f64(fields, "amount")?,
            side: required(fields, "side")?.parse::<Side>()?,
            timestamp: parse_number("timestamp", required(fields, "timestamp")?)?,
        })
    }
}
