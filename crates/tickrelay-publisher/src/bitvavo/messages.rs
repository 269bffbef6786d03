//! Bitvavo v2 WebSocket message types
//!
//! Events carry an `event` tag. Errors do not, so the outer enum is untagged
//! with the tagged event enum tried first.

use serde::Deserialize;

use tickrelay_schema::{BboUpdate, PublicTrade, Side};

use crate::error::FeedError;

/// Incoming WebSocket messages from the Bitvavo v2 API
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BitvavoWsMessage {
    Event(BitvavoEvent),
    /// Request rejected, e.g. unknown market in a subscribe
    Error {
        #[serde(rename = "errorCode")]
        error_code: i64,
        error: String,
        action: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum BitvavoEvent {
    Ticker(BitvavoTicker),
    Trade(BitvavoTrade),
    Subscribed {
        subscriptions: serde_json::Value,
    },
    /// Anything else (ticker24h, book, ...) is ignored
    #[serde(other)]
    Other,
}

/// Best bid/offer snapshot. Sides the exchange did not send are absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitvavoTicker {
    pub market: String,
    #[serde(default)]
    pub best_bid: Option<String>,
    #[serde(default)]
    pub best_bid_size: Option<String>,
    #[serde(default)]
    pub best_ask: Option<String>,
    #[serde(default)]
    pub best_ask_size: Option<String>,
    #[serde(default)]
    pub last_price: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitvavoTrade {
    pub id: String,
    pub timestamp: i64,
    pub market: String,
    pub amount: String,
    pub price: String,
    pub side: String,
}

fn parse_decimal(field: &str, value: &str) -> Result<f64, FeedError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| FeedError::InvalidMessage(format!("{}: not a number: {:?}", field, value)))
}

fn parse_optional(field: &str, value: Option<&String>) -> Result<Option<f64>, FeedError> {
    value.map(|v| parse_decimal(field, v)).transpose()
}

impl TryFrom<&BitvavoTicker> for BboUpdate {
    type Error = FeedError;

    fn try_from(ticker: &BitvavoTicker) -> Result<Self, Self::Error> {
        Ok(BboUpdate {
            market: ticker.market.clone(),
            best_bid: parse_optional("bestBid", ticker.best_bid.as_ref())?,
            best_bid_size: parse_optional("bestBidSize", ticker.best_bid_size.as_ref())?,
            best_ask: parse_optional("bestAsk", ticker.best_ask.as_ref())?,
            best_ask_size: parse_optional("bestAskSize", ticker.best_ask_size.as_ref())?,
        })
    }
}

impl TryFrom<&BitvavoTrade> for PublicTrade {
    type Error = FeedError;

    fn try_from(trade: &BitvavoTrade) -> Result<Self, Self::Error> {
        let side: Side = trade
            .side
            .parse()
            .map_err(|_| FeedError::InvalidMessage(format!("side: {:?}", trade.side)))?;
        Ok(PublicTrade {
            market: trade.market.clone(),
            id: trade.id.clone(),
            price: parse_decimal("price", &trade.price)?,
            amount: parse_decimal("amount", &trade.amount)?,
            side,
            timestamp: trade.timestamp,
        })
    }
}
