use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::DecodeError;

/// Top-of-book update for one market.
///
/// Each side is independently optional: a one-sided book is valid, and the
/// feed only sends the fields that changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BboUpdate {
    pub market: String,
    pub best_bid: Option<f64>,
    pub best_bid_size: Option<f64>,
    pub best_ask: Option<f64>,
    pub best_ask_size: Option<f64>,
}

impl BboUpdate {
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            best_bid: None,
            best_bid_size: None,
            best_ask: None,
            best_ask_size: None,
        }
    }
}

/// Aggressor side of a public trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(DecodeError::InvalidSide(other.to_string())),
        }
    }
}

/// Public trade as reported by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTrade {
    pub market: String,
    /// Exchange-assigned trade id (opaque)
    pub id: String,
    pub price: f64,
    pub amount: f64,
    pub side: Side,
    /// Exchange trade time, epoch milliseconds. Not the log's ordering key.
    pub timestamp: i64,
}
