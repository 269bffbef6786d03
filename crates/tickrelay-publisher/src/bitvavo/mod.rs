//! Bitvavo v2 public WebSocket feed
//!
//! Subscribes to the `ticker` and `trades` channels and forwards best bid/offer
//! changes and public trades to a [`FeedHandler`](crate::FeedHandler).

pub mod feed;
pub mod messages;
pub mod websocket;

pub use feed::BitvavoFeed;
pub use messages::{BitvavoEvent, BitvavoTicker, BitvavoTrade, BitvavoWsMessage};
pub use websocket::{BitvavoWebSocket, BITVAVO_WS_URL};
