//! Bitvavo v2 WebSocket client
//!
//! Public channels only, no authentication.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::bitvavo::messages::{BitvavoEvent, BitvavoWsMessage};
use crate::error::FeedError;

/// Bitvavo v2 public WebSocket URL
pub const BITVAVO_WS_URL: &str = "wss://ws.bitvavo.com/v2/";

/// Builds `{"action":"subscribe","channels":[{"name":"ticker",...},{"name":"trades",...}]}`
pub fn subscribe_command(markets: &[String]) -> serde_json::Value {
    serde_json::json!({
        "action": "subscribe",
        "channels": [
            { "name": "ticker", "markets": markets },
            { "name": "trades", "markets": markets },
        ]
    })
}

pub struct BitvavoWebSocket {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl BitvavoWebSocket {
    const SUBSCRIPTION_TIMEOUT_SECS: u64 = 30;

    /// Bitvavo sends ticker updates continuously for liquid markets; silence
    /// this long means the connection is dead.
    const READ_TIMEOUT_SECS: u64 = 120;

    pub async fn connect(url: &str) -> Result<Self, FeedError> {
        info!(url = %url, "Connecting to Bitvavo WebSocket");

        let (ws, response) = connect_async(url).await?;

        info!(status = ?response.status(), "Bitvavo WebSocket connected");

        Ok(Self { ws })
    }

    /// Subscribe to ticker and trades for `markets` and wait for confirmation
    pub async fn subscribe(&mut self, markets: &[String]) -> Result<(), FeedError> {
        let msg = serde_json::to_string(&subscribe_command(markets))?;
        debug!(cmd = %msg, "Sending Bitvavo subscribe command");

        self.ws.send(Message::Text(msg)).await?;

        self.wait_for_subscription().await
    }

    async fn wait_for_subscription(&mut self) -> Result<(), FeedError> {
        let wait = async {
            while let Some(msg) = self.ws.next().await {
                match msg? {
                    Message::Text(text) => match serde_json::from_str::<BitvavoWsMessage>(&text) {
                        Ok(BitvavoWsMessage::Event(BitvavoEvent::Subscribed { subscriptions })) => {
                            info!(subscriptions = %subscriptions, "Bitvavo subscription confirmed");
                            return Ok(());
                        }
                        Ok(BitvavoWsMessage::Error {
                            error_code, error, ..
                        }) => {
                            return Err(FeedError::SubscriptionFailed(format!(
                                "{} (code {})",
                                error, error_code
                            )));
                        }
                        Ok(_) => {
                            debug!(raw = %text, "Received non-subscription message while waiting");
                        }
                        Err(e) => {
                            warn!(error = %e, raw = %text, "Failed to parse message while waiting for subscription");
                        }
                    },
                    Message::Ping(data) => self.ws.send(Message::Pong(data)).await?,
                    Message::Close(_) => return Err(FeedError::ConnectionClosed),
                    _ => {}
                }
            }
            Err(FeedError::ConnectionClosed)
        };

        tokio::time::timeout(Duration::from_secs(Self::SUBSCRIPTION_TIMEOUT_SECS), wait)
            .await
            .map_err(|_| {
                warn!(
                    timeout_secs = Self::SUBSCRIPTION_TIMEOUT_SECS,
                    "Bitvavo subscription timeout"
                );
                FeedError::SubscriptionFailed("Timeout waiting for confirmation".into())
            })?
    }

    /// Receive the next parsed message. Unparseable text frames are skipped.
    pub async fn recv(&mut self) -> Result<BitvavoWsMessage, FeedError> {
        loop {
            let recv_result = tokio::time::timeout(
                Duration::from_secs(Self::READ_TIMEOUT_SECS),
                self.ws.next(),
            )
            .await;

            match recv_result {
                Err(_) => {
                    warn!(
                        timeout_secs = Self::READ_TIMEOUT_SECS,
                        "Bitvavo WebSocket read timeout"
                    );
                    return Err(FeedError::Connection(format!(
                        "Read timeout after {} seconds",
                        Self::READ_TIMEOUT_SECS
                    )));
                }
                Ok(Some(Ok(Message::Text(text)))) => {
                    match serde_json::from_str::<BitvavoWsMessage>(&text) {
                        Ok(msg) => {
                            trace!(msg = %text, "Received Bitvavo message");
                            return Ok(msg);
                        }
                        Err(e) => {
                            warn!(error = %e, text = %text, "Failed to parse Bitvavo message");
                        }
                    }
                }
                Ok(Some(Ok(Message::Ping(data)))) => {
                    trace!("Received WS ping, sending pong");
                    self.ws.send(Message::Pong(data)).await?;
                }
                Ok(Some(Ok(Message::Close(frame)))) => {
                    info!(frame = ?frame, "Bitvavo WebSocket closed");
                    return Err(FeedError::ConnectionClosed);
                }
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(None) => return Err(FeedError::ConnectionClosed),
            }
        }
    }

    pub async fn close(&mut self) -> Result<(), FeedError> {
        self.ws.close(None).await?;
        Ok(())
    }
}
