//! Bitvavo feed loop: connect, subscribe, dispatch to a handler

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tickrelay_schema::{BboUpdate, PublicTrade};

use crate::bitvavo::messages::{BitvavoEvent, BitvavoWsMessage};
use crate::bitvavo::websocket::BitvavoWebSocket;
use crate::error::FeedError;
use crate::feed::FeedHandler;
use crate::metrics::PublisherMetrics;

pub struct BitvavoFeed {
    url: String,
    markets: Vec<String>,
    metrics: PublisherMetrics,
}

impl BitvavoFeed {
    pub fn new(url: impl Into<String>, markets: Vec<String>) -> Self {
        Self {
            url: url.into(),
            markets,
            metrics: PublisherMetrics::new(),
        }
    }

    /// Run until shutdown or connection loss.
    ///
    /// Connection loss is returned as an error after the handler is told;
    /// there is no reconnect, the process exits and is restarted.
    pub async fn run(
        &self,
        handler: &dyn FeedHandler,
        shutdown: CancellationToken,
    ) -> Result<(), FeedError> {
        let mut ws = BitvavoWebSocket::connect(&self.url).await?;
        handler.on_connection_change(true);

        if let Err(e) = ws.subscribe(&self.markets).await {
            handler.on_error(&e.to_string());
            handler.on_connection_change(false);
            return Err(e);
        }
        info!(markets = ?self.markets, "Bitvavo feed running");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, closing Bitvavo feed");
                    if let Err(e) = ws.close().await {
                        debug!(error = %e, "Error closing WebSocket");
                    }
                    handler.on_connection_change(false);
                    return Ok(());
                }
                msg = ws.recv() => match msg {
                    Ok(msg) => self.dispatch(handler, msg).await,
                    Err(e) => {
                        handler.on_connection_change(false);
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Forward one message to the handler. Handler calls are sequential.
    pub async fn dispatch(&self, handler: &dyn FeedHandler, msg: BitvavoWsMessage) {
        match msg {
            BitvavoWsMessage::Event(BitvavoEvent::Ticker(ticker)) => {
                match BboUpdate::try_from(&ticker) {
                    Ok(update) => {
                        if let Err(e) = handler.on_bbo(&update).await {
                            warn!(market = %update.market, error = %e, "Failed to publish BBO");
                        }
                    }
                    Err(e) => {
                        self.metrics.record_invalid("ticker");
                        handler.on_error(&e.to_string());
                    }
                }
            }
            BitvavoWsMessage::Event(BitvavoEvent::Trade(raw)) => match PublicTrade::try_from(&raw) {
                Ok(trade) => {
                    if let Err(e) = handler.on_public_trade(&trade).await {
                        warn!(market = %trade.market, id = %trade.id, error = %e, "Failed to publish trade");
                    }
                }
                Err(e) => {
                    self.metrics.record_invalid("trades");
                    handler.on_error(&e.to_string());
                }
            },
            BitvavoWsMessage::Event(BitvavoEvent::Subscribed { subscriptions }) => {
                debug!(subscriptions = %subscriptions, "Subscription update");
            }
            BitvavoWsMessage::Event(BitvavoEvent::Other) => {}
            BitvavoWsMessage::Error {
                error_code, error, ..
            } => {
                handler.on_error(&format!("{} (code {})", error, error_code));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventPublisher;
    use std::sync::Arc;
    use tickrelay_middleware::{InMemoryTopicLog, TopicLog};
    use tickrelay_schema::{RecordId, BBO_TOPIC, TRADES_TOPIC};

    fn feed() -> BitvavoFeed {
        BitvavoFeed::new("ws://unused", vec!["BTC-EUR".to_string()])
    }

    fn parse(raw: &str) -> BitvavoWsMessage {
        serde_json::from_str(raw).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_ticker_and_trade() {
        let log = Arc::new(InMemoryTopicLog::new());
        let publisher = EventPublisher::new(log.clone());
        let feed = feed();

        feed.dispatch(
            &publisher,
            parse(r#"{"event":"ticker","market":"BTC-EUR","bestBid":"50000","bestAsk":"50001"}"#),
        )
        .await;
        feed.dispatch(
            &publisher,
            parse(r#"{"event":"trade","timestamp":1700000000000,"market":"BTC-EUR","id":"t1","amount":"0.1","price":"50000.5","side":"buy"}"#),
        )
        .await;

        assert_eq!(log.len(BBO_TOPIC).await, 1);
        assert_eq!(log.len(TRADES_TOPIC).await, 1);

        let records = log.read(&[(TRADES_TOPIC.to_string(), RecordId::ZERO)], std::time::Duration::ZERO).await.unwrap();
        assert_eq!(records[0].fields["price"], "50000.5");
        assert_eq!(records[0].fields["side"], "buy");
    }

    #[tokio::test]
    async fn test_dispatch_invalid_and_error_publish_nothing() {
        let log = Arc::new(InMemoryTopicLog::new());
        let publisher = EventPublisher::new(log.clone());
        let feed = feed();

        feed.dispatch(
            &publisher,
            parse(r#"{"event":"trade","timestamp":1,"market":"BTC-EUR","id":"t1","amount":"x","price":"1","side":"buy"}"#),
        )
        .await;
        feed.dispatch(
            &publisher,
            parse(r#"{"action":"subscribe","errorCode":205,"error":"market parameter is invalid."}"#),
        )
        .await;

        assert_eq!(log.len(BBO_TOPIC).await, 0);
        assert_eq!(log.len(TRADES_TOPIC).await, 0);
    }

    #[tokio::test]
    async fn test_dispatch_survives_publish_failure() {
        let log = Arc::new(InMemoryTopicLog::new());
        let publisher = EventPublisher::new(log.clone());
        let feed = feed();
        let ticker = r#"{"event":"ticker","market":"BTC-EUR","bestBid":"1"}"#;

        log.set_unavailable(true);
        feed.dispatch(&publisher, parse(ticker)).await;
        log.set_unavailable(false);
        feed.dispatch(&publisher, parse(ticker)).await;

        assert_eq!(log.len(BBO_TOPIC).await, 1);
    }
}
