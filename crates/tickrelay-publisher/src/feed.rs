//! Callback contract between a feed client and whoever consumes its events

use async_trait::async_trait;

use tickrelay_middleware::LogError;
use tickrelay_schema::{BboUpdate, PublicTrade};

/// Receives events from a feed client.
///
/// Market events return the publish result to the feed client, which decides
/// how to report it. Errors and connectivity changes are informational only.
#[async_trait]
pub trait FeedHandler: Send + Sync {
    async fn on_bbo(&self, update: &BboUpdate) -> Result<(), LogError>;

    async fn on_public_trade(&self, trade: &PublicTrade) -> Result<(), LogError>;

    fn on_error(&self, message: &str);

    fn on_connection_change(&self, connected: bool);
}
