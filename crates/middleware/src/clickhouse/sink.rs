use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use tickrelay_schema::Block;

use crate::clickhouse::encode::{encode_json_each_row, insert_query};
use crate::error::SinkError;
use crate::sink::ColumnarSink;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// HTTP interface, e.g. `http://127.0.0.1:8123`
    pub url: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ClickHouseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: "default".to_string(),
            user: None,
            password: None,
        }
    }
}

pub struct ClickHouseSink {
    http: reqwest::Client,
    config: ClickHouseConfig,
}

impl ClickHouseSink {
    pub fn new(config: ClickHouseConfig) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SinkError::ConnectionFailed(format!("HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ColumnarSink for ClickHouseSink {
    async fn insert_batch(&self, block: &Block) -> Result<(), SinkError> {
        if block.is_empty() {
            return Ok(());
        }

        let query = insert_query(&self.config.database, block);
        let body = encode_json_each_row(block)
            .map_err(|e| SinkError::InsertFailed(format!("encode: {}", e)))?;

        let mut request = self
            .http
            .post(&self.config.url)
            .query(&[("query", query.as_str())])
            .body(body);
        if let Some(user) = &self.config.user {
            request = request.header("X-ClickHouse-User", user);
        }
        if let Some(password) = &self.config.password {
            request = request.header("X-ClickHouse-Key", password);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                SinkError::ConnectionFailed(e.to_string())
            } else {
                SinkError::InsertFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        debug!(table = block.table, rows = block.row_count(), "ClickHouse insert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickrelay_schema::{TableRow, TradeRow};
    use wiremock::matchers::{body_string_contains, header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn trades_block() -> Block {
        TradeRow::to_block(&[TradeRow {
            timestamp_ms: 1_700_000_000_000,
            market: "ETH-EUR".to_string(),
            id: "T1".to_string(),
            price: 3000.25,
            amount: 0.5,
            side: "sell".to_string(),
        }])
    }

    fn config(url: String) -> ClickHouseConfig {
        ClickHouseConfig {
            url,
            database: "market_data".to_string(),
            user: Some("relay".to_string()),
            password: Some("secret".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_posts_json_each_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param(
                "query",
                "INSERT INTO `market_data`.`trades` (`timestamp`, `market`, `id`, `price`, `amount`, `side`) FORMAT JSONEachRow",
            ))
            .and(header("X-ClickHouse-User", "relay"))
            .and(header("X-ClickHouse-Key", "secret"))
            .and(body_string_contains("\"id\":\"T1\""))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink = ClickHouseSink::new(config(server.uri())).unwrap();
        sink.insert_batch(&trades_block()).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string("Code: 60. DB::Exception: Table market_data.trades does not exist\n"),
            )
            .mount(&server)
            .await;

        let sink = ClickHouseSink::new(config(server.uri())).unwrap();
        let err = sink.insert_batch(&trades_block()).await.unwrap_err();
        match err {
            SinkError::Rejected { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("does not exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_block_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sink = ClickHouseSink::new(config(server.uri())).unwrap();
        sink.insert_batch(&TradeRow::to_block(&[])).await.unwrap();
    }
}
