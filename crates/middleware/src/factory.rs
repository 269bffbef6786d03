use std::sync::Arc;

use url::Url;

use crate::log::TopicLog;
use crate::memory::{InMemorySink, InMemoryTopicLog};
use crate::sink::ColumnarSink;

/// Error creating middleware
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported topic log scheme: {0}")]
    UnsupportedLog(String),
    #[error("unsupported sink scheme: {0}")]
    UnsupportedSink(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Sink settings that do not fit in the endpoint url
#[derive(Debug, Clone, Default)]
pub struct SinkOptions {
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Factory for creating backends from endpoint urls
pub struct MiddlewareFactory;

impl MiddlewareFactory {
    fn scheme(url: &str) -> Result<String, FactoryError> {
        Url::parse(url)
            .map(|u| u.scheme().to_string())
            .map_err(|e| FactoryError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    /// `memory://` or `redis://` / `rediss://`
    pub async fn create_topic_log(url: &str) -> Result<Arc<dyn TopicLog>, FactoryError> {
        match Self::scheme(url)?.as_str() {
            "memory" => Ok(Arc::new(InMemoryTopicLog::new())),
            #[cfg(feature = "redis")]
            "redis" | "rediss" => {
                let log = crate::streams::RedisTopicLog::connect(url)
                    .await
                    .map_err(|e| FactoryError::Backend(e.to_string()))?;
                Ok(Arc::new(log))
            }
            other => Err(FactoryError::UnsupportedLog(other.to_string())),
        }
    }

    /// `memory://` or a ClickHouse HTTP endpoint (`http://`, `https://`)
    pub fn create_sink(
        url: &str,
        options: &SinkOptions,
    ) -> Result<Arc<dyn ColumnarSink>, FactoryError> {
        match Self::scheme(url)?.as_str() {
            "memory" => Ok(Arc::new(InMemorySink::new())),
            #[cfg(feature = "clickhouse")]
            "http" | "https" => {
                let mut config = crate::clickhouse::ClickHouseConfig::new(url);
                if let Some(database) = &options.database {
                    config.database = database.clone();
                }
                config.user = options.user.clone();
                config.password = options.password.clone();
                let sink = crate::clickhouse::ClickHouseSink::new(config)
                    .map_err(|e| FactoryError::Backend(e.to_string()))?;
                Ok(Arc::new(sink))
            }
            other => {
                let _ = options;
                Err(FactoryError::UnsupportedSink(other.to_string()))
            }
        }
    }
}
