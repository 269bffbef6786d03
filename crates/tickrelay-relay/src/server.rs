//! HTTP server for health and metrics endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;

use crate::metrics::encode_metrics;
use crate::relay::RelayHealth;

/// Default staleness threshold in seconds
const DEFAULT_STALE_THRESHOLD_SECS: u64 = 60;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub draining: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_read_secs_ago: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
}

#[derive(Clone)]
pub struct ServerState {
    pub health: Arc<RelayHealth>,
    /// No successful read for this long marks the relay stale
    pub stale_threshold_secs: u64,
}

impl ServerState {
    pub fn new(health: Arc<RelayHealth>) -> Self {
        Self {
            health,
            stale_threshold_secs: DEFAULT_STALE_THRESHOLD_SECS,
        }
    }

    fn staleness_info(&self) -> (Option<u64>, bool) {
        let last_read = self.health.last_read_epoch_secs();
        if last_read == 0 {
            return (None, false);
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let secs_ago = now.saturating_sub(last_read);
        (Some(secs_ago), secs_ago > self.stale_threshold_secs)
    }
}

/// 200 while reads keep succeeding, 503 once stale
async fn health(State(state): State<ServerState>) -> (StatusCode, Json<HealthResponse>) {
    let (last_read_secs_ago, stale) = state.staleness_info();
    let draining = state.health.is_draining();

    let status_code = if stale {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let status = if stale {
        "stale"
    } else if draining {
        "draining"
    } else {
        "ok"
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            draining,
            last_read_secs_ago,
            stale,
        }),
    )
}

/// Prometheus text format
async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: ServerState) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_status(state: ServerState, uri: &str) -> StatusCode {
        create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_ok_before_first_read() {
        let state = ServerState::new(Arc::new(RelayHealth::new()));
        assert_eq!(get_status(state, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ok_after_read() {
        let health = Arc::new(RelayHealth::new());
        health.mark_read();
        let state = ServerState::new(health);
        assert_eq!(get_status(state, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ok_while_draining() {
        let health = Arc::new(RelayHealth::new());
        health.mark_read();
        health.set_draining();
        let state = ServerState::new(health);
        assert_eq!(get_status(state, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_503_when_stale() {
        let health = Arc::new(RelayHealth::new());
        health.mark_read();
        let state = ServerState {
            health,
            stale_threshold_secs: 0,
        };
        // stale means strictly older than the threshold
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert_eq!(
            get_status(state, "/health").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = ServerState::new(Arc::new(RelayHealth::new()));
        let response = create_router(state)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));
    }
}
