//! tickrelay-publisher binary entry point

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickrelay_middleware::MiddlewareFactory;
use tickrelay_publisher::bitvavo::{BitvavoFeed, BITVAVO_WS_URL};
use tickrelay_publisher::server::{run_server, ServerState};
use tickrelay_publisher::EventPublisher;

#[derive(Parser, Debug)]
#[command(name = "tickrelay-publisher")]
#[command(about = "Publishes exchange BBO and trade events to the topic log")]
struct Args {
    /// Topic log URL (redis://, rediss:// or memory://)
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Exchange WebSocket URL
    #[arg(long, env = "FEED_URL", default_value = BITVAVO_WS_URL)]
    feed_url: String,

    /// Markets to subscribe, comma separated
    #[arg(
        long,
        env = "MARKETS",
        value_delimiter = ',',
        default_value = "BTC-EUR,ETH-EUR"
    )]
    markets: Vec<String>,

    /// Address for the /health, /ready and /metrics server; disabled when unset
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.markets.is_empty() {
        anyhow::bail!("at least one market is required");
    }

    info!(
        redis_url = %args.redis_url,
        feed_url = %args.feed_url,
        markets = ?args.markets,
        "Starting publisher"
    );

    let log = MiddlewareFactory::create_topic_log(&args.redis_url).await?;
    let publisher = Arc::new(EventPublisher::new(log));
    let feed = BitvavoFeed::new(args.feed_url, args.markets);

    if let Some(addr) = args.listen_addr {
        let state = ServerState::new("bitvavo", publisher.connected_handle());
        info!(addr = %addr, "Starting health server");
        tokio::spawn(async move {
            if let Err(e) = run_server(addr, state).await {
                error!(error = %e, "Health server failed");
            }
        });
    }

    let shutdown = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
            _ = sigint.recv() => info!("SIGINT received, shutting down"),
        }
        token.cancel();
    });

    match feed.run(publisher.as_ref(), shutdown).await {
        Ok(()) => {
            info!("Publisher stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Feed ended, exiting for restart");
            Err(e.into())
        }
    }
}
