//! tickrelay-relay binary entry point

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickrelay_middleware::{MiddlewareFactory, SinkOptions};
use tickrelay_relay::server::{run_server, ServerState};
use tickrelay_relay::{parse_duration, Relay, RelayConfig};

#[derive(Parser, Debug)]
#[command(name = "tickrelay-relay")]
#[command(about = "Relays BBO and trade records from the topic log into ClickHouse")]
struct Args {
    /// Topic log URL (redis://, rediss:// or memory://)
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// ClickHouse HTTP interface URL (http://, https:// or memory://)
    #[arg(long, env = "CLICKHOUSE_URL", default_value = "http://127.0.0.1:8123")]
    clickhouse_url: String,

    #[arg(long, env = "CLICKHOUSE_DATABASE", default_value = "default")]
    clickhouse_database: String,

    #[arg(long, env = "CLICKHOUSE_USER")]
    clickhouse_user: Option<String>,

    #[arg(long, env = "CLICKHOUSE_PASSWORD", hide_env_values = true)]
    clickhouse_password: Option<String>,

    /// Rows per topic that trigger a flush
    #[arg(long, env = "BATCH_SIZE", default_value_t = 100)]
    batch_size: usize,

    /// Shared flush timer, e.g. 1000ms or 2s
    #[arg(long, env = "FLUSH_INTERVAL", default_value = "1000ms", value_parser = parse_duration)]
    flush_interval: Duration,

    /// Maximum blocking read from the log
    #[arg(long, env = "POLL_WAIT", default_value = "500ms", value_parser = parse_duration)]
    poll_wait: Duration,

    /// Maximum time for one batch insert
    #[arg(long, env = "INSERT_TIMEOUT", default_value = "10s", value_parser = parse_duration)]
    insert_timeout: Duration,

    /// Address for /health and /metrics; disabled when unset
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

    let config = RelayConfig {
        size_threshold: args.batch_size,
        time_threshold: args.flush_interval,
        poll_wait: args.poll_wait,
        insert_timeout: args.insert_timeout,
    };
    config.validate()?;

    info!(
        redis_url = %args.redis_url,
        clickhouse_url = %args.clickhouse_url,
        database = %args.clickhouse_database,
        config = ?config,
        "Starting relay"
    );

    let log = MiddlewareFactory::create_topic_log(&args.redis_url).await?;
    let sink = MiddlewareFactory::create_sink(
        &args.clickhouse_url,
        &SinkOptions {
            database: Some(args.clickhouse_database),
            user: args.clickhouse_user,
            password: args.clickhouse_password,
        },
    )?;

    let mut relay = Relay::new(log, sink, config);

    if let Some(addr) = args.listen_addr {
        let state = ServerState::new(relay.health());
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
            _ = sigterm.recv() => info!("SIGTERM received, shutting down gracefully"),
            _ = sigint.recv() => info!("SIGINT received, shutting down gracefully"),
        }
        token.cancel();
    });

    let stats = relay.run(shutdown).await;
    info!(
        records_read = stats.records_read,
        rows_flushed = stats.rows_flushed,
        flush_failures = stats.flush_failures,
        decode_failures = stats.decode_failures,
        read_failures = stats.read_failures,
        "Relay shutdown complete"
    );
    Ok(())
}
