//! Publisher -> topic log -> relay -> sink over the in-memory backends

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tickrelay_middleware::{InMemorySink, InMemoryTopicLog};
use tickrelay_publisher::EventPublisher;
use tickrelay_relay::{Relay, RelayConfig};
use tickrelay_schema::{BboUpdate, PublicTrade, Side, BBO_TOPIC, TRADES_TOPIC};

struct Pipeline {
    log: Arc<InMemoryTopicLog>,
    sink: Arc<InMemorySink>,
    publisher: EventPublisher,
    relay: Relay,
}

/// Relay positioned at the (empty) log tail
async fn pipeline() -> Pipeline {
    let log = Arc::new(InMemoryTopicLog::new());
    let sink = Arc::new(InMemorySink::new());
    let publisher = EventPublisher::new(log.clone());
    let mut relay = Relay::new(log.clone(), sink.clone(), RelayConfig::default());
    relay.poll_once().await;
    Pipeline {
        log,
        sink,
        publisher,
        relay,
    }
}

#[tokio::test(start_paused = true)]
async fn bbo_with_absent_size_lands_as_null() {
    let mut p = pipeline().await;

    p.publisher
        .publish_bbo(&BboUpdate {
            market: "BTC-EUR".to_string(),
            best_bid: Some(50000.0),
            best_bid_size: None,
            best_ask: Some(50010.5),
            best_ask_size: Some(2.0),
        })
        .await
        .unwrap();

    let outcome = p.relay.poll_once().await;
    assert_eq!(outcome.rows_buffered, 1);
    assert_eq!(p.sink.attempts(), 0);

    // past the shared flush timer
    tokio::time::advance(Duration::from_millis(1000)).await;
    p.relay.poll_once().await;

    let blocks = p.sink.blocks_for("bbo").await;
    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    assert_eq!(block.row_count(), 1);
    assert_eq!(
        block.column_names(),
        vec!["timestamp", "market", "best_bid", "best_bid_size", "best_ask", "best_ask_size"]
    );
    assert_eq!(block.column("market").unwrap().as_strings().unwrap(), ["BTC-EUR"]);
    assert_eq!(block.column("best_bid").unwrap().as_nullable_f64().unwrap()[0], Some(50000.0));
    assert_eq!(block.column("best_bid_size").unwrap().as_nullable_f64().unwrap()[0], None);
    assert_eq!(block.column("best_ask").unwrap().as_nullable_f64().unwrap()[0], Some(50010.5));
    assert_eq!(block.column("best_ask_size").unwrap().as_nullable_f64().unwrap()[0], Some(2.0));
}

#[tokio::test(start_paused = true)]
async fn trade_row_timestamp_comes_from_record_id() {
    let mut p = pipeline().await;

    let id = p
        .publisher
        .publish_trade(&PublicTrade {
            market: "ETH-EUR".to_string(),
            id: "T1".to_string(),
            price: 3000.25,
            amount: 0.5,
            side: Side::Sell,
            timestamp: 1_700_000_000_000,
        })
        .await
        .unwrap();

    p.relay.poll_once().await;
    p.relay.drain().await;

    let blocks = p.sink.blocks_for("trades").await;
    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    assert_eq!(
        block.column_names(),
        vec!["timestamp", "market", "id", "price", "amount", "side"]
    );

    let timestamp = block.column("timestamp").unwrap().as_timestamps().unwrap()[0];
    assert_eq!(timestamp, id.timestamp_millis());
    assert_ne!(timestamp, 1_700_000_000_000);

    assert_eq!(block.column("market").unwrap().as_strings().unwrap(), ["ETH-EUR"]);
    assert_eq!(block.column("id").unwrap().as_strings().unwrap(), ["T1"]);
    assert_eq!(block.column("price").unwrap().as_f64().unwrap()[0], 3000.25);
    assert_eq!(block.column("amount").unwrap().as_f64().unwrap()[0], 0.5);
    assert_eq!(block.column("side").unwrap().as_strings().unwrap(), ["sell"]);
}

#[tokio::test(start_paused = true)]
async fn running_relay_drains_on_shutdown() {
    let p = pipeline().await;
    let Pipeline {
        log,
        sink,
        publisher,
        mut relay,
    } = p;

    let shutdown = CancellationToken::new();
    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { relay.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    for i in 0..3 {
        publisher
            .publish_trade(&PublicTrade {
                market: "BTC-EUR".to_string(),
                id: format!("t{}", i),
                price: 50000.0,
                amount: 0.01,
                side: Side::Buy,
                timestamp: 1_700_000_000_000 + i,
            })
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let stats = handle.await.unwrap();
    assert_eq!(stats.records_read, 3);
    assert_eq!(stats.rows_flushed, 3);
    assert_eq!(sink.row_count("trades").await, 3);
    assert_eq!(sink.row_count("bbo").await, 0);
    assert_eq!(log.len(TRADES_TOPIC).await, 3);
    assert_eq!(log.len(BBO_TOPIC).await, 0);
}

#[tokio::test(start_paused = true)]
async fn per_topic_order_survives_interleaving() {
    let mut p = pipeline().await;

    for i in 0..10 {
        let market = if i % 2 == 0 { "BTC-EUR" } else { "ETH-EUR" };
        p.publisher
            .publish_bbo(&BboUpdate {
                market: market.to_string(),
                best_bid: Some(i as f64),
                best_bid_size: None,
                best_ask: None,
                best_ask_size: None,
            })
            .await
            .unwrap();
        p.publisher
            .publish_trade(&PublicTrade {
                market: market.to_string(),
                id: format!("t{}", i),
                price: 1.0,
                amount: 1.0,
                side: Side::Buy,
                timestamp: i,
            })
            .await
            .unwrap();
    }

    p.relay.poll_once().await;
    p.relay.drain().await;

    let bbo = p.sink.blocks_for("bbo").await;
    let bids = bbo[0].column("best_bid").unwrap().as_nullable_f64().unwrap();
    let expected: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
    assert_eq!(bids, expected.as_slice());

    let trades = p.sink.blocks_for("trades").await;
    let ids = trades[0].column("id").unwrap().as_strings().unwrap();
    let expected: Vec<String> = (0..10).map(|i| format!("t{}", i)).collect();
    assert_eq!(ids, expected.as_slice());
}
