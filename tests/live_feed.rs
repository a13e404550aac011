//! End-to-end live feed tests against a local WebSocket server

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use goalgpt::data::{MatchStatus, Prediction, PredictionResult, STATUS_FIRST_HALF};
use goalgpt::live::{merge_live_updates, ConnectionState, LiveFeed, MatchUpdate};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Starts a one-connection server that reports the subscribe frame and then
/// pushes `frames` to the client
async fn spawn_server(frames: Vec<String>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (subscribed_tx, subscribed_rx) = mpsc::channel(4);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        if let Some(Ok(Message::Text(text))) = ws.next().await {
            let _ = subscribed_tx.send(text.to_string()).await;
        }
        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        // hold the connection open until the client goes away
        while let Some(Ok(_)) = ws.next().await {}
    });

    (format!("ws://{}", addr), subscribed_rx)
}

async fn wait_for_updates(feed: &LiveFeed, count: usize) -> HashMap<String, MatchUpdate> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let updates = feed.updates().await;
            if updates.len() >= count {
                return updates;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("timed out waiting for live updates")
}

async fn next_event(events: &mut mpsc::Receiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for server event")
        .expect("server task ended")
}

fn prediction(id: &str, match_id: Option<&str>) -> Arc<Prediction> {
    Arc::new(Prediction {
        id: id.to_string(),
        match_id: match_id.map(str::to_string),
        bot_name: "Alert D".to_string(),
        league: "Süper Lig".to_string(),
        home_team: "Galatasaray".to_string(),
        away_team: "Fenerbahçe".to_string(),
        prediction: "MS 1.5 ÜST".to_string(),
        confidence: None,
        home_score: Some(0),
        away_score: Some(0),
        status_id: STATUS_FIRST_HALF,
        minute: Some(5),
        result: PredictionResult::Pending,
        created_at: Utc::now(),
    })
}

#[tokio::test]
async fn test_feed_subscribes_and_applies_tracked_updates() {
    let frames = vec![
        r#"{"type":"welcome"}"#.to_string(),
        r#"{"type":"match_update","data":{"matchId":"99","homeScore":5}}"#.to_string(),
        r#"{"type":"match_update","data":{"homeScore":1}}"#.to_string(),
        r#"{"type":"match_update","data":{"matchId":"42","homeScore":2,"awayScore":1,"status":"live","minute":67}}"#.to_string(),
        r#"{"type":"match_update","data":{"matchId":7,"status":"halftime"}}"#.to_string(),
    ];
    let (url, mut subscribed) = spawn_server(frames).await;

    let mut feed = LiveFeed::new(url);
    feed.track(["42", "7"]).await;

    let subscribe = tokio::time::timeout(Duration::from_secs(5), subscribed.recv())
        .await
        .expect("no subscribe frame")
        .expect("server dropped");
    let subscribe: serde_json::Value = serde_json::from_str(&subscribe).unwrap();
    assert_eq!(subscribe["type"], "subscribe");
    assert_eq!(subscribe["matchIds"], serde_json::json!(["42", "7"]));

    let updates = wait_for_updates(&feed, 2).await;
    assert_eq!(feed.connection_state(), ConnectionState::Connected);
    assert!(!updates.contains_key("99"), "untracked match must be ignored");

    let records = vec![
        prediction("a", Some("42")),
        prediction("b", None),
        prediction("c", Some("7")),
    ];
    let merged = merge_live_updates(&records, &updates);

    assert_eq!(merged[0].home_score, Some(2));
    assert_eq!(merged[0].away_score, Some(1));
    assert_eq!(merged[0].minute, Some(67));
    assert!(Arc::ptr_eq(&merged[1], &records[1]));
    assert_eq!(merged[2].status_id, 3);
    assert_eq!(merged[2].home_score, Some(0));

    feed.disconnect().await;
    assert!(feed.updates().await.is_empty());
    assert_eq!(feed.connection_state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_retrack_starts_clean_subscription() {
    let (first_url, _first_sub) = spawn_server(vec![
        r#"{"type":"match_update","data":{"matchId":"1","status":"live"}}"#.to_string(),
    ])
    .await;

    let mut feed = LiveFeed::new(first_url);
    feed.track(["1"]).await;
    wait_for_updates(&feed, 1).await;

    feed.track(["2"]).await;

    assert!(feed.updates().await.is_empty());
    assert_eq!(feed.tracked().await.into_iter().collect::<Vec<_>>(), vec!["2"]);
    feed.disconnect().await;
}

#[tokio::test]
async fn test_reconnect_resubscribes_and_keeps_updates() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events_tx, mut events) = mpsc::channel::<String>(8);

    tokio::spawn(async move {
        // first connection: one update, a heartbeat, then a clean close
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        if let Some(Ok(Message::Text(text))) = ws.next().await {
            events_tx.send(text.to_string()).await.unwrap();
        }
        ws.send(Message::Text(
            r#"{"type":"match_update","data":{"matchId":"7","status":"halftime"}}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Ping(b"hb".to_vec().into())).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Pong(payload) = message {
                events_tx
                    .send(format!("pong:{}", String::from_utf8_lossy(&payload)))
                    .await
                    .unwrap();
                break;
            }
        }
        ws.send(Message::Close(None)).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}

        // second connection: must subscribe again before receiving updates
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        if let Some(Ok(Message::Text(text))) = ws.next().await {
            events_tx.send(text.to_string()).await.unwrap();
        }
        ws.send(Message::Text(
            r#"{"type":"match_update","data":{"matchId":"42","homeScore":1,"status":"live","minute":12}}"#
                .into(),
        ))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let mut feed = LiveFeed::new(format!("ws://{}", addr));
    feed.track(["42", "7"]).await;

    let first: serde_json::Value = serde_json::from_str(&next_event(&mut events).await).unwrap();
    assert_eq!(first["type"], "subscribe");
    assert_eq!(next_event(&mut events).await, "pong:hb");

    let second: serde_json::Value = serde_json::from_str(&next_event(&mut events).await).unwrap();
    assert_eq!(second, first, "same set must be resubscribed after reconnect");

    let updates = wait_for_updates(&feed, 2).await;
    assert_eq!(updates["7"].status, Some(MatchStatus::Halftime));
    assert_eq!(updates["42"].home_score, Some(1));
    assert_eq!(feed.connection_state(), ConnectionState::Connected);

    feed.disconnect().await;
}

#[tokio::test]
async fn test_backoff_restarts_after_each_established_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events_tx, mut events) = mpsc::channel::<String>(8);

    tokio::spawn(async move {
        for _ in 0..4 {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                events_tx.send(text.to_string()).await.unwrap();
            }
            // drop without a close handshake so the client sees an error
            drop(ws);
        }
    });

    let mut feed = LiveFeed::new(format!("ws://{}", addr));
    feed.track(["1"]).await;

    next_event(&mut events).await;
    let started = Instant::now();
    for _ in 0..3 {
        next_event(&mut events).await;
    }

    // three 1s waits; without a reset this would take 1 + 2 + 4 seconds
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "reconnects took {:?}",
        started.elapsed()
    );
    feed.disconnect().await;
}
