//! WebSocket subscription for live match updates
//!
//! A `LiveFeed` owns at most one background subscription task. The task keeps
//! a connection open, re-subscribes after every reconnect, and writes each
//! update into the shared `LiveState`. Connection health is published on a
//! `watch` channel rather than raised as an error.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use super::wire::{parse_feed_message, FeedMessage, SubscribeCommand};
use super::{LiveState, MatchUpdate};

/// Default production live feed endpoint
pub const DEFAULT_WS_URL: &str = "wss://api.goalgpt.app/ws";

/// First reconnect delay
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound for the reconnect delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Health of the live feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No subscription is running
    #[default]
    Idle,
    /// First connection attempt in progress
    Connecting,
    /// Socket open and subscribed
    Connected,
    /// Connection lost; waiting to retry or retrying
    Reconnecting,
}

/// Errors that end a single connection attempt
#[derive(Debug, Error)]
pub enum FeedError {
    /// WebSocket handshake or transport failed
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Subscription command could not be encoded
    #[error("failed to encode subscription: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Handle to a running subscription task
struct Subscription {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// Live score subscription keyed by match id
pub struct LiveFeed {
    url: String,
    state: Arc<RwLock<LiveState>>,
    connection_tx: Arc<watch::Sender<ConnectionState>>,
    subscription: Option<Subscription>,
}

impl std::fmt::Debug for LiveFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFeed")
            .field("url", &self.url)
            .field("connection", &*self.connection_tx.borrow())
            .field("running", &self.subscription.is_some())
            .finish()
    }
}

impl LiveFeed {
    /// Creates an idle feed for the given `ws://` or `wss://` URL
    pub fn new(url: impl Into<String>) -> Self {
        let (connection_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            url: url.into(),
            state: Arc::new(RwLock::new(LiveState::new())),
            connection_tx: Arc::new(connection_tx),
            subscription: None,
        }
    }

    /// Tracks exactly `ids`, replacing any previous subscription
    ///
    /// If the set is unchanged and a subscription is already running this is
    /// a no-op. Otherwise the old task is shut down and awaited, pending
    /// updates are discarded, and a fresh task is started (unless `ids` is
    /// empty, which leaves the feed idle).
    pub async fn track<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: BTreeSet<String> = ids.into_iter().map(Into::into).collect();

        if *self.state.read().await.tracked() == ids
            && (self.subscription.is_some() || ids.is_empty())
        {
            return;
        }

        self.stop().await;
        {
            let mut state = self.state.write().await;
            state.retrack(ids.clone());
            state.clear();
        }

        if ids.is_empty() {
            self.connection_tx.send_replace(ConnectionState::Idle);
            return;
        }

        self.spawn(ids.into_iter().collect());
    }

    /// Stops the subscription and drops every pending update
    pub async fn disconnect(&mut self) {
        self.stop().await;
        self.state.write().await.clear();
        self.connection_tx.send_replace(ConnectionState::Idle);
        info!("live feed disconnected");
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection_tx.borrow()
    }

    /// Receiver that observes connection state changes
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_tx.subscribe()
    }

    /// Snapshot of the latest update per tracked match
    pub async fn updates(&self) -> HashMap<String, MatchUpdate> {
        self.state.read().await.updates().clone()
    }

    pub async fn tracked(&self) -> BTreeSet<String> {
        self.state.read().await.tracked().clone()
    }

    fn spawn(&mut self, ids: Vec<String>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        self.connection_tx.send_replace(ConnectionState::Connecting);

        let task = tokio::spawn(run_subscription(
            self.url.clone(),
            ids,
            Arc::clone(&self.state),
            Arc::clone(&self.connection_tx),
            shutdown_rx,
        ));

        self.subscription = Some(Subscription { shutdown_tx, task });
    }

    async fn stop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        let _ = subscription.shutdown_tx.send(()).await;
        if let Err(e) = subscription.task.await {
            warn!(error = %e, "live feed task ended abnormally");
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.task.abort();
        }
    }
}

/// Reconnect delay: doubles after each failed attempt up to `MAX_BACKOFF`
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current: INITIAL_BACKOFF,
        }
    }

    /// Returns the delay to wait now and doubles the next one
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_BACKOFF);
        delay
    }

    fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
    }
}

/// Connect/stream/backoff loop for one tracked set
async fn run_subscription(
    url: String,
    ids: Vec<String>,
    state: Arc<RwLock<LiveState>>,
    connection_tx: Arc<watch::Sender<ConnectionState>>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut backoff = Backoff::new();

    loop {
        debug!(url = %url, matches = ids.len(), "connecting to live feed");

        tokio::select! {
            result = connect_and_stream(&url, &ids, &state, &connection_tx) => {
                // only this task moves the state to Connected while it runs
                if *connection_tx.borrow() == ConnectionState::Connected {
                    backoff.reset();
                }
                match result {
                    Ok(()) => info!("live feed closed by server"),
                    Err(e) => warn!(error = %e, "live feed connection failed"),
                }
            }
            _ = shutdown_rx.recv() => break,
        }

        connection_tx.send_replace(ConnectionState::Reconnecting);

        let delay = backoff.next_delay();
        debug!(retry_in = ?delay, "live feed reconnect scheduled");
        tokio::select! {
            _ = sleep(delay) => {}
            _ = shutdown_rx.recv() => break,
        }
    }

    debug!("live feed task stopped");
}

async fn connect_and_stream(
    url: &str,
    ids: &[String],
    state: &RwLock<LiveState>,
    connection_tx: &watch::Sender<ConnectionState>,
) -> Result<(), FeedError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    let subscribe = serde_json::to_string(&SubscribeCommand::new(ids.iter().map(String::as_str)))?;
    write.send(Message::Text(subscribe.into())).await?;

    connection_tx.send_replace(ConnectionState::Connected);
    info!(matches = ids.len(), "live feed connected");

    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => handle_text(&text, state).await,
            Message::Ping(data) => write.send(Message::Pong(data)).await?,
            Message::Close(_) => {
                debug!("live feed close frame received");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

async fn handle_text(text: &str, state: &RwLock<LiveState>) {
    match parse_feed_message(text) {
        Ok(FeedMessage::MatchUpdate(update)) => {
            let match_id = update.match_id.clone();
            if state.write().await.apply(update) {
                debug!(match_id = %match_id, "live update applied");
            } else {
                debug!(match_id = %match_id, "update for untracked match ignored");
            }
        }
        Ok(FeedMessage::Other(kind)) => {
            debug!(kind = %kind, "live feed message ignored");
        }
        Err(e) => {
            let raw: String = text.chars().take(200).collect();
            warn!(error = %e, raw = %raw, "malformed live feed message");
        }
    }
}
