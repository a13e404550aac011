//! GoalGPT CLI - AI match predictions, bot statistics and live scores
//!
//! A thin command-line driver over the `goalgpt` library: it wires the API
//! client to the on-disk TTL cache and follows live scores over WebSocket.

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tokio::time::{interval, sleep};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use goalgpt::api::ApiClient;
use goalgpt::cache::TtlCache;
use goalgpt::cli::{Action, AppConfig, Cli};
use goalgpt::data::{BotStats, MatchStatus, Prediction};
use goalgpt::filter::{filter_predictions, tab_counts, DateBoundaries, DateFilter};
use goalgpt::live::{merge_live_updates, ConnectionState, LiveFeed, MatchUpdate};
use goalgpt::store::FileStore;

/// Sets up stderr logging controlled by `RUST_LOG` (default: warnings only)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the on-disk cache unless caching is disabled
fn build_cache(config: &AppConfig) -> Option<TtlCache> {
    if !config.use_cache {
        return None;
    }
    let store = match &config.cache_dir {
        Some(dir) => FileStore::with_dir(dir.clone()),
        None => FileStore::new()?,
    };
    debug!(dir = %store.dir().display(), "using cache directory");
    Some(TtlCache::new(Arc::new(store)))
}

fn print_predictions(records: &[Arc<Prediction>]) {
    if records.is_empty() {
        println!("No predictions.");
        return;
    }
    for p in records {
        let status = match (p.status(), p.minute) {
            (Some(MatchStatus::Live), Some(minute)) => format!("{}'", minute),
            (Some(status), _) => status.to_string(),
            (None, _) => "?".to_string(),
        };
        println!(
            "{:<10} {:<22} {:>20} {:^7} {:<20} {:<12} {:<14} {:?}",
            status,
            p.league,
            p.home_team,
            p.score_line(),
            p.away_team,
            p.bot_name,
            p.prediction,
            p.result,
        );
    }
}

fn print_bot_stats(stats: &[BotStats]) {
    println!(
        "{:<20} {:>6} {:>6} {:>6} {:>8} {:>9}",
        "Bot", "Total", "Won", "Lost", "Pending", "Win rate"
    );
    for bot in stats {
        let rate = bot
            .win_rate()
            .map(|r| format!("{:.1}%", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:>6} {:>6} {:>6} {:>8} {:>9}",
            bot.bot_name, bot.total, bot.won, bot.lost, bot.pending, rate
        );
    }
}

async fn run_predictions(
    config: &AppConfig,
    client: &ApiClient,
    filter: DateFilter,
    live_secs: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let records: Vec<Arc<Prediction>> = client
        .fetch_predictions()
        .await?
        .into_iter()
        .map(Arc::new)
        .collect();

    let now = Local::now();
    let boundaries = DateBoundaries::at(&now);
    let tz = now.timezone();
    let counts = tab_counts(&records, &boundaries, &tz);
    let shown = filter_predictions(&records, filter, &boundaries, &tz);

    let tabs: Vec<String> = DateFilter::ALL
        .iter()
        .map(|f| {
            let marker = if *f == filter { "*" } else { " " };
            format!("{}{} ({})", marker, f.label(), counts.get(*f))
        })
        .collect();
    println!("{}\n", tabs.join("  "));
    print_predictions(&shown);

    let Some(secs) = live_secs else {
        return Ok(());
    };

    let ids: Vec<String> = shown.iter().filter_map(|p| p.match_id.clone()).collect();
    if ids.is_empty() {
        println!("\nNothing to follow live.");
        return Ok(());
    }

    let mut feed = LiveFeed::new(config.ws_url.clone());
    let mut connection = feed.watch_connection();
    feed.track(ids).await;
    info!(secs, "following live scores");

    let deadline = sleep(Duration::from_secs(secs));
    tokio::pin!(deadline);
    let mut poll = interval(Duration::from_secs(1));
    let mut last_seen: HashMap<String, MatchUpdate> = HashMap::new();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *connection.borrow_and_update();
                if state == ConnectionState::Reconnecting {
                    eprintln!("[live] connection lost, reconnecting...");
                } else if state == ConnectionState::Connected {
                    eprintln!("[live] connected");
                }
            }
            _ = poll.tick() => {
                let updates = feed.updates().await;
                if updates != last_seen {
                    println!("\n--- {} ---", Local::now().format("%H:%M:%S"));
                    print_predictions(&merge_live_updates(&shown, &updates));
                    last_seen = updates;
                }
            }
        }
    }

    feed.disconnect().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let cli = Cli::parse();
    let config = match AppConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let cache = build_cache(&config);
    let mut client = ApiClient::new(config.api_url.clone());
    if let Some(ref cache) = cache {
        client = client.with_cache(cache.clone());
    }

    match config.action.clone() {
        Action::Predictions { filter, live_secs } => {
            run_predictions(&config, &client, filter, live_secs).await?;
        }
        Action::Bots => {
            let stats = client.fetch_bot_stats().await?;
            print_bot_stats(&stats);
        }
        Action::ClearCache { prefix } => {
            let Some(cache) = cache else {
                eprintln!("error: cache is disabled or no cache directory is available");
                std::process::exit(2);
            };
            let removed = cache.invalidate_all(prefix.as_deref()).await?;
            println!("Removed {} cache entries", removed);
        }
    }

    Ok(())
}
