//! Command-line interface parsing for the GoalGPT client
//!
//! This module handles parsing of CLI arguments using clap. Every connection
//! setting can also come from the environment so the same binary works
//! against staging and production.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::api::DEFAULT_API_URL;
use crate::filter::DateFilter;
use crate::live::feed::DEFAULT_WS_URL;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified date filter is not recognized
    #[error("Invalid filter: '{0}'. Valid filters: all, today, yesterday, month")]
    InvalidFilter(String),

    /// A live window of zero seconds was requested
    #[error("Invalid live window: must be at least 1 second")]
    InvalidLiveWindow,
}

/// GoalGPT - AI match predictions, bot statistics and live scores
#[derive(Parser, Debug)]
#[command(name = "goalgpt")]
#[command(about = "GoalGPT predictions, bot statistics and live scores")]
#[command(version)]
pub struct Cli {
    /// Base URL of the GoalGPT REST API
    #[arg(long, env = "GOALGPT_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// URL of the live score WebSocket feed
    #[arg(long, env = "GOALGPT_WS_URL", default_value = DEFAULT_WS_URL, global = true)]
    pub ws_url: String,

    /// Directory for cached responses (defaults to the platform cache dir)
    #[arg(long, env = "GOALGPT_CACHE_DIR", value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Bypass the response cache entirely
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List predictions, optionally following live scores
    ///
    /// Examples:
    ///   goalgpt predictions                  # All predictions
    ///   goalgpt predictions --filter today   # Only today's predictions
    ///   goalgpt predictions --live 90        # Follow live scores for 90 seconds
    Predictions {
        /// Date filter: all, today, yesterday, month
        #[arg(long, default_value = "all")]
        filter: String,

        /// Follow live score updates for this many seconds
        #[arg(long, value_name = "SECS")]
        live: Option<u64>,
    },

    /// Show per-bot prediction statistics
    Bots,

    /// Manage the local response cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Remove cached entries
    Clear {
        /// Only remove keys starting with this prefix (e.g. "bots:")
        #[arg(long)]
        prefix: Option<String>,
    },
}

/// What the binary should do, validated from CLI arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Predictions {
        filter: DateFilter,
        live_secs: Option<u64>,
    },
    Bots,
    ClearCache {
        prefix: Option<String>,
    },
}

/// Connection and cache settings derived from CLI arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    pub ws_url: String,
    pub cache_dir: Option<PathBuf>,
    pub use_cache: bool,
    pub action: Action,
}

/// Parses a filter string argument into a DateFilter.
///
/// # Arguments
/// * `s` - The filter string from CLI
///
/// # Returns
/// * `Ok(DateFilter)` if the string matches a valid filter
/// * `Err(CliError::InvalidFilter)` if the string doesn't match
pub fn parse_filter_arg(s: &str) -> Result<DateFilter, CliError> {
    DateFilter::from_str(s).ok_or_else(|| CliError::InvalidFilter(s.to_string()))
}

impl AppConfig {
    /// Creates an AppConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(AppConfig)` with validated settings
    /// * `Err(CliError)` if a filter or live window is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let action = match &cli.command {
            Command::Predictions { filter, live } => {
                if *live == Some(0) {
                    return Err(CliError::InvalidLiveWindow);
                }
                Action::Predictions {
                    filter: parse_filter_arg(filter)?,
                    live_secs: *live,
                }
            }
            Command::Bots => Action::Bots,
            Command::Cache {
                action: CacheCommand::Clear { prefix },
            } => Action::ClearCache {
                prefix: prefix.clone(),
            },
        };

        Ok(AppConfig {
            api_url: cli.api_url.clone(),
            ws_url: cli.ws_url.clone(),
            cache_dir: cli.cache_dir.clone(),
            use_cache: !cli.no_cache,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_arg_valid() {
        assert_eq!(parse_filter_arg("all").unwrap(), DateFilter::All);
        assert_eq!(parse_filter_arg("today").unwrap(), DateFilter::Today);
        assert_eq!(parse_filter_arg("yesterday").unwrap(), DateFilter::Yesterday);
        assert_eq!(parse_filter_arg("month").unwrap(), DateFilter::ThisMonth);
    }

    #[test]
    fn test_parse_filter_arg_invalid() {
        let err = parse_filter_arg("week").unwrap_err();
        assert!(err.to_string().contains("Invalid filter"));
        assert!(err.to_string().contains("week"));
    }

    #[test]
    fn test_cli_parse_predictions_defaults() {
        let cli = Cli::parse_from(["goalgpt", "predictions"]);
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.action,
            Action::Predictions {
                filter: DateFilter::All,
                live_secs: None
            }
        );
        assert!(config.use_cache);
    }

    #[test]
    fn test_cli_parse_predictions_with_live() {
        let cli = Cli::parse_from(["goalgpt", "predictions", "--filter", "today", "--live", "90"]);
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.action,
            Action::Predictions {
                filter: DateFilter::Today,
                live_secs: Some(90)
            }
        );
    }

    #[test]
    fn test_zero_live_window_rejected() {
        let cli = Cli::parse_from(["goalgpt", "predictions", "--live", "0"]);
        assert!(matches!(
            AppConfig::from_cli(&cli),
            Err(CliError::InvalidLiveWindow)
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "goalgpt",
            "bots",
            "--api-url",
            "http://localhost:3000",
            "--no-cache",
        ]);
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(config.api_url, "http://localhost:3000");
        assert!(!config.use_cache);
        assert_eq!(config.action, Action::Bots);
    }

    #[test]
    fn test_cache_clear_with_prefix() {
        let cli = Cli::parse_from(["goalgpt", "cache", "clear", "--prefix", "bots:"]);
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.action,
            Action::ClearCache {
                prefix: Some("bots:".to_string())
            }
        );
    }
}
