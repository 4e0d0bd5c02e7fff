use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn redact_host(url: &str) -> String {
    url.split('@')
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("?")
        .to_string()
}

use wager_engine::{
    domain::BetRequest,
    monitoring,
    sweep,
    types::{AppConfig, CacheBackend},
    utils::time::{Clock, SystemClock},
    validation::{ValidationMode, ValidationParams, Validator},
};

#[derive(Parser, Debug)]
#[command(name = "wager-engine")]
#[command(about = "Sports wager validation and settlement engine", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Override the event cache backend (memory/redis)
    #[arg(long)]
    cache: Option<CacheBackend>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Settle pending bets in one sequential pass
    Sweep {
        /// Maximum number of pending bets to examine
        #[arg(short, long)]
        limit: Option<i64>,
    },
    /// Settle a single bet by id
    Settle { bet_id: Uuid },
    /// Report whether an event has started
    CheckStart {
        #[arg(long)]
        league: String,
        #[arg(long)]
        event_id: String,
        /// Scheduled start, RFC 3339
        #[arg(long)]
        start: DateTime<Utc>,
    },
    /// Validate a bet request read from a JSON file
    Validate {
        request: String,
        /// Skip the odds check, as for parlay legs
        #[arg(long)]
        line_only: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "wager_engine=debug,engine=debug,info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(target: "engine", "wager-engine starting");

    let cli = Cli::parse();
    tracing::debug!(target: "engine", config = %cli.config, "loading config");

    let mut settings = AppConfig::from_file(&cli.config)?;
    tracing::info!(
        target: "engine",
        config = %cli.config,
        provider = %settings.provider.base_url,
        postgres_host = redact_host(&settings.postgres.url),
        "config loaded"
    );

    if let Some(cache) = cli.cache {
        settings.cache.backend = cache;
    }
    monitoring::logger::log_startup(&settings);

    match cli.command.unwrap_or(Commands::Sweep { limit: None }) {
        Commands::Sweep { limit } => {
            let report = sweep::run_sweep_job(&settings, limit).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Settle { bet_id } => {
            let settlement = sweep::settle_one(&settings, bet_id).await?;
            println!("{}", serde_json::to_string_pretty(&settlement)?);
        }
        Commands::CheckStart {
            league,
            event_id,
            start,
        } => {
            let validator = build_validator(&settings).await?;
            let check = validator.check_game_started(&league, &event_id, start).await;
            println!("{}", serde_json::to_string_pretty(&check)?);
        }
        Commands::Validate { request: path, line_only } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read bet request at {path}"))?;
            let request: BetRequest = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse bet request at {path}"))?;
            let mode = if line_only {
                ValidationMode::LineOnly
            } else {
                ValidationMode::Full
            };
            let validator = build_validator(&settings).await?;
            let result = validator.validate_bet(&request, mode).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

async fn build_validator(settings: &AppConfig) -> anyhow::Result<Validator> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gateway = sweep::build_gateway(settings, clock.clone()).await?;
    Ok(Validator::new(
        gateway,
        clock,
        ValidationParams::from(&settings.validation),
    ))
}
