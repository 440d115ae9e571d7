//! FX CLI
//!
//! Command-line currency converter. Wires together:
//! - configuration from `.env`, the environment and flags
//! - the upstream provider (HTTP rates API, or the offline table)
//! - the coalescing rate cache in front of it

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_rates::{CurrencyCode, FixedRateProvider};
use fx_cache::{CacheStats, CoalescingRateCache};
use fx_client::FrankfurterClient;
use fx_types::{CallContext, Conversion, ExchangeRateProvider};

#[derive(Parser)]
#[command(name = "fx")]
#[command(author, version, about = "Currency converter with a coalescing rate cache", long_about = None)]
struct Cli {
    /// Base URL of the rates API (overrides FX_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Cache time-to-live in seconds; zero or negative selects the default
    #[arg(long, allow_negative_numbers = true)]
    ttl_secs: Option<i64>,

    /// How long each conversion may wait, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Use the built-in rate table instead of the rates API
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an amount between two currencies
    Convert {
        /// Amount in the source currency
        amount: Decimal,
        /// Source currency code
        from: String,
        /// Target currency code
        to: String,
        /// Number of sequential rounds to run through the same cache
        #[arg(long, default_value_t = 1)]
        repeat: u32,
        /// Concurrent callers per round
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
    /// List the currencies in the built-in table
    Currencies,
}

#[derive(Serialize)]
struct ConvertOutput<'a> {
    from: &'a str,
    to: &'a str,
    input: Decimal,
    #[serde(flatten)]
    conversion: Conversion,
}

#[derive(Serialize)]
struct CurrencyRow {
    code: &'static str,
    symbol: &'static str,
    minor_units: u32,
}

#[derive(Serialize)]
struct Summary {
    ttl_secs: u64,
    entries: usize,
    stats: CacheStats,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fx_cache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_provider(cli: &Cli, config: &config::Config) -> Result<Arc<dyn ExchangeRateProvider>> {
    if cli.offline {
        tracing::info!("Using built-in rate table");
        return Ok(Arc::new(FixedRateProvider::new()));
    }

    tracing::info!("Using rates API at {}", config.api_url);
    let client = FrankfurterClient::new(&config.api_url).with_timeout(config.timeout)?;
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut config = config::Config::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(secs) = cli.ttl_secs {
        config.cache = fx_cache::CacheConfig::from_ttl_secs(secs);
    }
    if let Some(ms) = cli.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }

    match &cli.command {
        Commands::Currencies => {
            let rows: Vec<CurrencyRow> = CurrencyCode::all()
                .iter()
                .map(|c| CurrencyRow {
                    code: c.code(),
                    symbol: c.symbol(),
                    minor_units: c.minor_units(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }

        Commands::Convert {
            amount,
            from,
            to,
            repeat,
            concurrency,
        } => {
            let provider = build_provider(&cli, &config)?;
            let cache = CoalescingRateCache::with_config(Some(provider), config.cache);

            for round in 1..=*repeat {
                tracing::debug!(round, "Starting conversion round");

                let mut handles = Vec::with_capacity(*concurrency);
                for _ in 0..(*concurrency).max(1) {
                    let cache = cache.clone();
                    let (amount, from, to) = (*amount, from.clone(), to.clone());
                    let ctx = CallContext::new().with_timeout(config.timeout);
                    handles.push(tokio::spawn(async move {
                        cache.convert(&ctx, amount, &from, &to).await
                    }));
                }

                for handle in handles {
                    let conversion = handle.await??;
                    let output = ConvertOutput {
                        from,
                        to,
                        input: *amount,
                        conversion,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }

            let summary = Summary {
                ttl_secs: cache.ttl().as_secs(),
                entries: cache.len(),
                stats: cache.stats(),
            };
            eprintln!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
