//! OANDA account probe
//!
//! Read-only CLI over the REST client: account summary, instrument list,
//! candles and single trade lookup. Nothing here places or closes orders.
//!
//! # Usage
//! ```sh
//! cargo run --bin oanda -- summary
//! cargo run --bin oanda -- instruments --save instruments.json
//! cargo run --bin oanda -- candles EUR_USD --granularity M15 --count 50 --csv eur_usd.csv
//! ```
//!
//! # Environment Variables
//! - `OANDA_API_KEY` - Bearer token
//! - `OANDA_ACCOUNT_ID` - Account to query
//! - `OANDA_ENVIRONMENT` - `practice` (default) or `live`
//! - `OANDA_API_BASE_URL` - Overrides the environment's base URL

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oandatrade::config::OandaConfig;
use oandatrade::domain::market::candle::{CandleQuery, PriceComponents};
use oandatrade::domain::market::granularity::Granularity;
use oandatrade::domain::trading::instrument::InstrumentCollection;
use oandatrade::infrastructure::OandaClient;
use std::fs::File;
use std::str::FromStr;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "OANDA v20 account probe", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the account summary
    Summary,
    /// List tradable instruments for the account
    Instruments {
        /// Write the instrument table to this JSON file
        #[arg(long)]
        save: Option<String>,
    },
    /// Fetch complete candles for an instrument
    Candles {
        /// Instrument name, e.g. EUR_USD
        pair: String,

        /// Granularity code (S5 .. H1 .. D, W, M)
        #[arg(short, long, default_value = "H1")]
        granularity: String,

        /// Number of candles
        #[arg(short, long, default_value = "10")]
        count: u32,

        /// Price components: any of M, B, A
        #[arg(short, long, default_value = "MBA")]
        price: String,

        /// Write the candle table to this CSV file instead of stdout
        #[arg(long)]
        csv: Option<String>,
    },
    /// Show a single trade
    Trade {
        /// Trade id
        trade_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let config = OandaConfig::from_env()?;
    config.validate()?;
    info!("Using {:?}", config);

    let client = OandaClient::new(config, InstrumentCollection::new())?;

    match cli.command {
        Commands::Summary => {
            let summary = client
                .get_account_summary()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e.payload()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Instruments { save } => {
            let instruments = client
                .get_account_instruments()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e.payload()))?;
            let collection = InstrumentCollection::from_instruments(instruments);

            for name in collection.names() {
                println!("{}", name);
            }
            if let Some(path) = save {
                collection.save_file(&path)?;
                info!("Saved {} instruments to {}", collection.len(), path);
            }
        }
        Commands::Candles {
            pair,
            granularity,
            count,
            price,
            csv,
        } => {
            let query = CandleQuery::new()
                .with_count(count)
                .with_granularity(Granularity::from_str(&granularity)?)
                .with_price(PriceComponents::from_str(&price)?);

            let frame = client.get_candles_df(&pair, &query).await;
            info!("Fetched {} complete candles for {}", frame.len(), pair);

            match csv {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path))?;
                    frame.write_csv(file)?;
                }
                None => frame.write_csv(std::io::stdout())?,
            }
        }
        Commands::Trade { trade_id } => {
            match client
                .get_open_trades(&trade_id)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e.payload()))?
            {
                Some(trade) => println!("{}", trade),
                None => println!("Trade {} not found", trade_id),
            }
        }
    }

    Ok(())
}
