use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, error};

use insyte::date::{self, Clock, SystemClock};
use insyte::logging::init_logging;
use insyte::{
    CounterStore, Event, EventValue, EventTracker, RedisStore, StoreConfig, TrackerConfig,
};

/// Track and count named events in Redis
#[derive(Parser)]
#[command(name = "insyte", version)]
#[command(about = "Track and count named events in Redis", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count one occurrence of an event
    Track {
        /// Event name, e.g. page-view
        name: String,

        #[arg(long)]
        page: Option<String>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        device: Option<String>,

        #[arg(long)]
        os: Option<String>,

        /// Extra field as KEY=VALUE; VALUE is read as JSON when it parses, text otherwise
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, EventValue)>,

        /// Count under the persisted key, without expiry
        #[arg(long)]
        persist: bool,
    },
    /// Show counts for one day
    Get {
        name: String,

        /// Day as dd/MM/yyyy (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Show counts for the last N days, oldest first
    Days {
        name: String,

        #[arg(short = 'n', long = "days", default_value = "1")]
        days: u32,
    },
    /// Show persisted counts
    Totals { name: String },
    /// Check the connection to Redis
    Ping,
}

fn parse_field(raw: &str) -> Result<(String, EventValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }

    let value = serde_json::from_str::<EventValue>(value)
        .unwrap_or_else(|_| EventValue::from(value));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command).await {
        error!("{:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    // Validate the environment before touching anything else
    let store_config = StoreConfig::from_env().context("Invalid store configuration")?;
    let tracker_config = TrackerConfig::from_env().context("Invalid tracker configuration")?;
    debug!("Using retention of {}s", tracker_config.retention);

    let store = RedisStore::connect(&store_config)
        .await
        .context("Failed to connect to Redis")?;

    let tracker = EventTracker::with_config(store, tracker_config);

    match command {
        Commands::Track {
            name,
            page,
            country,
            device,
            os,
            fields,
            persist,
        } => {
            let mut event = Event::new();
            let named = [("page", page), ("country", country), ("device", device), ("os", os)];
            for (key, value) in named {
                if let Some(value) = value {
                    event.insert(key, value);
                }
            }
            for (key, value) in fields {
                event.insert(key, value);
            }

            tracker.track(&name, &event, persist).await?;
        }
        Commands::Get { name, date: day } => {
            let day = match day {
                Some(day) => {
                    // Reject anything that would not match a stored key
                    date::parse_date(&day)?;
                    day
                }
                None => date::format_date(SystemClock.today()),
            };
            print_json(&tracker.retrieve(&name, &day).await?)?;
        }
        Commands::Days { name, days } => {
            print_json(&tracker.retrieve_days(&name, days).await?)?;
        }
        Commands::Totals { name } => {
            print_json(&tracker.retrieve_persisted(&name).await?)?;
        }
        Commands::Ping => {
            let status = tracker.store().health_check().await?;
            print_json(&status)?;
            if !status.healthy {
                anyhow::bail!("Redis is unhealthy");
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
