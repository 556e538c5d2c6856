use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use td_sensors::config::entry_config::EntryConfig;
use td_sensors::provider::BrokerageProvider;
use td_sensors::runtime::{host::Host, state_store::StateStore};
use td_sensors::scheduling::types::{PollCadence, PollPlan};
use td_sensors::sensors::{
    available_funds::AvailableFundsSensor,
    market_open::{MARKET_ENTITY_ID, MarketOpenSensor},
};
use td_sensors::services::{self, place_order::PlaceOrderCall};
use td_sensors::tda::{tda_client::TdaClient, tda_config::TdaConfig};
use td_sensors::types::order::Instruction;

#[derive(Debug, Clone, Parser)]
struct Args {
    #[arg(long, global = true, default_value = "tdameritrade.yml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Poll the market and account sensors until interrupted.
    Run,

    /// Fetch a quote and print it.
    Quote {
        #[arg(long)]
        symbol: String,
    },

    /// Place a single-leg order.
    PlaceOrder {
        #[arg(long)]
        account_id: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        instruction: Instruction,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long, default_value = "LIMIT")]
        order_type: String,
        #[arg(long, default_value = "NORMAL")]
        session: String,
        #[arg(long, default_value = "DAY")]
        duration: String,
        #[arg(long, default_value = "SINGLE")]
        order_strategy_type: String,
        #[arg(long, default_value = "EQUITY")]
        asset_type: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("td_sensors=info".parse().unwrap())
                .add_directive("td_sensors::scheduling=debug".parse().unwrap()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let entry = EntryConfig::load(&args.config)?;
    let provider: Arc<dyn BrokerageProvider> =
        Arc::new(TdaClient::new(TdaConfig::from_entry(&entry)?));

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(&entry, provider).await,
        Command::Quote { symbol } => {
            let store = StateStore::new();
            let quote = services::get_quote::get_quote(provider.as_ref(), &store, &symbol).await?;
            println!("{}", serde_json::to_string_pretty(&quote.raw)?);
            Ok(())
        }
        Command::PlaceOrder {
            account_id,
            symbol,
            instruction,
            quantity,
            price,
            order_type,
            session,
            duration,
            order_strategy_type,
            asset_type,
        } => {
            let call = PlaceOrderCall {
                price,
                instruction,
                quantity,
                symbol,
                account_id,
                order_type,
                session,
                duration,
                order_strategy_type,
                asset_type,
            };
            let placement = services::place_order::place_order(provider.as_ref(), &call).await?;
            match placement.order_id {
                Some(order_id) => println!("order placed: {order_id}"),
                None => println!("order placed"),
            }
            Ok(())
        }
    }
}

async fn run(entry: &EntryConfig, provider: Arc<dyn BrokerageProvider>) -> Result<()> {
    let store = StateStore::new();
    let mut state_log_receiver = store.subscribe();

    tokio::spawn(async move {
        loop {
            match state_log_receiver.recv().await {
                Ok(change) => info!(
                    entity_id = %change.entity_id,
                    state = %change.new.state,
                    available = change.new.is_available(),
                    "state changed"
                ),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "state logger lagged; dropped changes");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut host = Host::new(store, MARKET_ENTITY_ID);

    host.attach(
        Box::new(MarketOpenSensor::new(provider.clone(), entry.asset_class.clone())),
        PollPlan::Fixed(entry.market_interval()),
    )?;

    for account_id in &entry.accounts {
        host.attach(
            Box::new(AvailableFundsSensor::new(provider.clone(), account_id.clone())),
            PollPlan::FollowMarket {
                intervals: entry.cadence_intervals(),
                initial: PollCadence::Slow,
            },
        )?;
    }

    info!(accounts = entry.accounts.len(), asset_class = %entry.asset_class, "sensors attached");

    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    host.detach_all().await;

    Ok(())
}
