//! Gamba command line
//!
//! Inspect the chain tables or run a single bet end-to-end against the
//! configured backends.

use clap::{Parser, Subcommand};
use gamba_betting::{
    chains::{is_deployed, BETTING_CONTRACT},
    config::ConfigLoader,
    errors::BettingError,
    evm::{AlloyConnector, TransportConnector},
    select_backend, ChainKind, ChainRegistry, GambaConfig, PlayOptions,
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

const PRIVATE_KEY_ENV: &str = "GAMBA_PRIVATE_KEY";

/// Gamba betting CLI
#[derive(Parser)]
#[command(name = "gamba")]
#[command(about = "Multi-chain betting from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported chains, tokens and betting deployments
    Chains,

    /// Place one bet and print its settlement as JSON
    Play {
        /// solana, ethereum or bnb
        #[arg(long, default_value = "solana")]
        chain: ChainKind,

        /// Wager in the chain's native currency
        #[arg(short, long, default_value_t = gamba_betting::factory::DEFAULT_WAGER)]
        wager: f64,

        /// Comma separated multipliers, e.g. 0,2,0
        #[arg(short, long, value_delimiter = ',', required = true)]
        bet: Vec<f64>,

        /// Opaque metadata attached to the bet
        #[arg(short, long)]
        meta: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;

    let default_filter = if cli.verbose {
        "gamba_betting=debug,gamba=debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let registry = Arc::new(ChainRegistry::from_config(&config)?);

    match cli.command {
        Commands::Chains => {
            list_chains(&registry);
            Ok(())
        }
        Commands::Play {
            chain,
            wager,
            bet,
            meta,
        } => play(&config, registry, chain, wager, bet, meta).await,
    }
}

fn list_chains(registry: &ChainRegistry) {
    for chain in ChainKind::ALL {
        let Some(config) = registry.chain_config(chain) else {
            continue;
        };

        let contract = registry.resolve(chain, BETTING_CONTRACT);
        let deployment = if is_deployed(contract) {
            contract.to_string()
        } else {
            "not deployed (simulated)".to_string()
        };

        println!("{} ({})", config.name, chain);
        println!("  RPC:       {}", config.rpc_endpoint);
        println!(
            "  Currency:  {} ({} decimals)",
            config.native_currency.symbol, config.native_currency.decimals
        );
        if let Some(chain_id) = config.chain_id {
            println!("  Chain ID:  {}", chain_id);
        }
        println!("  Explorer:  {}", config.block_explorer);
        println!("  Betting:   {}", deployment);

        if let Some(tokens) = registry.chain_tokens(chain) {
            for token in &tokens.tokens {
                println!("    {:<6} {} ({} decimals)", token.symbol, token.address, token.decimals);
            }
        }
        println!();
    }
}

async fn play(
    config: &GambaConfig,
    registry: Arc<ChainRegistry>,
    chain: ChainKind,
    wager: f64,
    bet: Vec<f64>,
    meta: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let confirmations = config.transaction.confirmations;
    let connector = match std::env::var(PRIVATE_KEY_ENV) {
        Ok(key) => AlloyConnector::from_private_key(&key, confirmations)?,
        Err(_) => {
            if chain.is_evm() {
                warn!("{} not set, on-chain bets will have no wallet", PRIVATE_KEY_ENV);
            }
            AlloyConnector::readonly(confirmations)
        }
    };
    let connector: Arc<dyn TransportConnector> = Arc::new(connector);

    let game = select_backend(chain, registry, Some(connector), config);
    if !game.limits.contains(wager) {
        return Err(BettingError::InvalidBet(format!(
            "wager {} outside {} limits [{}, {}]",
            wager, chain, game.limits.min, game.limits.max
        ))
        .into());
    }

    let mut states = game.backend.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            info!(%state, "Bet progress");
        }
    });

    let options = PlayOptions::new(wager, bet).with_metadata(meta);
    game.backend.play(options).await?;
    let settlement = game.backend.result().await?;

    if settlement.is_approximated() {
        warn!("Settlement event missing, payout shown is a local approximation");
    }
    println!("{}", serde_json::to_string_pretty(&settlement)?);

    Ok(())
}
