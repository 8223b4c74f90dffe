//! Spin Machine simulator
//!
//! Runs a seeded population of players against a machine behind the
//! serialized service and prints a JSON summary.

use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use spin_machine::{
    config::{generate_sample_config, sample_config},
    errors::LedgerError,
    Address, CallContext, ConfigLoader, InMemoryLedger, MachineService, MetricsSnapshot, RandomnessMode,
    SpinError, SpinMachine, TokenLedger,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "spin-machine")]
#[command(about = "Resource-gated reward engine simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a number of rounds with a seeded set of players
    Simulate {
        /// TOML configuration file; a built-in sample is used when absent
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of players
        #[arg(long, default_value = "10")]
        players: usize,

        /// Number of rounds; every player draws once per round
        #[arg(long, default_value = "30")]
        rounds: u64,

        /// Seed for player behaviour and operator-fed randomness
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Initial reserve balance
        #[arg(long, default_value = "1000")]
        reserve: u64,

        /// Initial balance of each player
        #[arg(long, default_value = "500")]
        player_balance: u64,

        /// Simulated seconds between rounds
        #[arg(long, default_value = "3600")]
        round_secs: u64,

        /// Chance per round that a player buys one credit
        #[arg(long, default_value = "0.2")]
        purchase_rate: f64,
    },

    /// Write a sample configuration file
    SampleConfig {
        /// Destination path
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct SimulationSummary {
    players: usize,
    rounds: u64,
    seed: u64,
    randomness: RandomnessMode,
    purchases: u64,
    declined_purchases: u64,
    reserve_start: u64,
    reserve_end: u64,
    metrics: MetricsSnapshot,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spin_machine=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate {
            config,
            players,
            rounds,
            seed,
            reserve,
            player_balance,
            round_secs,
            purchase_rate,
        } => {
            if !(0.0..=1.0).contains(&purchase_rate) {
                return Err("--purchase-rate must be between 0 and 1".into());
            }
            let summary = simulate(
                config,
                players,
                rounds,
                seed,
                reserve,
                player_balance,
                round_secs,
                purchase_rate,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::SampleConfig { path } => {
            let path = path.to_string_lossy();
            generate_sample_config(&path)?;
            info!(%path, "sample configuration written");
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn simulate(
    config_path: Option<PathBuf>,
    players: usize,
    rounds: u64,
    seed: u64,
    reserve: u64,
    player_balance: u64,
    round_secs: u64,
    purchase_rate: f64,
) -> Result<SimulationSummary, Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => ConfigLoader::new().with_path(path).load()?,
        None => {
            let config = sample_config();
            ConfigLoader::new().validate(&config)?;
            config
        }
    };

    let owner = Address::from_label("owner");
    let machine_address = Address::from_label("machine");
    let accounts: Vec<Address> = (0..players)
        .map(|i| Address::from_label(&format!("player-{}", i)))
        .collect();

    let mut ledger = InMemoryLedger::new();
    ledger.deposit(&machine_address, reserve)?;
    for account in &accounts {
        ledger.deposit(account, player_balance)?;
    }

    let machine = SpinMachine::from_config(&config, owner, machine_address, ledger)?;
    let service = MachineService::spawn(machine, config.service.command_buffer);
    let handle = service.handle();
    let mut rng = StdRng::seed_from_u64(seed);

    info!(players, rounds, seed, reserve, "simulation started");

    let mut purchases = 0u64;
    let mut declined_purchases = 0u64;
    // Start one cooldown in so every player's first free draw is available
    let start = config.free_spin_delay_secs;

    for round in 1..=rounds {
        let timestamp = start.saturating_add(round.saturating_mul(round_secs));

        if config.randomness.mode == RandomnessMode::OutOfBand {
            let value: u64 = rng.gen();
            let ctx = CallContext::new(owner, round, timestamp);
            handle
                .execute(move |machine| machine.update_random_value(&ctx, value))
                .await??;
        }

        for account in &accounts {
            let ctx = CallContext::new(*account, round, timestamp);

            if rng.gen_bool(purchase_rate) {
                match handle.purchase_credits(ctx, *account, 1).await {
                    Ok(_) => purchases += 1,
                    Err(SpinError::Ledger(LedgerError::InsufficientFunds { .. })) => declined_purchases += 1,
                    Err(e) => return Err(e.into()),
                }
            }

            handle.draw(ctx).await?;
        }
    }

    let reserve_end = handle.reserve_balance().await?;
    let metrics = handle.metrics();
    service.shutdown().await?;

    info!(reserve_end, draws = metrics.draws_settled, "simulation finished");

    Ok(SimulationSummary {
        players,
        rounds,
        seed,
        randomness: config.randomness.mode,
        purchases,
        declined_purchases,
        reserve_start: reserve,
        reserve_end,
        metrics,
    })
}
