// =============================================================================
// reset-ctl — operator CLI for the flat-file persistence layer
// =============================================================================
//
// Talks directly to the repositories the running engine uses, never to the
// engine process itself — run it only while the engine is stopped.
// =============================================================================

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use strategy_arena::config::EngineConfig;
use strategy_arena::genetic::{GeneticEngine, GeneticParams};
use strategy_arena::genome::StrategyGenome;
use strategy_arena::persistence::{CycleRepository, FileRepository, Repository, TreasuryRepository};
use strategy_arena::rng::Rng;
use strategy_arena::trade::Trade;
use strategy_arena::treasury::Treasury;

#[derive(Parser)]
#[command(name = "reset-ctl", about = "Operator CLI for the strategy arena's persisted state")]
struct Cli {
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
    #[arg(long, default_value = "engine_config.json")]
    config_path: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate an initial genesis population if none is persisted yet.
    Seed {
        /// Reseed even if a population already exists, discarding it first.
        #[arg(long)]
        force: bool,
    },
    /// Erase trades, cycles, treasury, and the graveyard; rebuild the
    /// treasury from the surviving population.
    Reset,
    /// Reset trades, cycles, and every surviving strategy's performance,
    /// leaving the population and treasury balances untouched.
    ResetTrades,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.data_dir)?;

    let result = match cli.command {
        Commands::Seed { force } => cmd_seed(&cli, force).await,
        Commands::Reset => cmd_reset(&cli).await,
        Commands::ResetTrades => cmd_reset_trades(&cli).await,
    };

    if let Err(e) = result {
        eprintln!("reset-ctl: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn repos(cli: &Cli) -> (FileRepository<StrategyGenome>, FileRepository<Trade>, CycleRepository, TreasuryRepository) {
    (
        FileRepository::new(cli.data_dir.join("strategies.json")),
        FileRepository::new(cli.data_dir.join("trades.json")),
        CycleRepository::new(cli.data_dir.join("cycles.json")),
        TreasuryRepository::new(cli.data_dir.join("treasury.json")),
    )
}

async fn cmd_seed(cli: &Cli, force: bool) -> Result<()> {
    let config = EngineConfig::load_or_default(&cli.config_path);
    let (strategies, _trades, _cycles, _treasury) = repos(cli);

    let existing = strategies.find_all().await?;
    if !existing.is_empty() && !force {
        bail!(
            "a population of {} already exists; pass --force to reseed",
            existing.len()
        );
    }
    if force {
        strategies.clear()?;
    }

    let mut rng = Rng::from_entropy();
    let engine = GeneticEngine::new(GeneticParams {
        population_size: config.population_size,
        survivor_percent: config.survivor_percent,
        dead_percent: config.dead_percent,
        mutation_rate: config.mutation_rate,
    });
    let seeded = engine.generate_genesis(config.population_size, &mut rng);
    for genome in &seeded {
        strategies.create(genome).await?;
    }

    println!("seeded {} genesis strategies", seeded.len());
    Ok(())
}

async fn cmd_reset(cli: &Cli) -> Result<()> {
    let config = EngineConfig::load_or_default(&cli.config_path);
    let (strategies, trades, cycles, treasury_repo) = repos(cli);

    trades.clear()?;
    cycles.clear()?;
    strategies.retain(|g| !g.is_dead())?;

    let survivors = strategies.find_all().await?;
    let active_ids: Vec<Uuid> = survivors.iter().map(|g| g.id).collect();

    let total_sol = active_ids.len() as f64 * config.wallet_per_agent;
    let treasury = Treasury::new(total_sol, config.reserve_percent, config.max_allocation_per_strategy);
    treasury.allocate_to_strategies(&active_ids);
    treasury_repo.save(&treasury.snapshot())?;

    println!(
        "reset complete — {} surviving strategies, treasury rebuilt at {:.4} SOL",
        active_ids.len(),
        total_sol
    );
    Ok(())
}

async fn cmd_reset_trades(cli: &Cli) -> Result<()> {
    let (strategies, trades, cycles, _treasury_repo) = repos(cli);

    trades.clear()?;
    cycles.clear()?;

    let all = strategies.find_all().await?;
    for mut genome in all {
        genome.performance = Default::default();
        strategies.update(&genome).await?;
    }

    println!("trades, cycles, and strategy performance reset");
    Ok(())
}
