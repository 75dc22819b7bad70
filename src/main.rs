//! # bulk-run
//!
//! Command-line front end for the bulk runner. Each subcommand sets up one
//! analysis, runs it to completion and prints the consumer's report.
//!
//! ## Usage
//! ```text
//! bulk-run win-rate --setting expert --games 100000 --workers 8 --seed 195971295
//! bulk-run clicks --setting expert --limit 1000000 --workers 8
//! bulk-run common-states --setting expert --games 1000000
//! ```
//!
//! Logging goes to stderr and is controlled by `--log-level`, or by `RUST_LOG`
//! when it is set.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use bulk::consumers::{ClickTally, FrequencyTable, WinTally};
use bulk::games::minesweeper::{MinesweeperFactory, MinesweeperGame};
use bulk::solver::{LocalSolver, OpeningBook, Solver, SolverFactory, Strategy, StrategySolver};
use bulk::{episodes_at_least, Action, BulkRunner, Consumer, GameSettings, RunConfig, RunReport, TerminationPredicate};

#[derive(Parser, Debug)]
#[command(author, version, about = "Parallel bulk runner for minesweeper solver analysis", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Win rate of one solver strategy over a fixed number of games
    WinRate {
        #[command(flatten)]
        run: RunArgs,

        /// Number of games to play
        #[arg(long, default_value_t = 10_000)]
        games: u64,

        /// Solver strategy
        #[arg(long, default_value = "default", value_parser = ["default", "single-best", "edge-nearest", "corners-first"])]
        strategy: String,
    },

    /// Clicks made versus games won, for each click strategy in turn
    Clicks {
        #[command(flatten)]
        run: RunArgs,

        /// Number of left clicks to simulate per strategy
        #[arg(long)]
        limit: u64,
    },

    /// Most frequent guess positions and how games through them end
    CommonStates {
        #[command(flatten)]
        run: RunArgs,

        /// Number of games to play
        #[arg(long, default_value_t = 1_000_000)]
        games: u64,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Preset name (beginner, intermediate, expert) or WIDTHxHEIGHT/MINES
    #[arg(long, default_value = "expert")]
    setting: GameSettings,

    /// Game generator seed; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads (default: number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Ring slots per worker
    #[arg(long, default_value_t = bulk::config::DEFAULT_BUFFER_PER_WORKER)]
    buffer_per_worker: usize,

    /// Action applied to every game before the solver starts, as X,Y or flag:X,Y.
    /// Repeat for several.
    #[arg(long = "pre-action", value_parser = parse_action)]
    pre_actions: Vec<Action>,
}

impl RunArgs {
    fn config(&self) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            seed: self.seed.unwrap_or_else(rand::random),
            settings: self.setting,
            workers: self.workers.unwrap_or(defaults.workers),
            buffer_per_worker: self.buffer_per_worker,
            pre_actions: self.pre_actions.clone(),
            ..defaults
        }
    }
}

fn parse_action(value: &str) -> Result<Action, String> {
    let (flag, coordinates) = match value.strip_prefix("flag:") {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (x, y) = coordinates
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", value))?;
    let x = x.trim().parse().map_err(|_| format!("bad x coordinate in '{}'", value))?;
    let y = y.trim().parse().map_err(|_| format!("bad y coordinate in '{}'", value))?;
    Ok(if flag { Action::flag(x, y) } else { Action::clear(x, y) })
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn strategy_solvers(strategy: Strategy) -> SolverFactory<MinesweeperGame> {
    Arc::new(move |_: &MinesweeperGame| -> Box<dyn Solver<MinesweeperGame>> {
        Box::new(StrategySolver::new(LocalSolver::new(), strategy.clone()))
    })
}

/// Starts the run in the background and waits for its report.
async fn execute<C: Consumer + 'static>(
    config: RunConfig,
    solvers: SolverFactory<MinesweeperGame>,
    consumer: C,
    predicate: TerminationPredicate<C>,
) -> Result<RunReport<C>> {
    let mut handle = BulkRunner::new(config, MinesweeperFactory, solvers, consumer, predicate)?.start()?;
    handle.report().await.context("waiting for the run report")?;
    let run = handle.join()?;
    if let Some(halt) = run.stats.halt {
        eprintln!("{} {:?}", "Run halted early:".red().bold(), halt);
    }
    Ok(run)
}

fn print_header(title: &str, config: &RunConfig) {
    println!("{}", title.bold().green());
    println!("Settings: {}", config.settings);
    println!("Seed: {}", config.seed);
    println!("Workers: {}", config.workers);
    if !config.pre_actions.is_empty() {
        let actions: Vec<String> = config.pre_actions.iter().map(|action| action.to_string()).collect();
        println!("Pre-actions: {}", actions.join(", "));
    }
    println!("------------------------------------");
}

fn print_footer<C>(run: &RunReport<C>) {
    println!(
        "{}",
        format!(
            "{} games in {:.2}s, {} abandoned",
            run.stats.completed,
            run.elapsed.as_secs_f64(),
            run.stats.abandoned
        )
        .dimmed()
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::WinRate { run, games, strategy } => {
            let config = run.config();
            let strategy = Strategy::from_name(&strategy)
                .with_context(|| format!("unknown strategy '{}'", strategy))?;
            print_header(&format!("Win rate ({})", strategy.name()), &config);
            let run = execute(config, strategy_solvers(strategy), WinTally::new(), episodes_at_least(games)).await?;
            println!("{}", run.report);
            print_footer(&run);
        }
        Command::Clicks { run, limit } => {
            let config = run.config();
            print_header("Clicks per win", &config);
            let mut results = Vec::new();
            for strategy in [Strategy::Default, Strategy::SingleBest, Strategy::CornersFirst] {
                let name = strategy.name();
                let run = execute(
                    config.clone(),
                    strategy_solvers(strategy),
                    ClickTally::new(),
                    ClickTally::clicks_at_least(limit),
                )
                .await?;
                print_footer(&run);
                results.push(format!("{:>14}: {}", name, run.report));
            }
            for result in results {
                println!("{}", result);
            }
        }
        Command::CommonStates { run, games } => {
            let config = RunConfig { capture_decisions: true, ..run.config() };
            print_header("Common guess positions", &config);
            let book = Arc::new(OpeningBook::opposite_corner(&config.settings)?);
            let solvers = strategy_solvers(Strategy::OpeningBook(book));
            let run = execute(config, solvers, FrequencyTable::new(), episodes_at_least(games)).await?;
            println!("{}", run.report);
            print_footer(&run);
        }
    }

    Ok(())
}
