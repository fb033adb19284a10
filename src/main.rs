use std::io::{self, IsTerminal};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ultimate::search::{self, Config, Reward};
use ultimate::Engine;

/// Plays Ultimate Tic-Tac-Toe over stdin/stdout: reads the opponent's move and
/// the valid actions every turn and answers with a move.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Seed of the random playouts, random by default.
    #[arg(long)]
    seed: Option<u64>,
    /// Exploration constant of the UCT formula.
    #[arg(long, default_value_t = 1.41)]
    exploration: f64,
    #[arg(long, value_enum, default_value_t = Reward::Flat)]
    reward: Reward,
    /// Time budget of the first turn in milliseconds.
    #[arg(long, default_value_t = 900)]
    first_turn_ms: u64,
    /// Time budget of every other turn in milliseconds.
    #[arg(long, default_value_t = 90)]
    turn_ms: u64,
    /// Log level used when `RUST_LOG` is not set. Logs are written to stderr.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs a fixed search on a few positions and reports the speed.
    Bench,
}

impl Cli {
    fn search_config(&self) -> Config {
        let config = Config::default()
            .with_exploration(self.exploration)
            .with_reward(self.reward)
            .with_budgets(
                Duration::from_millis(self.first_turn_ms),
                Duration::from_millis(self.turn_ms),
            );
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    ultimate::print_engine_info();

    if let Some(Command::Bench) = cli.command {
        return search::bench(&mut io::stdout().lock());
    }

    let mut engine = Engine::new(cli.search_config(), io::stdin().lock(), io::stdout().lock());
    engine.run()
}
