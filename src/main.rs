use std::io;
use std::process::ExitCode;

use clap::Parser;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use duel_engine::config::AgentConfig;
use duel_engine::driver::EpisodeDriver;

fn main() -> ExitCode {
    // stdout carries the referee protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::parse();
    if let Err(err) = config.validate() {
        error!(%err, "invalid configuration");
        return ExitCode::FAILURE;
    }

    let rng = match config.seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    };

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    match EpisodeDriver::new(config, stdin, stdout, rng).run() {
        Ok(summary) => {
            info!(
                rounds = summary.rounds,
                turns = summary.turns,
                epsilon = summary.epsilon,
                me = %summary.state.me,
                opponent = %summary.state.opponent,
                "match complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "match failed");
            ExitCode::FAILURE
        }
    }
}
