use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use duel_engine::engine::Action;
use duel_engine::features::{Feature, FeatureVector, NUM_FEATURES};
use duel_engine::legal::LegalMask;
use duel_engine::policy::greedy_action;
use duel_engine::weights::WeightStore;

/// Prints a persisted weight matrix, optionally scoring a feature set against it.
#[derive(Parser, Debug)]
#[command(name = "inspect", version, about)]
struct Args {
    /// Weight file written by the agent.
    #[arg(long, default_value = "memory.txt")]
    weights: PathBuf,

    /// Comma-separated indices of the active features, e.g. `0,4,11`.
    #[arg(long, value_delimiter = ',')]
    active: Option<Vec<usize>>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let store = WeightStore::new(&args.weights);
    let weights = match store.try_load() {
        Ok(Some(weights)) => weights,
        Ok(None) => {
            error!(path = %args.weights.display(), "no weight file");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            error!(%err, "unreadable weight file");
            return ExitCode::FAILURE;
        }
    };

    println!("{}", weights);

    let Some(active) = args.active else {
        return ExitCode::SUCCESS;
    };
    let mut features = Vec::with_capacity(active.len());
    for idx in active {
        match Feature::from_index(idx) {
            Some(feature) => features.push(feature),
            None => {
                error!(idx, max = NUM_FEATURES - 1, "feature index out of range");
                return ExitCode::FAILURE;
            }
        }
    }
    let fv = FeatureVector::from_active(&features);
    let legal = LegalMask::from_features(&fv);

    println!();
    println!("features: {}", fv);
    for action in Action::ALL {
        let marker = if legal.is_legal(action) { ' ' } else { 'x' };
        println!("{} {:>9} {:>9.3}", marker, action.name(), weights.q_value(action, &fv));
    }
    println!("greedy: {}", greedy_action(&weights, &fv, legal));
    ExitCode::SUCCESS
}
