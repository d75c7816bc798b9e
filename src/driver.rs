use std::io::{BufRead, Write};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::engine::MatchState;
use crate::features::{encode, Feature, FeatureVector};
use crate::learner::Learner;
use crate::legal::LegalMask;
use crate::policy::{select_action, ExplorationSchedule};
use crate::protocol::{write_action, ProtocolError, TurnReader};
use crate::weights::{PersistenceError, WeightMatrix, WeightStore};

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("match aborted: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("could not persist weights: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ColdStart,
    RoundActive,
    RoundEnded,
    MatchEnded,
}

/// Only the bias is set until the first report of a round is encoded.
fn round_start_features() -> FeatureVector {
    FeatureVector::from_active(&[Feature::Alive])
}

/// What a completed match leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
    pub rounds: u32,
    pub turns: u64,
    pub epsilon: f64,
    pub weights: WeightMatrix,
    pub state: MatchState,
    pub features: FeatureVector,
}

/// Plays a whole match against the referee on `input`/`output`.
pub struct EpisodeDriver<R, W, G> {
    config: AgentConfig,
    store: WeightStore,
    learner: Learner,
    reader: TurnReader<R>,
    output: W,
    rng: G,

    phase: Phase,
    weights: WeightMatrix,
    state: MatchState,
    features: FeatureVector,
    exploration: ExplorationSchedule,
    rounds: u32,
    rounds_played: u32,
    turns: u64,
}

impl<R: BufRead, W: Write, G: Rng> EpisodeDriver<R, W, G> {
    pub fn new(config: AgentConfig, input: R, output: W, rng: G) -> Self {
        let store = WeightStore::new(config.weights.clone());
        let learner = config.learner();
        let exploration = config.exploration(0);
        EpisodeDriver {
            config,
            store,
            learner,
            reader: TurnReader::new(input),
            output,
            rng,
            phase: Phase::ColdStart,
            weights: WeightMatrix::zeros(),
            state: MatchState::new(),
            features: FeatureVector::default(),
            exploration,
            rounds: 0,
            rounds_played: 0,
            turns: 0,
        }
    }

    /// Runs to completion. A protocol error aborts the match and nothing is saved.
    pub fn run(mut self) -> Result<MatchSummary, DriverError> {
        loop {
            self.phase = match self.phase {
                Phase::ColdStart => self.cold_start()?,
                Phase::RoundActive => self.play_turn()?,
                Phase::RoundEnded => self.end_round(),
                Phase::MatchEnded => return self.finish(),
            };
        }
    }

    fn cold_start(&mut self) -> Result<Phase, DriverError> {
        self.weights = self.store.load(&mut self.rng);
        self.rounds = self.reader.read_round_count()?;
        self.exploration = self.config.exploration(self.rounds);
        self.state = MatchState::new();
        self.features = round_start_features();
        info!(
            rounds = self.rounds,
            epsilon = self.exploration.epsilon(),
            decay = self.exploration.decay(),
            "match started"
        );

        if self.rounds == 0 {
            Ok(Phase::MatchEnded)
        } else {
            Ok(Phase::RoundActive)
        }
    }

    fn play_turn(&mut self) -> Result<Phase, DriverError> {
        debug!("weight matrix:\n{}", self.weights);
        debug!("features in the state: {}", self.features);

        let legal = LegalMask::from_state(&self.state);
        let action = select_action(
            &self.weights,
            &self.features,
            legal,
            self.exploration.epsilon(),
            &mut self.rng,
        );
        write_action(&mut self.output, action)?;

        let turn = self.reader.read_turn(action)?;
        self.turns += 1;
        // Resources are spent even on the final blow of a round.
        self.state.apply_turn(&turn);
        if turn.round_ended {
            return Ok(Phase::RoundEnded);
        }

        let before = self.features;
        self.features = encode(&self.state.me, &self.state.opponent, &self.state.status);
        self.learner
            .update(&mut self.weights, action, turn.reward(), &before, &self.features);
        Ok(Phase::RoundActive)
    }

    fn end_round(&mut self) -> Phase {
        self.exploration.end_round();
        self.rounds_played += 1;
        info!(
            round = self.rounds_played,
            of = self.rounds,
            me = %self.state.me,
            opponent = %self.state.opponent,
            epsilon = self.exploration.epsilon(),
            "round ended"
        );

        if self.rounds_played < self.rounds {
            self.state.start_round(self.config.health_reset.resets());
            self.features = round_start_features();
            Phase::RoundActive
        } else {
            Phase::MatchEnded
        }
    }

    fn finish(self) -> Result<MatchSummary, DriverError> {
        if self.config.no_save {
            info!("not saving weights");
        } else {
            self.store.save(&self.weights)?;
            info!(path = %self.store.path().display(), "saved weights");
        }
        Ok(MatchSummary {
            rounds: self.rounds_played,
            turns: self.turns,
            epsilon: self.exploration.epsilon(),
            weights: self.weights,
            state: self.state,
            features: self.features,
        })
    }
}
