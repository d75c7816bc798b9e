use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::learner::Learner;
use crate::policy::ExplorationSchedule;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("alpha must be in (0, 1], got {0}")]
    Alpha(f64),
    #[error("gamma must be in [0, 1], got {0}")]
    Gamma(f64),
    #[error("epsilon must be finite, got {0}")]
    Epsilon(f64),
    #[error("epsilon decay must be finite and non-negative, got {0}")]
    EpsilonDecay(f64),
}

/// Whether health returns to full at the start of every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum HealthReset {
    EachRound,
    Never,
}

impl HealthReset {
    pub fn resets(self) -> bool {
        self == HealthReset::EachRound
    }
}

/// Online Q-learning agent for the duel referee.
///
/// Speaks the turn protocol on stdin/stdout; logs go to stderr.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "agent", version, about)]
pub struct AgentConfig {
    /// Persisted weight matrix, read at start and overwritten at the end of the match.
    #[arg(long, default_value = "memory.txt")]
    pub weights: PathBuf,

    /// Learning rate.
    #[arg(long, default_value_t = 0.85)]
    pub alpha: f64,

    /// Discount factor.
    #[arg(long, default_value_t = 0.55)]
    pub gamma: f64,

    /// Initial exploration rate.
    #[arg(long, default_value_t = 0.90)]
    pub epsilon: f64,

    /// Amount subtracted from epsilon after every round.
    #[arg(long, default_value_t = 0.05)]
    pub epsilon_decay: f64,

    /// Use epsilon / rounds as the per-round decay instead of --epsilon-decay.
    #[arg(long)]
    pub scale_decay_to_rounds: bool,

    /// Whether both sides return to full health when a new round starts.
    #[arg(long, value_enum, default_value_t = HealthReset::EachRound)]
    pub health_reset: HealthReset,

    /// Seed for reproducible matches; OS entropy when absent.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Do not write the weights back at the end of the match.
    #[arg(long)]
    pub no_save: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            weights: PathBuf::from("memory.txt"),
            alpha: 0.85,
            gamma: 0.55,
            epsilon: 0.90,
            epsilon_decay: 0.05,
            scale_decay_to_rounds: false,
            health_reset: HealthReset::EachRound,
            seed: None,
            no_save: false,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::Alpha(self.alpha));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::Gamma(self.gamma));
        }
        if !self.epsilon.is_finite() {
            return Err(ConfigError::Epsilon(self.epsilon));
        }
        if !(self.epsilon_decay.is_finite() && self.epsilon_decay >= 0.0) {
            return Err(ConfigError::EpsilonDecay(self.epsilon_decay));
        }
        Ok(())
    }

    pub fn learner(&self) -> Learner {
        Learner::new(self.alpha, self.gamma)
    }

    /// The schedule depends on the round count when decay is scaled to it.
    pub fn exploration(&self, rounds: u32) -> ExplorationSchedule {
        if self.scale_decay_to_rounds {
            ExplorationSchedule::scaled_to_rounds(self.epsilon, rounds)
        } else {
            ExplorationSchedule::new(self.epsilon, self.epsilon_decay)
        }
    }
}
