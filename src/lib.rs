//! Online Q-learning agent for a turn-based two-player duel.
//!
//! Each turn the agent encodes the match into binary features, picks an action
//! epsilon-greedily from a linear value function, reads the referee's report of
//! the resolved turn and takes one Q-learning step on the weights.

pub mod config;
pub mod driver;
pub mod engine;
pub mod features;
pub mod learner;
pub mod legal;
pub mod policy;
pub mod protocol;
pub mod weights;
