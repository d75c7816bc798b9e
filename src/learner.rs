use tracing::debug;

use crate::engine::Action;
use crate::features::FeatureVector;
use crate::weights::WeightMatrix;

/// Rewards are damage differentials; health caps each side at 100 per turn.
pub const MAX_ABS_REWARD: f64 = 200.0;
/// Weights are clamped to this magnitude after every step.
pub const MAX_ABS_WEIGHT: f64 = 1.0e6;

/// One-step Q-learning over a linear value function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Learner {
    pub alpha: f64,
    pub gamma: f64,
}

impl Learner {
    pub fn new(alpha: f64, gamma: f64) -> Self {
        Learner { alpha, gamma }
    }

    /// Moves the weights tied to the features active before the transition
    /// toward `reward + gamma * max_a' Q(after, a')`.
    ///
    /// Inactive features contribute nothing to `Q(before, action)`, so their
    /// weights are left untouched.
    pub fn update(
        &self,
        weights: &mut WeightMatrix,
        action: Action,
        reward: f64,
        before: &FeatureVector,
        after: &FeatureVector,
    ) {
        let reward = if reward.is_nan() {
            0.0
        } else {
            reward.clamp(-MAX_ABS_REWARD, MAX_ABS_REWARD)
        };
        let old_q = weights.q_value(action, before);
        let max_next_q = weights.max_q(after);
        let td_error = reward + self.gamma * max_next_q - old_q;
        if !td_error.is_finite() {
            debug!(%action, reward, old_q, max_next_q, "skipping non-finite td error");
            return;
        }
        debug!(%action, reward, old_q, max_next_q, td_error, "q-learning step");

        let step = self.alpha * td_error;
        let row = weights.row_mut(action);
        for idx in before.active() {
            row[idx] = (row[idx] + step).clamp(-MAX_ABS_WEIGHT, MAX_ABS_WEIGHT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MatchState, StatusReport, Turn};
    use crate::features::{encode, Feature, NUM_FEATURES};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_fireball_scenario() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2024);
        let mut weights = WeightMatrix::random(&mut rng);
        let original = weights.clone();

        let mut state = MatchState::new();
        assert_eq!(100, state.me.health);
        assert_eq!(100, state.opponent.health);
        let turn = Turn {
            my_action: Action::Fireball,
            opp_action: Action::Dagger,
            damage_dealt: 30,
            damage_taken: 10,
            status: StatusReport::default(),
            round_ended: false,
        };
        let reward = turn.reward();
        assert_eq!(20.0, reward);
        state.apply_turn(&turn);

        let before = FeatureVector::from_active(&[Feature::Alive, Feature::SelfLowHealth]);
        let after = encode(&state.me, &state.opponent, &state.status);

        let learner = Learner::new(0.85, 0.55);
        let old_q = original.get(Action::Fireball, Feature::Alive)
            + original.get(Action::Fireball, Feature::SelfLowHealth);
        let expected_step = 0.85 * (reward + 0.55 * original.max_q(&after) - old_q);
        learner.update(&mut weights, Action::Fireball, reward, &before, &after);

        for action in Action::ALL {
            for feature in Feature::ALL {
                let changed = action == Action::Fireball
                    && (feature == Feature::Alive || feature == Feature::SelfLowHealth);
                let old = original.get(action, feature);
                let new = weights.get(action, feature);
                if changed {
                    assert!((new - (old + expected_step)).abs() < 1e-9);
                } else {
                    assert_eq!(old.to_bits(), new.to_bits(), "{} {:?} changed", action, feature);
                }
            }
        }
    }

    #[test]
    fn test_converges_to_fixed_point() {
        // Single bias feature, terminal-like next state with no value.
        let mut weights = WeightMatrix::zeros();
        let learner = Learner::new(0.5, 0.0);
        let fv = FeatureVector::from_active(&[Feature::Alive]);
        for _ in 0..60 {
            learner.update(&mut weights, Action::Staff, 10.0, &fv, &fv);
        }
        assert!((weights.get(Action::Staff, Feature::Alive) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_before_vector_changes_nothing() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        let mut weights = WeightMatrix::random(&mut rng);
        let original = weights.clone();
        Learner::new(0.85, 0.55).update(
            &mut weights,
            Action::Heal,
            50.0,
            &FeatureVector::default(),
            &FeatureVector::from_active(&[Feature::Alive]),
        );
        assert_eq!(original, weights);
    }

    #[test]
    fn test_extreme_rewards_stay_finite() {
        let mut weights = WeightMatrix::zeros();
        let learner = Learner::new(1.0, 1.0);
        let all = FeatureVector::from_bits([true; NUM_FEATURES]);
        for i in 0..10_000 {
            let reward = if i % 3 == 0 { f64::MAX } else { f64::NEG_INFINITY };
            let action = Action::ALL[i % Action::COUNT];
            learner.update(&mut weights, action, reward, &all, &all);
        }
        learner.update(&mut weights, Action::Idle, f64::NAN, &all, &all);
        assert!(weights.is_finite());
        assert!(weights.values().all(|w| w.abs() <= MAX_ABS_WEIGHT));
    }

    proptest! {
        #[test]
        fn prop_only_active_cells_change(
            cells in proptest::collection::vec(-5.0f64..5.0, Action::COUNT * NUM_FEATURES),
            before_bits in proptest::array::uniform15(any::<bool>()),
            after_bits in proptest::array::uniform15(any::<bool>()),
            action_idx in 0usize..Action::COUNT,
            reward in -100.0f64..100.0,
        ) {
            let mut weights = WeightMatrix::from_flat(&cells).unwrap();
            let original = weights.clone();
            let action = Action::ALL[action_idx];
            let before = FeatureVector::from_bits(before_bits);
            let after = FeatureVector::from_bits(after_bits);

            Learner::new(0.85, 0.55).update(&mut weights, action, reward, &before, &after);

            prop_assert!(weights.is_finite());
            for a in Action::ALL {
                for f in Feature::ALL {
                    if a != action || !before.get(f) {
                        prop_assert_eq!(original.get(a, f).to_bits(), weights.get(a, f).to_bits());
                    }
                }
            }
        }
    }
}
