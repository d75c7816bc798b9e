use rand::Rng;

use crate::engine::Action;
use crate::features::FeatureVector;
use crate::legal::LegalMask;
use crate::weights::WeightMatrix;

/// Epsilon-greedy selection over the legal actions.
///
/// With probability `epsilon` a legal action is sampled uniformly, otherwise the
/// legal action with the highest estimated value is taken.
pub fn select_action<R: Rng + ?Sized>(
    weights: &WeightMatrix,
    features: &FeatureVector,
    legal: LegalMask,
    epsilon: f64,
    rng: &mut R,
) -> Action {
    let r: f64 = rng.gen();
    if r < epsilon {
        explore(legal, rng)
    } else {
        greedy_action(weights, features, legal)
    }
}

/// Arg-max of the estimated values; ties keep the lowest action index.
pub fn greedy_action(weights: &WeightMatrix, features: &FeatureVector, legal: LegalMask) -> Action {
    let mut best = Action::Idle;
    let mut best_value = f64::NEG_INFINITY;
    for action in legal.iter() {
        let value = weights.q_value(action, features);
        if value > best_value {
            best_value = value;
            best = action;
        }
    }
    best
}

/// Uniform over the legal actions by rejection sampling the full action space.
///
/// An empty mask falls back to idle, which no state makes illegal.
pub fn explore<R: Rng + ?Sized>(legal: LegalMask, rng: &mut R) -> Action {
    if legal.is_empty() {
        return Action::Idle;
    }
    loop {
        let idx = rng.gen_range(0..Action::COUNT);
        if let Some(action) = Action::from_index(idx) {
            if legal.is_legal(action) {
                return action;
            }
        }
    }
}

/// Exploration rate that only moves at round boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationSchedule {
    epsilon: f64,
    decay: f64,
}

impl ExplorationSchedule {
    /// `decay` is the per-round decrement; negative values are treated as zero so
    /// epsilon can never grow.
    pub fn new(epsilon: f64, decay: f64) -> Self {
        ExplorationSchedule {
            epsilon,
            decay: decay.max(0.0),
        }
    }

    /// Spreads the decay of `epsilon` evenly over `rounds` rounds.
    pub fn scaled_to_rounds(epsilon: f64, rounds: u32) -> Self {
        let decay = if rounds == 0 {
            0.0
        } else {
            epsilon / f64::from(rounds)
        };
        ExplorationSchedule::new(epsilon, decay)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Not clamped at zero; a negative rate just means never exploring.
    pub fn end_round(&mut self) {
        self.epsilon -= self.decay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Feature, NUM_FEATURES};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn weights_with_alive_row(values: [f64; Action::COUNT]) -> WeightMatrix {
        let mut weights = WeightMatrix::zeros();
        for (action, value) in Action::ALL.iter().zip(values) {
            weights.set(*action, Feature::Alive, value);
        }
        weights
    }

    fn brute_force_best(weights: &WeightMatrix, fv: &FeatureVector, legal: LegalMask) -> Action {
        let best_value = legal
            .iter()
            .map(|a| weights.q_value(a, fv))
            .fold(f64::NEG_INFINITY, f64::max);
        legal
            .iter()
            .find(|a| weights.q_value(*a, fv) == best_value)
            .unwrap()
    }

    #[test]
    fn test_greedy_picks_highest_value() {
        let weights = weights_with_alive_row([0.1, 0.2, 0.9, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let fv = FeatureVector::from_active(&[Feature::Alive]);
        assert_eq!(Action::Fireball, greedy_action(&weights, &fv, LegalMask::all()));
    }

    #[test]
    fn test_greedy_ties_prefer_lowest_index() {
        let weights = weights_with_alive_row([0.1, 0.7, 0.2, 0.7, 0.0, 0.7, 0.0, 0.0, 0.0]);
        let fv = FeatureVector::from_active(&[Feature::Alive]);
        assert_eq!(Action::MagicMissile, greedy_action(&weights, &fv, LegalMask::all()));

        let weights = WeightMatrix::zeros();
        assert_eq!(Action::Idle, greedy_action(&weights, &fv, LegalMask::all()));
    }

    #[test]
    fn test_greedy_skips_illegal() {
        let weights = weights_with_alive_row([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 4.0]);
        let mut legal = LegalMask::all();
        legal.remove(Action::Heal);
        let fv = FeatureVector::from_active(&[Feature::Alive]);
        assert_eq!(Action::Strength, greedy_action(&weights, &fv, legal));
        legal.remove(Action::Strength);
        assert_eq!(Action::Idle, greedy_action(&weights, &fv, legal));
    }

    #[test]
    fn test_greedy_handles_negative_values() {
        let weights = weights_with_alive_row([-9.0, -3.0, -8.0, -1.0, -7.0, -6.0, -5.0, -4.0, -2.0]);
        let fv = FeatureVector::from_active(&[Feature::Alive]);
        assert_eq!(Action::Dagger, greedy_action(&weights, &fv, LegalMask::all()));
    }

    #[test]
    fn test_zero_epsilon_is_deterministic() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let weights = WeightMatrix::random(&mut rng);
        let fv = FeatureVector::from_active(&[Feature::Alive, Feature::SelfLowHealth, Feature::EnemyGlobe]);
        let legal = LegalMask::from_features(&fv);
        let expected = brute_force_best(&weights, &fv, legal);
        for _ in 0..100 {
            assert_eq!(expected, select_action(&weights, &fv, legal, 0.0, &mut rng));
        }
    }

    #[test]
    fn test_full_exploration_covers_only_legal() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        let weights = WeightMatrix::random(&mut rng);
        let fv = FeatureVector::from_active(&[Feature::Alive, Feature::SelfGlobe, Feature::SelfHealPotion]);
        let legal = LegalMask::from_features(&fv);

        let mut seen = LegalMask::none();
        for _ in 0..2000 {
            let action = select_action(&weights, &fv, legal, 1.0, &mut rng);
            assert!(legal.is_legal(action), "illegal action {}", action);
            seen.insert(action);
        }
        assert_eq!(legal, seen);
    }

    #[test]
    fn test_explore_empty_mask() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert_eq!(Action::Idle, explore(LegalMask::none(), &mut rng));
    }

    #[test]
    fn test_potions_never_chosen_once_consumed() {
        // Every feature vector, against a few weight matrices and both policy modes.
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1234);
        let matrices: Vec<WeightMatrix> = (0..3).map(|_| WeightMatrix::random(&mut rng)).collect();
        for n in 0u32..1 << NUM_FEATURES {
            let mut bits = [false; NUM_FEATURES];
            for (idx, bit) in bits.iter_mut().enumerate() {
                *bit = (n >> idx) & 1 == 1;
            }
            let fv = FeatureVector::from_bits(bits);
            let legal = LegalMask::from_features(&fv);
            for weights in &matrices {
                for epsilon in [0.0, 1.0] {
                    let action = select_action(weights, &fv, legal, epsilon, &mut rng);
                    if !fv.get(Feature::SelfHealPotion) {
                        assert_ne!(Action::Heal, action);
                    }
                    if !fv.get(Feature::SelfStrengthPotion) {
                        assert_ne!(Action::Strength, action);
                    }
                }
            }
        }
    }

    #[test]
    fn test_epsilon_decays_per_round() {
        let mut schedule = ExplorationSchedule::new(0.9, 0.05);
        let mut previous = schedule.epsilon();
        for _ in 0..30 {
            schedule.end_round();
            assert!(schedule.epsilon() <= previous);
            previous = schedule.epsilon();
        }
        // Not clamped.
        assert!(schedule.epsilon() < 0.0);
    }

    #[test]
    fn test_scaled_schedule() {
        let mut schedule = ExplorationSchedule::scaled_to_rounds(0.8, 4);
        assert!((schedule.decay() - 0.2).abs() < 1e-12);
        for _ in 0..4 {
            schedule.end_round();
        }
        assert!(schedule.epsilon().abs() < 1e-12);

        assert_eq!(0.0, ExplorationSchedule::scaled_to_rounds(0.8, 0).decay());
    }

    proptest! {
        #[test]
        fn prop_epsilon_non_increasing(epsilon in -1.0f64..1.0, decay in -0.5f64..0.5, rounds in 0usize..50) {
            let mut schedule = ExplorationSchedule::new(epsilon, decay);
            for _ in 0..rounds {
                let before = schedule.epsilon();
                schedule.end_round();
                prop_assert!(schedule.epsilon() <= before);
            }
        }

        #[test]
        fn prop_greedy_matches_brute_force(
            cells in proptest::collection::vec(-10.0f64..10.0, Action::COUNT * NUM_FEATURES),
            bits in proptest::array::uniform15(any::<bool>()),
        ) {
            let weights = WeightMatrix::from_flat(&cells).unwrap();
            let fv = FeatureVector::from_bits(bits);
            let legal = LegalMask::from_features(&fv);
            prop_assert_eq!(brute_force_best(&weights, &fv, legal), greedy_action(&weights, &fv, legal));
        }
    }
}
