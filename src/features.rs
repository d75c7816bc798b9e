use std::fmt;

use crate::engine::{PlayerState, StatusReport};

pub const NUM_FEATURES: usize = 15;

pub const LOW_HEALTH_THRESHOLD: i32 = 50;
pub const CRITICAL_HEALTH_THRESHOLD: i32 = 10;

/// Named indices into a `FeatureVector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    /// Always set, so every action learns a bias weight.
    Alive,
    SelfGlobe,
    SelfStoneskin,
    SelfStrength,
    SelfLowHealth,
    SelfCritical,
    EnemyGlobe,
    EnemyStoneskin,
    EnemyStrength,
    EnemyLowHealth,
    EnemyCritical,
    SelfHealPotion,
    SelfStrengthPotion,
    EnemyHealPotion,
    EnemyStrengthPotion,
}

impl Feature {
    pub const ALL: [Feature; NUM_FEATURES] = [
        Feature::Alive,
        Feature::SelfGlobe,
        Feature::SelfStoneskin,
        Feature::SelfStrength,
        Feature::SelfLowHealth,
        Feature::SelfCritical,
        Feature::EnemyGlobe,
        Feature::EnemyStoneskin,
        Feature::EnemyStrength,
        Feature::EnemyLowHealth,
        Feature::EnemyCritical,
        Feature::SelfHealPotion,
        Feature::SelfStrengthPotion,
        Feature::EnemyHealPotion,
        Feature::EnemyStrengthPotion,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Feature> {
        Feature::ALL.get(idx).copied()
    }

    /// Short column label used by the diagnostic dumps.
    pub fn label(self) -> &'static str {
        match self {
            Feature::Alive => "alive",
            Feature::SelfGlobe => "s.glb",
            Feature::SelfStoneskin => "s.stn",
            Feature::SelfStrength => "s.str",
            Feature::SelfLowHealth => "s.low",
            Feature::SelfCritical => "s.crt",
            Feature::EnemyGlobe => "e.glb",
            Feature::EnemyStoneskin => "e.stn",
            Feature::EnemyStrength => "e.str",
            Feature::EnemyLowHealth => "e.low",
            Feature::EnemyCritical => "e.crt",
            Feature::SelfHealPotion => "s.hpot",
            Feature::SelfStrengthPotion => "s.spot",
            Feature::EnemyHealPotion => "e.hpot",
            Feature::EnemyStrengthPotion => "e.spot",
        }
    }
}

/// Fixed-length binary encoding of the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureVector {
    bits: [bool; NUM_FEATURES],
}

impl FeatureVector {
    pub fn from_bits(bits: [bool; NUM_FEATURES]) -> Self {
        FeatureVector { bits }
    }

    /// Vector with only the given features set.
    pub fn from_active(active: &[Feature]) -> Self {
        let mut vector = FeatureVector::default();
        for &feature in active {
            vector.set(feature, true);
        }
        vector
    }

    pub fn get(&self, feature: Feature) -> bool {
        self.bits[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: bool) {
        self.bits[feature.index()] = value;
    }

    /// The 0/1 indicator at `idx` as a real value.
    pub fn value(&self, idx: usize) -> f64 {
        if self.bits[idx] {
            1.0
        } else {
            0.0
        }
    }

    /// Indices of the features set to 1.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .map(|(idx, _)| idx)
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, bit) in self.bits.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", u8::from(*bit))?;
        }
        Ok(())
    }
}

/// Pure function of both players' tracked state and the latest status report.
pub fn encode(me: &PlayerState, opponent: &PlayerState, report: &StatusReport) -> FeatureVector {
    let mut bits = [false; NUM_FEATURES];
    let mut put = |feature: Feature, value: bool| bits[feature.index()] = value;

    put(Feature::Alive, true);

    put(Feature::SelfGlobe, report.my_status.globe);
    put(Feature::SelfStoneskin, report.my_status.stoneskin);
    put(Feature::SelfStrength, report.my_status.strength);
    put(Feature::SelfLowHealth, me.health < LOW_HEALTH_THRESHOLD);
    put(Feature::SelfCritical, me.health < CRITICAL_HEALTH_THRESHOLD);

    put(Feature::EnemyGlobe, report.opp_status.globe);
    put(Feature::EnemyStoneskin, report.opp_status.stoneskin);
    put(Feature::EnemyStrength, report.opp_status.strength);
    put(Feature::EnemyLowHealth, report.opp_low_health);
    put(Feature::EnemyCritical, report.opp_critical_health);

    put(Feature::SelfHealPotion, me.healing_potion);
    put(Feature::SelfStrengthPotion, me.strength_potion);
    put(Feature::EnemyHealPotion, opponent.healing_potion);
    put(Feature::EnemyStrengthPotion, opponent.strength_potion);

    FeatureVector { bits }
}
