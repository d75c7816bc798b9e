use std::fmt;

use crate::engine::{Action, MatchState};
use crate::features::{Feature, FeatureVector};

/// Bitset over the action space; bit `i` is the action with protocol code `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegalMask(u16);

impl LegalMask {
    pub fn all() -> Self {
        LegalMask((1 << Action::COUNT) - 1)
    }

    pub fn none() -> Self {
        LegalMask(0)
    }

    /// Legality from the tracked match state: potions are one-shot and
    /// globe/stoneskin do not stack.
    pub fn from_state(state: &MatchState) -> Self {
        LegalMask::restricted(
            state.me.healing_potion,
            state.me.strength_potion,
            state.status.my_status.globe,
            state.status.my_status.stoneskin,
        )
    }

    /// The same rules read off a feature vector's own-side indicators.
    pub fn from_features(features: &FeatureVector) -> Self {
        LegalMask::restricted(
            features.get(Feature::SelfHealPotion),
            features.get(Feature::SelfStrengthPotion),
            features.get(Feature::SelfGlobe),
            features.get(Feature::SelfStoneskin),
        )
    }

    fn restricted(heal_potion: bool, strength_potion: bool, globe: bool, stoneskin: bool) -> Self {
        let mut mask = LegalMask::all();
        if !heal_potion {
            mask.remove(Action::Heal);
        }
        if !strength_potion {
            mask.remove(Action::Strength);
        }
        if stoneskin {
            mask.remove(Action::Stoneskin);
        }
        if globe {
            mask.remove(Action::Globe);
        }
        mask
    }

    pub fn is_legal(self, action: Action) -> bool {
        (self.0 >> action.index()) & 1 != 0
    }

    pub fn insert(&mut self, action: Action) {
        self.0 |= 1 << action.index();
    }

    pub fn remove(&mut self, action: Action) {
        self.0 &= !(1 << action.index());
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Legal actions in protocol-code order.
    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.is_legal(*a))
    }
}

impl fmt::Display for LegalMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Action::name).collect();
        write!(f, "[{}]", names.join(","))
    }
}
