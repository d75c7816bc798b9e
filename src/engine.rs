use std::fmt;

pub const MAX_HEALTH: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Idle,
    MagicMissile,
    Fireball,
    Dagger,
    Staff,
    Globe,
    Stoneskin,
    Heal,
    Strength,
}

impl Action {
    pub const COUNT: usize = 9;

    /// Every action in protocol-code order.
    pub const ALL: [Action; Action::COUNT] = [
        Action::Idle,
        Action::MagicMissile,
        Action::Fireball,
        Action::Dagger,
        Action::Staff,
        Action::Globe,
        Action::Stoneskin,
        Action::Heal,
        Action::Strength,
    ];

    /// Row of this action in the weight matrix, equal to its protocol code.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Action> {
        Action::ALL.get(idx).copied()
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Action> {
        usize::try_from(code).ok().and_then(Action::from_index)
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Idle => "idle",
            Action::MagicMissile => "missile",
            Action::Fireball => "fireball",
            Action::Dagger => "dagger",
            Action::Staff => "staff",
            Action::Globe => "globe",
            Action::Stoneskin => "stoneskin",
            Action::Heal => "heal",
            Action::Strength => "strength",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Globe, stoneskin and strength effects active on one side this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusEffects {
    pub globe: bool,
    pub stoneskin: bool,
    pub strength: bool,
}

/// The observable, non-accumulated part of a referee report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusReport {
    pub my_status: StatusEffects,
    pub opp_status: StatusEffects,
    // The opponent's health is hidden, the referee reports its thresholds instead.
    pub opp_low_health: bool,
    pub opp_critical_health: bool,
}

/// One resolved turn as reported by the referee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Turn {
    pub my_action: Action,
    pub opp_action: Action,
    pub damage_dealt: i32,
    pub damage_taken: i32,
    pub status: StatusReport,
    pub round_ended: bool,
}

impl Turn {
    /// Net damage differential for the turn, negative when we took more than we dealt.
    pub fn reward(&self) -> f64 {
        f64::from(self.damage_dealt) - f64::from(self.damage_taken)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerState {
    pub health: i32,
    pub healing_potion: bool,
    pub strength_potion: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState {
            health: MAX_HEALTH,
            healing_potion: true,
            strength_potion: true,
        }
    }
}

impl PlayerState {
    /// Negative damage heals; health stays within [0, MAX_HEALTH].
    pub fn apply_damage(&mut self, damage: i32) {
        self.health = self.health.saturating_sub(damage).clamp(0, MAX_HEALTH);
    }

    /// Potions are one-shot for the whole match.
    pub fn consume(&mut self, action: Action) {
        match action {
            Action::Heal => self.healing_potion = false,
            Action::Strength => self.strength_potion = false,
            _ => {}
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |b: bool| if b { '+' } else { '-' };
        write!(
            f,
            "hp={} heal{} str{}",
            self.health,
            flag(self.healing_potion),
            flag(self.strength_potion)
        )
    }
}

/// Both sides' accumulated state plus the latest status report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MatchState {
    pub me: PlayerState,
    pub opponent: PlayerState,
    pub status: StatusReport,
}

impl MatchState {
    pub fn new() -> Self {
        MatchState::default()
    }

    pub fn apply_turn(&mut self, turn: &Turn) {
        self.me.apply_damage(turn.damage_taken);
        self.me.consume(turn.my_action);

        self.opponent.apply_damage(turn.damage_dealt);
        self.opponent.consume(turn.opp_action);

        self.status = turn.status;
    }

    /// Clears the per-round status indicators. Consumed potions stay consumed.
    pub fn start_round(&mut self, reset_health: bool) {
        self.status = StatusReport::default();
        if reset_health {
            self.me.health = MAX_HEALTH;
            self.opponent.health = MAX_HEALTH;
        }
    }
}
