use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Samples kept for movement-pattern detection and general history.
pub const HISTORY_CAPACITY: usize = 100;
/// Samples required before predictability is derived from the history.
pub const PREDICTABILITY_WINDOW: usize = 20;
/// Distance samples averaged when classifying movement.
pub const PATTERN_WINDOW: usize = 10;

const BACKPEDAL_DISTANCE: f32 = 250.0;
const AGGRESSIVE_DISTANCE: f32 = 100.0;
const CIRCLE_DEVIATION: f32 = 30.0;
const NEUTRAL_PREDICTABILITY: f32 = 0.5;

/// Position in arena units, the same space boss distances are measured in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaPoint {
    pub x: f32,
    pub y: f32,
}

impl ArenaPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: ArenaPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbilityId(pub String);

impl AbilityId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerActionKind {
    Attack,
    Dodge,
    Heal,
    Move,
    Ability(AbilityId),
}

/// One event reported by the combat loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerAction {
    pub kind: PlayerActionKind,
    pub position: ArenaPoint,
    pub boss_position: Option<ArenaPoint>,
    pub timestamp: DateTime<Utc>,
}

impl PlayerAction {
    pub fn new(kind: PlayerActionKind, position: ArenaPoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            position,
            boss_position: None,
            timestamp,
        }
    }

    pub fn with_boss_at(mut self, boss_position: ArenaPoint) -> Self {
        self.boss_position = Some(boss_position);
        self
    }

    pub fn distance_to_boss(&self) -> Option<f32> {
        self.boss_position.map(|boss| self.position.distance(boss))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Circle,
    Backpedal,
    Aggressive,
    #[default]
    Erratic,
}

impl MovementPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementPattern::Circle => "circle",
            MovementPattern::Backpedal => "backpedal",
            MovementPattern::Aggressive => "aggressive",
            MovementPattern::Erratic => "erratic",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub avg_distance_from_boss: f32,
    pub attack_frequency: u32,
    pub dodge_frequency: u32,
    pub heal_usage: u32,
    pub ability_usage: BTreeMap<AbilityId, u32>,
    pub movement_pattern: MovementPattern,
    /// Milliseconds between a boss telegraph and the player's dodge.
    pub reaction_time: f32,
    pub predictability: f32,
}

impl Default for BehaviorProfile {
    fn default() -> Self {
        Self {
            avg_distance_from_boss: 0.0,
            attack_frequency: 0,
            dodge_frequency: 0,
            heal_usage: 0,
            ability_usage: BTreeMap::new(),
            movement_pattern: MovementPattern::default(),
            reaction_time: 0.0,
            predictability: NEUTRAL_PREDICTABILITY,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Sample {
    distance: Option<f32>,
    /// Counter snapshots, relative to the last counter reset.
    attacks: i64,
    dodges: i64,
}

/// Rolling view of how one player fights one boss.
#[derive(Clone, Debug, Default)]
pub struct BehaviorTracker {
    profile: BehaviorProfile,
    history: VecDeque<Sample>,
    last_telegraph: Option<DateTime<Utc>>,
    reaction_samples: u32,
}

impl BehaviorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> &BehaviorProfile {
        &self.profile
    }

    pub(crate) fn profile_mut(&mut self) -> &mut BehaviorProfile {
        &mut self.profile
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    pub fn record_action(&mut self, action: &PlayerAction) {
        let mut distance = None;
        match &action.kind {
            PlayerActionKind::Attack => self.profile.attack_frequency += 1,
            PlayerActionKind::Dodge => {
                self.profile.dodge_frequency += 1;
                self.fold_reaction_time(action.timestamp);
            }
            PlayerActionKind::Heal => self.profile.heal_usage += 1,
            PlayerActionKind::Ability(id) => {
                *self.profile.ability_usage.entry(id.clone()).or_insert(0) += 1;
            }
            PlayerActionKind::Move => {
                if let Some(sample) = action.distance_to_boss() {
                    self.profile.avg_distance_from_boss =
                        (self.profile.avg_distance_from_boss + sample) / 2.0;
                    distance = Some(sample);
                }
            }
        }

        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(Sample {
            distance,
            attacks: self.profile.attack_frequency as i64,
            dodges: self.profile.dodge_frequency as i64,
        });

        if let Some(pattern) = self.classify_movement() {
            self.profile.movement_pattern = pattern;
        }
        self.profile.predictability = self.derive_predictability();
    }

    /// Marks the moment a boss action became visible to the player; the next
    /// dodge measures its reaction time against it.
    pub fn note_boss_telegraph(&mut self, at: DateTime<Utc>) {
        self.last_telegraph = Some(at);
    }

    /// Zeroes the attack, dodge and heal counters. Snapshots already in the
    /// history are shifted by the same amount so predictability reads the
    /// same spread before and after.
    pub fn reset_counters(&mut self) {
        let attacks = self.profile.attack_frequency as i64;
        let dodges = self.profile.dodge_frequency as i64;
        for sample in &mut self.history {
            sample.attacks -= attacks;
            sample.dodges -= dodges;
        }
        self.profile.attack_frequency = 0;
        self.profile.dodge_frequency = 0;
        self.profile.heal_usage = 0;
    }

    fn fold_reaction_time(&mut self, dodged_at: DateTime<Utc>) {
        let Some(telegraph) = self.last_telegraph.take() else {
            return;
        };
        let elapsed = dodged_at.signed_duration_since(telegraph).num_milliseconds();
        if elapsed < 0 {
            return;
        }
        let sample = elapsed as f32;
        self.profile.reaction_time = if self.reaction_samples == 0 {
            sample
        } else {
            (self.profile.reaction_time + sample) / 2.0
        };
        self.reaction_samples += 1;
    }

    fn recent_distances(&self) -> Vec<f32> {
        let mut distances: Vec<f32> = self
            .history
            .iter()
            .rev()
            .filter_map(|sample| sample.distance)
            .take(PATTERN_WINDOW)
            .collect();
        distances.reverse();
        distances
    }

    fn classify_movement(&self) -> Option<MovementPattern> {
        let distances = self.recent_distances();
        if distances.is_empty() {
            return None;
        }
        let avg = mean(&distances);
        let pattern = if avg > BACKPEDAL_DISTANCE {
            MovementPattern::Backpedal
        } else if avg < AGGRESSIVE_DISTANCE {
            MovementPattern::Aggressive
        } else if std_dev(&distances) < CIRCLE_DEVIATION {
            MovementPattern::Circle
        } else {
            MovementPattern::Erratic
        };
        Some(pattern)
    }

    fn derive_predictability(&self) -> f32 {
        if self.history.len() < PREDICTABILITY_WINDOW {
            return NEUTRAL_PREDICTABILITY;
        }
        let window = self.history.iter().rev().take(PREDICTABILITY_WINDOW);
        let (attacks, dodges): (Vec<f32>, Vec<f32>) = window
            .map(|sample| (sample.attacks as f32, sample.dodges as f32))
            .unzip();
        let spread = (std_dev(&attacks) + std_dev(&dodges)) / 10.0;
        (1.0 - spread.min(1.0)).clamp(0.0, 1.0)
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg) * (v - avg)).sum::<f32>() / values.len() as f32;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn act(kind: PlayerActionKind) -> PlayerAction {
        PlayerAction::new(kind, ArenaPoint::new(0.0, 0.0), t0())
    }

    fn step_at(distance: f32) -> PlayerAction {
        PlayerAction::new(PlayerActionKind::Move, ArenaPoint::new(distance, 0.0), t0())
            .with_boss_at(ArenaPoint::new(0.0, 0.0))
    }

    #[test]
    fn counters_follow_action_kinds() {
        let mut tracker = BehaviorTracker::new();
        tracker.record_action(&act(PlayerActionKind::Attack));
        tracker.record_action(&act(PlayerActionKind::Attack));
        tracker.record_action(&act(PlayerActionKind::Dodge));
        tracker.record_action(&act(PlayerActionKind::Heal));
        tracker.record_action(&act(PlayerActionKind::Ability(AbilityId::new("blink"))));
        tracker.record_action(&act(PlayerActionKind::Ability(AbilityId::new("blink"))));

        let profile = tracker.profile();
        assert_eq!(profile.attack_frequency, 2);
        assert_eq!(profile.dodge_frequency, 1);
        assert_eq!(profile.heal_usage, 1);
        assert_eq!(profile.ability_usage[&AbilityId::new("blink")], 2);
    }

    #[test]
    fn distance_average_halves_toward_each_sample() {
        let mut tracker = BehaviorTracker::new();
        tracker.record_action(&step_at(200.0));
        assert_eq!(tracker.profile().avg_distance_from_boss, 100.0);
        tracker.record_action(&step_at(300.0));
        assert_eq!(tracker.profile().avg_distance_from_boss, 200.0);
    }

    #[test]
    fn moves_without_boss_position_are_ignored_for_distance() {
        let mut tracker = BehaviorTracker::new();
        tracker.record_action(&act(PlayerActionKind::Move));
        assert_eq!(tracker.profile().avg_distance_from_boss, 0.0);
        assert_eq!(tracker.profile().movement_pattern, MovementPattern::Erratic);
    }

    #[test]
    fn movement_patterns_by_distance() {
        let mut far = BehaviorTracker::new();
        (0..10).for_each(|_| far.record_action(&step_at(400.0)));
        assert_eq!(far.profile().movement_pattern, MovementPattern::Backpedal);

        let mut close = BehaviorTracker::new();
        (0..10).for_each(|_| close.record_action(&step_at(40.0)));
        assert_eq!(close.profile().movement_pattern, MovementPattern::Aggressive);

        let mut steady = BehaviorTracker::new();
        (0..10).for_each(|i| steady.record_action(&step_at(170.0 + (i % 2) as f32 * 10.0)));
        assert_eq!(steady.profile().movement_pattern, MovementPattern::Circle);

        let mut jumpy = BehaviorTracker::new();
        (0..10).for_each(|i| jumpy.record_action(&step_at(if i % 2 == 0 { 110.0 } else { 240.0 })));
        assert_eq!(jumpy.profile().movement_pattern, MovementPattern::Erratic);
    }

    #[test]
    fn predictability_waits_for_a_full_window() {
        let mut tracker = BehaviorTracker::new();
        for _ in 0..(PREDICTABILITY_WINDOW - 1) {
            tracker.record_action(&act(PlayerActionKind::Heal));
        }
        assert_eq!(tracker.profile().predictability, 0.5);
        tracker.record_action(&act(PlayerActionKind::Heal));
        assert_eq!(tracker.profile().predictability, 1.0);
    }

    #[test]
    fn attack_spam_lowers_predictability() {
        let mut tracker = BehaviorTracker::new();
        for _ in 0..40 {
            tracker.record_action(&act(PlayerActionKind::Attack));
        }
        // 20 consecutive counter values spread ~5.77 apart
        let p = tracker.profile().predictability;
        assert!(p > 0.4 && p < 0.45, "predictability was {p}");
    }

    #[test]
    fn history_is_bounded() {
        let mut tracker = BehaviorTracker::new();
        for _ in 0..(HISTORY_CAPACITY * 2) {
            tracker.record_action(&act(PlayerActionKind::Attack));
        }
        assert_eq!(tracker.sample_count(), HISTORY_CAPACITY);
    }

    #[test]
    fn reaction_time_measures_telegraph_to_dodge() {
        let mut tracker = BehaviorTracker::new();
        tracker.note_boss_telegraph(t0());
        let dodge = PlayerAction::new(
            PlayerActionKind::Dodge,
            ArenaPoint::default(),
            t0() + Duration::milliseconds(400),
        );
        tracker.record_action(&dodge);
        assert_eq!(tracker.profile().reaction_time, 400.0);

        tracker.note_boss_telegraph(t0());
        let slower = PlayerAction {
            timestamp: t0() + Duration::milliseconds(200),
            ..dodge.clone()
        };
        tracker.record_action(&slower);
        assert_eq!(tracker.profile().reaction_time, 300.0);

        // no telegraph pending, no change
        tracker.record_action(&dodge);
        assert_eq!(tracker.profile().reaction_time, 300.0);
    }

    #[test]
    fn reset_clears_counters_only() {
        let mut tracker = BehaviorTracker::new();
        tracker.record_action(&act(PlayerActionKind::Attack));
        tracker.record_action(&step_at(80.0));
        tracker.reset_counters();
        let profile = tracker.profile();
        assert_eq!(profile.attack_frequency, 0);
        assert_eq!(profile.avg_distance_from_boss, 40.0);
    }

    #[test]
    fn reset_keeps_a_steady_player_predictable() {
        let mut tracker = BehaviorTracker::new();
        for _ in 0..30 {
            tracker.record_action(&act(PlayerActionKind::Attack));
        }
        for _ in 0..PREDICTABILITY_WINDOW {
            tracker.record_action(&step_at(150.0));
        }
        assert_eq!(tracker.profile().predictability, 1.0);

        tracker.reset_counters();
        tracker.record_action(&step_at(150.0));
        assert_eq!(tracker.profile().predictability, 1.0);
    }

    #[test]
    fn reset_preserves_the_window_spread() {
        let mut shifted = BehaviorTracker::new();
        let mut untouched = BehaviorTracker::new();
        for i in 0..40 {
            let kind = if i % 3 == 0 {
                PlayerActionKind::Dodge
            } else {
                PlayerActionKind::Attack
            };
            shifted.record_action(&act(kind.clone()));
            untouched.record_action(&act(kind));
        }
        shifted.reset_counters();
        shifted.record_action(&act(PlayerActionKind::Attack));
        untouched.record_action(&act(PlayerActionKind::Attack));
        let a = shifted.profile().predictability;
        let b = untouched.profile().predictability;
        assert!((a - b).abs() < 1e-5, "{a} vs {b}");
    }
}
