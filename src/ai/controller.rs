use std::{collections::HashMap, fmt::Write as _};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{
    ai::{
        strategy::{BossAction, BossStrategy, StrategyCatalog, StrategyId, StrategyWeights},
        tracker::{BehaviorProfile, BehaviorTracker, PlayerAction},
    },
    config::ControllerConfig,
    error::Result,
};

const BASE_AGGRESSION: u8 = 5;
const MAX_AGGRESSION: u8 = 10;
const BASE_LEARNING_RATE: f32 = 0.1;
const MAX_LEARNING_RATE: f32 = 0.3;
const FALLBACK_ACTIONS: [BossAction; 1] = [BossAction::BasicAttack];

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BossId(pub String);

impl BossId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for BossId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the combat loop observed after a boss action resolved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub damage_dealt: f32,
    pub player_hit: bool,
    pub player_dodged: bool,
}

impl CombatOutcome {
    /// Roughly `[0, 1.3]`; left unclamped so standout results move weights faster.
    pub fn effectiveness(&self) -> f32 {
        let hit = if self.player_hit { 0.5 } else { 0.0 };
        let damage = (self.damage_dealt.max(0.0) / 100.0).min(0.5);
        let pressure = if self.player_dodged { 0.0 } else { 0.3 };
        hit + damage + pressure
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adaptation {
    pub trigger: String,
    pub effect: String,
    pub effectiveness: f32,
    pub times_used: u32,
    #[serde(skip)]
    measured: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BossAiState {
    pub boss_id: BossId,
    pub current_phase: u32,
    pub health: f32,
    pub max_health: f32,
    pub aggression_level: u8,
    pub learning_rate: f32,
    pub strategy_weights: StrategyWeights,
    pub adaptations: Vec<Adaptation>,
}

impl BossAiState {
    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: u32,
    pub to: u32,
}

/// State for one live boss fight: the boss side and what it has learned
/// about the player.
#[derive(Clone, Debug)]
pub struct Encounter {
    pub state: BossAiState,
    tracker: BehaviorTracker,
}

impl Encounter {
    pub fn tracker(&self) -> &BehaviorTracker {
        &self.tracker
    }
}

/// Owns every active encounter, keyed by boss id. Encounters never share
/// weights or profiles.
#[derive(Debug, Default)]
pub struct BossController {
    config: ControllerConfig,
    catalog: StrategyCatalog,
    encounters: HashMap<BossId, Encounter>,
}

impl BossController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            catalog: StrategyCatalog::baseline(),
            encounters: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    pub fn encounter_count(&self) -> usize {
        self.encounters.len()
    }

    pub fn initialize(&mut self, boss_id: BossId, max_health: f32) -> &BossAiState {
        let max_health = if max_health.is_finite() {
            max_health.max(0.0)
        } else {
            0.0
        };
        let state = BossAiState {
            boss_id: boss_id.clone(),
            current_phase: 1,
            health: max_health,
            max_health,
            aggression_level: BASE_AGGRESSION,
            learning_rate: BASE_LEARNING_RATE,
            strategy_weights: StrategyWeights::new(&self.catalog, &self.config),
            adaptations: Vec::new(),
        };
        info!(boss = %boss_id, max_health, "encounter initialized");
        let encounter = Encounter {
            state,
            tracker: BehaviorTracker::new(),
        };
        self.encounters.insert(boss_id.clone(), encounter);
        &self.encounters[&boss_id].state
    }

    pub fn end_encounter(&mut self, boss_id: &BossId) -> Option<BossAiState> {
        let removed = self.encounters.remove(boss_id).map(|encounter| encounter.state);
        if removed.is_some() {
            info!(boss = %boss_id, "encounter ended");
        }
        removed
    }

    pub fn state(&self, boss_id: &BossId) -> Option<&BossAiState> {
        self.encounter(boss_id).map(|encounter| &encounter.state)
    }

    pub fn profile(&self, boss_id: &BossId) -> Option<&BehaviorProfile> {
        self.encounter(boss_id)
            .map(|encounter| encounter.tracker.profile())
    }

    /// Direct access to an encounter's profile, for harnesses that replay a
    /// known player rather than a stream of actions.
    pub fn profile_mut(&mut self, boss_id: &BossId) -> Option<&mut BehaviorProfile> {
        self.encounter_mut(boss_id)
            .map(|encounter| encounter.tracker.profile_mut())
    }

    pub fn encounter(&self, boss_id: &BossId) -> Option<&Encounter> {
        let found = self.encounters.get(boss_id);
        if found.is_none() {
            debug!(boss = %boss_id, "unknown encounter");
        }
        found
    }

    fn encounter_mut(&mut self, boss_id: &BossId) -> Option<&mut Encounter> {
        let found = self.encounters.get_mut(boss_id);
        if found.is_none() {
            debug!(boss = %boss_id, "unknown encounter");
        }
        found
    }

    pub fn update_behavior(&mut self, boss_id: &BossId, action: &PlayerAction) {
        if let Some(encounter) = self.encounter_mut(boss_id) {
            encounter.tracker.record_action(action);
        }
    }

    pub fn select_strategy(&self, boss_id: &BossId) -> Option<&'static BossStrategy> {
        let encounter = self.encounter(boss_id)?;
        let chosen = self.catalog.select(
            encounter.tracker.profile(),
            &encounter.state.strategy_weights,
        );
        match chosen {
            Some(strategy) => {
                debug!(boss = %boss_id, strategy = strategy.name, "strategy selected")
            }
            None => trace!(boss = %boss_id, "no eligible strategy"),
        }
        chosen
    }

    pub fn execute_action(
        &mut self,
        boss_id: &BossId,
        strategy: &BossStrategy,
    ) -> Option<Vec<BossAction>> {
        self.execute_action_at(boss_id, strategy, Utc::now())
    }

    /// Logs the strategy as an adaptation and returns its actions. `at` is
    /// when the actions become visible to the player.
    pub fn execute_action_at(
        &mut self,
        boss_id: &BossId,
        strategy: &BossStrategy,
        at: DateTime<Utc>,
    ) -> Option<Vec<BossAction>> {
        let encounter = self.encounter_mut(boss_id)?;
        let adaptations = &mut encounter.state.adaptations;
        match adaptations
            .iter_mut()
            .find(|entry| entry.trigger == strategy.name)
        {
            Some(entry) => entry.times_used += 1,
            None => adaptations.push(Adaptation {
                trigger: strategy.name.to_string(),
                effect: summarize(strategy.actions),
                effectiveness: 0.0,
                times_used: 1,
                measured: false,
            }),
        }
        encounter.tracker.note_boss_telegraph(at);
        Some(strategy.actions.to_vec())
    }

    /// Selects and executes in one step, falling back to a basic attack when
    /// no strategy is eligible.
    pub fn next_actions(&mut self, boss_id: &BossId, at: DateTime<Utc>) -> Option<Vec<BossAction>> {
        match self.select_strategy(boss_id) {
            Some(strategy) => self.execute_action_at(boss_id, strategy, at),
            None => {
                let encounter = self.encounter_mut(boss_id)?;
                encounter.tracker.note_boss_telegraph(at);
                Some(FALLBACK_ACTIONS.to_vec())
            }
        }
    }

    /// Returns the updated weight, or `None` for an unknown boss.
    pub fn learn_from_outcome(
        &mut self,
        boss_id: &BossId,
        strategy_id: StrategyId,
        outcome: &CombatOutcome,
    ) -> Option<f32> {
        let smoothing = self.config.effectiveness_smoothing.clamp(0.0, 1.0);
        let name = self.catalog.find(strategy_id).map(|strategy| strategy.name);
        let encounter = self.encounter_mut(boss_id)?;
        let effectiveness = outcome.effectiveness();
        let rate = encounter.state.learning_rate;
        let before = encounter.state.strategy_weights.get(strategy_id);
        let after = encounter
            .state
            .strategy_weights
            .nudge(strategy_id, effectiveness, rate);

        if let Some(entry) = name.and_then(|name| {
            encounter
                .state
                .adaptations
                .iter_mut()
                .find(|entry| entry.trigger == name)
        }) {
            entry.effectiveness = if entry.measured {
                entry.effectiveness * (1.0 - smoothing) + effectiveness * smoothing
            } else {
                effectiveness
            };
            entry.measured = true;
        }

        debug!(
            boss = %boss_id,
            strategy = ?strategy_id,
            effectiveness,
            before,
            after,
            "weight updated"
        );
        Some(after)
    }

    pub fn transition_phase(&mut self, boss_id: &BossId, new_phase: u32) {
        let Some(encounter) = self.encounter_mut(boss_id) else {
            return;
        };
        let phase = new_phase.max(1);
        let state = &mut encounter.state;
        let from = state.current_phase;
        state.current_phase = phase;
        state.aggression_level = phase
            .saturating_mul(2)
            .saturating_add(BASE_AGGRESSION as u32)
            .min(MAX_AGGRESSION as u32) as u8;
        state.learning_rate = (BASE_LEARNING_RATE + phase as f32 * 0.05).min(MAX_LEARNING_RATE);
        encounter.tracker.reset_counters();
        info!(
            boss = %boss_id,
            from,
            to = phase,
            aggression = state.aggression_level,
            learning_rate = state.learning_rate,
            "phase transition"
        );
    }

    /// Applies damage to the boss and moves it into the phase implied by the
    /// remaining health.
    pub fn apply_damage(&mut self, boss_id: &BossId, amount: f32) -> Option<PhaseChange> {
        let thresholds = self.config.phase_thresholds.clone();
        let encounter = self.encounter_mut(boss_id)?;
        let state = &mut encounter.state;
        if amount.is_finite() && amount > 0.0 {
            state.health = (state.health - amount).max(0.0);
        }
        let ratio = state.health_ratio();
        let crossed = thresholds.iter().filter(|threshold| ratio <= **threshold).count() as u32;
        let target = 1 + crossed;
        let from = state.current_phase;
        if target <= from {
            return None;
        }
        self.transition_phase(boss_id, target);
        Some(PhaseChange { from, to: target })
    }

    pub fn difficulty_multiplier(&self, boss_id: &BossId) -> Option<f32> {
        let state = self.state(boss_id)?;
        let adaptation_bonus = (state.adaptations.len() as f32 * 0.05).min(0.5);
        let phase_bonus = state.current_phase.saturating_sub(1) as f32 * 0.2;
        Some(1.0 + adaptation_bonus + phase_bonus)
    }

    pub fn export_weights(&self, boss_id: &BossId) -> Option<Result<String>> {
        self.state(boss_id)
            .map(|state| state.strategy_weights.to_json())
    }

    /// Replaces an encounter's learned weights. Returns false for an unknown boss.
    pub fn restore_weights(&mut self, boss_id: &BossId, weights: StrategyWeights) -> bool {
        let mut restored = StrategyWeights::new(&self.catalog, &self.config);
        for (id, weight) in weights.iter() {
            restored.set(id, weight);
        }
        let Some(encounter) = self.encounter_mut(boss_id) else {
            return false;
        };
        encounter.state.strategy_weights = restored;
        true
    }

    pub fn ai_insights(&self, boss_id: &BossId) -> Option<String> {
        let encounter = self.encounter(boss_id)?;
        let state = &encounter.state;
        let profile = encounter.tracker.profile();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Boss {} | phase {} | hp {:.0}/{:.0} | aggression {} | learning rate {:.2}",
            state.boss_id,
            state.current_phase,
            state.health,
            state.max_health,
            state.aggression_level,
            state.learning_rate
        );
        let _ = writeln!(
            out,
            "Player reads as {} at {:.0} units, predictability {:.0}%, reaction {:.0}ms",
            profile.movement_pattern.as_str(),
            profile.avg_distance_from_boss,
            profile.predictability * 100.0,
            profile.reaction_time
        );
        let _ = writeln!(
            out,
            "Counters: {} attacks, {} dodges, {} heals",
            profile.attack_frequency, profile.dodge_frequency, profile.heal_usage
        );

        let mut ranked: Vec<(StrategyId, f32)> = state.strategy_weights.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let weights = ranked
            .iter()
            .filter_map(|(id, weight)| {
                self.catalog
                    .find(*id)
                    .map(|strategy| format!("{} {:.2}", strategy.name, weight))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Weights: {weights}");

        if state.adaptations.is_empty() {
            let _ = write!(out, "No adaptations yet.");
        } else {
            for adaptation in &state.adaptations {
                let _ = writeln!(
                    out,
                    "- {} x{} ({}) effectiveness {:.0}%",
                    adaptation.trigger,
                    adaptation.times_used,
                    adaptation.effect,
                    adaptation.effectiveness * 100.0
                );
            }
        }
        if let Some(multiplier) = self.difficulty_multiplier(boss_id) {
            let _ = write!(out, "Difficulty x{multiplier:.2}");
        }
        Some(out)
    }
}

fn summarize(actions: &[BossAction]) -> String {
    actions
        .iter()
        .map(BossAction::describe)
        .collect::<Vec<_>>()
        .join(" + ")
}
