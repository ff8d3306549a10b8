use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    ai::tracker::BehaviorProfile,
    config::ControllerConfig,
    error::Result,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    CloseTheGap,
    DefensiveCounter,
    AoeSpam,
    PredictionAttack,
    BurstDamage,
}

/// Profile values a strategy condition can test.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AvgDistanceFromBoss,
    AttackFrequency,
    DodgeFrequency,
    HealUsage,
    Predictability,
    ReactionTime,
}

impl Metric {
    pub fn read(&self, profile: &BehaviorProfile) -> f32 {
        match self {
            Metric::AvgDistanceFromBoss => profile.avg_distance_from_boss,
            Metric::AttackFrequency => profile.attack_frequency as f32,
            Metric::DodgeFrequency => profile.dodge_frequency as f32,
            Metric::HealUsage => profile.heal_usage as f32,
            Metric::Predictability => profile.predictability,
            Metric::ReactionTime => profile.reaction_time,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Condition {
    pub metric: Metric,
    pub comparison: Comparison,
    pub value: f32,
}

impl Condition {
    pub const fn new(metric: Metric, comparison: Comparison, value: f32) -> Self {
        Self {
            metric,
            comparison,
            value,
        }
    }

    pub fn holds(&self, profile: &BehaviorProfile) -> bool {
        let observed = self.metric.read(profile);
        match self.comparison {
            Comparison::Gt => observed > self.value,
            Comparison::Lt => observed < self.value,
            Comparison::Eq => (observed - self.value).abs() <= f32::EPSILON,
            Comparison::Ge => observed >= self.value,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Low,
    Normal,
    High,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapPlacement {
    AheadOfPlayer,
    OnPlayer,
}

/// Something the boss does. Durations are milliseconds, distances arena units.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BossAction {
    BasicAttack,
    Dash { speed_multiplier: f32, cadence: Cadence },
    RangedAttack { projectiles: u32 },
    CounterAttack { damage_multiplier: f32 },
    Knockback { distance: f32 },
    AoeAttack { radius: f32, waves: u32 },
    GroundHazard { duration_ms: u32 },
    PredictedStrike { lead_ms: u32 },
    Trap { placement: TrapPlacement },
    Combo { hits: u32, speed_multiplier: f32 },
    HealBlock { duration_ms: u32 },
}

impl BossAction {
    pub fn describe(&self) -> String {
        match self {
            BossAction::BasicAttack => "basic attack".to_string(),
            BossAction::Dash {
                speed_multiplier,
                cadence,
            } => format!("dash x{speed_multiplier} ({cadence:?} cadence)"),
            BossAction::RangedAttack { projectiles } => format!("ranged volley of {projectiles}"),
            BossAction::CounterAttack { damage_multiplier } => {
                format!("counter x{damage_multiplier}")
            }
            BossAction::Knockback { distance } => format!("knockback {distance}"),
            BossAction::AoeAttack { radius, waves } => format!("aoe r{radius} x{waves}"),
            BossAction::GroundHazard { duration_ms } => format!("ground hazard {duration_ms}ms"),
            BossAction::PredictedStrike { lead_ms } => format!("predicted strike +{lead_ms}ms"),
            BossAction::Trap { placement } => format!("trap {placement:?}"),
            BossAction::Combo {
                hits,
                speed_multiplier,
            } => format!("{hits}-hit combo x{speed_multiplier}"),
            BossAction::HealBlock { duration_ms } => format!("heal block {duration_ms}ms"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BossStrategy {
    pub id: StrategyId,
    pub name: &'static str,
    pub conditions: &'static [Condition],
    pub actions: &'static [BossAction],
    pub priority: u32,
}

impl BossStrategy {
    pub fn is_eligible(&self, profile: &BehaviorProfile) -> bool {
        self.conditions.iter().all(|condition| condition.holds(profile))
    }

    pub fn score(&self, profile: &BehaviorProfile, weights: &StrategyWeights) -> f32 {
        if !self.is_eligible(profile) {
            return 0.0;
        }
        self.priority as f32 * weights.get(self.id)
    }
}

pub static BASELINE_STRATEGIES: [BossStrategy; 5] = [
    BossStrategy {
        id: StrategyId::CloseTheGap,
        name: "Close the Gap",
        conditions: &[Condition::new(
            Metric::AvgDistanceFromBoss,
            Comparison::Gt,
            200.0,
        )],
        actions: &[
            BossAction::Dash {
                speed_multiplier: 2.0,
                cadence: Cadence::High,
            },
            BossAction::RangedAttack { projectiles: 3 },
        ],
        priority: 8,
    },
    BossStrategy {
        id: StrategyId::DefensiveCounter,
        name: "Defensive Counter",
        conditions: &[
            Condition::new(Metric::AvgDistanceFromBoss, Comparison::Lt, 100.0),
            Condition::new(Metric::AttackFrequency, Comparison::Gt, 2.0),
        ],
        actions: &[
            BossAction::CounterAttack {
                damage_multiplier: 1.5,
            },
            BossAction::Knockback { distance: 150.0 },
        ],
        priority: 9,
    },
    BossStrategy {
        id: StrategyId::AoeSpam,
        name: "AOE Spam",
        conditions: &[Condition::new(Metric::DodgeFrequency, Comparison::Gt, 3.0)],
        actions: &[
            BossAction::AoeAttack {
                radius: 200.0,
                waves: 3,
            },
            BossAction::GroundHazard { duration_ms: 5000 },
        ],
        priority: 7,
    },
    BossStrategy {
        id: StrategyId::PredictionAttack,
        name: "Prediction Attack",
        conditions: &[Condition::new(Metric::Predictability, Comparison::Gt, 0.7)],
        actions: &[
            BossAction::PredictedStrike { lead_ms: 500 },
            BossAction::Trap {
                placement: TrapPlacement::AheadOfPlayer,
            },
        ],
        priority: 10,
    },
    BossStrategy {
        id: StrategyId::BurstDamage,
        name: "Burst Damage",
        conditions: &[Condition::new(Metric::HealUsage, Comparison::Gt, 3.0)],
        actions: &[
            BossAction::Combo {
                hits: 5,
                speed_multiplier: 1.5,
            },
            BossAction::HealBlock { duration_ms: 3000 },
        ],
        priority: 8,
    },
];

/// Read-only strategy set shared by every encounter.
#[derive(Copy, Clone, Debug)]
pub struct StrategyCatalog {
    strategies: &'static [BossStrategy],
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::baseline()
    }
}

impl StrategyCatalog {
    pub const fn baseline() -> Self {
        Self {
            strategies: &BASELINE_STRATEGIES,
        }
    }

    pub fn list_strategies(&self) -> &'static [BossStrategy] {
        self.strategies
    }

    pub fn find(&self, id: StrategyId) -> Option<&'static BossStrategy> {
        self.strategies.iter().find(|strategy| strategy.id == id)
    }

    /// Highest `priority × weight` among eligible strategies; catalog order
    /// breaks ties.
    pub fn select(
        &self,
        profile: &BehaviorProfile,
        weights: &StrategyWeights,
    ) -> Option<&'static BossStrategy> {
        let mut best: Option<(&'static BossStrategy, f32)> = None;
        for strategy in self.strategies {
            let score = strategy.score(profile, weights);
            if score <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((strategy, score));
            }
        }
        best.map(|(strategy, _)| strategy)
    }
}

/// Learned per-strategy multipliers. Every write goes through this type so
/// values never leave `[min, max]`. Only the weight map is serialized; the
/// bounds always come from a [`ControllerConfig`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<StrategyId, f32>",
    into = "BTreeMap<StrategyId, f32>"
)]
pub struct StrategyWeights {
    min: f32,
    max: f32,
    weights: BTreeMap<StrategyId, f32>,
}

impl StrategyWeights {
    pub fn new(catalog: &StrategyCatalog, config: &ControllerConfig) -> Self {
        let weights = catalog
            .list_strategies()
            .iter()
            .map(|strategy| (strategy.id, 1.0))
            .collect();
        Self::from_map(weights, config)
    }

    /// Builds weights from raw values, clamping each into the configured
    /// bounds. Non-finite values fall back to neutral.
    pub fn from_map(weights: BTreeMap<StrategyId, f32>, config: &ControllerConfig) -> Self {
        let (min, max) = sane_bounds(config);
        let weights = weights
            .into_iter()
            .map(|(id, weight)| {
                let weight = if weight.is_finite() { weight } else { 1.0 };
                (id, weight.clamp(min, max))
            })
            .collect();
        Self { min, max, weights }
    }

    pub fn get(&self, id: StrategyId) -> f32 {
        self.weights
            .get(&id)
            .copied()
            .unwrap_or_else(|| 1.0f32.clamp(self.min, self.max))
    }

    pub fn set(&mut self, id: StrategyId, value: f32) -> f32 {
        let clamped = if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.get(id)
        };
        self.weights.insert(id, clamped);
        clamped
    }

    /// Moves a weight `rate` of the way toward `target`.
    pub fn nudge(&mut self, id: StrategyId, target: f32, rate: f32) -> f32 {
        let current = self.get(id);
        self.set(id, current + rate * (target - current))
    }

    pub fn iter(&self) -> impl Iterator<Item = (StrategyId, f32)> + '_ {
        self.weights.iter().map(|(id, weight)| (*id, *weight))
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.weights)?)
    }

    /// Parses an exported weight map under `config`'s bounds.
    pub fn from_json(source: &str, config: &ControllerConfig) -> Result<Self> {
        let weights: BTreeMap<StrategyId, f32> = serde_json::from_str(source)?;
        Ok(Self::from_map(weights, config))
    }
}

impl From<BTreeMap<StrategyId, f32>> for StrategyWeights {
    fn from(weights: BTreeMap<StrategyId, f32>) -> Self {
        Self::from_map(weights, &ControllerConfig::default())
    }
}

impl From<StrategyWeights> for BTreeMap<StrategyId, f32> {
    fn from(weights: StrategyWeights) -> Self {
        weights.weights
    }
}

fn sane_bounds(config: &ControllerConfig) -> (f32, f32) {
    let (min, max) = (config.min_weight, config.max_weight);
    if min.is_finite() && max.is_finite() && min <= max {
        (min, max)
    } else {
        let defaults = ControllerConfig::default();
        (defaults.min_weight, defaults.max_weight)
    }
}
