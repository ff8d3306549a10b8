pub mod controller;
pub mod strategy;
pub mod tracker;

pub use self::{
    controller::{
        Adaptation, BossAiState, BossController, BossId, CombatOutcome, Encounter, PhaseChange,
    },
    strategy::{
        BASELINE_STRATEGIES, BossAction, BossStrategy, Comparison, Condition, Metric,
        StrategyCatalog, StrategyId, StrategyWeights,
    },
    tracker::{
        AbilityId, ArenaPoint, BehaviorProfile, BehaviorTracker, MovementPattern, PlayerAction,
        PlayerActionKind,
    },
};
