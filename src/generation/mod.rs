pub mod dungeon;
pub mod room;

use serde::{Deserialize, Serialize};

use crate::data::{Theme, monsters::EnemyBehavior};

pub use self::{
    dungeon::{DungeonGenerator, GeneratedDungeon},
    room::{GeneratedRoom, PlacedEnemy, PlacedHazard, PlacedItem, RoomGenerator},
};

/// Highest difficulty a request may ask for; larger values are clamped.
pub const MAX_DIFFICULTY: f32 = 10.0;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStyle {
    Aggressive,
    Defensive,
    #[default]
    Balanced,
    Explorer,
}

impl PlayStyle {
    pub const ALL: [PlayStyle; 4] = [
        PlayStyle::Aggressive,
        PlayStyle::Defensive,
        PlayStyle::Balanced,
        PlayStyle::Explorer,
    ];

    pub fn index(&self) -> usize {
        match self {
            PlayStyle::Aggressive => 0,
            PlayStyle::Defensive => 1,
            PlayStyle::Balanced => 2,
            PlayStyle::Explorer => 3,
        }
    }

    /// Enemy temperaments that push back on this way of playing.
    pub fn behavior_pool(&self) -> &'static [EnemyBehavior] {
        match self {
            PlayStyle::Aggressive => &[
                EnemyBehavior::Guardian,
                EnemyBehavior::Sniper,
                EnemyBehavior::Ambusher,
            ],
            PlayStyle::Defensive => &[
                EnemyBehavior::Charger,
                EnemyBehavior::Flanker,
                EnemyBehavior::Swarmer,
            ],
            PlayStyle::Balanced => &[
                EnemyBehavior::Hunter,
                EnemyBehavior::Flanker,
                EnemyBehavior::Guardian,
                EnemyBehavior::Charger,
            ],
            PlayStyle::Explorer => &[
                EnemyBehavior::Patroller,
                EnemyBehavior::Ambusher,
                EnemyBehavior::Sniper,
            ],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Combat,
    Puzzle,
    Treasure,
    Boss,
    Safe,
    Trap,
}

impl RoomKind {
    pub const ALL: [RoomKind; 6] = [
        RoomKind::Combat,
        RoomKind::Puzzle,
        RoomKind::Treasure,
        RoomKind::Boss,
        RoomKind::Safe,
        RoomKind::Trap,
    ];

    pub fn index(&self) -> usize {
        match self {
            RoomKind::Combat => 0,
            RoomKind::Puzzle => 1,
            RoomKind::Treasure => 2,
            RoomKind::Boss => 3,
            RoomKind::Safe => 4,
            RoomKind::Trap => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Combat => "combat",
            RoomKind::Puzzle => "puzzle",
            RoomKind::Treasure => "treasure",
            RoomKind::Boss => "boss",
            RoomKind::Safe => "safe",
            RoomKind::Trap => "trap",
        }
    }

    /// Fixed preference over `[difficulty, progress, deaths, aggressive,
    /// defensive, balanced, explorer]`.
    pub fn feature_weights(&self) -> [f32; 7] {
        match self {
            RoomKind::Combat => [0.8, 0.3, -0.2, 0.6, 0.2, 0.4, 0.1],
            RoomKind::Puzzle => [0.3, 0.2, 0.0, 0.0, 0.3, 0.2, 0.6],
            RoomKind::Treasure => [0.2, 0.4, 0.1, 0.1, 0.2, 0.2, 0.5],
            RoomKind::Boss => [0.1, 0.4, -0.5, 0.1, 0.1, 0.1, 0.1],
            RoomKind::Safe => [-0.4, 0.1, 0.9, 0.0, 0.4, 0.2, 0.1],
            RoomKind::Trap => [0.6, 0.3, -0.1, 0.2, 0.0, 0.3, 0.4],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSummary {
    pub avg_clear_time_secs: f32,
    pub death_count: u32,
    pub preferred_enemy_types: Vec<String>,
    pub avoided_enemy_types: Vec<String>,
}

/// A level-start request from the session layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonGenerationParams {
    pub player_level: u32,
    pub player_skills: Vec<String>,
    pub play_style: PlayStyle,
    pub performance: PerformanceSummary,
    pub desired_difficulty: f32,
    pub theme: Option<Theme>,
}

impl Default for DungeonGenerationParams {
    fn default() -> Self {
        Self {
            player_level: 1,
            player_skills: Vec::new(),
            play_style: PlayStyle::default(),
            performance: PerformanceSummary::default(),
            desired_difficulty: 5.0,
            theme: None,
        }
    }
}

impl DungeonGenerationParams {
    /// Desired difficulty with NaN and out-of-range values folded into `[0, 10]`.
    pub fn difficulty(&self) -> f32 {
        if self.desired_difficulty.is_finite() {
            self.desired_difficulty.clamp(0.0, MAX_DIFFICULTY)
        } else {
            0.0
        }
    }

    pub fn prefers(&self, enemy: &str) -> bool {
        self.performance
            .preferred_enemy_types
            .iter()
            .any(|name| name == enemy)
    }

    pub fn avoids(&self, enemy: &str) -> bool {
        self.performance
            .avoided_enemy_types
            .iter()
            .any(|name| name == enemy)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u64);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

/// Player verdict on a cleared (or abandoned) room. Scores are 0–10.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomFeedback {
    pub enjoyment: f32,
    pub difficulty: f32,
    pub completed: bool,
    pub time_spent_secs: f32,
}

const BIAS_STEP: f32 = 0.01;
const MIN_ENEMY_DENSITY: f32 = 0.1;

/// Slow global bias learned from room feedback, shared by every dungeon a
/// generator produces. `room_bias` is added to a kind's feature score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationWeights {
    pub room_bias: [f32; 6],
    pub enemy_density: f32,
}

impl Default for GenerationWeights {
    fn default() -> Self {
        Self {
            room_bias: [0.0; 6],
            enemy_density: 1.0,
        }
    }
}

impl GenerationWeights {
    pub fn bias(&self, kind: RoomKind) -> f32 {
        self.room_bias[kind.index()]
    }

    pub fn reinforce(&mut self, kind: RoomKind) {
        self.room_bias[kind.index()] += BIAS_STEP;
    }

    pub fn ease_density(&mut self) {
        self.enemy_density = (self.enemy_density - BIAS_STEP).max(MIN_ENEMY_DENSITY);
    }
}
