use std::collections::BTreeMap;

use bracket_random::prelude::RandomNumberGenerator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{config::GenerationConfig, data::Theme};

use super::{
    DungeonGenerationParams, GenerationWeights, MAX_DIFFICULTY, RoomFeedback, RoomId, RoomKind,
    room::{GeneratedRoom, RoomGenerator},
};

const LIKED_ENJOYMENT: f32 = 7.0;
const TOO_HARD: f32 = 8.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedDungeon {
    pub rooms: Vec<GeneratedRoom>,
    pub theme: Theme,
    pub estimated_difficulty: f32,
    pub ai_confidence: f32,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedDungeon {
    pub fn room(&self, id: RoomId) -> Option<&GeneratedRoom> {
        self.rooms.iter().find(|room| room.id == id)
    }
}

/// Orchestrates room generation and carries the feedback-driven bias across
/// every dungeon it builds.
#[derive(Debug)]
pub struct DungeonGenerator {
    config: GenerationConfig,
    weights: GenerationWeights,
    next_room_id: u64,
    /// Kinds of the most recent rooms, capped at `feedback_memory` entries.
    room_kinds: BTreeMap<RoomId, RoomKind>,
}

impl Default for DungeonGenerator {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

impl DungeonGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            config,
            weights: GenerationWeights::default(),
            next_room_id: 0,
            room_kinds: BTreeMap::new(),
        }
    }

    pub fn with_weights(mut self, weights: GenerationWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &GenerationWeights {
        &self.weights
    }

    pub fn generate_dungeon(
        &mut self,
        params: &DungeonGenerationParams,
        room_count: usize,
        rng: &mut RandomNumberGenerator,
    ) -> GeneratedDungeon {
        let theme = params
            .theme
            .unwrap_or_else(|| Theme::for_level(params.player_level));

        let mut rooms = Vec::with_capacity(room_count);
        {
            let generator = RoomGenerator::new(&self.config, &self.weights);
            for index in 0..room_count {
                let id = RoomId(self.next_room_id);
                self.next_room_id += 1;
                rooms.push(generator.generate_room(id, params, theme, index, room_count, rng));
            }
        }
        for room in &rooms {
            self.room_kinds.insert(room.id, room.kind);
        }
        while self.room_kinds.len() > self.config.feedback_memory {
            self.room_kinds.pop_first();
        }

        let (estimated_difficulty, ai_confidence) = if rooms.is_empty() {
            (0.0, 0.0)
        } else {
            let count = rooms.len() as f32;
            let mean_difficulty = rooms.iter().map(|r| r.difficulty).sum::<f32>() / count;
            let mean_score = rooms.iter().map(|r| r.ai_score).sum::<f32>() / count;
            let estimated = (mean_difficulty * 10.0).round() / 10.0;
            let fit = 1.0 - (estimated - params.difficulty()).abs() / MAX_DIFFICULTY;
            let confidence = (0.7 * (mean_score / 100.0) + 0.3 * fit).clamp(0.0, 1.0);
            (estimated, confidence)
        };

        info!(
            theme = theme.as_str(),
            rooms = rooms.len(),
            estimated_difficulty,
            ai_confidence,
            "dungeon generated"
        );

        GeneratedDungeon {
            rooms,
            theme,
            estimated_difficulty,
            ai_confidence,
            generated_at: Utc::now(),
        }
    }

    /// Nudges the global bias from one room's verdict. Rooms this generator
    /// never produced, or has since forgotten, are ignored.
    pub fn learn_from_feedback(&mut self, room_id: RoomId, feedback: &RoomFeedback) {
        let Some(kind) = self.room_kinds.get(&room_id).copied() else {
            debug!(room = %room_id, "feedback for unknown room ignored");
            return;
        };
        if feedback.enjoyment > LIKED_ENJOYMENT && feedback.completed {
            self.weights.reinforce(kind);
            debug!(
                room = %room_id,
                kind = kind.as_str(),
                bias = self.weights.bias(kind),
                "room kind reinforced"
            );
        }
        if feedback.difficulty > TOO_HARD && !feedback.completed {
            self.weights.ease_density();
            debug!(room = %room_id, density = self.weights.enemy_density, "enemy density eased");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rooms_yield_an_empty_dungeon() {
        let mut generator = DungeonGenerator::default();
        let mut rng = RandomNumberGenerator::seeded(1);
        let dungeon = generator.generate_dungeon(&DungeonGenerationParams::default(), 0, &mut rng);
        assert!(dungeon.rooms.is_empty());
        assert_eq!(dungeon.estimated_difficulty, 0.0);
        assert_eq!(dungeon.ai_confidence, 0.0);
        assert_eq!(dungeon.theme, Theme::Red);
    }

    #[test]
    fn theme_follows_level_unless_overridden() {
        let mut generator = DungeonGenerator::default();
        let mut rng = RandomNumberGenerator::seeded(2);
        let mut params = DungeonGenerationParams {
            player_level: 8,
            ..DungeonGenerationParams::default()
        };
        assert_eq!(generator.generate_dungeon(&params, 1, &mut rng).theme, Theme::Yellow);
        params.theme = Some(Theme::Violet);
        assert_eq!(generator.generate_dungeon(&params, 1, &mut rng).theme, Theme::Violet);
    }

    #[test]
    fn room_ids_are_unique_across_dungeons() {
        let mut generator = DungeonGenerator::default();
        let mut rng = RandomNumberGenerator::seeded(3);
        let params = DungeonGenerationParams::default();
        let first = generator.generate_dungeon(&params, 3, &mut rng);
        let second = generator.generate_dungeon(&params, 3, &mut rng);
        let ids: Vec<RoomId> = first.rooms.iter().chain(&second.rooms).map(|r| r.id).collect();
        assert_eq!(ids, (0..6).map(RoomId).collect::<Vec<_>>());
        assert!(second.room(RoomId(4)).is_some());
    }

    #[test]
    fn summary_numbers_stay_in_range() {
        let mut generator = DungeonGenerator::default();
        let mut rng = RandomNumberGenerator::seeded(4);
        let dungeon = generator.generate_dungeon(&DungeonGenerationParams::default(), 6, &mut rng);
        assert_eq!(dungeon.rooms.len(), 6);
        assert_eq!(dungeon.rooms[5].kind, RoomKind::Boss);
        assert!((0.0..=1.0).contains(&dungeon.ai_confidence));
        let tenths = dungeon.estimated_difficulty * 10.0;
        assert!((tenths - tenths.round()).abs() < 1e-3);
    }

    #[test]
    fn feedback_moves_the_bias() {
        let mut generator = DungeonGenerator::default();
        let mut rng = RandomNumberGenerator::seeded(5);
        let dungeon = generator.generate_dungeon(&DungeonGenerationParams::default(), 2, &mut rng);
        let boss = dungeon.rooms[1].id;

        generator.learn_from_feedback(
            boss,
            &RoomFeedback {
                enjoyment: 9.0,
                difficulty: 5.0,
                completed: true,
                time_spent_secs: 120.0,
            },
        );
        assert!((generator.weights().bias(RoomKind::Boss) - 0.01).abs() < 1e-6);

        generator.learn_from_feedback(
            boss,
            &RoomFeedback {
                enjoyment: 2.0,
                difficulty: 9.5,
                completed: false,
                time_spent_secs: 40.0,
            },
        );
        assert!((generator.weights().enemy_density - 0.99).abs() < 1e-6);
    }

    #[test]
    fn old_rooms_fall_out_of_feedback_memory() {
        let config = GenerationConfig {
            feedback_memory: 4,
            ..GenerationConfig::default()
        };
        let mut generator = DungeonGenerator::new(config);
        let mut rng = RandomNumberGenerator::seeded(6);
        let params = DungeonGenerationParams::default();
        let first = generator.generate_dungeon(&params, 3, &mut rng);
        let second = generator.generate_dungeon(&params, 3, &mut rng);
        assert_eq!(generator.room_kinds.len(), 4);
        assert!(!generator.room_kinds.contains_key(&first.rooms[0].id));

        let liked = RoomFeedback {
            enjoyment: 9.0,
            difficulty: 5.0,
            completed: true,
            time_spent_secs: 60.0,
        };
        generator.learn_from_feedback(first.rooms[0].id, &liked);
        assert_eq!(generator.weights(), &GenerationWeights::default());

        let latest = &second.rooms[2];
        generator.learn_from_feedback(latest.id, &liked);
        assert!((generator.weights().bias(latest.kind) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn memory_stays_bounded_over_many_dungeons() {
        let mut generator = DungeonGenerator::default();
        let mut rng = RandomNumberGenerator::seeded(7);
        let params = DungeonGenerationParams::default();
        for _ in 0..60 {
            generator.generate_dungeon(&params, 6, &mut rng);
        }
        assert_eq!(generator.room_kinds.len(), 256);
        assert_eq!(generator.room_kinds.keys().next(), Some(&RoomId(360 - 256)));
    }

    #[test]
    fn unknown_rooms_are_ignored() {
        let mut generator = DungeonGenerator::default();
        generator.learn_from_feedback(
            RoomId(77),
            &RoomFeedback {
                enjoyment: 10.0,
                difficulty: 10.0,
                completed: true,
                time_spent_secs: 1.0,
            },
        );
        assert_eq!(generator.weights(), &GenerationWeights::default());
    }
}
