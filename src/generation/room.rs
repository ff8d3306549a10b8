use std::collections::HashSet;

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    config::GenerationConfig,
    data::{
        HazardKind, SPECTRUM, Theme,
        items::{ItemKind, Rarity, loot_table},
        monsters::{EnemyBehavior, EnemyStats, MonsterTemplate, SpecialAbility},
    },
    map::RoomLayout,
};

use super::{DungeonGenerationParams, GenerationWeights, RoomId, RoomKind};

const BOSS_FLOOR_CHANCE: f64 = 0.6;
const ROOM_FLOOR_CHANCE: f64 = 0.5;
const MAX_AI_SCORE: f32 = 100.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedEnemy {
    pub name: String,
    pub glyph: char,
    pub position: Point,
    pub behavior: EnemyBehavior,
    pub stats: EnemyStats,
    pub ability: Option<SpecialAbility>,
    pub is_boss: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub name: String,
    pub description: String,
    pub kind: ItemKind,
    pub rarity: Rarity,
    pub position: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedHazard {
    pub kind: HazardKind,
    pub position: Point,
}

/// A finished room, ready for the spawner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRoom {
    pub id: RoomId,
    pub index: usize,
    pub kind: RoomKind,
    pub theme: Theme,
    pub layout: RoomLayout,
    pub special: Option<Point>,
    pub enemies: Vec<PlacedEnemy>,
    pub items: Vec<PlacedItem>,
    pub hazards: Vec<PlacedHazard>,
    pub complexity: f32,
    pub connectivity: f32,
    pub difficulty: f32,
    pub ai_score: f32,
}

impl GeneratedRoom {
    pub fn occupied(&self) -> impl Iterator<Item = Point> + '_ {
        self.enemies
            .iter()
            .map(|e| e.position)
            .chain(self.items.iter().map(|i| i.position))
            .chain(self.hazards.iter().map(|h| h.position))
    }
}

/// Builds single rooms. Borrows the tunables and learned weights of the
/// dungeon generator that owns it.
pub struct RoomGenerator<'a> {
    config: &'a GenerationConfig,
    weights: &'a GenerationWeights,
}

impl<'a> RoomGenerator<'a> {
    pub fn new(config: &'a GenerationConfig, weights: &'a GenerationWeights) -> Self {
        Self { config, weights }
    }

    pub fn generate_room(
        &self,
        id: RoomId,
        params: &DungeonGenerationParams,
        theme: Theme,
        room_index: usize,
        total_rooms: usize,
        rng: &mut RandomNumberGenerator,
    ) -> GeneratedRoom {
        let difficulty = params.difficulty();
        let kind = self.predict_kind(params, room_index, total_rooms, rng);

        let mut layout = self.build_layout(kind, difficulty, rng);
        let special = match kind {
            RoomKind::Boss | RoomKind::Treasure | RoomKind::Puzzle => {
                layout.mark_special_near_center()
            }
            _ => None,
        };
        let mut open_tiles = layout.floor_points();

        let enemies = self.place_enemies(kind, params, theme, difficulty, &mut open_tiles, rng);
        let items = place_items(kind, theme, &mut open_tiles, rng);
        let hazards = place_hazards(theme, difficulty, &mut open_tiles, rng);

        let complexity = layout.complexity();
        let connectivity = layout.connectivity();
        let difficulty_score = room_difficulty(enemies.len(), hazards.len(), complexity);
        let ai_score = ai_score(&enemies, items.len(), complexity, params);

        trace!(
            room = %id,
            kind = kind.as_str(),
            enemies = enemies.len(),
            items = items.len(),
            hazards = hazards.len(),
            difficulty = difficulty_score,
            ai_score,
            "room generated"
        );

        GeneratedRoom {
            id,
            index: room_index,
            kind,
            theme,
            layout,
            special,
            enemies,
            items,
            hazards,
            complexity,
            connectivity,
            difficulty: difficulty_score,
            ai_score,
        }
    }

    /// `[difficulty/10, progress, deaths/10, one-hot play style]`.
    pub fn features(
        params: &DungeonGenerationParams,
        room_index: usize,
        total_rooms: usize,
    ) -> [f32; 7] {
        let progress = if total_rooms == 0 {
            0.0
        } else {
            room_index as f32 / total_rooms as f32
        };
        let mut features = [0.0; 7];
        features[0] = params.difficulty() / 10.0;
        features[1] = progress;
        features[2] = params.performance.death_count as f32 / 10.0;
        features[3 + params.play_style.index()] = 1.0;
        features
    }

    pub fn predict_kind(
        &self,
        params: &DungeonGenerationParams,
        room_index: usize,
        total_rooms: usize,
        rng: &mut RandomNumberGenerator,
    ) -> RoomKind {
        if total_rooms > 0 && room_index == total_rooms - 1 {
            return RoomKind::Boss;
        }
        if params.performance.death_count > self.config.safe_room_death_threshold
            && rng.rand::<f64>() < self.config.safe_room_chance
        {
            return RoomKind::Safe;
        }

        let features = Self::features(params, room_index, total_rooms);
        let mut best = (RoomKind::Combat, f32::NEG_INFINITY);
        for kind in RoomKind::ALL {
            let score = self.kind_score(kind, &features);
            if score > best.1 {
                best = (kind, score);
            }
        }
        best.0
    }

    /// Feature preference for `kind` plus its learned bias.
    pub fn kind_score(&self, kind: RoomKind, features: &[f32; 7]) -> f32 {
        let dot: f32 = kind
            .feature_weights()
            .iter()
            .zip(features.iter())
            .map(|(w, f)| w * f)
            .sum();
        dot + self.weights.bias(kind)
    }

    fn build_layout(
        &self,
        kind: RoomKind,
        difficulty: f32,
        rng: &mut RandomNumberGenerator,
    ) -> RoomLayout {
        let side = ((10.0 + difficulty * 2.0).floor() as i32).max(self.config.min_room_side);
        let floor_chance = if kind == RoomKind::Boss {
            BOSS_FLOOR_CHANCE
        } else {
            ROOM_FLOOR_CHANCE
        };
        RoomLayout::cellular(side, floor_chance, self.config.smoothing_passes, rng)
    }

    fn enemy_count(&self, kind: RoomKind, difficulty: f32) -> usize {
        match kind {
            RoomKind::Safe | RoomKind::Treasure => 0,
            RoomKind::Boss => 1,
            _ => ((2.0 + difficulty) * self.weights.enemy_density).floor().max(0.0) as usize,
        }
    }

    fn place_enemies(
        &self,
        kind: RoomKind,
        params: &DungeonGenerationParams,
        theme: Theme,
        difficulty: f32,
        open_tiles: &mut Vec<Point>,
        rng: &mut RandomNumberGenerator,
    ) -> Vec<PlacedEnemy> {
        let count = self.enemy_count(kind, difficulty);
        let roster = theme.enemies();
        let pool = params.play_style.behavior_pool();
        let mut enemies = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(position) = take_tile(open_tiles, rng) else {
                break;
            };
            let (template, is_boss) = if kind == RoomKind::Boss {
                (MonsterTemplate::boss_for(theme), true)
            } else {
                (self.pick_enemy(params, &roster, rng), false)
            };
            let behavior = pool[rng.range(0, pool.len() as i32) as usize];
            enemies.push(PlacedEnemy {
                name: template.name.to_string(),
                glyph: template.glyph,
                position,
                behavior,
                stats: template.scaled(params.player_level),
                ability: template.ability,
                is_boss,
            });
        }
        enemies
    }

    /// Preferred foes first (when they exist anywhere in the bestiary), then
    /// the theme roster minus anything the player avoids.
    fn pick_enemy(
        &self,
        params: &DungeonGenerationParams,
        roster: &[MonsterTemplate],
        rng: &mut RandomNumberGenerator,
    ) -> MonsterTemplate {
        let preferred = &params.performance.preferred_enemy_types;
        if !preferred.is_empty() && rng.rand::<f64>() < self.config.preferred_enemy_chance {
            let name = &preferred[rng.range(0, preferred.len() as i32) as usize];
            if let Some(template) = find_template(name, roster) {
                return template;
            }
        }

        let allowed: Vec<&MonsterTemplate> = roster
            .iter()
            .filter(|template| !params.avoids(template.name))
            .collect();
        if allowed.is_empty() {
            roster[rng.range(0, roster.len() as i32) as usize].clone()
        } else {
            allowed[rng.range(0, allowed.len() as i32) as usize].clone()
        }
    }
}

fn find_template(name: &str, roster: &[MonsterTemplate]) -> Option<MonsterTemplate> {
    roster
        .iter()
        .find(|template| template.name == name)
        .cloned()
        .or_else(|| {
            SPECTRUM
                .iter()
                .flat_map(|theme| theme.enemies())
                .find(|template| template.name == name)
        })
}

fn take_tile(open_tiles: &mut Vec<Point>, rng: &mut RandomNumberGenerator) -> Option<Point> {
    if open_tiles.is_empty() {
        return None;
    }
    let idx = rng.range(0, open_tiles.len() as i32) as usize;
    Some(open_tiles.swap_remove(idx))
}

fn item_count(kind: RoomKind) -> usize {
    match kind {
        RoomKind::Treasure => 5,
        RoomKind::Boss => 3,
        _ => 1,
    }
}

fn place_items(
    kind: RoomKind,
    theme: Theme,
    open_tiles: &mut Vec<Point>,
    rng: &mut RandomNumberGenerator,
) -> Vec<PlacedItem> {
    let table = loot_table(theme);
    let mut items = Vec::new();
    for _ in 0..item_count(kind) {
        let Some(position) = take_tile(open_tiles, rng) else {
            break;
        };
        let template = &table[rng.range(0, table.len() as i32) as usize];
        items.push(PlacedItem {
            name: template.name.to_string(),
            description: template.description.to_string(),
            kind: template.kind,
            rarity: Rarity::roll(rng, theme.loot_tier()),
            position,
        });
    }
    items
}

fn place_hazards(
    theme: Theme,
    difficulty: f32,
    open_tiles: &mut Vec<Point>,
    rng: &mut RandomNumberGenerator,
) -> Vec<PlacedHazard> {
    let kinds = theme.hazards();
    let count = (difficulty / 2.0).floor() as usize;
    let mut hazards = Vec::new();
    for _ in 0..count {
        let Some(position) = take_tile(open_tiles, rng) else {
            break;
        };
        hazards.push(PlacedHazard {
            kind: kinds[rng.range(0, kinds.len() as i32) as usize],
            position,
        });
    }
    hazards
}

pub fn room_difficulty(enemies: usize, hazards: usize, complexity: f32) -> f32 {
    enemies as f32 * 2.0 + hazards as f32 * 1.5 + complexity
}

/// Heuristic quality of a room for this player, 0–100.
pub fn ai_score(
    enemies: &[PlacedEnemy],
    items: usize,
    complexity: f32,
    params: &DungeonGenerationParams,
) -> f32 {
    let mut score = 0.0;
    if items > 0 {
        let ratio = enemies.len() as f32 / items as f32;
        if (0.5..=3.0).contains(&ratio) {
            score += 10.0;
        }
    }
    let distinct: HashSet<&str> = enemies.iter().map(|e| e.name.as_str()).collect();
    score += distinct.len() as f32 * 5.0;
    score += complexity;
    score += enemies.iter().filter(|e| params.prefers(&e.name)).count() as f32 * 3.0;
    score.clamp(0.0, MAX_AI_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        generation::{PerformanceSummary, PlayStyle},
        map::Tile,
    };

    fn params(difficulty: f32) -> DungeonGenerationParams {
        DungeonGenerationParams {
            desired_difficulty: difficulty,
            ..DungeonGenerationParams::default()
        }
    }

    fn enemy(name: &str) -> PlacedEnemy {
        PlacedEnemy {
            name: name.to_string(),
            glyph: 'x',
            position: Point::new(1, 1),
            behavior: EnemyBehavior::Hunter,
            stats: EnemyStats {
                max_hp: 1,
                power: 1,
                defense: 0,
            },
            ability: None,
            is_boss: false,
        }
    }

    #[test]
    fn last_room_is_always_the_boss() {
        let config = GenerationConfig::default();
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut rng = RandomNumberGenerator::seeded(1);
        for total in 1..6 {
            let kind = generator.predict_kind(&params(4.0), total - 1, total, &mut rng);
            assert_eq!(kind, RoomKind::Boss);
        }
    }

    #[test]
    fn frequent_deaths_can_force_safe_rooms() {
        let config = GenerationConfig {
            safe_room_chance: 1.0,
            ..GenerationConfig::default()
        };
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut struggling = params(6.0);
        struggling.performance.death_count = 9;
        let mut rng = RandomNumberGenerator::seeded(3);
        assert_eq!(
            generator.predict_kind(&struggling, 0, 5, &mut rng),
            RoomKind::Safe
        );
    }

    #[test]
    fn aggressive_players_see_combat_at_high_difficulty() {
        let config = GenerationConfig::default();
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut rng = RandomNumberGenerator::seeded(3);
        let request = DungeonGenerationParams {
            desired_difficulty: 8.0,
            play_style: PlayStyle::Aggressive,
            ..DungeonGenerationParams::default()
        };
        assert_eq!(generator.predict_kind(&request, 1, 10, &mut rng), RoomKind::Combat);
    }

    #[test]
    fn reinforcement_raises_negative_scores_too() {
        let config = GenerationConfig::default();
        let request = DungeonGenerationParams {
            desired_difficulty: 10.0,
            play_style: PlayStyle::Aggressive,
            ..DungeonGenerationParams::default()
        };
        let features = RoomGenerator::features(&request, 0, 5);
        let fresh = GenerationWeights::default();
        let before = RoomGenerator::new(&config, &fresh).kind_score(RoomKind::Safe, &features);
        assert!(before < 0.0);

        let mut liked = GenerationWeights::default();
        liked.reinforce(RoomKind::Safe);
        let after = RoomGenerator::new(&config, &liked).kind_score(RoomKind::Safe, &features);
        assert!(after > before);
        assert!((after - (before + 0.01)).abs() < 1e-6);
    }

    #[test]
    fn enough_reinforcement_can_flip_the_prediction() {
        let config = GenerationConfig::default();
        let request = DungeonGenerationParams {
            desired_difficulty: 8.0,
            play_style: PlayStyle::Aggressive,
            ..DungeonGenerationParams::default()
        };
        let mut weights = GenerationWeights::default();
        let mut rng = RandomNumberGenerator::seeded(3);
        let kind = RoomGenerator::new(&config, &weights).predict_kind(&request, 1, 10, &mut rng);
        assert_eq!(kind, RoomKind::Combat);
        for _ in 0..200 {
            weights.reinforce(RoomKind::Safe);
        }
        let kind = RoomGenerator::new(&config, &weights).predict_kind(&request, 1, 10, &mut rng);
        assert_eq!(kind, RoomKind::Safe);
    }

    #[test]
    fn placed_items_carry_their_loot_description() {
        let config = GenerationConfig::default();
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut rng = RandomNumberGenerator::seeded(17);
        let table = loot_table(Theme::Orange);
        let room = generator.generate_room(RoomId(0), &params(4.0), Theme::Orange, 3, 4, &mut rng);
        assert!(!room.items.is_empty());
        for item in &room.items {
            let template = table.iter().find(|t| t.name == item.name).unwrap();
            assert_eq!(item.description, template.description);
            assert!(!item.description.is_empty());
        }
    }

    #[test]
    fn features_encode_play_style() {
        let request = DungeonGenerationParams {
            desired_difficulty: 5.0,
            play_style: PlayStyle::Explorer,
            performance: PerformanceSummary {
                death_count: 2,
                ..PerformanceSummary::default()
            },
            ..DungeonGenerationParams::default()
        };
        let features = RoomGenerator::features(&request, 2, 8);
        assert_eq!(features, [0.5, 0.25, 0.2, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn placements_respect_the_layout() {
        let config = GenerationConfig::default();
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut rng = RandomNumberGenerator::seeded(99);
        for index in 0..12 {
            let room = generator.generate_room(
                RoomId(index as u64),
                &params(6.0),
                Theme::Green,
                index,
                12,
                &mut rng,
            );
            let mut seen = HashSet::new();
            for point in room.occupied() {
                assert_eq!(room.layout.tile_at(point), Some(Tile::Floor));
                assert!(seen.insert(point), "two entities share {point:?}");
            }
            assert_eq!(room.layout.count(Tile::Door), 2);
            assert!((0.0..=100.0).contains(&room.ai_score));
        }
    }

    #[test]
    fn room_sizes_follow_difficulty() {
        let config = GenerationConfig::default();
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut rng = RandomNumberGenerator::seeded(5);
        let room = generator.generate_room(RoomId(0), &params(3.5), Theme::Red, 0, 4, &mut rng);
        assert_eq!(room.layout.width, 17);
        assert_eq!(room.layout.height, 17);
    }

    #[test]
    fn boss_room_holds_one_boss_and_three_items() {
        let config = GenerationConfig::default();
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut rng = RandomNumberGenerator::seeded(11);
        let room = generator.generate_room(RoomId(0), &params(5.0), Theme::Blue, 2, 3, &mut rng);
        assert_eq!(room.kind, RoomKind::Boss);
        assert_eq!(room.enemies.len(), 1);
        assert!(room.enemies[0].is_boss);
        assert_eq!(room.enemies[0].name, "Drowned Regent");
        assert_eq!(room.items.len(), 3);
        assert_eq!(room.layout.count(Tile::Special), 1);
    }

    #[test]
    fn avoided_enemies_are_skipped_when_possible() {
        let config = GenerationConfig::default();
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut rng = RandomNumberGenerator::seeded(21);
        let mut request = params(5.0);
        request.performance.avoided_enemy_types =
            vec!["Ember Imp".to_string(), "Cinder Wolf".to_string()];
        let roster = Theme::Red.enemies();
        for _ in 0..50 {
            let picked = generator.pick_enemy(&request, &roster, &mut rng);
            assert_eq!(picked.name, "Ash Crawler");
        }
    }

    #[test]
    fn preferred_enemies_may_come_from_other_themes() {
        let config = GenerationConfig {
            preferred_enemy_chance: 1.0,
            ..GenerationConfig::default()
        };
        let weights = GenerationWeights::default();
        let generator = RoomGenerator::new(&config, &weights);
        let mut rng = RandomNumberGenerator::seeded(8);
        let mut request = params(5.0);
        request.performance.preferred_enemy_types = vec!["Mindworm".to_string()];
        let picked = generator.pick_enemy(&request, &Theme::Red.enemies(), &mut rng);
        assert_eq!(picked.name, "Mindworm");
    }

    #[test]
    fn difficulty_formula() {
        assert!((room_difficulty(3, 2, 1.5) - 10.5).abs() < 1e-6);
    }

    #[test]
    fn ai_score_rewards_variety_and_preference() {
        let mut request = params(5.0);
        request.performance.preferred_enemy_types = vec!["Hex Bat".to_string()];
        let enemies = vec![enemy("Hex Bat"), enemy("Hex Bat"), enemy("Grave Choir")];
        // ratio 3 (+10), two kinds (+10), complexity 4, two preferred (+6)
        assert!((ai_score(&enemies, 1, 4.0, &request) - 30.0).abs() < 1e-6);
        // ratio 6 is out of band
        assert!((ai_score(&enemies, 0, 4.0, &request) - 20.0).abs() < 1e-6);
        assert_eq!(ai_score(&enemies, 1, 500.0, &request), 100.0);
    }
}
