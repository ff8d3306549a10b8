use serde::{Deserialize, Serialize};

use crate::data::Theme;

/// Signature move carried by a monster template.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpecialAbility {
    Burn { damage_per_turn: i32 },
    Corrode { armor_loss: i32 },
    Blind { turns: u32 },
    Regenerate { per_turn: i32 },
    Freeze { turns: u32 },
    Teleport { range: i32 },
    Curse { stat_loss: i32 },
}

/// How a placed enemy engages.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyBehavior {
    Charger,
    Flanker,
    Sniper,
    Guardian,
    Ambusher,
    Swarmer,
    Patroller,
    Hunter,
}

#[derive(Clone, Debug)]
pub struct MonsterTemplate {
    pub name: &'static str,
    pub glyph: char,
    pub hp: i32,
    pub power: i32,
    pub defense: i32,
    pub ability: Option<SpecialAbility>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyStats {
    pub max_hp: i32,
    pub power: i32,
    pub defense: i32,
}

impl MonsterTemplate {
    pub fn for_theme(theme: Theme) -> Vec<Self> {
        match theme {
            Theme::Red => vec![
                Self::new(
                    "Ember Imp",
                    'i',
                    6,
                    3,
                    0,
                    Some(SpecialAbility::Burn { damage_per_turn: 1 }),
                ),
                Self::new("Cinder Wolf", 'w', 10, 4, 1, None),
                Self::new("Ash Crawler", 'c', 8, 3, 1, None),
            ],
            Theme::Orange => vec![
                Self::new(
                    "Acid Puff",
                    'a',
                    8,
                    3,
                    0,
                    Some(SpecialAbility::Corrode { armor_loss: 1 }),
                ),
                Self::new("Flask Golem", 'g', 14, 5, 2, None),
                Self::new("Fume Wisp", 'f', 6, 4, 0, None),
            ],
            Theme::Yellow => vec![
                Self::new("Prism Ghost", 'p', 7, 2, 1, Some(SpecialAbility::Blind { turns: 2 })),
                Self::new("Sun Mite", 'm', 5, 2, 0, None),
                Self::new("Lens Warden", 'l', 12, 4, 2, None),
            ],
            Theme::Green => vec![
                Self::new("Thorn Hopper", 'h', 9, 3, 1, None),
                Self::new(
                    "Bloom Sentinel",
                    'b',
                    16,
                    4,
                    3,
                    Some(SpecialAbility::Regenerate { per_turn: 1 }),
                ),
                Self::new("Vine Lurker", 'v', 11, 5, 1, None),
            ],
            Theme::Blue => vec![
                Self::new("Glacier Crab", 'c', 12, 3, 2, Some(SpecialAbility::Freeze { turns: 1 })),
                Self::new("Stillwater Shade", 's', 8, 4, 1, None),
                Self::new("Tide Caller", 't', 10, 5, 1, None),
            ],
            Theme::Indigo => vec![
                Self::new("Mindworm", 'n', 6, 4, 0, None),
                Self::new(
                    "Phase Stalker",
                    'q',
                    10,
                    5,
                    1,
                    Some(SpecialAbility::Teleport { range: 4 }),
                ),
                Self::new("Thought Eater", 'e', 13, 6, 2, None),
            ],
            Theme::Violet => vec![
                Self::new("Hex Bat", 'x', 7, 3, 0, None),
                Self::new(
                    "Veil Revenant",
                    'v',
                    13,
                    5,
                    2,
                    Some(SpecialAbility::Curse { stat_loss: 1 }),
                ),
                Self::new("Grave Choir", 'g', 15, 6, 2, None),
            ],
        }
    }

    /// The guardian that holds a theme's final room.
    pub fn boss_for(theme: Theme) -> Self {
        match theme {
            Theme::Red => Self::new(
                "Forge Tyrant",
                'T',
                60,
                8,
                3,
                Some(SpecialAbility::Burn { damage_per_turn: 3 }),
            ),
            Theme::Orange => Self::new(
                "Grand Alembic",
                'A',
                70,
                8,
                4,
                Some(SpecialAbility::Corrode { armor_loss: 2 }),
            ),
            Theme::Yellow => Self::new(
                "Refraction Queen",
                'Q',
                75,
                9,
                4,
                Some(SpecialAbility::Blind { turns: 3 }),
            ),
            Theme::Green => Self::new(
                "Elder Rootmother",
                'R',
                90,
                9,
                5,
                Some(SpecialAbility::Regenerate { per_turn: 3 }),
            ),
            Theme::Blue => Self::new(
                "Drowned Regent",
                'D',
                95,
                10,
                5,
                Some(SpecialAbility::Freeze { turns: 2 }),
            ),
            Theme::Indigo => Self::new(
                "Dreaming Eye",
                'E',
                100,
                11,
                5,
                Some(SpecialAbility::Teleport { range: 8 }),
            ),
            Theme::Violet => Self::new(
                "Veil Sovereign",
                'S',
                120,
                12,
                6,
                Some(SpecialAbility::Curse { stat_loss: 2 }),
            ),
        }
    }

    fn new(
        name: &'static str,
        glyph: char,
        hp: i32,
        power: i32,
        defense: i32,
        ability: Option<SpecialAbility>,
    ) -> Self {
        Self {
            name,
            glyph,
            hp,
            power,
            defense,
            ability,
        }
    }

    /// Stats for a spawn facing a player of `level`: +10% hp per level past
    /// the first, +1 power every third level.
    pub fn scaled(&self, level: u32) -> EnemyStats {
        let steps = level.saturating_sub(1) as i32;
        EnemyStats {
            max_hp: self.hp + self.hp * steps / 10,
            power: self.power + steps / 3,
            defense: self.defense,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_keeps_base_stats() {
        let wolf = &MonsterTemplate::for_theme(Theme::Red)[1];
        assert_eq!(
            wolf.scaled(1),
            EnemyStats {
                max_hp: 10,
                power: 4,
                defense: 1
            }
        );
    }

    #[test]
    fn higher_levels_toughen_spawns() {
        let boss = MonsterTemplate::boss_for(Theme::Blue);
        let stats = boss.scaled(11);
        assert_eq!(stats.max_hp, 190);
        assert_eq!(stats.power, 13);
    }
}
