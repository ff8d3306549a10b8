use bracket_random::prelude::RandomNumberGenerator;
use serde::{Deserialize, Serialize};

use crate::data::Theme;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsumableEffect {
    Heal { amount: i32 },
    Cleanse,
    Blink { range: i32 },
    Nova { damage: i32, radius: i32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Consumable { effect: ConsumableEffect },
    Weapon { power: i32 },
    Armor { defense: i32 },
    Relic,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    /// Cumulative thresholds; a higher loot tier widens every band above rare.
    pub fn from_roll(roll: f64, tier: u32) -> Self {
        let bonus = tier as f64 * 0.1;
        if roll < 0.05 + bonus {
            Rarity::Mythic
        } else if roll < 0.15 + bonus {
            Rarity::Legendary
        } else if roll < 0.35 + bonus {
            Rarity::Epic
        } else if roll < 0.65 {
            Rarity::Rare
        } else {
            Rarity::Common
        }
    }

    pub fn roll(rng: &mut RandomNumberGenerator, tier: u32) -> Self {
        Self::from_roll(rng.rand::<f64>(), tier)
    }
}

#[derive(Clone, Debug)]
pub struct ItemTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ItemKind,
}

impl ItemTemplate {
    pub const fn new(name: &'static str, description: &'static str, kind: ItemKind) -> Self {
        Self {
            name,
            description,
            kind,
        }
    }
}

/// Everything a room in `theme` may drop.
pub fn loot_table(theme: Theme) -> Vec<ItemTemplate> {
    let mut table = match theme {
        Theme::Red => vec![
            ItemTemplate::new(
                "Thermal Draft",
                "Restores 8 HP with a warming rush.",
                ItemKind::Consumable {
                    effect: ConsumableEffect::Heal { amount: 8 },
                },
            ),
            ItemTemplate::new(
                "Ember Nova",
                "Detonates a 3-tile blast for 6 damage.",
                ItemKind::Consumable {
                    effect: ConsumableEffect::Nova {
                        damage: 6,
                        radius: 3,
                    },
                },
            ),
        ],
        Theme::Blue => vec![ItemTemplate::new(
            "Stillwater Draught",
            "Heals 10 HP and purges slowing chills.",
            ItemKind::Consumable {
                effect: ConsumableEffect::Heal { amount: 10 },
            },
        )],
        Theme::Indigo => vec![ItemTemplate::new(
            "Phase Shard",
            "Blinks up to 5 tiles away.",
            ItemKind::Consumable {
                effect: ConsumableEffect::Blink { range: 5 },
            },
        )],
        _ => vec![ItemTemplate::new(
            "Prismatic Tonic",
            "Heals 6 HP and cleanses curse residue.",
            ItemKind::Consumable {
                effect: ConsumableEffect::Cleanse,
            },
        )],
    };
    let tier = theme.loot_tier() as i32;
    table.extend([
        ItemTemplate::new(
            "Spectrum Blade",
            "A blade tuned to the local hue.",
            ItemKind::Weapon { power: 2 + tier },
        ),
        ItemTemplate::new(
            "Refracting Mail",
            "Scatters the worst of a blow.",
            ItemKind::Armor { defense: 1 + tier },
        ),
        ItemTemplate::new(
            "Chromatic Relic",
            "Hums when a boss is near.",
            ItemKind::Relic,
        ),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_tier_bands() {
        assert_eq!(Rarity::from_roll(0.01, 0), Rarity::Mythic);
        assert_eq!(Rarity::from_roll(0.10, 0), Rarity::Legendary);
        assert_eq!(Rarity::from_roll(0.30, 0), Rarity::Epic);
        assert_eq!(Rarity::from_roll(0.50, 0), Rarity::Rare);
        assert_eq!(Rarity::from_roll(0.90, 0), Rarity::Common);
    }

    #[test]
    fn higher_tier_shifts_bands_up() {
        assert_eq!(Rarity::from_roll(0.10, 1), Rarity::Mythic);
        assert_eq!(Rarity::from_roll(0.40, 1), Rarity::Epic);
        assert_eq!(Rarity::from_roll(0.60, 2), Rarity::Rare);
    }

    #[test]
    fn every_table_carries_gear() {
        for theme in crate::data::SPECTRUM {
            let table = loot_table(theme);
            assert!(table.iter().any(|t| matches!(t.kind, ItemKind::Weapon { .. })));
            assert!(table.iter().any(|t| matches!(t.kind, ItemKind::Relic)));
        }
    }
}
