pub mod items;
pub mod monsters;

use serde::{Deserialize, Serialize};

use self::monsters::MonsterTemplate;

/// Dungeon biomes, ordered from gentlest to deadliest.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Indigo,
    Violet,
}

pub const SPECTRUM: [Theme; 7] = [
    Theme::Red,
    Theme::Orange,
    Theme::Yellow,
    Theme::Green,
    Theme::Blue,
    Theme::Indigo,
    Theme::Violet,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    LavaVent,
    EmberPit,
    ChemicalCloud,
    AcidPool,
    PrismTrap,
    GlareLens,
    ThornBramble,
    SporeBloom,
    SlickIce,
    UndertowPool,
    Mindstorm,
    PhaseRift,
    CurseGlyph,
    SpikeTrap,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Red => "Ember Halls",
            Theme::Orange => "Alchemic Vaults",
            Theme::Yellow => "Prism Gallery",
            Theme::Green => "Verdant Warren",
            Theme::Blue => "Stillwater Depths",
            Theme::Indigo => "Mind Spire",
            Theme::Violet => "Hex Crypt",
        }
    }

    pub fn spectrum_index(&self) -> usize {
        match self {
            Theme::Red => 0,
            Theme::Orange => 1,
            Theme::Yellow => 2,
            Theme::Green => 3,
            Theme::Blue => 4,
            Theme::Indigo => 5,
            Theme::Violet => 6,
        }
    }

    /// Player level the theme is tuned for.
    pub fn difficulty(&self) -> u32 {
        1 + 3 * self.spectrum_index() as u32
    }

    pub fn loot_tier(&self) -> u32 {
        self.spectrum_index() as u32 / 3
    }

    pub fn notes(&self) -> &'static str {
        match self {
            Theme::Red => "Heat blooms amplify melee damage.",
            Theme::Orange => "Chemical clouds respond to wind tunnels.",
            Theme::Yellow => "Lens-prisms extend sight and hide traps.",
            Theme::Green => "Regrowth tiles slowly mend their keepers.",
            Theme::Blue => "Stillwater grants crit bonuses to ranged.",
            Theme::Indigo => "Mindstorms scramble footing and memory.",
            Theme::Violet => "Curses thread through unseen resonance.",
        }
    }

    pub fn hazards(&self) -> &'static [HazardKind] {
        match self {
            Theme::Red => &[HazardKind::LavaVent, HazardKind::EmberPit],
            Theme::Orange => &[HazardKind::ChemicalCloud, HazardKind::AcidPool],
            Theme::Yellow => &[HazardKind::PrismTrap, HazardKind::GlareLens],
            Theme::Green => &[HazardKind::ThornBramble, HazardKind::SporeBloom],
            Theme::Blue => &[HazardKind::SlickIce, HazardKind::UndertowPool],
            Theme::Indigo => &[HazardKind::Mindstorm, HazardKind::PhaseRift],
            Theme::Violet => &[HazardKind::CurseGlyph, HazardKind::SpikeTrap],
        }
    }

    pub fn enemies(&self) -> Vec<MonsterTemplate> {
        MonsterTemplate::for_theme(*self)
    }

    /// First theme whose tuning is within 3 levels of the player, else the
    /// gentlest one.
    pub fn for_level(level: u32) -> Self {
        SPECTRUM
            .iter()
            .copied()
            .find(|theme| theme.difficulty().abs_diff(level) <= 3)
            .unwrap_or(SPECTRUM[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_picks_first_theme_in_range() {
        assert_eq!(Theme::for_level(1), Theme::Red);
        assert_eq!(Theme::for_level(4), Theme::Red);
        assert_eq!(Theme::for_level(5), Theme::Orange);
        assert_eq!(Theme::for_level(19), Theme::Indigo);
        assert_eq!(Theme::for_level(22), Theme::Violet);
        assert_eq!(Theme::for_level(90), Theme::Red);
    }

    #[test]
    fn every_theme_has_enemies_and_hazards() {
        for theme in SPECTRUM {
            assert!(!theme.enemies().is_empty(), "{}", theme.as_str());
            assert!(!theme.hazards().is_empty(), "{}", theme.as_str());
        }
    }

    #[test]
    fn loot_tier_rises_along_the_spectrum() {
        assert_eq!(Theme::Red.loot_tier(), 0);
        assert_eq!(Theme::Green.loot_tier(), 1);
        assert_eq!(Theme::Violet.loot_tier(), 2);
    }
}
