//! Characters and stages offered on the select screens.
//!
//! Fixed tables: the phase machine selects by index, and an index past
//! the end is simply ignored.

use serde::{Deserialize, Serialize};

/// Stat multipliers carried by a character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterMultipliers {
    pub health: f32,
    pub move_speed: f32,
    pub damage: f32,
    pub fire_rate: f32,
    pub knockback: f32,
}

impl Default for CharacterMultipliers {
    fn default() -> Self {
        Self {
            health: 1.0,
            move_speed: 1.0,
            damage: 1.0,
            fire_rate: 1.0,
            knockback: 1.0,
        }
    }
}

/// Always-on bonus tied to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PassiveTrait {
    #[default]
    None,
    /// +40% knockback, +10% damage, -10% move speed
    HeavyHitter,
    /// +30% damage, -30% max health
    GlassCannon,
    /// +15% move speed, +10% fire rate
    Momentum,
    /// +25% max health, -10% damage
    Survivor,
}

impl PassiveTrait {
    /// The trait expressed as multipliers.
    pub fn multipliers(self) -> CharacterMultipliers {
        let base = CharacterMultipliers::default();
        match self {
            PassiveTrait::None => base,
            PassiveTrait::HeavyHitter => CharacterMultipliers {
                knockback: 1.4,
                damage: 1.1,
                move_speed: 0.9,
                ..base
            },
            PassiveTrait::GlassCannon => CharacterMultipliers {
                damage: 1.3,
                health: 0.7,
                ..base
            },
            PassiveTrait::Momentum => CharacterMultipliers {
                move_speed: 1.15,
                fire_rate: 1.1,
                ..base
            },
            PassiveTrait::Survivor => CharacterMultipliers {
                health: 1.25,
                damage: 0.9,
                ..base
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Character {
    pub name: &'static str,
    pub multipliers: CharacterMultipliers,
    pub passive: PassiveTrait,
}

pub const CHARACTERS: [Character; 4] = [
    Character {
        name: "Vanguard",
        multipliers: CharacterMultipliers {
            health: 1.2,
            move_speed: 0.9,
            damage: 1.0,
            fire_rate: 1.0,
            knockback: 1.2,
        },
        passive: PassiveTrait::HeavyHitter,
    },
    Character {
        name: "Striker",
        multipliers: CharacterMultipliers {
            health: 1.0,
            move_speed: 1.0,
            damage: 1.2,
            fire_rate: 1.0,
            knockback: 1.0,
        },
        passive: PassiveTrait::GlassCannon,
    },
    Character {
        name: "Drifter",
        multipliers: CharacterMultipliers {
            health: 0.85,
            move_speed: 1.2,
            damage: 1.0,
            fire_rate: 1.1,
            knockback: 0.9,
        },
        passive: PassiveTrait::Momentum,
    },
    Character {
        name: "Warden",
        multipliers: CharacterMultipliers {
            health: 1.1,
            move_speed: 1.0,
            damage: 0.95,
            fire_rate: 1.0,
            knockback: 1.0,
        },
        passive: PassiveTrait::Survivor,
    },
];

pub fn character(index: usize) -> Option<&'static Character> {
    CHARACTERS.get(index)
}

/// A playable stage. World generation turns this into an `Arena`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub name: &'static str,
    /// Scales the arena extents from tuning
    pub arena_scale: f32,
    /// Scales gravity strength; 0 disables the field
    pub field_strength: f32,
    pub field_radius: f32,
    pub horizon_radius: f32,
    /// Scales spawn counts
    pub spawn_rate: f32,
}

impl Stage {
    pub fn has_field(&self) -> bool {
        self.field_strength > 0.0
    }
}

pub const STAGES: [Stage; 3] = [
    Stage {
        name: "Outer Rim",
        arena_scale: 1.0,
        field_strength: 0.0,
        field_radius: 0.0,
        horizon_radius: 0.0,
        spawn_rate: 1.0,
    },
    Stage {
        name: "Accretion Disk",
        arena_scale: 1.2,
        field_strength: 1.0,
        field_radius: 650.0,
        horizon_radius: 70.0,
        spawn_rate: 1.15,
    },
    Stage {
        name: "Singularity",
        arena_scale: 1.4,
        field_strength: 1.8,
        field_radius: 900.0,
        horizon_radius: 110.0,
        spawn_rate: 1.35,
    },
];

pub fn stage(index: usize) -> Option<&'static Stage> {
    STAGES.get(index)
}
