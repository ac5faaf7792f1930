//! Simulation Records
//!
//! Plain data for everything that lives in the arena. Behaviour lives in
//! the systems (resolver, field, skills); these structs only hold state.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::entity::Entity;
use super::skills::SkillId;
use crate::catalog::CharacterMultipliers;

// =============================================================================
// Player
// =============================================================================

#[derive(Debug, Clone)]
pub struct Player {
    pub position: Vec2,
    /// Steering input, length <= 1
    pub input: Vec2,
    /// Knockback and pulls; decays geometrically
    pub external_velocity: Vec2,
    /// Velocity actually applied last tick (input + external)
    pub velocity: Vec2,
    pub health: f32,
    pub max_health: f32,
    /// Collision diameter
    pub size: f32,
    pub multipliers: CharacterMultipliers,
    /// Set by skills that make the player ignore contact damage
    pub invulnerable: bool,
    /// Facing angle in radians (presentation)
    pub facing: f32,
    /// Time accumulated inside an event horizon
    pub horizon_timer: f32,
}

impl Player {
    pub fn new(position: Vec2, max_health: f32, size: f32, multipliers: CharacterMultipliers) -> Self {
        Self {
            position,
            input: Vec2::ZERO,
            external_velocity: Vec2::ZERO,
            velocity: Vec2::ZERO,
            health: max_health,
            max_health,
            size,
            multipliers,
            invulnerable: false,
            facing: 0.0,
            horizon_timer: 0.0,
        }
    }

    pub fn radius(&self) -> f32 {
        self.size * 0.5
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    /// Change max health, keeping the current fraction.
    pub fn set_max_health(&mut self, max_health: f32) {
        let fraction = if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            1.0
        };
        self.max_health = max_health;
        self.health = max_health * fraction;
    }
}

// =============================================================================
// Enemies
// =============================================================================

/// Enemy size class, ordered small < medium < large < boss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Small,
    Medium,
    Large,
    Boss,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Small, Tier::Medium, Tier::Large, Tier::Boss];

    pub fn index(self) -> usize {
        match self {
            Tier::Small => 0,
            Tier::Medium => 1,
            Tier::Large => 2,
            Tier::Boss => 3,
        }
    }

    pub fn from_index(i: usize) -> Option<Tier> {
        Tier::ALL.get(i).copied()
    }

    /// Only small and medium enemies fuse together.
    pub fn can_merge_with(self, other: Tier) -> bool {
        self == other && matches!(self, Tier::Small | Tier::Medium)
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Small => "small",
            Tier::Medium => "medium",
            Tier::Large => "large",
            Tier::Boss => "boss",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub position: Vec2,
    pub velocity: Vec2,
    pub health: f32,
    pub max_health: f32,
    /// Always > 0; read through `physics::guard_mass` anyway
    pub mass: f32,
    /// Collision diameter
    pub size: f32,
    pub tier: Tier,
    pub speed: f32,
    /// Game time of the last hit per multi-hit skill
    pub cooldowns: HashMap<SkillId, f32>,
    /// Death reward already handed out
    pub dead: bool,
    /// Consumed by a merge this tick; no reward
    pub merged: bool,
}

impl Enemy {
    pub fn new(position: Vec2, tier: Tier, health: f32, mass: f32, size: f32, speed: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            health,
            max_health: health,
            mass,
            size,
            tier,
            speed,
            cooldowns: HashMap::new(),
            dead: false,
            merged: false,
        }
    }

    pub fn radius(&self) -> f32 {
        self.size * 0.5
    }

    /// Still taking part in this tick (not dead, not merged away).
    pub fn is_active(&self) -> bool {
        !self.dead && !self.merged && self.health > 0.0
    }

    /// Whether `skill` may hit this enemy again at `now`; records the hit if so.
    pub fn try_cooldown(&mut self, skill: SkillId, now: f32, cooldown: f32) -> bool {
        match self.cooldowns.get(&skill) {
            Some(last) if now - *last < cooldown => false,
            _ => {
                self.cooldowns.insert(skill, now);
                true
            }
        }
    }
}

// =============================================================================
// Projectiles
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectileKind {
    /// Free-flying shot from the weapon or a skill
    Bolt,
    /// Held on an orbit around the player by the orbit skill
    Orbital { slot: u32 },
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub position: Vec2,
    pub velocity: Vec2,
    pub mass: f32,
    /// Damage of the first hit; later pierce hops decay from this
    pub damage: f32,
    pub bounces: u32,
    pub pierce: u32,
    /// Collision diameter
    pub scale: f32,
    pub age: f32,
    pub lifetime: f32,
    /// Enemies already pierced
    pub hops: u32,
    /// Last enemy struck, so one overlap only counts once
    pub last_hit: Option<Entity>,
    pub kind: ProjectileKind,
    /// Marked for removal at cleanup
    pub spent: bool,
}

impl Projectile {
    pub fn bolt(position: Vec2, velocity: Vec2, damage: f32, mass: f32, scale: f32, lifetime: f32) -> Self {
        Self {
            position,
            velocity,
            mass,
            damage,
            bounces: 0,
            pierce: 1,
            scale,
            age: 0.0,
            lifetime,
            hops: 0,
            last_hit: None,
            kind: ProjectileKind::Bolt,
            spent: false,
        }
    }

    pub fn with_budget(mut self, pierce: u32, bounces: u32) -> Self {
        self.pierce = pierce.max(1);
        self.bounces = bounces;
        self
    }

    pub fn radius(&self) -> f32 {
        self.scale * 0.5
    }

    /// Damage for the next hit after `hops` pierces with linear decay.
    pub fn current_damage(&self, pierce_decay: f32) -> f32 {
        self.damage * (1.0 - pierce_decay * self.hops as f32).max(0.0)
    }

    pub fn is_orbital(&self) -> bool {
        matches!(self.kind, ProjectileKind::Orbital { .. })
    }
}

// =============================================================================
// Pickups and hazards
// =============================================================================

/// Experience orb dropped on a kill
#[derive(Debug, Clone)]
pub struct Orb {
    pub position: Vec2,
    pub value: u32,
    /// Homing toward the player once set; never unset
    pub magnet: bool,
}

impl Orb {
    pub fn new(position: Vec2, value: u32) -> Self {
        Self {
            position,
            value,
            magnet: false,
        }
    }
}

/// Floating area hazard that bursts when its timer runs out
#[derive(Debug, Clone)]
pub struct Hazard {
    pub position: Vec2,
    pub velocity: Vec2,
    pub age: f32,
    pub duration: f32,
    pub radius: f32,
    pub damage: f32,
    pub detonated: bool,
}

impl Hazard {
    pub fn new(position: Vec2, velocity: Vec2, duration: f32, radius: f32, damage: f32) -> Self {
        Self {
            position,
            velocity,
            age: 0.0,
            duration,
            radius,
            damage,
            detonated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Small < Tier::Medium);
        assert!(Tier::Large < Tier::Boss);
        assert_eq!(Tier::from_index(2), Some(Tier::Large));
        assert_eq!(Tier::from_index(9), None);
    }

    #[test]
    fn test_merge_compatibility() {
        assert!(Tier::Small.can_merge_with(Tier::Small));
        assert!(!Tier::Small.can_merge_with(Tier::Medium));
        assert!(!Tier::Boss.can_merge_with(Tier::Boss));
        assert!(!Tier::Large.can_merge_with(Tier::Large));
    }

    #[test]
    fn test_cooldown_map() {
        let mut enemy = Enemy::new(Vec2::ZERO, Tier::Small, 10.0, 1.0, 20.0, 50.0);
        assert!(enemy.try_cooldown(SkillId::Orbit, 1.0, 0.5));
        assert!(!enemy.try_cooldown(SkillId::Orbit, 1.2, 0.5));
        assert!(enemy.try_cooldown(SkillId::Beam, 1.2, 0.5));
        assert!(enemy.try_cooldown(SkillId::Orbit, 1.6, 0.5));
    }

    #[test]
    fn test_pierce_damage_decay() {
        let mut p = Projectile::bolt(Vec2::ZERO, Vec2::X, 20.0, 1.0, 8.0, 1.0);
        assert_eq!(p.current_damage(0.25), 20.0);
        p.hops = 1;
        assert_eq!(p.current_damage(0.25), 15.0);
        p.hops = 10;
        assert_eq!(p.current_damage(0.25), 0.0);
    }

    #[test]
    fn test_max_health_keeps_fraction() {
        let mut player = Player::new(Vec2::ZERO, 100.0, 20.0, CharacterMultipliers::default());
        player.health = 50.0;
        player.set_max_health(200.0);
        assert_eq!(player.health, 100.0);
    }
}
