//! Skill Effect Engine
//!
//! Two kinds of skills exist:
//! - static skills fold into `Stats` through `stats::recompute` and have no
//!   per-tick work at all
//! - dynamic skills are `ActiveEffect` objects owned by the `SkillEngine`,
//!   each a small state machine with its own timers
//!
//! The engine runs every effect once per tick with a `SkillContext`, then
//! replays this tick's projectile hits and (from cleanup) enemy deaths to
//! the effects that react to them. Effects read their numbers from the
//! `Stats` threaded in through the context and return early when the
//! number that drives them is unset.

mod chains;
mod fields;
mod motion;
mod orbit;
mod periodic;
mod waves;

pub use chains::{BeamEffect, DeathChainEffect, HitChainEffect};
pub use fields::{ChaosEffect, DeflectorEffect, FlowEffect, ForceFieldEffect};
pub use motion::{DopplerEffect, EscapeBurstEffect, GhostEffect};
pub use orbit::OrbitEffect;
pub use periodic::{AuraEffect, HazardEffect, PulseEffect};
pub use waves::{BeatEffect, RhythmEffect};

use glam::Vec2;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::event::Events;
use super::stats::{SkillLoadout, Stats};
use super::world::{DeathRecord, HitRecord, World};

/// Every selectable skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillId {
    // Static
    Might,
    Haste,
    Swiftness,
    Impact,
    Piercing,
    Ricochet,
    Multishot,
    Vitality,
    Magnetism,
    // Dynamic
    Pulse,
    Aura,
    Rhythm,
    Beat,
    Chaos,
    Flow,
    Attractor,
    Repulsor,
    DeathChain,
    HitChain,
    EscapeBurst,
    Doppler,
    Orbit,
    Ghost,
    Beam,
    Deflector,
    Hazard,
}

impl SkillId {
    pub const ALL: [SkillId; 26] = [
        SkillId::Might,
        SkillId::Haste,
        SkillId::Swiftness,
        SkillId::Impact,
        SkillId::Piercing,
        SkillId::Ricochet,
        SkillId::Multishot,
        SkillId::Vitality,
        SkillId::Magnetism,
        SkillId::Pulse,
        SkillId::Aura,
        SkillId::Rhythm,
        SkillId::Beat,
        SkillId::Chaos,
        SkillId::Flow,
        SkillId::Attractor,
        SkillId::Repulsor,
        SkillId::DeathChain,
        SkillId::HitChain,
        SkillId::EscapeBurst,
        SkillId::Doppler,
        SkillId::Orbit,
        SkillId::Ghost,
        SkillId::Beam,
        SkillId::Deflector,
        SkillId::Hazard,
    ];

    /// Static skills only change stats; they never get an effect object.
    pub fn is_static(self) -> bool {
        matches!(
            self,
            SkillId::Might
                | SkillId::Haste
                | SkillId::Swiftness
                | SkillId::Impact
                | SkillId::Piercing
                | SkillId::Ricochet
                | SkillId::Multishot
                | SkillId::Vitality
                | SkillId::Magnetism
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            SkillId::Might => "Might",
            SkillId::Haste => "Haste",
            SkillId::Swiftness => "Swiftness",
            SkillId::Impact => "Impact",
            SkillId::Piercing => "Piercing",
            SkillId::Ricochet => "Ricochet",
            SkillId::Multishot => "Multishot",
            SkillId::Vitality => "Vitality",
            SkillId::Magnetism => "Magnetism",
            SkillId::Pulse => "Pulse",
            SkillId::Aura => "Aura",
            SkillId::Rhythm => "Rhythm",
            SkillId::Beat => "Beat",
            SkillId::Chaos => "Chaos",
            SkillId::Flow => "Flow",
            SkillId::Attractor => "Attractor",
            SkillId::Repulsor => "Repulsor",
            SkillId::DeathChain => "Death Chain",
            SkillId::HitChain => "Hit Chain",
            SkillId::EscapeBurst => "Escape Burst",
            SkillId::Doppler => "Doppler",
            SkillId::Orbit => "Orbit",
            SkillId::Ghost => "Ghost",
            SkillId::Beam => "Beam",
            SkillId::Deflector => "Deflector",
            SkillId::Hazard => "Hazard",
        }
    }
}

/// Per-tick multipliers produced by effects (rhythm) and read by the weapon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifiers {
    pub damage: f32,
    pub fire_rate: f32,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            damage: 1.0,
            fire_rate: 1.0,
        }
    }
}

/// Everything an effect may touch during one call.
pub struct SkillContext<'a> {
    pub world: &'a mut World,
    pub stats: &'a Stats,
    pub events: &'a mut Events,
    pub rng: &'a mut StdRng,
    /// Game time in seconds
    pub time: f32,
    pub modifiers: &'a mut Modifiers,
}

impl SkillContext<'_> {
    /// Damage after the global multipliers of this tick.
    pub fn scaled_damage(&self, base: f32) -> f32 {
        base * self.stats.damage_mult * self.modifiers.damage
    }
}

/// Inputs for hit-time damage modifiers.
#[derive(Debug, Clone, Copy)]
pub struct DamageQuery {
    pub player_position: Vec2,
    pub player_velocity: Vec2,
    pub target_position: Vec2,
    pub target_velocity: Vec2,
}

/// One dynamic skill.
pub trait ActiveEffect {
    fn skill(&self) -> SkillId;

    /// Runs before the weapon fires and before contact damage. Windows and
    /// modifiers that must hold for the whole tick are set here.
    fn prepare(&mut self, _ctx: &mut SkillContext, _dt: f32) {}

    /// Per-tick update.
    fn apply(&mut self, ctx: &mut SkillContext, dt: f32);

    /// An enemy died during cleanup.
    fn on_enemy_death(&mut self, _ctx: &mut SkillContext, _death: &DeathRecord) {}

    /// A projectile struck an enemy this tick.
    fn on_projectile_hit(&mut self, _ctx: &mut SkillContext, _hit: &HitRecord) {}

    /// Multiplier on projectile damage at the moment of impact.
    fn damage_multiplier(&self, _stats: &Stats, _query: &DamageQuery) -> f32 {
        1.0
    }
}

/// Build the effect object for a dynamic skill.
pub fn make_effect(skill: SkillId) -> Option<Box<dyn ActiveEffect>> {
    let effect: Box<dyn ActiveEffect> = match skill {
        SkillId::Pulse => Box::new(PulseEffect::default()),
        SkillId::Aura => Box::new(AuraEffect::default()),
        SkillId::Hazard => Box::new(HazardEffect::default()),
        SkillId::Rhythm => Box::new(RhythmEffect::default()),
        SkillId::Beat => Box::new(BeatEffect::default()),
        SkillId::Chaos => Box::new(ChaosEffect),
        SkillId::Flow => Box::new(FlowEffect::default()),
        SkillId::Attractor => Box::new(ForceFieldEffect::attractor()),
        SkillId::Repulsor => Box::new(ForceFieldEffect::repulsor()),
        SkillId::Deflector => Box::new(DeflectorEffect),
        SkillId::DeathChain => Box::new(DeathChainEffect),
        SkillId::HitChain => Box::new(HitChainEffect),
        SkillId::Beam => Box::new(BeamEffect::default()),
        SkillId::EscapeBurst => Box::new(EscapeBurstEffect::default()),
        SkillId::Doppler => Box::new(DopplerEffect),
        SkillId::Ghost => Box::new(GhostEffect::default()),
        SkillId::Orbit => Box::new(OrbitEffect::default()),
        _ => return None,
    };
    Some(effect)
}

/// The list of live effects, one per picked dynamic skill.
#[derive(Default)]
pub struct SkillEngine {
    effects: Vec<Box<dyn ActiveEffect>>,
}

impl SkillEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the effect list match the loadout. Existing effects keep their
    /// timers; new picks are appended in pick order.
    pub fn sync(&mut self, loadout: &SkillLoadout) {
        self.effects.retain(|e| loadout.level(e.skill()) > 0);
        for (skill, _) in loadout.iter() {
            if skill.is_static() || self.has(skill) {
                continue;
            }
            if let Some(effect) = make_effect(skill) {
                log::debug!("activating effect {}", skill.label());
                self.effects.push(effect);
            }
        }
    }

    pub fn has(&self, skill: SkillId) -> bool {
        self.effects.iter().any(|e| e.skill() == skill)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn prepare(&mut self, ctx: &mut SkillContext, dt: f32) {
        for effect in self.effects.iter_mut() {
            effect.prepare(ctx, dt);
        }
    }

    /// Run every effect, then feed this tick's projectile hits to them.
    pub fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        if self.effects.is_empty() {
            ctx.world.hits.clear();
            return;
        }
        for effect in self.effects.iter_mut() {
            effect.apply(ctx, dt);
        }

        let hits = std::mem::take(&mut ctx.world.hits);
        for hit in &hits {
            for effect in self.effects.iter_mut() {
                effect.on_projectile_hit(ctx, hit);
            }
        }
    }

    pub fn on_enemy_death(&mut self, ctx: &mut SkillContext, death: &DeathRecord) {
        for effect in self.effects.iter_mut() {
            effect.on_enemy_death(ctx, death);
        }
    }

    /// Product of all effects' hit-time multipliers.
    pub fn damage_multiplier(&self, stats: &Stats, query: &DamageQuery) -> f32 {
        self.effects
            .iter()
            .map(|e| e.damage_multiplier(stats, query))
            .product()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_dynamic_skill_has_an_effect() {
        for skill in SkillId::ALL {
            assert_eq!(make_effect(skill).is_none(), skill.is_static(), "{:?}", skill);
            if let Some(effect) = make_effect(skill) {
                assert_eq!(effect.skill(), skill);
            }
        }
    }

    #[test]
    fn test_sync_keeps_existing_and_drops_removed() {
        let mut loadout = SkillLoadout::default();
        loadout.add(SkillId::Pulse, 5);
        loadout.add(SkillId::Might, 5);
        loadout.add(SkillId::Orbit, 5);

        let mut engine = SkillEngine::new();
        engine.sync(&loadout);
        assert_eq!(engine.len(), 2);
        assert!(engine.has(SkillId::Pulse));
        assert!(!engine.has(SkillId::Might));

        loadout.add(SkillId::Pulse, 5);
        engine.sync(&loadout);
        assert_eq!(engine.len(), 2);

        engine.sync(&SkillLoadout::default());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_no_effects_is_a_no_op() {
        let mut h = test_support::Harness::new();
        let mut engine = SkillEngine::new();
        h.with_ctx(|ctx| engine.apply(ctx, 0.016));
        assert!(h.events.is_empty());
        let q = DamageQuery {
            player_position: Vec2::ZERO,
            player_velocity: Vec2::ZERO,
            target_position: Vec2::X,
            target_velocity: Vec2::ZERO,
        };
        assert_eq!(engine.damage_multiplier(&h.stats, &q), 1.0);
    }
}
