//! Phase-driven effects: the rhythm multiplier and beat bursts.

use std::f32::consts::TAU;

use super::{ActiveEffect, SkillContext, SkillId};
use crate::game::event::BurstEvent;
use crate::game::physics;

/// Oscillating damage and fire-rate bonus.
///
/// `multiplier = 1 + peak * (1 + cos(phase)) / 2`, so it swings between 1
/// and `1 + peak` once per period.
#[derive(Debug, Default)]
pub struct RhythmEffect {
    phase: f32,
    current: f32,
}

impl RhythmEffect {
    /// Multiplier computed on the last tick (1 before the first).
    pub fn current(&self) -> f32 {
        if self.current > 0.0 {
            self.current
        } else {
            1.0
        }
    }
}

impl ActiveEffect for RhythmEffect {
    fn skill(&self) -> SkillId {
        SkillId::Rhythm
    }

    fn prepare(&mut self, ctx: &mut SkillContext, dt: f32) {
        let r = ctx.stats.rhythm;
        if r.period <= 0.0 {
            return;
        }
        self.phase = (self.phase + TAU / r.period * dt).rem_euclid(TAU);
        self.current = 1.0 + r.peak * (1.0 + self.phase.cos()) * 0.5;
        ctx.modifiers.damage *= self.current;
        ctx.modifiers.fire_rate *= self.current;
    }

    fn apply(&mut self, _ctx: &mut SkillContext, _dt: f32) {}
}

/// Two close frequencies beating against each other; bursts fire near the
/// antinodes of the beat envelope.
#[derive(Debug, Default)]
pub struct BeatEffect {
    phase: f32,
    since_burst: f32,
}

impl ActiveEffect for BeatEffect {
    fn skill(&self) -> SkillId {
        SkillId::Beat
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let b = ctx.stats.beat;
        if b.f1 <= 0.0 {
            return;
        }
        let beat = (b.f1 - b.f2).abs();
        self.phase = (self.phase + TAU * beat * dt).rem_euclid(TAU);
        self.since_burst += dt;

        if self.phase.cos().abs() <= b.threshold || self.since_burst < b.min_gap {
            return;
        }
        self.since_burst = 0.0;

        let center = ctx.world.player.position;
        let damage = ctx.scaled_damage(b.damage);
        for (id, _, d) in ctx.world.enemies_within(center, b.radius) {
            ctx.world
                .damage_enemy(id, damage * physics::linear_falloff(d, b.radius));
        }
        ctx.events.burst.send(BurstEvent {
            position: center,
            radius: b.radius,
            skill: Some(SkillId::Beat),
        });
    }
}
