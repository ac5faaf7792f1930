//! Timer-driven effects: pulse, aura and floating hazards.

use glam::Vec2;
use rand::Rng;

use super::{ActiveEffect, SkillContext, SkillId};
use crate::game::components::Hazard;
use crate::game::event::{BurstEvent, KnockbackEvent};
use crate::game::physics;

/// Radial knockback and damage every `interval` seconds.
#[derive(Debug, Default)]
pub struct PulseEffect {
    timer: f32,
}

impl ActiveEffect for PulseEffect {
    fn skill(&self) -> SkillId {
        SkillId::Pulse
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let p = ctx.stats.pulse;
        if p.interval <= 0.0 {
            return;
        }
        self.timer += dt;
        if self.timer < p.interval {
            return;
        }
        self.timer = 0.0;

        let center = ctx.world.player.position;
        let damage = ctx.scaled_damage(p.damage);
        let force = p.force * ctx.stats.knockback_mult;
        for (id, pos, _) in ctx.world.enemies_within(center, p.radius) {
            ctx.world.damage_enemy(id, damage);
            let (dir, _) = physics::direction(center, pos);
            let impulse = ctx.world.push_enemy(id, dir, force);
            ctx.events.knockback.send(KnockbackEvent {
                position: pos,
                direction: dir,
                intensity: impulse.length(),
            });
        }
        ctx.events.burst.send(BurstEvent {
            position: center,
            radius: p.radius,
            skill: Some(SkillId::Pulse),
        });
    }
}

/// Continuous damage around the player, resolved on a fixed sub-interval.
#[derive(Debug, Default)]
pub struct AuraEffect {
    accumulator: f32,
}

impl ActiveEffect for AuraEffect {
    fn skill(&self) -> SkillId {
        SkillId::Aura
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let a = ctx.stats.aura;
        if a.radius <= 0.0 || a.tick <= 0.0 {
            return;
        }
        self.accumulator += dt;

        let mut steps = 0;
        while self.accumulator >= a.tick && steps < a.max_steps.max(1) {
            self.accumulator -= a.tick;
            steps += 1;

            let center = ctx.world.player.position;
            let per_tick = ctx.scaled_damage(a.dps * a.tick);
            for (id, _, d) in ctx.world.enemies_within(center, a.radius) {
                let falloff = physics::inverse_square_falloff(d, a.radius, a.epsilon);
                ctx.world.damage_enemy(id, per_tick * falloff);
            }
        }
        // Drop backlog we refused to process
        if steps >= a.max_steps.max(1) {
            self.accumulator = self.accumulator.min(a.tick);
        }
    }
}

/// Spawns drifting hazards that burst when their timer runs out.
#[derive(Debug, Default)]
pub struct HazardEffect {
    timer: f32,
}

impl ActiveEffect for HazardEffect {
    fn skill(&self) -> SkillId {
        SkillId::Hazard
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let h = ctx.stats.hazard;
        if h.interval <= 0.0 {
            return;
        }

        let mut bursts = Vec::new();
        for (id, hazard) in ctx.world.hazards.iter_mut() {
            if hazard.detonated {
                continue;
            }
            hazard.age += dt;
            hazard.position += hazard.velocity * dt;
            if hazard.age >= hazard.duration {
                hazard.detonated = true;
                bursts.push((id, hazard.position, hazard.radius, hazard.damage));
            }
        }

        for (id, position, radius, damage) in bursts {
            let damage = ctx.scaled_damage(damage);
            for (enemy, _, d) in ctx.world.enemies_within(position, radius) {
                ctx.world
                    .damage_enemy(enemy, damage * physics::linear_falloff(d, radius));
            }
            ctx.events.burst.send(BurstEvent {
                position,
                radius,
                skill: Some(SkillId::Hazard),
            });
            ctx.world.despawn(id);
        }

        // New hazards start ageing next tick
        self.timer += dt;
        if self.timer >= h.interval {
            self.timer = 0.0;
            let angle = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
            let dir = Vec2::from_angle(angle);
            let offset = dir * ctx.rng.gen_range(0.0..h.radius.max(1.0));
            ctx.world.spawn_hazard(Hazard::new(
                ctx.world.player.position + offset,
                dir * h.drift,
                h.duration,
                h.radius,
                h.damage,
            ));
        }
    }
}
