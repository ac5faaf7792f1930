//! Effects keyed off how the player moves.

use std::collections::HashSet;

use super::{ActiveEffect, DamageQuery, SkillContext, SkillId};
use crate::game::entity::Entity;
use crate::game::event::{BurstEvent, KnockbackEvent};
use crate::game::physics;
use crate::game::stats::Stats;

/// Area burst when the player moves faster than a threshold (dashes,
/// field slingshots). Debounced by a cooldown so a sustained high speed
/// does not fire every tick.
#[derive(Debug, Default)]
pub struct EscapeBurstEffect {
    cooldown_left: f32,
}

impl ActiveEffect for EscapeBurstEffect {
    fn skill(&self) -> SkillId {
        SkillId::EscapeBurst
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let e = ctx.stats.escape;
        if e.threshold <= 0.0 {
            return;
        }
        self.cooldown_left = (self.cooldown_left - dt).max(0.0);
        let speed = ctx.world.player.velocity.length();
        if speed <= e.threshold || self.cooldown_left > 0.0 {
            return;
        }
        self.cooldown_left = e.cooldown;

        let center = ctx.world.player.position;
        let damage = ctx.scaled_damage(e.damage);
        let force = e.force * ctx.stats.knockback_mult;
        for (id, pos, _) in ctx.world.enemies_within(center, e.radius) {
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
            radius: e.radius,
            skill: Some(SkillId::EscapeBurst),
        });
    }
}

/// Hits on enemies the player is closing in on deal more, hits on
/// enemies pulling away deal less.
#[derive(Debug, Default)]
pub struct DopplerEffect;

impl ActiveEffect for DopplerEffect {
    fn skill(&self) -> SkillId {
        SkillId::Doppler
    }

    fn apply(&mut self, _ctx: &mut SkillContext, _dt: f32) {}

    fn damage_multiplier(&self, stats: &Stats, q: &DamageQuery) -> f32 {
        let d = stats.doppler;
        if d.strength <= 0.0 || d.reference_speed <= 0.0 {
            return 1.0;
        }
        let (line, _) = physics::direction(q.player_position, q.target_position);
        let closing = (q.player_velocity - q.target_velocity).dot(line);
        let shift = (d.strength * closing / d.reference_speed).clamp(-d.recede_cap, d.approach_cap);
        1.0 + shift
    }
}

/// Periodic phase-through window. While active the player ignores contact
/// damage and hurts each enemy it overlaps once per activation. The window
/// opens and closes in `prepare` so it covers contact on its first tick.
#[derive(Debug, Default)]
pub struct GhostEffect {
    timer: f32,
    active_until: Option<f32>,
    hit: HashSet<Entity>,
}

impl GhostEffect {
    pub fn is_active(&self) -> bool {
        self.active_until.is_some()
    }
}

impl ActiveEffect for GhostEffect {
    fn skill(&self) -> SkillId {
        SkillId::Ghost
    }

    fn prepare(&mut self, ctx: &mut SkillContext, dt: f32) {
        let g = ctx.stats.ghost;
        if g.interval <= 0.0 {
            return;
        }

        match self.active_until {
            Some(end) if ctx.time >= end => {
                self.active_until = None;
                self.timer = 0.0;
                self.hit.clear();
                ctx.world.player.invulnerable = false;
            }
            Some(_) => {}
            None => {
                self.timer += dt;
                if self.timer < g.interval {
                    return;
                }
                self.active_until = Some(ctx.time + g.duration);
                self.hit.clear();
                ctx.world.player.invulnerable = true;
                log::debug!("ghost window opened at {:.2}s", ctx.time);
            }
        }
    }

    fn apply(&mut self, ctx: &mut SkillContext, _dt: f32) {
        if self.active_until.is_none() {
            return;
        }
        let g = ctx.stats.ghost;

        let center = ctx.world.player.position;
        let reach = ctx.world.player.radius();
        let damage = ctx.scaled_damage(g.damage);
        let touching: Vec<Entity> = ctx
            .world
            .enemies
            .iter()
            .filter(|(id, e)| {
                e.is_active()
                    && !self.hit.contains(id)
                    && e.position.distance(center) < reach + e.radius()
            })
            .map(|(id, _)| id)
            .collect();
        for id in touching {
            ctx.world.damage_enemy(id, damage);
            self.hit.insert(id);
        }
    }
}
