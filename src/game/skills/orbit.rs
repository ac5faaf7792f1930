//! Orbiting projectiles held around the player.
//!
//! The orbitals are ordinary projectile records with an `Orbital` kind, so
//! the presenter draws them like any other shot. The effect owns their
//! ids, places them every tick and handles their hits itself; the
//! resolver and the projectile mover leave orbitals alone.

use glam::Vec2;
use std::f32::consts::TAU;

use super::{ActiveEffect, SkillContext, SkillId};
use crate::game::components::{Projectile, ProjectileKind};
use crate::game::entity::Entity;

#[derive(Debug, Default)]
pub struct OrbitEffect {
    orbitals: Vec<Entity>,
    phase: f32,
}

impl OrbitEffect {
    pub fn orbitals(&self) -> &[Entity] {
        &self.orbitals
    }

    fn retire(&mut self, ctx: &mut SkillContext) {
        for id in self.orbitals.drain(..) {
            if let Some(p) = ctx.world.projectiles.get_mut(id) {
                p.spent = true;
            }
            ctx.world.despawn(id);
        }
    }

    /// True if the live set no longer matches `count`.
    fn is_stale(&self, ctx: &SkillContext, count: u32) -> bool {
        self.orbitals.len() != count as usize
            || self.orbitals.iter().any(|id| {
                ctx.world
                    .projectiles
                    .get(*id)
                    .map_or(true, |p| p.spent || !p.is_orbital())
            })
    }
}

impl ActiveEffect for OrbitEffect {
    fn skill(&self) -> SkillId {
        SkillId::Orbit
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let o = ctx.stats.orbit;
        if o.count == 0 {
            if !self.orbitals.is_empty() {
                self.retire(ctx);
            }
            return;
        }

        if self.is_stale(ctx, o.count) {
            self.retire(ctx);
            let center = ctx.world.player.position;
            for slot in 0..o.count {
                let mut p = Projectile::bolt(center, Vec2::ZERO, o.damage, 1.0, o.size, f32::INFINITY);
                p.kind = ProjectileKind::Orbital { slot };
                let id = ctx.world.spawn_projectile(p);
                self.orbitals.push(id);
            }
            log::debug!("orbit regenerated with {} orbitals", o.count);
        }

        self.phase = (self.phase + o.angular_speed * dt).rem_euclid(TAU);
        let center = ctx.world.player.position;
        let spacing = TAU / o.count as f32;
        let mut placed = Vec::with_capacity(self.orbitals.len());
        for (slot, id) in self.orbitals.iter().enumerate() {
            let angle = self.phase + spacing * slot as f32;
            let radial = Vec2::from_angle(angle);
            let position = center + radial * o.radius;
            if let Some(p) = ctx.world.projectiles.get_mut(*id) {
                p.position = position;
                p.velocity = radial.perp() * o.angular_speed * o.radius;
                placed.push((position, p.radius()));
            }
        }

        let damage = ctx.scaled_damage(o.damage);
        let now = ctx.time;
        for (position, radius) in placed {
            let mut struck = Vec::new();
            for (id, enemy) in ctx.world.enemies.iter_mut() {
                if !enemy.is_active() || enemy.position.distance(position) >= radius + enemy.radius() {
                    continue;
                }
                if enemy.try_cooldown(SkillId::Orbit, now, o.hit_cooldown) {
                    struck.push(id);
                }
            }
            for id in struck {
                ctx.world.damage_enemy(id, damage);
            }
        }
    }
}
