//! Effects that jump from enemy to enemy.

use glam::Vec2;
use rand::Rng;
use std::collections::HashSet;

use super::{ActiveEffect, SkillContext, SkillId};
use crate::game::entity::Entity;
use crate::game::event::{BeamEvent, BurstEvent};
use crate::game::physics;
use crate::game::world::{DeathRecord, HitRecord};

/// Chance on every kill to detonate the corpse.
#[derive(Debug, Default)]
pub struct DeathChainEffect;

impl ActiveEffect for DeathChainEffect {
    fn skill(&self) -> SkillId {
        SkillId::DeathChain
    }

    fn apply(&mut self, _ctx: &mut SkillContext, _dt: f32) {}

    fn on_enemy_death(&mut self, ctx: &mut SkillContext, death: &DeathRecord) {
        let c = ctx.stats.death_chain;
        if c.chance <= 0.0 || ctx.rng.gen::<f32>() >= c.chance {
            return;
        }
        let damage = ctx.scaled_damage(c.damage);
        for (id, _, d) in ctx.world.enemies_within(death.position, c.radius) {
            if id == death.entity {
                continue;
            }
            ctx.world
                .damage_enemy(id, damage * physics::linear_falloff(d, c.radius));
        }
        ctx.events.burst.send(BurstEvent {
            position: death.position,
            radius: c.radius,
            skill: Some(SkillId::DeathChain),
        });
    }
}

/// Each projectile hit arcs onward to the nearest untouched enemy, losing
/// a fraction of its damage per hop.
#[derive(Debug, Default)]
pub struct HitChainEffect;

impl HitChainEffect {
    fn hop(
        ctx: &mut SkillContext,
        from: Vec2,
        damage: f32,
        visited: &mut HashSet<Entity>,
        depth_left: u32,
    ) {
        let c = ctx.stats.hit_chain;
        let damage = damage * c.fraction;
        if depth_left == 0 || damage <= 0.0 {
            return;
        }
        let Some((next, _)) = ctx.world.nearest_enemy(from, c.range, |e| !visited.contains(&e)) else {
            return;
        };
        visited.insert(next);
        ctx.world.damage_enemy(next, damage);
        let Some(at) = ctx.world.enemies.get(next).map(|e| e.position) else {
            return;
        };
        Self::hop(ctx, at, damage, visited, depth_left - 1);
    }
}

impl ActiveEffect for HitChainEffect {
    fn skill(&self) -> SkillId {
        SkillId::HitChain
    }

    fn apply(&mut self, _ctx: &mut SkillContext, _dt: f32) {}

    fn on_projectile_hit(&mut self, ctx: &mut SkillContext, hit: &HitRecord) {
        let depth = ctx.stats.hit_chain.depth;
        if depth == 0 {
            return;
        }
        let mut visited = HashSet::from([hit.target]);
        Self::hop(ctx, hit.point, hit.damage, &mut visited, depth);
    }
}

/// Greedy chain from the player through the nearest enemies, dealing
/// damage per second to every linked target.
#[derive(Debug, Default)]
pub struct BeamEffect {
    links: Vec<Entity>,
}

impl BeamEffect {
    pub fn links(&self) -> &[Entity] {
        &self.links
    }
}

impl ActiveEffect for BeamEffect {
    fn skill(&self) -> SkillId {
        SkillId::Beam
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        self.links.clear();
        let b = ctx.stats.beam;
        if b.hops == 0 {
            return;
        }

        let mut points = vec![ctx.world.player.position];
        let mut from = ctx.world.player.position;
        while (self.links.len() as u32) < b.hops {
            let links = &self.links;
            let Some((next, _)) = ctx.world.nearest_enemy(from, b.range, |e| !links.contains(&e)) else {
                break;
            };
            self.links.push(next);
            if let Some(enemy) = ctx.world.enemies.get(next) {
                from = enemy.position;
                points.push(from);
            }
        }
        if self.links.is_empty() {
            return;
        }

        let damage = ctx.scaled_damage(b.dps * dt);
        for id in &self.links {
            ctx.world.damage_enemy(*id, damage);
        }
        ctx.events.beam.send(BeamEvent { points });
    }
}
