//! Effects that bend enemy motion around the player without a timer.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::{ActiveEffect, SkillContext, SkillId};
use crate::game::physics;

/// Random kicks inside a radius, stronger close to the player.
#[derive(Debug, Default)]
pub struct ChaosEffect;

impl ActiveEffect for ChaosEffect {
    fn skill(&self) -> SkillId {
        SkillId::Chaos
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let c = ctx.stats.chaos;
        if c.radius <= 0.0 {
            return;
        }
        let center = ctx.world.player.position;
        for (id, _, d) in ctx.world.enemies_within(center, c.radius) {
            let proximity = physics::linear_falloff(d, c.radius);
            let dir = Vec2::from_angle(ctx.rng.gen_range(0.0..TAU));
            if let Some(enemy) = ctx.world.enemies.get_mut(id) {
                enemy.velocity += dir * c.strength * proximity * dt;
            }
        }
    }
}

/// A rotating line through the player. Enemies are drawn toward the line
/// and, once inside the band around it, pushed outward along it.
#[derive(Debug, Default)]
pub struct FlowEffect {
    angle: f32,
}

impl FlowEffect {
    pub fn line_direction(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }
}

impl ActiveEffect for FlowEffect {
    fn skill(&self) -> SkillId {
        SkillId::Flow
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let f = ctx.stats.flow;
        if f.radius <= 0.0 {
            return;
        }
        self.angle = (self.angle + f.angular_speed * dt).rem_euclid(TAU);
        let line = self.line_direction();
        let center = ctx.world.player.position;

        for (id, pos, _) in ctx.world.enemies_within(center, f.radius) {
            let offset = pos - center;
            let along = offset.dot(line);
            let lateral = offset - line * along;
            let lateral_dist = lateral.length();

            let mut dv = -physics::normalize_or_zero(lateral) * f.pull * dt;
            if lateral_dist < f.band {
                let side = if along >= 0.0 { 1.0 } else { -1.0 };
                dv += line * side * f.push * dt;
            }
            if let Some(enemy) = ctx.world.enemies.get_mut(id) {
                enemy.velocity += dv;
            }
        }
    }
}

/// `strength / (n² + ε)` toward (attractor) or away from (repulsor) the
/// player, `n` being distance over radius, divided by √mass.
#[derive(Debug)]
pub struct ForceFieldEffect {
    skill: SkillId,
    /// +1 pulls in, -1 pushes out
    sign: f32,
}

impl ForceFieldEffect {
    pub fn attractor() -> Self {
        Self {
            skill: SkillId::Attractor,
            sign: 1.0,
        }
    }

    pub fn repulsor() -> Self {
        Self {
            skill: SkillId::Repulsor,
            sign: -1.0,
        }
    }
}

impl ActiveEffect for ForceFieldEffect {
    fn skill(&self) -> SkillId {
        self.skill
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let p = if self.sign > 0.0 {
            ctx.stats.attractor
        } else {
            ctx.stats.repulsor
        };
        if p.strength <= 0.0 || p.radius <= 0.0 {
            return;
        }
        let center = ctx.world.player.position;
        for (id, pos, d) in ctx.world.enemies_within(center, p.radius) {
            let n = d / p.radius;
            let magnitude = p.strength / (n * n + p.epsilon.max(1e-3));
            let (toward, _) = physics::direction(pos, center);
            if let Some(enemy) = ctx.world.enemies.get_mut(id) {
                let scale = physics::guard_mass(enemy.mass).sqrt();
                enemy.velocity += toward * self.sign * magnitude / scale * dt;
            }
        }
    }
}

/// Bends enemy velocity toward the tangent of the circle around the
/// player, turning the same way the enemy was already sliding past.
#[derive(Debug, Default)]
pub struct DeflectorEffect;

impl ActiveEffect for DeflectorEffect {
    fn skill(&self) -> SkillId {
        SkillId::Deflector
    }

    fn apply(&mut self, ctx: &mut SkillContext, dt: f32) {
        let p = ctx.stats.deflector;
        if p.radius <= 0.0 {
            return;
        }
        let center = ctx.world.player.position;
        let blend = (p.strength * dt).clamp(0.0, 1.0);
        for (id, pos, _) in ctx.world.enemies_within(center, p.radius) {
            let (radial, _) = physics::direction(center, pos);
            let Some(enemy) = ctx.world.enemies.get_mut(id) else {
                continue;
            };
            let speed = enemy.velocity.length();
            if speed <= physics::MIN_DISTANCE {
                continue;
            }
            let side = if radial.perp_dot(enemy.velocity) >= 0.0 { 1.0 } else { -1.0 };
            let tangent = radial.perp() * side;
            enemy.velocity = enemy.velocity.lerp(tangent * speed, blend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::skills::test_support::Harness;
    use crate::game::stats::{ChaosParams, DeflectorParams, FlowParams, ForceFieldParams};

    fn field(strength: f32) -> ForceFieldParams {
        ForceFieldParams {
            strength,
            radius: 200.0,
            epsilon: 0.05,
        }
    }

    #[test]
    fn test_attractor_pulls_and_repulsor_pushes() {
        let mut h = Harness::new();
        h.stats.attractor = field(50.0);
        h.stats.repulsor = field(50.0);
        let a = h.enemy_at(glam::Vec2::new(100.0, 0.0), 50.0);

        h.run(&mut ForceFieldEffect::attractor(), 0.1);
        let pulled = h.world.enemies.get(a).unwrap().velocity.x;
        assert!(pulled < 0.0);

        h.world.enemies.get_mut(a).unwrap().velocity = Vec2::ZERO;
        h.run(&mut ForceFieldEffect::repulsor(), 0.1);
        assert!(h.world.enemies.get(a).unwrap().velocity.x > 0.0);
    }

    #[test]
    fn test_force_field_scales_with_inverse_sqrt_mass() {
        let mut h = Harness::new();
        h.stats.attractor = field(50.0);
        let light = h.enemy_at(Vec2::new(100.0, 0.0), 50.0);
        let heavy = h.enemy_at(Vec2::new(0.0, 100.0), 50.0);
        h.world.enemies.get_mut(heavy).unwrap().mass = 4.0;

        h.run(&mut ForceFieldEffect::attractor(), 0.1);
        let dv_light = h.world.enemies.get(light).unwrap().velocity.length();
        let dv_heavy = h.world.enemies.get(heavy).unwrap().velocity.length();
        approx::assert_relative_eq!(dv_light, dv_heavy * 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_chaos_only_touches_enemies_in_radius() {
        let mut h = Harness::new();
        h.stats.chaos = ChaosParams {
            radius: 100.0,
            strength: 500.0,
        };
        let inside = h.enemy_at(Vec2::new(10.0, 0.0), 50.0);
        let outside = h.enemy_at(Vec2::new(400.0, 0.0), 50.0);
        h.run(&mut ChaosEffect, 0.1);
        assert!(h.world.enemies.get(inside).unwrap().velocity.length() > 0.0);
        assert_eq!(h.world.enemies.get(outside).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn test_flow_pulls_toward_line_and_pushes_along_it() {
        let mut h = Harness::new();
        h.stats.flow = FlowParams {
            radius: 300.0,
            angular_speed: 0.0,
            band: 20.0,
            pull: 100.0,
            push: 100.0,
        };
        // Line stays on +X with zero angular speed
        let off_line = h.enemy_at(Vec2::new(100.0, 50.0), 50.0);
        let on_line = h.enemy_at(Vec2::new(100.0, 5.0), 50.0);
        h.run(&mut FlowEffect::default(), 0.1);

        let v_off = h.world.enemies.get(off_line).unwrap().velocity;
        assert!(v_off.y < 0.0 && v_off.x.abs() < 1e-4);
        let v_on = h.world.enemies.get(on_line).unwrap().velocity;
        assert!(v_on.x > 0.0);
    }

    #[test]
    fn test_deflector_turns_toward_tangent() {
        let mut h = Harness::new();
        h.stats.deflector = DeflectorParams {
            radius: 200.0,
            strength: 5.0,
        };
        let e = h.enemy_at(Vec2::new(100.0, 0.0), 50.0);
        // Heading inward and slightly up
        h.world.enemies.get_mut(e).unwrap().velocity = Vec2::new(-50.0, 10.0);
        h.run(&mut DeflectorEffect, 0.1);
        let v = h.world.enemies.get(e).unwrap().velocity;
        assert!(v.y > 10.0, "tangential part grew: {v:?}");
        assert!(v.x > -50.0, "radial part shrank: {v:?}");
    }
}
