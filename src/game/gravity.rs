//! Gravity Field
//!
//! One radial source per arena (stages without a field have none). Every
//! tick it pulls the player, enemies and free projectiles with separate
//! coupling factors. Inside the event horizon enemies are absorbed and
//! killed; the player instead takes damage at a fixed interval and gets
//! flung outward, harder the deeper it sits.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::event::{AbsorbedEvent, Events, PlayerDamagedEvent};
use super::physics;
use super::world::World;
use crate::tuning::GravityTuning;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravityField {
    pub position: Vec2,
    /// G·M
    pub strength: f32,
    /// No pull beyond this distance
    pub radius: f32,
    pub horizon: f32,
    /// Distances below this are clamped
    pub min_distance: f32,
    pub max_force: f32,
}

/// What the field did during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldReport {
    pub absorbed: u32,
    pub player_damage: f32,
}

impl GravityField {
    pub fn new(position: Vec2, strength: f32, radius: f32, horizon: f32, tuning: &GravityTuning) -> Self {
        Self {
            position,
            strength,
            radius,
            horizon,
            min_distance: tuning.min_distance,
            max_force: tuning.max_force,
        }
    }

    /// Inverse-square acceleration toward the source, clamped near the
    /// singularity and zero outside the field radius.
    pub fn force_at(&self, point: Vec2) -> Vec2 {
        let (dir, d) = physics::direction(point, self.position);
        if d > self.radius || self.strength <= 0.0 {
            return Vec2::ZERO;
        }
        let clamped = d.max(self.min_distance).max(physics::MIN_DISTANCE);
        let magnitude = (self.strength / (clamped * clamped)).min(self.max_force);
        dir * magnitude
    }

    pub fn in_horizon(&self, point: Vec2) -> bool {
        point.distance(self.position) < self.horizon
    }

    /// 0 at the field edge (or beyond), 1 at the horizon. Presentation only.
    pub fn proximity(&self, point: Vec2) -> f32 {
        let span = self.radius - self.horizon;
        if span <= 0.0 {
            return 0.0;
        }
        let d = point.distance(self.position);
        (1.0 - (d - self.horizon) / span).clamp(0.0, 1.0)
    }

    /// Pull everything and resolve the horizon.
    pub fn apply(&self, world: &mut World, tuning: &GravityTuning, events: &mut Events, dt: f32) -> FieldReport {
        let mut report = FieldReport::default();

        // Player
        let pull = self.force_at(world.player.position) * tuning.player_coupling;
        world.player.external_velocity += pull * dt;
        if self.in_horizon(world.player.position) {
            world.player.horizon_timer += dt;
            while world.player.horizon_timer >= tuning.horizon_dot_interval {
                world.player.horizon_timer -= tuning.horizon_dot_interval;
                world.player.health -= tuning.horizon_dot_damage;
                world.tally.damage_taken += tuning.horizon_dot_damage;
                report.player_damage += tuning.horizon_dot_damage;
                events.player_damaged.send(PlayerDamagedEvent {
                    amount: tuning.horizon_dot_damage,
                    position: world.player.position,
                });

                // Slingshot: deeper means a harder kick out
                let (out, d) = physics::direction(self.position, world.player.position);
                let depth = (1.0 - d / self.horizon.max(physics::MIN_DISTANCE)).clamp(0.0, 1.0);
                world.player.external_velocity += out * tuning.escape_impulse * depth;
            }
        } else {
            world.player.horizon_timer = 0.0;
        }

        // Enemies
        let mut absorbed = Vec::new();
        for (id, enemy) in world.enemies.iter_mut() {
            if !enemy.is_active() {
                continue;
            }
            if self.in_horizon(enemy.position) {
                enemy.health = 0.0;
                absorbed.push((id, enemy.position));
                continue;
            }
            enemy.velocity += self.force_at(enemy.position) * tuning.enemy_coupling * dt;
        }
        for (entity, position) in absorbed {
            events.absorbed.send(AbsorbedEvent { entity, position });
            world.tally.absorbed += 1;
            report.absorbed += 1;
        }

        // Free projectiles
        for (_, projectile) in world.projectiles.iter_mut() {
            if projectile.spent || projectile.is_orbital() {
                continue;
            }
            projectile.velocity += self.force_at(projectile.position) * tuning.projectile_coupling * dt;
        }

        report
    }
}
