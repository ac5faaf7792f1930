//! Presentation Transforms
//!
//! The core only exposes where things are. Each frame the session builds
//! a `Transform2` per visible entity and hands it to the presenter; how
//! that turns into sprites or meshes is the presenter's business.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::components::{Enemy, Hazard, Orb, Player, Projectile};

/// Position, rotation (radians) and uniform scale of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2 {
    pub position: Vec2,
    pub rotation: f32,
    /// Diameter in world units
    pub scale: f32,
}

impl Transform2 {
    pub const IDENTITY: Transform2 = Transform2 {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: 1.0,
    };

    pub fn new(position: Vec2, rotation: f32, scale: f32) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Heading of a velocity, or 0 when standing still.
fn heading(velocity: Vec2) -> f32 {
    if velocity.length_squared() > 1e-6 {
        velocity.y.atan2(velocity.x)
    } else {
        0.0
    }
}

impl From<&Player> for Transform2 {
    fn from(p: &Player) -> Self {
        Transform2::new(p.position, p.facing, p.size)
    }
}

impl From<&Enemy> for Transform2 {
    fn from(e: &Enemy) -> Self {
        Transform2::new(e.position, heading(e.velocity), e.size)
    }
}

impl From<&Projectile> for Transform2 {
    fn from(p: &Projectile) -> Self {
        Transform2::new(p.position, heading(p.velocity), p.scale)
    }
}

impl From<&Orb> for Transform2 {
    fn from(o: &Orb) -> Self {
        // Bigger orbs for bigger rewards, capped so bosses don't drop a planet
        let scale = 6.0 + (o.value as f32).sqrt().min(6.0) * 2.0;
        Transform2::new(o.position, 0.0, scale)
    }
}

impl From<&Hazard> for Transform2 {
    fn from(h: &Hazard) -> Self {
        Transform2::new(h.position, h.age, h.radius * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::components::Tier;

    #[test]
    fn test_enemy_transform_faces_velocity() {
        let mut enemy = Enemy::new(Vec2::new(5.0, 5.0), Tier::Small, 10.0, 1.0, 20.0, 50.0);
        enemy.velocity = Vec2::new(0.0, 3.0);
        let t = Transform2::from(&enemy);
        assert_eq!(t.position, Vec2::new(5.0, 5.0));
        assert!((t.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert_eq!(t.scale, 20.0);
    }

    #[test]
    fn test_still_entity_has_zero_rotation() {
        let p = Projectile::bolt(Vec2::ZERO, Vec2::ZERO, 1.0, 1.0, 8.0, 1.0);
        assert_eq!(Transform2::from(&p).rotation, 0.0);
    }
}
