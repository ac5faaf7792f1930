//! Movement systems
//!
//! Integrates positions for the player, free projectiles, enemies and
//! orbs. Nothing here deals damage; contacts are the resolver's job.

use glam::Vec2;

use super::physics;
use super::stats::Stats;
use super::world::World;
use crate::tuning::{ArenaTuning, PlayerTuning};

/// Reference frame rate for per-frame decay constants.
const DECAY_FPS: f32 = 60.0;

/// Distance at which a homing orb counts as collected, on top of the
/// player radius.
const COLLECT_SLACK: f32 = 4.0;

/// Input plus external velocity, clamped to the arena.
pub fn move_player(world: &mut World, stats: &Stats, tuning: &PlayerTuning, dt: f32) {
    let bounds = world.bounds;
    let player = &mut world.player;

    let input = if player.input.length_squared() > 1.0 {
        physics::normalize_or_zero(player.input)
    } else {
        player.input
    };
    if input.length_squared() > 1e-6 {
        player.facing = input.y.atan2(input.x);
    }

    player.velocity = input * stats.move_speed + player.external_velocity;
    player.position = bounds.clamp(player.position + player.velocity * dt, player.radius());
    player.external_velocity *= tuning.external_decay.powf(dt * DECAY_FPS);
    if player.external_velocity.length_squared() < 1e-4 {
        player.external_velocity = Vec2::ZERO;
    }
}

/// Age and move free projectiles; bounce them off the arena walls while
/// they have bounces left and retire the rest.
pub fn advance_projectiles(world: &mut World, stats: &Stats, arena: &ArenaTuning, dt: f32) {
    let bounds = world.bounds;
    let mut retired = Vec::new();
    let mut bounced = 0;

    for (id, p) in world.projectiles.iter_mut() {
        if p.is_orbital() {
            continue;
        }
        if p.spent {
            retired.push(id);
            continue;
        }
        p.age += dt;
        if p.age >= p.lifetime {
            p.spent = true;
            retired.push(id);
            continue;
        }
        p.position += p.velocity * dt;

        if let Some(normal) = bounds.wall_normal(p.position) {
            if p.bounces > 0 {
                p.bounces -= 1;
                p.velocity = physics::reflect(p.velocity, normal, stats.restitution);
                p.position = bounds.clamp(p.position, 0.0);
                p.last_hit = None;
                bounced += 1;
            } else if !bounds.contains(p.position, arena.despawn_margin) {
                p.spent = true;
                retired.push(id);
            }
        }
    }

    world.tally.bounces += bounced;
    for id in retired {
        world.despawn(id);
    }
}

/// Steer every active enemy toward the player and integrate.
///
/// Knockback lives in the same velocity and bleeds back into the chase at
/// the steering rate.
pub fn steer_enemies(world: &mut World, steering: f32, dt: f32) {
    let target = world.player.position;
    let blend = (steering * dt).clamp(0.0, 1.0);
    for (_, enemy) in world.enemies.iter_mut() {
        if !enemy.is_active() {
            continue;
        }
        let (dir, _) = physics::direction(enemy.position, target);
        let desired = dir * enemy.speed;
        enemy.velocity = enemy.velocity.lerp(desired, blend);
        enemy.position += enemy.velocity * dt;
    }
}

/// Magnetise orbs in pickup range, home them in and collect on contact.
/// Returns the xp collected.
pub fn collect_orbs(world: &mut World, stats: &Stats, dt: f32) -> u32 {
    let center = world.player.position;
    let reach = world.player.radius() + COLLECT_SLACK;
    let mut collected = Vec::new();
    let mut xp = 0u32;

    for (id, orb) in world.orbs.iter_mut() {
        let d = orb.position.distance(center);
        if !orb.magnet && d <= stats.pickup_radius {
            orb.magnet = true;
        }
        if orb.magnet {
            let step = (stats.magnet_speed * dt).min(d);
            let (dir, _) = physics::direction(orb.position, center);
            orb.position += dir * step;
        }
        if orb.position.distance(center) <= reach {
            xp = xp.saturating_add(orb.value);
            collected.push(id);
        }
    }

    for id in collected {
        world.despawn(id);
    }
    xp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::components::{Projectile, Tier};
    use crate::tuning::{TierTuning, Tuning};

    fn stats() -> Stats {
        Stats {
            move_speed: 100.0,
            restitution: 0.5,
            pickup_radius: 50.0,
            magnet_speed: 400.0,
            ..Stats::default()
        }
    }

    #[test]
    fn test_player_moves_and_external_velocity_decays() {
        let mut world = World::default();
        world.player.input = Vec2::new(2.0, 0.0);
        world.player.external_velocity = Vec2::new(0.0, 100.0);
        let tuning = PlayerTuning::default();

        move_player(&mut world, &stats(), &tuning, 0.1);
        assert!((world.player.position.x - 10.0).abs() < 1e-4, "input is clamped to length 1");
        assert!(world.player.position.y > 0.0);
        assert!(world.player.external_velocity.y < 100.0);
    }

    #[test]
    fn test_player_stays_inside_bounds() {
        let mut world = World::default();
        world.player.external_velocity = Vec2::new(1.0e6, 0.0);
        move_player(&mut world, &stats(), &PlayerTuning::default(), 1.0);
        assert!(world.player.position.x <= world.bounds.half.x);
    }

    #[test]
    fn test_projectile_bounces_off_wall() {
        let mut world = World::default();
        let arena = Tuning::default().arena;
        let start = Vec2::new(world.bounds.half.x - 1.0, 0.0);
        let id = world.spawn_projectile(
            Projectile::bolt(start, Vec2::new(100.0, 0.0), 1.0, 1.0, 4.0, 100.0).with_budget(1, 1),
        );

        advance_projectiles(&mut world, &stats(), &arena, 0.1);
        let p = world.projectiles.get(id).unwrap();
        assert_eq!(p.bounces, 0);
        assert!(p.velocity.x < 0.0);
        assert_eq!(world.tally.bounces, 1);
    }

    #[test]
    fn test_projectile_expires() {
        let mut world = World::default();
        let arena = Tuning::default().arena;
        let id = world.spawn_projectile(Projectile::bolt(Vec2::ZERO, Vec2::X, 1.0, 1.0, 4.0, 0.5));
        advance_projectiles(&mut world, &stats(), &arena, 0.6);
        world.flush_despawns();
        assert!(!world.is_alive(id));
    }

    #[test]
    fn test_enemies_chase_player() {
        let mut world = World::default();
        let e = world.spawn_enemy(Vec2::new(100.0, 0.0), Tier::Small, &TierTuning::default());
        for _ in 0..30 {
            steer_enemies(&mut world, 4.0, 1.0 / 60.0);
        }
        assert!(world.enemies.get(e).unwrap().position.x < 100.0);
    }

    #[test]
    fn test_orbs_magnetise_and_collect() {
        let mut world = World::default();
        world.spawn_orb(Vec2::new(40.0, 0.0), 3);
        let far = world.spawn_orb(Vec2::new(500.0, 0.0), 5);

        let mut total = 0;
        for _ in 0..10 {
            total += collect_orbs(&mut world, &stats(), 0.05);
            world.flush_despawns();
        }
        assert_eq!(total, 3);
        assert!(!world.orbs.get(far).unwrap().magnet);
    }
}
