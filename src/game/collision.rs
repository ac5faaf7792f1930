//! Collision & Physics Resolver
//!
//! Contact checks between the arena's circles:
//! - projectile vs enemy: damage, mass-scaled knockback, pierce and bounce
//! - enemy vs enemy: sustained contact between compatible tiers merges them
//! - player vs enemy: per-tick contact damage unless invulnerable
//! - deaths: the single place kill rewards are handed out
//!
//! Nothing is removed here directly. Records are marked (`spent`, `merged`,
//! `dead`) and queued on the world's despawn list.

use glam::Vec2;
use std::collections::{HashMap, HashSet};

use super::components::{Enemy, Tier};
use super::entity::Entity;
use super::event::{Events, KillEvent, KnockbackEvent, MergeEvent, PlayerDamagedEvent, ShakeEvent};
use super::physics;
use super::skills::{DamageQuery, SkillEngine};
use super::stats::Stats;
use super::world::{DeathRecord, HitRecord, World};
use crate::tuning::Tuning;

/// Contact state that has to survive between ticks.
#[derive(Debug, Default)]
pub struct Resolver {
    /// Seconds each compatible pair has been touching, keyed low id first
    contact_timers: HashMap<(Entity, Entity), f32>,
    /// Player was touching an enemy last tick
    touching: bool,
}

fn pair_key(a: Entity, b: Entity) -> (Entity, Entity) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Tier a merged body of `mass` belongs to: never below either parent and
/// never promoted past large.
fn merged_tier(tuning: &Tuning, mass: f32, a: Tier, b: Tier) -> Tier {
    let by_mass = if mass >= tuning.enemies.large.mass {
        Tier::Large
    } else if mass >= tuning.enemies.medium.mass {
        Tier::Medium
    } else {
        Tier::Small
    };
    by_mass.max(a).max(b).min(Tier::Large)
}

/// Combine two enemies into a new record. Mass is summed, health is at most
/// the sum, position and velocity are mass-weighted.
pub fn merge_enemies(tuning: &Tuning, a: &Enemy, b: &Enemy) -> Enemy {
    let ma = physics::guard_mass(a.mass);
    let mb = physics::guard_mass(b.mass);
    let mass = ma + mb;
    let tier = merged_tier(tuning, mass, a.tier, b.tier);

    let mut merged = Enemy::new(
        (a.position * ma + b.position * mb) / mass,
        tier,
        a.health.max(0.0) + b.health.max(0.0),
        mass,
        (a.size * a.size + b.size * b.size).sqrt(),
        tuning.tier(tier).speed,
    );
    merged.max_health = a.max_health + b.max_health;
    merged.velocity = (a.velocity * ma + b.velocity * mb) / mass;
    merged
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.contact_timers.clear();
        self.touching = false;
    }

    /// Free projectiles against active enemies. Returns the number of hits.
    ///
    /// Hits are recorded on `world.hits` for the on-hit skills.
    pub fn resolve_projectiles(
        &mut self,
        world: &mut World,
        stats: &Stats,
        engine: &SkillEngine,
        events: &mut Events,
    ) -> u32 {
        let targets: Vec<(Entity, Vec2, Vec2, f32)> = world
            .enemies
            .iter()
            .filter(|(_, e)| e.is_active())
            .map(|(id, e)| (id, e.position, e.velocity, e.radius()))
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let mut hits = 0;
        for pid in world.projectiles.ids() {
            let Some(p) = world.projectiles.get(pid) else {
                continue;
            };
            if p.spent || p.is_orbital() {
                continue;
            }

            let mut contacts: Vec<(Entity, Vec2, Vec2, f32)> = targets
                .iter()
                .filter(|(id, ..)| p.last_hit != Some(*id))
                .filter_map(|&(id, pos, vel, r)| {
                    let d = pos.distance(p.position);
                    (d < r + p.radius()).then_some((id, pos, vel, d))
                })
                .collect();
            contacts.sort_by(|a, b| a.3.total_cmp(&b.3));

            for (eid, epos, evel, _) in contacts {
                // Killed earlier in this pass
                if !world.enemies.get(eid).is_some_and(|e| e.is_active()) {
                    continue;
                }
                let Some(p) = world.projectiles.get(pid) else {
                    break;
                };
                let query = DamageQuery {
                    player_position: world.player.position,
                    player_velocity: world.player.velocity,
                    target_position: epos,
                    target_velocity: evel,
                };
                let damage = p.current_damage(stats.pierce_decay) * engine.damage_multiplier(stats, &query);
                let force = stats.knockback_force * physics::guard_mass(p.mass);
                let point = p.position;

                world.damage_enemy(eid, damage);
                let (dir, _) = physics::direction(point, epos);
                let impulse = world.push_enemy(eid, dir, force);
                events.knockback.send(KnockbackEvent {
                    position: epos,
                    direction: dir,
                    intensity: impulse.length(),
                });
                world.hits.push(HitRecord {
                    target: eid,
                    point,
                    damage,
                });
                hits += 1;

                let Some(p) = world.projectiles.get_mut(pid) else {
                    break;
                };
                p.last_hit = Some(eid);
                p.hops += 1;
                p.pierce = p.pierce.saturating_sub(1);
                if p.pierce > 0 {
                    world.tally.pierces += 1;
                    continue;
                }
                if p.bounces > 0 {
                    // Glance off the target and keep one more hit in reserve
                    p.bounces -= 1;
                    p.pierce = 1;
                    p.velocity = physics::reflect(p.velocity, -dir, stats.restitution);
                    world.tally.bounces += 1;
                    break;
                }
                p.spent = true;
                world.despawn(pid);
                break;
            }
        }
        hits
    }

    /// Merge compatible enemies that have touched for long enough.
    /// Returns the number of merges.
    pub fn resolve_merges(&mut self, world: &mut World, tuning: &Tuning, events: &mut Events, dt: f32) -> u32 {
        let candidates: Vec<(Entity, Vec2, f32, Tier)> = world
            .enemies
            .iter()
            .filter(|(_, e)| e.is_active() && matches!(e.tier, Tier::Small | Tier::Medium))
            .map(|(id, e)| (id, e.position, e.radius(), e.tier))
            .collect();

        let mut touching = HashSet::new();
        let mut ready = Vec::new();
        for (i, &(a, pa, ra, ta)) in candidates.iter().enumerate() {
            for &(b, pb, rb, tb) in &candidates[i + 1..] {
                if !ta.can_merge_with(tb) || pa.distance(pb) >= ra + rb {
                    continue;
                }
                let key = pair_key(a, b);
                touching.insert(key);
                let timer = self.contact_timers.entry(key).or_insert(0.0);
                *timer += dt;
                if *timer >= tuning.enemies.merge_contact_time {
                    ready.push(key);
                }
            }
        }
        self.contact_timers.retain(|key, _| touching.contains(key));

        let mut consumed = HashSet::new();
        let mut merges = 0;
        for (a, b) in ready {
            if consumed.contains(&a) || consumed.contains(&b) {
                continue;
            }
            let (Some(ea), Some(eb)) = (world.enemies.get(a), world.enemies.get(b)) else {
                continue;
            };
            if !ea.is_active() || !eb.is_active() {
                continue;
            }
            let merged = merge_enemies(tuning, ea, eb);
            let (position, tier) = (merged.position, merged.tier);

            // Both originals leave in the same step
            for id in [a, b] {
                if let Some(e) = world.enemies.get_mut(id) {
                    e.merged = true;
                }
                world.despawn(id);
                consumed.insert(id);
            }
            self.contact_timers.remove(&(a, b));

            let id = world.insert_enemy(merged);
            world.tally.merges += 1;
            events.merge.send(MergeEvent {
                merged: id,
                position,
                tier,
            });
            log::debug!("merged {} + {} into {} ({})", a, b, id, tier.label());
            merges += 1;
        }
        merges
    }

    /// Contact damage on the player from every overlapping enemy, plus a
    /// small push on each. Returns the damage taken this tick.
    pub fn resolve_player_contact(&mut self, world: &mut World, tuning: &Tuning, events: &mut Events) -> f32 {
        if world.player.invulnerable {
            self.touching = false;
            return 0.0;
        }

        let center = world.player.position;
        let reach = world.player.radius();
        let overlapping: Vec<(Entity, Vec2)> = world
            .enemies
            .iter()
            .filter(|(_, e)| e.is_active() && e.position.distance(center) < reach + e.radius())
            .map(|(id, e)| (id, e.position))
            .collect();

        if overlapping.is_empty() {
            self.touching = false;
            return 0.0;
        }

        let per_enemy = tuning.player.contact_damage;
        let damage = per_enemy * overlapping.len() as f32;
        for (id, position) in overlapping {
            let (dir, _) = physics::direction(center, position);
            world.push_enemy(id, dir, tuning.player.contact_knockback);
        }

        world.player.health -= damage;
        world.tally.damage_taken += damage;
        events.player_damaged.send(PlayerDamagedEvent {
            amount: damage,
            position: center,
        });
        if !self.touching {
            events.shake.send(ShakeEvent {
                intensity: tuning.feel.shake_player_hit,
            });
        }
        self.touching = true;
        damage
    }

    /// Hand out the reward for every enemy that died this tick: one orb,
    /// one kill event, one despawn. Merged and already-dead enemies are
    /// skipped, so each enemy pays out exactly once.
    pub fn process_deaths(&mut self, world: &mut World, tuning: &Tuning, events: &mut Events) -> Vec<DeathRecord> {
        let mut deaths = Vec::new();
        for (id, enemy) in world.enemies.iter_mut() {
            if enemy.dead || enemy.merged || enemy.health > 0.0 {
                continue;
            }
            enemy.dead = true;
            deaths.push(DeathRecord {
                entity: id,
                position: enemy.position,
                tier: enemy.tier,
            });
        }

        for death in &deaths {
            let rewards = tuning.tier(death.tier);
            world.spawn_orb(death.position, rewards.orb_value);
            world.despawn(death.entity);
            events.kill.send(KillEvent {
                entity: death.entity,
                position: death.position,
                tier: death.tier,
                score: rewards.score,
            });
        }
        deaths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::components::Projectile;
    use crate::tuning::TierTuning;
    use approx::assert_relative_eq;

    fn stats() -> Stats {
        Stats {
            damage_mult: 1.0,
            knockback_force: 100.0,
            pierce_decay: 0.25,
            restitution: 0.5,
            ..Stats::default()
        }
    }

    fn enemy(world: &mut World, position: Vec2, health: f32) -> Entity {
        let tuning = TierTuning {
            health,
            ..TierTuning::default()
        };
        world.spawn_enemy(position, Tier::Small, &tuning)
    }

    #[test]
    fn test_knockback_decreases_with_mass() {
        let mut prev = f32::MAX;
        for mass in [0.5, 1.0, 2.0, 5.0, 40.0] {
            let mut world = World::default();
            let e = world.spawn_enemy(
                Vec2::new(5.0, 0.0),
                Tier::Small,
                &TierTuning {
                    mass,
                    health: 1.0e6,
                    ..TierTuning::default()
                },
            );
            world.spawn_projectile(Projectile::bolt(Vec2::ZERO, Vec2::X, 1.0, 1.0, 10.0, 1.0));
            let mut resolver = Resolver::new();
            resolver.resolve_projectiles(&mut world, &stats(), &SkillEngine::new(), &mut Events::new());

            let speed = world.enemies.get(e).unwrap().velocity.length();
            assert!(speed < prev, "mass {mass} was pushed harder than a lighter enemy");
            prev = speed;
        }
    }

    #[test]
    fn test_coincident_hit_stays_finite() {
        let mut world = World::default();
        let e = enemy(&mut world, Vec2::ZERO, 100.0);
        world.spawn_projectile(Projectile::bolt(Vec2::ZERO, Vec2::X, 5.0, 1.0, 10.0, 1.0));
        Resolver::new().resolve_projectiles(&mut world, &stats(), &SkillEngine::new(), &mut Events::new());
        let v = world.enemies.get(e).unwrap().velocity;
        assert!(v.is_finite());
        assert!(v.length() > 0.0);
    }

    #[test]
    fn test_pierce_two_full_then_decayed_then_destroyed() {
        let mut world = World::default();
        let a = enemy(&mut world, Vec2::new(1.0, 0.0), 100.0);
        let b = enemy(&mut world, Vec2::new(3.0, 0.0), 100.0);
        let c = enemy(&mut world, Vec2::new(5.0, 0.0), 100.0);
        let p = world.spawn_projectile(
            Projectile::bolt(Vec2::ZERO, Vec2::X, 20.0, 1.0, 10.0, 1.0).with_budget(2, 0),
        );
        let mut events = Events::new();

        let hits = Resolver::new().resolve_projectiles(&mut world, &stats(), &SkillEngine::new(), &mut events);
        assert_eq!(hits, 2);
        assert_eq!(world.enemies.get(a).unwrap().health, 80.0);
        assert_eq!(world.enemies.get(b).unwrap().health, 85.0);
        assert_eq!(world.enemies.get(c).unwrap().health, 100.0);
        assert!(world.projectiles.get(p).unwrap().spent);
        assert_eq!(world.tally.pierces, 1);
        assert_eq!(world.hits.len(), 2);
        assert_eq!(events.knockback.len(), 2);

        world.flush_despawns();
        assert!(!world.is_alive(p));
    }

    #[test]
    fn test_bounce_reserves_another_hit() {
        let mut world = World::default();
        enemy(&mut world, Vec2::new(5.0, 0.0), 100.0);
        let p = world.spawn_projectile(
            Projectile::bolt(Vec2::ZERO, Vec2::new(100.0, 0.0), 10.0, 1.0, 10.0, 1.0).with_budget(1, 1),
        );
        Resolver::new().resolve_projectiles(&mut world, &stats(), &SkillEngine::new(), &mut Events::new());
        let proj = world.projectiles.get(p).unwrap();
        assert!(!proj.spent);
        assert_eq!(proj.bounces, 0);
        assert!(proj.velocity.x < 0.0, "reflected off the target");
    }

    #[test]
    fn test_merge_invariant() {
        let tuning = Tuning::default();
        let mut a = Enemy::new(Vec2::ZERO, Tier::Small, 12.0, 1.0, 24.0, 95.0);
        let b = Enemy::new(Vec2::new(10.0, 0.0), Tier::Small, 20.0, 3.0, 24.0, 95.0);
        a.max_health = 20.0;
        let m = merge_enemies(&tuning, &a, &b);
        assert_eq!(m.mass, a.mass + b.mass);
        assert!(m.health <= a.health + b.health);
        assert_relative_eq!(m.position.x, 7.5, epsilon = 1e-5);
        assert_eq!(m.tier, Tier::Medium);
        assert!(m.size > a.size);
    }

    #[test]
    fn test_merge_needs_sustained_contact() {
        let mut tuning = Tuning::default();
        tuning.enemies.merge_contact_time = 0.5;
        let mut world = World::default();
        let a = enemy(&mut world, Vec2::ZERO, 20.0);
        let b = enemy(&mut world, Vec2::new(10.0, 0.0), 20.0);
        let mut resolver = Resolver::new();
        let mut events = Events::new();

        assert_eq!(resolver.resolve_merges(&mut world, &tuning, &mut events, 0.25), 0);
        assert_eq!(resolver.resolve_merges(&mut world, &tuning, &mut events, 0.25), 1);
        assert!(world.enemies.get(a).unwrap().merged);
        assert!(world.enemies.get(b).unwrap().merged);
        assert_eq!(world.tally.merges, 1);
        assert_eq!(events.merge.len(), 1);

        world.flush_despawns();
        assert_eq!(world.enemies.count(), 1);
        let (_, merged) = world.enemies.iter().next().unwrap();
        assert_eq!(merged.mass, 2.0);
        assert_eq!(merged.health, 40.0);

        // Merged originals are not kills
        assert!(resolver.process_deaths(&mut world, &tuning, &mut events).is_empty());
    }

    #[test]
    fn test_separated_pair_resets_timer() {
        let mut tuning = Tuning::default();
        tuning.enemies.merge_contact_time = 0.5;
        let mut world = World::default();
        let a = enemy(&mut world, Vec2::ZERO, 20.0);
        enemy(&mut world, Vec2::new(10.0, 0.0), 20.0);
        let mut resolver = Resolver::new();
        let mut events = Events::new();

        resolver.resolve_merges(&mut world, &tuning, &mut events, 0.4);
        world.enemies.get_mut(a).unwrap().position = Vec2::new(-500.0, 0.0);
        resolver.resolve_merges(&mut world, &tuning, &mut events, 0.4);
        world.enemies.get_mut(a).unwrap().position = Vec2::ZERO;
        assert_eq!(resolver.resolve_merges(&mut world, &tuning, &mut events, 0.4), 0);
    }

    #[test]
    fn test_large_enemies_never_merge() {
        let tuning = Tuning::default();
        let mut world = World::default();
        world.spawn_enemy(Vec2::ZERO, Tier::Large, &tuning.enemies.large);
        world.spawn_enemy(Vec2::new(5.0, 0.0), Tier::Large, &tuning.enemies.large);
        let mut resolver = Resolver::new();
        assert_eq!(resolver.resolve_merges(&mut world, &tuning, &mut Events::new(), 10.0), 0);
    }

    #[test]
    fn test_contact_damage_stacks_and_respects_invulnerability() {
        let tuning = Tuning::default();
        let mut world = World::default();
        enemy(&mut world, Vec2::new(5.0, 0.0), 20.0);
        enemy(&mut world, Vec2::new(-5.0, 0.0), 20.0);
        let mut resolver = Resolver::new();
        let mut events = Events::new();

        let taken = resolver.resolve_player_contact(&mut world, &tuning, &mut events);
        assert_relative_eq!(taken, 2.0 * tuning.player.contact_damage);
        assert_eq!(events.player_damaged.len(), 1);
        assert_eq!(events.shake.len(), 1);

        resolver.resolve_player_contact(&mut world, &tuning, &mut events);
        assert_eq!(events.shake.len(), 1, "shake only when contact starts");

        world.player.invulnerable = true;
        let health = world.player.health;
        assert_eq!(resolver.resolve_player_contact(&mut world, &tuning, &mut events), 0.0);
        assert_eq!(world.player.health, health);
    }

    #[test]
    fn test_each_death_rewards_once() {
        let tuning = Tuning::default();
        let mut world = World::default();
        let e = enemy(&mut world, Vec2::new(30.0, 0.0), 10.0);
        world.damage_enemy(e, 50.0);
        let mut resolver = Resolver::new();
        let mut events = Events::new();

        let first = resolver.process_deaths(&mut world, &tuning, &mut events);
        let second = resolver.process_deaths(&mut world, &tuning, &mut events);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(events.kill.len(), 1);
        assert_eq!(world.orbs.count(), 1);

        world.flush_despawns();
        assert!(!world.is_alive(e));
    }
}
