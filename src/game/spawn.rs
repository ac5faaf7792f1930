//! Spawn Director
//!
//! Decides when and what enemies enter the arena:
//! - a main timer against an interval ramped from start to end
//! - a weighted tier roll against a weight table ramped the same way;
//!   the table has no boss column, waves and formations top out at large
//! - an independent formation timer for clustered arrivals
//! - a one-shot boss trigger with a warning and a short delay
//! - the victory clock

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::components::Tier;
use super::entity::Entity;
use super::event::{BossSpawnedEvent, BossWarningEvent, Events};
use super::world::World;
use crate::tuning::{SpawnTuning, Tuning};

/// What the director did this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnReport {
    pub spawned: u32,
    pub boss: Option<Entity>,
    /// The session clock ran out this tick
    pub victory: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnDirector {
    spawn_timer: f32,
    formation_timer: f32,
    boss_triggered: bool,
    /// Where and in how long the announced boss appears
    boss_pending: Option<(Vec2, f32)>,
    boss_entity: Option<Entity>,
    victory: bool,
    /// Stage spawn multiplier
    rate: f32,
}

fn ramp(tuning: &SpawnTuning, time: f32) -> f32 {
    (time / tuning.ramp_duration.max(f32::EPSILON)).clamp(0.0, 1.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Seconds between regular spawn waves at `time`.
pub fn interval_at(tuning: &SpawnTuning, time: f32) -> f32 {
    lerp(tuning.interval_start, tuning.interval_end, ramp(tuning, time))
}

/// Enemies per regular wave at `time`, scaled by the stage rate.
pub fn count_at(tuning: &SpawnTuning, time: f32, rate: f32) -> u32 {
    let n = lerp(tuning.count_start, tuning.count_end, ramp(tuning, time)) * rate;
    n.round().max(1.0) as u32
}

/// Tier weights (small, medium, large) at `time`.
pub fn weights_at(tuning: &SpawnTuning, time: f32) -> [f32; 3] {
    let t = ramp(tuning, time);
    let mut w = [0.0; 3];
    for (i, slot) in w.iter_mut().enumerate() {
        *slot = lerp(tuning.weights_early[i], tuning.weights_late[i], t);
    }
    w
}

/// Weighted roll over small, medium and large; falls back to small when
/// every weight is zero. Never yields a boss.
pub fn roll_tier<R: Rng + ?Sized>(rng: &mut R, weights: &[f32; 3]) -> Tier {
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return Tier::Small;
    }
    let mut roll = rng.gen_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        if roll < *w {
            return Tier::from_index(i).unwrap_or(Tier::Small);
        }
        roll -= w;
    }
    // Float leftovers land on the last non-zero tier
    weights
        .iter()
        .rposition(|w| *w > 0.0)
        .and_then(Tier::from_index)
        .unwrap_or(Tier::Small)
}

impl SpawnDirector {
    pub fn new(rate: f32) -> Self {
        Self {
            spawn_timer: 0.0,
            formation_timer: 0.0,
            boss_triggered: false,
            boss_pending: None,
            boss_entity: None,
            victory: false,
            rate: if rate > 0.0 { rate } else { 1.0 },
        }
    }

    pub fn boss_triggered(&self) -> bool {
        self.boss_triggered
    }

    pub fn boss(&self) -> Option<Entity> {
        self.boss_entity
    }

    pub fn update<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        tuning: &Tuning,
        rng: &mut R,
        events: &mut Events,
        time: f32,
        dt: f32,
    ) -> SpawnReport {
        let s = &tuning.spawn;
        let mut report = SpawnReport::default();
        let margin = tuning.arena.spawn_margin;

        // Regular waves
        self.spawn_timer += dt;
        let interval = interval_at(s, time);
        if self.spawn_timer >= interval {
            self.spawn_timer -= interval;
            let weights = weights_at(s, time);
            for _ in 0..count_at(s, time, self.rate) {
                if world.active_enemy_count() >= s.max_enemies {
                    break;
                }
                let tier = roll_tier(rng, &weights);
                let position = world.bounds.random_edge_point(rng, margin);
                world.spawn_enemy(position, tier, tuning.tier(tier));
                report.spawned += 1;
            }
        }

        // Formations
        self.formation_timer += dt;
        if self.formation_timer >= s.formation_interval {
            self.formation_timer -= s.formation_interval;
            let tier = roll_tier(rng, &weights_at(s, time));
            let anchor = world.bounds.random_edge_point(rng, margin);
            let size = s.formation_size.max(1);
            for i in 0..size {
                if world.active_enemy_count() >= s.max_enemies {
                    break;
                }
                let angle = TAU * i as f32 / size as f32;
                let position = anchor + Vec2::from_angle(angle) * s.formation_radius;
                world.spawn_enemy(position, tier, tuning.tier(tier));
                report.spawned += 1;
            }
        }

        // Boss: announce once, then spawn after the delay
        if !self.boss_triggered && time >= s.boss_time {
            self.boss_triggered = true;
            let position = world.bounds.random_edge_point(rng, margin);
            events.boss_warning.send(BossWarningEvent {
                position,
                delay: s.boss_delay,
            });
            self.boss_pending = Some((position, s.boss_delay));
            log::info!("boss incoming at {:.1}s", time);
        }
        if let Some((position, remaining)) = self.boss_pending {
            let remaining = remaining - dt;
            if remaining <= 0.0 {
                self.boss_pending = None;
                let boss = world.spawn_enemy(position, Tier::Boss, tuning.tier(Tier::Boss));
                events.boss_spawned.send(BossSpawnedEvent { entity: boss, position });
                self.boss_entity = Some(boss);
                report.boss = Some(boss);
                report.spawned += 1;
            } else {
                self.boss_pending = Some((position, remaining));
            }
        }

        if !self.victory && time >= s.session_duration {
            self.victory = true;
            report.victory = true;
            log::info!("session clock reached {:.0}s", s.session_duration);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_interval_non_increasing_then_constant() {
        let s = SpawnTuning::default();
        let mut prev = f32::MAX;
        let mut t = 0.0;
        while t <= s.ramp_duration {
            let i = interval_at(&s, t);
            assert!(i <= prev, "interval rose at t={t}");
            prev = i;
            t += 1.0;
        }
        let capped = interval_at(&s, s.ramp_duration);
        for t in [s.ramp_duration + 1.0, s.ramp_duration * 2.0, 1.0e6] {
            assert_eq!(interval_at(&s, t), capped);
        }
    }

    #[test]
    fn test_no_large_or_boss_at_start() {
        let s = SpawnTuning::default();
        let w = weights_at(&s, 0.0);
        assert_eq!(w[Tier::Large.index()], 0.0);

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            assert!(roll_tier(&mut rng, &w) < Tier::Large);
        }
    }

    #[test]
    fn test_late_weights_favour_heavier_tiers() {
        let s = SpawnTuning::default();
        let early = weights_at(&s, 0.0);
        let late = weights_at(&s, s.ramp_duration);
        assert!(late[Tier::Large.index()] > early[Tier::Large.index()]);
        assert!(late[Tier::Small.index()] < early[Tier::Small.index()]);
        let heaviest = (0..3).max_by(|a, b| late[*a].total_cmp(&late[*b]));
        assert_eq!(heaviest, Some(Tier::Large.index()));
    }

    #[test]
    fn test_roll_tier_all_zero_falls_back() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(roll_tier(&mut rng, &[0.0; 3]), Tier::Small);
        assert_eq!(roll_tier(&mut rng, &[0.0, 0.0, 1.0]), Tier::Large);
    }

    #[test]
    fn test_exactly_one_boss() {
        let mut tuning = Tuning::default();
        tuning.spawn.max_enemies = usize::MAX;
        let mut world = World::default();
        let mut events = Events::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut director = SpawnDirector::new(1.0);

        // Past the end of the ramp and the boss trigger, with every
        // wave and formation kept alive
        let dt = 0.1;
        let mut time = 0.0;
        while time < tuning.spawn.session_duration {
            time += dt;
            director.update(&mut world, &tuning, &mut rng, &mut events, time, dt);
        }

        assert!(time > tuning.spawn.boss_time + tuning.spawn.boss_delay);
        assert!(director.boss_triggered());
        assert_eq!(events.boss_warning.len(), 1);
        assert_eq!(events.boss_spawned.len(), 1);
        let bosses = world.enemies.iter().filter(|(_, e)| e.tier == Tier::Boss).count();
        assert_eq!(bosses, 1);
        assert!(director.boss().is_some());
    }

    #[test]
    fn test_boss_waits_for_delay() {
        let mut tuning = Tuning::default();
        tuning.spawn.boss_time = 0.0;
        tuning.spawn.boss_delay = 1.0;
        let mut world = World::default();
        let mut events = Events::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut director = SpawnDirector::new(1.0);

        let r = director.update(&mut world, &tuning, &mut rng, &mut events, 0.25, 0.25);
        assert!(r.boss.is_none());
        assert_eq!(events.boss_warning.len(), 1);
        for _ in 0..4 {
            director.update(&mut world, &tuning, &mut rng, &mut events, 0.5, 0.25);
        }
        assert_eq!(events.boss_spawned.len(), 1);
    }

    #[test]
    fn test_victory_fires_once() {
        let mut tuning = Tuning::default();
        tuning.spawn.session_duration = 1.0;
        let mut world = World::default();
        let mut events = Events::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mut director = SpawnDirector::new(1.0);

        let a = director.update(&mut world, &tuning, &mut rng, &mut events, 0.5, 0.5);
        let b = director.update(&mut world, &tuning, &mut rng, &mut events, 1.0, 0.5);
        let c = director.update(&mut world, &tuning, &mut rng, &mut events, 1.5, 0.5);
        assert!(!a.victory && b.victory && !c.victory);
    }

    #[test]
    fn test_respects_enemy_cap() {
        let mut tuning = Tuning::default();
        tuning.spawn.max_enemies = 3;
        tuning.spawn.count_start = 10.0;
        let mut world = World::default();
        let mut events = Events::new();
        let mut rng = StdRng::seed_from_u64(9);
        let mut director = SpawnDirector::new(1.0);
        director.update(&mut world, &tuning, &mut rng, &mut events, 2.0, 2.0);
        assert_eq!(world.active_enemy_count(), 3);
    }
}
