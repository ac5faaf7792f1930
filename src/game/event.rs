//! Event System
//!
//! The simulation never draws or plays sounds. Whenever something worth
//! showing happens it pushes one event into a typed queue; the
//! presentation side drains the queues once per frame and owns all
//! timing from there on.
//!
//! Example flow:
//! 1. Resolver kills an enemy in cleanup → sends KillEvent
//! 2. Combo tracker crosses a threshold → sends KillStreakEvent
//! 3. Presenter reads both → spawns particles, flashes the streak banner

use glam::Vec2;

use super::components::Tier;
use super::entity::Entity;
use super::skills::SkillId;

/// A queue for events of a single type.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn send(&mut self, event: T) {
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }

    /// Drain all events (returns iterator and clears queue)
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Container for all simulation events.
#[derive(Debug, Default)]
pub struct Events {
    pub kill: EventQueue<KillEvent>,
    /// Several kills landing in the same tick
    pub kill_tier: EventQueue<KillTierEvent>,
    pub kill_streak: EventQueue<KillStreakEvent>,
    pub knockback: EventQueue<KnockbackEvent>,
    pub shake: EventQueue<ShakeEvent>,
    /// Area effects going off (pulse, hazard, escape burst...)
    pub burst: EventQueue<BurstEvent>,
    pub beam: EventQueue<BeamEvent>,
    pub merge: EventQueue<MergeEvent>,
    pub absorbed: EventQueue<AbsorbedEvent>,
    pub player_damaged: EventQueue<PlayerDamagedEvent>,
    pub boss_warning: EventQueue<BossWarningEvent>,
    pub boss_spawned: EventQueue<BossSpawnedEvent>,
    pub level_up: EventQueue<LevelUpEvent>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all event queues. Call at end of frame.
    pub fn clear_all(&mut self) {
        self.kill.clear();
        self.kill_tier.clear();
        self.kill_streak.clear();
        self.knockback.clear();
        self.shake.clear();
        self.burst.clear();
        self.beam.clear();
        self.merge.clear();
        self.absorbed.clear();
        self.player_damaged.clear();
        self.boss_warning.clear();
        self.boss_spawned.clear();
        self.level_up.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.kill.is_empty()
            && self.kill_tier.is_empty()
            && self.kill_streak.is_empty()
            && self.knockback.is_empty()
            && self.shake.is_empty()
            && self.burst.is_empty()
            && self.beam.is_empty()
            && self.merge.is_empty()
            && self.absorbed.is_empty()
            && self.player_damaged.is_empty()
            && self.boss_warning.is_empty()
            && self.boss_spawned.is_empty()
            && self.level_up.is_empty()
    }
}

// =============================================================================
// Event Types
// =============================================================================

/// An enemy died and its reward was handed out
#[derive(Debug, Clone, Copy)]
pub struct KillEvent {
    pub entity: Entity,
    pub position: Vec2,
    pub tier: Tier,
    pub score: u32,
}

/// Multi-kill inside one tick: tier 1 = double, 2 = triple, 3 = 5+
#[derive(Debug, Clone, Copy)]
pub struct KillTierEvent {
    /// Centroid of the kills
    pub position: Vec2,
    pub count: u32,
    pub tier: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct KillStreakEvent {
    pub streak: u32,
    /// Index into the combo threshold table
    pub tier: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct KnockbackEvent {
    pub position: Vec2,
    pub direction: Vec2,
    /// Impulse magnitude
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ShakeEvent {
    /// 0..1
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct BurstEvent {
    pub position: Vec2,
    pub radius: f32,
    pub skill: Option<SkillId>,
}

/// Current beam links, sent every tick the beam is live
#[derive(Debug, Clone)]
pub struct BeamEvent {
    pub points: Vec<Vec2>,
}

#[derive(Debug, Clone, Copy)]
pub struct MergeEvent {
    pub merged: Entity,
    pub position: Vec2,
    pub tier: Tier,
}

#[derive(Debug, Clone, Copy)]
pub struct AbsorbedEvent {
    pub entity: Entity,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerDamagedEvent {
    pub amount: f32,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy)]
pub struct BossWarningEvent {
    /// Where the boss will appear
    pub position: Vec2,
    pub delay: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct BossSpawnedEvent {
    pub entity: Entity,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy)]
pub struct LevelUpEvent {
    pub level: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_queue() {
        let mut queue: EventQueue<i32> = EventQueue::new();

        queue.send(1);
        queue.send(2);
        queue.send(3);

        assert_eq!(queue.len(), 3);

        let collected: Vec<_> = queue.drain().collect();
        assert_eq!(collected, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_events_container() {
        let mut events = Events::new();

        events.kill.send(KillEvent {
            entity: Entity::default(),
            position: Vec2::ZERO,
            tier: Tier::Small,
            score: 10,
        });
        events.shake.send(ShakeEvent { intensity: 0.5 });

        assert_eq!(events.kill.len(), 1);
        assert!(!events.is_empty());

        events.clear_all();
        assert!(events.is_empty());
    }
}
