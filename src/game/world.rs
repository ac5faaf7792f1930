//! Simulation World
//!
//! The World holds every entity collection of a run:
//! - one id allocator shared by all collections
//! - a generation-checked storage per record type
//! - a deferred despawn queue, flushed once at the end of the tick
//!
//! Systems never remove records while walking a collection. They mark
//! (`spent`, `dead`, `merged`) or queue a despawn, and the cleanup pass
//! frees the slots. Ids therefore stay valid for the whole tick, which is
//! what the skills' id-keyed cooldown maps and hit sets rely on.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::component::ComponentStorage;
use super::components::*;
use super::entity::{Entity, EntityAllocator};
use super::gravity::GravityField;
use super::physics;
use super::present::{VisualHandle, VisualKind};
use crate::catalog::CharacterMultipliers;
use crate::tuning::TierTuning;

/// Axis-aligned playfield centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub half: Vec2,
}

impl Bounds {
    pub fn new(half_width: f32, half_height: f32) -> Self {
        Self {
            half: Vec2::new(half_width, half_height),
        }
    }

    pub fn contains(&self, p: Vec2, margin: f32) -> bool {
        p.x.abs() <= self.half.x + margin && p.y.abs() <= self.half.y + margin
    }

    /// Clamp a circle of `radius` inside the bounds.
    pub fn clamp(&self, p: Vec2, radius: f32) -> Vec2 {
        let limit = (self.half - Vec2::splat(radius)).max(Vec2::ZERO);
        p.clamp(-limit, limit)
    }

    /// Random point on the rectangle `margin` outside the edge.
    pub fn random_edge_point<R: Rng + ?Sized>(&self, rng: &mut R, margin: f32) -> Vec2 {
        let h = self.half + Vec2::splat(margin);
        match rng.gen_range(0..4) {
            0 => Vec2::new(rng.gen_range(-h.x..=h.x), h.y),
            1 => Vec2::new(rng.gen_range(-h.x..=h.x), -h.y),
            2 => Vec2::new(h.x, rng.gen_range(-h.y..=h.y)),
            _ => Vec2::new(-h.x, rng.gen_range(-h.y..=h.y)),
        }
    }

    /// Outward normal of the wall `p` has crossed, if any.
    pub fn wall_normal(&self, p: Vec2) -> Option<Vec2> {
        if p.x > self.half.x {
            Some(Vec2::NEG_X)
        } else if p.x < -self.half.x {
            Some(Vec2::X)
        } else if p.y > self.half.y {
            Some(Vec2::NEG_Y)
        } else if p.y < -self.half.y {
            Some(Vec2::Y)
        } else {
            None
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(900.0, 600.0)
    }
}

/// Aggregate physics numbers for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsTally {
    pub total_impulse: f32,
    pub knockbacks: u32,
    pub merges: u32,
    pub absorbed: u32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub projectiles_fired: u32,
    pub bounces: u32,
    pub pierces: u32,
    pub peak_enemies: u32,
}

/// A projectile hit recorded this tick, consumed by on-hit skills.
#[derive(Debug, Clone, Copy)]
pub struct HitRecord {
    pub target: Entity,
    pub point: Vec2,
    pub damage: f32,
}

/// An enemy death processed in cleanup, handed to on-death skills.
#[derive(Debug, Clone, Copy)]
pub struct DeathRecord {
    pub entity: Entity,
    pub position: Vec2,
    pub tier: Tier,
}

/// The simulation world containing all entities of a run.
pub struct World {
    entities: EntityAllocator,

    /// Entities queued for despawn at end of tick
    despawn_queue: Vec<Entity>,

    pub player: Player,
    pub bounds: Bounds,
    pub field: Option<GravityField>,

    pub enemies: ComponentStorage<Enemy>,
    pub projectiles: ComponentStorage<Projectile>,
    pub orbs: ComponentStorage<Orb>,
    pub hazards: ComponentStorage<Hazard>,

    /// Presenter handle per entity
    pub visuals: ComponentStorage<VisualHandle>,
    /// Player visual (the player is not an arena entity)
    pub player_visual: Option<VisualHandle>,

    /// Spawned since the last presentation sync
    spawn_log: Vec<(Entity, VisualKind)>,
    /// Handles whose entity is gone, waiting for the presenter
    released_visuals: Vec<VisualHandle>,

    /// Projectile hits of the current tick
    pub hits: Vec<HitRecord>,
    pub tally: PhysicsTally,
}

impl World {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            entities: EntityAllocator::new(),
            despawn_queue: Vec::new(),
            player: Player::new(Vec2::ZERO, 100.0, 28.0, CharacterMultipliers::default()),
            bounds,
            field: None,
            enemies: ComponentStorage::new(),
            projectiles: ComponentStorage::new(),
            orbs: ComponentStorage::new(),
            hazards: ComponentStorage::new(),
            visuals: ComponentStorage::new(),
            player_visual: None,
            spawn_log: Vec::new(),
            released_visuals: Vec::new(),
            hits: Vec::new(),
            tally: PhysicsTally::default(),
        }
    }

    /// Drop every entity and counter in one step.
    ///
    /// Visual handles of the dropped entities are kept for the presenter
    /// to release on its next sync.
    pub fn clear(&mut self) {
        let handles: Vec<VisualHandle> = self.visuals.iter().map(|(_, h)| *h).collect();
        self.released_visuals.extend(handles);

        self.entities.clear();
        self.despawn_queue.clear();
        self.enemies.clear();
        self.projectiles.clear();
        self.orbs.clear();
        self.hazards.clear();
        self.visuals.clear();
        self.spawn_log.clear();
        self.hits.clear();
        self.tally = PhysicsTally::default();
        self.field = None;
    }

    // =========================================================================
    // Entity Management
    // =========================================================================

    pub fn spawn_enemy(&mut self, position: Vec2, tier: Tier, tuning: &TierTuning) -> Entity {
        let enemy = Enemy::new(
            position,
            tier,
            tuning.health,
            physics::guard_mass(tuning.mass),
            tuning.size,
            tuning.speed,
        );
        self.insert_enemy(enemy)
    }

    pub fn insert_enemy(&mut self, enemy: Enemy) -> Entity {
        let entity = self.entities.allocate();
        self.spawn_log.push((entity, VisualKind::Enemy(enemy.tier)));
        self.enemies.insert(entity, enemy);
        let active = self.enemies.count() as u32;
        self.tally.peak_enemies = self.tally.peak_enemies.max(active);
        entity
    }

    pub fn spawn_projectile(&mut self, projectile: Projectile) -> Entity {
        let entity = self.entities.allocate();
        let kind = if projectile.is_orbital() {
            VisualKind::Orbital
        } else {
            self.tally.projectiles_fired += 1;
            VisualKind::Projectile
        };
        self.spawn_log.push((entity, kind));
        self.projectiles.insert(entity, projectile);
        entity
    }

    pub fn spawn_orb(&mut self, position: Vec2, value: u32) -> Entity {
        let entity = self.entities.allocate();
        self.spawn_log.push((entity, VisualKind::Orb));
        self.orbs.insert(entity, Orb::new(position, value));
        entity
    }

    pub fn spawn_hazard(&mut self, hazard: Hazard) -> Entity {
        let entity = self.entities.allocate();
        self.spawn_log.push((entity, VisualKind::Hazard));
        self.hazards.insert(entity, hazard);
        entity
    }

    /// Queue an entity for despawn at end of tick.
    pub fn despawn(&mut self, entity: Entity) {
        if self.is_alive(entity) && !self.despawn_queue.contains(&entity) {
            self.despawn_queue.push(entity);
        }
    }

    /// Immediately free an entity and clear its records.
    /// Prefer `despawn()` inside the tick.
    pub fn despawn_immediate(&mut self, entity: Entity) {
        if !self.entities.free(entity) {
            return;
        }

        if let Some(handle) = self.visuals.remove(entity) {
            self.released_visuals.push(handle);
        }
        self.spawn_log.retain(|(e, _)| *e != entity);

        let idx = entity.index();
        self.enemies.clear_slot(idx);
        self.projectiles.clear_slot(idx);
        self.orbs.clear_slot(idx);
        self.hazards.clear_slot(idx);
    }

    /// Process all queued despawns. Called once by cleanup.
    pub fn flush_despawns(&mut self) -> usize {
        let queue = std::mem::take(&mut self.despawn_queue);
        let count = queue.len();
        for entity in queue {
            self.despawn_immediate(entity);
        }
        count
    }

    pub fn pending_despawns(&self) -> &[Entity] {
        &self.despawn_queue
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn entity_count(&self) -> u32 {
        self.entities.alive_count()
    }

    /// Entities spawned since the last call, for visual creation.
    pub fn take_spawn_log(&mut self) -> Vec<(Entity, VisualKind)> {
        std::mem::take(&mut self.spawn_log)
    }

    /// Handles to release on the presenter.
    pub fn take_released_visuals(&mut self) -> Vec<VisualHandle> {
        std::mem::take(&mut self.released_visuals)
    }

    // =========================================================================
    // Enemy helpers shared by resolver and skills
    // =========================================================================

    /// Deal damage to an active enemy. Returns false if it was not a valid target.
    pub fn damage_enemy(&mut self, entity: Entity, amount: f32) -> bool {
        let Some(enemy) = self.enemies.get_mut(entity) else {
            return false;
        };
        if !enemy.is_active() || amount <= 0.0 {
            return false;
        }
        enemy.health -= amount;
        self.tally.damage_dealt += amount;
        true
    }

    /// Push an enemy with `force` along `dir`, scaled by its mass.
    /// Returns the velocity change actually applied.
    pub fn push_enemy(&mut self, entity: Entity, dir: Vec2, force: f32) -> Vec2 {
        let Some(enemy) = self.enemies.get_mut(entity) else {
            return Vec2::ZERO;
        };
        if enemy.merged {
            return Vec2::ZERO;
        }
        let impulse = physics::knockback_impulse(dir, force, enemy.mass);
        enemy.velocity += impulse;
        self.tally.total_impulse += impulse.length();
        self.tally.knockbacks += 1;
        impulse
    }

    /// Active enemies within `radius` of `point`: (id, position, distance).
    pub fn enemies_within(&self, point: Vec2, radius: f32) -> Vec<(Entity, Vec2, f32)> {
        self.enemies
            .iter()
            .filter(|(_, e)| e.is_active())
            .filter_map(|(id, e)| {
                let d = e.position.distance(point);
                (d <= radius).then_some((id, e.position, d))
            })
            .collect()
    }

    /// Nearest active enemy to `point` within `range` that passes `accept`.
    pub fn nearest_enemy(
        &self,
        point: Vec2,
        range: f32,
        accept: impl Fn(Entity) -> bool,
    ) -> Option<(Entity, f32)> {
        let mut best: Option<(Entity, f32)> = None;
        for (id, enemy) in self.enemies.iter() {
            if !enemy.is_active() || !accept(id) {
                continue;
            }
            let d = enemy.position.distance(point);
            if d > range {
                continue;
            }
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best
    }

    pub fn active_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|(_, e)| e.is_active()).count()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Bounds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small() -> TierTuning {
        TierTuning::default()
    }

    #[test]
    fn test_spawn_and_deferred_despawn() {
        let mut world = World::default();

        let e1 = world.spawn_enemy(Vec2::ZERO, Tier::Small, &small());
        let e2 = world.spawn_orb(Vec2::ONE, 3);
        assert_eq!(world.entity_count(), 2);

        world.despawn(e1);
        world.despawn(e1);
        assert!(world.is_alive(e1), "despawn is deferred");
        assert_eq!(world.pending_despawns().len(), 1);

        assert_eq!(world.flush_despawns(), 1);
        assert!(!world.is_alive(e1));
        assert!(world.enemies.get(e1).is_none());
        assert!(world.is_alive(e2));
    }

    #[test]
    fn test_reused_slot_does_not_alias() {
        let mut world = World::default();
        let old = world.spawn_enemy(Vec2::ZERO, Tier::Small, &small());
        world.despawn_immediate(old);
        let new = world.spawn_projectile(Projectile::bolt(Vec2::ZERO, Vec2::X, 1.0, 1.0, 8.0, 1.0));
        assert_eq!(old.index(), new.index());
        assert!(world.enemies.get(old).is_none());
        assert!(!world.damage_enemy(old, 5.0));
    }

    #[test]
    fn test_clear_releases_visuals() {
        let mut world = World::default();
        let e = world.spawn_enemy(Vec2::ZERO, Tier::Small, &small());
        world.visuals.insert(e, VisualHandle(7));
        world.clear();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.take_released_visuals(), vec![VisualHandle(7)]);
        assert!(world.take_spawn_log().is_empty());
    }

    #[test]
    fn test_damage_and_push_tally() {
        let mut world = World::default();
        let e = world.spawn_enemy(Vec2::ZERO, Tier::Small, &small());
        assert!(world.damage_enemy(e, 4.0));
        let impulse = world.push_enemy(e, Vec2::X, 10.0);
        assert_eq!(impulse, Vec2::new(10.0, 0.0));
        assert_eq!(world.tally.damage_dealt, 4.0);
        assert_eq!(world.tally.knockbacks, 1);
    }

    #[test]
    fn test_nearest_enemy_respects_filter() {
        let mut world = World::default();
        let a = world.spawn_enemy(Vec2::new(10.0, 0.0), Tier::Small, &small());
        let b = world.spawn_enemy(Vec2::new(20.0, 0.0), Tier::Small, &small());
        assert_eq!(world.nearest_enemy(Vec2::ZERO, 100.0, |_| true).map(|r| r.0), Some(a));
        assert_eq!(world.nearest_enemy(Vec2::ZERO, 100.0, |e| e != a).map(|r| r.0), Some(b));
        assert!(world.nearest_enemy(Vec2::ZERO, 5.0, |_| true).is_none());
    }

    #[test]
    fn test_bounds_edges() {
        let bounds = Bounds::new(100.0, 50.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..32 {
            let p = bounds.random_edge_point(&mut rng, 10.0);
            let on_x = (p.x.abs() - 110.0).abs() < 1e-3;
            let on_y = (p.y.abs() - 60.0).abs() < 1e-3;
            assert!(on_x || on_y, "{p:?} not on the spawn ring");
        }
        assert_eq!(bounds.clamp(Vec2::new(500.0, 0.0), 5.0), Vec2::new(95.0, 0.0));
        assert_eq!(bounds.wall_normal(Vec2::new(0.0, -51.0)), Some(Vec2::Y));
    }
}
