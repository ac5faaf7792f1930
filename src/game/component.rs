//! Component Storage
//!
//! `ComponentStorage<T>` is a sparse arena indexed by `Entity::index()`.
//! Each occupied slot remembers the generation it was written with, so a
//! lookup through a stale id misses instead of returning whatever now
//! lives in the reused slot.
//!
//! Run sizes are a few hundred enemies and projectiles; a flat
//! `Vec<Option<..>>` with slot reuse is plenty.

use super::entity::Entity;

/// Sparse, generation-checked storage for one record type.
pub struct ComponentStorage<T> {
    data: Vec<Option<(u32, T)>>,
}

impl<T> ComponentStorage<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.data.len() {
            self.data.resize_with(index + 1, || None);
        }
    }

    /// Insert (or replace) the record for an entity.
    pub fn insert(&mut self, entity: Entity, component: T) {
        let idx = entity.index() as usize;
        self.ensure_capacity(idx);
        self.data[idx] = Some((entity.generation(), component));
    }

    /// Remove the record for an entity, if this exact id owns the slot.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let idx = entity.index() as usize;
        match self.data.get(idx) {
            Some(Some((gen, _))) if *gen == entity.generation() => {
                self.data[idx].take().map(|(_, c)| c)
            }
            _ => None,
        }
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        let idx = entity.index() as usize;
        match self.data.get(idx) {
            Some(Some((gen, c))) if *gen == entity.generation() => Some(c),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let idx = entity.index() as usize;
        match self.data.get_mut(idx) {
            Some(Some((gen, c))) if *gen == entity.generation() => Some(c),
            _ => None,
        }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    /// Iterate over all (id, record) pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.data.iter().enumerate().filter_map(|(idx, slot)| {
            slot.as_ref()
                .map(|(gen, c)| (Entity::new(idx as u32, *gen), c))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.data.iter_mut().enumerate().filter_map(|(idx, slot)| {
            slot.as_mut()
                .map(|(gen, c)| (Entity::new(idx as u32, *gen), c))
        })
    }

    /// Snapshot of the live ids, for loops that mutate other storages
    /// (or this one) while walking.
    pub fn ids(&self) -> Vec<Entity> {
        self.iter().map(|(e, _)| e).collect()
    }

    /// Clear a slot regardless of generation. Used by despawn.
    pub fn clear_slot(&mut self, index: u32) {
        let idx = index as usize;
        if idx < self.data.len() {
            self.data[idx] = None;
        }
    }

    /// Drop every record and the backing slots.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|slot| slot.is_none())
    }
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}
