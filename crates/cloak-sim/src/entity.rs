//! Generational entity registry with stepping and drawing subscription sets.
//!
//! Slots are reused after removal with an incremented generation, so a stale
//! [`EntityId`] never resolves to whatever entity took its slot later.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Stable handle to a registered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a single integer (generation in the high half).
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Entry<T> {
    value: T,
    stepping: bool,
    drawing: bool,
}

struct Slot<T> {
    generation: u32,
    /// Reserved slots have no entry until [`EntityRegistry::insert`].
    entry: Option<Entry<T>>,
    reserved: bool,
}

/// Owns every live entity and the two subscription sets.
///
/// A flag on an entry is `true` exactly when the entity is a member of the
/// matching set. Sets are only touched on a flag transition.
pub struct EntityRegistry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    stepping: BTreeSet<EntityId>,
    drawing: BTreeSet<EntityId>,
}

impl<T> Default for EntityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityRegistry<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            stepping: BTreeSet::new(),
            drawing: BTreeSet::new(),
        }
    }

    /// Reserve an id for an entity that is about to be constructed.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.reserved = true;
            EntityId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: None,
                reserved: true,
            });
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    /// Register a value under an id obtained from [`allocate`](Self::allocate).
    ///
    /// # Panics
    /// If the id was not reserved or is already registered.
    pub fn insert(&mut self, id: EntityId, value: T) {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .unwrap_or_else(|| panic!("entity {id} was never allocated"));
        assert!(slot.entry.is_none(), "entity {id} is already registered");
        assert!(slot.reserved, "entity {id} was not reserved");
        slot.reserved = false;
        slot.entry = Some(Entry {
            value,
            stepping: false,
            drawing: false,
        });
        self.len += 1;
    }

    /// Remove an entity, leaving both subscription sets first.
    ///
    /// # Panics
    /// If the entity is not registered.
    pub fn remove(&mut self, id: EntityId) -> T {
        assert!(self.contains(id), "entity {id} is not registered");
        self.set_stepping(id, false);
        self.set_drawing(id, false);

        let slot = &mut self.slots[id.index as usize];
        let entry = slot
            .entry
            .take()
            .unwrap_or_else(|| panic!("entity {id} is not registered"));
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        entry.value
    }

    fn entry(&self, id: EntityId) -> Option<&Entry<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: EntityId) -> Option<&mut Entry<T>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entry(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entry(id).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entry_mut(id).map(|e| &mut e.value)
    }

    /// Subscribe or unsubscribe an entity from per-tick stepping.
    /// Returns whether the flag changed.
    ///
    /// # Panics
    /// If the entity is not registered.
    pub fn set_stepping(&mut self, id: EntityId, on: bool) -> bool {
        let entry = self
            .entry_mut(id)
            .unwrap_or_else(|| panic!("entity {id} is not registered"));
        if entry.stepping == on {
            return false;
        }
        entry.stepping = on;
        let changed = if on {
            self.stepping.insert(id)
        } else {
            self.stepping.remove(&id)
        };
        assert!(changed, "stepping set out of sync for entity {id}");
        true
    }

    /// Subscribe or unsubscribe an entity from per-frame drawing.
    /// Returns whether the flag changed.
    ///
    /// # Panics
    /// If the entity is not registered.
    pub fn set_drawing(&mut self, id: EntityId, on: bool) -> bool {
        let entry = self
            .entry_mut(id)
            .unwrap_or_else(|| panic!("entity {id} is not registered"));
        if entry.drawing == on {
            return false;
        }
        entry.drawing = on;
        let changed = if on {
            self.drawing.insert(id)
        } else {
            self.drawing.remove(&id)
        };
        assert!(changed, "drawing set out of sync for entity {id}");
        true
    }

    pub fn is_stepping(&self, id: EntityId) -> bool {
        self.entry(id).is_some_and(|e| e.stepping)
    }

    pub fn is_drawing(&self, id: EntityId) -> bool {
        self.entry(id).is_some_and(|e| e.drawing)
    }

    /// Copy of the stepping set, in id order.
    pub fn stepping_snapshot(&self) -> Vec<EntityId> {
        self.stepping.iter().copied().collect()
    }

    /// Copy of the drawing set, in id order.
    pub fn drawing_snapshot(&self) -> Vec<EntityId> {
        self.drawing.iter().copied().collect()
    }

    pub fn stepping_len(&self) -> usize {
        self.stepping.len()
    }

    pub fn drawing_len(&self) -> usize {
        self.drawing.len()
    }

    /// Ids of every registered entity, in slot order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|entry| {
                (
                    EntityId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    &entry.value,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(n: usize) -> (EntityRegistry<&'static str>, Vec<EntityId>) {
        let mut registry = EntityRegistry::new();
        let ids = (0..n)
            .map(|_| {
                let id = registry.allocate();
                registry.insert(id, "actor");
                id
            })
            .collect();
        (registry, ids)
    }

    #[test]
    fn raw_round_trip() {
        let id = EntityId {
            index: 7,
            generation: 3,
        };
        assert_eq!(EntityId::from_raw(id.to_raw()), id);
        assert_eq!(id.to_string(), "#7v3");
    }

    #[test]
    fn new_entities_are_not_subscribed() {
        let (registry, ids) = registry_with(2);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_stepping(ids[0]));
        assert!(!registry.is_drawing(ids[1]));
        assert_eq!(registry.stepping_len(), 0);
    }

    #[test]
    fn toggles_are_idempotent() {
        let (mut registry, ids) = registry_with(1);
        let id = ids[0];
        assert!(registry.set_stepping(id, true));
        assert!(!registry.set_stepping(id, true));
        assert_eq!(registry.stepping_len(), 1);
        assert!(registry.set_drawing(id, true));
        assert!(registry.set_drawing(id, false));
        assert!(!registry.set_drawing(id, false));
        assert_eq!(registry.drawing_len(), 0);
        assert_eq!(registry.stepping_len(), 1);
    }

    #[test]
    fn remove_leaves_both_sets() {
        let (mut registry, ids) = registry_with(2);
        registry.set_stepping(ids[0], true);
        registry.set_drawing(ids[0], true);
        registry.set_drawing(ids[1], true);
        assert_eq!(registry.remove(ids[0]), "actor");
        assert_eq!(registry.stepping_snapshot(), Vec::<EntityId>::new());
        assert_eq!(registry.drawing_snapshot(), vec![ids[1]]);
        assert!(!registry.contains(ids[0]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reused_slot_bumps_generation() {
        let (mut registry, ids) = registry_with(1);
        registry.remove(ids[0]);
        let reused = registry.allocate();
        registry.insert(reused, "other");
        assert_eq!(reused.index(), ids[0].index());
        assert_ne!(reused, ids[0]);
        assert!(registry.get(ids[0]).is_none());
        assert_eq!(registry.get(reused), Some(&"other"));
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn removing_absent_entity_panics() {
        let (mut registry, ids) = registry_with(1);
        registry.remove(ids[0]);
        registry.remove(ids[0]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn double_insert_panics() {
        let (mut registry, ids) = registry_with(1);
        registry.insert(ids[0], "again");
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn toggling_unknown_entity_panics() {
        let (mut registry, ids) = registry_with(1);
        registry.remove(ids[0]);
        registry.set_drawing(ids[0], true);
    }

    #[test]
    fn iteration_skips_holes() {
        let (mut registry, ids) = registry_with(3);
        registry.remove(ids[1]);
        assert_eq!(registry.ids(), vec![ids[0], ids[2]]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn flags_match_set_membership(
                ops in proptest::collection::vec((0usize..4, any::<bool>(), any::<bool>()), 1..64)
            ) {
                let (mut registry, ids) = registry_with(4);
                for (which, stepping, on) in ops {
                    let id = ids[which];
                    let before = (registry.stepping_len(), registry.drawing_len());
                    let was = if stepping { registry.is_stepping(id) } else { registry.is_drawing(id) };
                    let changed = if stepping {
                        registry.set_stepping(id, on)
                    } else {
                        registry.set_drawing(id, on)
                    };
                    prop_assert_eq!(changed, was != on);
                    let after = (registry.stepping_len(), registry.drawing_len());
                    let moved = before.0.abs_diff(after.0) + before.1.abs_diff(after.1);
                    prop_assert_eq!(moved, usize::from(changed));
                    for &id in &ids {
                        prop_assert_eq!(
                            registry.is_stepping(id),
                            registry.stepping_snapshot().contains(&id)
                        );
                        prop_assert_eq!(
                            registry.is_drawing(id),
                            registry.drawing_snapshot().contains(&id)
                        );
                    }
                }
            }
        }
    }
}
