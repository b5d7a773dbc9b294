use serde::Serialize;

/// Generational index into an [`Arena`].
/// A freed slot bumps its generation, so old ids stop resolving even after
/// the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct SlotId {
    pub index: u32,
    pub generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot allocator with free-list reuse and use-after-free detection.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Store a value, returning its id.
    pub fn alloc(&mut self, value: T) -> SlotId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            SlotId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            SlotId {
                index,
                generation: 0,
            }
        }
    }

    /// Remove a value, invalidating its id. Returns `None` for stale ids.
    pub fn free(&mut self, id: SlotId) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let slot = &mut self.slots[id.index as usize];
        // Bump generation immediately to invalidate the id
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;
        slot.value.take()
    }

    pub fn is_valid(&self, id: SlotId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.value.is_some())
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_alloc_and_free() {
        let mut arena = Arena::new();

        let slot1 = arena.alloc("a");
        let slot2 = arena.alloc("b");

        assert!(arena.is_valid(slot1));
        assert!(arena.is_valid(slot2));
        assert_ne!(slot1, slot2);
        assert_eq!(arena.len(), 2);

        assert_eq!(arena.free(slot1), Some("a"));
        assert!(!arena.is_valid(slot1));
        assert_eq!(arena.free(slot1), None);
        assert_eq!(arena.len(), 1);

        // Reuse freed slot
        let slot3 = arena.alloc("c");
        assert_eq!(slot3.index, slot1.index);
        assert_ne!(slot3.generation, slot1.generation);
    }

    #[test]
    fn stale_id_does_not_resolve_after_reuse() {
        let mut arena = Arena::new();

        let old = arena.alloc(1);
        arena.free(old);
        let new = arena.alloc(2);

        assert!(arena.get(old).is_none());
        assert!(arena.get_mut(old).is_none());
        assert_eq!(arena.get(new), Some(&2));
    }
}
