//! Generation-checked storage for archetypes.
//!
//! Archetypes are created and destroyed as entities change shape. Everything
//! else in the engine (the entity location map, the set-trie index) refers to
//! them through an [`ArchetypeId`] rather than a reference, so destroying an
//! archetype can never leave a dangling pointer behind. A handle whose slot was
//! freed (and possibly reused) simply stops resolving.

use std::fmt;

use crate::engine::archetype::Archetype;


/// Stable, generation-checked handle to an archetype in an [`ArchetypeArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId {
    index: u32,
    generation: u32,
}

impl ArchetypeId {
    /// Slot index inside the arena.
    #[inline]
    pub fn index(self) -> u32 { self.index }

    /// Generation of the slot when this handle was issued.
    #[inline]
    pub fn generation(self) -> u32 { self.generation }
}

impl fmt::Debug for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchetypeId({}v{})", self.index, self.generation)
    }
}

#[derive(Default)]
struct Slot {
    generation: u32,
    archetype: Option<Archetype>,
}

/// Slot arena owning every live archetype.
///
/// ## Invariants
/// - A slot is either occupied or listed exactly once in `free`.
/// - A slot's generation is bumped every time it is vacated.

#[derive(Default)]
pub struct ArchetypeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ArchetypeArena {
    /// Creates an empty arena.
    pub fn new() -> Self { Self::default() }

    /// Stores `archetype` and returns its handle.
    pub fn insert(&mut self, archetype: Archetype) -> ArchetypeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.archetype = Some(archetype);
            return ArchetypeId { index, generation: slot.generation };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, archetype: Some(archetype) });
        ArchetypeId { index, generation: 0 }
    }

    /// Removes and returns the archetype behind `id`.
    ///
    /// Returns `None` for a stale handle.

    pub fn remove(&mut self, id: ArchetypeId) -> Option<Archetype> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }

        let archetype = slot.archetype.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(archetype)
    }

    /// Returns `true` if `id` still resolves.
    #[inline]
    pub fn contains(&self, id: ArchetypeId) -> bool {
        self.get(id).is_some()
    }

    /// Shared access to the archetype behind `id`.
    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.archetype.as_ref())
    }

    /// Mutable access to the archetype behind `id`.
    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.archetype.as_mut())
    }

    /// Returns mutable references to two distinct archetypes.
    ///
    /// ## Purpose
    /// Migration needs the source and destination archetype at once.
    ///
    /// ## Returns
    /// `None` if the handles are equal or either one is stale.

    pub fn get_pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> Option<(&mut Archetype, &mut Archetype)> {
        if a.index == b.index {
            return None;
        }

        let (ai, bi) = (a.index as usize, b.index as usize);
        if ai >= self.slots.len() || bi >= self.slots.len() {
            return None;
        }

        let (first, second) = if ai < bi {
            let (left, right) = self.slots.split_at_mut(bi);
            (&mut left[ai], &mut right[0])
        } else {
            let (left, right) = self.slots.split_at_mut(ai);
            (&mut right[0], &mut left[bi])
        };

        if first.generation != a.generation || second.generation != b.generation {
            return None;
        }
        Some((first.archetype.as_mut()?, second.archetype.as_mut()?))
    }

    /// Iterates over every live archetype with its handle, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeId, &Archetype)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.archetype.as_ref().map(|archetype| {
                (ArchetypeId { index: index as u32, generation: slot.generation }, archetype)
            })
        })
    }

    /// Number of live archetypes.
    #[inline]
    pub fn len(&self) -> usize { self.live }

    /// Returns `true` if no archetype is live.
    #[inline]
    pub fn is_empty(&self) -> bool { self.live == 0 }
}
