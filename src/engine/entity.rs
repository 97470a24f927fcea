//! Entity handles and the slot allocator.
//!
//! An [`Entity`] is a packed 64-bit handle:
//!
//! ```text
//! | generation (32) | slot (32) |
//! ```
//!
//! Slots are recycled through a free list. Destroying an entity bumps its
//! slot's generation, so every handle minted before the destruction stops
//! resolving: a stale handle can never observe another entity's data.
//!
//! Entities never own component storage. [`Entities`] only records which
//! archetype, if any, currently holds each live entity.

use std::fmt;

use crate::engine::arena::ArchetypeId;
use crate::engine::error::{CapacityError, StaleEntityError};
use crate::engine::types::{GenerationID, SlotID};


/// Opaque, copyable handle to an entity.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u64);

#[inline]
const fn make_id(slot: SlotID, generation: GenerationID) -> u64 {
    ((generation as u64) << 32) | (slot as u64)
}

impl Entity {
    /// Builds a handle from its slot and generation.
    #[inline]
    pub const fn new(slot: SlotID, generation: GenerationID) -> Self {
        Entity(make_id(slot, generation))
    }

    /// Slot index of this handle.
    #[inline]
    pub const fn slot(self) -> SlotID { self.0 as SlotID }

    /// Generation of this handle.
    #[inline]
    pub const fn generation(self) -> GenerationID { (self.0 >> 32) as GenerationID }

    /// Packed representation, suitable for snapshotting.
    #[inline]
    pub const fn to_bits(self) -> u64 { self.0 }

    /// Rebuilds a handle from `to_bits` output.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self { Entity(bits) }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.slot(), self.generation())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot(), self.generation())
    }
}

/// Slot allocator and entity-to-archetype map.
///
/// ## Invariants
/// - `generations`, `alive` and `locations` always have the same length.
/// - Every slot in `free_store` is dead.
/// - A dead slot's location is `None`.

#[derive(Debug, Default)]
pub struct Entities {
    generations: Vec<GenerationID>,
    free_store: Vec<SlotID>,
    alive: Vec<bool>,
    locations: Vec<Option<ArchetypeId>>,
    live_count: usize,
}

impl Entities {
    /// Creates an empty allocator.
    pub fn new() -> Self { Self::default() }

    /// Creates an allocator with room for `capacity` slots before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            free_store: Vec::new(),
            alive: Vec::with_capacity(capacity),
            locations: Vec::with_capacity(capacity),
            live_count: 0,
        }
    }

    /// Allocates a handle, reusing a freed slot when one is available.
    ///
    /// A reused slot keeps the generation it was bumped to on destruction.
    /// The new entity belongs to no archetype.

    pub fn spawn(&mut self) -> Result<Entity, CapacityError> {
        let slot = match self.free_store.pop() {
            Some(slot) => slot,
            None => {
                let slot = SlotID::try_from(self.generations.len()).map_err(|_| CapacityError {
                    entities_needed: self.generations.len() as u64 + 1,
                    capacity: SlotID::MAX as u64 + 1,
                })?;
                self.generations.push(0);
                self.alive.push(false);
                self.locations.push(None);
                slot
            }
        };

        let index = slot as usize;
        self.alive[index] = true;
        self.locations[index] = None;
        self.live_count += 1;

        Ok(Entity::new(slot, self.generations[index]))
    }

    /// Frees `entity`'s slot and bumps its generation.
    ///
    /// Returns `false` if the handle was already dead or stale.

    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let index = entity.slot() as usize;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.alive[index] = false;
        self.locations[index] = None;
        self.free_store.push(entity.slot());
        self.live_count -= 1;
        true
    }

    /// Returns `true` if `entity` refers to a live slot of the same generation.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.slot() as usize;
        index < self.generations.len()
            && self.alive[index]
            && self.generations[index] == entity.generation()
    }

    /// Returns the archetype currently holding `entity`, if any.
    pub fn location(&self, entity: Entity) -> Result<Option<ArchetypeId>, StaleEntityError> {
        if !self.is_alive(entity) {
            return Err(StaleEntityError(entity));
        }
        Ok(self.locations[entity.slot() as usize])
    }

    /// Records which archetype holds `entity`.
    pub fn set_location(&mut self, entity: Entity, location: Option<ArchetypeId>) {
        debug_assert!(
            self.is_alive(entity),
            "set_location was called on a dead or stale entity. Entity: {:?}, Location: {:?}",
            entity, location
        );
        if self.is_alive(entity) {
            self.locations[entity.slot() as usize] = location;
        }
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize { self.live_count }

    /// Returns `true` if no entity is alive.
    #[inline]
    pub fn is_empty(&self) -> bool { self.live_count == 0 }

    /// Iterates over every live entity in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.generations
            .iter()
            .zip(self.alive.iter())
            .enumerate()
            .filter(|&(_, (_, &alive))| alive)
            .map(|(slot, (&generation, _))| Entity::new(slot as SlotID, generation))
    }
}
