//! Core identifiers, capacities, and the `ComponentSet` key type.
//!
//! This module defines the small value types shared by every other part of the
//! engine: component type identifiers, capacity constants, and [`ComponentSet`],
//! the sorted sequence of component ids that names an archetype.
//!
//! ## Component sets
//!
//! A [`ComponentSet`] is always strictly ascending and free of duplicates. That
//! ordering is what lets the engine:
//!
//! - compute an entity's next archetype with a single linear scan,
//! - merge the columns of two archetypes that differ by one component in one pass,
//! - walk the set-trie index edge by edge in ascending id order.
//!
//! Sets are stored inline for the common case (up to eight components) and spill
//! to the heap only for wide archetypes.

use std::fmt;

use smallvec::SmallVec;


/// Identifier assigned to a component type by a `TypeRegistry`.
pub type ComponentTypeId = u16;

/// Slot index half of an entity handle.
pub type SlotID = u32;

/// Generation half of an entity handle.
pub type GenerationID = u32;

/// Maximum number of component types a single registry may assign ids to.
pub const COMPONENT_CAP: usize = 4096;

/// Default number of entity slots reserved up front by a new registry.
pub const DEFAULT_ENTITY_CAPACITY: usize = 1024;

/// Number of component ids a `ComponentSet` stores without heap allocation.
pub const INLINE_SET_LEN: usize = 8;

const _: [(); 1] = [(); (COMPONENT_CAP <= ComponentTypeId::MAX as usize + 1) as usize];

/// Strictly ascending, deduplicated sequence of component type ids.
///
/// ## Invariants
/// - `ids[i] < ids[i + 1]` for every adjacent pair.
/// - Two sets are equal exactly when they name the same archetype.

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentSet {
    ids: SmallVec<[ComponentTypeId; INLINE_SET_LEN]>,
}

impl ComponentSet {
    /// Creates the empty set.
    #[inline]
    pub fn new() -> Self {
        Self { ids: SmallVec::new() }
    }

    /// Builds a set from ids in any order, sorting and dropping duplicates.
    pub fn from_ids<I: IntoIterator<Item = ComponentTypeId>>(ids: I) -> Self {
        let mut ids: SmallVec<[ComponentTypeId; INLINE_SET_LEN]> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    /// Builds a set containing a single id.
    #[inline]
    pub fn single(component_id: ComponentTypeId) -> Self {
        let mut ids = SmallVec::new();
        ids.push(component_id);
        Self { ids }
    }

    /// Returns the ids in ascending order.
    #[inline]
    pub fn as_slice(&self) -> &[ComponentTypeId] {
        &self.ids
    }

    /// Number of ids in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` for the set of an entity with no components.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `true` if `component_id` is a member.
    #[inline]
    pub fn contains(&self, component_id: ComponentTypeId) -> bool {
        self.position(component_id).is_some()
    }

    /// Returns the index of `component_id` within the set, if present.
    #[inline]
    pub fn position(&self, component_id: ComponentTypeId) -> Option<usize> {
        self.ids.binary_search(&component_id).ok()
    }

    /// Iterates over the ids in ascending order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.ids.iter().copied()
    }

    /// Returns this set plus `component_id` and the index the id landed at.
    ///
    /// ## Behavior
    /// Walks the set once and inserts in front of the first larger id.
    /// Returns `None` if `component_id` is already a member.

    pub fn with_inserted(&self, component_id: ComponentTypeId) -> Option<(Self, usize)> {
        let mut ids = SmallVec::with_capacity(self.ids.len() + 1);
        let mut inserted_at = None;

        for &existing in &self.ids {
            if existing == component_id {
                return None;
            }
            if inserted_at.is_none() && component_id < existing {
                inserted_at = Some(ids.len());
                ids.push(component_id);
            }
            ids.push(existing);
        }

        let inserted_at = match inserted_at {
            Some(index) => index,
            None => {
                ids.push(component_id);
                ids.len() - 1
            }
        };

        Some((Self { ids }, inserted_at))
    }

    /// Returns this set minus `component_id` and the index the id was removed from.
    ///
    /// Returns `None` if `component_id` is not a member.

    pub fn with_removed(&self, component_id: ComponentTypeId) -> Option<(Self, usize)> {
        let removed_at = self.ids.iter().position(|&existing| existing == component_id)?;
        let ids = self
            .ids
            .iter()
            .copied()
            .filter(|&existing| existing != component_id)
            .collect();
        Some((Self { ids }, removed_at))
    }

    /// Checks that `larger` is exactly this set plus one id, and returns where
    /// that id sits in `larger`.
    ///
    /// ## Behavior
    /// Performs one ascending merge over both sets. Since they may differ by a
    /// single element, the first disagreement is the insertion point and every
    /// later element must line up shifted by one.

    pub fn single_insertion_into(&self, larger: &ComponentSet) -> Option<usize> {
        if larger.len() != self.len() + 1 {
            return None;
        }

        let mut inserted_at = None;
        let mut small = 0;
        for (index, &id) in larger.ids.iter().enumerate() {
            if small < self.ids.len() && self.ids[small] == id {
                small += 1;
                continue;
            }
            if inserted_at.is_some() {
                return None;
            }
            inserted_at = Some(index);
        }

        inserted_at
    }

    /// Returns `true` if every id of `other` is also in `self`.
    pub fn is_superset_of(&self, other: &ComponentSet) -> bool {
        let mut mine = self.ids.iter().peekable();
        'outer: for wanted in &other.ids {
            while let Some(&&id) = mine.peek() {
                mine.next();
                if id == *wanted {
                    continue 'outer;
                }
                if id > *wanted {
                    return false;
                }
            }
            return false;
        }
        true
    }
}

impl FromIterator<ComponentTypeId> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

impl fmt::Display for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, id) in self.ids.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ids_sorts_and_dedups() {
        let set = ComponentSet::from_ids([4, 1, 4, 2]);
        assert_eq!(set.as_slice(), &[1, 2, 4]);
    }

    #[test]
    fn insert_reports_position() {
        let set = ComponentSet::from_ids([1, 3, 7]);
        let (grown, at) = set.with_inserted(5).unwrap();
        assert_eq!(grown.as_slice(), &[1, 3, 5, 7]);
        assert_eq!(at, 2);

        let (grown, at) = set.with_inserted(9).unwrap();
        assert_eq!(grown.as_slice(), &[1, 3, 7, 9]);
        assert_eq!(at, 3);

        assert!(set.with_inserted(3).is_none());
    }

    #[test]
    fn remove_reports_position() {
        let set = ComponentSet::from_ids([1, 3, 7]);
        let (shrunk, at) = set.with_removed(3).unwrap();
        assert_eq!(shrunk.as_slice(), &[1, 7]);
        assert_eq!(at, 1);
        assert!(set.with_removed(2).is_none());
    }

    #[test]
    fn single_insertion_detects_one_extra_id() {
        let small = ComponentSet::from_ids([2, 4]);
        assert_eq!(small.single_insertion_into(&ComponentSet::from_ids([1, 2, 4])), Some(0));
        assert_eq!(small.single_insertion_into(&ComponentSet::from_ids([2, 3, 4])), Some(1));
        assert_eq!(small.single_insertion_into(&ComponentSet::from_ids([2, 4, 8])), Some(2));
        assert_eq!(small.single_insertion_into(&ComponentSet::from_ids([1, 3, 4])), None);
        assert_eq!(small.single_insertion_into(&ComponentSet::from_ids([2, 4])), None);
    }

    #[test]
    fn superset_check() {
        let set = ComponentSet::from_ids([1, 2, 4]);
        assert!(set.is_superset_of(&ComponentSet::from_ids([1, 4])));
        assert!(set.is_superset_of(&ComponentSet::new()));
        assert!(!set.is_superset_of(&ComponentSet::from_ids([3])));
        assert!(!set.is_superset_of(&ComponentSet::from_ids([4, 5])));
    }
}
