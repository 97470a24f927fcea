//! # Component-set events
//!
//! A listener watches one [`ComponentSet`]. It is told when an entity's
//! component set becomes a superset of the watched set (**enter**) and when it
//! stops being one (**exit**):
//!
//! ```text
//! watched {Pos, Vel}
//!
//! {}        -> {Pos}        nothing
//! {Pos}     -> {Pos, Vel}   enter
//! {Pos,Vel} -> {Pos,Vel,Hp} nothing (still a superset)
//! {Pos,Vel} -> destroyed    exit
//! ```
//!
//! Listeners watching the same set share one group. A group also caches the
//! archetypes whose set contains the watched set. The registry keeps that list
//! current as archetypes are created and destroyed, and a query over exactly a
//! watched set reads it instead of walking the archetype index.
//!
//! ## Reentrancy
//! Callbacks run while the registry is mutably borrowed and receive only the
//! entity and its new set. They cannot reach back into the registry.

use std::collections::HashMap;
use std::fmt;

use crate::engine::arena::ArchetypeId;
use crate::engine::entity::Entity;
use crate::engine::error::SetTrieError;
use crate::engine::set_trie::SetTrie;
use crate::engine::types::{ComponentSet, ComponentTypeId};


/// Receiver of enter/exit events for one watched component set.
///
/// `component_set` is the entity's set after the change; it is empty when the
/// entity was destroyed or lost its last component.
pub trait ComponentSetListener: Send {
    /// The entity's set now contains every watched id, and did not before.
    fn on_enter_superset(&mut self, entity: Entity, component_set: &ComponentSet);

    /// The entity's set no longer contains every watched id, and did before.
    fn on_exit_superset(&mut self, entity: Entity, component_set: &ComponentSet);
}

/// Handle returned when a listener is added, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct ListenerGroup {
    watched: ComponentSet,
    listeners: Vec<(ListenerId, Box<dyn ComponentSetListener>)>,
    archetypes: Vec<ArchetypeId>,
}

impl ListenerGroup {
    fn announce(&mut self, entity: Entity, from: &ComponentSet, to: &ComponentSet) {
        let was_member = from.is_superset_of(&self.watched);
        let is_member = to.is_superset_of(&self.watched);
        match (was_member, is_member) {
            (false, true) => {
                for (_, listener) in &mut self.listeners {
                    listener.on_enter_superset(entity, to);
                }
            }
            (true, false) => {
                for (_, listener) in &mut self.listeners {
                    listener.on_exit_superset(entity, to);
                }
            }
            _ => {}
        }
    }
}

/// Listener groups keyed by watched set.
///
/// ## Invariants
/// - Every group holds at least one listener; a group is dropped with its last.
/// - `watched_by` maps every live listener id to its group's set.
/// - A group's `archetypes` are exactly the live archetypes whose set is a
///   superset of the group's watched set.

#[derive(Default)]
pub struct ComponentSetEvents {
    groups: SetTrie<ComponentTypeId, ListenerGroup>,
    watched_by: HashMap<ListenerId, ComponentSet>,
    next_id: u64,
}

impl ComponentSetEvents {
    /// Creates an empty listener registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live listeners.
    #[inline]
    pub fn len(&self) -> usize {
        self.watched_by.len()
    }

    /// Returns `true` if no listener is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.watched_by.is_empty()
    }

    /// Number of distinct watched sets.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Adds `listener` to the group for `watched`.
    ///
    /// `matching` is only called when the group does not exist yet, to seed its
    /// archetype cache.
    ///
    /// ## Errors
    /// Propagates set-trie insertion failures; `ComponentSet` keys are always
    /// sorted, so none are expected.

    pub fn add_listener(
        &mut self,
        watched: ComponentSet,
        listener: Box<dyn ComponentSetListener>,
        matching: impl FnOnce(&ComponentSet) -> Vec<ArchetypeId>,
    ) -> Result<ListenerId, SetTrieError> {
        let id = ListenerId(self.next_id);

        match self.groups.find_exact_mut(watched.as_slice()) {
            Some(group) => group.listeners.push((id, listener)),
            None => {
                let group = ListenerGroup {
                    archetypes: matching(&watched),
                    watched: watched.clone(),
                    listeners: vec![(id, listener)],
                };
                self.groups.insert(watched.as_slice(), group)?;
            }
        }

        self.next_id += 1;
        self.watched_by.insert(id, watched);
        Ok(id)
    }

    /// Removes and returns the listener behind `id`.
    ///
    /// The group goes away with its last listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn ComponentSetListener>> {
        let watched = self.watched_by.remove(&id)?;
        let group = self.groups.find_exact_mut(watched.as_slice())?;
        let position = group.listeners.iter().position(|(listener_id, _)| *listener_id == id)?;
        let (_, listener) = group.listeners.remove(position);
        if group.listeners.is_empty() {
            self.groups.remove(watched.as_slice());
        }
        Some(listener)
    }

    /// Watched set of the listener behind `id`.
    pub fn watched_set(&self, id: ListenerId) -> Option<&ComponentSet> {
        self.watched_by.get(&id)
    }

    /// Cached archetypes matching exactly the watched set `query`, if some
    /// listener watches it.
    pub fn cached_archetypes(&self, query: &[ComponentTypeId]) -> Option<&[ArchetypeId]> {
        self.groups.find_exact(query).map(|group| group.archetypes.as_slice())
    }

    /// Adds a new archetype to every group whose watched set it contains.
    pub fn archetype_created(&mut self, id: ArchetypeId, component_set: &ComponentSet) {
        self.groups.for_each_value_mut(|group| {
            if component_set.is_superset_of(&group.watched) {
                group.archetypes.push(id);
            }
        });
    }

    /// Drops a destroyed archetype from every group's cache.
    pub fn archetype_destroyed(&mut self, id: ArchetypeId, component_set: &ComponentSet) {
        self.groups.for_each_value_mut(|group| {
            if component_set.is_superset_of(&group.watched) {
                group.archetypes.retain(|&cached| cached != id);
            }
        });
    }

    /// Fires enter/exit events for an entity whose set changed from `from` to `to`.
    pub fn announce(&mut self, entity: Entity, from: &ComponentSet, to: &ComponentSet) {
        if self.is_empty() {
            return;
        }
        self.groups.for_each_value_mut(|group| group.announce(entity, from, to));
    }
}

impl fmt::Debug for ComponentSetEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSetEvents")
            .field("listeners", &self.watched_by.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}
