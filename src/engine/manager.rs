//! # Registry
//!
//! The [`Registry`] is the facade systems talk to. It owns:
//!
//! * the [`TypeRegistry`] assigning component ids,
//! * the [`Entities`] slot allocator and entity-to-archetype map,
//! * every [`Archetype`], held in an [`ArchetypeArena`],
//! * the [`SetTrie`] index from component set to archetype,
//! * the [`ComponentSetEvents`] listener groups.
//!
//! ## Structural changes
//!
//! Adding or removing a component migrates the entity to the archetype for its
//! new component set, creating that archetype on demand. An archetype left with
//! no entities is destroyed at once, together with its index entry, so the index
//! only ever names live, non-empty archetypes.
//!
//! An entity with no components belongs to no archetype. That is the state of a
//! fresh entity and of one whose last component was removed.
//!
//! Every change of an entity's component set is announced to the listener
//! groups once the registry is consistent again.
//!
//! ## Failure model
//!
//! Every public operation validates its inputs before touching storage and
//! returns an [`ECSError`] for rejected calls, leaving the registry unchanged.
//! Once validated, a failure inside an archetype means the bookkeeping is broken;
//! those are not returned but abort with an `ECS corruption detected` panic.
//!
//! ## Concurrency
//!
//! Single-owner. Every mutating call and every query takes `&mut self`; callers
//! needing shared access serialize externally.

use std::any::type_name;
use std::fmt;

use crate::engine::archetype::Archetype;
use crate::engine::arena::{ArchetypeArena, ArchetypeId};
use crate::engine::component::{Bundle, Component, TypeRegistry};
use crate::engine::config::RegistryConfig;
use crate::engine::entity::{Entities, Entity};
use crate::engine::error::{ArchetypeError, ECSError, ECSResult};
use crate::engine::events::{ComponentSetEvents, ComponentSetListener, ListenerId};
use crate::engine::set_trie::SetTrie;
use crate::engine::types::{ComponentSet, ComponentTypeId};


/// Unwraps the result of an operation whose preconditions were already checked.
///
/// ## Panics
/// Panics with `ECS corruption detected` on `Err`.

pub(crate) fn expect_consistent<T, E: fmt::Display>(result: Result<T, E>, operation: &'static str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(operation, error = %e, "ECS invariant violation");
            panic!("ECS corruption detected during {operation}: {e}");
        }
    }
}

/// Owner of all entities, archetypes and component storage.
pub struct Registry {
    pub(crate) types: TypeRegistry,
    pub(crate) entities: Entities,
    pub(crate) archetypes: ArchetypeArena,
    pub(crate) index: SetTrie<ComponentTypeId, ArchetypeId>,
    pub(crate) events: ComponentSetEvents,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(RegistryConfig::default())
    }

    /// Creates an empty registry with `config`.
    ///
    /// ## Errors
    /// `Config` if `config.validate()` fails.

    pub fn with_config(config: RegistryConfig) -> ECSResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RegistryConfig) -> Self {
        Self {
            types: TypeRegistry::with_capacity(config.component_capacity),
            entities: Entities::with_capacity(config.initial_entity_capacity),
            archetypes: ArchetypeArena::new(),
            index: SetTrie::new(),
            events: ComponentSetEvents::new(),
        }
    }

    /// Component type registry.
    #[inline]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Registers `T` ahead of first use and returns its id.
    pub fn register_component<T: Component>(&mut self) -> ECSResult<ComponentTypeId> {
        Ok(self.types.register::<T>()?)
    }

    /// Returns the id assigned to `T`, if any.
    #[inline]
    pub fn component_id_of<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.types.id_of::<T>()
    }

    /// Stops any new component type from being registered.
    pub fn freeze_components(&mut self) {
        self.types.freeze();
    }

    pub(crate) fn archetype_or_corrupt(&self, id: ArchetypeId) -> &Archetype {
        match self.archetypes.get(id) {
            Some(archetype) => archetype,
            None => panic!("ECS corruption detected: dangling archetype handle {id:?}"),
        }
    }

    pub(crate) fn archetype_mut_or_corrupt(&mut self, id: ArchetypeId) -> &mut Archetype {
        match self.archetypes.get_mut(id) {
            Some(archetype) => archetype,
            None => panic!("ECS corruption detected: dangling archetype handle {id:?}"),
        }
    }

    fn insert_archetype(&mut self, archetype: Archetype) -> ArchetypeId {
        let component_set = archetype.component_set().clone();
        let id = self.archetypes.insert(archetype);
        expect_consistent(self.index.insert(component_set.as_slice(), id), "archetype creation");
        self.events.archetype_created(id, &component_set);
        tracing::debug!(archetype = ?id, components = %component_set, "created archetype");
        id
    }

    fn get_or_create_archetype(&mut self, component_set: ComponentSet) -> ECSResult<ArchetypeId> {
        if let Some(&id) = self.index.find_exact(component_set.as_slice()) {
            return Ok(id);
        }
        let archetype = Archetype::with_component_set(component_set, &self.types)?;
        Ok(self.insert_archetype(archetype))
    }

    fn destroy_if_empty(&mut self, id: ArchetypeId) {
        if !self.archetype_or_corrupt(id).is_empty() {
            return;
        }
        if let Some(archetype) = self.archetypes.remove(id) {
            let removed = self.index.remove(archetype.component_set().as_slice());
            debug_assert_eq!(removed, Some(id), "set-trie entry does not match destroyed archetype");
            self.events.archetype_destroyed(id, archetype.component_set());
            tracing::debug!(archetype = ?id, components = %archetype.component_set(), "destroyed empty archetype");
        }
    }

    /// Watches `watched`: `listener` is told whenever an entity's component set
    /// starts or stops containing every id of it.
    ///
    /// Entities already inside the watched set when the listener is added are
    /// not announced.
    ///
    /// ## Errors
    /// `Archetype(UnregisteredComponent)` if an id of `watched` is not registered.

    pub fn add_component_set_listener(
        &mut self,
        watched: ComponentSet,
        listener: impl ComponentSetListener + 'static,
    ) -> ECSResult<ListenerId> {
        if let Some(id) = watched.iter().find(|&id| self.types.description(id).is_none()) {
            return Err(ArchetypeError::UnregisteredComponent(id).into());
        }
        let index = &self.index;
        let id = expect_consistent(
            self.events.add_listener(watched, Box::new(listener), |set| {
                index.find_supersets(set.as_slice()).into_iter().copied().collect()
            }),
            "add_component_set_listener",
        );
        tracing::debug!(listener = ?id, "added component set listener");
        Ok(id)
    }

    /// Stops and returns the listener behind `id`.
    pub fn remove_component_set_listener(
        &mut self,
        id: ListenerId,
    ) -> Option<Box<dyn ComponentSetListener>> {
        let listener = self.events.remove_listener(id)?;
        tracing::debug!(listener = ?id, "removed component set listener");
        Some(listener)
    }

    /// Listener groups and their cached archetype lists.
    #[inline]
    pub fn component_set_events(&self) -> &ComponentSetEvents {
        &self.events
    }

    /// Creates an entity with no components.
    ///
    /// ## Errors
    /// `Capacity` if every entity slot is in use.

    pub fn create_entity(&mut self) -> ECSResult<Entity> {
        let entity = self.entities.spawn()?;
        tracing::trace!(%entity, "created entity");
        Ok(entity)
    }

    /// Creates an entity directly in the archetype matching `bundle`'s types.
    ///
    /// ## Behavior
    /// Unregistered bundle types are registered first. An empty bundle is
    /// equivalent to [`Registry::create_entity`].
    ///
    /// ## Errors
    /// - `DuplicateBundleComponent` if the bundle holds a type twice. Nothing is
    ///   registered in that case.
    /// - `Registry` if a new type cannot be registered.
    /// - `Capacity` if every entity slot is in use.

    pub fn spawn(&mut self, bundle: Bundle) -> ECSResult<Entity> {
        if bundle.is_empty() {
            return self.create_entity();
        }

        if let Some(component) = bundle.first_duplicate() {
            return Err(ECSError::DuplicateBundleComponent { component });
        }

        let mut ids = Vec::with_capacity(bundle.len());
        for entry in bundle.entries() {
            ids.push(self.types.register_described(entry.desc, entry.factory)?);
        }
        let component_set = ComponentSet::from_ids(ids);

        let archetype_id = self.get_or_create_archetype(component_set.clone())?;
        let entity = match self.entities.spawn() {
            Ok(entity) => entity,
            Err(e) => {
                self.destroy_if_empty(archetype_id);
                return Err(e.into());
            }
        };

        let archetype = self.archetype_mut_or_corrupt(archetype_id);
        expect_consistent(archetype.add_entity(entity, bundle), "spawn");
        self.entities.set_location(entity, Some(archetype_id));
        self.events.announce(entity, &ComponentSet::new(), &component_set);
        tracing::trace!(%entity, archetype = ?archetype_id, "spawned entity");
        Ok(entity)
    }

    /// Destroys `entity` and all of its components.
    ///
    /// The slot's generation is bumped, so every copy of `entity` goes stale.
    ///
    /// ## Errors
    /// `UnknownEntity` if `entity` is dead or stale.

    pub fn destroy_entity(&mut self, entity: Entity) -> ECSResult<()> {
        let mut previous_set = None;
        if let Some(archetype_id) = self.entities.location(entity)? {
            let archetype = self.archetype_mut_or_corrupt(archetype_id);
            previous_set = Some(archetype.component_set().clone());
            expect_consistent(archetype.remove_entity(entity), "destroy_entity");
            self.destroy_if_empty(archetype_id);
        }
        self.entities.despawn(entity);
        if let Some(previous_set) = previous_set {
            self.events.announce(entity, &previous_set, &ComponentSet::new());
        }
        tracing::trace!(%entity, "destroyed entity");
        Ok(())
    }

    /// Returns `true` if `entity` is live.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Adds `value` as `entity`'s `T` component.
    ///
    /// ## Behavior
    /// The entity moves to the archetype for its current set plus `T`, which is
    /// created if it does not exist yet. The archetype it left is destroyed if
    /// now empty.
    ///
    /// ## Errors
    /// - `UnknownEntity` if `entity` is dead or stale.
    /// - `DuplicateComponent` if `entity` already has a `T`.
    /// - `Registry` if `T` is new and cannot be registered.

    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> ECSResult<()> {
        let location = self.entities.location(entity)?;
        let component_id = self.types.register::<T>()?;

        let Some(source_id) = location else {
            let target_set = ComponentSet::single(component_id);
            let archetype_id = self.get_or_create_archetype(target_set.clone())?;
            let archetype = self.archetype_mut_or_corrupt(archetype_id);
            expect_consistent(archetype.add_entity(entity, Bundle::new().with(value)), "add_component");
            self.entities.set_location(entity, Some(archetype_id));
            self.events.announce(entity, &ComponentSet::new(), &target_set);
            tracing::trace!(%entity, component = type_name::<T>(), archetype = ?archetype_id, "added first component");
            return Ok(());
        };

        let source_set = self.archetype_or_corrupt(source_id).component_set().clone();
        let Some((target_set, _)) = source_set.with_inserted(component_id) else {
            return Err(ECSError::DuplicateComponent { entity, component: type_name::<T>() });
        };

        let destination_id = match self.index.find_exact(target_set.as_slice()) {
            Some(&id) => id,
            None => {
                let archetype = self
                    .archetype_or_corrupt(source_id)
                    .extended_with(component_id, &self.types)?;
                self.insert_archetype(archetype)
            }
        };

        let Some((source, destination)) = self.archetypes.get_pair_mut(source_id, destination_id) else {
            panic!("ECS corruption detected: cannot borrow archetypes {source_id:?} and {destination_id:?}");
        };
        let outcome = expect_consistent(
            source.migrate_entity_adding_component(entity, destination, Box::new(value)),
            "add_component",
        );

        self.entities.set_location(entity, Some(destination_id));
        self.destroy_if_empty(source_id);
        self.events.announce(entity, &source_set, &target_set);
        tracing::trace!(
            %entity,
            component = type_name::<T>(),
            from = ?source_id,
            to = ?destination_id,
            row = outcome.destination_row,
            relocated = ?outcome.relocated,
            "migrated entity"
        );
        Ok(())
    }

    /// Removes `entity`'s `T` component and returns it.
    ///
    /// ## Behavior
    /// The entity moves to the archetype for its current set minus `T`. Removing
    /// the last component leaves the entity alive with no archetype.
    ///
    /// ## Errors
    /// - `UnknownEntity` if `entity` is dead or stale.
    /// - `MissingArchetype` if `entity` has no components at all.
    /// - `ComponentNotFound` if `entity` has no `T`.

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> ECSResult<T> {
        let Some(source_id) = self.entities.location(entity)? else {
            return Err(ECSError::MissingArchetype(entity));
        };
        let not_found = ECSError::ComponentNotFound { entity, component: type_name::<T>() };
        let Some(component_id) = self.types.id_of::<T>() else {
            return Err(not_found);
        };
        let source_set = self.archetype_or_corrupt(source_id).component_set().clone();
        let Some((target_set, _)) = source_set.with_removed(component_id) else {
            return Err(not_found);
        };

        let (value, destination_id) = if target_set.is_empty() {
            let archetype = self.archetype_mut_or_corrupt(source_id);
            let (mut values, _) = expect_consistent(archetype.take_entity(entity), "remove_component");
            let Some(value) = values.pop() else {
                panic!("ECS corruption detected: archetype {source_id:?} returned no value for {entity}");
            };
            (value, None)
        } else {
            let destination_id = match self.index.find_exact(target_set.as_slice()) {
                Some(&id) => id,
                None => {
                    let archetype = self
                        .archetype_or_corrupt(source_id)
                        .narrowed_without(component_id, &self.types)?;
                    self.insert_archetype(archetype)
                }
            };
            let Some((source, destination)) = self.archetypes.get_pair_mut(source_id, destination_id) else {
                panic!("ECS corruption detected: cannot borrow archetypes {source_id:?} and {destination_id:?}");
            };
            let (_, value) = expect_consistent(
                source.migrate_entity_removing_component(entity, destination),
                "remove_component",
            );
            (value, Some(destination_id))
        };

        self.entities.set_location(entity, destination_id);
        self.destroy_if_empty(source_id);
        self.events.announce(entity, &source_set, &target_set);
        tracing::trace!(%entity, component = type_name::<T>(), from = ?source_id, to = ?destination_id, "removed component");

        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => panic!("ECS corruption detected: column for {} held another type", type_name::<T>()),
        }
    }

    fn located<T: Component>(&self, entity: Entity) -> ECSResult<ArchetypeId> {
        let not_found = ECSError::ComponentNotFound { entity, component: type_name::<T>() };
        match self.entities.location(entity)? {
            Some(id) if self.archetype_or_corrupt(id).has_type::<T>() => Ok(id),
            _ => Err(not_found),
        }
    }

    /// Returns `entity`'s `T` component.
    ///
    /// ## Errors
    /// - `UnknownEntity` if `entity` is dead or stale.
    /// - `ComponentNotFound` if `entity` has no `T`.

    pub fn get_component<T: Component>(&self, entity: Entity) -> ECSResult<&T> {
        let id = self.located::<T>(entity)?;
        Ok(expect_consistent(self.archetype_or_corrupt(id).get::<T>(entity), "get_component"))
    }

    /// Mutable form of [`Registry::get_component`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> ECSResult<&mut T> {
        let id = self.located::<T>(entity)?;
        Ok(expect_consistent(self.archetype_mut_or_corrupt(id).get_mut::<T>(entity), "get_component_mut"))
    }

    /// Returns `true` if `entity` is live and has a `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.located::<T>(entity).is_ok()
    }

    /// Component set of `entity`; empty if it has no components.
    pub fn component_set_of(&self, entity: Entity) -> ECSResult<ComponentSet> {
        Ok(match self.entities.location(entity)? {
            Some(id) => self.archetype_or_corrupt(id).component_set().clone(),
            None => ComponentSet::new(),
        })
    }

    /// Archetype currently holding `entity`, if any.
    pub fn archetype_of(&self, entity: Entity) -> ECSResult<Option<ArchetypeId>> {
        Ok(self.entities.location(entity)?)
    }

    /// Every live archetype with its handle.
    ///
    /// Together with [`Archetype::component_set`] and [`Archetype::entities`]
    /// this is enough to snapshot the whole registry.
    pub fn archetypes(&self) -> impl Iterator<Item = (ArchetypeId, &Archetype)> + '_ {
        self.archetypes.iter()
    }

    /// The archetype behind `id`, if still live.
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    /// Archetype storing exactly `component_set`.
    pub fn find_archetype(&self, component_set: &ComponentSet) -> Option<ArchetypeId> {
        self.index.find_exact(component_set.as_slice()).copied()
    }

    /// Archetypes whose set contains every id of `component_set`.
    pub fn matching_archetypes(&self, component_set: &ComponentSet) -> Vec<ArchetypeId> {
        self.index.find_supersets(component_set.as_slice()).into_iter().copied().collect()
    }

    /// Every live entity, including those with no components.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    /// Number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of live archetypes.
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entities.len())
            .field("archetypes", &self.archetypes.len())
            .field("component_types", &self.types.len())
            .field("listeners", &self.events.len())
            .finish()
    }
}
