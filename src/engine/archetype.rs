//! # Archetype storage
//!
//! An [`Archetype`] stores every entity that has exactly one particular set of
//! component types. It owns one column per component in its
//! [`ComponentSet`], an ordered entity list, and a map from entity to row.
//!
//! ## Layout
//!
//! ```text
//! set:       [ 1        , 3        , 7        ]
//! columns:   [ Attr<Pos>, Attr<Vel>, Attr<Hp> ]   one per id, same order
//! entities:  [ e4, e9, e2 ]
//! rows:      { e4 -> 0, e9 -> 1, e2 -> 2 }
//! ```
//!
//! ## Invariants
//!
//! * `entities.len()` equals the length of every column.
//! * Row `k` of every column belongs to `entities[k]`, and `rows[entities[k]] == k`.
//! * `columns[i]` stores the type registered as `component_set[i]`.
//!
//! Every mutating operation here validates its inputs before touching a column,
//! so a rejected call leaves the archetype exactly as it was.
//!
//! ## Migration
//!
//! Adding or removing one component moves an entity's whole row into a
//! neighbouring archetype whose set differs by exactly one id. Because both sets
//! are sorted, the columns pair up with a single ascending merge: every column
//! lines up index for index except for one insertion point.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use crate::engine::component::{Bundle, Component, TypeRegistry};
use crate::engine::entity::Entity;
use crate::engine::error::{ArchetypeError, MoveError, TypeMismatchError};
use crate::engine::storage::{Attribute, ComponentColumn};
use crate::engine::types::{ComponentSet, ComponentTypeId};


/// Where a migrated entity ended up, and who had to move to fill its old row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Row of the migrated entity in the destination archetype.
    pub destination_row: usize,

    /// Entity that was swapped into the vacated source row, if any.
    pub relocated: Option<Entity>,
}

/// Dense storage for all entities sharing one component set.
pub struct Archetype {
    component_set: ComponentSet,
    pub(crate) columns: Vec<Box<dyn ComponentColumn>>,
    pub(crate) column_of_type: HashMap<TypeId, usize>,
    pub(crate) entities: Vec<Entity>,
    rows: HashMap<Entity, usize>,
}

impl Archetype {
    /// Builds an empty archetype with one column per id in `component_set`.
    ///
    /// ## Errors
    /// `UnregisteredComponent` if an id has no storage factory in `types`.

    pub fn with_component_set(
        component_set: ComponentSet,
        types: &TypeRegistry,
    ) -> Result<Self, ArchetypeError> {
        let columns = component_set
            .iter()
            .map(|id| types.make_empty_column(id).ok_or(ArchetypeError::UnregisteredComponent(id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_columns(component_set, columns))
    }

    fn from_columns(component_set: ComponentSet, columns: Vec<Box<dyn ComponentColumn>>) -> Self {
        let column_of_type = columns
            .iter()
            .enumerate()
            .map(|(index, column)| (column.element_type_id(), index))
            .collect();
        Self {
            component_set,
            columns,
            column_of_type,
            entities: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// Builds the empty neighbour archetype that also stores `component_id`.
    ///
    /// Existing columns are cloned empty via `empty_like`; only the new one
    /// comes from `types`.

    pub fn extended_with(
        &self,
        component_id: ComponentTypeId,
        types: &TypeRegistry,
    ) -> Result<Self, ArchetypeError> {
        let (component_set, inserted_at) = self
            .component_set
            .with_inserted(component_id)
            .ok_or(ArchetypeError::DuplicateComponent(component_id))?;
        let new_column = types
            .make_empty_column(component_id)
            .ok_or(ArchetypeError::UnregisteredComponent(component_id))?;

        let mut columns: Vec<Box<dyn ComponentColumn>> =
            self.columns.iter().map(|column| column.empty_like()).collect();
        columns.insert(inserted_at, new_column);
        Ok(Self::from_columns(component_set, columns))
    }

    /// Builds the empty neighbour archetype without `component_id`.
    ///
    /// ## Errors
    /// `MissingComponent` if `component_id` is not in this archetype's set.

    pub fn narrowed_without(
        &self,
        component_id: ComponentTypeId,
        types: &TypeRegistry,
    ) -> Result<Self, ArchetypeError> {
        let (component_set, removed_at) = self
            .component_set
            .with_removed(component_id)
            .ok_or_else(|| ArchetypeError::MissingComponent {
                name: types.description(component_id).map_or("<unregistered>", |desc| desc.name),
            })?;
        let columns = self
            .columns
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != removed_at)
            .map(|(_, column)| column.empty_like())
            .collect();
        Ok(Self::from_columns(component_set, columns))
    }

    /// Component set this archetype stores.
    #[inline]
    pub fn component_set(&self) -> &ComponentSet { &self.component_set }

    /// Entities in row order.
    #[inline]
    pub fn entities(&self) -> &[Entity] { &self.entities }

    /// Number of stored entities.
    #[inline]
    pub fn len(&self) -> usize { self.entities.len() }

    /// Returns `true` if no entity is stored.
    #[inline]
    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    /// Returns `true` if `entity` is stored here.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool { self.rows.contains_key(&entity) }

    /// Row of `entity`, if stored here.
    #[inline]
    pub fn row_of(&self, entity: Entity) -> Option<usize> { self.rows.get(&entity).copied() }

    /// Returns `true` if this archetype has a column for `T`.
    #[inline]
    pub fn has_type<T: 'static>(&self) -> bool {
        self.column_of_type.contains_key(&TypeId::of::<T>())
    }

    fn attribute<T: Component>(&self) -> Result<&Attribute<T>, ArchetypeError> {
        self.column_of_type
            .get(&TypeId::of::<T>())
            .and_then(|&index| self.columns[index].as_any().downcast_ref::<Attribute<T>>())
            .ok_or(ArchetypeError::MissingComponent { name: type_name::<T>() })
    }

    fn attribute_mut<T: Component>(&mut self) -> Result<&mut Attribute<T>, ArchetypeError> {
        let column = match self.column_of_type.get(&TypeId::of::<T>()) {
            Some(&index) => self.columns[index].as_any_mut().downcast_mut::<Attribute<T>>(),
            None => None,
        };
        column.ok_or(ArchetypeError::MissingComponent { name: type_name::<T>() })
    }

    /// Returns `entity`'s `T` value.
    ///
    /// ## Errors
    /// - `MissingComponent` if this archetype does not store `T`.
    /// - `UnknownEntity` if `entity` is not stored here.

    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T, ArchetypeError> {
        let row = self.row_of(entity).ok_or(ArchetypeError::UnknownEntity(entity))?;
        Ok(self.attribute::<T>()?.get(row).ok_or(ArchetypeError::UnknownEntity(entity))?)
    }

    /// Mutable form of [`Archetype::get`].
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, ArchetypeError> {
        let row = self.row_of(entity).ok_or(ArchetypeError::UnknownEntity(entity))?;
        Ok(self.attribute_mut::<T>()?.at(row)?)
    }

    /// The whole `T` column as a slice, aligned with [`Archetype::entities`].
    pub fn column<T: Component>(&self) -> Option<&[T]> {
        self.attribute::<T>().ok().map(Attribute::as_slice)
    }

    /// Appends `entity` with one value per component in this archetype's set.
    ///
    /// ## Behavior
    /// Values may be supplied in any order; each is routed to the column of its
    /// type.
    ///
    /// ## Errors
    /// - `DuplicateEntity` if `entity` is already stored here.
    /// - `SetMismatch` if the bundle's types are not exactly this archetype's set.

    pub fn add_entity(&mut self, entity: Entity, bundle: Bundle) -> Result<usize, ArchetypeError> {
        if self.rows.contains_key(&entity) {
            return Err(ArchetypeError::DuplicateEntity(entity));
        }

        let mismatch = |bundle: &Bundle| ArchetypeError::SetMismatch {
            expected: self.component_set.clone(),
            provided: bundle.type_names(),
        };
        if bundle.len() != self.columns.len() {
            return Err(mismatch(&bundle));
        }

        let mut targets = Vec::with_capacity(bundle.len());
        let mut seen = vec![false; self.columns.len()];
        for entry in bundle.entries() {
            match self.column_of_type.get(&entry.desc.type_id) {
                Some(&index) if !seen[index] => {
                    seen[index] = true;
                    targets.push(index);
                }
                _ => return Err(mismatch(&bundle)),
            }
        }

        for (entry, index) in bundle.into_entries().into_iter().zip(targets) {
            self.columns[index].push_dyn(entry.value)?;
        }

        let row = self.entities.len();
        self.entities.push(entity);
        self.rows.insert(entity, row);
        Ok(row)
    }

    /// Removes `entity`'s row and entity-list slot, dropping its values.
    ///
    /// ## Returns
    /// The entity that was swapped into the vacated row, if any. Its row is
    /// already updated here; the caller only needs to know it moved.
    ///
    /// ## Errors
    /// `UnknownEntity` if `entity` is not stored here.

    pub fn remove_entity(&mut self, entity: Entity) -> Result<Option<Entity>, ArchetypeError> {
        let row = self.row_of(entity).ok_or(ArchetypeError::UnknownEntity(entity))?;
        for column in &mut self.columns {
            column.swap_remove_dyn(row)?;
        }
        Ok(self.detach_row(entity, row))
    }

    /// Like [`Archetype::remove_entity`], but hands back the removed values in
    /// component-set order.

    pub fn take_entity(
        &mut self,
        entity: Entity,
    ) -> Result<(Vec<Box<dyn Any + Send>>, Option<Entity>), ArchetypeError> {
        let row = self.row_of(entity).ok_or(ArchetypeError::UnknownEntity(entity))?;
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &mut self.columns {
            values.push(column.swap_remove_take_dyn(row)?.0);
        }
        Ok((values, self.detach_row(entity, row)))
    }

    fn detach_row(&mut self, entity: Entity, row: usize) -> Option<Entity> {
        self.entities.swap_remove(row);
        self.rows.remove(&entity);
        let moved = *self.entities.get(row)?;
        self.rows.insert(moved, row);
        Some(moved)
    }

    fn attach_row(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        self.rows.insert(entity, row);
        row
    }

    fn check_migration(
        &self,
        entity: Entity,
        destination: &Archetype,
    ) -> Result<usize, MoveError> {
        let row = self.row_of(entity).ok_or(MoveError::UnknownEntity(entity))?;
        if destination.contains(entity) {
            return Err(MoveError::DuplicateEntity(entity));
        }
        Ok(row)
    }

    fn check_shared_columns(
        smaller: &[Box<dyn ComponentColumn>],
        larger: &[Box<dyn ComponentColumn>],
        extra_at: usize,
        set: &ComponentSet,
    ) -> Result<(), MoveError> {
        for (index, column) in smaller.iter().enumerate() {
            let other = &larger[index + usize::from(index >= extra_at)];
            if column.element_type_id() != other.element_type_id() {
                return Err(MoveError::Storage {
                    component_id: set.as_slice()[index],
                    source_error: TypeMismatchError {
                        expected: other.element_type_name(),
                        actual: column.element_type_name(),
                    }
                    .into(),
                });
            }
        }
        Ok(())
    }

    /// Moves `entity`'s row into `destination`, which stores this archetype's
    /// set plus exactly one more component, and writes `value` for it.
    ///
    /// ## Behavior
    /// 1. Validates membership, the destination set, every paired column type
    ///    and the type of `value`. Nothing has been touched if any check fails.
    /// 2. Walks the destination columns once. Each column other than the
    ///    insertion point takes its value from the aligned source column via
    ///    `move_from_dyn`; the insertion point receives `value`.
    /// 3. Swap-removes the entity from this archetype's entity list and fixes up
    ///    the row of whichever entity took its place.
    ///
    /// ## Errors
    /// `UnknownEntity`, `DuplicateEntity`, `DestinationMismatch`,
    /// `ValueTypeMismatch`, or `Storage` if a paired column has a different type.

    pub fn migrate_entity_adding_component(
        &mut self,
        entity: Entity,
        destination: &mut Archetype,
        value: Box<dyn Any + Send>,
    ) -> Result<MigrationOutcome, MoveError> {
        let source_row = self.check_migration(entity, destination)?;
        let inserted_at = self
            .component_set
            .single_insertion_into(&destination.component_set)
            .ok_or_else(|| MoveError::DestinationMismatch {
                source: self.component_set.clone(),
                destination: destination.component_set.clone(),
            })?;
        Self::check_shared_columns(&self.columns, &destination.columns, inserted_at, &self.component_set)?;

        let new_column = &destination.columns[inserted_at];
        if (*value).type_id() != new_column.element_type_id() {
            return Err(MoveError::ValueTypeMismatch(TypeMismatchError {
                expected: new_column.element_type_name(),
                actual: "<dynamic value>",
            }));
        }

        let destination_ids = destination.component_set.as_slice();
        for (index, column) in destination.columns.iter_mut().enumerate() {
            if index == inserted_at {
                continue;
            }
            let source = &mut self.columns[index - usize::from(index > inserted_at)];
            column
                .move_from_dyn(&mut **source, source_row)
                .map_err(|source_error| MoveError::Storage {
                    component_id: destination_ids[index],
                    source_error,
                })?;
        }
        destination.columns[inserted_at]
            .push_dyn(value)
            .map_err(|source_error| MoveError::Storage {
                component_id: destination_ids[inserted_at],
                source_error,
            })?;

        let destination_row = destination.attach_row(entity);
        let relocated = self.detach_row(entity, source_row);
        Ok(MigrationOutcome { destination_row, relocated })
    }

    /// Moves `entity`'s row into `destination`, which stores this archetype's
    /// set minus exactly one component, and returns that component's value.
    ///
    /// The inverse merge of [`Archetype::migrate_entity_adding_component`]: the
    /// column absent from `destination` is swap-removed and its value handed
    /// back instead of moved.

    pub fn migrate_entity_removing_component(
        &mut self,
        entity: Entity,
        destination: &mut Archetype,
    ) -> Result<(MigrationOutcome, Box<dyn Any + Send>), MoveError> {
        let source_row = self.check_migration(entity, destination)?;
        let removed_at = destination
            .component_set
            .single_insertion_into(&self.component_set)
            .ok_or_else(|| MoveError::DestinationMismatch {
                source: self.component_set.clone(),
                destination: destination.component_set.clone(),
            })?;
        Self::check_shared_columns(
            &destination.columns,
            &self.columns,
            removed_at,
            &destination.component_set,
        )?;

        let source_ids = self.component_set.as_slice();
        let mut removed = None;
        for (index, column) in self.columns.iter_mut().enumerate() {
            let storage_error = |source_error| MoveError::Storage {
                component_id: source_ids[index],
                source_error,
            };
            if index == removed_at {
                removed = Some(column.swap_remove_take_dyn(source_row).map_err(storage_error)?.0);
                continue;
            }
            destination.columns[index - usize::from(index > removed_at)]
                .move_from_dyn(&mut **column, source_row)
                .map_err(storage_error)?;
        }

        let removed = removed.ok_or_else(|| MoveError::DestinationMismatch {
            source: self.component_set.clone(),
            destination: destination.component_set.clone(),
        })?;

        let destination_row = destination.attach_row(entity);
        let relocated = self.detach_row(entity, source_row);
        Ok((MigrationOutcome { destination_row, relocated }, removed))
    }

    /// Returns mutable references to the columns of `N` distinct types at once.
    ///
    /// ## Errors
    /// - `MissingComponent` if any type has no column here.
    /// - `AliasedQuery` if a type is named twice.

    pub(crate) fn disjoint_columns_mut<'a, const N: usize>(
        columns: &'a mut [Box<dyn ComponentColumn>],
        column_of_type: &HashMap<TypeId, usize>,
        types: [(TypeId, &'static str); N],
    ) -> Result<[&'a mut Box<dyn ComponentColumn>; N], ArchetypeError> {
        let mut indices = [0usize; N];
        for (slot, (type_id, name)) in indices.iter_mut().zip(types) {
            *slot = *column_of_type
                .get(&type_id)
                .ok_or(ArchetypeError::MissingComponent { name })?;
        }
        columns
            .get_disjoint_mut(indices)
            .map_err(|_| ArchetypeError::AliasedQuery)
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("component_set", &self.component_set)
            .field("entities", &self.entities)
            .finish()
    }
}
