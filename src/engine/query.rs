//! Typed iteration over archetype storage.
//!
//! This module provides the per-arity `for_each1` .. `for_each4` methods on both
//! [`Archetype`] and [`Registry`]. Each one hands the callback the entity and a
//! mutable reference to every requested component, row by row.
//!
//! ## Execution model
//! A registry query:
//! 1. Rejects a query naming the same type twice (`AliasedQuery`).
//! 2. Resolves the requested types to ids; an unregistered type means no entity
//!    can match, so nothing is visited.
//! 3. Sorts the ids. If a listener group watches exactly that set, its cached
//!    archetype list is used; otherwise the set-trie is asked for every
//!    archetype whose set is a superset of them.
//! 4. Runs the archetype-level loop on each match.
//!
//! Archetype visitation order is unspecified. Every matching entity is visited
//! exactly once.
//!
//! ## Structural changes
//! Both levels take `&mut self` for the whole iteration, so a callback cannot
//! reach back into the registry to add, remove or destroy anything. A
//! structural change mid-iteration is rejected at compile time.
//!
//! ## Multi-component access
//! `get_components2` .. `get_components4` return mutable references to several
//! components of one entity at once.

use std::any::{type_name, TypeId};

use smallvec::SmallVec;

use crate::engine::archetype::Archetype;
use crate::engine::arena::ArchetypeId;
use crate::engine::component::Component;
use crate::engine::entity::Entity;
use crate::engine::error::{ArchetypeError, ECSError, ECSResult};
use crate::engine::manager::{expect_consistent, Registry};
use crate::engine::storage::Attribute;
use crate::engine::types::{ComponentSet, ComponentTypeId};


fn has_alias<const N: usize>(types: &[TypeId; N]) -> bool {
    types
        .iter()
        .enumerate()
        .any(|(index, type_id)| types[index + 1..].contains(type_id))
}

macro_rules! impl_for_each {
    ($($(#[$doc:meta])* $name:ident => ($($T:ident : $col:ident),+);)+) => {
        impl Archetype {
            $(
                /// Visits every row, passing the entity and its requested components.
                ///
                /// ## Errors
                /// - `MissingComponent` if this archetype lacks a requested type.
                /// - `AliasedQuery` if a type is requested twice.
                pub fn $name<$($T: Component),+>(
                    &mut self,
                    mut f: impl FnMut(Entity, $(&mut $T),+),
                ) -> Result<(), ArchetypeError> {
                    let [$($col),+] = Archetype::disjoint_columns_mut(
                        &mut self.columns,
                        &self.column_of_type,
                        [$((TypeId::of::<$T>(), type_name::<$T>())),+],
                    )?;
                    $(
                        let $col = $col
                            .as_any_mut()
                            .downcast_mut::<Attribute<$T>>()
                            .ok_or(ArchetypeError::MissingComponent { name: type_name::<$T>() })?
                            .as_mut_slice();
                    )+
                    for (row, &entity) in self.entities.iter().enumerate() {
                        f(entity, $(&mut $col[row]),+);
                    }
                    Ok(())
                }
            )+
        }

        impl Registry {
            $(
                /// Visits every entity holding all requested component types.
                ///
                /// ## Errors
                /// `AliasedQuery` if a type is requested twice.
                $(#[$doc])*
                pub fn $name<$($T: Component),+>(
                    &mut self,
                    mut f: impl FnMut(Entity, $(&mut $T),+),
                ) -> ECSResult<()> {
                    if has_alias(&[$(TypeId::of::<$T>()),+]) {
                        return Err(ECSError::AliasedQuery);
                    }

                    let ids: Option<SmallVec<[ComponentTypeId; 4]>> =
                        [$(self.types.id_of::<$T>()),+].into_iter().collect();
                    let Some(ids) = ids else { return Ok(()) };
                    let query = ComponentSet::from_ids(ids);

                    let matches: SmallVec<[ArchetypeId; 16]> =
                        match self.events.cached_archetypes(query.as_slice()) {
                            Some(cached) => cached.iter().copied().collect(),
                            None => self.index.find_supersets(query.as_slice()).into_iter().copied().collect(),
                        };
                    tracing::trace!(query = %query, archetypes = matches.len(), "running query");

                    for archetype_id in matches {
                        self.archetype_mut_or_corrupt(archetype_id).$name(&mut f)?;
                    }
                    Ok(())
                }
            )+
        }
    };
}

impl_for_each! {
    ///
    /// ## Structural changes
    /// The callback cannot touch the registry while it runs:
    ///
    /// ```compile_fail
    /// use ecs_core::prelude::*;
    ///
    /// struct Position(f32);
    ///
    /// let mut registry = Registry::new();
    /// registry
    ///     .for_each1::<Position>(|_, _| {
    ///         registry.create_entity().unwrap();
    ///     })
    ///     .unwrap();
    /// ```
    for_each1 => (A: a);
    for_each2 => (A: a, B: b);
    for_each3 => (A: a, B: b, C: c);
    for_each4 => (A: a, B: b, C: c, D: d);
}

macro_rules! impl_get_components {
    ($($name:ident => ($($T:ident : $col:ident),+);)+) => {
        impl Registry {
            $(
                /// Returns mutable references to several components of `entity`.
                ///
                /// ## Errors
                /// - `UnknownEntity` if `entity` is dead or stale.
                /// - `ComponentNotFound` naming the first requested type `entity` lacks.
                /// - `AliasedQuery` if a type is requested twice.
                pub fn $name<$($T: Component),+>(
                    &mut self,
                    entity: Entity,
                ) -> ECSResult<($(&mut $T),+)> {
                    if has_alias(&[$(TypeId::of::<$T>()),+]) {
                        return Err(ECSError::AliasedQuery);
                    }
                    let names = [$(type_name::<$T>()),+];
                    let Some(archetype_id) = self.entities.location(entity)? else {
                        return Err(ECSError::ComponentNotFound { entity, component: names[0] });
                    };

                    let archetype = self.archetype_mut_or_corrupt(archetype_id);
                    let Some(row) = archetype.row_of(entity) else {
                        panic!("ECS corruption detected: {entity} is not in its archetype {archetype_id:?}");
                    };
                    let [$($col),+] = Archetype::disjoint_columns_mut(
                        &mut archetype.columns,
                        &archetype.column_of_type,
                        [$((TypeId::of::<$T>(), type_name::<$T>())),+],
                    )
                    .map_err(|e| match e {
                        ArchetypeError::MissingComponent { name } => {
                            ECSError::ComponentNotFound { entity, component: name }
                        }
                        other => other.into(),
                    })?;
                    $(
                        let Some($col) = $col.as_any_mut().downcast_mut::<Attribute<$T>>() else {
                            panic!("ECS corruption detected: column for {} holds another type", type_name::<$T>());
                        };
                        let $col = expect_consistent($col.at(row), "get_components");
                    )+
                    Ok(($($col),+))
                }
            )+
        }
    };
}

impl_get_components! {
    get_components2 => (A: a, B: b);
    get_components3 => (A: a, B: b, C: c);
    get_components4 => (A: a, B: b, C: c, D: d);
}
