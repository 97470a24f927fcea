//! # Component Type Registry
//!
//! This module assigns compact `ComponentTypeId` values to Rust component types
//! and keeps the storage factories archetypes use to allocate their columns.
//!
//! ## Purpose
//! The registry decouples component type information (`TypeId`, name, size,
//! alignment) from runtime storage, so archetypes can hold heterogeneous columns
//! behind `ComponentColumn` and still build new ones from a bare id.
//!
//! ## Design
//! - A `TypeRegistry` is an ordinary value owned by one `Registry`. Ids are
//!   therefore deterministic per registry: the first type touched gets `0`, the
//!   next `1`, and so on, regardless of what other registries in the process do.
//! - Types are registered on first touch or explicitly up front.
//! - The registry can be `freeze()`d so that no new type sneaks in after setup.
//!
//! ## Invariants
//! - Ids are dense in `[0, len())` and never reassigned.
//! - Every registered id has a descriptor and a storage factory.

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
    mem::{align_of, size_of},
};

use crate::engine::error::RegistryError;
use crate::engine::storage::{Attribute, ComponentColumn};
use crate::engine::types::{ComponentTypeId, COMPONENT_CAP};


/// Marker for types that can be stored as components.
///
/// Blanket-implemented for every `'static + Send + Sync` type.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Factory constructing an empty column for one component type.
pub type FactoryFn = fn() -> Box<dyn ComponentColumn>;

fn new_attribute_storage<T: Component>() -> Box<dyn ComponentColumn> {
    Box::new(Attribute::<T>::default())
}

/// Describes a registered component type.
///
/// ## Fields
/// - `component_id`: id assigned by the owning `TypeRegistry`.
/// - `name`: `type_name::<T>()`, for diagnostics.
/// - `type_id`: runtime `TypeId`.
/// - `size` / `align`: layout of `T` in bytes.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentDesc {
    /// Id assigned by the registry.
    pub component_id: ComponentTypeId,

    /// Rust type name.
    pub name: &'static str,

    /// Runtime `TypeId`.
    pub type_id: TypeId,

    /// `size_of::<T>()`.
    pub size: usize,

    /// `align_of::<T>()`.
    pub align: usize,
}

impl ComponentDesc {
    /// Describes `T`. The id is `0` until the registry assigns one.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            component_id: 0,
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }

    /// Returns `true` if this descriptor refers to `T`.
    #[inline]
    pub fn matches_type<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    #[inline]
    fn with_id(mut self, component_id: ComponentTypeId) -> Self {
        self.component_id = component_id;
        self
    }
}

impl fmt::Display for ComponentDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComponentDesc {{ id: {}, name: {}, size: {}, align: {} }}",
            self.component_id, self.name, self.size, self.align
        )
    }
}

/// Maps Rust component types to compact ids and owns their storage factories.
///
/// ## Invariants
/// - `by_type[t] == id` implies `descs[id].type_id == t`.
/// - `descs.len() == factories.len() <= capacity`.

#[derive(Debug)]
pub struct TypeRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    descs: Vec<ComponentDesc>,
    factories: Vec<FactoryFn>,
    frozen: bool,
    capacity: usize,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_capacity(COMPONENT_CAP)
    }
}

impl TypeRegistry {
    /// Creates an empty registry accepting up to `COMPONENT_CAP` types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry accepting up to `capacity` types.
    ///
    /// `capacity` is clamped to `COMPONENT_CAP`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_type: HashMap::new(),
            descs: Vec::new(),
            factories: Vec::new(),
            frozen: false,
            capacity: capacity.min(COMPONENT_CAP),
        }
    }

    /// Returns the id of `T`, registering it first if needed.
    ///
    /// ## Errors
    /// - `Frozen` if `T` is new and the registry is frozen.
    /// - `CapacityExceeded` if every id is taken.

    pub fn register<T: Component>(&mut self) -> Result<ComponentTypeId, RegistryError> {
        self.register_described(ComponentDesc::of::<T>(), new_attribute_storage::<T>)
    }

    pub(crate) fn register_described(
        &mut self,
        desc: ComponentDesc,
        factory: FactoryFn,
    ) -> Result<ComponentTypeId, RegistryError> {
        if let Some(&existing) = self.by_type.get(&desc.type_id) {
            return Ok(existing);
        }
        if self.frozen {
            return Err(RegistryError::Frozen { name: desc.name });
        }
        if self.descs.len() >= self.capacity {
            return Err(RegistryError::CapacityExceeded { capacity: self.capacity });
        }

        let component_id = self.descs.len() as ComponentTypeId;
        self.by_type.insert(desc.type_id, component_id);
        self.descs.push(desc.with_id(component_id));
        self.factories.push(factory);

        tracing::debug!(component_id, name = desc.name, "registered component type");
        Ok(component_id)
    }

    /// Returns the id of `T`, if registered.
    #[inline]
    pub fn id_of<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.id_of_type_id(TypeId::of::<T>())
    }

    /// Returns the id registered for a runtime `TypeId`.
    #[inline]
    pub fn id_of_type_id(&self, type_id: TypeId) -> Option<ComponentTypeId> {
        self.by_type.get(&type_id).copied()
    }

    /// Returns the descriptor for `component_id`.
    #[inline]
    pub fn description(&self, component_id: ComponentTypeId) -> Option<&ComponentDesc> {
        self.descs.get(component_id as usize)
    }

    /// Builds an empty column for `component_id`.
    pub fn make_empty_column(&self, component_id: ComponentTypeId) -> Option<Box<dyn ComponentColumn>> {
        self.factories.get(component_id as usize).map(|factory| factory())
    }

    /// Rejects every further first-touch registration.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns `true` once `freeze` has been called.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// Returns `true` if no type is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Maximum number of types this registry accepts.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over every descriptor in id order.
    pub fn descriptions(&self) -> impl Iterator<Item = &ComponentDesc> + '_ {
        self.descs.iter()
    }
}

pub(crate) struct BundleEntry {
    pub(crate) desc: ComponentDesc,
    pub(crate) factory: FactoryFn,
    pub(crate) value: Box<dyn Any + Send>,
}

/// A heterogeneous set of component values for spawning one entity.
///
/// ## Example
/// ```
/// use ecs_core::{Bundle, Registry};
///
/// struct Position { x: f32 }
/// struct Health(u32);
///
/// let mut registry = Registry::new();
/// let entity = registry
///     .spawn(Bundle::new().with(Position { x: 0.0 }).with(Health(10)))
///     .unwrap();
/// assert!(registry.has_component::<Health>(entity));
/// ```

#[derive(Default)]
pub struct Bundle {
    entries: Vec<BundleEntry>,
}

impl Bundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the bundle.
    pub fn insert<T: Component>(&mut self, value: T) {
        self.entries.push(BundleEntry {
            desc: ComponentDesc::of::<T>(),
            factory: new_attribute_storage::<T>,
            value: Box::new(value),
        });
    }

    /// Builder form of [`Bundle::insert`].
    pub fn with<T: Component>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// Number of values in the bundle.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bundle holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the bundle holds a value of type `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.iter().any(|entry| entry.desc.matches_type::<T>())
    }

    /// Type names of the values, in insertion order.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.desc.name).collect()
    }

    /// Name of the first type that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&'static str> {
        self.entries.iter().enumerate().find_map(|(index, entry)| {
            self.entries[index + 1..]
                .iter()
                .any(|other| other.desc.type_id == entry.desc.type_id)
                .then_some(entry.desc.name)
        })
    }

    pub(crate) fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<BundleEntry> {
        self.entries
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundle").field("types", &self.type_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B(#[allow(dead_code)] u64);

    #[test]
    fn ids_are_dense_and_stable() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.register::<A>(), Ok(0));
        assert_eq!(registry.register::<B>(), Ok(1));
        assert_eq!(registry.register::<A>(), Ok(0));
        assert_eq!(registry.id_of::<B>(), Some(1));
        assert_eq!(registry.description(1).map(|d| d.size), Some(8));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn frozen_registry_rejects_new_types_only() {
        let mut registry = TypeRegistry::new();
        registry.register::<A>().unwrap();
        registry.freeze();
        assert_eq!(registry.register::<A>(), Ok(0));
        assert!(matches!(registry.register::<B>(), Err(RegistryError::Frozen { .. })));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut registry = TypeRegistry::with_capacity(1);
        registry.register::<A>().unwrap();
        assert_eq!(
            registry.register::<B>(),
            Err(RegistryError::CapacityExceeded { capacity: 1 })
        );
    }

    #[test]
    fn factory_builds_matching_column() {
        let mut registry = TypeRegistry::new();
        let id = registry.register::<B>().unwrap();
        let column = registry.make_empty_column(id).unwrap();
        assert_eq!(column.element_type_id(), TypeId::of::<B>());
        assert_eq!(column.length(), 0);
        assert!(registry.make_empty_column(id + 1).is_none());
    }

    #[test]
    fn bundle_reports_first_repeated_type() {
        let bundle = Bundle::new().with(A).with(B(1)).with(B(2));
        assert_eq!(bundle.first_duplicate(), Some(std::any::type_name::<B>()));
        assert_eq!(Bundle::new().with(A).with(B(1)).first_duplicate(), None);
    }
}
