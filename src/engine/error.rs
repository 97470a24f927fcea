//! Error types for component storage, archetypes, the set-trie index, and the
//! registry facade.
//!
//! Each low-level type models one failure family and carries enough structured
//! context to be actionable in logs. Higher layers wrap lower ones through `From`
//! conversions so `?` composes:
//!
//! ```text
//! AttributeError ─┬─> ArchetypeError ─┐
//!                 └─> MoveError       │
//! RegistryError ──────────────────────┼─> ECSError
//! CapacityError ──────────────────────┤
//! ConfigError ────────────────────────┘
//! ```
//!
//! ## Recoverable vs. fatal
//! * `ECSError` variants returned by the registry are local, recoverable
//!   conditions: the call was rejected before any storage was touched.
//! * `AttributeError::IndexOutOfRange` and any `MoveError` reaching the registry
//!   after validation mean bookkeeping is broken. The registry does not return
//!   those; it panics with an `ECS corruption detected` message.
//!
//! ## Display vs. Debug
//! `Display` is short and suitable for logs. `Debug` (derived) keeps the full
//! structure for diagnostics.

use std::fmt;

use crate::engine::entity::Entity;
use crate::engine::types::{ComponentSet, ComponentTypeId};


/// Result alias used by the registry facade.
pub type ECSResult<T> = Result<T, ECSError>;

/// Returned when a value's type does not match the column it is written to.
///
/// ### Fields
/// * `expected`: element type name of the destination column.
/// * `actual`: type name of the value (or source column) provided.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatchError {
    /// Destination column's element type.
    pub expected: &'static str,

    /// Provided value's type.
    pub actual: &'static str,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type mismatch: expected {}, actual {}", self.expected, self.actual)
    }
}

impl std::error::Error for TypeMismatchError {}

/// Errors raised by a single component column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeError {
    /// A row index past the end of the column was addressed.
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Column length at the time of the call.
        length: usize,
    },

    /// The dynamic type of a value did not match the column's element type.
    TypeMismatch(TypeMismatchError),
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeError::IndexOutOfRange { index, length } => {
                write!(f, "index {index} out of range for column of length {length}")
            }
            AttributeError::TypeMismatch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AttributeError {}

impl From<TypeMismatchError> for AttributeError {
    fn from(e: TypeMismatchError) -> Self { AttributeError::TypeMismatch(e) }
}

/// Returned when the entity slot allocator cannot hand out another slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    /// Slots the allocation would have required.
    pub entities_needed: u64,

    /// Upper bound that prevented it.
    pub capacity: u64,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entity limit reached ({} needed; capacity {})",
            self.entities_needed, self.capacity
        )
    }
}

impl std::error::Error for CapacityError {}

/// Returned when an `Entity` handle was destroyed or its slot was recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleEntityError(pub Entity);

impl fmt::Display for StaleEntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stale or dead entity reference {}", self.0)
    }
}

impl std::error::Error for StaleEntityError {}

/// Returned when a `RegistryConfig` is outside supported bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigError {
    /// Requested component capacity.
    pub component_capacity: usize,

    /// Largest supported component capacity.
    pub max: usize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component capacity {} must be between 1 and {}",
            self.component_capacity, self.max
        )
    }
}

impl std::error::Error for ConfigError {}

/// Failures of the component type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// A new component type was touched after the registry was frozen.
    Frozen {
        /// Rust type name of the rejected component.
        name: &'static str,
    },

    /// Every available component id is already assigned.
    CapacityExceeded {
        /// Configured component capacity.
        capacity: usize,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Frozen { name } => {
                write!(f, "component registry is frozen; cannot register {name}")
            }
            RegistryError::CapacityExceeded { capacity } => {
                write!(f, "component capacity of {capacity} types exceeded")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors raised by the set-trie index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetTrieError {
    /// A key set was not strictly ascending.
    UnsortedKeySet,

    /// A value is already stored under this exact key set.
    DuplicateKeySet,
}

impl fmt::Display for SetTrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetTrieError::UnsortedKeySet => f.write_str("key set is not strictly ascending"),
            SetTrieError::DuplicateKeySet => f.write_str("key set is already present in the trie"),
        }
    }
}

impl std::error::Error for SetTrieError {}

/// Errors raised by a single archetype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchetypeError {
    /// The values passed to `add_entity` did not match the archetype's set.
    SetMismatch {
        /// The archetype's component set.
        expected: ComponentSet,
        /// Type names of the values that were provided.
        provided: Vec<&'static str>,
    },

    /// The entity is not stored in this archetype.
    UnknownEntity(Entity),

    /// The entity is already stored in this archetype.
    DuplicateEntity(Entity),

    /// The archetype has no column for the requested type.
    MissingComponent {
        /// Rust type name of the requested component.
        name: &'static str,
    },

    /// A derived archetype would contain the same component id twice.
    DuplicateComponent(ComponentTypeId),

    /// A component id has no storage factory in the type registry.
    UnregisteredComponent(ComponentTypeId),

    /// A query named the same component type more than once.
    AliasedQuery,

    /// A column operation failed.
    Storage(AttributeError),
}

impl fmt::Display for ArchetypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchetypeError::SetMismatch { expected, provided } => write!(
                f,
                "component values {:?} do not match archetype set {}",
                provided, expected
            ),
            ArchetypeError::UnknownEntity(entity) => write!(f, "entity {entity} is not in this archetype"),
            ArchetypeError::DuplicateEntity(entity) => write!(f, "entity {entity} is already in this archetype"),
            ArchetypeError::MissingComponent { name } => write!(f, "archetype has no {name} column"),
            ArchetypeError::DuplicateComponent(id) => write!(f, "component {id} is already in the set"),
            ArchetypeError::UnregisteredComponent(id) => write!(f, "component {id} is not registered"),
            ArchetypeError::AliasedQuery => f.write_str("query names the same component more than once"),
            ArchetypeError::Storage(e) => write!(f, "column operation failed: {e}"),
        }
    }
}

impl std::error::Error for ArchetypeError {}

impl From<AttributeError> for ArchetypeError {
    fn from(e: AttributeError) -> Self { ArchetypeError::Storage(e) }
}

/// Errors that can occur while moving an entity's row between archetypes.
///
/// ## Notes
/// The registry validates every migration before calling into the archetype,
/// so outside of direct archetype use these indicate broken invariants.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// The entity is not stored in the source archetype.
    UnknownEntity(Entity),

    /// The entity is already stored in the destination archetype.
    DuplicateEntity(Entity),

    /// The destination set is not the source set plus (or minus) exactly one id.
    DestinationMismatch {
        /// Source archetype's set.
        source: ComponentSet,
        /// Destination archetype's set.
        destination: ComponentSet,
    },

    /// The added value's type does not match the destination's new column.
    ValueTypeMismatch(TypeMismatchError),

    /// A column transfer failed part way.
    Storage {
        /// Component whose column failed.
        component_id: ComponentTypeId,
        /// Underlying column error.
        source_error: AttributeError,
    },
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::UnknownEntity(entity) => {
                write!(f, "entity {entity} is not in the source archetype")
            }
            MoveError::DuplicateEntity(entity) => {
                write!(f, "entity {entity} is already in the destination archetype")
            }
            MoveError::DestinationMismatch { source, destination } => write!(
                f,
                "destination set {destination} does not differ from source set {source} by one component"
            ),
            MoveError::ValueTypeMismatch(e) => write!(f, "added value rejected: {e}"),
            MoveError::Storage { component_id, source_error } => write!(
                f,
                "failed to move component {component_id}: {source_error}"
            ),
        }
    }
}

impl std::error::Error for MoveError {}

/// Error returned by the `Registry` facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ECSError {
    /// The entity handle is dead or stale.
    UnknownEntity(Entity),

    /// The entity already has a component of this type.
    DuplicateComponent {
        /// Target entity.
        entity: Entity,
        /// Rust type name of the component.
        component: &'static str,
    },

    /// The entity has no component of this type.
    ComponentNotFound {
        /// Target entity.
        entity: Entity,
        /// Rust type name of the component.
        component: &'static str,
    },

    /// The entity has no components at all.
    MissingArchetype(Entity),

    /// A bundle passed to `spawn` holds the same component type twice.
    DuplicateBundleComponent {
        /// Rust type name of the repeated component.
        component: &'static str,
    },

    /// A query named the same component type more than once.
    AliasedQuery,

    /// Entity slot allocation failed.
    Capacity(CapacityError),

    /// Component type registration failed.
    Registry(RegistryError),

    /// An archetype rejected the operation.
    Archetype(ArchetypeError),

    /// The registry configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for ECSError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ECSError::UnknownEntity(entity) => write!(f, "unknown or stale entity {entity}"),
            ECSError::DuplicateComponent { entity, component } => {
                write!(f, "entity {entity} already has a {component} component")
            }
            ECSError::ComponentNotFound { entity, component } => {
                write!(f, "entity {entity} has no {component} component")
            }
            ECSError::MissingArchetype(entity) => write!(f, "entity {entity} has no components"),
            ECSError::DuplicateBundleComponent { component } => {
                write!(f, "bundle holds more than one {component} component")
            }
            ECSError::AliasedQuery => f.write_str("query names the same component more than once"),
            ECSError::Capacity(e) => write!(f, "{e}"),
            ECSError::Registry(e) => write!(f, "{e}"),
            ECSError::Archetype(e) => write!(f, "{e}"),
            ECSError::Config(e) => write!(f, "invalid registry configuration: {e}"),
        }
    }
}

impl std::error::Error for ECSError {}

impl From<CapacityError> for ECSError {
    fn from(e: CapacityError) -> Self { ECSError::Capacity(e) }
}

impl From<RegistryError> for ECSError {
    fn from(e: RegistryError) -> Self { ECSError::Registry(e) }
}

impl From<ConfigError> for ECSError {
    fn from(e: ConfigError) -> Self { ECSError::Config(e) }
}

impl From<StaleEntityError> for ECSError {
    fn from(e: StaleEntityError) -> Self { ECSError::UnknownEntity(e.0) }
}

impl From<ArchetypeError> for ECSError {
    fn from(e: ArchetypeError) -> Self {
        match e {
            ArchetypeError::AliasedQuery => ECSError::AliasedQuery,
            other => ECSError::Archetype(other),
        }
    }
}
