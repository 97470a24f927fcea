//! # ECS Core
//!
//! Archetype-based entity-component storage.
//!
//! Entities sharing the same set of component types live together in one
//! archetype, with each component type packed into its own dense column. A
//! set-trie index over the archetypes' component sets answers "which archetypes
//! hold all of these components" without scanning every archetype.
//!
//! ## Design Goals
//! - Dense, type-homogeneous columns for cache-friendly iteration
//! - Stable entity handles that detect use after destruction
//! - All-or-nothing structural changes
//! - Safe, explicit data access
//!
//! ## Example
//! ```
//! use ecs_core::prelude::*;
//!
//! struct Position { x: f32 }
//! struct Velocity { v: f32 }
//!
//! let mut registry = Registry::new();
//! let e = registry.create_entity().unwrap();
//! registry.add_component(e, Position { x: 1.0 }).unwrap();
//! registry.add_component(e, Velocity { v: 0.5 }).unwrap();
//!
//! registry
//!     .for_each2::<Position, Velocity>(|_, position, velocity| position.x += velocity.v)
//!     .unwrap();
//! assert_eq!(registry.get_component::<Position>(e).unwrap().x, 1.5);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::manager::Registry;

pub use engine::entity::{Entities, Entity};

pub use engine::component::{Bundle, Component, ComponentDesc, TypeRegistry};

pub use engine::storage::{Attribute, ComponentColumn};

pub use engine::archetype::{Archetype, MigrationOutcome};

pub use engine::arena::{ArchetypeArena, ArchetypeId};

pub use engine::set_trie::SetTrie;

pub use engine::events::{ComponentSetEvents, ComponentSetListener, ListenerId};

pub use engine::config::RegistryConfig;

pub use engine::error::{
    ArchetypeError,
    AttributeError,
    CapacityError,
    ConfigError,
    ECSError,
    ECSResult,
    MoveError,
    RegistryError,
    SetTrieError,
    StaleEntityError,
    TypeMismatchError,
};

pub use engine::types::{
    ComponentSet,
    ComponentTypeId,
    GenerationID,
    SlotID,
    COMPONENT_CAP,
    DEFAULT_ENTITY_CAPACITY,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use ecs_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Bundle,
        Component,
        ComponentSet,
        ComponentSetListener,
        ECSError,
        ECSResult,
        Entity,
        ListenerId,
        Registry,
        RegistryConfig,
    };
}
