//! # Engine Module
//!
//! Internal ECS storage implementation.
//!
//! This module contains the core building blocks:
//! - Entity handles and the slot allocator
//! - The component type registry
//! - Component columns and archetypes
//! - The archetype arena and set-trie index
//! - Component-set listeners and cached query groups
//! - Typed queries and the `Registry` facade
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod config;
pub mod entity;
pub mod component;
pub mod storage;
pub mod archetype;
pub mod arena;
pub mod set_trie;
pub mod events;
pub mod query;
pub mod manager;
