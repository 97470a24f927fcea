//! Dense, type-homogeneous component columns.
//!
//! This module implements [`Attribute<T>`], the per-type growable array an
//! archetype keeps for each component in its set, and [`ComponentColumn`], the
//! type-erased interface archetypes hold them behind.
//!
//! # Storage model
//!
//! Values are packed contiguously with no gaps. Row `i` of every column in an
//! archetype belongs to the same entity, so every mutating operation here is
//! designed to be applied to all columns of an archetype in lock-step.
//!
//! # Core operations
//!
//! - **Append**: `push` writes at the end in amortized `O(1)`.
//! - **Remove**: `swap_remove` deletes in `O(1)` by moving the last element into
//!   the vacated row. The previously-last row ceases to exist, so the caller must
//!   relocate that entity's bookkeeping.
//! - **Transfer**: `move_from` pops a row out of another column of the same type
//!   (swap-removing there) and appends it here. This is the primitive used to
//!   migrate an entity between archetypes.
//!
//! These operations preserve dense packing but **not** element order.
//!
//! # Type erasure
//!
//! [`ComponentColumn`] exposes the element `TypeId`, a human-readable type name,
//! `Any` downcasting hooks, and dynamically-typed mirrors of the typed
//! operations. Every dynamic entry point checks the element type before it
//! downcasts, and reports a `TypeMismatch` instead of touching storage when the
//! check fails.

use std::any::{type_name, Any, TypeId};

use crate::engine::error::{AttributeError, TypeMismatchError};


/// Type-erased interface over an [`Attribute<T>`].
///
/// ## Invariants
/// Implementors must keep `length()` equal to the number of stored values and
/// must only accept values (or source columns) whose element type matches
/// `element_type_id()`.

pub trait ComponentColumn: Any + Send + Sync {
    /// Number of values stored.
    fn length(&self) -> usize;

    /// Returns an immutable type-erased reference for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable type-erased reference for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// `TypeId` of the element type.
    fn element_type_id(&self) -> TypeId;

    /// Human-readable name of the element type.
    fn element_type_name(&self) -> &'static str;

    /// Creates a zero-length column of the same element type.
    ///
    /// Used as a template when building the columns of a new archetype.
    fn empty_like(&self) -> Box<dyn ComponentColumn>;

    /// Appends a dynamically-typed value and returns its row.
    fn push_dyn(&mut self, value: Box<dyn Any + Send>) -> Result<usize, AttributeError>;

    /// Swap-removes the value at `index`, dropping it.
    ///
    /// Returns the row the last value was moved from, if a move happened.
    fn swap_remove_dyn(&mut self, index: usize) -> Result<Option<usize>, AttributeError>;

    /// Swap-removes the value at `index` and hands it back boxed.
    fn swap_remove_take_dyn(
        &mut self,
        index: usize,
    ) -> Result<(Box<dyn Any + Send>, Option<usize>), AttributeError>;

    /// Moves the value at `index` out of `source` and appends it here.
    ///
    /// Returns the destination row and the source row that was moved into
    /// `index` by the swap-remove, if any.
    fn move_from_dyn(
        &mut self,
        source: &mut dyn ComponentColumn,
        index: usize,
    ) -> Result<(usize, Option<usize>), AttributeError>;
}

/// Growable, densely packed storage for one component type.
///
/// # Performance Characteristics
///
/// - Appending (`push`) is amortized O(1).
/// - Removing with `swap_remove` is O(1).
/// - Indexed read/write is O(1).
/// - Iteration walks one contiguous slice.

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<T> {
    values: Vec<T>,
}

impl<T> Default for Attribute<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T> Attribute<T> {
    /// Creates an empty column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty column with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity) }
    }

    /// Number of values stored.
    #[inline]
    pub fn length(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the column holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    fn out_of_range(&self, index: usize) -> AttributeError {
        AttributeError::IndexOutOfRange { index, length: self.values.len() }
    }

    /// Appends `value` and returns its row.
    #[inline]
    pub fn push(&mut self, value: T) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    /// Removes the value at `index` by moving the last value into its place.
    ///
    /// ## Returns
    /// The removed value and, when `index` was not the last row, the row the
    /// moved value came from (always the old last row).
    ///
    /// ## Errors
    /// `IndexOutOfRange` if `index >= length()`.

    pub fn swap_remove(&mut self, index: usize) -> Result<(T, Option<usize>), AttributeError> {
        if index >= self.values.len() {
            return Err(self.out_of_range(index));
        }

        let last = self.values.len() - 1;
        let removed = self.values.swap_remove(index);
        let moved_from = (index != last).then_some(last);
        Ok((removed, moved_from))
    }

    /// Mutable access to the value at `index`.
    ///
    /// ## Errors
    /// `IndexOutOfRange` if `index >= length()`.

    pub fn at(&mut self, index: usize) -> Result<&mut T, AttributeError> {
        let length = self.values.len();
        self.values
            .get_mut(index)
            .ok_or(AttributeError::IndexOutOfRange { index, length })
    }

    /// Shared access to the value at `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }

    /// Mutable access to the value at `index`, or `None` past the end.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(index)
    }

    /// Moves the value at `index` out of `source` and appends it here.
    ///
    /// `source` is swap-removed at `index`; the returned pair is the new row in
    /// `self` and the source row that was relocated into `index`, if any.

    pub fn move_from(
        &mut self,
        source: &mut Attribute<T>,
        index: usize,
    ) -> Result<(usize, Option<usize>), AttributeError> {
        let (value, moved_from) = source.swap_remove(index)?;
        Ok((self.push(value), moved_from))
    }

    /// All values as a slice, in row order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// All values as a mutable slice, in row order.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Iterates over values in row order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    /// Iterates mutably over values in row order.
    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.values.iter_mut()
    }
}

impl<T: Any + Send + Sync> Attribute<T> {
    fn mismatch(actual: &'static str) -> AttributeError {
        AttributeError::TypeMismatch(TypeMismatchError { expected: type_name::<T>(), actual })
    }
}

impl<T: Any + Send + Sync> ComponentColumn for Attribute<T> {
    fn length(&self) -> usize {
        self.values.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn element_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn empty_like(&self) -> Box<dyn ComponentColumn> {
        Box::new(Attribute::<T>::new())
    }

    fn push_dyn(&mut self, value: Box<dyn Any + Send>) -> Result<usize, AttributeError> {
        let value = value
            .downcast::<T>()
            .map_err(|_| Self::mismatch("<dynamic value>"))?;
        Ok(self.push(*value))
    }

    fn swap_remove_dyn(&mut self, index: usize) -> Result<Option<usize>, AttributeError> {
        self.swap_remove(index).map(|(_, moved_from)| moved_from)
    }

    fn swap_remove_take_dyn(
        &mut self,
        index: usize,
    ) -> Result<(Box<dyn Any + Send>, Option<usize>), AttributeError> {
        let (value, moved_from) = self.swap_remove(index)?;
        Ok((Box::new(value), moved_from))
    }

    fn move_from_dyn(
        &mut self,
        source: &mut dyn ComponentColumn,
        index: usize,
    ) -> Result<(usize, Option<usize>), AttributeError> {
        let actual = source.element_type_name();
        if source.element_type_id() != TypeId::of::<T>() {
            return Err(Self::mismatch(actual));
        }

        let source = source
            .as_any_mut()
            .downcast_mut::<Attribute<T>>()
            .ok_or_else(|| Self::mismatch(actual))?;
        self.move_from(source, index)
    }
}
