//! # Set-trie index
//!
//! A prefix tree over strictly ascending key sequences. Each key set is stored
//! as the path of its elements from the root, and a node carries a value when a
//! stored set ends there:
//!
//! ```text
//! sets {1,3}, {1,2,4}, {2}
//!
//!        root
//!       /    \
//!      1      2*
//!     / \
//!    2   3*
//!    |
//!    4*
//! ```
//!
//! ## Queries
//! * **Exact**: follow one edge per key.
//! * **Superset**: every stored set containing all query keys. Because keys
//!   strictly increase with depth, a branch whose edge is larger than the next
//!   unmatched query key can never contain it and is skipped. Only edges `<=`
//!   that key are explored, so the cost is bounded by nodes compatible with the
//!   query rather than by the number of stored sets.
//!
//! The registry uses it with `ComponentTypeId` keys and `ArchetypeId` values,
//! but nothing here depends on either.

use std::collections::BTreeMap;

use crate::engine::error::SetTrieError;


#[derive(Debug)]
struct Node<K, V> {
    children: BTreeMap<K, Node<K, V>>,
    value: Option<V>,
}

impl<K, V> Default for Node<K, V> {
    fn default() -> Self {
        Self { children: BTreeMap::new(), value: None }
    }
}

impl<K, V> Node<K, V> {
    #[inline]
    fn is_prunable(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }
}

impl<K: Ord + Copy, V> Node<K, V> {
    fn remove(&mut self, keys: &[K]) -> Option<V> {
        let Some((head, rest)) = keys.split_first() else {
            return self.value.take();
        };

        let child = self.children.get_mut(head)?;
        let removed = child.remove(rest);
        if removed.is_some() && child.is_prunable() {
            self.children.remove(head);
        }
        removed
    }

    fn visit_all<'a>(&'a self, visit: &mut impl FnMut(&'a V)) {
        if let Some(value) = &self.value {
            visit(value);
        }
        for child in self.children.values() {
            child.visit_all(visit);
        }
    }

    fn visit_all_mut<'a>(&'a mut self, visit: &mut impl FnMut(&'a mut V)) {
        if let Some(value) = &mut self.value {
            visit(value);
        }
        for child in self.children.values_mut() {
            child.visit_all_mut(visit);
        }
    }

    fn visit_supersets<'a>(&'a self, query: &[K], visit: &mut impl FnMut(&'a V)) {
        let Some((head, rest)) = query.split_first() else {
            self.visit_all(visit);
            return;
        };

        for (key, child) in self.children.range(..=*head) {
            if key == head {
                child.visit_supersets(rest, visit);
            } else {
                child.visit_supersets(query, visit);
            }
        }
    }
}

/// Index from strictly ascending key sets to values.
///
/// ## Invariants
/// * Every leaf carries a value; valueless leaves are pruned on removal.
/// * `len` equals the number of nodes carrying a value.

#[derive(Debug)]
pub struct SetTrie<K, V> {
    root: Node<K, V>,
    len: usize,
}

impl<K, V> Default for SetTrie<K, V> {
    fn default() -> Self {
        Self { root: Node::default(), len: 0 }
    }
}

fn check_sorted<K: Ord>(keys: &[K]) -> Result<(), SetTrieError> {
    if keys.windows(2).all(|pair| pair[0] < pair[1]) {
        Ok(())
    } else {
        Err(SetTrieError::UnsortedKeySet)
    }
}

impl<K: Ord + Copy, V> SetTrie<K, V> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored key sets.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no key set is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` under `keys`, creating one node per key as needed.
    ///
    /// ## Errors
    /// - `UnsortedKeySet` if `keys` is not strictly ascending.
    /// - `DuplicateKeySet` if a value is already stored under `keys`.

    pub fn insert(&mut self, keys: &[K], value: V) -> Result<(), SetTrieError> {
        check_sorted(keys)?;

        let mut node = &mut self.root;
        for key in keys {
            node = node.children.entry(*key).or_default();
        }
        if node.value.is_some() {
            return Err(SetTrieError::DuplicateKeySet);
        }
        node.value = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the value stored under `keys`.
    ///
    /// Ancestors left with neither a value nor children are pruned on the way
    /// back up, so the trie never keeps dead branches.

    pub fn remove(&mut self, keys: &[K]) -> Option<V> {
        let removed = self.root.remove(keys);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Returns the value stored under exactly `keys`.
    pub fn find_exact(&self, keys: &[K]) -> Option<&V> {
        let mut node = &self.root;
        for key in keys {
            node = node.children.get(key)?;
        }
        node.value.as_ref()
    }

    /// Mutable form of [`SetTrie::find_exact`].
    pub fn find_exact_mut(&mut self, keys: &[K]) -> Option<&mut V> {
        let mut node = &mut self.root;
        for key in keys {
            node = node.children.get_mut(key)?;
        }
        node.value.as_mut()
    }

    /// Calls `visit` with every value whose key set contains all of `query`.
    ///
    /// `query` must be strictly ascending; an unsorted query is rejected rather
    /// than silently missing matches.

    pub fn for_each_superset<'a>(
        &'a self,
        query: &[K],
        mut visit: impl FnMut(&'a V),
    ) -> Result<(), SetTrieError> {
        check_sorted(query)?;
        self.root.visit_supersets(query, &mut visit);
        Ok(())
    }

    /// Collects every value whose key set contains all of `query`.
    ///
    /// The empty query matches everything. An unsorted query matches nothing.

    pub fn find_supersets(&self, query: &[K]) -> Vec<&V> {
        let mut found = Vec::new();
        // Unsorted queries are rejected by `for_each_superset` and yield no matches.
        let _ = self.for_each_superset(query, |value| found.push(value));
        found
    }

    /// Every stored value, in key order.
    pub fn values(&self) -> Vec<&V> {
        let mut found = Vec::with_capacity(self.len);
        self.root.visit_all(&mut |value| found.push(value));
        found
    }

    /// Calls `visit` with every stored value, in key order.
    pub fn for_each_value_mut(&mut self, mut visit: impl FnMut(&mut V)) {
        self.root.visit_all_mut(&mut visit);
    }
}
