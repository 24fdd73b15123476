//! # bitradix
//!
//! A binary radix trie over fixed-width integer keys (`u32` or `u64`) that
//! stores one value per (key, prefix length) pair and answers exact and
//! longest-prefix-match queries.
//!
//! Keys are consumed most significant bit first. A stored prefix never sits
//! deeper in the tree than its own length, so every prefix of a query key is
//! found on the single path the query key selects.
//!
//! ## Example
//!
//! ```rust
//! use bitradix::Trie32;
//!
//! let mut routes: Trie32<&str> = Trie32::new();
//! routes.insert(0x0A00_0000, 8, "10.0.0.0/8").unwrap();
//! routes.insert(0x0A01_0000, 16, "10.1.0.0/16").unwrap();
//!
//! assert_eq!(routes.lookup(0x0A01_0203), Some(&"10.1.0.0/16"));
//! assert_eq!(routes.lookup(0x0A02_0203), Some(&"10.0.0.0/8"));
//! assert_eq!(routes.lookup(0x0B00_0000), None);
//! ```

#![deny(unsafe_code)]

mod error;
mod key;
mod node;
mod walk;

pub use error::{Error, Result};
pub use key::Key;
pub use node::{NodeId, NodeRef};
pub use walk::{Branch, Iter, Walk};

use std::fmt;

use node::NodeArena;
use tracing::{debug, trace, warn};

/// Trie over 32-bit keys (IPv4 prefixes and the like).
pub type Trie32<V> = Trie<u32, V>;

/// Trie over 64-bit keys.
pub type Trie64<V> = Trie<u64, V>;

/// An entry taken out of the trie by [`Trie::remove`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detached<K, V> {
    /// Key masked to `bits`.
    pub key: K,
    pub bits: u8,
    pub value: V,
}

// =============================================================================
// Trie
// =============================================================================

/// Binary radix trie keyed by (key, significant bits).
///
/// Mutation takes `&mut self`; the trie does no internal locking.
#[derive(Clone)]
pub struct Trie<K, V> {
    nodes: NodeArena<K, V>,
    count: usize,
}

impl<K: Key, V> Trie<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty trie with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: NodeArena::with_capacity(capacity),
            count: 0,
        }
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of live nodes, vacant ones and the root included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.nodes.capacity_bytes()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Removes every entry, leaving a vacant root.
    pub fn clear(&mut self) {
        debug!(entries = self.count, nodes = self.nodes.len(), "clearing trie");
        self.nodes.clear();
        self.count = 0;
    }

    pub fn root(&self) -> NodeRef<'_, K, V> {
        NodeRef::new(NodeId::ROOT, &self.nodes[NodeId::ROOT])
    }

    /// View of a live node. Handles go stale after any mutation.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, K, V>> {
        self.nodes.get(id).map(|node| NodeRef::new(id, node))
    }

    /// Distance of a live node from the root.
    pub fn depth(&self, id: NodeId) -> Option<u8> {
        let mut node = self.nodes.get(id)?;
        let mut depth = 0u8;
        while let Some(parent) = node.parent {
            depth += 1;
            node = &self.nodes[parent];
        }
        Some(depth)
    }

    fn check_root(at: NodeId) -> Result<()> {
        if at == NodeId::ROOT {
            Ok(())
        } else {
            Err(Error::NotRoot(at))
        }
    }

    fn check_bits(bits: u8) -> Result<()> {
        if bits <= K::WIDTH {
            Ok(())
        } else {
            Err(Error::InvalidBitIndex {
                bits,
                width: K::WIDTH,
            })
        }
    }
}

// =============================================================================
// Insert
// =============================================================================

impl<K: Key, V> Trie<K, V> {
    /// Stores `value` for the `bits` most significant bits of `key`,
    /// overwriting any value already stored for that prefix.
    ///
    /// Returns the node that holds the entry.
    pub fn insert(&mut self, key: K, bits: u8, value: V) -> Result<NodeId> {
        self.insert_at(NodeId::ROOT, key, bits, value)
    }

    /// [`insert`](Self::insert) addressed by handle; `at` must be the root.
    pub fn insert_at(&mut self, at: NodeId, key: K, bits: u8, value: V) -> Result<NodeId> {
        Self::check_root(at)?;
        Self::check_bits(bits)?;
        let (id, old) = self.insert_from(at, 0, key.masked(bits), bits, value);
        if old.is_none() {
            self.count += 1;
        }
        Ok(id)
    }

    /// Inserts below `id`, which sits at `depth` on `key`'s path. `key` is
    /// masked and `depth <= bits`.
    ///
    /// Returns the node holding the entry and the value it overwrote.
    fn insert_from(
        &mut self,
        mut id: NodeId,
        mut depth: u8,
        key: K,
        bits: u8,
        value: V,
    ) -> (NodeId, Option<V>) {
        loop {
            debug_assert!(depth <= bits);
            let node = &mut self.nodes[id];

            if node.holds(key, bits) {
                return (id, node.value.replace(value));
            }

            if node.is_vacant() && (node.is_leaf() || depth == bits) {
                node.set(key, bits, value);
                return (id, None);
            }

            if depth == bits {
                // The node holds a longer prefix. It yields the slot and moves
                // one level down along its own next bit.
                if let Some((old_key, old_bits, old_value)) = node.replace(key, bits, value) {
                    debug_assert!(old_bits > depth);
                    trace!(node = %id, depth, evicted_bits = old_bits, "evicting longer prefix");
                    let child = self.child_or_attach(id, old_key.bit(depth));
                    self.insert_from(child, depth + 1, old_key, old_bits, old_value);
                }
                return (id, None);
            }

            let next = key.bit(depth);

            if node.is_leaf() {
                // Occupied leaf holding another entry: split it.
                let (cur_key, cur_bits) = (node.key, node.bits);
                if cur_bits > depth {
                    let cur = cur_key.bit(depth);
                    if cur != next {
                        trace!(node = %id, depth, "splitting diverging keys");
                        if let Some((k, b, v)) = self.nodes[id].take() {
                            let moved = self.attach(id, cur);
                            self.nodes[moved].set(k, b, v);
                        }
                        id = self.attach(id, next);
                        depth += 1;
                        continue;
                    }
                    if bits < cur_bits {
                        trace!(node = %id, depth, "shorter prefix takes the slot");
                        if let Some((k, b, v)) = self.nodes[id].replace(key, bits, value) {
                            let moved = self.attach(id, cur);
                            self.nodes[moved].set(k, b, v);
                        }
                        return (id, None);
                    }
                }
                // The existing entry stays; the new one continues below it.
                id = self.attach(id, next);
                depth += 1;
                continue;
            }

            id = self.child_or_attach(id, next);
            depth += 1;
        }
    }

    /// Allocates a new child in slot `bit` of `parent`.
    fn attach(&mut self, parent: NodeId, bit: usize) -> NodeId {
        debug_assert!(self.nodes[parent].children[bit].is_none());
        let child = self.nodes.alloc(parent);
        self.nodes[parent].children[bit] = Some(child);
        child
    }

    fn child_or_attach(&mut self, parent: NodeId, bit: usize) -> NodeId {
        match self.nodes[parent].children[bit] {
            Some(child) => child,
            None => self.attach(parent, bit),
        }
    }
}

// =============================================================================
// Remove
// =============================================================================

impl<K: Key, V> Trie<K, V> {
    /// Removes the entry stored for exactly (`key`, `bits`).
    ///
    /// Returns `Ok(None)` when no such entry exists; the tree is then left
    /// untouched.
    pub fn remove(&mut self, key: K, bits: u8) -> Result<Option<Detached<K, V>>> {
        self.remove_at(NodeId::ROOT, key, bits)
    }

    /// [`remove`](Self::remove) addressed by handle; `at` must be the root.
    pub fn remove_at(&mut self, at: NodeId, key: K, bits: u8) -> Result<Option<Detached<K, V>>> {
        Self::check_root(at)?;
        Self::check_bits(bits)?;

        let key = key.masked(bits);
        let Some(id) = self.locate(key, bits) else {
            return Ok(None);
        };
        let Some((key, bits, value)) = self.nodes[id].take() else {
            return Ok(None);
        };
        self.count -= 1;
        self.prune(id);
        Ok(Some(Detached { key, bits, value }))
    }

    /// Finds the node holding exactly (`key`, `bits`); `key` is masked.
    fn locate(&self, key: K, bits: u8) -> Option<NodeId> {
        let mut id = NodeId::ROOT;
        let mut depth = 0u8;
        loop {
            let node = &self.nodes[id];
            if node.holds(key, bits) {
                return Some(id);
            }
            // Entries never sit deeper than their own length.
            if depth >= bits {
                return None;
            }
            id = node.children[key.bit(depth)]?;
            depth += 1;
        }
    }

    /// Compacts the tree after the entry at `id` was taken out.
    fn prune(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        match node.parent {
            Some(parent) if node.is_leaf() => {
                self.unlink(parent, id);
                self.collapse(parent);
            }
            _ => self.collapse(id),
        }
    }

    /// Walks upward from `id` merging vacant nodes with their only child.
    fn collapse(&mut self, mut id: NodeId) {
        loop {
            let node = &self.nodes[id];
            if !node.is_vacant() {
                return;
            }
            let children = node.children;
            match children {
                [None, None] => {
                    // The root may stay vacant.
                    let Some(parent) = node.parent else {
                        return;
                    };
                    trace!(node = %id, "dropping vacant leaf");
                    self.unlink(parent, id);
                    id = parent;
                }
                [Some(only), None] | [None, Some(only)] => {
                    if !self.nodes[only].is_leaf() {
                        return;
                    }
                    trace!(node = %id, child = %only, "absorbing single leaf child");
                    let absorbed = self.nodes[only].take();
                    self.unlink(id, only);
                    match absorbed {
                        Some((key, bits, value)) => self.nodes[id].set(key, bits, value),
                        // A vacant child leaves `id` a vacant leaf; look again.
                        None => continue,
                    }
                    match self.nodes[id].parent {
                        Some(parent) => id = parent,
                        None => return,
                    }
                }
                [Some(_), Some(_)] => return,
            }
        }
    }

    /// Detaches `child` from `parent` and frees it.
    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        for slot in self.nodes[parent].children.iter_mut() {
            if *slot == Some(child) {
                *slot = None;
            }
        }
        self.nodes.release(child);
    }
}

// =============================================================================
// Find
// =============================================================================

impl<K: Key, V> Trie<K, V> {
    /// Longest-prefix match: the entry with the most significant bits, at
    /// most `bits`, whose prefix matches `key`.
    ///
    /// An entry for exactly (`key`, `bits`) is returned as soon as it is
    /// reached.
    pub fn find(&self, key: K, bits: u8) -> Result<Option<NodeRef<'_, K, V>>> {
        self.find_at(NodeId::ROOT, key, bits)
    }

    /// [`find`](Self::find) addressed by handle; `at` must be the root.
    pub fn find_at(&self, at: NodeId, key: K, bits: u8) -> Result<Option<NodeRef<'_, K, V>>> {
        Self::check_root(at)?;
        Self::check_bits(bits)?;
        Ok(self.find_from(key, bits).and_then(|id| self.node(id)))
    }

    fn find_from(&self, key: K, bits: u8) -> Option<NodeId> {
        let mut best: Option<(NodeId, u8)> = None;
        let mut id = NodeId::ROOT;
        let mut depth = 0u8;
        loop {
            let node = &self.nodes[id];
            if node.holds_prefix_of(key, bits) {
                if node.bits == bits {
                    return Some(id);
                }
                if best.map_or(true, |(_, best_bits)| node.bits >= best_bits) {
                    best = Some((id, node.bits));
                }
            }
            // Nodes below hold entries longer than `bits`.
            if depth >= bits {
                break;
            }
            match node.children[key.bit(depth)] {
                Some(child) => id = child,
                None => break,
            }
            depth += 1;
        }
        best.map(|(id, _)| id)
    }

    /// Value of the longest stored prefix of `key` (a full-width lookup).
    pub fn lookup(&self, key: K) -> Option<&V> {
        let id = self.find_from(key, K::WIDTH)?;
        self.nodes[id].value.as_ref()
    }

    /// Value stored for exactly (`key`, `bits`). `None` as well when `bits`
    /// exceeds the key width.
    pub fn get(&self, key: K, bits: u8) -> Option<&V> {
        if bits > K::WIDTH {
            return None;
        }
        let id = self.locate(key.masked(bits), bits)?;
        self.nodes[id].value.as_ref()
    }

    pub fn get_mut(&mut self, key: K, bits: u8) -> Option<&mut V> {
        if bits > K::WIDTH {
            return None;
        }
        let id = self.locate(key.masked(bits), bits)?;
        self.nodes[id].value.as_mut()
    }

    pub fn contains(&self, key: K, bits: u8) -> bool {
        self.get(key, bits).is_some()
    }
}

// =============================================================================
// Traversal
// =============================================================================

impl<K: Key, V> Trie<K, V> {
    /// Visits every node in level order together with the branch that led to
    /// it ([`Branch::Root`] for the root).
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(NodeRef<'_, K, V>, Branch),
    {
        for (node, branch) in self.nodes() {
            visit(node, branch);
        }
    }

    /// Like [`walk`](Self::walk), stopping at the first visitor error.
    pub fn try_walk<F, E>(&self, mut visit: F) -> std::result::Result<(), E>
    where
        F: FnMut(NodeRef<'_, K, V>, Branch) -> std::result::Result<(), E>,
    {
        self.nodes().try_for_each(|(node, branch)| visit(node, branch))
    }

    /// Level-order iterator over all nodes.
    pub fn nodes(&self) -> Walk<'_, K, V> {
        Walk::new(&self.nodes)
    }

    /// Level-order iterator over stored entries as (key, bits, value).
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.nodes())
    }
}

impl<K: Key, V> Default for Trie<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V: fmt::Debug> fmt::Debug for Trie<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<K: Key, V> Extend<(K, u8, V)> for Trie<K, V> {
    fn extend<I: IntoIterator<Item = (K, u8, V)>>(&mut self, iter: I) {
        for (key, bits, value) in iter {
            if let Err(err) = self.insert(key, bits, value) {
                warn!(%err, "skipping prefix");
            }
        }
    }
}

impl<K: Key, V> FromIterator<(K, u8, V)> for Trie<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, u8, V)>>(iter: I) -> Self {
        let mut trie = Self::new();
        trie.extend(iter);
        trie
    }
}


#[cfg(test)]
mod proptests;
