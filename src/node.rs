//! Node storage.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. Child
//! links own their target; the parent link is a plain index and never keeps a
//! node alive. Released slots go on a free list and are reused by later
//! insertions, so a `NodeId` is only meaningful until the next mutation.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::Key;

/// Handle of a node inside a [`Trie`](crate::Trie).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The root always occupies the first arena slot.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node<K, V> {
    /// Stored already masked to `bits`.
    pub(crate) key: K,
    pub(crate) bits: u8,
    /// `Some` iff the node holds an entry.
    pub(crate) value: Option<V>,
    pub(crate) children: [Option<NodeId>; 2],
    pub(crate) parent: Option<NodeId>,
}

impl<K: Key, V> Node<K, V> {
    fn vacant(parent: Option<NodeId>) -> Self {
        Self {
            key: K::default(),
            bits: 0,
            value: None,
            children: [None, None],
            parent,
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.children == [None, None]
    }

    #[inline]
    pub(crate) fn is_vacant(&self) -> bool {
        self.value.is_none()
    }

    /// Whether this node holds exactly the entry for (`key`, `bits`).
    /// `key` must already be masked.
    #[inline]
    pub(crate) fn holds(&self, key: K, bits: u8) -> bool {
        self.value.is_some() && self.bits == bits && self.key == key
    }

    /// Whether this node holds an entry that is a prefix of `key` no longer
    /// than `bits`.
    #[inline]
    pub(crate) fn holds_prefix_of(&self, key: K, bits: u8) -> bool {
        self.value.is_some() && self.bits <= bits && self.key == key.masked(self.bits)
    }

    #[inline]
    pub(crate) fn set(&mut self, key: K, bits: u8, value: V) {
        self.key = key;
        self.bits = bits;
        self.value = Some(value);
    }

    /// Vacates the node, returning its entry.
    pub(crate) fn take(&mut self) -> Option<(K, u8, V)> {
        let value = self.value.take()?;
        let entry = (self.key, self.bits, value);
        self.key = K::default();
        self.bits = 0;
        Some(entry)
    }

    /// Stores a new entry, returning the one it displaced.
    pub(crate) fn replace(&mut self, key: K, bits: u8, value: V) -> Option<(K, u8, V)> {
        let old = self.take();
        self.set(key, bits, value);
        old
    }
}

/// Arena of trie nodes with a free list.
#[derive(Clone, Debug)]
pub(crate) struct NodeArena<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<NodeId>,
}

impl<K: Key, V> NodeArena<K, V> {
    /// Creates an arena holding only a vacant root.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Node::vacant(None));
        Self {
            nodes,
            free: Vec::new(),
        }
    }

    /// Number of live nodes, root included.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub(crate) fn capacity_bytes(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node<K, V>>()
            + self.free.capacity() * std::mem::size_of::<NodeId>()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        // Trailing free slots can be dropped outright; interior holes stay.
        while let Some(last) = self.nodes.len().checked_sub(1) {
            let id = NodeId(last as u32);
            match self.free.iter().position(|&f| f == id) {
                Some(pos) if id != NodeId::ROOT => {
                    self.free.swap_remove(pos);
                    self.nodes.pop();
                }
                _ => break,
            }
        }
        self.nodes.shrink_to_fit();
        self.free.shrink_to_fit();
    }

    /// Allocates a vacant node under `parent`. The caller links it into the
    /// parent's child slot.
    pub(crate) fn alloc(&mut self, parent: NodeId) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Node::vacant(Some(parent));
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(Node::vacant(Some(parent)));
                id
            }
        }
    }

    /// Returns a slot to the free list. The node must already be unlinked.
    pub(crate) fn release(&mut self, id: NodeId) {
        debug_assert_ne!(id, NodeId::ROOT, "the root is never released");
        let node = &mut self.nodes[id.index()];
        node.value = None;
        node.children = [None, None];
        node.parent = None;
        node.bits = 0;
        self.free.push(id);
    }

    /// Resets the arena to a vacant root.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0] = Node::vacant(None);
        self.free.clear();
    }

    /// Looks up a live node.
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<K, V>> {
        let node = self.nodes.get(id.index())?;
        // Released slots have no parent; only the root legitimately lacks one.
        if node.parent.is_none() && id != NodeId::ROOT {
            return None;
        }
        Some(node)
    }
}

impl<K, V> Index<NodeId> for NodeArena<K, V> {
    type Output = Node<K, V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.index()]
    }
}

impl<K, V> IndexMut<NodeId> for NodeArena<K, V> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.index()]
    }
}

/// Read-only view of a trie node.
///
/// `key()` and `bits()` are meaningful only while the node holds an entry,
/// i.e. while `value()` is `Some`.
pub struct NodeRef<'a, K, V> {
    id: NodeId,
    node: &'a Node<K, V>,
}

impl<'a, K: Key, V> NodeRef<'a, K, V> {
    pub(crate) fn new(id: NodeId, node: &'a Node<K, V>) -> Self {
        Self { id, node }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The stored key, masked to `bits()`.
    pub fn key(&self) -> K {
        self.node.key
    }

    /// Number of significant bits of the stored key.
    pub fn bits(&self) -> u8 {
        self.node.bits
    }

    pub fn value(&self) -> Option<&'a V> {
        self.node.value.as_ref()
    }

    /// The stored entry, if any.
    pub fn entry(&self) -> Option<(K, u8, &'a V)> {
        let value = self.node.value.as_ref()?;
        Some((self.node.key, self.node.bits, value))
    }

    /// True when the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    pub fn is_vacant(&self) -> bool {
        self.node.is_vacant()
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.node.parent
    }

    /// Child in slot `bit` (`0` or `1`).
    pub fn child(&self, bit: usize) -> Option<NodeId> {
        self.node.children.get(bit).copied().flatten()
    }
}

impl<K, V> Clone for NodeRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<'_, K, V> {}

impl<K: Key, V: fmt::Debug> fmt::Debug for NodeRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("key", &self.node.key)
            .field("bits", &self.node.bits)
            .field("value", &self.node.value)
            .field("children", &self.node.children)
            .finish()
    }
}
