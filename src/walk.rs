//! Level-order traversal.

use std::collections::VecDeque;
use std::fmt;

use crate::node::{NodeArena, NodeId, NodeRef};
use crate::Key;

/// Which child slot led to a node during a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Branch {
    /// The walk's starting node.
    Root,
    Zero,
    One,
}

impl Branch {
    fn from_slot(slot: usize) -> Self {
        if slot == 0 {
            Branch::Zero
        } else {
            Branch::One
        }
    }

    /// The bit consumed to take this branch, `None` for the root.
    pub fn bit(self) -> Option<usize> {
        match self {
            Branch::Root => None,
            Branch::Zero => Some(0),
            Branch::One => Some(1),
        }
    }
}

/// `-1` for the root, otherwise the branch bit.
impl From<Branch> for i8 {
    fn from(branch: Branch) -> Self {
        match branch {
            Branch::Root => -1,
            Branch::Zero => 0,
            Branch::One => 1,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i8::from(*self))
    }
}

/// Breadth-first iterator over every node, vacant ones included.
///
/// Children are queued slot 0 before slot 1.
pub struct Walk<'a, K, V> {
    arena: &'a NodeArena<K, V>,
    queue: VecDeque<(NodeId, Branch)>,
}

impl<'a, K: Key, V> Walk<'a, K, V> {
    pub(crate) fn new(arena: &'a NodeArena<K, V>) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back((NodeId::ROOT, Branch::Root));
        Self { arena, queue }
    }
}

impl<'a, K: Key, V> Iterator for Walk<'a, K, V> {
    type Item = (NodeRef<'a, K, V>, Branch);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, branch) = self.queue.pop_front()?;
        let arena = self.arena;
        let node = &arena[id];
        for (slot, child) in node.children.iter().enumerate() {
            if let Some(child) = *child {
                self.queue.push_back((child, Branch::from_slot(slot)));
            }
        }
        Some((NodeRef::new(id, node), branch))
    }
}

/// Level-order iterator over stored entries.
pub struct Iter<'a, K, V> {
    walk: Walk<'a, K, V>,
}

impl<'a, K: Key, V> Iter<'a, K, V> {
    pub(crate) fn new(walk: Walk<'a, K, V>) -> Self {
        Self { walk }
    }
}

impl<'a, K: Key, V> Iterator for Iter<'a, K, V> {
    type Item = (K, u8, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.by_ref().find_map(|(node, _)| node.entry())
    }
}
