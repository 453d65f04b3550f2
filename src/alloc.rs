//! Pluggable node storage. The only coupling between the core tree
//! operations and the storage strategy; swapping in a pooled or
//! slab-backed arena means implementing [`NodePolicy`], not touching
//! `tree.rs`.

use crate::node::{Node, NodeId};

/// Storage backend for tree nodes: allocate, retrieve, free, and bulk-kill.
/// Mirrors the shape of a pluggable storage-backend trait, generalized here
/// from a per-stride address-family store to a single uniform node arena.
///
/// A `free`d id may be reused by a later `store` call; an implementation
/// that wants to defer all release to `kill` (e.g. a true bump/arena
/// allocator with no free-list) may make `free` a no-op, at the cost of the
/// arena growing monotonically until the tree is dropped.
pub trait NodePolicy {
    fn init() -> Self
    where
        Self: Sized;

    /// Returns `None` if the policy cannot produce a new node (a capped
    /// arena is full, a bump allocator is out of space). The tree surfaces
    /// this as `TrieError::AllocationFailure` and leaves itself unchanged.
    fn store(&mut self, node: Node) -> Option<NodeId>;

    fn get(&self, id: NodeId) -> &Node;

    fn get_mut(&mut self, id: NodeId) -> &mut Node;

    fn free(&mut self, id: NodeId);

    /// Invoked once at tree teardown, after every live node has already
    /// been individually freed.
    fn kill(&mut self);
}

/// Default heap-backed policy: a flat `Vec<Node>` plus a free-list of
/// reusable slots. This is the storage strategy the tree uses unless a
/// caller supplies its own [`NodePolicy`].
#[derive(Debug, Default)]
pub struct VecPolicy {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
}

impl NodePolicy for VecPolicy {
    fn init() -> Self {
        VecPolicy {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    fn store(&mut self, node: Node) -> Option<NodeId> {
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = node;
            Some(id)
        } else {
            let id = NodeId::new(self.nodes.len() as u32);
            self.nodes.push(node);
            Some(id)
        }
    }

    fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn free(&mut self, id: NodeId) {
        self.free.push(id);
    }

    fn kill(&mut self) {
        self.nodes.clear();
        self.free.clear();
    }
}
