//! The dual-use node and the index newtype addressing it in the arena.

/// A `Copy` index into a tree's node arena, standing in for a pointer.
///
/// Nodes are self-referential (self-links) and mutually cyclic (threaded
/// uplinks), which a naive owning pointer tree cannot express without
/// unsafe code or reference counting with manual cycle breaking. An index
/// sidesteps the problem entirely: it is cheap to copy, cheap to compare,
/// and the sentinel's self-loop is just an ordinary integer equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(idx: u32) -> Self {
        NodeId(idx)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Every node is simultaneously a routing node and a terminal key holder;
/// there is no separate leaf/internal distinction. `child[i]` is a
/// *downlink* (a true structural edge) when the target's `bpos` is
/// strictly greater than this node's own `bpos`, and an *uplink* (a
/// threaded back-edge, possibly to itself) otherwise.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) child: [NodeId; 2],
    pub(crate) bpos: u16,
    pub(crate) nbit: u16,
    /// `ceil(nbit / 8)` packed key bytes plus one trailing zero byte, not
    /// counted in `nbit`, kept only so byte-oriented code never reads past
    /// the end of the buffer.
    pub(crate) data: Vec<u8>,
}

/// Read-only view of a node handed out by lookups and iteration. Child
/// slots and `bpos` are deliberately not exposed: callers can observe a
/// node's key and branch position but must never mutate tree topology
/// directly.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    pub(crate) id: NodeId,
    pub(crate) node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn bpos(&self) -> u16 {
        self.node.bpos
    }

    pub fn nbit(&self) -> u16 {
        self.node.nbit
    }

    /// The key's packed bytes, `ceil(nbit / 8)` long. Does not include the
    /// trailing convenience byte.
    pub fn data(&self) -> &'a [u8] {
        let full = (self.node.nbit as usize + 7) / 8;
        &self.node.data[..full]
    }
}
