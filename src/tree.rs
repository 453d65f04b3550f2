//! The tree itself: sentinel root, insert, lookup, prefix, remove, evict
//! and the non-recursive funnel teardown.

use std::cell::Cell;
use std::collections::HashMap;
use std::marker::PhantomData;

use log::{debug, error, trace};

use crate::alloc::{NodePolicy, VecPolicy};
use crate::bits::{bitdiff, equkey, getbit, MAX_BITLEN};
use crate::error::TrieError;
use crate::iter::{Direction, IterOrder};
use crate::node::{Node, NodeId, NodeRef};

/// A mutable, in-memory compressed radix-2 trie over arbitrary-length bit
/// strings, with a dual-use node representation: every node is
/// simultaneously a routing node and a terminal key holder.
///
/// The tree is single-threaded: there is no internal locking or atomics. A
/// tree may be moved across a thread boundary but must not be shared
/// without external synchronization.
pub struct PatriciaTrie<P: NodePolicy = VecPolicy> {
    policy: P,
    sentinel: NodeId,
    len: usize,
    /// Opts the type out of auto-derived `Sync`: a shared `&PatriciaTrie`
    /// gives no path to mutation, but nothing stops someone from wrapping
    /// one in their own `unsafe impl Sync` cell, so the type says plainly
    /// that it isn't meant to be accessed from multiple threads at once.
    _not_sync: PhantomData<Cell<()>>,
}

impl PatriciaTrie<VecPolicy> {
    /// Builds an empty tree backed by the default heap arena. `VecPolicy`
    /// never fails to allocate the sentinel, so this is infallible.
    pub fn new() -> Self {
        Self::with_policy(VecPolicy::init())
            .expect("VecPolicy never fails to allocate the sentinel")
    }
}

impl Default for PatriciaTrie<VecPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: NodePolicy> PatriciaTrie<P> {
    /// Builds an empty tree backed by a caller-supplied node policy. Fails
    /// if the policy cannot even produce the single sentinel node.
    pub fn with_policy(mut policy: P) -> Result<Self, TrieError> {
        let placeholder = Node {
            child: [NodeId::new(0); 2],
            bpos: 0,
            nbit: 0,
            data: Vec::new(),
        };
        let sentinel = policy.store(placeholder).ok_or(TrieError::AllocationFailure)?;
        {
            let s = policy.get_mut(sentinel);
            s.child = [sentinel, sentinel];
        }
        debug!("trie initialized");
        Ok(PatriciaTrie {
            policy,
            sentinel,
            len: 0,
            _not_sync: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn root(&self) -> NodeId {
        self.policy.get(self.sentinel).child[0]
    }

    pub(crate) fn sentinel_id(&self) -> NodeId {
        self.sentinel
    }

    pub(crate) fn raw_child(&self, id: NodeId, i: usize) -> NodeId {
        self.policy.get(id).child[i]
    }

    pub(crate) fn is_downlink(&self, id: NodeId, i: usize) -> bool {
        let parent_bpos = self.policy.get(id).bpos;
        let child = self.policy.get(id).child[i];
        self.policy.get(child).bpos > parent_bpos
    }

    /// Resolves a node id into a read-only view. Panics if `id` was freed;
    /// callers only ever hold ids handed back by this tree.
    pub fn view(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef {
            id,
            node: self.policy.get(id),
        }
    }

    /// Shared descent used by exact lookup, prefix lookup, and insert's
    /// locate step: follow `child[getbit(key, nbit, cur.bpos)]` starting
    /// from the sentinel, stopping the instant the edge just taken is an
    /// uplink (the next node's `bpos` no greater than the current one's).
    /// Starting at the sentinel rather than at `root()` lets the empty-tree
    /// case (where the sentinel self-loops) fall out of the same loop
    /// without a special case.
    fn descend(&self, key: &[u8], nbit: u16) -> NodeId {
        let mut cur = self.sentinel;
        loop {
            let cur_bpos = self.policy.get(cur).bpos;
            let dir = getbit(key, nbit, cur_bpos) as usize;
            let next = self.policy.get(cur).child[dir];
            let next_bpos = self.policy.get(next).bpos;
            if next_bpos <= cur_bpos {
                return next;
            }
            cur = next;
        }
    }

    /// Exact lookup (§4.4).
    pub fn lookup(&self, key: &[u8], nbit: u16) -> Option<NodeRef<'_>> {
        let t = self.descend(key, nbit);
        if t == self.sentinel {
            return None;
        }
        let node = self.policy.get(t);
        if equkey(key, nbit, &node.data, node.nbit) {
            Some(NodeRef { id: t, node })
        } else {
            None
        }
    }

    /// Longest-prefix lookup (§4.5).
    pub fn prefix(&self, key: &[u8], nbit: u16) -> Option<NodeRef<'_>> {
        if nbit == 0 {
            return None;
        }
        let mut cur = self.sentinel;
        let mut best: Option<NodeId> = None;
        loop {
            let cur_bpos = self.policy.get(cur).bpos;
            let dir = getbit(key, nbit, cur_bpos) as usize;
            let next = self.policy.get(cur).child[dir];
            let next_bpos = self.policy.get(next).bpos;
            let is_down = next_bpos > cur_bpos;
            if next != self.sentinel {
                let n = self.policy.get(next);
                if n.nbit <= nbit && n.nbit > 0 && equkey(key, n.nbit, &n.data, n.nbit) {
                    best = Some(next);
                }
            }
            if !is_down {
                return best.map(|id| NodeRef {
                    id,
                    node: self.policy.get(id),
                });
            }
            cur = next;
        }
    }

    /// Insert (§4.6). Returns the matched or newly created node and whether
    /// it was freshly inserted.
    pub fn insert(&mut self, key: &[u8], nbit: u16) -> Result<(NodeRef<'_>, bool), TrieError> {
        if nbit as usize > MAX_BITLEN {
            return Err(TrieError::KeyTooLong {
                bitlen: nbit as usize,
            });
        }
        trace!("insert: nbit={nbit}");

        // Step 1 -- locate.
        let t = self.descend(key, nbit);
        if t != self.sentinel {
            let tn = self.policy.get(t);
            if equkey(key, nbit, &tn.data, tn.nbit) {
                return Ok((
                    NodeRef {
                        id: t,
                        node: self.policy.get(t),
                    },
                    false,
                ));
            }
        }

        // Step 2 -- branch position. `t == sentinel` only happens on a
        // genuinely empty tree; comparing an empty-bitlen key against the
        // sentinel's own placeholder (nbit == 0 too) is indistinguishable
        // under tail extension and `bitdiff` would return 0, which collides
        // with the sentinel's reserved `bpos`. Every other case -- any real
        // key against the sentinel, or any key against a real node -- always
        // yields a bit position of 1 or greater.
        let b = if t == self.sentinel && nbit == 0 {
            1
        } else {
            let tn = self.policy.get(t);
            bitdiff(key, nbit, &tn.data, tn.nbit)
        };

        // Step 4 -- depth-limited re-descent to find the splice point.
        let mut last = self.sentinel;
        let (dir, next) = loop {
            let last_bpos = self.policy.get(last).bpos;
            let dir = getbit(key, nbit, last_bpos) as usize;
            let next = self.policy.get(last).child[dir];
            let next_bpos = self.policy.get(next).bpos;
            let is_down = next_bpos > last_bpos;
            if !is_down || next_bpos >= b {
                break (dir, next);
            }
            last = next;
        };

        // Step 3 -- allocate.
        let full = (nbit as usize + 7) / 8;
        let mut data = Vec::with_capacity(full + 1);
        data.extend_from_slice(&key[..full]);
        data.push(0);
        let x = self
            .policy
            .store(Node {
                child: [self.sentinel; 2],
                bpos: b,
                nbit,
                data,
            })
            .ok_or(TrieError::AllocationFailure)?;

        // Step 5 -- splice.
        let ndir = getbit(key, nbit, b) as usize;
        {
            let xn = self.policy.get_mut(x);
            xn.child[ndir] = x;
            xn.child[1 - ndir] = next;
        }
        self.policy.get_mut(last).child[dir] = x;
        self.len += 1;
        trace!("insert: spliced new node at bpos={b}");

        Ok((
            NodeRef {
                id: x,
                node: self.policy.get(x),
            },
            true,
        ))
    }

    /// Finds the topological context `(g, p, matched)` for `key`/`nbit` by
    /// descending exactly as [`Self::descend`] does, but remembering the
    /// last two nodes visited: `p` (the predecessor, whose uplink reaches
    /// the match) and `g` (its parent). Used by delete for both the
    /// by-key and by-node entry points.
    fn find_g_p(&self, key: &[u8], nbit: u16) -> (NodeId, NodeId, NodeId) {
        let mut g = self.sentinel;
        let mut path_len = 0u32;
        let mut cur = self.sentinel;
        loop {
            let cur_bpos = self.policy.get(cur).bpos;
            let dir = getbit(key, nbit, cur_bpos) as usize;
            let next = self.policy.get(cur).child[dir];
            let next_bpos = self.policy.get(next).bpos;
            if next_bpos <= cur_bpos {
                return (g, cur, next);
            }
            if path_len >= 1 {
                g = cur;
            }
            path_len += 1;
            cur = next;
        }
    }

    /// Finds `z`, the unique node whose downlink reaches `x`, by
    /// re-descending from the sentinel using `x`'s own key -- the same
    /// path insert's depth-limited re-descent walked when `x` was spliced
    /// in.
    fn find_z(&self, x: NodeId, key: &[u8], nbit: u16) -> NodeId {
        let mut cur = self.sentinel;
        loop {
            let cur_bpos = self.policy.get(cur).bpos;
            let dir = getbit(key, nbit, cur_bpos) as usize;
            let next = self.policy.get(cur).child[dir];
            if next == x {
                return cur;
            }
            cur = next;
        }
    }

    fn other_idx(&self, a: NodeId, b: NodeId) -> usize {
        if self.policy.get(a).child[0] == b {
            1
        } else {
            0
        }
    }

    fn child_idx(&self, a: NodeId, b: NodeId) -> usize {
        if self.policy.get(a).child[1] == b {
            1
        } else {
            0
        }
    }

    /// Delete (§4.7): recovers the four-pointer context for `x` and
    /// performs the bypass-then-replace rewiring.
    fn delete_node(&mut self, x: NodeId) -> Result<(), TrieError> {
        if x == self.sentinel {
            return Err(TrieError::ForeignNode);
        }
        let (key, nbit) = {
            let n = self.policy.get(x);
            (n.data.clone(), n.nbit)
        };
        let (g, p, matched) = self.find_g_p(&key, nbit);
        if matched != x {
            error!("evict: node does not belong to this tree");
            return Err(TrieError::ForeignNode);
        }

        // Step I -- bypass.
        let g_idx = self.child_idx(g, p);
        let p_other = self.other_idx(p, x);
        let bypass_target = self.policy.get(p).child[p_other];
        self.policy.get_mut(g).child[g_idx] = bypass_target;
        trace!("delete: bypassed predecessor, g={g:?} now points at {bypass_target:?}");

        // Step II -- replace (only when the match is not its own predecessor).
        if p != x {
            let z = self.find_z(x, &key, nbit);
            let z_idx = self.child_idx(z, x);
            let (xc0, xc1, xbpos) = {
                let xn = self.policy.get(x);
                (xn.child[0], xn.child[1], xn.bpos)
            };
            self.policy.get_mut(z).child[z_idx] = p;
            let pn = self.policy.get_mut(p);
            pn.child[0] = xc0;
            pn.child[1] = xc1;
            pn.bpos = xbpos;
            trace!("delete: predecessor {p:?} replaced node at bpos={xbpos}");
        }

        self.policy.free(x);
        self.len -= 1;
        debug!("delete: removed node, {} remaining", self.len);
        Ok(())
    }

    /// Remove by key (§6 `remove`): exact lookup followed by delete.
    pub fn remove(&mut self, key: &[u8], nbit: u16) -> bool {
        let t = self.descend(key, nbit);
        if t == self.sentinel {
            return false;
        }
        let matches = {
            let n = self.policy.get(t);
            equkey(key, nbit, &n.data, n.nbit)
        };
        if !matches {
            return false;
        }
        self.delete_node(t).is_ok()
    }

    /// Checks the two-incoming-reference invariant: every real node is the
    /// target of exactly two child slots across the whole tree (one
    /// downlink from its true parent, one uplink from the unique node
    /// threaded back to it), counting the sentinel's own two slots as part
    /// of the tally. Used by the corpus-level test as the structural
    /// sanity check after a run of inserts and deletes.
    pub fn validate(&self) -> bool {
        let mut counts: HashMap<NodeId, u32> = HashMap::new();
        let mut tally = |id: NodeId| {
            for side in 0..2 {
                let child = self.raw_child(id, side);
                *counts.entry(child).or_insert(0) += 1;
            }
        };
        tally(self.sentinel);
        for id in self.iter(IterOrder::Pre, Direction::Forward) {
            tally(id);
        }
        for id in self.iter(IterOrder::Pre, Direction::Forward) {
            if counts.get(&id).copied().unwrap_or(0) != 2 {
                return false;
            }
        }
        true
    }

    /// Remove by node handle (§6 `evict`): re-derives the four-pointer
    /// context from the node's own key, so a handle from another tree (or
    /// a stale handle into a reused slot) is rejected rather than
    /// corrupting whatever it happens to resolve to here.
    pub fn evict(&mut self, node: NodeId) -> bool {
        self.delete_node(node).is_ok()
    }

    /// Funnel teardown (§4.8): a non-recursive O(n) flatten into a dead
    /// list, consumed here in place of a recursive free that could
    /// overflow the stack on a deep tree.
    pub fn destroy(mut self) {
        self.funnel_teardown(|_| {});
    }

    /// Like [`Self::destroy`], but invokes `on_free` for every node in
    /// funnel order before it is released, mirroring the payload-deleter
    /// callback named in the external interface.
    pub fn destroy_with<F: FnMut(NodeRef<'_>)>(mut self, on_free: F) {
        self.funnel_teardown(on_free);
    }

    fn funnel_teardown<F: FnMut(NodeRef<'_>)>(&mut self, mut on_free: F) {
        let sentinel = self.sentinel;
        let mut hold = self.policy.get(sentinel).child[0];
        {
            let s = self.policy.get_mut(sentinel);
            s.child[0] = sentinel;
            s.child[1] = sentinel;
        }
        if hold == sentinel {
            return;
        }

        // Walk the right spine to its end and terminate it unambiguously.
        let mut spine = hold;
        while self.is_downlink(spine, 1) {
            spine = self.policy.get(spine).child[1];
        }
        self.policy.get_mut(spine).child[1] = sentinel;

        let mut dead = Vec::with_capacity(self.len);
        loop {
            if hold == sentinel {
                break;
            }
            let hold_bpos = self.policy.get(hold).bpos;
            let left = self.policy.get(hold).child[0];
            let left_bpos = self.policy.get(left).bpos;
            let next = if left_bpos <= hold_bpos {
                self.policy.get(hold).child[1]
            } else {
                let right = self.policy.get(hold).child[1];
                let mut tail = left;
                while self.is_downlink(tail, 1) {
                    tail = self.policy.get(tail).child[1];
                }
                self.policy.get_mut(tail).child[1] = right;
                left
            };
            self.policy.get_mut(hold).bpos = 0;
            dead.push(hold);
            hold = next;
        }

        for &id in &dead {
            on_free(NodeRef {
                id,
                node: self.policy.get(id),
            });
        }
        for id in dead {
            self.policy.free(id);
        }
        self.len = 0;
        self.policy.kill();
        debug!("destroy: funnel teardown complete");
    }
}
