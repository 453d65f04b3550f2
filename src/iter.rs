//! Six-mode iteration (pre/in/post × forward/reverse) over a tree's
//! downlink structure, driven by a small finite state machine backed by a
//! bounded parent cache instead of an unbounded explicit stack.

use log::error;

use crate::alloc::NodePolicy;
use crate::bits::getbit;
use crate::node::NodeId;
use crate::tree::PatriciaTrie;

/// Traversal order. A node is yielded on entry in `Pre`, between its two
/// children in `In`, and after both children in `Post`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IterOrder {
    Pre,
    In,
    Post,
}

/// Visitation direction. `Forward` treats child `0` as the first side and
/// child `1` as the second; `Reverse` swaps them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Head,
    Down,
    UpC1,
    UpC2,
    Tail,
}

/// Capacity of the bounded ancestor cache; must be a power of two.
const CACHE_CAPACITY: usize = 8;

/// A bounded cache of recently-visited ancestors, addressed as a ring
/// buffer. Behaves as a capacity-bounded stack: `push` remembers the most
/// recent parent, `pop` returns it. Once full, a further `push` silently
/// discards the oldest (least likely to be needed again) entry rather than
/// growing -- the iterator falls back to a recovery descent from the
/// iteration root whenever `pop` finds the cache empty.
struct ParentCache {
    buf: [NodeId; CACHE_CAPACITY],
    top: usize,
    next: usize,
}

impl ParentCache {
    fn new(filler: NodeId) -> Self {
        ParentCache {
            buf: [filler; CACHE_CAPACITY],
            top: 0,
            next: 0,
        }
    }

    fn push(&mut self, id: NodeId) {
        self.buf[self.next] = id;
        self.next = (self.next + 1) % CACHE_CAPACITY;
        if self.top < CACHE_CAPACITY {
            self.top += 1;
        }
    }

    fn pop(&mut self) -> Option<NodeId> {
        if self.top == 0 {
            return None;
        }
        self.next = (self.next + CACHE_CAPACITY - 1) % CACHE_CAPACITY;
        self.top -= 1;
        Some(self.buf[self.next])
    }

    fn clear(&mut self) {
        self.top = 0;
        self.next = 0;
    }
}

/// A resumable iterator over the downlink structure of a [`PatriciaTrie`].
/// Construct via [`PatriciaTrie::iter`]. A walk may be paused between any
/// two `next`/`prev` calls; the iterator's state, cursor and cache fully
/// capture the continuation, so it may simply be dropped and later
/// reconstructed is not needed -- it is `Send` wherever the borrowed tree
/// is, and holding it alive is itself the pause.
pub struct Iter<'a, P: NodePolicy> {
    trie: &'a PatriciaTrie<P>,
    order: IterOrder,
    dir: Direction,
    state: State,
    cur: NodeId,
    root: NodeId,
    parents: ParentCache,
}

impl<'a, P: NodePolicy> Iter<'a, P> {
    pub(crate) fn new(trie: &'a PatriciaTrie<P>, root: NodeId, order: IterOrder, dir: Direction) -> Self {
        let sentinel = trie.sentinel_id();
        let state = if root == sentinel { State::Tail } else { State::Head };
        Iter {
            trie,
            order,
            dir,
            state,
            cur: root,
            root,
            parents: ParentCache::new(sentinel),
        }
    }

    fn sides(&self, backward: bool) -> (usize, usize) {
        let forward_sides = match self.dir {
            Direction::Forward => (0, 1),
            Direction::Reverse => (1, 0),
        };
        if backward {
            (forward_sides.1, forward_sides.0)
        } else {
            forward_sides
        }
    }

    fn yields_on(&self, state: State, backward: bool) -> bool {
        match (self.order, backward) {
            (IterOrder::Pre, false) => state == State::Down,
            (IterOrder::Pre, true) => state == State::UpC2,
            (IterOrder::In, false) => state == State::UpC1,
            (IterOrder::In, true) => state == State::UpC2,
            (IterOrder::Post, false) => state == State::UpC2,
            (IterOrder::Post, true) => state == State::Down,
        }
    }

    /// Recovers the immediate parent of `target` by re-descending from the
    /// iteration root along `target`'s own key bits, refilling the cache
    /// with every intermediate ancestor visited along the way (the last
    /// one pushed is the parent returned).
    fn recover_parent(&mut self, target: NodeId) -> Option<NodeId> {
        if target == self.root {
            return None;
        }
        let (data, nbit) = {
            let n = self.trie.view(target);
            (n.data().to_vec(), n.nbit())
        };
        let mut cur = self.root;
        loop {
            let cur_bpos = self.trie.view(cur).bpos();
            let dir = getbit(&data, nbit, cur_bpos) as usize;
            let next = self.trie.raw_child(cur, dir);
            self.parents.push(cur);
            if next == target {
                return Some(cur);
            }
            if next == self.trie.sentinel_id() {
                error!("iteration recovery descent failed to reach target node");
                return None;
            }
            cur = next;
        }
    }

    fn parent_of(&mut self, node: NodeId) -> Option<NodeId> {
        self.parents.pop().or_else(|| self.recover_parent(node))
    }

    fn step(&mut self, backward: bool) -> Option<NodeId> {
        loop {
            match self.state {
                State::Head => {
                    self.cur = self.root;
                    self.state = State::Down;
                }
                State::Down => {
                    let yields_here = self.yields_on(State::Down, backward);
                    if yields_here {
                        let out = self.cur;
                        self.advance_from_down(backward);
                        return Some(out);
                    }
                    self.advance_from_down(backward);
                }
                State::UpC1 => {
                    let yields_here = self.yields_on(State::UpC1, backward);
                    if yields_here {
                        let out = self.cur;
                        self.advance_from_up_c1(backward);
                        return Some(out);
                    }
                    self.advance_from_up_c1(backward);
                }
                State::UpC2 => {
                    let yields_here = self.yields_on(State::UpC2, backward);
                    if yields_here {
                        let out = self.cur;
                        self.advance_from_up_c2(backward);
                        return Some(out);
                    }
                    self.advance_from_up_c2(backward);
                }
                State::Tail => return None,
            }
        }
    }

    /// From `Down`, try to descend along the first side; if there is no
    /// real child there, behave as though we already returned from it.
    fn advance_from_down(&mut self, backward: bool) {
        let (first, _second) = self.sides(backward);
        if self.trie.is_downlink(self.cur, first) {
            self.parents.push(self.cur);
            self.cur = self.trie.raw_child(self.cur, first);
            self.state = State::Down;
        } else {
            self.state = State::UpC1;
        }
    }

    /// From `UpC1`, try to descend along the second side; if there is none,
    /// behave as though we already returned from it.
    fn advance_from_up_c1(&mut self, backward: bool) {
        let (_first, second) = self.sides(backward);
        if self.trie.is_downlink(self.cur, second) {
            self.parents.push(self.cur);
            self.cur = self.trie.raw_child(self.cur, second);
            self.state = State::Down;
        } else {
            self.state = State::UpC2;
        }
    }

    /// From `UpC2`, this node is fully visited; climb to its parent and
    /// determine which side it was reached from so the parent's state is
    /// set correctly.
    fn advance_from_up_c2(&mut self, backward: bool) {
        let finished = self.cur;
        match self.parent_of(finished) {
            None => {
                self.state = State::Tail;
            }
            Some(parent) => {
                let (first, _second) = self.sides(backward);
                let reached_via_first = self.trie.is_downlink(parent, first)
                    && self.trie.raw_child(parent, first) == finished;
                self.cur = parent;
                self.state = if reached_via_first {
                    State::UpC1
                } else {
                    State::UpC2
                };
            }
        }
    }

    /// Resets the iterator to its initial `Head` state, discarding the
    /// ancestor cache.
    pub fn reset(&mut self) {
        self.parents.clear();
        let sentinel = self.trie.sentinel_id();
        self.state = if self.root == sentinel { State::Tail } else { State::Head };
        self.cur = self.root;
    }

    /// Steps backward within the same walk. See the module docs for how
    /// `Down` and `UpC2` (and `UpC1`'s dual role) swap under reversal.
    pub fn prev(&mut self) -> Option<NodeId> {
        self.step(true)
    }
}

impl<'a, P: NodePolicy> Iterator for Iter<'a, P> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.step(false)
    }
}

impl<P: NodePolicy> PatriciaTrie<P> {
    /// Builds an iterator over the tree's real nodes in the given mode,
    /// starting from the tree's actual root (the sentinel's `child[0]`).
    pub fn iter(&self, order: IterOrder, dir: Direction) -> Iter<'_, P> {
        let root = self.raw_child(self.sentinel_id(), 0);
        Iter::new(self, root, order, dir)
    }

    /// Like [`Self::iter`], but rooted at an arbitrary node already known
    /// to belong to this tree (for iterating a subtree).
    pub fn iter_from(&self, root: NodeId, order: IterOrder, dir: Direction) -> Iter<'_, P> {
        Iter::new(self, root, order, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::VecPolicy;
    use std::collections::HashSet;

    fn key(s: &str) -> (Vec<u8>, u16) {
        (s.as_bytes().to_vec(), (s.len() * 8) as u16)
    }

    fn build(words: &[&str]) -> PatriciaTrie<VecPolicy> {
        let mut t = PatriciaTrie::new();
        for w in words {
            let (k, n) = key(w);
            t.insert(&k, n).unwrap();
        }
        t
    }

    #[test]
    fn empty_tree_yields_nothing_in_any_mode() {
        let t: PatriciaTrie<VecPolicy> = PatriciaTrie::new();
        for order in [IterOrder::Pre, IterOrder::In, IterOrder::Post] {
            for dir in [Direction::Forward, Direction::Reverse] {
                let mut it = t.iter(order, dir);
                assert!(it.next().is_none());
            }
        }
    }

    #[test]
    fn single_key_yields_exactly_one_node() {
        let t = build(&["solo"]);
        for order in [IterOrder::Pre, IterOrder::In, IterOrder::Post] {
            for dir in [Direction::Forward, Direction::Reverse] {
                let mut it = t.iter(order, dir);
                assert!(it.next().is_some());
                assert!(it.next().is_none());
            }
        }
    }

    #[test]
    fn iteration_visits_every_node_exactly_once_in_all_six_modes() {
        let words = ["a", "b", "ab", "abc", "bat", "cat", "car"];
        let t = build(&words);
        for order in [IterOrder::Pre, IterOrder::In, IterOrder::Post] {
            for dir in [Direction::Forward, Direction::Reverse] {
                let mut seen = HashSet::new();
                for id in t.iter(order, dir) {
                    assert!(seen.insert(id), "duplicate yield in {order:?}/{dir:?}");
                }
                assert_eq!(seen.len(), words.len(), "missing yields in {order:?}/{dir:?}");
            }
        }
    }

    #[test]
    fn pre_order_forward_matches_post_order_reverse_mirrored() {
        let words = ["a", "b", "ab", "abc", "bat", "cat", "car", "dog", "do"];
        let t = build(&words);
        let pre_fwd: Vec<NodeId> = t.iter(IterOrder::Pre, Direction::Forward).collect();
        let mut post_rev: Vec<NodeId> = t.iter(IterOrder::Post, Direction::Reverse).collect();
        post_rev.reverse();
        assert_eq!(pre_fwd, post_rev);
    }

    #[test]
    fn in_order_forward_matches_reversed_in_order_reverse() {
        let words = ["a", "b", "ab", "abc", "bat", "cat", "car", "dog", "do"];
        let t = build(&words);
        let in_fwd: Vec<NodeId> = t.iter(IterOrder::In, Direction::Forward).collect();
        let mut in_rev: Vec<NodeId> = t.iter(IterOrder::In, Direction::Reverse).collect();
        in_rev.reverse();
        assert_eq!(in_fwd, in_rev);
    }

    #[test]
    fn post_order_tolerates_deleting_the_just_yielded_node() {
        let mut t = build(&["one", "two", "three", "four", "five", "six"]);
        let mut deleted = 0;
        loop {
            let id = {
                let mut it = t.iter(IterOrder::Post, Direction::Forward);
                it.next()
            };
            match id {
                Some(id) => {
                    assert!(t.evict(id));
                    deleted += 1;
                }
                None => break,
            }
        }
        assert_eq!(deleted, 6);
        assert_eq!(t.len(), 0);
    }
}
