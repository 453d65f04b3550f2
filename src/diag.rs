//! Plain-consumer diagnostics: a human-readable dump and a GraphViz DOT
//! rendering, built entirely on the public pre-order iterator and the
//! downlink test -- nothing here reaches into the arena directly, so a
//! caller could reimplement either function outside this crate.

use std::fmt::Write as _;

use crate::alloc::NodePolicy;
use crate::iter::{Direction, IterOrder};
use crate::tree::PatriciaTrie;

/// Renders every key currently held by the tree, one per line, in pre-order.
/// Each line is `<bpos>:<nbit> <hex bytes>`.
pub fn dump_text<P: NodePolicy>(trie: &PatriciaTrie<P>) -> String {
    let mut out = String::new();
    for id in trie.iter(IterOrder::Pre, Direction::Forward) {
        let n = trie.view(id);
        let _ = write!(out, "{}:{} ", n.bpos(), n.nbit());
        for byte in n.data() {
            let _ = write!(out, "{byte:02x}");
        }
        out.push('\n');
    }
    out
}

/// Renders the tree's downlink structure as a GraphViz DOT graph. Uplinks
/// are never drawn: they are a descent shortcut, not a tree edge, and
/// including them would turn the diagram into an unreadable tangle of
/// back-edges.
pub fn dump_dot<P: NodePolicy>(trie: &PatriciaTrie<P>) -> String {
    let mut out = String::new();
    out.push_str("digraph trie {\n");
    out.push_str("  node [shape=box, fontname=monospace];\n");
    for id in trie.iter(IterOrder::Pre, Direction::Forward) {
        let n = trie.view(id);
        let mut label = String::new();
        let _ = write!(label, "bpos={} nbit={}\\n", n.bpos(), n.nbit());
        for byte in n.data() {
            let _ = write!(label, "{byte:02x}");
        }
        let _ = writeln!(out, "  n{} [label=\"{}\"];", id.index(), label);
        for side in 0..2 {
            if trie.is_downlink(id, side) {
                let child = trie.raw_child(id, side);
                let _ = writeln!(out, "  n{} -> n{} [label=\"{}\"];", id.index(), child.index(), side);
            }
        }
    }
    out.push_str("}\n");
    out
}
