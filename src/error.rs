use std::error::Error;
use std::fmt;

/// Failure modes the tree can report. Everything else (not-found on lookup,
/// a failed `remove`) is represented by plain `Option`/`bool` results, per
/// the external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieError {
    /// The node allocator could not produce a new node.
    AllocationFailure,
    /// A key longer than 65535 bits was supplied.
    KeyTooLong { bitlen: usize },
    /// A node handle passed to `evict` does not belong to this tree.
    ForeignNode,
}

impl fmt::Display for TrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrieError::AllocationFailure => {
                write!(f, "node allocator failed to produce a new node")
            }
            TrieError::KeyTooLong { bitlen } => {
                write!(f, "key length {bitlen} bits exceeds the 65535-bit maximum")
            }
            TrieError::ForeignNode => write!(f, "node does not belong to this tree"),
        }
    }
}

impl Error for TrieError {}
