//! Scenario-level test: a corpus of words with heavy prefix overlap,
//! inserted, validated, then deleted one at a time with the two-reference
//! invariant re-checked after every step.

use std::error::Error;

use patricia_trie::PatriciaTrie;

const WORDS: &[&str] = &[
    "a", "ab", "abc", "abcd", "abcde", "ac", "acc", "accent", "accept", "access", "act",
    "actor", "actress", "actual", "ad", "ada", "add", "adder", "address", "adjust", "admin",
    "ant", "anti", "antique", "any", "anybody", "anyhow", "anyone", "anything", "anyway",
    "ba", "bat", "batch", "bath", "bathe", "be", "bear", "beard", "beast", "beat",
    "bed", "bee", "beef", "been", "beer", "bell", "belt", "bench", "bend", "bent",
    "cat", "catch", "cater", "car", "card", "care", "career", "careful", "cargo", "carp",
    "cart", "case", "cash", "cast", "castle", "cat1", "cat2", "cats", "catty", "cause",
    "do", "dog", "dogs", "doing", "doe", "does", "dot", "dote", "doubt", "dough",
    "ear", "ears", "earth", "ease", "east", "easy", "eat", "eats", "ebb", "echo",
    "fan", "fancy", "far", "fare", "farm", "fast", "fat", "fate", "father", "fault",
    "go", "goat",
];

#[test]
fn corpus_insert_validate_delete_validate() -> Result<(), Box<dyn Error>> {
    let mut t: PatriciaTrie = PatriciaTrie::new();

    for w in WORDS {
        let (_, inserted) = t.insert(w.as_bytes(), (w.len() * 8) as u16)?;
        assert!(inserted, "expected fresh insert for {w:?}");
    }
    assert_eq!(t.len(), WORDS.len());
    assert!(t.validate(), "invariant failed after full insert");

    for w in WORDS {
        assert!(
            t.lookup(w.as_bytes(), (w.len() * 8) as u16).is_some(),
            "missing key {w:?} after insert"
        );
    }

    for (i, w) in WORDS.iter().enumerate() {
        assert!(t.remove(w.as_bytes(), (w.len() * 8) as u16), "remove failed for {w:?}");
        assert!(t.validate(), "invariant failed after deleting {w:?} (step {i})");
        for remaining in &WORDS[i + 1..] {
            assert!(
                t.lookup(remaining.as_bytes(), (remaining.len() * 8) as u16)
                    .is_some(),
                "lost {remaining:?} after deleting {w:?}"
            );
        }
    }
    assert_eq!(t.len(), 0);
    assert!(t.is_empty());
    Ok(())
}

#[test]
fn corpus_iteration_matches_node_count() -> Result<(), Box<dyn Error>> {
    use patricia_trie::{Direction, IterOrder};

    let mut t: PatriciaTrie = PatriciaTrie::new();
    for w in WORDS {
        t.insert(w.as_bytes(), (w.len() * 8) as u16)?;
    }
    for order in [IterOrder::Pre, IterOrder::In, IterOrder::Post] {
        for dir in [Direction::Forward, Direction::Reverse] {
            let count = t.iter(order, dir).count();
            assert_eq!(count, WORDS.len(), "{order:?}/{dir:?} visited wrong count");
        }
    }
    Ok(())
}
