//! Randomized insert/remove soak test: generates a batch of bit strings of
//! varying length, inserts all of them, checks the two-reference invariant,
//! then removes a random subset and checks it again.

use std::error::Error;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use patricia_trie::PatriciaTrie;

fn random_key(rng: &mut StdRng) -> (Vec<u8>, u16) {
    let nbit: u16 = rng.random_range(0..=256);
    let nbytes = (nbit as usize + 7) / 8;
    let mut data = vec![0u8; nbytes];
    rng.fill(&mut data[..]);
    (data, nbit)
}

#[test]
fn random_keys_round_trip_with_validate() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut t: PatriciaTrie = PatriciaTrie::new();
    let mut inserted = Vec::new();

    for _ in 0..500 {
        let (data, nbit) = random_key(&mut rng);
        let was_new = t.lookup(&data, nbit).is_none();
        let (_, fresh) = t.insert(&data, nbit)?;
        if was_new {
            assert!(fresh);
            inserted.push((data, nbit));
        }
    }
    assert_eq!(t.len(), inserted.len());
    assert!(t.validate());

    inserted.shuffle(&mut rng);

    let split = inserted.len() / 2;
    for (data, nbit) in &inserted[..split] {
        assert!(t.remove(data, *nbit));
    }
    assert!(t.validate());
    assert_eq!(t.len(), inserted.len() - split);

    for (data, nbit) in &inserted[split..] {
        assert!(t.lookup(data, *nbit).is_some());
    }
    Ok(())
}
