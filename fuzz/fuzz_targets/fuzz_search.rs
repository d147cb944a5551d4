#![no_main]

use acdat::automaton::{SearchMode, Traversal};
use acdat::dat::{Trie, TrieOptions};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    needles: Vec<&'a [u8]>,
    text: &'a [u8],
    mode: u8,
    use_tail: bool,
    dfs: bool,
}

fuzz_target!(|input: Input| {
    // Arbitrary needles may be rejected but must never corrupt the trie
    let mut trie = Trie::new(TrieOptions {
        use_tail: input.use_tail,
        ..TrieOptions::default()
    });
    for needle in input.needles.iter().take(64) {
        let _ = trie.insert_bytes(needle, needle);
    }
    assert!(trie.validate().is_ok());

    let traversal = if input.dfs { Traversal::Dfs } else { Traversal::Bfs };
    let dictionary = trie.freeze(traversal);
    if let Ok(found) = dictionary.search_bytes(input.text, SearchMode(input.mode)) {
        for occurrence in found {
            assert!(occurrence.start <= occurrence.end);
        }
    }
});
