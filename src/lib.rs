//! # acdat - Aho-Corasick search over a double-array trie
//!
//! acdat finds every occurrence of a fixed set of needles in a text in one pass.
//! Needles are inserted into a double-array trie whose non-branching suffixes are
//! moved into a tail array; the trie is then frozen into an Aho-Corasick automaton
//! that can be searched concurrently, stored to disk and served over a socket.
//!
//! ## Architecture
//!
//! - [`dat`] - Double-array trie with tail compression (build phase)
//! - [`automaton`] - Frozen automaton: fail/output links and search
//! - [`dictionary`] - Automaton + tail + payloads, binary file format, word-list builder
//! - [`server`] - Socket server, binary protocol and client
//! - [`output`] - Result formatting
//! - [`utils`] - UTF-8 codec, little-endian encoding, app config, progress
//!
//! ## Quick Start
//!
//! ```
//! use acdat::automaton::{SearchMode, Traversal};
//! use acdat::dat::{Trie, TrieOptions};
//!
//! let mut trie = Trie::new(TrieOptions::default());
//! for needle in ["he", "she", "his", "hers"] {
//!     trie.insert(needle).unwrap();
//! }
//! let dictionary = trie.freeze(Traversal::Bfs);
//!
//! let found = dictionary.search("ahishers", SearchMode(SearchMode::NEEDLE));
//! let needles: Vec<_> = found.iter().filter_map(|o| o.needle.as_deref()).collect();
//! assert_eq!(needles, ["his", "she", "he", "hers"]);
//! ```
//!
//! ## Performance
//!
//! Transitions are one addition and one comparison in a flat cell array. Tail
//! compression keeps long needles from spending one cell per character, and a
//! stored dictionary is memory-mapped on load.

pub mod automaton;
pub mod dat;
pub mod dictionary;
pub mod output;
pub mod server;
pub mod utils;
