//! Frozen dictionary: automaton, tail runs and payloads, ready to be searched,
//! stored and shared between threads.
//!
//! - [`writer`] / [`reader`] - binary file format
//! - [`build`] - building from a word list
//! - [`stats`] - size breakdown

pub mod build;
pub mod reader;
pub mod stats;
pub mod writer;

pub use build::{BuildReport, SkippedLine, build_from_bytes, build_from_word_list};
pub use stats::DictionaryStats;

use crate::automaton::{Automaton, Occurrence, SearchMode, Traversal, search};
use crate::dat::{Character, Needle, Tail, Trie, UserDataList};
use crate::utils::utf8::{self, Utf8Error};

/// Read-only automaton bundle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dictionary {
    automaton: Automaton,
    tail: Tail,
    user_data: UserDataList,
}

impl Dictionary {
    /// Assemble a dictionary; the payload table is padded to one record per state
    pub fn new(automaton: Automaton, tail: Tail, mut user_data: UserDataList) -> Self {
        user_data.resize(automaton.len());
        Self {
            automaton,
            tail,
            user_data,
        }
    }

    #[inline]
    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    #[inline]
    pub fn tail(&self) -> &Tail {
        &self.tail
    }

    #[inline]
    pub fn user_data(&self) -> &UserDataList {
        &self.user_data
    }

    /// Search decoded characters
    pub fn search_characters(&self, query: &[Character], mode: SearchMode) -> Vec<Occurrence<'_>> {
        search(&self.automaton, &self.tail, Some(&self.user_data), query, mode)
    }

    /// Search a string
    pub fn search(&self, text: &str, mode: SearchMode) -> Vec<Occurrence<'_>> {
        let query: Vec<Character> = text.chars().map(|c| c as Character).collect();
        self.search_characters(&query, mode)
    }

    /// Search raw bytes, which must be valid UTF-8
    pub fn search_bytes(&self, bytes: &[u8], mode: SearchMode) -> Result<Vec<Occurrence<'_>>, Utf8Error> {
        let query = utf8::decode(bytes)?;
        Ok(self.search_characters(&query, mode))
    }

    /// Whether `needle` is one of the dictionary's needles
    pub fn contains(&self, needle: &str) -> bool {
        !self.search(needle, SearchMode(SearchMode::EXACT)).is_empty()
    }

    /// Payload of an exact needle
    pub fn get(&self, needle: &Needle) -> Option<&[u8]> {
        self.search_characters(needle.as_slice(), SearchMode(SearchMode::EXACT | SearchMode::USER_DATA))
            .into_iter()
            .next()
            .and_then(|o| o.user_data)
    }
}

impl Trie {
    /// Consume the trie into a searchable dictionary
    pub fn freeze(self, traversal: Traversal) -> Dictionary {
        let automaton = Automaton::build(&self, traversal);
        let (tail, user_data) = self.into_parts();
        Dictionary::new(automaton, tail.freeze(), user_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::TrieOptions;

    fn dictionary(use_tail: bool) -> Dictionary {
        let mut trie = Trie::new(TrieOptions {
            use_tail,
            ..TrieOptions::default()
        });
        trie.insert_with_data("apple", b"fruit").unwrap();
        trie.insert_with_data("app", b"short").unwrap();
        trie.insert("pie").unwrap();
        trie.freeze(Traversal::Bfs)
    }

    #[test]
    fn test_contains() {
        for use_tail in [true, false] {
            let dict = dictionary(use_tail);
            assert!(dict.contains("apple"));
            assert!(dict.contains("app"));
            assert!(dict.contains("pie"));
            assert!(!dict.contains("appl"));
            assert!(!dict.contains("applepie"));
        }
    }

    #[test]
    fn test_get_payload() {
        let dict = dictionary(true);
        assert_eq!(dict.get(&"apple".parse().unwrap()), Some(&b"fruit"[..]));
        assert_eq!(dict.get(&"pie".parse().unwrap()), None);
    }

    #[test]
    fn test_user_data_sized_to_automaton() {
        let dict = dictionary(true);
        assert_eq!(dict.user_data().len(), dict.automaton().len());
    }

    #[test]
    fn test_search_bytes_rejects_invalid() {
        let dict = dictionary(true);
        assert!(dict.search_bytes(b"app\xff", SearchMode::default()).is_err());
        let found = dict.search_bytes(b"applepie", SearchMode::default()).unwrap();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_dictionary_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dictionary>();
    }
}
