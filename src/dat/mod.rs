//! Mutable build-side structures: the double-array trie and its helpers.
//!
//! - [`pool`] - growable index arena with an ordered free set
//! - [`child_list`] - sorted set of transition characters leaving a node
//! - [`needle`] - decoded needle strings
//! - [`tail`] - suffix runs compressed off the trie
//! - [`user_data`] - per-state payloads
//! - [`trie`] - needle insertion with collision repair and tail splitting

pub mod child_list;
pub mod needle;
pub mod pool;
pub mod tail;
pub mod trie;
pub mod user_data;

pub use child_list::ChildList;
pub use needle::Needle;
pub use pool::Pool;
pub use tail::{Tail, TailBuilder};
pub use trie::{Trie, TrieOptions};
pub use user_data::{UserData, UserDataList};

/// A Unicode code point. `0` is never a valid character.
pub type Character = i32;

/// Index of a trie/automaton state
pub type TrieIndex = i32;

/// Base offset of a state; negative values reference a tail run
pub type TrieBase = i32;

/// Index of a tail run
pub type TailIndex = i32;

/// Transition appended after the last character of every needle
pub const END_OF_TEXT: Character = 3;

/// Root state
pub const ROOT: TrieIndex = 1;

/// Base given to freshly created states before they receive children
pub const INITIAL_BASE: TrieBase = 1;

/// Errors reported while turning input into needles or inserting them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatError {
    /// The input is not well-formed UTF-8
    InvalidUtf8 { offset: usize },
    /// The input contains a character reserved by the automaton
    ReservedCharacter { offset: usize, character: Character },
    /// A needle must contain at least one character
    EmptyNeedle,
}

impl std::fmt::Display for DatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatError::InvalidUtf8 { offset } => {
                write!(f, "needle is not valid UTF-8 (byte {})", offset)
            }
            DatError::ReservedCharacter { offset, character } => {
                write!(f, "reserved character U+{:04X} at character {}", character, offset)
            }
            DatError::EmptyNeedle => write!(f, "needle is empty"),
        }
    }
}

impl std::error::Error for DatError {}

impl From<crate::utils::utf8::Utf8Error> for DatError {
    fn from(e: crate::utils::utf8::Utf8Error) -> Self {
        DatError::InvalidUtf8 { offset: e.offset }
    }
}
