//! Frozen Aho-Corasick automaton over the double-array layout.
//!
//! Cells keep the trie's `base`/`check` pair and add `fail` and `output` links.
//! A state is a *candidate* when a needle may end there: it either owns an
//! [`END_OF_TEXT`] transition or is a tail leaf whose run still has to be compared
//! against the query. `output` points at the nearest candidate on the fail chain.

pub mod build;
pub mod search;

pub use build::Traversal;
pub use search::{Occurrence, SearchMode, search};

use crate::dat::{Character, END_OF_TEXT, ROOT, TailIndex, TrieBase, TrieIndex};

/// One automaton state; a free cell is all zeros
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutomatonCell {
    pub base: TrieBase,
    pub check: TrieIndex,
    pub fail: TrieIndex,
    pub output: TrieIndex,
}

/// Immutable automaton, shared read-only between searches
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Automaton {
    cells: Vec<AutomatonCell>,
}

impl Automaton {
    pub fn from_cells(cells: Vec<AutomatonCell>) -> Self {
        Self { cells }
    }

    /// Number of cells, including the reserved cell 0
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn cells(&self) -> &[AutomatonCell] {
        &self.cells
    }

    #[inline]
    fn cell(&self, state: TrieIndex) -> AutomatonCell {
        usize::try_from(state)
            .ok()
            .and_then(|i| self.cells.get(i))
            .copied()
            .unwrap_or_default()
    }

    #[inline]
    pub fn base(&self, state: TrieIndex) -> TrieBase {
        self.cell(state).base
    }

    #[inline]
    pub fn check(&self, state: TrieIndex) -> TrieIndex {
        self.cell(state).check
    }

    #[inline]
    pub fn fail(&self, state: TrieIndex) -> TrieIndex {
        self.cell(state).fail
    }

    #[inline]
    pub fn output(&self, state: TrieIndex) -> TrieIndex {
        self.cell(state).output
    }

    /// Whether `state` is the root or owned by some parent
    #[inline]
    pub fn is_occupied(&self, state: TrieIndex) -> bool {
        state == ROOT || (state > 0 && self.check(state) > 0)
    }

    /// Goto function: the state reached from `state` on `c`, if any
    #[inline]
    pub fn child(&self, state: TrieIndex, c: Character) -> Option<TrieIndex> {
        let base = self.base(state);
        if state <= 0 || base <= 0 {
            return None;
        }
        let target = base.checked_add(c)?;
        (self.check(target) == state).then_some(target)
    }

    /// Tail index owned by a leaf
    #[inline]
    pub fn tail_index(&self, state: TrieIndex) -> Option<TailIndex> {
        let base = self.base(state);
        if base < 0 { base.checked_neg() } else { None }
    }

    /// Where the payload of a needle ending at `state` lives: the leaf itself,
    /// or its end-of-text child
    pub fn terminal(&self, state: TrieIndex) -> Option<TrieIndex> {
        if state == ROOT || !self.is_occupied(state) {
            return None;
        }
        if self.base(state) < 0 {
            return Some(state);
        }
        self.child(state, END_OF_TEXT)
    }

    /// Whether a needle may end at `state`
    #[inline]
    pub fn is_candidate(&self, state: TrieIndex) -> bool {
        self.terminal(state).is_some()
    }

    /// Goto-with-failure transition. Falls back along fail links until a state
    /// with a `c` transition is found; ends at the root otherwise.
    pub fn step(&self, state: TrieIndex, c: Character) -> TrieIndex {
        let mut current = state;
        // Each fallback moves to a strictly shallower state
        for _ in 0..=self.cells.len() {
            if let Some(next) = self.child(current, c) {
                return next;
            }
            if current == ROOT || current <= 0 {
                return ROOT;
            }
            current = self.fail(current);
        }
        ROOT
    }

    /// Number of characters on the path from the root to `state`
    pub fn depth(&self, state: TrieIndex) -> usize {
        let mut depth = 0;
        let mut current = state;
        while current != ROOT && current > 0 && depth <= self.cells.len() {
            depth += 1;
            current = self.check(current);
        }
        depth
    }

    /// Characters on the path from the root to `state`, end-of-text excluded
    pub fn path(&self, state: TrieIndex) -> Vec<Character> {
        let mut chars = Vec::new();
        let mut current = state;
        while current != ROOT && current > 0 && chars.len() <= self.cells.len() {
            let parent = self.check(current);
            let c = current.wrapping_sub(self.base(parent));
            if c != END_OF_TEXT {
                chars.push(c);
            }
            current = parent;
        }
        chars.reverse();
        chars
    }

    /// Occupied states
    pub fn states(&self) -> usize {
        (1..self.cells.len())
            .filter(|&i| self.is_occupied(i as TrieIndex))
            .count()
    }

    /// States where a needle may end
    pub fn candidates(&self) -> usize {
        (1..self.cells.len())
            .filter(|&i| self.is_candidate(i as TrieIndex))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::{Trie, TrieOptions};

    fn automaton(words: &[&str], use_tail: bool) -> Automaton {
        let mut trie = Trie::new(TrieOptions {
            use_tail,
            ..TrieOptions::default()
        });
        for w in words {
            trie.insert(w).unwrap();
        }
        Automaton::build(&trie, Traversal::Bfs)
    }

    fn walk(a: &Automaton, text: &str) -> TrieIndex {
        text.chars().fold(ROOT, |s, c| a.step(s, c as Character))
    }

    #[test]
    fn test_step_follows_fail_links() {
        let a = automaton(&["he", "she", "his", "hers"], false);
        let she = walk(&a, "she");
        let he = walk(&a, "he");
        assert_ne!(she, ROOT);
        assert_eq!(a.fail(she), he);
        // "sher" falls back to "her"
        assert_eq!(walk(&a, "sher"), walk(&a, "her"));
        assert_eq!(walk(&a, "xyz"), ROOT);
    }

    #[test]
    fn test_root_self_loop() {
        let a = automaton(&["abc"], false);
        assert_eq!(a.step(ROOT, 'z' as Character), ROOT);
    }

    #[test]
    fn test_path_and_depth() {
        let a = automaton(&["hers", "his"], false);
        let hers = walk(&a, "hers");
        assert_eq!(a.depth(hers), 4);
        assert_eq!(crate::utils::utf8::encode(&a.path(hers)), "hers");
        let eot = a.terminal(hers).unwrap();
        assert_eq!(crate::utils::utf8::encode(&a.path(eot)), "hers");
    }

    #[test]
    fn test_candidates() {
        let a = automaton(&["he", "hers"], false);
        assert!(a.is_candidate(walk(&a, "he")));
        assert!(!a.is_candidate(walk(&a, "her")));
        assert!(!a.is_candidate(ROOT));
        assert_eq!(a.candidates(), 2);
    }

    #[test]
    fn test_tail_leaf_is_candidate() {
        let a = automaton(&["abc"], true);
        let leaf = walk(&a, "a");
        assert!(a.tail_index(leaf).is_some());
        assert_eq!(a.terminal(leaf), Some(leaf));
    }
}
