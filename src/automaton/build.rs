//! Freezing a trie into an automaton.
//!
//! States are visited breadth-first or depth-first. A state's fail link depends on
//! its parent's fail chain, so each visit first resolves whatever shallower states
//! it needs and remembers them in a bitmap; both orders yield the same links.

use std::collections::VecDeque;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use super::{Automaton, AutomatonCell};
use crate::dat::{END_OF_TEXT, ROOT, Trie, TrieIndex};

/// Order in which states are visited while freezing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Traversal {
    /// FIFO: states are visited by increasing depth
    #[default]
    Bfs,
    /// LIFO: each branch is finished before the next one starts
    Dfs,
}

impl std::fmt::Display for Traversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Traversal::Bfs => write!(f, "bfs"),
            Traversal::Dfs => write!(f, "dfs"),
        }
    }
}

impl std::str::FromStr for Traversal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bfs" => Ok(Traversal::Bfs),
            "dfs" => Ok(Traversal::Dfs),
            other => Err(format!("unknown traversal '{}' (expected bfs or dfs)", other)),
        }
    }
}

/// Pending states, popped from the front or the back depending on the order
struct Frontier {
    queue: VecDeque<TrieIndex>,
    traversal: Traversal,
}

impl Frontier {
    fn new(traversal: Traversal) -> Self {
        Self {
            queue: VecDeque::new(),
            traversal,
        }
    }

    fn push(&mut self, state: TrieIndex) {
        self.queue.push_back(state);
    }

    fn pop(&mut self) -> Option<TrieIndex> {
        match self.traversal {
            Traversal::Bfs => self.queue.pop_front(),
            Traversal::Dfs => self.queue.pop_back(),
        }
    }
}

/// Mutable state of one freeze
struct Freezer {
    automaton: Automaton,
    resolved: RoaringBitmap,
}

impl Freezer {
    fn is_resolved(&self, state: TrieIndex) -> bool {
        self.resolved.contains(state as u32)
    }

    fn cell_mut(&mut self, state: TrieIndex) -> &mut AutomatonCell {
        &mut self.automaton.cells[state as usize]
    }

    /// Compute `fail` and `output` for `state` and any unresolved state it depends
    /// on. Every dependency is strictly shallower, so the pending stack is finite.
    fn resolve(&mut self, state: TrieIndex) {
        let mut pending = vec![state];

        'pending: while let Some(&s) = pending.last() {
            if self.is_resolved(s) {
                pending.pop();
                continue;
            }

            let parent = self.automaton.check(s);
            if !self.is_resolved(parent) {
                pending.push(parent);
                continue;
            }

            let c = s - self.automaton.base(parent);
            if parent == ROOT || c == END_OF_TEXT {
                let cell = self.cell_mut(s);
                cell.fail = ROOT;
                cell.output = 0;
                self.resolved.insert(s as u32);
                pending.pop();
                continue;
            }

            let mut f = self.automaton.fail(parent);
            let target = loop {
                if !self.is_resolved(f) {
                    pending.push(f);
                    continue 'pending;
                }
                if let Some(next) = self.automaton.child(f, c) {
                    break next;
                }
                if f == ROOT {
                    break ROOT;
                }
                f = self.automaton.fail(f);
            };

            if !self.is_resolved(target) {
                pending.push(target);
                continue;
            }

            let output = if self.automaton.is_candidate(target) {
                target
            } else {
                self.automaton.output(target)
            };
            let cell = self.cell_mut(s);
            cell.fail = target;
            cell.output = output;
            self.resolved.insert(s as u32);
            pending.pop();
        }
    }
}

impl Automaton {
    /// Freeze `trie`. The result has exactly `last occupied index + 1` cells.
    pub fn build(trie: &Trie, traversal: Traversal) -> Self {
        let size = trie.last_index() as usize + 1;
        let mut cells = vec![AutomatonCell::default(); size];
        for (index, node) in trie.nodes() {
            cells[index as usize] = AutomatonCell {
                base: node.base,
                check: node.check,
                fail: 0,
                output: 0,
            };
        }
        cells[ROOT as usize].fail = ROOT;

        let mut freezer = Freezer {
            automaton: Automaton::from_cells(cells),
            resolved: RoaringBitmap::new(),
        };
        freezer.resolved.insert(ROOT as u32);

        let mut frontier = Frontier::new(traversal);
        frontier.push(ROOT);

        while let Some(state) = frontier.pop() {
            freezer.resolve(state);

            let base = freezer.automaton.base(state);
            if base <= 0 {
                continue;
            }
            if let Some(node) = trie.node(state) {
                for c in node.children.iter() {
                    frontier.push(base + c);
                }
            }
        }

        freezer.automaton
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::{Character, TrieOptions};

    const WORDS: &[&str] = &[
        "he", "she", "his", "hers", "bachelor", "jar", "badge", "baby", "ara", "bar", "arab",
        "baraba", "barbara", "ab", "b", "rab",
    ];

    fn trie(use_tail: bool) -> Trie {
        let mut trie = Trie::new(TrieOptions {
            use_tail,
            ..TrieOptions::default()
        });
        for w in WORDS {
            trie.insert(w).unwrap();
        }
        trie
    }

    #[test]
    fn test_bfs_and_dfs_agree() {
        for use_tail in [true, false] {
            let trie = trie(use_tail);
            let bfs = Automaton::build(&trie, Traversal::Bfs);
            let dfs = Automaton::build(&trie, Traversal::Dfs);
            assert_eq!(bfs, dfs);
        }
    }

    #[test]
    fn test_size_matches_last_index() {
        let trie = trie(true);
        let a = Automaton::build(&trie, Traversal::Bfs);
        assert_eq!(a.len(), trie.last_index() as usize + 1);
        assert_eq!(a.states(), trie.occupied());
        assert_eq!(a.cells()[0], AutomatonCell::default());
    }

    #[test]
    fn test_output_links() {
        let trie = trie(false);
        let a = Automaton::build(&trie, Traversal::Bfs);
        let walk = |text: &str| {
            text.chars()
                .fold(ROOT, |s, c| a.child(s, c as Character).unwrap())
        };

        // "she" -> "he" is a complete needle
        assert_eq!(a.output(walk("she")), walk("he"));
        // "arab" -> "rab" -> "ab" -> "b"
        assert_eq!(a.output(walk("arab")), walk("rab"));
        assert_eq!(a.output(walk("rab")), walk("ab"));
        assert_eq!(a.output(walk("ab")), walk("b"));
        assert_eq!(a.output(walk("b")), 0);
    }

    #[test]
    fn test_fail_is_proper_suffix() {
        let trie = trie(false);
        let a = Automaton::build(&trie, Traversal::Dfs);
        for state in 2..a.len() as TrieIndex {
            if !a.is_occupied(state) {
                continue;
            }
            let path = a.path(state);
            let fail_path = a.path(a.fail(state));
            assert!(fail_path.len() < path.len() || path.is_empty());
            assert!(path.ends_with(&fail_path));
        }
    }

    #[test]
    fn test_traversal_parse() {
        assert_eq!("BFS".parse::<Traversal>().unwrap(), Traversal::Bfs);
        assert_eq!("dfs".parse::<Traversal>().unwrap(), Traversal::Dfs);
        assert!("zigzag".parse::<Traversal>().is_err());
    }
}
