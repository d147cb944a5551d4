//! Double-array trie with tail compression.
//!
//! State `s` owns the transition on character `c` iff the cell at `base(s) + c` is
//! occupied with `check == s`. Every needle ends with an [`END_OF_TEXT`] transition,
//! unless its last characters were compressed into a tail run: a leaf with
//! `base == -i` stores the rest of the needle at tail index `i`.
//!
//! Insertion places children at computed indices. When the target cell belongs to
//! another parent, the side with fewer children is moved to a fresh base. When a
//! needle meets a tail leaf, the run is unfolded into real states up to the point
//! where the two diverge.

use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};

use super::child_list::ChildList;
use super::needle::Needle;
use super::pool::Pool;
use super::tail::TailBuilder;
use super::user_data::{UserData, UserDataList};
use super::{Character, DatError, END_OF_TEXT, INITIAL_BASE, ROOT, TrieBase, TrieIndex};

/// One occupied trie cell
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrieNode {
    /// Offset of the children, or `-tail_index` for a tail leaf
    pub base: TrieBase,
    /// Parent state (0 for the root)
    pub check: TrieIndex,
    pub children: ChildList,
}

impl TrieNode {
    #[inline]
    pub fn is_tail_leaf(&self) -> bool {
        self.base < 0
    }
}

/// Construction-time settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrieOptions {
    /// Compress non-branching suffixes into tail runs
    pub use_tail: bool,
    /// Keep payloads attached to needles
    pub use_user_data: bool,
    /// Initial trie cell count (at least 4)
    pub initial_size: usize,
    /// Initial tail slot count (at least 2)
    pub tail_initial_size: usize,
    /// Capacity reserved for each node's child list
    pub child_list_capacity: usize,
}

impl Default for TrieOptions {
    fn default() -> Self {
        Self {
            use_tail: true,
            use_user_data: true,
            initial_size: 1024,
            tail_initial_size: 256,
            child_list_capacity: 2,
        }
    }
}

/// Mutable double-array trie
#[derive(Clone, Debug)]
pub struct Trie {
    cells: Pool<TrieNode>,
    tail: TailBuilder,
    user_data: UserDataList,
    options: TrieOptions,
    needles: usize,
}

#[inline]
fn cell(index: TrieIndex) -> usize {
    // Callers only pass indices produced by `transition`, which are positive
    index as usize
}

/// `base + c`, or a fatal error once the index space is exhausted
#[inline]
fn transition(base: TrieBase, c: Character) -> TrieIndex {
    match base.checked_add(c) {
        Some(target) if target > 0 => target,
        _ => panic!(
            "trie index space exhausted: base {} + character {} is out of range",
            base, c
        ),
    }
}

impl Trie {
    pub fn new(options: TrieOptions) -> Self {
        let mut cells = Pool::new(options.initial_size.max(4));
        cells.claim(
            cell(ROOT),
            TrieNode {
                base: INITIAL_BASE,
                check: 0,
                children: ChildList::with_capacity(options.child_list_capacity),
            },
        );

        Self {
            cells,
            tail: TailBuilder::new(options.tail_initial_size.max(2)),
            user_data: UserDataList::new(),
            options,
            needles: 0,
        }
    }

    #[inline]
    pub fn options(&self) -> &TrieOptions {
        &self.options
    }

    /// Distinct needles inserted so far
    #[inline]
    pub fn needles(&self) -> usize {
        self.needles
    }

    /// Occupied trie cells
    #[inline]
    pub fn occupied(&self) -> usize {
        self.cells.occupied()
    }

    /// Live tail runs
    #[inline]
    pub fn tail_runs(&self) -> usize {
        self.tail.runs()
    }

    /// Highest occupied index (the root when empty)
    pub fn last_index(&self) -> TrieIndex {
        self.cells.last_occupied().map_or(ROOT, |i| i as TrieIndex)
    }

    #[inline]
    pub fn node(&self, index: TrieIndex) -> Option<&TrieNode> {
        usize::try_from(index).ok().and_then(|i| self.cells.get(i))
    }

    /// Occupied cells in index order
    pub fn nodes(&self) -> impl Iterator<Item = (TrieIndex, &TrieNode)> + '_ {
        self.cells.iter().map(|(i, node)| (i as TrieIndex, node))
    }

    #[inline]
    fn node_mut(&mut self, index: TrieIndex) -> Option<&mut TrieNode> {
        usize::try_from(index).ok().and_then(|i| self.cells.get_mut(i))
    }

    /// Base of `index`, 0 for a free cell
    #[inline]
    pub fn base(&self, index: TrieIndex) -> TrieBase {
        self.node(index).map_or(0, |n| n.base)
    }

    /// Parent of `index`, 0 for a free cell or the root
    #[inline]
    pub fn check(&self, index: TrieIndex) -> TrieIndex {
        self.node(index).map_or(0, |n| n.check)
    }

    #[inline]
    fn children_len(&self, index: TrieIndex) -> usize {
        self.node(index).map_or(0, |n| n.children.len())
    }

    /// State reached from `parent` on `c`, if that transition exists
    pub fn child(&self, parent: TrieIndex, c: Character) -> Option<TrieIndex> {
        let base = self.base(parent);
        if base <= 0 {
            return None;
        }
        let target = base.checked_add(c)?;
        (self.check(target) == parent).then_some(target)
    }

    /// Tail run owned by a leaf
    pub fn tail_run(&self, index: TrieIndex) -> Option<&[Character]> {
        let base = self.base(index);
        if base < 0 { self.tail.get(-base) } else { None }
    }

    /// Payload stored at a state
    pub fn user_data(&self, index: TrieIndex) -> Option<&[u8]> {
        self.user_data.get(index)
    }

    /// Insert a needle without payload
    pub fn insert(&mut self, needle: &str) -> Result<bool, DatError> {
        let needle: Needle = needle.parse()?;
        Ok(self.add_needle(&needle, UserData::new()))
    }

    /// Insert a needle with payload; a later insertion of the same needle replaces it
    pub fn insert_with_data(&mut self, needle: &str, data: &[u8]) -> Result<bool, DatError> {
        let needle: Needle = needle.parse()?;
        Ok(self.add_needle(&needle, data.to_vec()))
    }

    /// Insert a needle given as raw UTF-8 bytes
    pub fn insert_bytes(&mut self, needle: &[u8], data: &[u8]) -> Result<bool, DatError> {
        let needle = Needle::from_utf8(needle)?;
        Ok(self.add_needle(&needle, data.to_vec()))
    }

    /// Insert a decoded needle. Returns true if it was not present before.
    pub fn add_needle(&mut self, needle: &Needle, data: UserData) -> bool {
        let data = if self.options.use_user_data { data } else { UserData::new() };
        let chars = needle.as_slice();
        let mut last = ROOT;

        for (i, &c) in chars.iter().enumerate() {
            let rest = &chars[i + 1..];

            if let Some(target) = self.child(last, c) {
                if self.base(target) < 0 {
                    return self.split_tail(target, rest, data);
                }
                last = target;
                continue;
            }

            if self.options.use_tail && !rest.is_empty() {
                let run = self.tail.add(rest);
                let leaf = self.place_child(last, c, -run);
                self.user_data.set(leaf, data);
                self.needles += 1;
                return true;
            }

            last = self.place_child(last, c, INITIAL_BASE);
        }

        let (_, added) = self.insert_end_of_text(last, data);
        if added {
            self.needles += 1;
        }
        added
    }

    /// Whether `needle` was inserted
    pub fn contains(&self, needle: &Needle) -> bool {
        let chars = needle.as_slice();
        let mut state = ROOT;

        for (i, &c) in chars.iter().enumerate() {
            let Some(next) = self.child(state, c) else {
                return false;
            };
            if let Some(run) = self.tail_run(next) {
                return run == &chars[i + 1..];
            }
            state = next;
        }

        self.child(state, END_OF_TEXT).is_some()
    }

    /// Terminate a needle at `state`. Returns the terminal's index and whether
    /// it is new.
    fn insert_end_of_text(&mut self, state: TrieIndex, data: UserData) -> (TrieIndex, bool) {
        if let Some(eot) = self.child(state, END_OF_TEXT) {
            self.user_data.set(eot, data);
            return (eot, false);
        }

        let eot = self.place_child(state, END_OF_TEXT, INITIAL_BASE);
        self.user_data.set(eot, data);
        (eot, true)
    }

    /// Create the child of `parent` on `c`, repairing a base collision first.
    /// Returns the child's index; `parent` itself may have moved.
    fn place_child(&mut self, parent: TrieIndex, c: Character, base: TrieBase) -> TrieIndex {
        let mut parent = parent;
        let mut target = transition(self.base(parent), c);

        if !self.cells.is_free(cell(target)) {
            let occupant = self.check(target);

            if self.children_len(parent) + 1 < self.children_len(occupant) {
                let mut chars = self.node(parent).map(|n| n.children.clone()).unwrap_or_default();
                chars.insert(c);
                let new_base = self.find_free_base(chars.as_slice());
                self.relocate(parent, new_base, parent);
                target = transition(new_base, c);
            } else {
                let chars = self.node(occupant).map(|n| n.children.clone()).unwrap_or_default();
                let new_base = self.find_free_base(chars.as_slice());
                parent = self.relocate(occupant, new_base, parent);
            }
        }

        let capacity = self.options.child_list_capacity;
        self.cells.claim(
            cell(target),
            TrieNode {
                base,
                check: parent,
                children: ChildList::with_capacity(capacity),
            },
        );
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(c);
        }
        target
    }

    /// Smallest base at which every character of `chars` lands on a free cell
    fn find_free_base(&self, chars: &[Character]) -> TrieBase {
        let Some(&min) = chars.first() else {
            return INITIAL_BASE;
        };

        let fits = |base: TrieBase| {
            chars.iter().all(|&c| {
                base.checked_add(c)
                    .is_some_and(|t| t > 0 && self.cells.is_free(cell(t)))
            })
        };

        for free in self.cells.free_from(cell(min) + 1) {
            let base = free as TrieBase - min;
            if fits(base) {
                return base;
            }
        }

        // Everything past the end of the pool is free
        (self.cells.len() as TrieBase - min).max(INITIAL_BASE)
    }

    /// Move every child of `node` to `new_base`. Returns the new index of `track`
    /// if it was one of the moved children, `track` otherwise.
    fn relocate(&mut self, node: TrieIndex, new_base: TrieBase, track: TrieIndex) -> TrieIndex {
        let old_base = self.base(node);
        let children: Vec<Character> = self
            .node(node)
            .map(|n| n.children.iter().collect())
            .unwrap_or_default();
        let mut tracked = track;

        for c in children {
            let from = transition(old_base, c);
            let to = transition(new_base, c);
            let Some(moved) = self.cells.release(cell(from)) else {
                continue;
            };

            if moved.base > 0 {
                for gc in moved.children.iter() {
                    let grandchild = transition(moved.base, gc);
                    if let Some(g) = self.node_mut(grandchild)
                        && g.check == from
                    {
                        g.check = to;
                    }
                }
            }

            self.cells.claim(cell(to), TrieNode { check: node, ..moved });
            self.user_data.relocate(from, to);
            if tracked == from {
                tracked = to;
            }
        }

        if let Some(n) = self.node_mut(node) {
            n.base = new_base;
        }
        tracked
    }

    /// Resolve a needle that runs into the tail leaf at `leaf`; `rest` is what
    /// remains of the needle after the leaf's own character.
    fn split_tail(&mut self, leaf: TrieIndex, rest: &[Character], data: UserData) -> bool {
        let run_index = -self.base(leaf);
        let run = self.tail.get(run_index).map(<[Character]>::to_vec).unwrap_or_default();

        if run == rest {
            self.user_data.set(leaf, data);
            return false;
        }

        let common = run.iter().zip(rest).take_while(|(a, b)| a == b).count();
        let old_data = self.user_data.take(leaf);
        self.tail.release(run_index);
        if let Some(node) = self.node_mut(leaf) {
            node.base = INITIAL_BASE;
        }

        let mut node = leaf;
        for &c in &run[..common] {
            node = self.place_child(node, c, INITIAL_BASE);
        }

        node = self.attach_remainder(node, &rest[common..], data);
        self.attach_remainder(node, &run[common..], old_data);
        self.needles += 1;
        true
    }

    /// Hang `remainder` below `parent` as a terminal, a branch plus terminal, or a
    /// branch plus tail run. Returns the current index of `parent`.
    fn attach_remainder(&mut self, parent: TrieIndex, remainder: &[Character], data: UserData) -> TrieIndex {
        match remainder {
            [] => {
                let (eot, _) = self.insert_end_of_text(parent, data);
                self.check(eot)
            }
            [c] => {
                let child = self.place_child(parent, *c, INITIAL_BASE);
                let (eot, _) = self.insert_end_of_text(child, data);
                self.check(self.check(eot))
            }
            [c, tail @ ..] => {
                let run = self.tail.add(tail);
                let leaf = self.place_child(parent, *c, -run);
                self.user_data.set(leaf, data);
                self.check(leaf)
            }
        }
    }

    /// Structural consistency check
    pub fn validate(&self) -> Result<()> {
        ensure!(self.cells.is_consistent(), "free set and cells disagree");

        let Some(root) = self.node(ROOT) else {
            bail!("root cell is free");
        };
        ensure!(root.check == 0, "root has parent {}", root.check);

        let mut tail_refs = 0;
        for (index, node) in self.cells.iter() {
            let index = index as TrieIndex;

            if index != ROOT {
                let parent = node.check;
                let Some(p) = self.node(parent) else {
                    bail!("cell {} points at free parent {}", index, parent);
                };
                ensure!(p.base > 0, "cell {} hangs below leaf {}", index, parent);
                let c = index - p.base;
                ensure!(
                    p.children.contains(c),
                    "cell {} missing from the child list of {}",
                    index,
                    parent
                );
            }

            if node.is_tail_leaf() {
                ensure!(node.children.is_empty(), "tail leaf {} has children", index);
                let run = self.tail.get(-node.base);
                ensure!(
                    run.is_some_and(|r| !r.is_empty()),
                    "leaf {} references missing tail run {}",
                    index,
                    -node.base
                );
                tail_refs += 1;
                continue;
            }

            for c in node.children.iter() {
                let child = node.base.checked_add(c).unwrap_or(0);
                ensure!(
                    self.check(child) == index,
                    "child {} of {} on {} is not owned by it",
                    child,
                    index,
                    c
                );
            }
        }

        ensure!(
            tail_refs == self.tail.runs(),
            "{} tail runs but {} leaves reference one",
            self.tail.runs(),
            tail_refs
        );
        ensure!(self.tail.is_consistent(), "tail pool is inconsistent");

        let mut reachable = 0;
        let mut stack = vec![ROOT];
        while let Some(state) = stack.pop() {
            reachable += 1;
            if let Some(node) = self.node(state)
                && node.base > 0
            {
                stack.extend(node.children.iter().map(|c| transition(node.base, c)));
            }
        }
        ensure!(
            reachable == self.cells.occupied(),
            "{} cells occupied but {} reachable from the root",
            self.cells.occupied(),
            reachable
        );

        Ok(())
    }

    /// Hand over the build-side tail and payloads when freezing
    pub(crate) fn into_parts(self) -> (TailBuilder, UserDataList) {
        (self.tail, self.user_data)
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new(TrieOptions::default())
    }
}
