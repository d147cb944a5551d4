//! Suffix runs compressed off the trie.
//!
//! A trie leaf with a negative base `-i` owns the run stored at tail index `i`.
//! [`TailBuilder`] is the mutable pool used while inserting; [`Tail`] is the frozen
//! array carried by a dictionary.

use super::pool::Pool;
use super::{Character, TailIndex};

/// Mutable pool of tail runs
#[derive(Clone, Debug)]
pub struct TailBuilder {
    runs: Pool<Vec<Character>>,
}

impl TailBuilder {
    pub fn new(initial_size: usize) -> Self {
        Self {
            runs: Pool::new(initial_size),
        }
    }

    /// Store `run` in the lowest free slot and return its index
    pub fn add(&mut self, run: &[Character]) -> TailIndex {
        let index = self.runs.allocate(run.to_vec());
        // Pool caps indices at i32::MAX
        index as TailIndex
    }

    pub fn get(&self, index: TailIndex) -> Option<&[Character]> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.runs.get(i))
            .map(Vec::as_slice)
    }

    /// Give a slot back to the pool
    pub fn release(&mut self, index: TailIndex) -> Option<Vec<Character>> {
        usize::try_from(index).ok().and_then(|i| self.runs.release(i))
    }

    /// Number of live runs
    pub fn runs(&self) -> usize {
        self.runs.occupied()
    }

    pub fn is_consistent(&self) -> bool {
        self.runs.is_consistent()
    }

    /// Compact into a fixed array sized to the highest live run
    pub fn freeze(self) -> Tail {
        let size = self.runs.last_occupied().map_or(0, |last| last + 1);
        let mut cells = vec![Vec::new(); size];
        for (index, run) in self.runs.iter() {
            cells[index] = run.clone();
        }
        Tail { cells }
    }
}

/// Frozen tail runs; cell 0 is reserved and always empty
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tail {
    cells: Vec<Vec<Character>>,
}

impl Tail {
    /// A tail with no runs (tail compression disabled)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild from stored cells; `cells[0]` is ignored
    pub fn from_cells(mut cells: Vec<Vec<Character>>) -> Self {
        if let Some(first) = cells.first_mut() {
            first.clear();
        }
        Self { cells }
    }

    /// Stored size, including the reserved cell
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, index: TailIndex) -> Option<&[Character]> {
        match usize::try_from(index) {
            Ok(i) if i > 0 => self.cells.get(i).map(Vec::as_slice),
            _ => None,
        }
    }

    /// Cells `1..len` in index order
    pub fn iter(&self) -> impl Iterator<Item = &[Character]> + '_ {
        self.cells.iter().skip(1).map(Vec::as_slice)
    }

    /// Non-empty runs
    pub fn runs(&self) -> usize {
        self.iter().filter(|run| !run.is_empty()).count()
    }

    /// Total characters over all runs
    pub fn characters(&self) -> usize {
        self.iter().map(<[Character]>::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_reuses_released_slots() {
        let mut builder = TailBuilder::new(2);
        let a = builder.add(&[1, 2]);
        let b = builder.add(&[4]);
        assert_eq!((a, b), (1, 2));
        assert_eq!(builder.get(a), Some(&[1, 2][..]));

        assert_eq!(builder.release(a), Some(vec![1, 2]));
        assert_eq!(builder.get(a), None);
        assert_eq!(builder.add(&[9, 9, 9]), 1);
        assert!(builder.is_consistent());
    }

    #[test]
    fn test_freeze_trims_to_last_run() {
        let mut builder = TailBuilder::new(16);
        builder.add(&[5]);
        let b = builder.add(&[6, 7]);
        builder.add(&[8]);
        builder.release(3);

        let tail = builder.freeze();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail.get(b), Some(&[6, 7][..]));
        assert_eq!(tail.get(0), None);
        assert_eq!(tail.runs(), 2);
        assert_eq!(tail.characters(), 3);
    }

    #[test]
    fn test_empty_freeze() {
        let tail = TailBuilder::new(4).freeze();
        assert!(tail.is_empty());
        assert_eq!(tail.iter().count(), 0);
    }
}
