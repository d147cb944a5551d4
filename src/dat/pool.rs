//! Index-addressed arena shared by the trie cells and the tail runs.
//!
//! Cells are placed at computed indices rather than taken from the head of a free
//! list, so the arena exposes `claim(index)` next to `allocate()`. Free indices are
//! kept in an ordered set, which gives "first free cell after X" lookups for base
//! searches and sorted reuse on release. Index 0 is reserved and never handed out.

use std::collections::BTreeSet;

/// Largest number of cells a pool may hold; indices must fit a signed 32-bit value
pub const MAX_POOL_SIZE: usize = i32::MAX as usize;

#[derive(Clone, Debug)]
enum Slot<T> {
    Vacant,
    Occupied(T),
}

/// Growable arena of `T` with an ordered free-index set
#[derive(Clone, Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: BTreeSet<usize>,
    occupied: usize,
}

/// Capacity after one growth step: `old + ceil(old / 2) + 1`, capped at [`MAX_POOL_SIZE`]
#[inline]
pub fn next_capacity(old: usize) -> usize {
    old.saturating_add(old.div_ceil(2))
        .saturating_add(1)
        .min(MAX_POOL_SIZE)
}

impl<T> Pool<T> {
    /// Create a pool with `initial_size` cells (at least two: the reserved cell and one usable)
    pub fn new(initial_size: usize) -> Self {
        let size = initial_size.clamp(2, MAX_POOL_SIZE);
        Self {
            slots: std::iter::repeat_with(|| Slot::Vacant).take(size).collect(),
            free: (1..size).collect(),
            occupied: 0,
        }
    }

    /// Current capacity (number of addressable cells)
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied cells
    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// True when no cell is occupied
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        match self.slots.get(index) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        match self.slots.get_mut(index) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Whether `index` could be claimed. Indices past the end count as free since
    /// claiming them grows the pool first.
    #[inline]
    pub fn is_free(&self, index: usize) -> bool {
        index != 0 && (index >= self.slots.len() || self.free.contains(&index))
    }

    /// Place `value` at `index`, growing the pool first if needed.
    ///
    /// # Panics
    /// If `index` is reserved or already occupied; either means the caller's
    /// index arithmetic is broken.
    pub fn claim(&mut self, index: usize, value: T) -> &mut T {
        assert!(index != 0, "pool cell 0 is reserved");
        self.ensure_index(index);

        let was_free = self.free.remove(&index);
        assert!(was_free, "pool cell {} is already occupied", index);

        self.occupied += 1;
        self.slots[index] = Slot::Occupied(value);
        match &mut self.slots[index] {
            Slot::Occupied(value) => value,
            Slot::Vacant => unreachable!(),
        }
    }

    /// Place `value` in the lowest free cell and return its index
    pub fn allocate(&mut self, value: T) -> usize {
        let index = self.free.first().copied().unwrap_or(self.slots.len());
        self.claim(index, value);
        index
    }

    /// Vacate `index`, returning what was stored there
    pub fn release(&mut self, index: usize) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(slot, Slot::Vacant) {
            Slot::Occupied(value) => {
                self.free.insert(index);
                self.occupied -= 1;
                Some(value)
            }
            Slot::Vacant => None,
        }
    }

    /// Free indices at or after `start`, ascending. Does not include the
    /// virtual cells past the end of the pool.
    pub fn free_from(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        self.free.range(start.max(1)..).copied()
    }

    /// Grow to exactly `new_len` cells (no-op when already that large)
    ///
    /// # Panics
    /// If `new_len` exceeds [`MAX_POOL_SIZE`].
    pub fn grow_to(&mut self, new_len: usize) {
        let old_len = self.slots.len();
        if new_len <= old_len {
            return;
        }
        assert!(
            new_len <= MAX_POOL_SIZE,
            "pool index space exhausted: {} cells requested, limit is {}",
            new_len,
            MAX_POOL_SIZE
        );

        self.slots.resize_with(new_len, || Slot::Vacant);
        self.free.extend(old_len..new_len);
    }

    /// Grow by the standard policy until `index` is addressable
    pub fn ensure_index(&mut self, index: usize) {
        if index < self.slots.len() {
            return;
        }
        assert!(
            index < MAX_POOL_SIZE,
            "pool index space exhausted: index {} is past the limit {}",
            index,
            MAX_POOL_SIZE
        );

        let mut size = self.slots.len();
        while size <= index {
            size = next_capacity(size);
        }
        self.grow_to(size);
    }

    /// Highest occupied index
    pub fn last_occupied(&self) -> Option<usize> {
        self.slots
            .iter()
            .rposition(|slot| matches!(slot, Slot::Occupied(_)))
    }

    /// Occupied cells in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied(value) => Some((i, value)),
            Slot::Vacant => None,
        })
    }

    /// Check that the free set and the slots agree
    pub fn is_consistent(&self) -> bool {
        let vacant = self
            .slots
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, slot)| matches!(slot, Slot::Vacant))
            .count();

        vacant == self.free.len()
            && self.free.iter().all(|&i| matches!(self.slots.get(i), Some(Slot::Vacant)))
            && self.occupied + vacant + 1 == self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_capacity() {
        assert_eq!(next_capacity(4), 4 + 2 + 1);
        assert_eq!(next_capacity(5), 5 + 3 + 1);
        assert_eq!(next_capacity(MAX_POOL_SIZE - 1), MAX_POOL_SIZE);
    }

    #[test]
    fn test_claim_and_release() {
        let mut pool: Pool<&str> = Pool::new(4);
        assert!(pool.is_free(2));
        pool.claim(2, "two");
        assert!(!pool.is_free(2));
        assert_eq!(pool.get(2), Some(&"two"));
        assert_eq!(pool.occupied(), 1);

        assert_eq!(pool.release(2), Some("two"));
        assert_eq!(pool.release(2), None);
        assert!(pool.is_free(2));
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_claim_grows_pool() {
        let mut pool: Pool<u32> = Pool::new(4);
        pool.claim(20, 7);
        assert!(pool.len() > 20);
        assert_eq!(pool.get(20), Some(&7));
        assert!(pool.is_free(19));
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_allocate_reuses_lowest_free() {
        let mut pool: Pool<u32> = Pool::new(2);
        assert_eq!(pool.allocate(10), 1);
        assert_eq!(pool.allocate(11), 2);
        assert_eq!(pool.allocate(12), 3);
        pool.release(2);
        pool.release(1);
        assert_eq!(pool.allocate(13), 1);
        assert_eq!(pool.allocate(14), 2);
    }

    #[test]
    fn test_reserved_cell_never_free() {
        let pool: Pool<u32> = Pool::new(4);
        assert!(!pool.is_free(0));
        assert_eq!(pool.free_from(0).next(), Some(1));
    }

    #[test]
    fn test_free_from_is_ordered() {
        let mut pool: Pool<u32> = Pool::new(8);
        pool.claim(3, 0);
        pool.claim(5, 0);
        let free: Vec<usize> = pool.free_from(3).collect();
        assert_eq!(free, vec![4, 6, 7]);
    }

    #[test]
    fn test_last_occupied() {
        let mut pool: Pool<u32> = Pool::new(8);
        assert_eq!(pool.last_occupied(), None);
        pool.claim(2, 0);
        pool.claim(6, 0);
        assert_eq!(pool.last_occupied(), Some(6));
        pool.release(6);
        assert_eq!(pool.last_occupied(), Some(2));
    }

    #[test]
    #[should_panic(expected = "already occupied")]
    fn test_double_claim_panics() {
        let mut pool: Pool<u32> = Pool::new(4);
        pool.claim(2, 0);
        pool.claim(2, 1);
    }
}
