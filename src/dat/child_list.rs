//! Sorted set of transition characters leaving one trie node.

use super::Character;

/// Characters of a node's outgoing transitions, kept sorted and free of duplicates
/// unless built with [`ChildList::push`] (call [`ChildList::sort`] afterwards).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildList {
    items: Vec<Character>,
}

impl ChildList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert in sorted position. Returns false if already present.
    pub fn insert(&mut self, c: Character) -> bool {
        match self.items.binary_search(&c) {
            Ok(_) => false,
            Err(pos) => {
                self.items.insert(pos, c);
                true
            }
        }
    }

    /// Remove `c`. Returns false if absent.
    pub fn remove(&mut self, c: Character) -> bool {
        match self.items.binary_search(&c) {
            Ok(pos) => {
                self.items.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Append without ordering
    #[inline]
    pub fn push(&mut self, c: Character) {
        self.items.push(c);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Character> {
        self.items.pop()
    }

    /// Binary search; the list must be sorted
    #[inline]
    pub fn contains(&self, c: Character) -> bool {
        self.items.binary_search(&c).is_ok()
    }

    /// Restore order after pushes and drop duplicates
    pub fn sort(&mut self) {
        merge_sort(&mut self.items);
        self.items.dedup();
    }

    #[inline]
    pub fn first(&self) -> Option<Character> {
        self.items.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<Character> {
        self.items.last().copied()
    }

    /// Ascending order; `.rev()` walks it backwards
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Character> + ExactSizeIterator + '_ {
        self.items.iter().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Character] {
        &self.items
    }
}

impl FromIterator<Character> for ChildList {
    fn from_iter<I: IntoIterator<Item = Character>>(iter: I) -> Self {
        let mut list = Self {
            items: iter.into_iter().collect(),
        };
        list.sort();
        list
    }
}

/// Bottom-up merge sort with a single scratch buffer
fn merge_sort(items: &mut [Character]) {
    let n = items.len();
    if n < 2 {
        return;
    }

    let mut scratch = items.to_vec();
    let mut width = 1;
    while width < n {
        let mut lo = 0;
        while lo < n {
            let mid = (lo + width).min(n);
            let hi = (lo + 2 * width).min(n);
            merge(&items[lo..mid], &items[mid..hi], &mut scratch[lo..hi]);
            lo = hi;
        }
        items.copy_from_slice(&scratch);
        width *= 2;
    }
}

fn merge(left: &[Character], right: &[Character], out: &mut [Character]) {
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        if j >= right.len() || (i < left.len() && left[i] <= right[j]) {
            *slot = left[i];
            i += 1;
        } else {
            *slot = right[j];
            j += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order() {
        let mut list = ChildList::new();
        for c in [b'r', b'a', b'z', b'c'] {
            assert!(list.insert(c as Character));
        }
        assert!(!list.insert('a' as Character));
        assert_eq!(list.as_slice(), &[97, 99, 114, 122]);
        assert!(list.contains('r' as Character));
        assert!(!list.contains('b' as Character));
    }

    #[test]
    fn test_push_then_sort() {
        let mut list = ChildList::new();
        for c in [9, 3, 7, 3, 1, 8, 2] {
            list.push(c);
        }
        list.sort();
        assert_eq!(list.as_slice(), &[1, 2, 3, 7, 8, 9]);
        assert_eq!(list.first(), Some(1));
        assert_eq!(list.last(), Some(9));
    }

    #[test]
    fn test_iterate_both_directions() {
        let list: ChildList = [5, 1, 3].into_iter().collect();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(list.iter().rev().collect::<Vec<_>>(), vec![5, 3, 1]);
    }

    #[test]
    fn test_remove_and_pop() {
        let mut list: ChildList = [4, 2, 6].into_iter().collect();
        assert!(list.remove(4));
        assert!(!list.remove(4));
        assert_eq!(list.pop(), Some(6));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_merge_sort_large() {
        let mut items: Vec<Character> = (0..1000).map(|i| (i * 7919) % 1009).collect();
        let mut expected = items.clone();
        expected.sort();
        merge_sort(&mut items);
        assert_eq!(items, expected);
    }
}
