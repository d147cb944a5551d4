use super::TrieIndex;

/// Opaque payload attached to a needle. Empty means "no payload".
pub type UserData = Vec<u8>;

/// Payloads indexed by state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserDataList {
    records: Vec<UserData>,
}

#[inline]
fn slot(index: TrieIndex) -> Option<usize> {
    usize::try_from(index).ok()
}

impl UserDataList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<UserData>) -> Self {
        Self { records }
    }

    /// Number of records (one per state once frozen)
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Payload at `index`, `None` when absent or empty
    #[inline]
    pub fn get(&self, index: TrieIndex) -> Option<&[u8]> {
        slot(index)
            .and_then(|i| self.records.get(i))
            .filter(|data| !data.is_empty())
            .map(Vec::as_slice)
    }

    /// Replace the payload at `index`
    pub fn set(&mut self, index: TrieIndex, data: UserData) {
        let Some(i) = slot(index) else {
            return;
        };
        if i >= self.records.len() {
            if data.is_empty() {
                return;
            }
            self.records.resize_with(i + 1, Vec::new);
        }
        self.records[i] = data;
    }

    /// Remove and return the payload at `index`
    pub fn take(&mut self, index: TrieIndex) -> UserData {
        slot(index)
            .and_then(|i| self.records.get_mut(i))
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Follow a state that moved from `from` to `to`
    pub fn relocate(&mut self, from: TrieIndex, to: TrieIndex) {
        let data = self.take(from);
        self.set(to, data);
    }

    /// Pad or cut to exactly `len` records
    pub fn resize(&mut self, len: usize) {
        self.records.resize_with(len, Vec::new);
    }

    /// Raw record at `index`, empty when absent
    pub fn record(&self, index: usize) -> &[u8] {
        self.records.get(index).map_or(&[], Vec::as_slice)
    }

    /// Records in index order, including empty ones
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.records.iter().map(Vec::as_slice)
    }

    /// Records that carry a payload
    pub fn present(&self) -> usize {
        self.records.iter().filter(|data| !data.is_empty()).count()
    }

    /// Total payload bytes
    pub fn bytes(&self) -> usize {
        self.records.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_take() {
        let mut list = UserDataList::new();
        assert_eq!(list.get(5), None);
        list.set(5, b"five".to_vec());
        assert_eq!(list.get(5), Some(&b"five"[..]));
        assert_eq!(list.len(), 6);
        assert_eq!(list.take(5), b"five".to_vec());
        assert_eq!(list.get(5), None);
    }

    #[test]
    fn test_relocate() {
        let mut list = UserDataList::new();
        list.set(2, vec![1, 2, 3]);
        list.relocate(2, 40);
        assert_eq!(list.get(2), None);
        assert_eq!(list.get(40), Some(&[1u8, 2, 3][..]));
        assert_eq!(list.present(), 1);
        assert_eq!(list.bytes(), 3);
    }

    #[test]
    fn test_negative_index_ignored() {
        let mut list = UserDataList::new();
        list.set(-1, vec![1]);
        assert!(list.is_empty());
        assert_eq!(list.take(-1), Vec::<u8>::new());
    }
}
