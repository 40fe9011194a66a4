use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default cap for persisted history lists.
pub const HISTORY_LIMIT: usize = 10;

/// Bounded list ordered most-recent-first.
///
/// Serialized as a plain JSON array; oversized arrays are truncated on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentList<T> {
    items: Vec<T>,
    limit: usize,
}

impl<T> Default for RecentList<T> {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl<T> RecentList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn from_items(mut items: Vec<T>) -> Self {
        items.truncate(HISTORY_LIMIT);
        Self {
            items,
            limit: HISTORY_LIMIT,
        }
    }

    /// Inserts at the front, dropping the oldest entries beyond the limit.
    pub fn push(&mut self, item: T) {
        self.items.insert(0, item);
        self.items.truncate(self.limit);
    }

    /// Like [`push`](Self::push) but first removes entries `is_same` matches.
    pub fn push_replacing(&mut self, item: T, is_same: impl Fn(&T, &T) -> bool) {
        self.items.retain(|existing| !is_same(existing, &item));
        self.push(item);
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Serialize> Serialize for RecentList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RecentList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_most_recent_first_and_caps() {
        let mut list = RecentList::new();
        for i in 0..15 {
            list.push(i);
        }
        assert_eq!(list.len(), HISTORY_LIMIT);
        assert_eq!(list.latest(), Some(&14));
        assert_eq!(list.items().last(), Some(&5));
    }

    #[test]
    fn replacing_moves_entry_to_front() {
        let mut list = RecentList::with_limit(3);
        list.push((1, "a"));
        list.push((2, "b"));
        list.push_replacing((1, "c"), |a, b| a.0 == b.0);
        assert_eq!(list.items(), &[(1, "c"), (2, "b")]);
    }

    #[test]
    fn oversized_json_is_truncated() {
        let json: Vec<u32> = (0..20).collect();
        let list: RecentList<u32> =
            serde_json::from_value(serde_json::to_value(json).unwrap()).unwrap();
        assert_eq!(list.len(), HISTORY_LIMIT);
        assert_eq!(list.latest(), Some(&0));
    }
}
