use std::fmt;

use rustc_hash::FxHashMap;

use crate::Rules;

/// A set of `T` whose membership is decided by `R`.
#[derive(Clone)]
pub struct Set<T, R> {
    buckets: FxHashMap<u64, Vec<T>>,
    len: usize,
    rules: R,
}

pub type Iter<'a, T> = std::vec::IntoIter<&'a T>;

impl<T, R: Rules<T>> Set<T, R> {
    pub fn new(rules: R) -> Self {
        Self {
            buckets: FxHashMap::default(),
            len: 0,
            rules,
        }
    }

    pub fn from_values<I>(rules: R, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut set = Self::new(rules);
        for value in values {
            set.add(value);
        }
        set
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `value` unless an equivalent element is already present.
    /// Returns whether the set changed.
    pub fn add(&mut self, value: T) -> bool {
        let hash = self.rules.hash(&value);
        let bucket = self.buckets.entry(hash).or_default();
        if bucket
            .iter()
            .any(|existing| self.rules.equivalent(existing, &value))
        {
            return false;
        }
        bucket.push(value);
        self.len += 1;
        true
    }

    /// Removes and returns the element equivalent to `value`, if any.
    pub fn remove(&mut self, value: &T) -> Option<T> {
        let hash = self.rules.hash(value);
        let bucket = self.buckets.get_mut(&hash)?;
        let position = bucket
            .iter()
            .position(|existing| self.rules.equivalent(existing, value))?;
        let removed = bucket.remove(position);
        if bucket.is_empty() {
            self.buckets.remove(&hash);
        }
        self.len -= 1;
        Some(removed)
    }

    pub fn has(&self, value: &T) -> bool {
        let hash = self.rules.hash(value);
        self.buckets.get(&hash).is_some_and(|bucket| {
            bucket
                .iter()
                .any(|existing| self.rules.equivalent(existing, value))
        })
    }

    /// All elements in deterministic order: ascending bucket hash, then a
    /// stable sort by [`Rules::order`].
    pub fn values(&self) -> Vec<&T> {
        let mut hashes: Vec<u64> = self.buckets.keys().copied().collect();
        hashes.sort_unstable();
        let mut values: Vec<&T> = hashes
            .iter()
            .filter_map(|hash| self.buckets.get(hash))
            .flatten()
            .collect();
        values.sort_by(|a, b| self.rules.order(a, b));
        values
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.values().into_iter()
    }

    /// Calls `f` on each element in the same order as [`Set::values`].
    pub fn each(&self, mut f: impl FnMut(&T)) {
        for value in self.values() {
            f(value);
        }
    }

    pub(crate) fn assert_same_rules(&self, other: &Self) {
        if !self.rules.same_rules(&other.rules) {
            panic!("cannot combine sets with different rules");
        }
    }
}

impl<T: Clone, R: Rules<T>> Set<T, R> {
    /// The elements in iteration order, cloned out of the set.
    pub fn to_vec(&self) -> Vec<T> {
        self.values().into_iter().cloned().collect()
    }
}

impl<'a, T, R: Rules<T>> IntoIterator for &'a Set<T, R> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, R: Rules<T>> fmt::Debug for Set<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cmp::Ordering;
    use std::hash::{Hash, Hasher};

    use rustc_hash::FxHasher;

    use super::*;

    /// Case-insensitive strings, ordered by their lowercase form.
    #[derive(Clone, Debug)]
    pub(crate) struct Folded;

    impl Rules<String> for Folded {
        fn hash(&self, value: &String) -> u64 {
            let mut hasher = FxHasher::default();
            value.to_lowercase().hash(&mut hasher);
            hasher.finish()
        }

        fn equivalent(&self, a: &String, b: &String) -> bool {
            a.eq_ignore_ascii_case(b)
        }

        fn same_rules(&self, _other: &Self) -> bool {
            true
        }

        fn order(&self, a: &String, b: &String) -> Ordering {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
    }

    /// Every element lands in one bucket; nothing is ever equivalent.
    #[derive(Clone, Debug)]
    struct Colliding;

    impl Rules<u32> for Colliding {
        fn hash(&self, _value: &u32) -> u64 {
            7
        }

        fn equivalent(&self, _a: &u32, _b: &u32) -> bool {
            false
        }

        fn same_rules(&self, _other: &Self) -> bool {
            true
        }
    }

    fn folded(items: &[&str]) -> Set<String, Folded> {
        Set::from_values(Folded, items.iter().map(|s| s.to_string()))
    }

    #[test]
    fn add_coalesces_equivalent_elements() {
        let mut set = folded(&["a", "A", "b"]);
        assert_eq!(set.len(), 2);
        assert!(!set.add("B".to_string()));
        assert!(set.add("c".to_string()));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn values_follow_rules_order() {
        let set = folded(&["pear", "Apple", "fig"]);
        let values: Vec<&str> = set.values().into_iter().map(String::as_str).collect();
        assert_eq!(values, vec!["Apple", "fig", "pear"]);
    }

    #[test]
    fn remove_drops_equivalent_element() {
        let mut set = folded(&["a", "b"]);
        assert_eq!(set.remove(&"A".to_string()).as_deref(), Some("a"));
        assert!(set.remove(&"a".to_string()).is_none());
        assert_eq!(set.len(), 1);
        assert!(!set.has(&"a".to_string()));
        assert!(set.has(&"B".to_string()));
    }

    #[test]
    fn non_reflexive_rules_never_coalesce() {
        let set = Set::from_values(Colliding, [1, 1, 2]);
        assert_eq!(set.len(), 3);
        assert!(!set.has(&1));
        assert_eq!(set.to_vec(), vec![1, 1, 2]);
    }

    #[test]
    fn empty_set() {
        let set: Set<String, Folded> = Set::new(Folded);
        assert!(set.is_empty());
        assert!(set.values().is_empty());
        assert_eq!(format!("{set:?}"), "{}");
    }
}
