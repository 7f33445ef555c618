use crate::{Rules, Set};

impl<T: Clone, R: Rules<T> + Clone> Set<T, R> {
    /// Elements present in either set. Panics if the rules differ.
    pub fn union(&self, other: &Self) -> Self {
        self.assert_same_rules(other);
        let mut ret = self.clone();
        for value in other.values() {
            ret.add(value.clone());
        }
        ret
    }

    /// Elements present in both sets. Panics if the rules differ.
    pub fn intersection(&self, other: &Self) -> Self {
        self.assert_same_rules(other);
        let mut ret = Self::new(self.rules().clone());
        for value in self.values() {
            if other.has(value) {
                ret.add(value.clone());
            }
        }
        ret
    }

    /// Elements of `self` that are not in `other`. Panics if the rules differ.
    pub fn subtract(&self, other: &Self) -> Self {
        self.assert_same_rules(other);
        let mut ret = Self::new(self.rules().clone());
        for value in self.values() {
            if !other.has(value) {
                ret.add(value.clone());
            }
        }
        ret
    }

    /// Elements in exactly one of the two sets. Panics if the rules differ.
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        self.assert_same_rules(other);
        let mut ret = self.subtract(other);
        for value in other.values() {
            if !self.has(value) {
                ret.add(value.clone());
            }
        }
        ret
    }
}
