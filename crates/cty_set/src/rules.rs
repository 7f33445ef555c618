use std::cmp::Ordering;

/// The equivalence rules a [`Set`](crate::Set) applies to its elements.
///
/// `hash` must be consistent with `equivalent`: any two equivalent elements
/// must produce the same hash. `equivalent` need not be reflexive; an element
/// that is not equivalent to itself can never be found again by `has`, which is
/// how callers keep placeholder elements from coalescing.
pub trait Rules<T> {
    fn hash(&self, value: &T) -> u64;

    fn equivalent(&self, a: &T, b: &T) -> bool;

    /// Reports whether two rule values would treat every element the same way.
    /// Set operations across sets with different rules are rejected.
    fn same_rules(&self, other: &Self) -> bool;

    /// Optional iteration order applied after bucket order.
    ///
    /// The default treats all elements as equal, which leaves them in bucket
    /// order. An override must be a total order; `Set::values` panics if it is
    /// not.
    fn order(&self, a: &T, b: &T) -> Ordering {
        let _ = (a, b);
        Ordering::Equal
    }
}
