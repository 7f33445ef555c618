#![deny(clippy::unwrap_used)]

//! A set whose notion of "same element" is supplied by a [`Rules`] value
//! rather than by `Eq`/`Hash` on the element type.
//!
//! Elements are grouped into buckets by [`Rules::hash`] and two elements
//! coalesce only when [`Rules::equivalent`] says so. Rules may also supply an
//! ordering that makes iteration deterministic beyond bucket order.
//!
//! The set is a plain mutable container with no internal locking. Callers
//! sharing one across threads must synchronize access themselves.

mod ops;
mod rules;
mod set;

pub use rules::Rules;
pub use set::{Iter, Set};
