#![deny(clippy::unwrap_used)]

//! A dynamic type system and value algebra.
//!
//! [`Type`] describes the shape of data and [`Value`] holds it. A value may
//! be null, or unknown (a placeholder for something not yet determined, with
//! optional refinements narrowing what it could be), or known. Values
//! carry [`Mark`]s that survive every operation, and [`Path`]s address
//! values nested inside others.
//!
//! Types and values are immutable and safe to share across threads.

mod error;
mod marks;
mod number;
mod path;
mod refinement;
mod types;
mod value;

pub use error::{ParseNumberError, PathError};
pub use marks::{Mark, PathValueMarks, ValueMarks};
pub use number::{MAX_EXPONENT, Number};
pub use path::{Path, PathSet, PathStep};
pub use refinement::{RefinementBuilder, ValueRange};
pub use types::{
    CapsuleFromFn, CapsuleOps, CapsuleToFn, CapsuleType, ObjectType, Type, UnionType,
};
pub use value::{
    ElementIter, SET_ORDER_VERSION, Value, ValueSet, ValueSetRules, compare_set_elements,
    normalize_string,
};
