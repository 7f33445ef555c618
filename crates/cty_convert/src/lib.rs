#![deny(clippy::unwrap_used)]

//! Conversion between [`cty`] types.
//!
//! [`get_conversion`] resolves a [`Conversion`] that is always safe to apply,
//! while [`get_conversion_unsafe`] also allows conversions that can fail for
//! some values, such as parsing a string as a number. [`unify`] finds a single
//! type that several types can all convert to, and [`compare_types`] ranks
//! types by generality. When no conversion exists, [`mismatch_message`]
//! explains why in a short English sentence.

mod capsule;
mod collection;
mod compare;
mod conversion;
mod dynamic;
mod mismatch;
mod object;
mod primitive;
mod tuple;
mod union;
mod unify;

pub use compare::{compare_types, sort_types};
pub use conversion::{Conversion, convert, get_conversion, get_conversion_unsafe};
pub use mismatch::mismatch_message;
pub use unify::{Unification, unify, unify_unsafe};
