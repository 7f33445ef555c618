//! Refinements: partial knowledge about unknown values.
//!
//! An unknown value may carry a [`Refinement`] that narrows what it could
//! turn out to be: whether it can be null, numeric bounds, a known string
//! prefix, or collection length bounds. Refinements are built through
//! [`RefinementBuilder`] and inspected through [`ValueRange`].

use std::fmt;

use crate::{Number, Type};

mod builder;
mod collapse;
mod range;

pub use builder::RefinementBuilder;
pub use range::ValueRange;

/// What is known about whether a value is null.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Nullness {
    Unknown,
    Null,
    NotNull,
}

/// One end of a numeric range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NumberBound {
    pub(crate) value: Number,
    pub(crate) inclusive: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Refinement {
    Nullable {
        null: Nullness,
    },
    Number {
        null: Nullness,
        lower: Option<NumberBound>,
        upper: Option<NumberBound>,
    },
    String {
        null: Nullness,
        prefix: String,
    },
    Collection {
        null: Nullness,
        min_len: usize,
        max_len: usize,
    },
}

impl Refinement {
    /// The unconstrained refinement for the type's family.
    pub(crate) fn for_type(ty: &Type) -> Refinement {
        let null = Nullness::Unknown;
        match ty {
            Type::Number => Refinement::Number {
                null,
                lower: None,
                upper: None,
            },
            Type::String => Refinement::String {
                null,
                prefix: String::new(),
            },
            Type::List(_) | Type::Set(_) | Type::Map(_) => Refinement::Collection {
                null,
                min_len: 0,
                max_len: usize::MAX,
            },
            _ => Refinement::Nullable { null },
        }
    }

    pub(crate) fn null(&self) -> Nullness {
        match self {
            Refinement::Nullable { null }
            | Refinement::Number { null, .. }
            | Refinement::String { null, .. }
            | Refinement::Collection { null, .. } => *null,
        }
    }

    pub(crate) fn set_null(&mut self, state: Nullness) {
        match self {
            Refinement::Nullable { null }
            | Refinement::Number { null, .. }
            | Refinement::String { null, .. }
            | Refinement::Collection { null, .. } => *null = state,
        }
    }

    /// True when this says nothing beyond the value's type.
    pub(crate) fn is_unconstrained(&self) -> bool {
        if self.null() != Nullness::Unknown {
            return false;
        }
        match self {
            Refinement::Nullable { .. } => true,
            Refinement::Number { lower, upper, .. } => lower.is_none() && upper.is_none(),
            Refinement::String { prefix, .. } => prefix.is_empty(),
            Refinement::Collection {
                min_len, max_len, ..
            } => *min_len == 0 && *max_len == usize::MAX,
        }
    }

    /// The lower bound, defaulting to inclusive negative infinity.
    pub(crate) fn lower_bound(&self) -> (Number, bool) {
        match self {
            Refinement::Number {
                lower: Some(bound), ..
            } => (bound.value.clone(), bound.inclusive),
            _ => (Number::NegativeInfinity, true),
        }
    }

    /// The upper bound, defaulting to inclusive positive infinity.
    pub(crate) fn upper_bound(&self) -> (Number, bool) {
        match self {
            Refinement::Number {
                upper: Some(bound), ..
            } => (bound.value.clone(), bound.inclusive),
            _ => (Number::PositiveInfinity, true),
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        match self {
            Refinement::String { prefix, .. } => prefix,
            _ => "",
        }
    }

    pub(crate) fn length_bounds(&self) -> (usize, usize) {
        match self {
            Refinement::Collection {
                min_len, max_len, ..
            } => (*min_len, *max_len),
            _ => (0, usize::MAX),
        }
    }
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        match self.null() {
            Nullness::Unknown => {}
            Nullness::Null => parts.push("null".to_string()),
            Nullness::NotNull => parts.push("not_null".to_string()),
        }
        match self {
            Refinement::Nullable { .. } => {}
            Refinement::Number { lower, upper, .. } => {
                if let Some(bound) = lower {
                    let op = if bound.inclusive { ">=" } else { ">" };
                    parts.push(format!("{op} {}", bound.value));
                }
                if let Some(bound) = upper {
                    let op = if bound.inclusive { "<=" } else { "<" };
                    parts.push(format!("{op} {}", bound.value));
                }
            }
            Refinement::String { prefix, .. } => {
                if !prefix.is_empty() {
                    parts.push(format!("prefix {prefix:?}"));
                }
            }
            Refinement::Collection {
                min_len, max_len, ..
            } => {
                if *min_len > 0 {
                    parts.push(format!("len >= {min_len}"));
                }
                if *max_len != usize::MAX {
                    parts.push(format!("len <= {max_len}"));
                }
            }
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_refinements_are_unconstrained() {
        for ty in [
            Type::Number,
            Type::String,
            Type::Bool,
            Type::list(Type::String),
            Type::empty_object(),
        ] {
            assert!(Refinement::for_type(&ty).is_unconstrained(), "{ty:?}");
        }
    }

    #[test]
    fn debug_lists_constraints() {
        let refinement = Refinement::Number {
            null: Nullness::NotNull,
            lower: Some(NumberBound {
                value: Number::from_i64(1),
                inclusive: true,
            }),
            upper: Some(NumberBound {
                value: Number::from_i64(5),
                inclusive: false,
            }),
        };
        assert_eq!(format!("{refinement:?}"), "{not_null, >= 1, < 5}");
    }
}
