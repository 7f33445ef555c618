use super::{Nullness, NumberBound, Refinement, RefinementBuilder};
use crate::value::Payload;
use crate::{Number, Type, Value};

/// What is known about the possible results of a value, whether it is
/// known or not. Known values report exact bounds so callers can treat both
/// cases alike.
#[derive(Clone, Debug)]
pub struct ValueRange {
    raw: Value,
    refinement: Refinement,
}

/// The refinement a known value would satisfy exactly.
pub(crate) fn synthesize(value: &Value) -> Refinement {
    match &value.payload {
        Payload::Unknown(Some(refinement)) => (**refinement).clone(),
        Payload::Unknown(None) => Refinement::for_type(&value.ty),
        Payload::Null => {
            let mut refinement = Refinement::for_type(&value.ty);
            refinement.set_null(Nullness::Null);
            refinement
        }
        Payload::Number(n) => {
            let bound = NumberBound {
                value: n.clone(),
                inclusive: true,
            };
            Refinement::Number {
                null: Nullness::NotNull,
                lower: Some(bound.clone()),
                upper: Some(bound),
            }
        }
        Payload::String(s) => Refinement::String {
            null: Nullness::NotNull,
            prefix: s.to_string(),
        },
        Payload::Seq(elems) if value.ty.is_list_type() => exact_length(elems.len()),
        Payload::Attrs(attrs) if value.ty.is_map_type() => exact_length(attrs.len()),
        Payload::Set(set) => {
            // Elements that are not wholly known may turn out equal to others.
            let total = set.len();
            let distinct = set.iter().filter(|elem| elem.is_wholly_known()).count();
            let min_len = if total > 0 { distinct.max(1) } else { 0 };
            Refinement::Collection {
                null: Nullness::NotNull,
                min_len,
                max_len: total,
            }
        }
        _ => Refinement::Nullable {
            null: Nullness::NotNull,
        },
    }
}

fn exact_length(len: usize) -> Refinement {
    Refinement::Collection {
        null: Nullness::NotNull,
        min_len: len,
        max_len: len,
    }
}

fn refined_not_null_bool() -> Value {
    Value::unknown(Type::Bool).refine_not_null()
}

impl ValueRange {
    /// The type the value will have once known.
    pub fn type_constraint(&self) -> &Type {
        &self.raw.ty
    }

    pub fn could_be_null(&self) -> bool {
        self.refinement.null() != Nullness::NotNull
    }

    pub fn definitely_not_null(&self) -> bool {
        self.refinement.null() == Nullness::NotNull
    }

    /// The lower numeric bound and whether it is inclusive. Unbounded ranges
    /// report inclusive negative infinity.
    pub fn number_lower_bound(&self) -> (Value, bool) {
        let (value, inclusive) = self.refinement.lower_bound();
        (Value::number(value), inclusive)
    }

    /// The upper numeric bound and whether it is inclusive. Unbounded ranges
    /// report inclusive positive infinity.
    pub fn number_upper_bound(&self) -> (Value, bool) {
        let (value, inclusive) = self.refinement.upper_bound();
        (Value::number(value), inclusive)
    }

    pub(crate) fn lower(&self) -> (Number, bool) {
        self.refinement.lower_bound()
    }

    pub(crate) fn upper(&self) -> (Number, bool) {
        self.refinement.upper_bound()
    }

    /// A prefix every possible result starts with; empty when nothing is known.
    pub fn string_prefix(&self) -> &str {
        self.refinement.prefix()
    }

    pub fn length_lower_bound(&self) -> usize {
        self.refinement.length_bounds().0
    }

    /// `usize::MAX` when unbounded.
    pub fn length_upper_bound(&self) -> usize {
        self.refinement.length_bounds().1
    }

    /// Whether `value` is among the possible results, as a bool value. The
    /// answer is unknown unless the range decides it.
    pub fn includes(&self, value: &Value) -> Value {
        let (value, marks) = value.clone().unmark_deep();
        self.includes_unmarked(&value).with_marks(marks)
    }

    fn includes_unmarked(&self, value: &Value) -> Value {
        if self.raw.is_known() {
            if self.raw.is_null() {
                if !value.is_known() {
                    return refined_not_null_bool();
                }
                return Value::bool(value.is_null());
            }
            return self.raw.equals(value);
        }
        if !value.is_known() {
            return refined_not_null_bool();
        }
        if value.is_null() {
            if self.could_be_null() {
                return refined_not_null_bool();
            }
            return Value::bool(false);
        }
        let ty = &self.raw.ty;
        if ty.is_dynamic() || value.ty.is_dynamic() {
            return refined_not_null_bool();
        }
        if !value.ty.equals(ty) {
            return Value::bool(false);
        }
        match &value.payload {
            Payload::Number(n) => {
                let (lower, lower_inclusive) = self.refinement.lower_bound();
                let (upper, upper_inclusive) = self.refinement.upper_bound();
                let above = if lower_inclusive { *n >= lower } else { *n > lower };
                let below = if upper_inclusive { *n <= upper } else { *n < upper };
                if !above || !below {
                    return Value::bool(false);
                }
            }
            Payload::String(s) => {
                if !s.starts_with(self.string_prefix()) {
                    return Value::bool(false);
                }
            }
            Payload::Seq(_) | Payload::Attrs(_) | Payload::Set(_) if ty.is_collection_type() => {
                let len = value.length();
                if let Some(len) = len.as_number_unmarked().and_then(Number::to_u64) {
                    let len = len as usize;
                    if len < self.length_lower_bound() || len > self.length_upper_bound() {
                        return Value::bool(false);
                    }
                }
            }
            _ => {}
        }
        refined_not_null_bool()
    }
}

impl Value {
    /// The range of possible results of this value. Marks are ignored.
    pub fn range(&self) -> ValueRange {
        let (raw, _) = self.clone().unmark();
        let refinement = synthesize(&raw);
        ValueRange { raw, refinement }
    }

    /// Starts refining this value. Calls on a known value act as assertions.
    pub fn refine(&self) -> RefinementBuilder {
        RefinementBuilder::new(self.clone())
    }

    /// Shorthand for `refine().not_null().new_value()`.
    pub fn refine_not_null(self) -> Value {
        self.refine().not_null().new_value()
    }

    /// Applies a reusable refinement function, such as one shared by several
    /// operations that produce the same kind of unknown.
    pub fn refine_with(self, f: impl FnOnce(RefinementBuilder) -> RefinementBuilder) -> Value {
        f(self.refine()).new_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_report_exact_ranges() {
        let n = Value::number_int(4).range();
        assert!(n.definitely_not_null());
        assert_eq!(n.number_lower_bound(), (Value::number_int(4), true));
        assert_eq!(n.number_upper_bound(), (Value::number_int(4), true));

        let s = Value::string("hello").range();
        assert_eq!(s.string_prefix(), "hello");

        let list = Value::list(vec![Value::bool(true), Value::unknown(Type::Bool)]).range();
        assert_eq!((list.length_lower_bound(), list.length_upper_bound()), (2, 2));

        let null = Value::null(Type::String).range();
        assert!(null.could_be_null());
        assert!(!null.definitely_not_null());
    }

    #[test]
    fn sets_with_unknown_elements_have_length_ranges() {
        let set = Value::set(vec![
            Value::string("a"),
            Value::unknown(Type::String),
            Value::unknown(Type::String),
        ]);
        let range = set.range();
        assert_eq!(range.length_lower_bound(), 1);
        assert_eq!(range.length_upper_bound(), 3);
    }

    #[test]
    fn unconstrained_unknowns_report_defaults() {
        let range = Value::unknown(Type::Number).range();
        assert!(range.could_be_null());
        assert_eq!(range.number_lower_bound(), (Value::negative_infinity(), true));
        assert_eq!(range.number_upper_bound(), (Value::positive_infinity(), true));
        assert_eq!(range.type_constraint(), &Type::Number);
    }

    #[test]
    fn includes_uses_bounds() {
        let unknown = Value::unknown(Type::Number)
            .refine()
            .not_null()
            .number_range_inclusive(&Value::number_int(0), &Value::number_int(10))
            .new_value();
        let range = unknown.range();
        assert!(range.includes(&Value::number_int(11)).is_false());
        assert!(range.includes(&Value::null(Type::Number)).is_false());
        assert!(!range.includes(&Value::number_int(5)).is_known());
        assert!(range.includes(&Value::string("5")).is_false());

        let prefixed = Value::unknown(Type::String)
            .refine()
            .string_prefix_full("ab")
            .new_value();
        assert!(prefixed.range().includes(&Value::string("xyz")).is_false());
        assert!(!prefixed.range().includes(&Value::string("abc")).is_known());
    }

    #[test]
    fn known_ranges_include_by_equality() {
        let range = Value::string("a").range();
        assert!(range.includes(&Value::string("a")).is_true());
        assert!(range.includes(&Value::string("b")).is_false());
    }
}
