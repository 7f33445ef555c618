use unicode_segmentation::UnicodeSegmentation;

use super::collapse::collapse;
use super::range::synthesize;
use super::{Nullness, NumberBound, Refinement};
use crate::value::normalize_string;
use crate::{Number, Type, Value, ValueMarks};

/// Accumulates refinements for a value. Consumed by
/// [`RefinementBuilder::new_value`].
///
/// On an unknown value each call narrows what the value may become; a call
/// looser than what is already known is ignored, and a call contradicting it
/// panics. On a known value each call is an assertion that panics when the
/// value does not satisfy it. Refinements of an unknown value of unknown type
/// are discarded.
#[must_use = "call new_value to obtain the refined value"]
pub struct RefinementBuilder {
    orig: Value,
    marks: ValueMarks,
    wip: Option<Refinement>,
}

impl RefinementBuilder {
    pub(crate) fn new(value: Value) -> Self {
        let (orig, marks) = value.unmark();
        let wip = if !orig.is_known() && orig.ty.is_dynamic() {
            None
        } else {
            Some(synthesize(&orig))
        };
        RefinementBuilder { orig, marks, wip }
    }

    fn describe(&self) -> String {
        let state = if self.orig.is_known() { "known" } else { "unknown" };
        format!("{state} {} value", self.orig.ty.friendly_name())
    }

    /// The value will not be null.
    pub fn not_null(mut self) -> Self {
        let description = self.describe();
        if let Some(wip) = &mut self.wip {
            if wip.null() == Nullness::Null {
                panic!("refining a null {description} as non-null");
            }
            wip.set_null(Nullness::NotNull);
        }
        self
    }

    /// The value will be null.
    pub fn null(mut self) -> Self {
        let description = self.describe();
        if let Some(wip) = &mut self.wip {
            if wip.null() == Nullness::NotNull {
                panic!("refining a non-null {description} as null");
            }
            wip.set_null(Nullness::Null);
        }
        self
    }

    fn number_bound(bound: &Value, which: &str) -> Option<Number> {
        if !bound.ty.is_dynamic() && bound.ty != Type::Number {
            panic!(
                "number range {which} bound must be a number, not {}",
                bound.ty.friendly_name()
            );
        }
        if !bound.is_known() {
            return None;
        }
        if bound.is_null() {
            panic!("number range {which} bound must not be null");
        }
        bound.as_number_unmarked().cloned()
    }

    /// The value will be at least `min`, or strictly greater when
    /// `inclusive` is false. An unknown `min` is ignored.
    pub fn number_range_lower_bound(mut self, min: &Value, inclusive: bool) -> Self {
        let description = self.describe();
        let Some(min) = Self::number_bound(min, "lower") else {
            return self;
        };
        let Some(wip) = &mut self.wip else {
            return self;
        };
        if !matches!(wip, Refinement::Number { .. }) {
            panic!("cannot refine the numeric range of a {description}");
        }
        let (current, current_inclusive) = wip.lower_bound();
        let tighter = min > current || (min == current && current_inclusive && !inclusive);
        if !tighter {
            return self;
        }
        let (max, max_inclusive) = wip.upper_bound();
        if min > max || (min == max && !(inclusive && max_inclusive)) {
            panic!("refining a {description} with lower bound {min} beyond its upper bound {max}");
        }
        if let Refinement::Number { lower, .. } = wip {
            *lower = Some(NumberBound {
                value: min,
                inclusive,
            });
        }
        self
    }

    /// The value will be at most `max`, or strictly less when `inclusive` is
    /// false. An unknown `max` is ignored.
    pub fn number_range_upper_bound(mut self, max: &Value, inclusive: bool) -> Self {
        let description = self.describe();
        let Some(max) = Self::number_bound(max, "upper") else {
            return self;
        };
        let Some(wip) = &mut self.wip else {
            return self;
        };
        if !matches!(wip, Refinement::Number { .. }) {
            panic!("cannot refine the numeric range of a {description}");
        }
        let (current, current_inclusive) = wip.upper_bound();
        let tighter = max < current || (max == current && current_inclusive && !inclusive);
        if !tighter {
            return self;
        }
        let (min, min_inclusive) = wip.lower_bound();
        if max < min || (max == min && !(inclusive && min_inclusive)) {
            panic!("refining a {description} with upper bound {max} below its lower bound {min}");
        }
        if let Refinement::Number { upper, .. } = wip {
            *upper = Some(NumberBound {
                value: max,
                inclusive,
            });
        }
        self
    }

    /// Both bounds, inclusive.
    pub fn number_range_inclusive(self, min: &Value, max: &Value) -> Self {
        self.number_range_lower_bound(min, true)
            .number_range_upper_bound(max, true)
    }

    /// The string will start with `prefix`, less its final grapheme cluster,
    /// since characters appended later could still combine with it.
    pub fn string_prefix(self, prefix: &str) -> Self {
        let prefix = normalize_string(prefix);
        let keep = prefix
            .grapheme_indices(true)
            .last()
            .map_or(0, |(start, _)| start);
        self.string_prefix_full(&prefix[..keep])
    }

    /// The string will start with exactly `prefix`. Only sound when the
    /// caller knows nothing can be appended that would change its last
    /// grapheme cluster.
    pub fn string_prefix_full(mut self, prefix: &str) -> Self {
        let description = self.describe();
        let known = self.orig.is_known() && !self.orig.is_null();
        let Some(wip) = &mut self.wip else {
            return self;
        };
        let Refinement::String { prefix: current, .. } = wip else {
            panic!("cannot refine the string prefix of a {description}");
        };
        let prefix = normalize_string(prefix);
        if current.starts_with(&prefix) {
            return self;
        }
        if known || !prefix.starts_with(current.as_str()) {
            panic!("refining a {description} with inconsistent prefix {prefix:?}");
        }
        *current = prefix;
        self
    }

    /// The collection will have at least `min` elements.
    pub fn collection_length_lower_bound(mut self, min: usize) -> Self {
        let description = self.describe();
        let Some(wip) = &mut self.wip else {
            return self;
        };
        let Refinement::Collection {
            min_len, max_len, ..
        } = wip
        else {
            panic!("cannot refine the length of a {description}");
        };
        if min <= *min_len {
            return self;
        }
        if min > *max_len {
            panic!("refining a {description} with length lower bound {min} beyond its upper bound {max_len}");
        }
        *min_len = min;
        self
    }

    /// The collection will have at most `max` elements.
    pub fn collection_length_upper_bound(mut self, max: usize) -> Self {
        let description = self.describe();
        let Some(wip) = &mut self.wip else {
            return self;
        };
        let Refinement::Collection {
            min_len, max_len, ..
        } = wip
        else {
            panic!("cannot refine the length of a {description}");
        };
        if max >= *max_len {
            return self;
        }
        if max < *min_len {
            panic!("refining a {description} with length upper bound {max} below its lower bound {min_len}");
        }
        *max_len = max;
        self
    }

    /// The collection will have exactly `len` elements.
    pub fn collection_length(self, len: usize) -> Self {
        self.collection_length_lower_bound(len)
            .collection_length_upper_bound(len)
    }

    /// The refined value. Known values come back unchanged; unknowns whose
    /// refinements pin down a single result become that known value.
    pub fn new_value(self) -> Value {
        let RefinementBuilder { orig, marks, wip } = self;
        let wip = match wip {
            Some(wip) if !orig.is_known() => wip,
            _ => return orig.with_marks(marks),
        };
        let value = match collapse(&orig.ty, &wip) {
            Some(value) => value,
            None => Value::unknown_refined(orig.ty, wip),
        };
        value.with_marks(marks)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Mark, Type, Value};

    #[test]
    fn point_range_collapses_to_number() {
        let value = Value::unknown(Type::Number)
            .refine()
            .number_range_inclusive(&Value::number_int(1), &Value::number_int(1))
            .not_null()
            .new_value();
        assert!(value.is_known());
        assert!(value.raw_equals(&Value::number_int(1)));
    }

    #[test]
    fn point_range_stays_unknown_while_nullable() {
        let value = Value::unknown(Type::Number)
            .refine()
            .number_range_inclusive(&Value::number_int(1), &Value::number_int(1))
            .new_value();
        assert!(!value.is_known());
    }

    #[test]
    fn looser_bounds_are_ignored() {
        let value = Value::unknown(Type::Number)
            .refine()
            .number_range_lower_bound(&Value::number_int(5), true)
            .number_range_lower_bound(&Value::number_int(2), true)
            .number_range_upper_bound(&Value::number_int(9), false)
            .number_range_upper_bound(&Value::number_int(20), true)
            .new_value();
        let range = value.range();
        assert_eq!(range.number_lower_bound(), (Value::number_int(5), true));
        assert_eq!(range.number_upper_bound(), (Value::number_int(9), false));
    }

    #[test]
    fn exclusive_bound_at_same_value_tightens() {
        let value = Value::unknown(Type::Number)
            .refine()
            .number_range_lower_bound(&Value::number_int(5), true)
            .number_range_lower_bound(&Value::number_int(5), false)
            .new_value();
        assert_eq!(value.range().number_lower_bound(), (Value::number_int(5), false));
    }

    #[test]
    #[should_panic(expected = "beyond its upper bound")]
    fn crossing_bounds_panic() {
        let _ = Value::unknown(Type::Number)
            .refine()
            .number_range_upper_bound(&Value::number_int(3), true)
            .number_range_lower_bound(&Value::number_int(4), true);
    }

    #[test]
    #[should_panic(expected = "as non-null")]
    fn known_null_fails_not_null_assertion() {
        let _ = Value::null(Type::String).refine().not_null();
    }

    #[test]
    #[should_panic(expected = "lower bound 10")]
    fn known_number_fails_range_assertion() {
        let _ = Value::number_int(3)
            .refine()
            .number_range_lower_bound(&Value::number_int(10), true);
    }

    #[test]
    fn known_values_pass_consistent_assertions() {
        let value = Value::string("hello")
            .refine()
            .not_null()
            .string_prefix_full("he")
            .new_value();
        assert!(value.raw_equals(&Value::string("hello")));
    }

    #[test]
    #[should_panic(expected = "inconsistent prefix")]
    fn known_string_rejects_longer_prefix() {
        let _ = Value::string("he").refine().string_prefix_full("hello");
    }

    #[test]
    #[should_panic(expected = "cannot refine the numeric range")]
    fn wrong_family_panics() {
        let _ = Value::unknown(Type::String)
            .refine()
            .number_range_lower_bound(&Value::number_int(0), true);
    }

    #[test]
    fn dynamic_unknowns_discard_refinements() {
        let value = Value::dynamic()
            .refine()
            .not_null()
            .number_range_lower_bound(&Value::number_int(0), true)
            .string_prefix("abc")
            .collection_length(3)
            .new_value();
        assert!(value.raw_equals(&Value::dynamic()));
    }

    #[test]
    fn string_prefix_drops_final_grapheme() {
        let value = Value::unknown(Type::String)
            .refine()
            .string_prefix("abc")
            .new_value();
        assert_eq!(value.range().string_prefix(), "ab");

        let value = Value::unknown(Type::String)
            .refine()
            .string_prefix_full("abc")
            .string_prefix_full("a")
            .new_value();
        assert_eq!(value.range().string_prefix(), "abc");
    }

    #[test]
    fn exact_collection_lengths_collapse() {
        let empty = Value::unknown(Type::list(Type::String))
            .refine()
            .not_null()
            .collection_length(0)
            .new_value();
        assert!(empty.raw_equals(&Value::list_empty(Type::String)));

        let pair = Value::unknown(Type::list(Type::String))
            .refine()
            .not_null()
            .collection_length(2)
            .new_value();
        assert!(pair.is_known());
        assert_eq!(pair.length_int(), 2);
        assert!(pair.as_value_vec().iter().all(|elem| !elem.is_known()));

        let single = Value::unknown(Type::set(Type::Bool))
            .refine()
            .not_null()
            .collection_length(1)
            .new_value();
        assert!(single.is_known());
        assert_eq!(single.length_int(), 1);

        let map = Value::unknown(Type::map(Type::Bool))
            .refine()
            .not_null()
            .collection_length(2)
            .new_value();
        assert!(!map.is_known());
    }

    #[test]
    fn null_refinement_collapses_to_null() {
        let value = Value::unknown(Type::Bool).refine().null().new_value();
        assert!(value.is_known());
        assert!(value.is_null());
        assert_eq!(value.ty(), &Type::Bool);
    }

    #[test]
    fn marks_are_reapplied() {
        let mark = Mark::new("m");
        let value = Value::unknown(Type::Number)
            .mark(mark.clone())
            .refine()
            .not_null()
            .new_value();
        assert!(value.has_mark(&mark));
        assert!(value.range().definitely_not_null());
    }

    #[test]
    fn refinements_accumulate_across_builders() {
        let first = Value::unknown(Type::list(Type::Bool))
            .refine()
            .collection_length_lower_bound(2)
            .new_value();
        let second = first.refine().collection_length_upper_bound(4).new_value();
        let range = second.range();
        assert_eq!((range.length_lower_bound(), range.length_upper_bound()), (2, 4));
    }
}
