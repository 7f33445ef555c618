//! Arithmetic, comparison and logic on values.
//!
//! Operands are type-checked first; a mismatch is a programming error and
//! panics. Arithmetic on an operand of dynamic type short-circuits to
//! [`Value::dynamic`], while comparisons and logic give an unknown bool;
//! unknown operands give unknown results carrying whatever refinements the
//! operation can derive. Marks are stripped from the operands and carried
//! onto the result.

use super::equality::unknown_bool;
use super::Value;
use crate::refinement::{RefinementBuilder, ValueRange};
use crate::{Number, Type};

fn check_operands(op: &str, want: &Type, operands: &[&Value]) {
    for (i, value) in operands.iter().enumerate() {
        if !value.ty.is_dynamic() && !value.ty.equals(want) {
            panic!(
                "{op}: type mismatch: want {} but value {i} is {}",
                want.friendly_name(),
                value.ty.friendly_name()
            );
        }
    }
}

/// Applies `op` to unmarked operands and marks the result with the union of
/// their marks. `None` when neither operand is marked.
fn remarked(a: &Value, b: &Value, op: impl FnOnce(&Value, &Value) -> Value) -> Option<Value> {
    if !a.is_marked() && !b.is_marked() {
        return None;
    }
    let (a, a_marks) = a.clone().unmark();
    let (b, b_marks) = b.clone().unmark();
    Some(op(&a, &b).with_marks(a_marks).with_marks(b_marks))
}

fn remarked_unary(a: &Value, op: impl FnOnce(&Value) -> Value) -> Option<Value> {
    if !a.is_marked() {
        return None;
    }
    let (a, marks) = a.clone().unmark();
    Some(op(&a).with_marks(marks))
}

fn number_of<'a>(op: &str, value: &'a Value) -> &'a Number {
    match value.as_number_unmarked() {
        Some(n) => n,
        None => panic!("{op}: cannot operate on a null number"),
    }
}

type Bounds = fn(RefinementBuilder, &ValueRange, &ValueRange) -> RefinementBuilder;

fn numeric(
    op: &str,
    a: &Value,
    b: &Value,
    bounds: Bounds,
    compute: impl FnOnce(&Number, &Number) -> Option<Number>,
) -> Value {
    check_operands(op, &Type::Number, &[a, b]);
    if a.ty.is_dynamic() || b.ty.is_dynamic() {
        return Value::dynamic();
    }
    if !a.is_known() || !b.is_known() {
        let builder = Value::unknown(Type::Number).refine().not_null();
        return bounds(builder, &a.range(), &b.range()).new_value();
    }
    let (x, y) = (number_of(op, a), number_of(op, b));
    match compute(x, y) {
        Some(result) => Value::number(result),
        None => panic!("{op}: {x} and {y} have no numeric result"),
    }
}

fn no_bounds(builder: RefinementBuilder, _: &ValueRange, _: &ValueRange) -> RefinementBuilder {
    builder
}

fn lower_bound(builder: RefinementBuilder, bound: Option<Number>, inclusive: bool) -> RefinementBuilder {
    match bound {
        Some(n) => builder.number_range_lower_bound(&Value::number(n), inclusive),
        None => builder,
    }
}

fn upper_bound(builder: RefinementBuilder, bound: Option<Number>, inclusive: bool) -> RefinementBuilder {
    match bound {
        Some(n) => builder.number_range_upper_bound(&Value::number(n), inclusive),
        None => builder,
    }
}

fn sum_bounds(builder: RefinementBuilder, a: &ValueRange, b: &ValueRange) -> RefinementBuilder {
    let ((al, ali), (au, aui)) = (a.lower(), a.upper());
    let ((bl, bli), (bu, bui)) = (b.lower(), b.upper());
    let builder = lower_bound(builder, al.checked_add(&bl), ali && bli);
    upper_bound(builder, au.checked_add(&bu), aui && bui)
}

fn difference_bounds(builder: RefinementBuilder, a: &ValueRange, b: &ValueRange) -> RefinementBuilder {
    let ((al, ali), (au, aui)) = (a.lower(), a.upper());
    let ((bl, bli), (bu, bui)) = (b.lower(), b.upper());
    let builder = lower_bound(builder, al.checked_sub(&bu), ali && bui);
    upper_bound(builder, au.checked_sub(&bl), aui && bli)
}

/// `Some(true)` when every possible `a` is below every possible `b`,
/// `Some(false)` when none is.
fn decide_less(a: &ValueRange, b: &ValueRange, or_equal: bool) -> Option<bool> {
    let ((al, ali), (au, aui)) = (a.lower(), a.upper());
    let ((bl, bli), (bu, bui)) = (b.lower(), b.upper());
    let always = if or_equal {
        au <= bl
    } else {
        au < bl || (au == bl && !(aui && bli))
    };
    if always {
        return Some(true);
    }
    let never = if or_equal {
        al > bu || (al == bu && !(ali && bui))
    } else {
        al >= bu
    };
    never.then_some(false)
}

fn comparison(op: &str, a: &Value, b: &Value, or_equal: bool) -> Value {
    check_operands(op, &Type::Number, &[a, b]);
    if a.ty.is_dynamic() || b.ty.is_dynamic() {
        return unknown_bool();
    }
    if !a.is_known() || !b.is_known() {
        return match decide_less(&a.range(), &b.range(), or_equal) {
            Some(result) => Value::bool(result),
            None => unknown_bool(),
        };
    }
    let (x, y) = (number_of(op, a), number_of(op, b));
    Value::bool(if or_equal { x <= y } else { x < y })
}

fn bool_of(op: &str, value: &Value) -> Option<bool> {
    if !value.is_known() {
        return None;
    }
    if value.is_null() {
        panic!("{op}: cannot operate on a null bool");
    }
    Some(value.as_bool())
}

impl Value {
    pub fn add(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::add) {
            return result;
        }
        numeric("add", self, other, sum_bounds, Number::checked_add)
    }

    pub fn subtract(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::subtract) {
            return result;
        }
        numeric("subtract", self, other, difference_bounds, Number::checked_sub)
    }

    pub fn multiply(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::multiply) {
            return result;
        }
        numeric("multiply", self, other, no_bounds, Number::checked_mul)
    }

    /// Dividing a non-zero number by zero gives a signed infinity. Panics
    /// for `0/0` and for an infinity divided by an infinity.
    pub fn divide(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::divide) {
            return result;
        }
        numeric("divide", self, other, no_bounds, Number::checked_div)
    }

    /// Truncated remainder, taking the sign of `self`. An infinite operand
    /// gives the product of the operands; a zero divisor gives `self`.
    pub fn modulo(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::modulo) {
            return result;
        }
        numeric("modulo", self, other, no_bounds, |x, y| {
            if x.is_infinite() || y.is_infinite() {
                x.checked_mul(y)
            } else if y.is_zero() {
                Some(x.clone())
            } else {
                x.checked_rem(y)
            }
        })
    }

    pub fn negate(&self) -> Value {
        if let Some(result) = remarked_unary(self, Value::negate) {
            return result;
        }
        check_operands("negate", &Type::Number, &[self]);
        if self.ty.is_dynamic() {
            return Value::dynamic();
        }
        if !self.is_known() {
            let range = self.range();
            let ((lower, lower_inclusive), (upper, upper_inclusive)) = (range.lower(), range.upper());
            let builder = Value::unknown(Type::Number).refine().not_null();
            let builder = lower_bound(builder, Some(upper.negate()), upper_inclusive);
            return upper_bound(builder, Some(lower.negate()), lower_inclusive).new_value();
        }
        Value::number(number_of("negate", self).negate())
    }

    pub fn absolute(&self) -> Value {
        if let Some(result) = remarked_unary(self, Value::absolute) {
            return result;
        }
        check_operands("absolute", &Type::Number, &[self]);
        if self.ty.is_dynamic() {
            return Value::dynamic();
        }
        if !self.is_known() {
            return Value::unknown(Type::Number)
                .refine()
                .not_null()
                .number_range_lower_bound(&Value::zero(), true)
                .new_value();
        }
        Value::number(number_of("absolute", self).abs())
    }

    pub fn less_than(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::less_than) {
            return result;
        }
        comparison("less_than", self, other, false)
    }

    pub fn greater_than(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::greater_than) {
            return result;
        }
        comparison("greater_than", other, self, false)
    }

    pub fn less_than_or_equal_to(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::less_than_or_equal_to) {
            return result;
        }
        comparison("less_than_or_equal_to", self, other, true)
    }

    pub fn greater_than_or_equal_to(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::greater_than_or_equal_to) {
            return result;
        }
        comparison("greater_than_or_equal_to", other, self, true)
    }

    /// Logical and. A known `false` on either side decides the result even
    /// when the other side is unknown.
    pub fn and(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::and) {
            return result;
        }
        check_operands("and", &Type::Bool, &[self, other]);
        if self.ty.is_dynamic() || other.ty.is_dynamic() {
            return unknown_bool();
        }
        match (bool_of("and", self), bool_of("and", other)) {
            (Some(false), _) | (_, Some(false)) => Value::bool(false),
            (Some(true), Some(true)) => Value::bool(true),
            _ => unknown_bool(),
        }
    }

    /// Logical or. A known `true` on either side decides the result even
    /// when the other side is unknown.
    pub fn or(&self, other: &Value) -> Value {
        if let Some(result) = remarked(self, other, Value::or) {
            return result;
        }
        check_operands("or", &Type::Bool, &[self, other]);
        if self.ty.is_dynamic() || other.ty.is_dynamic() {
            return unknown_bool();
        }
        match (bool_of("or", self), bool_of("or", other)) {
            (Some(true), _) | (_, Some(true)) => Value::bool(true),
            (Some(false), Some(false)) => Value::bool(false),
            _ => unknown_bool(),
        }
    }

    pub fn not(&self) -> Value {
        if let Some(result) = remarked_unary(self, Value::not) {
            return result;
        }
        check_operands("not", &Type::Bool, &[self]);
        if self.ty.is_dynamic() {
            return unknown_bool();
        }
        match bool_of("not", self) {
            Some(b) => Value::bool(!b),
            None => unknown_bool(),
        }
    }
}
