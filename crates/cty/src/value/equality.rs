use super::{Payload, Value};
use crate::Type;

/// An unknown, non-null bool: the answer to a question that cannot be
/// decided yet.
pub(crate) fn unknown_bool() -> Value {
    Value::unknown(Type::Bool).refine_not_null()
}

/// All of `results` are true: false as soon as one is known false, unknown
/// if none are false but some are unknown.
fn all_equal(results: impl Iterator<Item = Value>) -> Value {
    let mut undecided = false;
    for result in results {
        if !result.is_known() {
            undecided = true;
        } else if result.is_known_false() {
            return Value::bool(false);
        }
    }
    if undecided {
        unknown_bool()
    } else {
        Value::bool(true)
    }
}

fn known_against_unknown(known: &Value, unknown: &Value) -> Value {
    if known.is_null() {
        if unknown.range().definitely_not_null() {
            return Value::bool(false);
        }
        return unknown_bool();
    }
    if known.ty.has_dynamic_types() || unknown.ty.has_dynamic_types() {
        return unknown_bool();
    }
    if !known.ty.equals(&unknown.ty) {
        return Value::bool(false);
    }
    if unknown.range().includes(known).is_known_false() {
        return Value::bool(false);
    }
    unknown_bool()
}

fn known_equals(a: &Value, b: &Value) -> Value {
    match (&a.payload, &b.payload) {
        (Payload::Number(x), Payload::Number(y)) => Value::bool(x == y),
        (Payload::String(x), Payload::String(y)) => Value::bool(x == y),
        (Payload::Bool(x), Payload::Bool(y)) => Value::bool(x == y),
        (Payload::Seq(x), Payload::Seq(y)) => {
            if x.len() != y.len() {
                return Value::bool(false);
            }
            all_equal(x.iter().zip(y.iter()).map(|(l, r)| l.equals(r)))
        }
        (Payload::Attrs(x), Payload::Attrs(y)) => {
            if x.len() != y.len() || x.keys().ne(y.keys()) {
                return Value::bool(false);
            }
            all_equal(x.values().zip(y.values()).map(|(l, r)| l.equals(r)))
        }
        (Payload::Set(x), Payload::Set(y)) => {
            let undecided = x.iter().chain(y.iter()).any(|elem| !elem.is_wholly_known());
            if undecided {
                return unknown_bool();
            }
            Value::bool(x.len() == y.len() && x.iter().all(|elem| y.has(elem)))
        }
        (Payload::Union(va, x), Payload::Union(vb, y)) => {
            if va != vb {
                return Value::bool(false);
            }
            x.equals(y)
        }
        (Payload::Capsule(x), Payload::Capsule(y)) => a.ty.capsule_ops().equals(x, y),
        _ => Value::bool(false),
    }
}

fn same(a: &Value, b: &Value, check_marks: bool) -> bool {
    if check_marks && a.marks != b.marks {
        return false;
    }
    if !a.ty.equals(&b.ty) {
        return false;
    }
    match (&a.payload, &b.payload) {
        (Payload::Null, Payload::Null) => true,
        (Payload::Unknown(x), Payload::Unknown(y)) => x == y,
        (Payload::Number(x), Payload::Number(y)) => x == y,
        (Payload::String(x), Payload::String(y)) => x == y,
        (Payload::Bool(x), Payload::Bool(y)) => x == y,
        (Payload::Seq(x), Payload::Seq(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| same(l, r, check_marks))
        }
        (Payload::Attrs(x), Payload::Attrs(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .zip(y.iter())
                    .all(|((kl, l), (kr, r))| kl == kr && same(l, r, check_marks))
        }
        // Unknown elements share a bucket and keep insertion order, so sets
        // holding the same unknowns added in another order are not identical.
        (Payload::Set(x), Payload::Set(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| same(l, r, check_marks))
        }
        (Payload::Union(va, x), Payload::Union(vb, y)) => va == vb && same(x, y, check_marks),
        (Payload::Capsule(x), Payload::Capsule(y)) => a.ty.capsule_ops().raw_equals(x, y),
        _ => false,
    }
}

impl Value {
    /// Language-level equality, as a bool value.
    ///
    /// The result is unknown when an operand is unknown, unless the types can
    /// never match or the unknown's refinements rule the other value out.
    /// Nulls equal only nulls, of any type. Marks from both operands are
    /// carried onto the result.
    pub fn equals(&self, other: &Value) -> Value {
        if self.contains_marked() || other.contains_marked() {
            let (a, a_marks) = self.clone().unmark_deep();
            let (b, b_marks) = other.clone().unmark_deep();
            return a.equals(&b).with_marks(a_marks).with_marks(b_marks);
        }
        match (self.is_known(), other.is_known()) {
            (false, false) => return unknown_bool(),
            (true, false) => return known_against_unknown(self, other),
            (false, true) => return known_against_unknown(other, self),
            (true, true) => {}
        }
        match (self.is_null(), other.is_null()) {
            (true, true) => return Value::bool(true),
            (true, false) | (false, true) => return Value::bool(false),
            (false, false) => {}
        }
        if !self.has_wholly_known_type() || !other.has_wholly_known_type() {
            if !self.ty.test_conformance(&other.ty) && !other.ty.test_conformance(&self.ty) {
                return Value::bool(false);
            }
            return unknown_bool();
        }
        if !self.ty.equals(&other.ty) {
            return Value::bool(false);
        }
        known_equals(self, other)
    }

    /// The negation of [`Value::equals`].
    pub fn not_equal(&self, other: &Value) -> Value {
        self.equals(other).not()
    }

    /// Structural equality that ignores marks and never returns unknown:
    /// unknowns are raw-equal when their types and refinements match.
    pub fn raw_equals(&self, other: &Value) -> bool {
        same(self, other, false)
    }

    /// Like [`Value::raw_equals`], but marks must match at every level too.
    pub fn identical(&self, other: &Value) -> bool {
        same(self, other, true)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.identical(other)
    }
}
