//! Set semantics for values: hashing, equivalence and the element order that
//! set iteration exposes to callers.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use cty_set::Rules;
use rustc_hash::FxHasher;

use super::{Payload, SetPayload, Value, conform_element};
use crate::Type;

/// Version of the element order produced by [`compare_set_elements`].
/// Callers that persist set iteration order can compare against it.
pub const SET_ORDER_VERSION: u32 = 1;

/// Hash of a value that ignores marks. Equal values hash equally.
pub(crate) fn hash_value(value: &Value) -> u64 {
    let mut hasher = FxHasher::default();
    write_hash(value, &mut hasher);
    hasher.finish()
}

fn write_hash(value: &Value, hasher: &mut FxHasher) {
    match &value.payload {
        Payload::Null => hasher.write_u8(0),
        Payload::Unknown(_) => hasher.write_u8(1),
        Payload::Number(n) => {
            hasher.write_u8(2);
            n.hash(hasher);
        }
        Payload::String(s) => {
            hasher.write_u8(3);
            s.hash(hasher);
        }
        Payload::Bool(b) => {
            hasher.write_u8(4);
            b.hash(hasher);
        }
        Payload::Seq(elems) => {
            hasher.write_u8(5);
            hasher.write_usize(elems.len());
            for elem in elems.iter() {
                write_hash(elem, hasher);
            }
        }
        Payload::Attrs(attrs) => {
            hasher.write_u8(6);
            for (key, elem) in attrs.iter() {
                key.hash(hasher);
                write_hash(elem, hasher);
            }
        }
        Payload::Set(set) => {
            // Order-independent so equal sets agree even on colliding elements.
            hasher.write_u8(7);
            let sum = set
                .iter()
                .fold(0u64, |acc, elem| acc.wrapping_add(hash_value(elem)));
            hasher.write_u64(sum);
        }
        Payload::Union(variant, inner) => {
            hasher.write_u8(8);
            variant.hash(hasher);
            write_hash(inner, hasher);
        }
        Payload::Capsule(payload) => {
            hasher.write_u8(9);
            let Some(cap) = value.ty.capsule_type() else {
                return;
            };
            match cap.ops().hash_key(payload.as_ref()) {
                Some(key) => key.hash(hasher),
                None if cap.ops().has_custom_equality() => hasher.write_u64(cap.id()),
                None => hasher.write_usize(Arc::as_ptr(payload).cast::<()>() as usize),
            }
        }
    }
}

fn rank(value: &Value) -> u8 {
    match value.payload {
        Payload::Null => 1,
        Payload::Unknown(_) => 2,
        _ => 0,
    }
}

/// The total order used for set iteration:
///
/// 1. known non-null elements first, then null, then unknowns;
/// 2. strings lexicographically, numbers numerically, `false` before `true`;
/// 3. every other kind by hash, which is stable but not meaningful.
///
/// Elements within one rank that compare equal keep bucket order.
pub fn compare_set_elements(a: &Value, b: &Value) -> Ordering {
    let by_rank = rank(a).cmp(&rank(b));
    if by_rank != Ordering::Equal || rank(a) != 0 {
        return by_rank;
    }
    match (&a.payload, &b.payload) {
        (Payload::String(x), Payload::String(y)) => x.cmp(y),
        (Payload::Number(x), Payload::Number(y)) => x.cmp(y),
        (Payload::Bool(x), Payload::Bool(y)) => x.cmp(y),
        _ => hash_value(a).cmp(&hash_value(b)),
    }
}

/// Rules for sets of values of one element type.
#[derive(Clone, Debug)]
pub struct ValueSetRules {
    element_type: Type,
}

impl ValueSetRules {
    pub fn new(element_type: Type) -> Self {
        Self { element_type }
    }

    pub fn element_type(&self) -> &Type {
        &self.element_type
    }
}

impl Rules<Value> for ValueSetRules {
    fn hash(&self, value: &Value) -> u64 {
        hash_value(value)
    }

    /// Only a known `true` from [`Value::equals`] counts, so unknown
    /// elements never coalesce with anything.
    fn equivalent(&self, a: &Value, b: &Value) -> bool {
        a.equals(b).is_known_true()
    }

    fn same_rules(&self, other: &Self) -> bool {
        self.element_type.equals(&other.element_type)
    }

    fn order(&self, a: &Value, b: &Value) -> Ordering {
        compare_set_elements(a, b)
    }
}

/// A mutable set of unmarked values of one element type, for callers that
/// build or combine set contents outside of a set [`Value`].
#[derive(Clone)]
pub struct ValueSet {
    inner: SetPayload,
}

impl ValueSet {
    pub fn new(element_type: Type) -> Self {
        Self {
            inner: SetPayload::new(ValueSetRules::new(element_type)),
        }
    }

    pub(crate) fn from_payload(inner: SetPayload) -> Self {
        Self { inner }
    }

    pub fn element_type(&self) -> &Type {
        self.inner.rules().element_type()
    }

    /// Adds `value`, returning whether the set changed. Panics on marked
    /// values and values of another type.
    pub fn add(&mut self, value: Value) -> bool {
        if value.contains_marked() {
            panic!("marked values cannot be stored in a ValueSet; unmark them first");
        }
        let value = conform_element(value, self.element_type());
        if !value.ty.equals(self.element_type()) {
            panic!(
                "cannot add a {} value to a set of {}",
                value.ty.friendly_name(),
                self.element_type().friendly_name()
            );
        }
        self.inner.add(value)
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        self.inner.remove(value).is_some()
    }

    pub fn has(&self, value: &Value) -> bool {
        self.inner.has(value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn values(&self) -> Vec<Value> {
        self.inner.to_vec()
    }

    pub fn union(&self, other: &ValueSet) -> ValueSet {
        Self::from_payload(self.inner.union(&other.inner))
    }

    pub fn intersection(&self, other: &ValueSet) -> ValueSet {
        Self::from_payload(self.inner.intersection(&other.inner))
    }

    pub fn subtract(&self, other: &ValueSet) -> ValueSet {
        Self::from_payload(self.inner.subtract(&other.inner))
    }

    pub fn symmetric_difference(&self, other: &ValueSet) -> ValueSet {
        Self::from_payload(self.inner.symmetric_difference(&other.inner))
    }

    /// A known set value holding these elements.
    pub fn to_value(&self) -> Value {
        Value::from_value_set(self.inner.clone())
    }
}

impl fmt::Debug for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}
