//! Values: a type, a payload that may be null or unknown, and a set of marks.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use num_bigint::BigInt;
use unicode_normalization::UnicodeNormalization;

use crate::refinement::Refinement;
use crate::{Number, ParseNumberError, Type, ValueMarks};

mod access;
mod debug;
mod equality;
mod ops;
pub(crate) mod set_rules;

pub use access::ElementIter;
pub use set_rules::{SET_ORDER_VERSION, ValueSet, ValueSetRules, compare_set_elements};

pub(crate) type SetPayload = cty_set::Set<Value, ValueSetRules>;

/// An immutable value of some [`Type`].
///
/// Cloning is cheap: nested payloads are shared. Equality via `==` is
/// [`Value::identical`]; the language-level comparison is [`Value::equals`].
#[derive(Clone)]
pub struct Value {
    pub(crate) ty: Type,
    pub(crate) payload: Payload,
    pub(crate) marks: ValueMarks,
}

#[derive(Clone)]
pub(crate) enum Payload {
    Null,
    /// Refinements are absent when nothing is known beyond the type.
    Unknown(Option<Arc<Refinement>>),
    Number(Number),
    String(Arc<str>),
    Bool(bool),
    /// List and tuple elements.
    Seq(Arc<Vec<Value>>),
    /// Object attributes and map entries.
    Attrs(Arc<BTreeMap<String, Value>>),
    Set(Arc<SetPayload>),
    Union(Arc<str>, Arc<Value>),
    Capsule(Arc<dyn Any + Send + Sync>),
}

/// NFC-normalizes a string the way string values, attribute names and map
/// keys are stored.
pub fn normalize_string(s: &str) -> String {
    s.nfc().collect()
}

/// Element type shared by `values`, where unknown or null values of dynamic
/// type adopt the first concrete type. `None` when the types disagree.
fn common_element_type<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Type> {
    let mut ety = Type::DynamicPseudoType;
    for value in values {
        if ety.is_dynamic() {
            ety = value.ty.clone();
        } else if !value.ty.is_dynamic() && !ety.equals(&value.ty) {
            return None;
        }
    }
    Some(ety)
}

/// Retypes a dynamic-typed placeholder element so it matches `ety`.
pub(crate) fn conform_element(value: Value, ety: &Type) -> Value {
    if !value.ty.is_dynamic() || ety.is_dynamic() {
        return value;
    }
    let (value, marks) = value.unmark();
    let placeholder = if value.is_null() {
        Value::null(ety.clone())
    } else {
        Value::unknown(ety.clone())
    };
    placeholder.with_marks(marks)
}

impl Value {
    fn known(ty: Type, payload: Payload) -> Value {
        Value {
            ty,
            payload,
            marks: ValueMarks::new(),
        }
    }

    pub fn number(value: impl Into<Number>) -> Value {
        Value::known(Type::Number, Payload::Number(value.into()))
    }

    pub fn number_int(value: i64) -> Value {
        Value::number(Number::from_i64(value))
    }

    pub fn number_uint(value: u64) -> Value {
        Value::number(Number::from_u64(value))
    }

    pub fn number_bigint(value: BigInt) -> Value {
        Value::number(Number::from_bigint(value))
    }

    /// Panics on `NaN`, which is not a number value.
    pub fn number_float(value: f64) -> Value {
        match Number::from_f64(value) {
            Some(number) => Value::number(number),
            None => panic!("NaN is not a valid number value"),
        }
    }

    pub fn parse_number(text: &str) -> Result<Value, ParseNumberError> {
        Number::parse(text).map(Value::number)
    }

    pub fn positive_infinity() -> Value {
        Value::number(Number::PositiveInfinity)
    }

    pub fn negative_infinity() -> Value {
        Value::number(Number::NegativeInfinity)
    }

    pub fn zero() -> Value {
        Value::number(Number::zero())
    }

    pub fn string(value: impl AsRef<str>) -> Value {
        let normalized = normalize_string(value.as_ref());
        Value::known(Type::String, Payload::String(Arc::from(normalized)))
    }

    pub fn bool(value: bool) -> Value {
        Value::known(Type::Bool, Payload::Bool(value))
    }

    pub fn true_() -> Value {
        Value::bool(true)
    }

    pub fn false_() -> Value {
        Value::bool(false)
    }

    /// A null of the given type.
    pub fn null(ty: Type) -> Value {
        Value {
            ty,
            payload: Payload::Null,
            marks: ValueMarks::new(),
        }
    }

    /// An unknown of the given type, with nothing known beyond the type.
    pub fn unknown(ty: Type) -> Value {
        Value {
            ty,
            payload: Payload::Unknown(None),
            marks: ValueMarks::new(),
        }
    }

    /// An unknown value of unknown type.
    pub fn dynamic() -> Value {
        Value::unknown(Type::DynamicPseudoType)
    }

    pub(crate) fn unknown_refined(ty: Type, refinement: Refinement) -> Value {
        let payload = if refinement.is_unconstrained() {
            Payload::Unknown(None)
        } else {
            Payload::Unknown(Some(Arc::new(refinement)))
        };
        Value {
            ty,
            payload,
            marks: ValueMarks::new(),
        }
    }

    pub fn can_list_val(values: &[Value]) -> bool {
        common_element_type(values).is_some()
    }

    pub fn can_set_val(values: &[Value]) -> bool {
        common_element_type(values).is_some()
    }

    pub fn can_map_val(values: &BTreeMap<String, Value>) -> bool {
        common_element_type(values.values()).is_some()
    }

    /// A list of the given elements. Panics when `elements` is empty (use
    /// [`Value::list_empty`]) or when element types disagree.
    pub fn list(elements: Vec<Value>) -> Value {
        if elements.is_empty() {
            panic!("Value::list requires at least one element; use Value::list_empty");
        }
        let Some(ety) = common_element_type(&elements) else {
            panic!("inconsistent list element types in {elements:?}");
        };
        let elements = elements
            .into_iter()
            .map(|value| conform_element(value, &ety))
            .collect();
        Value::known(Type::list(ety), Payload::Seq(Arc::new(elements)))
    }

    pub fn list_empty(element_type: Type) -> Value {
        Value::known(Type::list(element_type), Payload::Seq(Arc::new(Vec::new())))
    }

    /// A set of the given elements. Element marks move onto the set itself.
    /// Panics when `elements` is empty or element types disagree.
    pub fn set(elements: Vec<Value>) -> Value {
        if elements.is_empty() {
            panic!("Value::set requires at least one element; use Value::set_empty");
        }
        let Some(ety) = common_element_type(&elements) else {
            panic!("inconsistent set element types in {elements:?}");
        };
        let mut marks = ValueMarks::new();
        let mut set = SetPayload::new(ValueSetRules::new(ety.clone()));
        for element in elements {
            let (element, element_marks) = conform_element(element, &ety).unmark_deep();
            marks.extend(element_marks);
            set.add(element);
        }
        Value::known(Type::set(ety), Payload::Set(Arc::new(set))).with_marks(marks)
    }

    pub fn set_empty(element_type: Type) -> Value {
        let set = SetPayload::new(ValueSetRules::new(element_type.clone()));
        Value::known(Type::set(element_type), Payload::Set(Arc::new(set)))
    }

    pub(crate) fn from_value_set(set: SetPayload) -> Value {
        let ety = set.rules().element_type().clone();
        Value::known(Type::set(ety), Payload::Set(Arc::new(set)))
    }

    /// A map with the given entries. Keys are NFC-normalized. Panics when
    /// there are no entries or element types disagree.
    pub fn map<K, I>(entries: I) -> Value
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let entries: BTreeMap<String, Value> = entries
            .into_iter()
            .map(|(key, value)| (normalize_string(key.as_ref()), value))
            .collect();
        if entries.is_empty() {
            panic!("Value::map requires at least one entry; use Value::map_empty");
        }
        let Some(ety) = common_element_type(entries.values()) else {
            panic!("inconsistent map element types in {entries:?}");
        };
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key, conform_element(value, &ety)))
            .collect();
        Value::known(Type::map(ety), Payload::Attrs(Arc::new(entries)))
    }

    pub fn map_empty(element_type: Type) -> Value {
        Value::known(Type::map(element_type), Payload::Attrs(Arc::new(BTreeMap::new())))
    }

    /// An object whose type is derived from its attribute values.
    pub fn object<K, I>(attrs: I) -> Value
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let attrs: BTreeMap<String, Value> = attrs
            .into_iter()
            .map(|(name, value)| (normalize_string(name.as_ref()), value))
            .collect();
        let ty = Type::object(attrs.iter().map(|(name, value)| (name.clone(), value.ty.clone())));
        Value::known(ty, Payload::Attrs(Arc::new(attrs)))
    }

    pub fn empty_object() -> Value {
        Value::known(Type::empty_object(), Payload::Attrs(Arc::new(BTreeMap::new())))
    }

    pub fn tuple(elements: Vec<Value>) -> Value {
        let ty = Type::tuple(elements.iter().map(|value| value.ty.clone()).collect());
        Value::known(ty, Payload::Seq(Arc::new(elements)))
    }

    pub fn empty_tuple() -> Value {
        Value::tuple(Vec::new())
    }

    /// A union value occupying `variant`. Panics when `ty` is not a union
    /// type, has no such variant, or the value does not fit the variant.
    pub fn union(ty: Type, variant: &str, value: Value) -> Value {
        let variant = normalize_string(variant);
        let Some(variant_ty) = ty.union_variants().get(&variant) else {
            panic!("union type {ty:?} has no variant {variant:?}");
        };
        let fits = if variant_ty.has_dynamic_types() {
            value.ty.test_conformance(variant_ty)
        } else {
            value.ty.equals(&variant_ty.without_optional_attributes_deep())
        };
        if !fits {
            panic!(
                "union variant {variant:?} requires {} but the value is {}",
                variant_ty.friendly_name(),
                value.ty.friendly_name()
            );
        }
        Value::known(ty, Payload::Union(Arc::from(variant), Arc::new(value)))
    }

    /// Wraps a native payload in a capsule value. Panics when `ty` is not a
    /// capsule type for `T`.
    pub fn capsule<T: Any + Send + Sync>(ty: &Type, payload: T) -> Value {
        Value::capsule_arc(ty, Arc::new(payload))
    }

    /// Like [`Value::capsule`], for a payload that is already shared or whose
    /// concrete type is erased.
    pub fn capsule_arc(ty: &Type, payload: Arc<dyn Any + Send + Sync>) -> Value {
        let Some(cap) = ty.capsule_type() else {
            panic!("capsule value requires a capsule type, not {}", ty.friendly_name());
        };
        let erased: &dyn Any = &*payload;
        if erased.type_id() != cap.native_type_id() {
            panic!(
                "capsule type {:?} holds {} values",
                cap.name(),
                cap.native_type_name()
            );
        }
        Value::known(ty.clone(), Payload::Capsule(payload))
    }
}
