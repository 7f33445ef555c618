use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Payload, Value};
use crate::{Number, Type, ValueSet};

/// Iterates `(key, element)` pairs: integer indexes for lists, tuples and
/// sets, string keys for maps and objects.
pub type ElementIter<'a> = Box<dyn Iterator<Item = (Value, Value)> + 'a>;

impl Value {
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn is_known(&self) -> bool {
        !matches!(self.payload, Payload::Unknown(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.payload, Payload::Null)
    }

    /// Whether this value and everything nested inside it is known.
    pub fn is_wholly_known(&self) -> bool {
        match &self.payload {
            Payload::Unknown(_) => false,
            Payload::Seq(elems) => elems.iter().all(Value::is_wholly_known),
            Payload::Attrs(attrs) => attrs.values().all(Value::is_wholly_known),
            Payload::Set(set) => set.iter().all(Value::is_wholly_known),
            Payload::Union(_, inner) => inner.is_wholly_known(),
            _ => true,
        }
    }

    /// False when some unknown nested within this value has a dynamic type,
    /// so the value's full type cannot yet be known.
    pub fn has_wholly_known_type(&self) -> bool {
        if self.ty.is_dynamic() {
            return false;
        }
        match &self.payload {
            Payload::Seq(elems) => elems.iter().all(Value::has_wholly_known_type),
            Payload::Attrs(attrs) => attrs.values().all(Value::has_wholly_known_type),
            Payload::Set(set) => set.iter().all(Value::has_wholly_known_type),
            Payload::Union(_, inner) => inner.has_wholly_known_type(),
            Payload::Unknown(_) | Payload::Null => !self.ty.has_dynamic_types(),
            _ => true,
        }
    }

    pub(crate) fn assert_unmarked(&self, operation: &str) {
        if !self.marks.is_empty() {
            panic!("{operation} called on a marked value; unmark it first");
        }
    }

    fn assert_known_not_null(&self, operation: &str) {
        self.assert_unmarked(operation);
        if !self.is_known() {
            panic!("{operation} called on an unknown value");
        }
        if self.is_null() {
            panic!("{operation} called on a null value");
        }
    }

    /// The string payload. Panics unless this is a known, non-null, unmarked
    /// string.
    pub fn as_string(&self) -> &str {
        self.assert_known_not_null("as_string");
        match &self.payload {
            Payload::String(s) => s,
            _ => panic!("as_string called on a {} value", self.ty.friendly_name()),
        }
    }

    /// The number payload, under the same conditions as [`Value::as_string`].
    pub fn as_number(&self) -> &Number {
        self.assert_known_not_null("as_number");
        match &self.payload {
            Payload::Number(n) => n,
            _ => panic!("as_number called on a {} value", self.ty.friendly_name()),
        }
    }

    pub(crate) fn as_number_unmarked(&self) -> Option<&Number> {
        match &self.payload {
            Payload::Number(n) => Some(n),
            _ => None,
        }
    }

    pub(crate) fn as_string_unmarked(&self) -> Option<String> {
        match &self.payload {
            Payload::String(s) => Some(s.to_string()),
            _ => None,
        }
    }

    /// The number as an `i64`, or `None` if it is not an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().to_i64()
    }

    pub fn as_f64(&self) -> f64 {
        self.as_number().to_f64()
    }

    pub fn as_bool(&self) -> bool {
        self.assert_known_not_null("as_bool");
        match &self.payload {
            Payload::Bool(b) => *b,
            _ => panic!("as_bool called on a {} value", self.ty.friendly_name()),
        }
    }

    pub fn is_true(&self) -> bool {
        self.as_bool()
    }

    pub fn is_false(&self) -> bool {
        !self.as_bool()
    }

    /// True only for an unmarked, known `true` boolean; never panics.
    pub fn is_known_true(&self) -> bool {
        self.marks.is_empty() && matches!(self.payload, Payload::Bool(true))
    }

    pub fn is_known_false(&self) -> bool {
        self.marks.is_empty() && matches!(self.payload, Payload::Bool(false))
    }

    /// Whether [`Value::element_iter`] may be called.
    pub fn can_iterate_elements(&self) -> bool {
        self.is_known()
            && !self.is_null()
            && matches!(
                self.ty,
                Type::List(_) | Type::Set(_) | Type::Map(_) | Type::Object(_) | Type::Tuple(_)
            )
    }

    pub fn element_iter(&self) -> ElementIter<'_> {
        self.assert_known_not_null("element_iter");
        match &self.payload {
            Payload::Seq(elems) => Box::new(
                elems
                    .iter()
                    .enumerate()
                    .map(|(i, elem)| (Value::number_uint(i as u64), elem.clone())),
            ),
            Payload::Attrs(attrs) => Box::new(
                attrs
                    .iter()
                    .map(|(key, elem)| (Value::string(key), elem.clone())),
            ),
            Payload::Set(set) => Box::new(
                set.to_vec()
                    .into_iter()
                    .enumerate()
                    .map(|(i, elem)| (Value::number_uint(i as u64), elem)),
            ),
            _ => panic!("element_iter called on a {} value", self.ty.friendly_name()),
        }
    }

    /// Elements of a list, set or tuple in iteration order.
    pub fn as_value_vec(&self) -> Vec<Value> {
        self.element_iter().map(|(_, elem)| elem).collect()
    }

    /// Entries of a map or attributes of an object.
    pub fn as_value_map(&self) -> BTreeMap<String, Value> {
        self.assert_known_not_null("as_value_map");
        match &self.payload {
            Payload::Attrs(attrs) => (**attrs).clone(),
            _ => panic!("as_value_map called on a {} value", self.ty.friendly_name()),
        }
    }

    /// The elements of a set value as a standalone [`ValueSet`].
    pub fn as_value_set(&self) -> ValueSet {
        self.assert_known_not_null("as_value_set");
        match &self.payload {
            Payload::Set(set) => ValueSet::from_payload((**set).clone()),
            _ => panic!("as_value_set called on a {} value", self.ty.friendly_name()),
        }
    }

    /// The number of elements, as a number value. Unknown collections give
    /// an unknown number bounded by their length refinement.
    pub fn length(&self) -> Value {
        if self.is_marked() {
            let (value, marks) = self.clone().unmark();
            return value.length().with_marks(marks);
        }
        if let Type::Tuple(elems) = &self.ty {
            return Value::number_uint(elems.len() as u64);
        }
        if self.ty.is_dynamic() {
            return Value::unknown(Type::Number).refine_not_null();
        }
        if !self.is_known() || (self.ty.is_set_type() && !self.is_wholly_known()) {
            let range = self.range();
            let lower = range.length_lower_bound();
            let upper = range.length_upper_bound();
            let mut refined = Value::unknown(Type::Number)
                .refine()
                .not_null()
                .number_range_lower_bound(&Value::number_uint(lower as u64), true);
            if upper != usize::MAX {
                refined = refined.number_range_upper_bound(&Value::number_uint(upper as u64), true);
            }
            return refined.new_value();
        }
        Value::number_uint(self.length_int() as u64)
    }

    /// The number of elements of a known collection or structural value.
    pub fn length_int(&self) -> usize {
        self.assert_known_not_null("length_int");
        match &self.payload {
            Payload::Seq(elems) => elems.len(),
            Payload::Attrs(attrs) => attrs.len(),
            Payload::Set(set) => set.len(),
            _ => panic!("length_int called on a {} value", self.ty.friendly_name()),
        }
    }

    /// An attribute of an object value. Unknown objects give unknown
    /// attributes. On a union value, the chosen variant's payload, or a null
    /// of the variant type for any other variant.
    pub fn get_attr(&self, name: &str) -> Value {
        if self.is_marked() {
            let (value, marks) = self.clone().unmark();
            return value.get_attr(name).with_marks(marks);
        }
        if self.ty.is_dynamic() {
            return Value::dynamic();
        }
        let attr_ty = match &self.ty {
            Type::Object(obj) => obj.attrs.get(name),
            Type::Union(union) => union.variants.get(name),
            _ => None,
        };
        let Some(attr_ty) = attr_ty else {
            panic!("{} has no attribute {name:?}", self.ty.friendly_name());
        };
        match &self.payload {
            Payload::Unknown(_) => Value::unknown(attr_ty.without_optional_attributes_deep()),
            Payload::Null => panic!("get_attr({name:?}) called on a null value"),
            Payload::Attrs(attrs) => match attrs.get(name) {
                Some(value) => value.clone(),
                None => panic!("object value is missing attribute {name:?}"),
            },
            Payload::Union(variant, inner) if &**variant == name => (**inner).clone(),
            Payload::Union(..) => Value::null(attr_ty.without_optional_attributes_deep()),
            _ => unreachable!("object payload mismatch"),
        }
    }

    /// The element at `key` of a list, tuple or map value.
    pub fn index(&self, key: &Value) -> Value {
        if self.is_marked() || key.is_marked() {
            let (value, marks) = self.clone().unmark();
            let (key, key_marks) = key.clone().unmark();
            return value.index(&key).with_marks(marks).with_marks(key_marks);
        }
        if self.ty.is_dynamic() || key.ty.is_dynamic() {
            return Value::dynamic();
        }
        if key.is_null() {
            panic!("index called with a null key");
        }
        match &self.ty {
            Type::List(ety) => {
                if key.ty != Type::Number {
                    panic!("list index must be a number, not {}", key.ty.friendly_name());
                }
                if !self.is_known() || !key.is_known() {
                    return Value::unknown((**ety).clone());
                }
                self.sequence_element(key)
            }
            Type::Tuple(elems) => {
                if key.ty != Type::Number {
                    panic!("tuple index must be a number, not {}", key.ty.friendly_name());
                }
                if !key.is_known() {
                    return Value::dynamic();
                }
                let Some(index) = key.as_number().to_u64().map(|i| i as usize) else {
                    panic!("tuple index must be a whole number");
                };
                let Some(ety) = elems.get(index) else {
                    panic!("tuple index {index} is out of range");
                };
                if !self.is_known() {
                    return Value::unknown(ety.clone());
                }
                self.sequence_element(key)
            }
            Type::Map(ety) => {
                if key.ty != Type::String {
                    panic!("map key must be a string, not {}", key.ty.friendly_name());
                }
                if !self.is_known() || !key.is_known() {
                    return Value::unknown((**ety).clone());
                }
                if self.is_null() {
                    panic!("index called on a null map");
                }
                match &self.payload {
                    Payload::Attrs(attrs) => match attrs.get(key.as_string()) {
                        Some(value) => value.clone(),
                        None => panic!("map has no element for key {:?}", key.as_string()),
                    },
                    _ => unreachable!("map payload mismatch"),
                }
            }
            other => panic!("index called on a {} value", other.friendly_name()),
        }
    }

    fn sequence_element(&self, key: &Value) -> Value {
        let Payload::Seq(elems) = &self.payload else {
            panic!("index called on a null {}", self.ty.friendly_name());
        };
        let element = key
            .as_number()
            .to_u64()
            .and_then(|i| elems.get(i as usize));
        match element {
            Some(value) => value.clone(),
            None => panic!("index {} is out of range", key.as_number()),
        }
    }

    /// Whether [`Value::index`] would find an element at `key`, as a bool
    /// value. Unknown operands give an unknown result.
    pub fn has_index(&self, key: &Value) -> Value {
        if self.is_marked() || key.is_marked() {
            let (value, marks) = self.clone().unmark();
            let (key, key_marks) = key.clone().unmark();
            return value.has_index(&key).with_marks(marks).with_marks(key_marks);
        }
        if self.ty.is_dynamic() || key.ty.is_dynamic() {
            return Value::unknown(Type::Bool).refine_not_null();
        }
        match &self.ty {
            Type::List(_) | Type::Tuple(_) => {
                if key.ty != Type::Number {
                    return Value::bool(false);
                }
                if !key.is_known() {
                    return Value::unknown(Type::Bool).refine_not_null();
                }
                if key.is_null() {
                    return Value::bool(false);
                }
                let Some(index) = key.as_number().to_u64() else {
                    return Value::bool(false);
                };
                if let Type::Tuple(elems) = &self.ty {
                    return Value::bool((index as usize) < elems.len());
                }
                if !self.is_known() {
                    return Value::unknown(Type::Bool).refine_not_null();
                }
                if self.is_null() {
                    return Value::bool(false);
                }
                Value::bool((index as usize) < self.length_int())
            }
            Type::Map(_) => {
                if key.ty != Type::String {
                    return Value::bool(false);
                }
                if !self.is_known() || !key.is_known() {
                    return Value::unknown(Type::Bool).refine_not_null();
                }
                if self.is_null() || key.is_null() {
                    return Value::bool(false);
                }
                match &self.payload {
                    Payload::Attrs(attrs) => Value::bool(attrs.contains_key(key.as_string())),
                    _ => Value::bool(false),
                }
            }
            other => panic!("has_index called on a {} value", other.friendly_name()),
        }
    }

    /// Whether a set value contains `element`, as a bool value.
    pub fn has_element(&self, element: &Value) -> Value {
        if self.is_marked() || element.is_marked() {
            let (value, marks) = self.clone().unmark();
            let (element, element_marks) = element.clone().unmark_deep();
            return value
                .has_element(&element)
                .with_marks(marks)
                .with_marks(element_marks);
        }
        let Type::Set(ety) = &self.ty else {
            panic!("has_element called on a {} value", self.ty.friendly_name());
        };
        if !element.ty.equals(ety) && !element.ty.is_dynamic() && !ety.is_dynamic() {
            return Value::bool(false);
        }
        if !self.is_known() || !element.is_known() {
            return Value::unknown(Type::Bool).refine_not_null();
        }
        if self.is_null() {
            panic!("has_element called on a null set");
        }
        match &self.payload {
            Payload::Set(set) => {
                if set.has(element) {
                    Value::bool(true)
                } else if set.iter().any(|v| !v.is_wholly_known()) || !element.is_wholly_known() {
                    Value::unknown(Type::Bool).refine_not_null()
                } else {
                    Value::bool(false)
                }
            }
            _ => unreachable!("set payload mismatch"),
        }
    }

    /// The occupied variant of a union value and its payload.
    pub fn union_variant(&self) -> (&str, &Value) {
        self.assert_known_not_null("union_variant");
        match &self.payload {
            Payload::Union(variant, inner) => (&**variant, &**inner),
            _ => panic!("union_variant called on a {} value", self.ty.friendly_name()),
        }
    }

    /// The native payload of a capsule value, if it holds a `T`.
    pub fn encapsulated<T: Any>(&self) -> Option<&T> {
        self.assert_known_not_null("encapsulated");
        match &self.payload {
            Payload::Capsule(payload) => payload.downcast_ref::<T>(),
            _ => panic!("encapsulated called on a {} value", self.ty.friendly_name()),
        }
    }

    /// The type-erased native payload of a capsule value.
    pub fn capsule_payload(&self) -> &Arc<dyn Any + Send + Sync> {
        self.assert_known_not_null("capsule_payload");
        match &self.payload {
            Payload::Capsule(payload) => payload,
            _ => panic!("capsule_payload called on a {} value", self.ty.friendly_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mark;

    #[test]
    fn element_iter_yields_keys() {
        let list = Value::list(vec![Value::string("a"), Value::string("b")]);
        let pairs: Vec<(i64, String)> = list
            .element_iter()
            .map(|(k, v)| (k.as_i64().expect("index"), v.as_string().to_string()))
            .collect();
        assert_eq!(pairs, vec![(0, "a".to_string()), (1, "b".to_string())]);

        let map = Value::map([("y", Value::bool(true)), ("x", Value::bool(false))]);
        let keys: Vec<String> = map
            .element_iter()
            .map(|(k, _)| k.as_string().to_string())
            .collect();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[test]
    fn index_into_collections() {
        let list = Value::list(vec![Value::number_int(10), Value::number_int(20)]);
        assert!(list.index(&Value::number_int(1)).raw_equals(&Value::number_int(20)));
        let tuple = Value::tuple(vec![Value::string("a"), Value::bool(true)]);
        assert!(tuple.index(&Value::number_int(1)).raw_equals(&Value::bool(true)));
        let map = Value::map([("k", Value::string("v"))]);
        assert!(map.index(&Value::string("k")).raw_equals(&Value::string("v")));
    }

    #[test]
    fn unknown_collections_index_to_unknown_elements() {
        let list = Value::unknown(Type::list(Type::Bool));
        let elem = list.index(&Value::number_int(3));
        assert_eq!(elem.ty(), &Type::Bool);
        assert!(!elem.is_known());
        let tuple = Value::unknown(Type::tuple(vec![Type::String]));
        assert_eq!(tuple.index(&Value::number_int(0)).ty(), &Type::String);
    }

    #[test]
    fn has_index_checks_bounds() {
        let list = Value::list(vec![Value::number_int(1)]);
        assert!(list.has_index(&Value::number_int(0)).is_true());
        assert!(list.has_index(&Value::number_int(1)).is_false());
        assert!(list.has_index(&Value::string("0")).is_false());
        assert!(!list.has_index(&Value::unknown(Type::Number)).is_known());
        let map = Value::map([("k", Value::bool(true))]);
        assert!(map.has_index(&Value::string("k")).is_true());
        assert!(map.has_index(&Value::string("z")).is_false());
    }

    #[test]
    fn marks_survive_access() {
        let secret = Mark::new("secret");
        let obj = Value::object([("a", Value::string("x"))]).mark(secret.clone());
        let attr = obj.get_attr("a");
        assert!(attr.has_mark(&secret));
        let len = obj.length();
        assert!(len.has_mark(&secret));
    }

    #[test]
    fn unknown_length_is_bounded_by_refinement() {
        let list = Value::unknown(Type::list(Type::String))
            .refine()
            .collection_length_lower_bound(2)
            .collection_length_upper_bound(5)
            .new_value();
        let len = list.length();
        assert!(!len.is_known());
        let range = len.range();
        assert!(range.definitely_not_null());
        assert_eq!(range.number_lower_bound(), (Value::number_int(2), true));
        assert_eq!(range.number_upper_bound(), (Value::number_int(5), true));
    }

    #[test]
    fn union_get_attr_selects_variant() {
        let ty = Type::union([("a", Type::String), ("b", Type::Number)]);
        let value = Value::union(ty, "a", Value::string("x"));
        assert!(value.get_attr("a").raw_equals(&Value::string("x")));
        assert!(value.get_attr("b").is_null());
    }

    #[test]
    fn has_element_on_sets() {
        let set = Value::set(vec![Value::string("a"), Value::string("b")]);
        assert!(set.has_element(&Value::string("a")).is_true());
        assert!(set.has_element(&Value::string("c")).is_false());
        assert!(set.has_element(&Value::number_int(1)).is_false());
        assert!(!set.has_element(&Value::unknown(Type::String)).is_known());
    }

    #[test]
    #[should_panic(expected = "marked value")]
    fn raw_access_rejects_marks() {
        let _ = Value::string("x").mark(Mark::new("m")).as_string();
    }
}
