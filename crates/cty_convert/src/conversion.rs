use std::fmt;
use std::sync::Arc;

use cty::{Path, PathError, Type, Value};

use crate::dynamic::dynamic_replace;
use crate::mismatch_message;
use crate::{capsule, collection, dynamic, object, primitive, tuple, union};

type ConvertFn = dyn Fn(&Value, &mut Path) -> Result<Value, PathError> + Send + Sync;

/// A conversion resolved ahead of time for one pair of types.
///
/// Applying it to a value of the source type produces a value of the target
/// type, or a [`PathError`] locating the nested value that could not be
/// converted. Marks on the input are carried over to the result.
#[derive(Clone)]
pub struct Conversion(Arc<ConvertFn>);

impl Conversion {
    pub(crate) fn new(
        f: impl Fn(&Value, &mut Path) -> Result<Value, PathError> + Send + Sync + 'static,
    ) -> Self {
        Conversion(Arc::new(f))
    }

    pub(crate) fn passthrough() -> Self {
        Conversion::new(|value, _| Ok(value.clone()))
    }

    pub fn convert(&self, value: &Value) -> Result<Value, PathError> {
        (self.0)(value, &mut Path::root())
    }

    /// Like [`Conversion::convert`] for a value found at `path` inside some
    /// larger value, so errors point at the right place.
    pub fn convert_at(&self, value: &Value, path: &mut Path) -> Result<Value, PathError> {
        (self.0)(value, path)
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Conversion")
    }
}

/// A conversion from `in_ty` to `out` that cannot fail for any known value,
/// or `None` when no such conversion exists.
pub fn get_conversion(in_ty: &Type, out: &Type) -> Option<Conversion> {
    resolve(in_ty, out, false)
}

/// Like [`get_conversion`], but also allows conversions that fail for some
/// values (string to number, list to set, map to object and so on).
pub fn get_conversion_unsafe(in_ty: &Type, out: &Type) -> Option<Conversion> {
    resolve(in_ty, out, true)
}

/// Converts `value` to `want` using the unsafe conversion rules.
pub fn convert(value: &Value, want: &Type) -> Result<Value, PathError> {
    if value.ty().equals(want) {
        return Ok(value.clone());
    }
    match get_conversion_unsafe(value.ty(), want) {
        Some(conversion) => conversion.convert(value),
        None => Err(Path::root().new_error(mismatch_message(value.ty(), want))),
    }
}

pub(crate) fn resolve(in_ty: &Type, out: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let inner = known_conversion(in_ty, out, allow_unsafe)?;
    tracing::trace!(from = %in_ty, to = %out, allow_unsafe, "resolved conversion");
    let out = out.clone();
    Some(Conversion::new(move |value, path| {
        let (value, marks) = value.clone().unmark();
        if out.is_dynamic() {
            return Ok(value.with_marks(marks));
        }
        if !value.is_known() {
            return Ok(unknown_result(&value, &out).with_marks(marks));
        }
        if value.is_null() {
            let ty = dynamic_replace(value.ty(), &out).without_optional_attributes_deep();
            return Ok(Value::null(ty).with_marks(marks));
        }
        let converted = inner.convert_at(&value, path)?;
        Ok(converted.with_marks(marks))
    }))
}

/// The conversion for known, non-null values.
fn known_conversion(in_ty: &Type, out: &Type, allow_unsafe: bool) -> Option<Conversion> {
    if out.is_dynamic() {
        return Some(Conversion::passthrough());
    }
    if in_ty.is_dynamic() {
        return allow_unsafe.then(|| dynamic::fixup(out));
    }
    if in_ty.equals(out) {
        return Some(Conversion::passthrough());
    }
    match (in_ty, out) {
        _ if in_ty.is_primitive_type() && out.is_primitive_type() => {
            primitive::conversion(in_ty, out, allow_unsafe)
        }
        (Type::Object(_), Type::Object(_)) => object::object_to_object(in_ty, out, allow_unsafe),
        (Type::Tuple(_), Type::Tuple(_)) => tuple::tuple_to_tuple(in_ty, out, allow_unsafe),
        (Type::List(_) | Type::Set(_), Type::List(ety)) => {
            collection::to_list(in_ty, ety, allow_unsafe)
        }
        (Type::List(_), Type::Set(_)) if !allow_unsafe => None,
        (Type::List(_) | Type::Set(_), Type::Set(ety)) => {
            collection::to_set(in_ty, ety, allow_unsafe)
        }
        (Type::Map(_), Type::Map(ety)) => collection::to_map(in_ty, ety, allow_unsafe),
        (Type::Tuple(_), Type::List(ety)) => tuple::tuple_to_list(in_ty, ety, allow_unsafe),
        (Type::Tuple(_), Type::Set(ety)) => tuple::tuple_to_set(in_ty, ety, allow_unsafe),
        (Type::Object(_), Type::Map(ety)) => object::object_to_map(in_ty, ety, allow_unsafe),
        (Type::Map(_), Type::Object(_)) if allow_unsafe => object::map_to_object(in_ty, out),
        (Type::Union(_), Type::Union(_)) => union::union_to_union(in_ty, out, allow_unsafe),
        (Type::Object(_), Type::Union(_)) if allow_unsafe => union::object_to_union(in_ty, out),
        (Type::Capsule(_), _) | (_, Type::Capsule(_)) if allow_unsafe => {
            capsule::conversion(in_ty, out)
        }
        _ => None,
    }
}

/// An unknown of the target type that keeps whatever the source's range
/// says about nullness and length.
fn unknown_result(value: &Value, out: &Type) -> Value {
    let target = dynamic_replace(value.ty(), out).without_optional_attributes_deep();
    let range = value.range();
    if range.type_constraint().is_dynamic() || target.is_dynamic() {
        return Value::unknown(target);
    }
    let length = if target.is_collection_type() {
        match range.type_constraint() {
            Type::List(_) | Type::Set(_) | Type::Map(_) => {
                Some((range.length_lower_bound(), range.length_upper_bound()))
            }
            Type::Tuple(elems) => Some((elems.len(), elems.len())),
            Type::Object(obj) => Some((obj.attrs.len(), obj.attrs.len())),
            _ => None,
        }
    } else {
        None
    };
    let not_null = range.definitely_not_null();
    let is_set = target.is_set_type();
    Value::unknown(target).refine_with(|mut builder| {
        if not_null {
            builder = builder.not_null();
        }
        if let Some((lower, upper)) = length {
            // Set elements may coalesce.
            let lower = if is_set { lower.min(1) } else { lower };
            builder = builder
                .collection_length_lower_bound(lower)
                .collection_length_upper_bound(upper);
        }
        builder
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cty::Mark;

    #[test]
    fn equal_types_convert_to_themselves() {
        let ty = Type::list(Type::String);
        let conv = get_conversion(&ty, &ty).expect("identity conversion");
        let value = Value::list(vec![Value::string("a")]);
        assert!(conv.convert(&value).expect("converts").raw_equals(&value));
    }

    #[test]
    fn dynamic_target_passes_values_through() {
        let conv = get_conversion(&Type::Number, &Type::DynamicPseudoType).expect("conversion");
        let out = conv.convert(&Value::number_int(4)).expect("converts");
        assert_eq!(out.ty(), &Type::Number);
    }

    #[test]
    fn marks_are_carried_over() {
        let conv = get_conversion(&Type::Number, &Type::String).expect("conversion");
        let secret = Mark::new("secret");
        let out = conv
            .convert(&Value::number_int(12).mark(secret.clone()))
            .expect("converts");
        assert!(out.has_mark(&secret));
        assert_eq!(out.unmark().0.as_string(), "12");
    }

    #[test]
    fn nulls_become_nulls_of_the_target_type() {
        let conv = get_conversion(&Type::Bool, &Type::String).expect("conversion");
        let out = conv.convert(&Value::null(Type::Bool)).expect("converts");
        assert!(out.is_null());
        assert_eq!(out.ty(), &Type::String);
    }

    #[test]
    fn unknowns_keep_not_null_and_length() {
        let conv =
            get_conversion(&Type::list(Type::Number), &Type::list(Type::String)).expect("conversion");
        let input = Value::unknown(Type::list(Type::Number)).refine_with(|b| {
            b.not_null()
                .collection_length_lower_bound(2)
                .collection_length_upper_bound(4)
        });
        let out = conv.convert(&input).expect("converts");
        assert!(!out.is_known());
        let range = out.range();
        assert_eq!(range.type_constraint(), &Type::list(Type::String));
        assert!(range.definitely_not_null());
        assert_eq!(range.length_lower_bound(), 2);
        assert_eq!(range.length_upper_bound(), 4);
    }

    #[test]
    fn unknown_list_to_set_relaxes_lower_bound() {
        let conv = get_conversion_unsafe(&Type::list(Type::String), &Type::set(Type::String))
            .expect("conversion");
        let input = Value::unknown(Type::list(Type::String))
            .refine_with(|b| b.not_null().collection_length(3));
        let range = conv.convert(&input).expect("converts").range();
        assert_eq!(range.length_lower_bound(), 1);
        assert_eq!(range.length_upper_bound(), 3);
    }

    #[test]
    fn convert_reports_mismatch() {
        let err = convert(&Value::bool(true), &Type::list(Type::Bool)).expect_err("no conversion");
        assert_eq!(err.message(), "list of bool required");
        assert!(err.path().is_empty());
    }

    #[test]
    fn dynamic_source_requires_unsafe() {
        assert!(get_conversion(&Type::DynamicPseudoType, &Type::String).is_none());
        let conv = get_conversion_unsafe(&Type::DynamicPseudoType, &Type::String)
            .expect("conversion");
        let out = conv.convert(&Value::number_int(5)).expect("converts");
        assert_eq!(out.as_string(), "5");
        let out = conv.convert(&Value::dynamic()).expect("converts");
        assert_eq!(out.ty(), &Type::String);
        assert!(!out.is_known());
    }
}
