use cty::{Path, PathError, PathStep, Type, Value};

use crate::Conversion;
use crate::conversion::resolve;
use crate::unify::unify_types;

/// Brings converted elements to a single type. Elements converted to a
/// dynamic element type may still disagree, in which case their runtime
/// types are unified.
pub(crate) fn homogenize(
    elements: Vec<Value>,
    allow_unsafe: bool,
    path: &mut Path,
    noun: &str,
) -> Result<Vec<Value>, PathError> {
    if Value::can_list_val(&elements) {
        return Ok(elements);
    }
    let mismatch = |path: &Path| {
        path.new_error(format!("element types must all match for conversion to {noun}"))
    };
    let types: Vec<Type> = elements.iter().map(|elem| elem.ty().clone()).collect();
    let Some((_, conversions)) = unify_types(&types, allow_unsafe) else {
        return Err(mismatch(path));
    };
    let converted = elements
        .into_iter()
        .zip(conversions)
        .map(|(elem, conversion)| match conversion {
            Some(conversion) => conversion.convert_at(&elem, path),
            None => Ok(elem),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if !Value::can_list_val(&converted) {
        return Err(mismatch(path));
    }
    Ok(converted)
}

/// Element type for an empty result. A dynamic target adopts the source's
/// element type.
fn empty_element_type(out_ety: &Type, source_ety: &Type) -> Type {
    if out_ety.is_dynamic() {
        source_ety.clone()
    } else {
        out_ety.without_optional_attributes_deep()
    }
}

/// Lists and sets to a list. Set elements are taken in set order.
pub(crate) fn to_list(in_ty: &Type, out_ety: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let element = resolve(in_ty.element_type(), out_ety, allow_unsafe)?;
    let out_ety = out_ety.clone();
    Some(Conversion::new(move |value, path| {
        let mut elements = Vec::with_capacity(value.length_int());
        for (index, elem) in value.element_iter() {
            path.push(PathStep::Index(index));
            let converted = element.convert_at(&elem, path);
            path.pop();
            elements.push(converted?);
        }
        if elements.is_empty() {
            let ety = empty_element_type(&out_ety, value.ty().element_type());
            return Ok(Value::list_empty(ety));
        }
        Ok(Value::list(homogenize(elements, allow_unsafe, path, "list")?))
    }))
}

/// Lists and sets to a set. Converting from a list may merge duplicates and
/// loses ordering, so callers only reach here for lists in unsafe mode.
pub(crate) fn to_set(in_ty: &Type, out_ety: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let element = resolve(in_ty.element_type(), out_ety, allow_unsafe)?;
    let out_ety = out_ety.clone();
    Some(Conversion::new(move |value, path| {
        let mut elements = Vec::with_capacity(value.length_int());
        for (_, elem) in value.element_iter() {
            path.push(PathStep::Index(Value::unknown(out_ety.clone())));
            let converted = element.convert_at(&elem, path);
            path.pop();
            elements.push(converted?);
        }
        if elements.is_empty() {
            let ety = empty_element_type(&out_ety, value.ty().element_type());
            return Ok(Value::set_empty(ety));
        }
        Ok(Value::set(homogenize(elements, allow_unsafe, path, "set")?))
    }))
}

pub(crate) fn to_map(in_ty: &Type, out_ety: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let element = resolve(in_ty.element_type(), out_ety, allow_unsafe)?;
    let out_ety = out_ety.clone();
    Some(Conversion::new(move |value, path| {
        let mut keys = Vec::with_capacity(value.length_int());
        let mut elements = Vec::with_capacity(value.length_int());
        for (key, elem) in value.element_iter() {
            keys.push(key.as_string().to_string());
            path.push(PathStep::Index(key));
            let converted = element.convert_at(&elem, path);
            path.pop();
            elements.push(converted?);
        }
        if elements.is_empty() {
            let ety = empty_element_type(&out_ety, value.ty().element_type());
            return Ok(Value::map_empty(ety));
        }
        let elements = homogenize(elements, allow_unsafe, path, "map")?;
        Ok(Value::map(keys.into_iter().zip(elements)))
    }))
}

#[cfg(test)]
mod tests {
    use crate::{get_conversion, get_conversion_unsafe};
    use cty::{Mark, Type, Value};

    #[test]
    fn set_to_list_follows_set_order() {
        let conv = get_conversion(&Type::set(Type::Number), &Type::list(Type::String))
            .expect("conversion");
        let set = Value::set(vec![Value::number_int(3), Value::number_int(1)]);
        let out = conv.convert(&set).expect("converts");
        let listed: Vec<String> = out
            .as_value_vec()
            .iter()
            .map(|v| v.as_string().to_string())
            .collect();
        assert_eq!(listed, ["1", "3"]);
    }

    #[test]
    fn list_to_set_is_unsafe_and_merges_duplicates() {
        let from = Type::list(Type::String);
        let to = Type::set(Type::String);
        assert!(get_conversion(&from, &to).is_none());
        let conv = get_conversion_unsafe(&from, &to).expect("conversion");
        let list = Value::list(vec![Value::string("b"), Value::string("a"), Value::string("b")]);
        let out = conv.convert(&list).expect("converts");
        assert_eq!(out.length_int(), 2);
    }

    #[test]
    fn element_errors_point_at_the_element() {
        let conv = get_conversion_unsafe(&Type::list(Type::String), &Type::list(Type::Number))
            .expect("conversion");
        let list = Value::list(vec![Value::string("1"), Value::string("x")]);
        let err = conv.convert(&list).expect_err("bad element");
        assert_eq!(err.path().to_string(), "[1]");
        assert_eq!(err.message(), "a number is required");
    }

    #[test]
    fn map_keys_appear_in_error_paths() {
        let conv = get_conversion_unsafe(&Type::map(Type::String), &Type::map(Type::Bool))
            .expect("conversion");
        let map = Value::map([("on", Value::string("true")), ("off", Value::string("nope"))]);
        let err = conv.convert(&map).expect_err("bad element");
        assert_eq!(err.path().to_string(), r#"["off"]"#);
    }

    #[test]
    fn empty_collections_keep_a_concrete_type() {
        let conv = get_conversion(&Type::list(Type::Number), &Type::list(Type::DynamicPseudoType))
            .expect("conversion");
        let out = conv
            .convert(&Value::list_empty(Type::Number))
            .expect("converts");
        assert_eq!(out.ty(), &Type::list(Type::Number));
    }

    #[test]
    fn element_marks_survive() {
        let mark = Mark::new("m");
        let conv = get_conversion(&Type::list(Type::Number), &Type::list(Type::String))
            .expect("conversion");
        let list = Value::list(vec![Value::number_int(1).mark(mark.clone())]);
        let out = conv.convert(&list).expect("converts");
        assert!(out.as_value_vec()[0].has_mark(&mark));
    }
}
