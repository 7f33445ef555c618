use std::collections::BTreeMap;

use cty::{PathStep, Type, Value};

use crate::Conversion;
use crate::collection::homogenize;
use crate::conversion::resolve;
use crate::unify::unify_types;

/// Objects to objects. Every required target attribute must exist in the
/// source; extra source attributes are dropped and absent optional ones
/// become null.
pub(crate) fn object_to_object(in_ty: &Type, out: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let in_attrs = in_ty.attribute_types();
    let mut attrs = BTreeMap::new();
    let mut absent = Vec::new();
    for (name, out_aty) in out.attribute_types() {
        match in_attrs.get(name) {
            Some(in_aty) => {
                attrs.insert(name.clone(), resolve(in_aty, out_aty, allow_unsafe)?);
            }
            None if out.attribute_optional(name) => {
                absent.push((name.clone(), out_aty.without_optional_attributes_deep()));
            }
            None => return None,
        }
    }
    Some(Conversion::new(move |value, path| {
        let mut out = BTreeMap::new();
        for (name, attr) in value.element_iter() {
            let name = name.as_string().to_string();
            let Some(conversion) = attrs.get(&name) else {
                continue;
            };
            path.push(PathStep::GetAttr(name.clone()));
            let converted = conversion.convert_at(&attr, path);
            path.pop();
            out.insert(name, converted?);
        }
        for (name, aty) in &absent {
            out.insert(name.clone(), Value::null(aty.clone()));
        }
        Ok(Value::object(out))
    }))
}

/// Objects to maps, unifying attribute types when the element type is
/// dynamic.
pub(crate) fn object_to_map(in_ty: &Type, out_ety: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let in_attrs = in_ty.attribute_types();
    if in_attrs.is_empty() {
        let ety = out_ety.without_optional_attributes_deep();
        return Some(Conversion::new(move |_, _| Ok(Value::map_empty(ety.clone()))));
    }
    let mut ety = out_ety.clone();
    if ety.is_dynamic() {
        let atys: Vec<Type> = in_attrs.values().cloned().collect();
        ety = unify_types(&atys, allow_unsafe)?.0;
    }
    let attrs = in_attrs
        .iter()
        .map(|(name, aty)| Some((name.clone(), resolve(aty, &ety, allow_unsafe)?)))
        .collect::<Option<BTreeMap<_, _>>>()?;
    Some(Conversion::new(move |value, path| {
        let mut keys = Vec::with_capacity(attrs.len());
        let mut elements = Vec::with_capacity(attrs.len());
        for (name, attr) in value.element_iter() {
            let key = name.as_string().to_string();
            let Some(conversion) = attrs.get(&key) else {
                continue;
            };
            path.push(PathStep::Index(name));
            let converted = conversion.convert_at(&attr, path);
            path.pop();
            keys.push(key);
            elements.push(converted?);
        }
        let elements = homogenize(elements, allow_unsafe, path, "map")?;
        Ok(Value::map(keys.into_iter().zip(elements)))
    }))
}

/// Maps to objects, which fails for maps lacking a required attribute's key.
/// Keys with no matching attribute are ignored.
pub(crate) fn map_to_object(in_ty: &Type, out: &Type) -> Option<Conversion> {
    let out_attrs = out.attribute_types();
    let ety = in_ty.element_type();
    let attrs = out_attrs
        .iter()
        .map(|(name, aty)| Some((name.clone(), resolve(ety, aty, true)?)))
        .collect::<Option<BTreeMap<_, _>>>()?;
    let out = out.clone();
    Some(Conversion::new(move |value, path| {
        let mut converted = BTreeMap::new();
        for (key, elem) in value.element_iter() {
            let name = key.as_string().to_string();
            let Some(conversion) = attrs.get(&name) else {
                continue;
            };
            path.push(PathStep::Index(key));
            let result = conversion.convert_at(&elem, path);
            path.pop();
            converted.insert(name, result?);
        }
        for (name, aty) in out.attribute_types() {
            if converted.contains_key(name) {
                continue;
            }
            if !out.attribute_optional(name) {
                return Err(path.new_errorf(format_args!(
                    "map has no element for required attribute {name:?}"
                )));
            }
            converted.insert(name.clone(), Value::null(aty.without_optional_attributes_deep()));
        }
        Ok(Value::object(converted))
    }))
}

#[cfg(test)]
mod tests {
    use crate::{get_conversion, get_conversion_unsafe};
    use cty::{Type, Value};

    #[test]
    fn extra_attributes_are_dropped() {
        let from = Type::object([("name", Type::String), ("port", Type::Number)]);
        let to = Type::object([("port", Type::String)]);
        let conv = get_conversion(&from, &to).expect("conversion");
        let value = Value::object([
            ("name", Value::string("web")),
            ("port", Value::number_int(80)),
        ]);
        let out = conv.convert(&value).expect("converts");
        assert_eq!(out.ty(), &to);
        assert_eq!(out.get_attr("port").as_string(), "80");
    }

    #[test]
    fn missing_optional_attributes_become_null() {
        let from = Type::object([("name", Type::String)]);
        let to = Type::object_with_optional_attrs(
            [("name", Type::String), ("tags", Type::list(Type::String))],
            ["tags"],
        );
        let conv = get_conversion(&from, &to).expect("conversion");
        let out = conv
            .convert(&Value::object([("name", Value::string("web"))]))
            .expect("converts");
        assert!(out.get_attr("tags").is_null());
        assert_eq!(out.ty(), &to.without_optional_attributes_deep());
    }

    #[test]
    fn missing_required_attribute_has_no_conversion() {
        let from = Type::object([("name", Type::String)]);
        let to = Type::object([("name", Type::String), ("port", Type::Number)]);
        assert!(get_conversion_unsafe(&from, &to).is_none());
    }

    #[test]
    fn attribute_errors_name_the_attribute() {
        let from = Type::object([("port", Type::String)]);
        let to = Type::object([("port", Type::Number)]);
        let conv = get_conversion_unsafe(&from, &to).expect("conversion");
        let err = conv
            .convert(&Value::object([("port", Value::string("http"))]))
            .expect_err("bad attribute");
        assert_eq!(err.path().to_string(), ".port");
    }

    #[test]
    fn objects_become_maps_of_unified_type() {
        let from = Type::object([("a", Type::Number), ("b", Type::String)]);
        let conv = get_conversion(&from, &Type::map(Type::DynamicPseudoType)).expect("conversion");
        let out = conv
            .convert(&Value::object([
                ("a", Value::number_int(1)),
                ("b", Value::string("two")),
            ]))
            .expect("converts");
        assert_eq!(out.ty(), &Type::map(Type::String));
        assert_eq!(out.index(&Value::string("a")).as_string(), "1");
    }

    #[test]
    fn maps_become_objects_only_unsafely() {
        let from = Type::map(Type::String);
        let to = Type::object_with_optional_attrs(
            [("host", Type::String), ("port", Type::Number)],
            ["port"],
        );
        assert!(get_conversion(&from, &to).is_none());
        let conv = get_conversion_unsafe(&from, &to).expect("conversion");
        let out = conv
            .convert(&Value::map([("host", Value::string("db")), ("other", Value::string("x"))]))
            .expect("converts");
        assert_eq!(out.get_attr("host").as_string(), "db");
        assert!(out.get_attr("port").is_null());

        let err = conv
            .convert(&Value::map([("port", Value::string("5432"))]))
            .expect_err("host is required");
        assert_eq!(err.message(), r#"map has no element for required attribute "host""#);
    }
}
