use std::collections::BTreeMap;

use cty::Type;

use crate::{get_conversion, get_conversion_unsafe};

/// Explains in English why a value of type `got` cannot stand in for `want`.
///
/// Only the single most relevant problem is reported: missing attributes
/// come before attributes that cannot convert at all, which come before
/// attributes that would need an unsafe conversion. The wording is for
/// humans and may change; callers must not match on it.
pub fn mismatch_message(got: &Type, want: &Type) -> String {
    match (got, want) {
        (Type::Object(_), Type::Object(_)) => object_mismatch(got, want),
        (Type::Tuple(_), Type::List(ety) | Type::Set(ety)) | (Type::Object(_), Type::Map(ety))
            if ety.is_dynamic() =>
        {
            format!(
                "all {} elements must have the same type, but the {} has differing element types",
                collection_noun(want),
                got.friendly_name()
            )
        }
        (Type::Tuple(_) | Type::Object(_), _) if want.is_collection_type() => {
            structural_to_collection(got, want)
        }
        _ if got.is_collection_type() && want.is_collection_type() => {
            collection_mismatch(got, want)
        }
        (Type::Union(_), Type::Union(_)) => union_mismatch(got, want),
        (Type::Object(_), Type::Union(_)) => object_to_union_mismatch(got, want),
        _ => required(want),
    }
}

fn required(want: &Type) -> String {
    format!("{} required", want.friendly_name_for_constraint())
}

fn collection_noun(ty: &Type) -> &'static str {
    match ty {
        Type::List(_) => "list",
        Type::Set(_) => "set",
        _ => "map",
    }
}

/// Worst problem among named parts, ranked: no conversion at all, then
/// unsafe-only conversion.
#[derive(Default)]
struct Worst<'a> {
    impossible: Option<(&'a str, &'a Type, &'a Type)>,
    unsafe_only: Option<(&'a str, &'a Type, &'a Type)>,
}

impl<'a> Worst<'a> {
    fn check(&mut self, name: &'a str, got: &'a Type, want: &'a Type) {
        if got.equals(want) {
            return;
        }
        if get_conversion_unsafe(got, want).is_none() {
            self.impossible.get_or_insert((name, got, want));
        } else if get_conversion(got, want).is_none() {
            self.unsafe_only.get_or_insert((name, got, want));
        }
    }

    fn found(self) -> Option<(&'a str, &'a Type, &'a Type)> {
        self.impossible.or(self.unsafe_only)
    }
}

fn object_mismatch(got: &Type, want: &Type) -> String {
    let got_attrs = got.attribute_types();
    let mut missing = Vec::new();
    let mut worst = Worst::default();
    for (name, want_aty) in want.attribute_types() {
        match got_attrs.get(name) {
            Some(got_aty) => worst.check(name, got_aty, want_aty),
            None if !want.attribute_optional(name) => missing.push(name.as_str()),
            None => {}
        }
    }
    match missing.as_slice() {
        [] => {}
        [name] => return format!("attribute {name:?} is required"),
        [a, b] => return format!("attributes {a:?} and {b:?} are required"),
        [init @ .., last] => {
            let listed: Vec<String> = init.iter().map(|name| format!("{name:?}")).collect();
            return format!("attributes {}, and {last:?} are required", listed.join(", "));
        }
    }
    match worst.found() {
        Some((name, got_aty, want_aty)) => {
            format!("attribute {name:?}: {}", mismatch_message(got_aty, want_aty))
        }
        None => required(want),
    }
}

fn structural_to_collection(got: &Type, want: &Type) -> String {
    let want_ety = want.element_type();
    let mut worst = Worst::default();
    match got {
        Type::Object(obj) if want.is_map_type() => {
            for (name, aty) in &obj.attrs {
                worst.check(name, aty, want_ety);
            }
            if let Some((name, aty, ety)) = worst.found() {
                return format!("element {name:?}: {}", mismatch_message(aty, ety));
            }
        }
        Type::Tuple(elems) if !want.is_map_type() => {
            let indices: Vec<String> = (0..elems.len()).map(|i| i.to_string()).collect();
            for (i, ety) in elems.iter().enumerate() {
                worst.check(&indices[i], ety, want_ety);
            }
            if let Some((index, ety, want_ety)) = worst.found() {
                return format!("element {index}: {}", mismatch_message(ety, want_ety));
            }
        }
        _ => {}
    }
    required(want)
}

fn collection_mismatch(got: &Type, want: &Type) -> String {
    let compatible = match (got, want) {
        (Type::Map(_), Type::Map(_)) => true,
        (Type::List(_) | Type::Set(_), Type::List(_) | Type::Set(_)) => true,
        _ => false,
    };
    let (got_ety, want_ety) = (got.element_type(), want.element_type());
    if !compatible || got_ety.equals(want_ety) {
        return required(want);
    }
    format!(
        "incorrect {} element type: {}",
        collection_noun(want),
        mismatch_message(got_ety, want_ety)
    )
}

fn union_mismatch(got: &Type, want: &Type) -> String {
    let want_variants = want.union_variants();
    let mut worst = Worst::default();
    for (name, vty) in got.union_variants() {
        match want_variants.get(name) {
            Some(want_vty) => worst.check(name, vty, want_vty),
            None => return format!("union variant {name:?} is not accepted"),
        }
    }
    match worst.found() {
        Some((name, vty, want_vty)) => {
            format!("variant {name:?}: {}", mismatch_message(vty, want_vty))
        }
        None => required(want),
    }
}

fn object_to_union_mismatch(got: &Type, want: &Type) -> String {
    let variants: &BTreeMap<String, Type> = want.union_variants();
    let mut worst = Worst::default();
    for (name, aty) in got.attribute_types() {
        match variants.get(name) {
            Some(vty) => worst.check(name, aty, vty),
            None => return format!("attribute {name:?} does not name a union variant"),
        }
    }
    match worst.found() {
        Some((name, aty, vty)) => format!("attribute {name:?}: {}", mismatch_message(aty, vty)),
        None => required(want),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attributes_win() {
        let got = Type::object([("port", Type::Bool)]);
        let want = Type::object([
            ("host", Type::String),
            ("port", Type::Number),
            ("user", Type::String),
        ]);
        assert_eq!(
            mismatch_message(&got, &want),
            r#"attributes "host" and "user" are required"#
        );
        let want = Type::object([("a", Type::Bool), ("b", Type::Bool), ("c", Type::Bool)]);
        assert_eq!(
            mismatch_message(&Type::empty_object(), &want),
            r#"attributes "a", "b", and "c" are required"#
        );
    }

    #[test]
    fn impossible_attribute_beats_unsafe_one() {
        let got = Type::object([("a", Type::String), ("b", Type::Bool)]);
        let want = Type::object([("a", Type::Number), ("b", Type::Number)]);
        assert_eq!(mismatch_message(&got, &want), r#"attribute "b": number required"#);
    }

    #[test]
    fn optional_attributes_are_not_required() {
        let got = Type::object([("a", Type::Bool)]);
        let want = Type::object_with_optional_attrs(
            [("a", Type::list(Type::Bool)), ("b", Type::String)],
            ["b"],
        );
        assert_eq!(
            mismatch_message(&got, &want),
            r#"attribute "a": list of bool required"#
        );
    }

    #[test]
    fn tuple_to_dynamic_list_reports_differing_element_types() {
        let got = Type::tuple(vec![Type::String, Type::list(Type::String)]);
        let message = mismatch_message(&got, &Type::list(Type::DynamicPseudoType));
        assert!(message.contains("differing element types"), "{message}");
    }

    #[test]
    fn collection_element_problems() {
        assert_eq!(
            mismatch_message(&Type::list(Type::Bool), &Type::list(Type::Number)),
            "incorrect list element type: number required"
        );
        assert_eq!(
            mismatch_message(&Type::map(Type::Bool), &Type::list(Type::Bool)),
            "list of bool required"
        );
        assert_eq!(
            mismatch_message(
                &Type::tuple(vec![Type::Number, Type::list(Type::Number)]),
                &Type::list(Type::Number)
            ),
            "element 1: number required"
        );
    }

    #[test]
    fn union_problems() {
        let want = Type::union([("a", Type::Number)]);
        let got = Type::union([("a", Type::Number), ("b", Type::Bool)]);
        assert_eq!(
            mismatch_message(&got, &want),
            r#"union variant "b" is not accepted"#
        );
        let got = Type::object([("z", Type::Number)]);
        assert_eq!(
            mismatch_message(&got, &want),
            r#"attribute "z" does not name a union variant"#
        );
    }
}
