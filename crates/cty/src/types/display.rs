use std::fmt;

use super::Type;

impl Type {
    /// A short English name for the type, suitable for error messages about
    /// values.
    pub fn friendly_name(&self) -> String {
        match self {
            Type::Number => "number".to_string(),
            Type::String => "string".to_string(),
            Type::Bool => "bool".to_string(),
            Type::List(ety) => format!("list of {}", ety.friendly_name()),
            Type::Set(ety) => format!("set of {}", ety.friendly_name()),
            Type::Map(ety) => format!("map of {}", ety.friendly_name()),
            Type::Object(_) => "object".to_string(),
            Type::Tuple(_) => "tuple".to_string(),
            Type::Union(_) => "union".to_string(),
            Type::Capsule(cap) => cap.name().to_string(),
            Type::DynamicPseudoType => "dynamic".to_string(),
        }
    }

    /// Like [`Type::friendly_name`], but phrased for the type as a
    /// constraint that values must satisfy.
    pub fn friendly_name_for_constraint(&self) -> String {
        match self {
            Type::DynamicPseudoType => "any type".to_string(),
            Type::List(ety) => format!("list of {}", element_constraint_name(ety)),
            Type::Set(ety) => format!("set of {}", element_constraint_name(ety)),
            Type::Map(ety) => format!("map of {}", element_constraint_name(ety)),
            other => other.friendly_name(),
        }
    }
}

fn element_constraint_name(ety: &Type) -> String {
    if ety.is_dynamic() {
        "any single type".to_string()
    } else {
        ety.friendly_name_for_constraint()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.friendly_name())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Number => f.write_str("Number"),
            Type::String => f.write_str("String"),
            Type::Bool => f.write_str("Bool"),
            Type::List(ety) => f.debug_tuple("List").field(ety).finish(),
            Type::Set(ety) => f.debug_tuple("Set").field(ety).finish(),
            Type::Map(ety) => f.debug_tuple("Map").field(ety).finish(),
            Type::Object(obj) => {
                let mut tuple = f.debug_tuple("Object");
                tuple.field(&obj.attrs);
                if !obj.optional.is_empty() {
                    tuple.field(&obj.optional);
                }
                tuple.finish()
            }
            Type::Tuple(elems) => f.debug_tuple("Tuple").field(elems).finish(),
            Type::Union(union) => f.debug_tuple("Union").field(&union.variants).finish(),
            Type::Capsule(cap) => f.debug_tuple("Capsule").field(&cap.name()).finish(),
            Type::DynamicPseudoType => f.write_str("DynamicPseudoType"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_names() {
        assert_eq!(Type::list(Type::String).friendly_name(), "list of string");
        assert_eq!(
            Type::map(Type::set(Type::Number)).friendly_name(),
            "map of set of number"
        );
        assert_eq!(Type::empty_object().friendly_name(), "object");
        assert_eq!(Type::capsule::<u8>("byte").friendly_name(), "byte");
        assert_eq!(Type::DynamicPseudoType.to_string(), "dynamic");
    }

    #[test]
    fn constraint_names_describe_dynamic_parts() {
        assert_eq!(
            Type::DynamicPseudoType.friendly_name_for_constraint(),
            "any type"
        );
        assert_eq!(
            Type::list(Type::DynamicPseudoType).friendly_name_for_constraint(),
            "list of any single type"
        );
        assert_eq!(
            Type::map(Type::list(Type::DynamicPseudoType)).friendly_name_for_constraint(),
            "map of list of any single type"
        );
        assert_eq!(Type::Bool.friendly_name_for_constraint(), "bool");
    }

    #[test]
    fn debug_shows_structure() {
        let ty = Type::object_with_optional_attrs(
            [("a", Type::list(Type::String)), ("b", Type::Bool)],
            ["b"],
        );
        assert_eq!(
            format!("{ty:?}"),
            r#"Object({"a": List(String), "b": Bool}, {"b"})"#
        );
        assert_eq!(
            format!("{:?}", Type::tuple(vec![Type::Number, Type::DynamicPseudoType])),
            "Tuple([Number, DynamicPseudoType])"
        );
    }
}
