//! Compact JSON form of type constraints: `"string"`, `["list", "number"]`,
//! `["object", {"a": "bool"}, ["a"]]` and so on.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::{self, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Type;

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Type::Number => serializer.serialize_str("number"),
            Type::String => serializer.serialize_str("string"),
            Type::Bool => serializer.serialize_str("bool"),
            Type::DynamicPseudoType => serializer.serialize_str("dynamic"),
            Type::List(ety) => serialize_pair(serializer, "list", &**ety),
            Type::Set(ety) => serialize_pair(serializer, "set", &**ety),
            Type::Map(ety) => serialize_pair(serializer, "map", &**ety),
            Type::Object(obj) => {
                let len = if obj.optional.is_empty() { 2 } else { 3 };
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element("object")?;
                seq.serialize_element(&obj.attrs)?;
                if !obj.optional.is_empty() {
                    seq.serialize_element(&obj.optional)?;
                }
                seq.end()
            }
            Type::Tuple(elems) => serialize_pair(serializer, "tuple", &**elems),
            Type::Union(union) => serialize_pair(serializer, "union", &union.variants),
            Type::Capsule(cap) => Err(ser::Error::custom(format!(
                "capsule type {:?} cannot be serialized",
                cap.name()
            ))),
        }
    }
}

fn serialize_pair<S, T>(serializer: S, kind: &str, inner: &T) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize + ?Sized,
{
    let mut seq = serializer.serialize_seq(Some(2))?;
    seq.serialize_element(kind)?;
    seq.serialize_element(inner)?;
    seq.end()
}

struct TypeVisitor;

impl<'de> Visitor<'de> for TypeVisitor {
    type Value = Type;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a type name string or a [kind, ...] array")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Type, E> {
        match v {
            "number" => Ok(Type::Number),
            "string" => Ok(Type::String),
            "bool" => Ok(Type::Bool),
            "dynamic" => Ok(Type::DynamicPseudoType),
            other => Err(E::custom(format!("invalid primitive type name {other:?}"))),
        }
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Type, A::Error> {
        let kind: String = required(&mut seq, 0, &self)?;
        let ty = match kind.as_str() {
            "list" => Type::list(required(&mut seq, 1, &self)?),
            "set" => Type::set(required(&mut seq, 1, &self)?),
            "map" => Type::map(required(&mut seq, 1, &self)?),
            "object" => {
                let attrs: BTreeMap<String, Type> = required(&mut seq, 1, &self)?;
                let optional: Vec<String> = seq.next_element()?.unwrap_or_default();
                if let Some(name) = optional.iter().find(|name| !attrs.contains_key(*name)) {
                    return Err(de::Error::custom(format!(
                        "optional attribute {name:?} is not an attribute of the object type"
                    )));
                }
                Type::object_with_optional_attrs(attrs, optional)
            }
            "tuple" => Type::tuple(required(&mut seq, 1, &self)?),
            "union" => {
                let variants: BTreeMap<String, Type> = required(&mut seq, 1, &self)?;
                if variants.is_empty() {
                    return Err(de::Error::custom("a union type must have at least one variant"));
                }
                Type::union(variants)
            }
            other => {
                return Err(de::Error::custom(format!("invalid type kind {other:?}")));
            }
        };
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::custom(format!(
                "unexpected extra elements in {kind} type specification"
            )));
        }
        Ok(ty)
    }
}

fn required<'de, A, T>(seq: &mut A, index: usize, visitor: &TypeVisitor) -> Result<T, A::Error>
where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::invalid_length(index, visitor))
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TypeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::Type;

    fn round_trip(ty: &Type) -> Type {
        let text = serde_json::to_string(ty).expect("serializable");
        serde_json::from_str(&text).expect("parsable")
    }

    #[test]
    fn serializes_compact_form() {
        let ty = Type::object_with_optional_attrs(
            [("tags", Type::set(Type::String)), ("port", Type::Number)],
            ["port"],
        );
        assert_eq!(
            serde_json::to_value(&ty).expect("serializable"),
            json!(["object", {"port": "number", "tags": ["set", "string"]}, ["port"]])
        );
        assert_eq!(
            serde_json::to_value(Type::tuple(vec![Type::Bool, Type::DynamicPseudoType]))
                .expect("serializable"),
            json!(["tuple", ["bool", "dynamic"]])
        );
    }

    #[test]
    fn round_trips_nested_types() {
        let types = [
            Type::map(Type::list(Type::Number)),
            Type::union([("a", Type::String), ("b", Type::empty_object())]),
            Type::object_with_optional_attrs([("x", Type::Bool)], ["x"]),
            Type::empty_tuple(),
        ];
        for ty in types {
            assert_eq!(round_trip(&ty), ty);
        }
    }

    #[test]
    fn rejects_bad_specifications() {
        for bad in [
            r#""integer""#,
            r#"["list"]"#,
            r#"["list", "string", "extra"]"#,
            r#"["union", {}]"#,
            r#"["object", {"a": "bool"}, ["b"]]"#,
            r#"["frob", "string"]"#,
            "42",
        ] {
            assert!(
                serde_json::from_str::<Type>(bad).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn capsules_are_not_serializable() {
        let ty = Type::list(Type::capsule::<()>("unit"));
        let err = serde_json::to_string(&ty).expect_err("capsule");
        assert!(err.to_string().contains("capsule type \"unit\""));
    }
}
