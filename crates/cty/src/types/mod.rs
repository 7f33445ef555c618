//! The closed set of type constraints.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

mod capsule;
mod display;
mod json;

pub use capsule::{CapsuleFromFn, CapsuleOps, CapsuleToFn, CapsuleType};

/// A type, or a type constraint when it contains [`Type::DynamicPseudoType`].
///
/// Types are immutable and cheap to clone. Equality is structural except for
/// capsule types, which are equal only to themselves.
#[derive(Clone)]
pub enum Type {
    Number,
    String,
    Bool,
    List(Arc<Type>),
    Set(Arc<Type>),
    Map(Arc<Type>),
    Object(Arc<ObjectType>),
    Tuple(Arc<[Type]>),
    Union(Arc<UnionType>),
    Capsule(Arc<CapsuleType>),
    DynamicPseudoType,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ObjectType {
    pub attrs: BTreeMap<String, Type>,
    pub optional: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnionType {
    pub variants: BTreeMap<String, Type>,
}

impl Type {
    pub fn list(element: Type) -> Type {
        Type::List(Arc::new(element))
    }

    pub fn set(element: Type) -> Type {
        Type::Set(Arc::new(element))
    }

    pub fn map(element: Type) -> Type {
        Type::Map(Arc::new(element))
    }

    pub fn object<K, I>(attrs: I) -> Type
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Type)>,
    {
        Type::object_with_optional_attrs(attrs, std::iter::empty::<String>())
    }

    /// Builds an object type whose listed attributes may be omitted on
    /// conversion. Panics if an optional name is not one of the attributes.
    pub fn object_with_optional_attrs<K, I, O, N>(attrs: I, optional: O) -> Type
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Type)>,
        N: Into<String>,
        O: IntoIterator<Item = N>,
    {
        let attrs: BTreeMap<String, Type> = attrs
            .into_iter()
            .map(|(name, ty)| (crate::value::normalize_string(&name.into()), ty))
            .collect();
        let optional: BTreeSet<String> = optional
            .into_iter()
            .map(|name| crate::value::normalize_string(&name.into()))
            .collect();
        if let Some(missing) = optional.iter().find(|name| !attrs.contains_key(*name)) {
            panic!("optional attribute {missing:?} is not an attribute of the object type");
        }
        Type::Object(Arc::new(ObjectType { attrs, optional }))
    }

    pub fn empty_object() -> Type {
        Type::Object(Arc::new(ObjectType::default()))
    }

    pub fn tuple(elements: Vec<Type>) -> Type {
        Type::Tuple(Arc::from(elements))
    }

    pub fn empty_tuple() -> Type {
        Type::tuple(Vec::new())
    }

    /// Builds a union type. Panics when there are no variants.
    pub fn union<K, I>(variants: I) -> Type
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Type)>,
    {
        let variants: BTreeMap<String, Type> = variants
            .into_iter()
            .map(|(name, ty)| (crate::value::normalize_string(&name.into()), ty))
            .collect();
        if variants.is_empty() {
            panic!("a union type must have at least one variant");
        }
        Type::Union(Arc::new(UnionType { variants }))
    }

    /// A new capsule type for native values of type `T`, distinct from every
    /// other capsule type, with default operations.
    pub fn capsule<T: std::any::Any + Send + Sync>(name: impl Into<String>) -> Type {
        Type::capsule_with_ops::<T>(name, CapsuleOps::new())
    }

    pub fn capsule_with_ops<T: std::any::Any + Send + Sync>(
        name: impl Into<String>,
        ops: CapsuleOps,
    ) -> Type {
        Type::Capsule(Arc::new(CapsuleType::new::<T>(name.into(), ops)))
    }

    /// Structural equality; capsule types compare by identity.
    pub fn equals(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Number, Type::Number)
            | (Type::String, Type::String)
            | (Type::Bool, Type::Bool)
            | (Type::DynamicPseudoType, Type::DynamicPseudoType) => true,
            (Type::List(a), Type::List(b))
            | (Type::Set(a), Type::Set(b))
            | (Type::Map(a), Type::Map(b)) => Arc::ptr_eq(a, b) || a.equals(b),
            (Type::Object(a), Type::Object(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.optional == b.optional
                        && a.attrs.len() == b.attrs.len()
                        && a.attrs.iter().all(|(name, ty)| {
                            b.attrs.get(name).is_some_and(|other| ty.equals(other))
                        }))
            }
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Type::Union(a), Type::Union(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.variants.len() == b.variants.len()
                        && a.variants.iter().all(|(name, ty)| {
                            b.variants.get(name).is_some_and(|other| ty.equals(other))
                        }))
            }
            (Type::Capsule(a), Type::Capsule(b)) => a.id() == b.id(),
            _ => false,
        }
    }

    pub fn is_primitive_type(&self) -> bool {
        matches!(self, Type::Number | Type::String | Type::Bool)
    }

    pub fn is_list_type(&self) -> bool {
        matches!(self, Type::List(_))
    }

    pub fn is_set_type(&self) -> bool {
        matches!(self, Type::Set(_))
    }

    pub fn is_map_type(&self) -> bool {
        matches!(self, Type::Map(_))
    }

    pub fn is_collection_type(&self) -> bool {
        matches!(self, Type::List(_) | Type::Set(_) | Type::Map(_))
    }

    pub fn is_object_type(&self) -> bool {
        matches!(self, Type::Object(_))
    }

    pub fn is_tuple_type(&self) -> bool {
        matches!(self, Type::Tuple(_))
    }

    pub fn is_union_type(&self) -> bool {
        matches!(self, Type::Union(_))
    }

    pub fn is_capsule_type(&self) -> bool {
        matches!(self, Type::Capsule(_))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::DynamicPseudoType)
    }

    /// The element type of a list, set or map. Panics for other types.
    pub fn element_type(&self) -> &Type {
        match self {
            Type::List(ety) | Type::Set(ety) | Type::Map(ety) => ety,
            other => panic!("element_type called on {}", other.friendly_name()),
        }
    }

    pub fn collection_element_type(&self) -> Option<&Type> {
        match self {
            Type::List(ety) | Type::Set(ety) | Type::Map(ety) => Some(ety),
            _ => None,
        }
    }

    /// Attribute types of an object type. Panics for other types.
    pub fn attribute_types(&self) -> &BTreeMap<String, Type> {
        &self.object_type().attrs
    }

    pub fn attribute_type(&self, name: &str) -> &Type {
        match self.object_type().attrs.get(name) {
            Some(ty) => ty,
            None => panic!("object type has no attribute {name:?}"),
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        matches!(self, Type::Object(obj) if obj.attrs.contains_key(name))
    }

    pub fn attribute_optional(&self, name: &str) -> bool {
        let obj = self.object_type();
        if !obj.attrs.contains_key(name) {
            panic!("object type has no attribute {name:?}");
        }
        obj.optional.contains(name)
    }

    pub fn optional_attributes(&self) -> &BTreeSet<String> {
        &self.object_type().optional
    }

    fn object_type(&self) -> &ObjectType {
        match self {
            Type::Object(obj) => obj,
            other => panic!("not an object type: {}", other.friendly_name()),
        }
    }

    /// Element types of a tuple type. Panics for other types.
    pub fn tuple_element_types(&self) -> &[Type] {
        match self {
            Type::Tuple(elems) => elems,
            other => panic!("not a tuple type: {}", other.friendly_name()),
        }
    }

    /// Variants of a union type. Panics for other types.
    pub fn union_variants(&self) -> &BTreeMap<String, Type> {
        match self {
            Type::Union(union) => &union.variants,
            other => panic!("not a union type: {}", other.friendly_name()),
        }
    }

    pub fn capsule_type(&self) -> Option<&CapsuleType> {
        match self {
            Type::Capsule(cap) => Some(cap),
            _ => None,
        }
    }

    /// The operation table of a capsule type. Panics for other types.
    pub fn capsule_ops(&self) -> &CapsuleOps {
        match self {
            Type::Capsule(cap) => cap.ops(),
            other => panic!("not a capsule type: {}", other.friendly_name()),
        }
    }

    /// Whether [`Type::DynamicPseudoType`] appears anywhere within this type.
    pub fn has_dynamic_types(&self) -> bool {
        match self {
            Type::DynamicPseudoType => true,
            Type::List(ety) | Type::Set(ety) | Type::Map(ety) => ety.has_dynamic_types(),
            Type::Object(obj) => obj.attrs.values().any(Type::has_dynamic_types),
            Type::Tuple(elems) => elems.iter().any(Type::has_dynamic_types),
            Type::Union(union) => union.variants.values().any(Type::has_dynamic_types),
            _ => false,
        }
    }

    /// This type with every optional-attribute annotation removed, at every
    /// nesting level. Values never carry optional attributes.
    pub fn without_optional_attributes_deep(&self) -> Type {
        match self {
            Type::List(ety) => Type::list(ety.without_optional_attributes_deep()),
            Type::Set(ety) => Type::set(ety.without_optional_attributes_deep()),
            Type::Map(ety) => Type::map(ety.without_optional_attributes_deep()),
            Type::Object(obj) => Type::Object(Arc::new(ObjectType {
                attrs: obj
                    .attrs
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.without_optional_attributes_deep()))
                    .collect(),
                optional: BTreeSet::new(),
            })),
            Type::Tuple(elems) => Type::tuple(
                elems
                    .iter()
                    .map(Type::without_optional_attributes_deep)
                    .collect(),
            ),
            Type::Union(union) => Type::Union(Arc::new(UnionType {
                variants: union
                    .variants
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.without_optional_attributes_deep()))
                    .collect(),
            })),
            other => other.clone(),
        }
    }

    /// Whether a value of type `self` could satisfy `constraint`, treating
    /// [`Type::DynamicPseudoType`] on either side as a wildcard.
    pub fn test_conformance(&self, constraint: &Type) -> bool {
        match (self, constraint) {
            (Type::DynamicPseudoType, _) | (_, Type::DynamicPseudoType) => true,
            (Type::List(a), Type::List(b))
            | (Type::Set(a), Type::Set(b))
            | (Type::Map(a), Type::Map(b)) => a.test_conformance(b),
            (Type::Object(a), Type::Object(b)) => {
                a.attrs.len() == b.attrs.len()
                    && a.attrs.iter().all(|(name, ty)| {
                        b.attrs.get(name).is_some_and(|want| ty.test_conformance(want))
                    })
            }
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.test_conformance(y))
            }
            (Type::Union(a), Type::Union(b)) => {
                a.variants.len() == b.variants.len()
                    && a.variants.iter().all(|(name, ty)| {
                        b.variants.get(name).is_some_and(|want| ty.test_conformance(want))
                    })
            }
            _ => self.equals(constraint),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Type {}
