use cty::{Type, Value};

use crate::Conversion;
use crate::compare::sort_types;
use crate::conversion::resolve;

/// A unified type together with, for each input type in order, the
/// conversion into it. `None` marks inputs that already have the unified
/// type.
pub type Unification = (Type, Vec<Option<Conversion>>);

/// Finds a single type that all of `types` convert to safely, or `None`.
pub fn unify(types: &[Type]) -> Option<Unification> {
    unify_types(types, false)
}

/// Like [`unify`], but the conversions may be unsafe.
pub fn unify_unsafe(types: &[Type]) -> Option<Unification> {
    unify_types(types, true)
}

#[derive(Default)]
struct KindCounts {
    maps: usize,
    lists: usize,
    sets: usize,
    objects: usize,
    tuples: usize,
    dynamics: usize,
}

impl KindCounts {
    fn of(types: &[Type]) -> Self {
        let mut counts = KindCounts::default();
        for ty in types {
            match ty {
                Type::Map(_) => counts.maps += 1,
                Type::List(_) => counts.lists += 1,
                Type::Set(_) => counts.sets += 1,
                Type::Object(_) => counts.objects += 1,
                Type::Tuple(_) => counts.tuples += 1,
                Type::DynamicPseudoType => counts.dynamics += 1,
                _ => {}
            }
        }
        counts
    }
}

pub(crate) fn unify_types(types: &[Type], allow_unsafe: bool) -> Option<Unification> {
    let Some((first, rest)) = types.split_first() else {
        return Some((Type::DynamicPseudoType, Vec::new()));
    };
    if types.iter().all(Type::is_dynamic) || rest.iter().all(|ty| ty.equals(first)) {
        return Some((first.clone(), vec![None; types.len()]));
    }

    // Types of one structural kind may unify to a type that is none of the
    // inputs, so try that before the preference search.
    let counts = KindCounts::of(types);
    let has_dynamic = counts.dynamics > 0;
    let only = |n: usize| n > 0 && n + counts.dynamics == types.len();
    if only(counts.maps) {
        return unify_collections(types, Type::map, allow_unsafe, has_dynamic);
    }
    if counts.maps > 0 && counts.maps + counts.objects == types.len() {
        if let Some(unified) = unify_objects_as_maps(types, allow_unsafe) {
            return Some(unified);
        }
    }
    if only(counts.lists) {
        return unify_collections(types, Type::list, allow_unsafe, has_dynamic);
    }
    if only(counts.sets) {
        return unify_collections(types, Type::set, allow_unsafe, has_dynamic);
    }
    if only(counts.objects) {
        return unify_objects(types, allow_unsafe, has_dynamic);
    }
    if only(counts.tuples) {
        return unify_tuples(types, allow_unsafe, has_dynamic);
    }
    if counts.objects > 0 && counts.tuples > 0 {
        return None;
    }
    unify_by_preference(types, allow_unsafe)
}

/// Conversions from each of `types` into `target`, or `None` if any is
/// missing.
fn conversions_into(types: &[Type], target: Type, allow_unsafe: bool) -> Option<Unification> {
    let conversions = types
        .iter()
        .map(|ty| {
            if ty.equals(&target) {
                Some(None)
            } else {
                resolve(ty, &target, allow_unsafe).map(Some)
            }
        })
        .collect::<Option<Vec<_>>>()?;
    Some((target, conversions))
}

/// With a dynamic input nothing can be predicted about the eventual type,
/// so every value becomes a dynamic unknown.
fn unify_all_as_dynamic(types: &[Type]) -> Unification {
    let to_dynamic = Conversion::new(|value, _| Ok(Value::dynamic().with_same_marks(value)));
    (Type::DynamicPseudoType, vec![Some(to_dynamic); types.len()])
}

fn unify_collections(
    types: &[Type],
    collection: fn(Type) -> Type,
    allow_unsafe: bool,
    has_dynamic: bool,
) -> Option<Unification> {
    if has_dynamic {
        return Some(unify_all_as_dynamic(types));
    }
    let etys: Vec<Type> = types.iter().map(|ty| ty.element_type().clone()).collect();
    let (ety, _) = unify_types(&etys, allow_unsafe)?;
    conversions_into(types, collection(ety), allow_unsafe)
}

fn unify_objects_as_maps(types: &[Type], allow_unsafe: bool) -> Option<Unification> {
    let mut etys = Vec::new();
    for ty in types {
        match ty {
            Type::Map(ety) => etys.push((**ety).clone()),
            Type::Object(obj) => etys.extend(obj.attrs.values().cloned()),
            _ => return None,
        }
    }
    let (ety, _) = unify_types(&etys, allow_unsafe)?;
    conversions_into(types, Type::map(ety), allow_unsafe)
}

fn unify_objects(types: &[Type], allow_unsafe: bool, has_dynamic: bool) -> Option<Unification> {
    if has_dynamic {
        return Some(unify_all_as_dynamic(types));
    }
    // Only identical attribute names produce an object type. Unifying an
    // object with a subset of its attributes would silently discard data,
    // so anything else falls back to a map.
    let names = types[0].attribute_types();
    if !types[1..]
        .iter()
        .all(|ty| ty.attribute_types().keys().eq(names.keys()))
    {
        return unify_objects_to_map(types, allow_unsafe);
    }
    let mut attrs = Vec::with_capacity(names.len());
    for name in names.keys() {
        let across: Vec<Type> = types.iter().map(|ty| ty.attribute_type(name).clone()).collect();
        let (aty, _) = unify_types(&across, allow_unsafe)?;
        attrs.push((name.clone(), aty));
    }
    match conversions_into(types, Type::object(attrs), allow_unsafe) {
        Some(unified) => Some(unified),
        None => unify_objects_to_map(types, allow_unsafe),
    }
}

fn unify_objects_to_map(types: &[Type], allow_unsafe: bool) -> Option<Unification> {
    tracing::debug!(count = types.len(), "unifying object types as a map");
    let atys: Vec<Type> = types
        .iter()
        .flat_map(|ty| ty.attribute_types().values().cloned())
        .collect();
    let (ety, _) = unify_types(&atys, allow_unsafe)?;
    conversions_into(types, Type::map(ety), allow_unsafe)
}

fn unify_tuples(types: &[Type], allow_unsafe: bool, has_dynamic: bool) -> Option<Unification> {
    if has_dynamic {
        return Some(unify_all_as_dynamic(types));
    }
    let len = types[0].tuple_element_types().len();
    if !types.iter().all(|ty| ty.tuple_element_types().len() == len) {
        return unify_tuples_to_list(types, allow_unsafe);
    }
    let mut etys = Vec::with_capacity(len);
    for i in 0..len {
        let across: Vec<Type> = types
            .iter()
            .map(|ty| ty.tuple_element_types()[i].clone())
            .collect();
        etys.push(unify_types(&across, allow_unsafe)?.0);
    }
    match conversions_into(types, Type::tuple(etys), allow_unsafe) {
        Some(unified) => Some(unified),
        None => unify_tuples_to_list(types, allow_unsafe),
    }
}

fn unify_tuples_to_list(types: &[Type], allow_unsafe: bool) -> Option<Unification> {
    tracing::debug!(count = types.len(), "unifying tuple types as a list");
    let etys: Vec<Type> = types
        .iter()
        .flat_map(|ty| ty.tuple_element_types().iter().cloned())
        .collect();
    let (ety, _) = unify_types(&etys, allow_unsafe)?;
    conversions_into(types, Type::list(ety), allow_unsafe)
}

/// Tries each input type as the target, most general first, and keeps the
/// first one every input converts to.
fn unify_by_preference(types: &[Type], allow_unsafe: bool) -> Option<Unification> {
    let unified = sort_types(types)
        .into_iter()
        .find_map(|idx| conversions_into(types, types[idx].clone(), allow_unsafe));
    if unified.is_none() {
        tracing::debug!(?types, allow_unsafe, "no common type to unify to");
    }
    unified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_and_string_unify_to_string() {
        let (ty, conversions) = unify(&[Type::Number, Type::String]).expect("unifies");
        assert_eq!(ty, Type::String);
        assert!(conversions[0].is_some());
        assert!(conversions[1].is_none());
        let converted = conversions[0]
            .as_ref()
            .expect("number converts")
            .convert(&Value::number_int(42))
            .expect("converts");
        assert_eq!(converted.as_string(), "42");
    }

    #[test]
    fn trivial_inputs() {
        let (ty, conversions) = unify(&[]).expect("unifies");
        assert_eq!(ty, Type::DynamicPseudoType);
        assert!(conversions.is_empty());

        let (ty, conversions) =
            unify(&[Type::DynamicPseudoType, Type::DynamicPseudoType]).expect("unifies");
        assert_eq!(ty, Type::DynamicPseudoType);
        assert_eq!(conversions.len(), 2);
        assert!(conversions.iter().all(Option::is_none));

        let (ty, conversions) = unify(&[Type::Bool]).expect("unifies");
        assert_eq!(ty, Type::Bool);
        assert!(conversions[0].is_none());
    }

    #[test]
    fn unrelated_primitives_only_unify_through_string() {
        assert!(unify(&[Type::Number, Type::Bool]).is_none());
        assert!(unify_unsafe(&[Type::Number, Type::Bool]).is_none());
    }

    #[test]
    fn collections_unify_element_types() {
        let (ty, conversions) =
            unify(&[Type::list(Type::Number), Type::list(Type::String)]).expect("unifies");
        assert_eq!(ty, Type::list(Type::String));
        assert!(conversions[0].is_some());
        assert!(conversions[1].is_none());
    }

    #[test]
    fn objects_with_matching_names_stay_objects() {
        let a = Type::object([("id", Type::Number), ("ok", Type::Bool)]);
        let b = Type::object([("id", Type::String), ("ok", Type::Bool)]);
        let (ty, _) = unify(&[a, b]).expect("unifies");
        assert_eq!(ty, Type::object([("id", Type::String), ("ok", Type::Bool)]));
    }

    #[test]
    fn objects_with_different_names_become_maps() {
        let a = Type::object([("a", Type::Number)]);
        let b = Type::object([("b", Type::String)]);
        let (ty, conversions) = unify(&[a, b]).expect("unifies");
        assert_eq!(ty, Type::map(Type::String));
        assert!(conversions.iter().all(Option::is_some));
    }

    #[test]
    fn tuples_of_different_lengths_become_lists() {
        let a = Type::tuple(vec![Type::Number]);
        let b = Type::tuple(vec![Type::String, Type::String]);
        let (ty, _) = unify(&[a, b]).expect("unifies");
        assert_eq!(ty, Type::list(Type::String));
    }

    #[test]
    fn objects_and_tuples_never_unify() {
        let types = [Type::empty_object(), Type::empty_tuple()];
        assert!(unify_unsafe(&types).is_none());
    }

    #[test]
    fn dynamic_collections_unify_to_dynamic() {
        let (ty, conversions) =
            unify(&[Type::list(Type::Number), Type::DynamicPseudoType]).expect("unifies");
        assert_eq!(ty, Type::DynamicPseudoType);
        let out = conversions[0]
            .as_ref()
            .expect("conversion")
            .convert(&Value::list(vec![Value::number_int(1)]))
            .expect("converts");
        assert!(!out.is_known());
    }

    #[test]
    fn unsafe_unification_parses_strings() {
        let (ty, conversions) = unify_unsafe(&[
            Type::list(Type::String),
            Type::set(Type::Number),
        ])
        .expect("unifies");
        assert_eq!(ty, Type::list(Type::String));
        assert!(conversions[0].is_none());
    }
}
