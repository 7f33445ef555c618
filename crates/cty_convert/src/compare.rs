use std::cmp::Ordering;

use cty::Type;

/// Ranks two types by generality.
///
/// `Greater` means `a` is a supertype of `b`: values of `b` are expected to
/// convert to `a` without losing information. Unrelated types compare
/// `Equal`. The result only guides unification preferences; the conversion
/// it suggests still has to be resolved and may not exist.
pub fn compare_types(a: &Type, b: &Type) -> Ordering {
    match (a, b) {
        (Type::DynamicPseudoType, Type::DynamicPseudoType) => Ordering::Equal,
        (Type::DynamicPseudoType, _) => Ordering::Greater,
        (_, Type::DynamicPseudoType) => Ordering::Less,

        // Every primitive has a string representation.
        (Type::String, Type::Number | Type::Bool) => Ordering::Greater,
        (Type::Number | Type::Bool, Type::String) => Ordering::Less,

        (Type::List(x), Type::List(y))
        | (Type::Set(x), Type::Set(y))
        | (Type::Map(x), Type::Map(y)) => compare_types(x, y),
        (Type::List(x), Type::Set(y)) => match compare_types(x, y) {
            Ordering::Equal => Ordering::Greater,
            other => other,
        },
        (Type::Set(_), Type::List(_)) => compare_types(b, a).reverse(),

        (Type::List(_) | Type::Set(_), Type::Tuple(_)) => Ordering::Greater,
        (Type::Tuple(_), Type::List(_) | Type::Set(_)) => Ordering::Less,
        (Type::Map(_), Type::Object(_)) => Ordering::Greater,
        (Type::Object(_), Type::Map(_)) => Ordering::Less,

        (Type::Object(x), Type::Object(y)) => {
            if !x.attrs.keys().eq(y.attrs.keys()) {
                return Ordering::Equal;
            }
            majority(x.attrs.values().zip(y.attrs.values()))
        }
        (Type::Tuple(x), Type::Tuple(y)) => {
            if x.len() != y.len() {
                return Ordering::Equal;
            }
            majority(x.iter().zip(y.iter()))
        }
        _ => Ordering::Equal,
    }
}

/// The ordering most pairs agree on; ties are `Equal`.
fn majority<'a>(pairs: impl Iterator<Item = (&'a Type, &'a Type)>) -> Ordering {
    let mut balance = 0isize;
    for (x, y) in pairs {
        match compare_types(x, y) {
            Ordering::Greater => balance += 1,
            Ordering::Less => balance -= 1,
            Ordering::Equal => {}
        }
    }
    balance.cmp(&0)
}

/// Indices of `types` in preference order for unification, most general
/// first. Types unrelated by [`compare_types`] keep their input order.
pub fn sort_types(types: &[Type]) -> Vec<usize> {
    let mut indegree = vec![0usize; types.len()];
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); types.len()];

    for (i, a) in types.iter().enumerate() {
        for (j, b) in types.iter().enumerate().skip(i + 1) {
            match compare_types(a, b) {
                Ordering::Greater => {
                    edges[i].push(j);
                    indegree[j] += 1;
                }
                Ordering::Less => {
                    edges[j].push(i);
                    indegree[i] += 1;
                }
                Ordering::Equal => {}
            }
        }
    }

    let mut ready: Vec<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(idx, &deg)| (deg == 0).then_some(idx))
        .collect();

    let mut out = Vec::with_capacity(types.len());
    let mut processed = vec![false; types.len()];
    while let Some(idx) = ready.first().copied() {
        ready.remove(0);
        if processed[idx] {
            continue;
        }
        processed[idx] = true;
        out.push(idx);
        for &next in edges[idx].iter() {
            indegree[next] = indegree[next].saturating_sub(1);
            if indegree[next] == 0 && !processed[next] {
                ready.push(next);
                ready.sort_unstable();
            }
        }
    }

    // Preferences need not be transitive; anything caught in a cycle goes
    // last, in input order.
    out.extend(
        processed
            .iter()
            .enumerate()
            .filter_map(|(idx, done)| (!done).then_some(idx)),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_is_above_everything() {
        assert_eq!(
            compare_types(&Type::DynamicPseudoType, &Type::list(Type::Bool)),
            Ordering::Greater
        );
        assert_eq!(
            compare_types(&Type::Number, &Type::DynamicPseudoType),
            Ordering::Less
        );
    }

    #[test]
    fn string_is_above_other_primitives() {
        assert_eq!(compare_types(&Type::String, &Type::Number), Ordering::Greater);
        assert_eq!(compare_types(&Type::Bool, &Type::String), Ordering::Less);
        assert_eq!(compare_types(&Type::Bool, &Type::Number), Ordering::Equal);
    }

    #[test]
    fn collections_compare_structurally() {
        let list_of_strings = Type::list(Type::String);
        assert_eq!(
            compare_types(&list_of_strings, &Type::list(Type::Number)),
            Ordering::Greater
        );
        assert_eq!(
            compare_types(&Type::set(Type::String), &list_of_strings),
            Ordering::Less
        );
        assert_eq!(
            compare_types(&list_of_strings, &Type::tuple(vec![Type::Bool])),
            Ordering::Greater
        );
        assert_eq!(
            compare_types(&Type::object([("a", Type::Number)]), &Type::map(Type::String)),
            Ordering::Less
        );
    }

    #[test]
    fn objects_use_the_majority_of_attributes() {
        let a = Type::object([("x", Type::String), ("y", Type::String), ("z", Type::Bool)]);
        let b = Type::object([("x", Type::Number), ("y", Type::Bool), ("z", Type::String)]);
        assert_eq!(compare_types(&a, &b), Ordering::Greater);
        let c = Type::object([("x", Type::String), ("y", Type::Number)]);
        let d = Type::object([("x", Type::Number), ("y", Type::String)]);
        assert_eq!(compare_types(&c, &d), Ordering::Equal);
        let e = Type::object([("x", Type::String), ("w", Type::Number)]);
        assert_eq!(compare_types(&c, &e), Ordering::Equal);
    }

    #[test]
    fn sort_puts_supertypes_first() {
        let types = [Type::Number, Type::Bool, Type::String];
        assert_eq!(sort_types(&types), vec![2, 0, 1]);
        let types = [Type::Number, Type::DynamicPseudoType];
        assert_eq!(sort_types(&types), vec![1, 0]);
        assert!(sort_types(&[]).is_empty());
    }
}
