#![cfg(feature = "proptest")]

use cty::Type;
use cty_convert::{compare_types, get_conversion, sort_types, unify};
use proptest::prelude::*;

fn type_strategy() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        Just(Type::Number),
        Just(Type::String),
        Just(Type::Bool),
        Just(Type::DynamicPseudoType),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::list),
            inner.clone().prop_map(Type::set),
            inner.clone().prop_map(Type::map),
            prop::collection::btree_map("[a-c]", inner.clone(), 0..3)
                .prop_map(|attrs| Type::object(attrs)),
            prop::collection::vec(inner, 0..3).prop_map(Type::tuple),
        ]
    })
}

proptest! {
    #[test]
    fn compare_types_is_reflexive(ty in type_strategy()) {
        prop_assert_eq!(compare_types(&ty, &ty), std::cmp::Ordering::Equal);
    }

    #[test]
    fn compare_types_is_antisymmetric(a in type_strategy(), b in type_strategy()) {
        prop_assert_eq!(compare_types(&a, &b), compare_types(&b, &a).reverse());
    }

    #[test]
    fn single_types_unify_to_themselves(ty in type_strategy()) {
        let (unified, conversions) = unify(std::slice::from_ref(&ty)).expect("unifies");
        prop_assert_eq!(unified, ty);
        prop_assert_eq!(conversions.len(), 1);
        prop_assert!(conversions[0].is_none());
    }

    #[test]
    fn sort_types_is_a_permutation(types in prop::collection::vec(type_strategy(), 0..5)) {
        let mut order = sort_types(&types);
        order.sort_unstable();
        prop_assert_eq!(order, (0..types.len()).collect::<Vec<_>>());
    }

    #[test]
    fn every_type_converts_to_itself_and_dynamic(ty in type_strategy()) {
        prop_assert!(get_conversion(&ty, &ty).is_some());
        prop_assert!(get_conversion(&ty, &Type::DynamicPseudoType).is_some());
    }
}
