use super::{Nullness, Refinement};
use crate::{Type, Value};

/// The single known value an unknown of type `ty` refined by `refinement`
/// must turn out to be, if any.
pub(crate) fn collapse(ty: &Type, refinement: &Refinement) -> Option<Value> {
    match refinement.null() {
        Nullness::Null => return Some(Value::null(ty.clone())),
        Nullness::Unknown => return None,
        Nullness::NotNull => {}
    }
    match refinement {
        Refinement::Number { .. } => {
            let (lower, lower_inclusive) = refinement.lower_bound();
            let (upper, upper_inclusive) = refinement.upper_bound();
            (lower_inclusive && upper_inclusive && lower == upper).then(|| Value::number(lower))
        }
        Refinement::Collection {
            min_len, max_len, ..
        } if min_len == max_len => collapse_collection(ty, *min_len),
        _ => None,
    }
}

fn collapse_collection(ty: &Type, len: usize) -> Option<Value> {
    match (ty, len) {
        (Type::List(ety), 0) => Some(Value::list_empty((**ety).clone())),
        (Type::Set(ety), 0) => Some(Value::set_empty((**ety).clone())),
        (Type::Map(ety), 0) => Some(Value::map_empty((**ety).clone())),
        (Type::List(ety), n) => {
            let elems = (0..n).map(|_| Value::unknown((**ety).clone())).collect();
            Some(Value::list(elems))
        }
        (Type::Set(ety), 1) => Some(Value::set(vec![Value::unknown((**ety).clone())])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Number;
    use crate::refinement::NumberBound;

    fn bound(n: i64, inclusive: bool) -> Option<NumberBound> {
        Some(NumberBound {
            value: Number::from_i64(n),
            inclusive,
        })
    }

    #[test]
    fn exclusive_point_does_not_collapse() {
        let refinement = Refinement::Number {
            null: Nullness::NotNull,
            lower: bound(2, true),
            upper: bound(2, false),
        };
        assert!(collapse(&Type::Number, &refinement).is_none());
    }

    #[test]
    fn inclusive_point_collapses() {
        let refinement = Refinement::Number {
            null: Nullness::NotNull,
            lower: bound(2, true),
            upper: bound(2, true),
        };
        let value = collapse(&Type::Number, &refinement).expect("collapses");
        assert!(value.raw_equals(&Value::number_int(2)));
    }

    #[test]
    fn null_collapses_regardless_of_bounds() {
        let refinement = Refinement::Collection {
            null: Nullness::Null,
            min_len: 3,
            max_len: 3,
        };
        let value = collapse(&Type::list(Type::Bool), &refinement).expect("collapses");
        assert!(value.is_null());
    }
}
