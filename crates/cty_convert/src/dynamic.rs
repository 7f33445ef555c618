use std::collections::BTreeMap;

use cty::{PathError, Type};

use crate::unify::unify_types;
use crate::{Conversion, convert};

/// Conversion from a dynamic source, decided again for each value's own
/// type.
pub(crate) fn fixup(want: &Type) -> Conversion {
    let want = want.clone();
    Conversion::new(move |value, path| {
        convert(value, &want).map_err(|err| {
            let full = path.steps().iter().chain(err.path().steps()).cloned().collect();
            PathError::new(full, err.message)
        })
    })
}

/// `out` with any dynamic parts replaced by the corresponding parts of `in_ty`,
/// so that nulls and unknowns produced by a conversion are as specific as
/// the input allows.
pub(crate) fn dynamic_replace(in_ty: &Type, out: &Type) -> Type {
    if in_ty.is_dynamic() {
        return out.clone();
    }
    match out {
        Type::DynamicPseudoType => in_ty.clone(),
        Type::Map(ety) => match in_ty {
            Type::Map(in_ety) => Type::map(dynamic_replace(in_ety, ety)),
            Type::Object(obj) => {
                let atys: Vec<Type> = obj.attrs.values().cloned().collect();
                Type::map(replace_with_unified(&atys, ety))
            }
            _ => out.clone(),
        },
        Type::List(ety) | Type::Set(ety) => {
            let replaced = match in_ty {
                Type::List(in_ety) | Type::Set(in_ety) => dynamic_replace(in_ety, ety),
                Type::Tuple(elems) => replace_with_unified(elems, ety),
                _ => return out.clone(),
            };
            if out.is_list_type() {
                Type::list(replaced)
            } else {
                Type::set(replaced)
            }
        }
        Type::Object(obj) => {
            let attrs: BTreeMap<String, Type> = match in_ty {
                Type::Map(in_ety) => obj
                    .attrs
                    .iter()
                    .map(|(name, aty)| (name.clone(), dynamic_replace(in_ety, aty)))
                    .collect(),
                Type::Object(in_obj) => obj
                    .attrs
                    .iter()
                    .map(|(name, aty)| {
                        let replaced = match in_obj.attrs.get(name) {
                            Some(in_aty) => dynamic_replace(in_aty, aty),
                            None => aty.clone(),
                        };
                        (name.clone(), replaced)
                    })
                    .collect(),
                _ => return out.clone(),
            };
            Type::object_with_optional_attrs(attrs, obj.optional.iter().cloned())
        }
        Type::Tuple(elems) => match in_ty {
            Type::Tuple(in_elems) if in_elems.len() == elems.len() => Type::tuple(
                in_elems
                    .iter()
                    .zip(elems.iter())
                    .map(|(in_ety, ety)| dynamic_replace(in_ety, ety))
                    .collect(),
            ),
            _ => out.clone(),
        },
        Type::Union(union) => match in_ty {
            Type::Union(in_union) => Type::union(union.variants.iter().map(|(name, vty)| {
                let replaced = match in_union.variants.get(name) {
                    Some(in_vty) => dynamic_replace(in_vty, vty),
                    None => vty.clone(),
                };
                (name.clone(), replaced)
            })),
            _ => out.clone(),
        },
        _ => out.clone(),
    }
}

fn replace_with_unified(types: &[Type], ety: &Type) -> Type {
    match unify_types(types, true) {
        Some((unified, _)) => dynamic_replace(&unified, ety),
        None => ety.clone(),
    }
}
