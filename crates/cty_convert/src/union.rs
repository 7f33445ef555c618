use std::collections::BTreeMap;

use cty::{PathStep, Type, Value};

use crate::Conversion;
use crate::conversion::resolve;

/// Unions to unions, variant by variant. Every source variant needs a
/// same-named target variant it converts to.
pub(crate) fn union_to_union(in_ty: &Type, out: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let out_variants = out.union_variants();
    let variants = in_ty
        .union_variants()
        .iter()
        .map(|(name, vty)| {
            let out_vty = out_variants.get(name)?;
            Some((name.clone(), resolve(vty, out_vty, allow_unsafe)?))
        })
        .collect::<Option<BTreeMap<_, _>>>()?;
    let out = out.clone();
    Some(Conversion::new(move |value, path| {
        let (variant, inner) = value.union_variant();
        let Some(conversion) = variants.get(variant) else {
            return Err(path.new_errorf(format_args!(
                "union variant {variant:?} is not accepted"
            )));
        };
        path.push(PathStep::GetAttr(variant.to_string()));
        let converted = conversion.convert_at(inner, path);
        path.pop();
        Ok(Value::union(out.clone(), variant, converted?))
    }))
}

/// Objects to unions, where each attribute names a variant and exactly one
/// attribute may be non-null. Only available in unsafe mode.
pub(crate) fn object_to_union(in_ty: &Type, out: &Type) -> Option<Conversion> {
    let out_variants = out.union_variants();
    let attrs = in_ty.attribute_types();
    if attrs.is_empty() {
        return None;
    }
    let variants = attrs
        .iter()
        .map(|(name, aty)| {
            let vty = out_variants.get(name)?;
            Some((name.clone(), resolve(aty, vty, true)?))
        })
        .collect::<Option<BTreeMap<_, _>>>()?;
    let out = out.clone();
    Some(Conversion::new(move |value, path| {
        let mut chosen: Option<(String, Value)> = None;
        for (name, attr) in value.element_iter() {
            if !attr.is_known() {
                return Ok(Value::unknown(out.clone()).refine_not_null());
            }
            if attr.is_null() {
                continue;
            }
            let name = name.as_string().to_string();
            if let Some((first, _)) = &chosen {
                return Err(path.new_errorf(format_args!(
                    "exactly one attribute must be non-null to select a union variant, but both {first:?} and {name:?} are set"
                )));
            }
            chosen = Some((name, attr));
        }
        let Some((name, attr)) = chosen else {
            return Err(path.new_error(
                "exactly one attribute must be non-null to select a union variant",
            ));
        };
        let Some(conversion) = variants.get(&name) else {
            return Err(path.new_errorf(format_args!(
                "attribute {name:?} does not name a union variant"
            )));
        };
        path.push(PathStep::GetAttr(name.clone()));
        let converted = conversion.convert_at(&attr, path);
        path.pop();
        Ok(Value::union(out.clone(), &name, converted?))
    }))
}
