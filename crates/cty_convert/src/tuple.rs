use cty::{Path, PathError, PathStep, Type, Value};

use crate::Conversion;
use crate::collection::homogenize;
use crate::conversion::resolve;
use crate::unify::unify_types;

pub(crate) fn tuple_to_tuple(in_ty: &Type, out: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let in_etys = in_ty.tuple_element_types();
    let out_etys = out.tuple_element_types();
    if in_etys.len() != out_etys.len() {
        return None;
    }
    let elements = in_etys
        .iter()
        .zip(out_etys)
        .map(|(from, to)| resolve(from, to, allow_unsafe))
        .collect::<Option<Vec<_>>>()?;
    Some(Conversion::new(move |value, path| {
        Ok(Value::tuple(convert_elements(value, &elements, path)?))
    }))
}

fn convert_elements(
    value: &Value,
    conversions: &[Conversion],
    path: &mut Path,
) -> Result<Vec<Value>, PathError> {
    let mut out = Vec::with_capacity(conversions.len());
    for ((index, elem), conversion) in value.element_iter().zip(conversions) {
        path.push(PathStep::Index(index));
        let converted = conversion.convert_at(&elem, path);
        path.pop();
        out.push(converted?);
    }
    Ok(out)
}

/// Per-element conversions into one element type. A dynamic element type
/// asks for the tuple's element types to be unified first.
fn element_conversions(
    in_ty: &Type,
    out_ety: &Type,
    allow_unsafe: bool,
) -> Option<(Type, Vec<Conversion>)> {
    let in_etys = in_ty.tuple_element_types();
    let mut ety = out_ety.clone();
    if ety.is_dynamic() && !in_etys.is_empty() {
        let (unified, _) = unify_types(in_etys, allow_unsafe)?;
        // Only a tuple made entirely of dynamic elements can become a
        // collection of dynamic elements.
        if unified.is_dynamic() && !in_etys.iter().all(Type::is_dynamic) {
            return None;
        }
        ety = unified;
    }
    let conversions = in_etys
        .iter()
        .map(|from| resolve(from, &ety, allow_unsafe))
        .collect::<Option<Vec<_>>>()?;
    Some((ety, conversions))
}

pub(crate) fn tuple_to_list(in_ty: &Type, out_ety: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let (ety, elements) = element_conversions(in_ty, out_ety, allow_unsafe)?;
    Some(Conversion::new(move |value, path| {
        let converted = convert_elements(value, &elements, path)?;
        if converted.is_empty() {
            return Ok(Value::list_empty(ety.without_optional_attributes_deep()));
        }
        Ok(Value::list(homogenize(converted, allow_unsafe, path, "list")?))
    }))
}

pub(crate) fn tuple_to_set(in_ty: &Type, out_ety: &Type, allow_unsafe: bool) -> Option<Conversion> {
    let (ety, elements) = element_conversions(in_ty, out_ety, allow_unsafe)?;
    Some(Conversion::new(move |value, path| {
        let converted = convert_elements(value, &elements, path)?;
        if converted.is_empty() {
            return Ok(Value::set_empty(ety.without_optional_attributes_deep()));
        }
        Ok(Value::set(homogenize(converted, allow_unsafe, path, "set")?))
    }))
}
