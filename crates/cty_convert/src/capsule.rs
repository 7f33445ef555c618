use cty::{Type, Value};

use crate::Conversion;

/// Conversions supplied by a capsule type's operation table. The target's
/// `conversion_from` hook is consulted before the source's `conversion_to`.
pub(crate) fn conversion(in_ty: &Type, out: &Type) -> Option<Conversion> {
    if let Some(from) = out.capsule_type().and_then(|cap| cap.ops().conversion_from(in_ty)) {
        let out = out.clone();
        return Some(Conversion::new(move |value, path| {
            let payload = from(value, &*path)?;
            Ok(Value::capsule_arc(&out, payload))
        }));
    }
    let to = in_ty.capsule_type()?.ops().conversion_to(out)?;
    let out = out.clone();
    Some(Conversion::new(move |value, path| {
        let converted = to(value.capsule_payload().as_ref(), &*path)?;
        if !converted.ty().test_conformance(&out) {
            panic!(
                "capsule conversion to {} produced a {} value",
                out.friendly_name(),
                converted.ty().friendly_name()
            );
        }
        Ok(converted)
    }))
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;

    use crate::{get_conversion, get_conversion_unsafe};
    use cty::{CapsuleFromFn, CapsuleOps, CapsuleToFn, Path, Type, Value};

    #[derive(Debug)]
    struct Port(u16);

    fn port_type() -> Type {
        let ops = CapsuleOps::new()
            .with_conversion_from(|source| {
                if !source.equals(&Type::Number) {
                    return None;
                }
                let from: CapsuleFromFn = Arc::new(|value: &Value, path: &Path| match value.as_i64() {
                    Some(n) if (0..=65535).contains(&n) => {
                        Ok(Arc::new(Port(n as u16)) as Arc<dyn Any + Send + Sync>)
                    }
                    _ => Err(path.new_error("port out of range")),
                });
                Some(from)
            })
            .with_conversion_to(|target| {
                if !target.equals(&Type::String) {
                    return None;
                }
                let to: CapsuleToFn = Arc::new(|payload: &(dyn Any + Send + Sync), _: &Path| {
                    let port = payload.downcast_ref::<Port>().map_or(0, |port| port.0);
                    Ok(Value::string(port.to_string()))
                });
                Some(to)
            });
        Type::capsule_with_ops::<Port>("port", ops)
    }

    #[test]
    fn capsule_hooks_are_unsafe_only() {
        let port = port_type();
        assert!(get_conversion(&Type::Number, &port).is_none());
        assert!(get_conversion_unsafe(&Type::Bool, &port).is_none());
        let into = get_conversion_unsafe(&Type::Number, &port).expect("conversion");
        let value = into.convert(&Value::number_int(8080)).expect("converts");
        assert_eq!(value.encapsulated::<Port>().map(|p| p.0), Some(8080));

        let err = into.convert(&Value::number_int(-1)).expect_err("out of range");
        assert_eq!(err.message(), "port out of range");

        let out = get_conversion_unsafe(&port, &Type::String)
            .expect("conversion")
            .convert(&value)
            .expect("converts");
        assert_eq!(out.as_string(), "8080");
    }
}
