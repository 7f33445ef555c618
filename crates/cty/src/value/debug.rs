use std::fmt;

use super::{Payload, Value};

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Null => write!(f, "Null({:?})", self.ty)?,
            Payload::Unknown(None) => write!(f, "Unknown({:?})", self.ty)?,
            Payload::Unknown(Some(refinement)) => {
                write!(f, "Unknown({:?}, {:?})", self.ty, refinement)?
            }
            Payload::Number(n) => write!(f, "Number({n})")?,
            Payload::String(s) => write!(f, "String({:?})", &**s)?,
            Payload::Bool(b) => write!(f, "Bool({b})")?,
            Payload::Seq(elems) => {
                let name = if self.ty.is_tuple_type() { "Tuple" } else { "List" };
                f.debug_tuple(name).field(&**elems).finish()?
            }
            Payload::Attrs(attrs) => {
                let name = if self.ty.is_object_type() { "Object" } else { "Map" };
                f.debug_tuple(name).field(&**attrs).finish()?
            }
            Payload::Set(set) => f.debug_tuple("Set").field(&set.values()).finish()?,
            Payload::Union(variant, inner) => {
                f.debug_tuple("Union").field(&&**variant).field(&**inner).finish()?
            }
            Payload::Capsule(payload) => {
                let rendered = match self.ty.capsule_type() {
                    Some(cap) => cap.ops().render(cap.name(), payload.as_ref()),
                    None => "?".to_string(),
                };
                write!(f, "Capsule({rendered})")?
            }
        }
        if !self.marks.is_empty() {
            write!(f, ".mark({:?})", self.marks)?;
        }
        Ok(())
    }
}
