use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Path, PathError, Type, Value};

static NEXT_CAPSULE_ID: AtomicU64 = AtomicU64::new(1);

/// Converts a value of some other type into a capsule payload.
pub type CapsuleFromFn =
    Arc<dyn Fn(&Value, &Path) -> Result<Arc<dyn Any + Send + Sync>, PathError> + Send + Sync>;

/// Converts a capsule payload into a value of some other type.
pub type CapsuleToFn =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &Path) -> Result<Value, PathError> + Send + Sync>;

type RenderFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> String + Send + Sync>;
type RawEqualsFn = Arc<dyn Fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool + Send + Sync>;
type EqualsFn =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> Value + Send + Sync>;
type HashKeyFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> String + Send + Sync>;
type ConversionFromFn = Arc<dyn Fn(&Type) -> Option<CapsuleFromFn> + Send + Sync>;
type ConversionToFn = Arc<dyn Fn(&Type) -> Option<CapsuleToFn> + Send + Sync>;

/// Operations a capsule type may customize. Unset entries fall back to
/// identity semantics on the native payload.
#[derive(Clone, Default)]
pub struct CapsuleOps {
    render: Option<RenderFn>,
    raw_equals: Option<RawEqualsFn>,
    equals: Option<EqualsFn>,
    hash_key: Option<HashKeyFn>,
    conversion_from: Option<ConversionFromFn>,
    conversion_to: Option<ConversionToFn>,
}

fn downcast<T: Any>(payload: &(dyn Any + Send + Sync)) -> &T {
    match payload.downcast_ref::<T>() {
        Some(value) => value,
        None => panic!(
            "capsule payload is not a {}",
            std::any::type_name::<T>()
        ),
    }
}

impl CapsuleOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render<T: Any>(mut self, f: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(move |payload: &(dyn Any + Send + Sync)| {
            f(downcast::<T>(payload))
        }));
        self
    }

    /// Cheap equality between two payloads, used by `raw_equals` and set
    /// membership.
    pub fn with_raw_equals<T: Any>(
        mut self,
        f: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.raw_equals = Some(Arc::new(
            move |a: &(dyn Any + Send + Sync), b: &(dyn Any + Send + Sync)| {
                f(downcast::<T>(a), downcast::<T>(b))
            },
        ));
        self
    }

    /// Rich equality that may answer with an unknown boolean. Requires
    /// `with_raw_equals` as well.
    pub fn with_equals<T: Any>(
        mut self,
        f: impl Fn(&T, &T) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.equals = Some(Arc::new(
            move |a: &(dyn Any + Send + Sync), b: &(dyn Any + Send + Sync)| {
                f(downcast::<T>(a), downcast::<T>(b))
            },
        ));
        self
    }

    pub fn with_hash_key<T: Any>(
        mut self,
        f: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.hash_key = Some(Arc::new(move |payload: &(dyn Any + Send + Sync)| {
            f(downcast::<T>(payload))
        }));
        self
    }

    pub fn with_conversion_from(
        mut self,
        f: impl Fn(&Type) -> Option<CapsuleFromFn> + Send + Sync + 'static,
    ) -> Self {
        self.conversion_from = Some(Arc::new(f));
        self
    }

    pub fn with_conversion_to(
        mut self,
        f: impl Fn(&Type) -> Option<CapsuleToFn> + Send + Sync + 'static,
    ) -> Self {
        self.conversion_to = Some(Arc::new(f));
        self
    }

    pub fn render(&self, type_name: &str, payload: &(dyn Any + Send + Sync)) -> String {
        match &self.render {
            Some(render) => render(payload),
            None => format!("capsule value of {type_name}"),
        }
    }

    pub fn has_custom_equality(&self) -> bool {
        self.raw_equals.is_some()
    }

    pub fn raw_equals(
        &self,
        a: &Arc<dyn Any + Send + Sync>,
        b: &Arc<dyn Any + Send + Sync>,
    ) -> bool {
        match &self.raw_equals {
            Some(raw_equals) => raw_equals(a.as_ref(), b.as_ref()),
            None => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        }
    }

    pub fn equals(&self, a: &Arc<dyn Any + Send + Sync>, b: &Arc<dyn Any + Send + Sync>) -> Value {
        match &self.equals {
            Some(equals) => equals(a.as_ref(), b.as_ref()),
            None => Value::bool(self.raw_equals(a, b)),
        }
    }

    pub fn hash_key(&self, payload: &(dyn Any + Send + Sync)) -> Option<String> {
        self.hash_key.as_ref().map(|hash_key| hash_key(payload))
    }

    pub fn conversion_from(&self, source: &Type) -> Option<CapsuleFromFn> {
        self.conversion_from.as_ref().and_then(|from| from(source))
    }

    pub fn conversion_to(&self, target: &Type) -> Option<CapsuleToFn> {
        self.conversion_to.as_ref().and_then(|to| to(target))
    }
}

impl fmt::Debug for CapsuleOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapsuleOps")
            .field("render", &self.render.is_some())
            .field("raw_equals", &self.raw_equals.is_some())
            .field("equals", &self.equals.is_some())
            .field("hash_key", &self.hash_key.is_some())
            .field("conversion_from", &self.conversion_from.is_some())
            .field("conversion_to", &self.conversion_to.is_some())
            .finish()
    }
}

/// The identity and native payload kind of a capsule type.
#[derive(Debug)]
pub struct CapsuleType {
    id: u64,
    name: String,
    native: TypeId,
    native_name: &'static str,
    ops: CapsuleOps,
}

impl CapsuleType {
    pub(crate) fn new<T: Any + Send + Sync>(name: String, ops: CapsuleOps) -> Self {
        if ops.equals.is_some() && ops.raw_equals.is_none() {
            panic!("capsule type {name:?} defines equals without raw_equals");
        }
        Self {
            id: NEXT_CAPSULE_ID.fetch_add(1, Ordering::Relaxed),
            name,
            native: TypeId::of::<T>(),
            native_name: std::any::type_name::<T>(),
            ops,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native_type_id(&self) -> TypeId {
        self.native
    }

    pub fn native_type_name(&self) -> &'static str {
        self.native_name
    }

    pub fn ops(&self) -> &CapsuleOps {
        &self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Handle(u32);

    #[test]
    #[should_panic(expected = "equals without raw_equals")]
    fn equals_requires_raw_equals() {
        let ops = CapsuleOps::new().with_equals::<Handle>(|a, b| Value::bool(a.0 == b.0));
        let _ = Type::capsule_with_ops::<Handle>("handle", ops);
    }

    #[test]
    fn defaults_use_identity() {
        let ops = CapsuleOps::new();
        let a: Arc<dyn Any + Send + Sync> = Arc::new(Handle(1));
        let b: Arc<dyn Any + Send + Sync> = Arc::new(Handle(1));
        assert!(ops.raw_equals(&a, &a.clone()));
        assert!(!ops.raw_equals(&a, &b));
        assert_eq!(ops.render("handle", a.as_ref()), "capsule value of handle");
        assert_eq!(ops.hash_key(a.as_ref()), None);
    }

    #[test]
    fn custom_operations_see_native_payloads() {
        let ops = CapsuleOps::new()
            .with_raw_equals::<Handle>(|a, b| a.0 == b.0)
            .with_render::<Handle>(|h| format!("handle #{}", h.0))
            .with_hash_key::<Handle>(|h| h.0.to_string());
        let a: Arc<dyn Any + Send + Sync> = Arc::new(Handle(7));
        let b: Arc<dyn Any + Send + Sync> = Arc::new(Handle(7));
        assert!(ops.raw_equals(&a, &b));
        assert_eq!(ops.render("handle", a.as_ref()), "handle #7");
        assert_eq!(ops.hash_key(b.as_ref()).as_deref(), Some("7"));
        assert!(ops.has_custom_equality());
    }
}
