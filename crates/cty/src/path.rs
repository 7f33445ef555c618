//! Paths: step-by-step addresses of values nested within other values.

use std::fmt;
use std::hash::{Hash, Hasher};

use cty_set::{Rules, Set};
use rustc_hash::FxHasher;

use crate::value::set_rules::hash_value;
use crate::{PathError, Type, Value};

/// One step of a [`Path`].
#[derive(Clone, Debug, PartialEq)]
pub enum PathStep {
    /// An object attribute, or a union variant.
    GetAttr(String),
    /// A list or tuple index (a number) or a map key (a string). Steps
    /// into sets use the element itself, which may be unknown.
    Index(Value),
}

impl PathStep {
    /// The value this step leads to from `value`.
    fn apply(&self, value: &Value) -> Result<Value, String> {
        match self {
            PathStep::GetAttr(name) => {
                if value.is_null() {
                    return Err("attempt to access attribute of null value".to_string());
                }
                let ty = value.ty();
                if !ty.is_object_type() && !ty.is_union_type() {
                    return Err("not an object type".to_string());
                }
                let known = match ty {
                    Type::Union(union) => union.variants.contains_key(name),
                    _ => ty.has_attribute(name),
                };
                if !known {
                    return Err(format!("object has no attribute {name:?}"));
                }
                Ok(value.get_attr(name))
            }
            PathStep::Index(key) => {
                if value.is_null() {
                    return Err("cannot index a null value".to_string());
                }
                let ty = value.ty();
                match key.ty() {
                    Type::Number if ty.is_list_type() || ty.is_tuple_type() => {}
                    Type::Number => return Err("not a list type".to_string()),
                    Type::String if ty.is_map_type() => {}
                    Type::String => return Err("not a map type".to_string()),
                    _ => return Err("key value not number or string".to_string()),
                }
                let (has, _) = value.has_index(key).unmark();
                if !has.is_known() {
                    return Ok(value.index(key));
                }
                if !has.is_true() {
                    return Err("value does not have given index key".to_string());
                }
                Ok(value.index(key))
            }
        }
    }

    fn equals(&self, other: &PathStep) -> bool {
        match (self, other) {
            (PathStep::GetAttr(a), PathStep::GetAttr(b)) => a == b,
            (PathStep::Index(a), PathStep::Index(b)) => a.raw_equals(b),
            _ => false,
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::GetAttr(name) => write!(f, ".{name}"),
            PathStep::Index(key) => {
                let (key, _) = key.clone().unmark();
                if !key.is_known() {
                    f.write_str("[?]")
                } else if key.is_null() {
                    f.write_str("[null]")
                } else if key.ty() == &Type::String {
                    write!(f, "[{:?}]", key.as_string())
                } else if key.ty() == &Type::Number {
                    write!(f, "[{}]", key.as_number())
                } else {
                    write!(f, "[{key:?}]")
                }
            }
        }
    }
}

/// A sequence of steps from some root value to a value nested within it.
/// The empty path addresses the root itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path(Vec<PathStep>);

impl Path {
    pub fn root() -> Path {
        Path(Vec::new())
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, step: PathStep) {
        self.0.push(step);
    }

    pub fn pop(&mut self) -> Option<PathStep> {
        self.0.pop()
    }

    /// A copy of this path extended by `step`.
    pub fn with_step(&self, step: PathStep) -> Path {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(step);
        Path(steps)
    }

    pub fn get_attr(&self, name: impl Into<String>) -> Path {
        self.with_step(PathStep::GetAttr(name.into()))
    }

    pub fn index(&self, key: Value) -> Path {
        self.with_step(PathStep::Index(key))
    }

    pub fn index_int(&self, index: i64) -> Path {
        self.index(Value::number_int(index))
    }

    pub fn index_string(&self, key: impl AsRef<str>) -> Path {
        self.index(Value::string(key))
    }

    pub fn last_step(&self) -> Option<&PathStep> {
        self.0.last()
    }

    /// Follows every step from `value`. The error locates the step that
    /// failed.
    pub fn apply(&self, value: &Value) -> Result<Value, PathError> {
        let mut current = value.clone();
        for (i, step) in self.0.iter().enumerate() {
            current = step.apply(&current).map_err(|message| {
                PathError::new(Path(self.0[..i].to_vec()), format!("at step {i}: {message}"))
            })?;
        }
        Ok(current)
    }

    /// Whether both paths have the same steps, comparing index keys with
    /// [`Value::raw_equals`].
    pub fn equals(&self, other: &Path) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a.equals(b))
    }

    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.0.len() <= self.0.len()
            && self.0.iter().zip(&prefix.0).all(|(a, b)| a.equals(b))
    }

    pub fn new_error(&self, message: impl Into<String>) -> PathError {
        PathError::new(self.clone(), message)
    }

    /// Like [`Path::new_error`], taking `format_args!` output.
    pub fn new_errorf(&self, args: fmt::Arguments<'_>) -> PathError {
        PathError::new(self.clone(), args.to_string())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl FromIterator<PathStep> for Path {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct PathRules;

impl Rules<Path> for PathRules {
    fn hash(&self, path: &Path) -> u64 {
        let mut hasher = FxHasher::default();
        for step in &path.0 {
            match step {
                PathStep::GetAttr(name) => {
                    hasher.write_u8(0);
                    name.hash(&mut hasher);
                }
                PathStep::Index(key) => {
                    hasher.write_u8(1);
                    hasher.write_u64(hash_value(key));
                }
            }
        }
        hasher.finish()
    }

    fn equivalent(&self, a: &Path, b: &Path) -> bool {
        a.equals(b)
    }

    fn same_rules(&self, _: &Self) -> bool {
        true
    }
}

/// A set of distinct paths.
#[derive(Clone, Debug)]
pub struct PathSet(Set<Path, PathRules>);

impl Default for PathSet {
    fn default() -> Self {
        PathSet::new()
    }
}

impl PathSet {
    pub fn new() -> PathSet {
        PathSet(Set::new(PathRules))
    }

    pub fn from_paths(paths: impl IntoIterator<Item = Path>) -> PathSet {
        PathSet(Set::from_values(PathRules, paths))
    }

    pub fn add(&mut self, path: Path) -> bool {
        self.0.add(path)
    }

    /// Adds `path` and every prefix of it, including the root.
    pub fn add_all_steps(&mut self, path: &Path) {
        for len in 0..=path.len() {
            self.0.add(Path(path.0[..len].to_vec()));
        }
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.0.remove(path).is_some()
    }

    pub fn has(&self, path: &Path) -> bool {
        self.0.has(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn list(&self) -> Vec<Path> {
        self.0.to_vec()
    }

    pub fn union(&self, other: &PathSet) -> PathSet {
        PathSet(self.0.union(&other.0))
    }

    pub fn intersection(&self, other: &PathSet) -> PathSet {
        PathSet(self.0.intersection(&other.0))
    }

    pub fn subtract(&self, other: &PathSet) -> PathSet {
        PathSet(self.0.subtract(&other.0))
    }

    pub fn symmetric_difference(&self, other: &PathSet) -> PathSet {
        PathSet(self.0.symmetric_difference(&other.0))
    }

    /// Whether both sets hold the same paths.
    pub fn equal(&self, other: &PathSet) -> bool {
        self.len() == other.len() && self.0.iter().all(|path| other.has(path))
    }
}
