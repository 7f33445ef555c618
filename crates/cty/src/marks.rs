//! Marks: opaque annotations that ride along with values through every
//! operation without affecting the value's meaning.

use std::fmt;
use std::sync::Arc;

use im::OrdSet;

use crate::value::Payload;
use crate::{Path, PathStep, Value};

/// An opaque, orderable annotation such as "sensitive".
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark(Arc<str>);

impl Mark {
    pub fn new(name: impl AsRef<str>) -> Self {
        Mark(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of marks carried by one value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ValueMarks(OrdSet<Mark>);

impl ValueMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, mark: &Mark) -> bool {
        self.0.contains(mark)
    }

    pub fn insert(&mut self, mark: Mark) {
        self.0.insert(mark);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.0.iter()
    }

    pub fn union(&self, other: &ValueMarks) -> ValueMarks {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        ValueMarks(self.0.clone().union(other.0.clone()))
    }
}

impl Extend<Mark> for ValueMarks {
    fn extend<I: IntoIterator<Item = Mark>>(&mut self, iter: I) {
        for mark in iter {
            self.0.insert(mark);
        }
    }
}

impl FromIterator<Mark> for ValueMarks {
    fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
        let mut marks = ValueMarks::new();
        marks.extend(iter);
        marks
    }
}

impl IntoIterator for ValueMarks {
    type Item = Mark;
    type IntoIter = std::vec::IntoIter<Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter().collect::<Vec<_>>().into_iter()
    }
}

impl fmt::Debug for ValueMarks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

/// Marks found at one location inside a value.
#[derive(Clone, Debug, PartialEq)]
pub struct PathValueMarks {
    pub path: Path,
    pub marks: ValueMarks,
}

impl Value {
    /// This value with `mark` added.
    pub fn mark(mut self, mark: Mark) -> Value {
        self.marks.insert(mark);
        self
    }

    /// This value with every mark in `marks` added.
    pub fn with_marks(mut self, marks: impl IntoIterator<Item = Mark>) -> Value {
        self.marks.extend(marks);
        self
    }

    /// This value carrying the same top-level marks as `other` as well.
    pub fn with_same_marks(self, other: &Value) -> Value {
        let marks = other.marks.clone();
        self.with_marks(marks)
    }

    pub fn marks(&self) -> &ValueMarks {
        &self.marks
    }

    pub fn is_marked(&self) -> bool {
        !self.marks.is_empty()
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }

    /// Strips top-level marks. Nested values keep theirs.
    pub fn unmark(mut self) -> (Value, ValueMarks) {
        let marks = std::mem::take(&mut self.marks);
        (self, marks)
    }

    /// Whether this value or anything nested inside it is marked.
    pub fn contains_marked(&self) -> bool {
        if self.is_marked() {
            return true;
        }
        match &self.payload {
            Payload::Seq(elems) => elems.iter().any(Value::contains_marked),
            Payload::Attrs(attrs) => attrs.values().any(Value::contains_marked),
            Payload::Union(_, inner) => inner.contains_marked(),
            _ => false,
        }
    }

    /// Strips marks at every level, returning their union.
    pub fn unmark_deep(self) -> (Value, ValueMarks) {
        let (value, paths) = self.unmark_deep_with_paths();
        let marks = paths.into_iter().flat_map(|pvm| pvm.marks).collect();
        (value, marks)
    }

    /// Strips marks at every level, recording where each set of marks was.
    pub fn unmark_deep_with_paths(self) -> (Value, Vec<PathValueMarks>) {
        let mut found = Vec::new();
        let mut path = Path::root();
        let value = self.unmark_into(&mut path, &mut found);
        (value, found)
    }

    fn unmark_into(self, path: &mut Path, found: &mut Vec<PathValueMarks>) -> Value {
        let (mut value, marks) = self.unmark();
        if !marks.is_empty() {
            found.push(PathValueMarks {
                path: path.clone(),
                marks,
            });
        }
        if !value.contains_marked() {
            return value;
        }
        value.payload = match value.payload {
            Payload::Seq(elems) => Payload::Seq(Arc::new(
                elems
                    .iter()
                    .enumerate()
                    .map(|(i, elem)| {
                        path.push(PathStep::Index(Value::number_uint(i as u64)));
                        let elem = elem.clone().unmark_into(path, found);
                        path.pop();
                        elem
                    })
                    .collect(),
            )),
            Payload::Attrs(attrs) => {
                let is_object = value.ty.is_object_type();
                Payload::Attrs(Arc::new(
                    attrs
                        .iter()
                        .map(|(key, elem)| {
                            path.push(if is_object {
                                PathStep::GetAttr(key.clone())
                            } else {
                                PathStep::Index(Value::string(key))
                            });
                            let elem = elem.clone().unmark_into(path, found);
                            path.pop();
                            (key.clone(), elem)
                        })
                        .collect(),
                ))
            }
            Payload::Union(variant, inner) => {
                path.push(PathStep::GetAttr(variant.to_string()));
                let inner = (*inner).clone().unmark_into(path, found);
                path.pop();
                Payload::Union(variant, Arc::new(inner))
            }
            other => other,
        };
        value
    }

    /// Re-applies marks previously collected by
    /// [`Value::unmark_deep_with_paths`]. Paths that no longer lead anywhere
    /// are ignored.
    pub fn mark_with_paths(self, marks: &[PathValueMarks]) -> Value {
        marks
            .iter()
            .fold(self, |value, pvm| value.mark_at(pvm.path.steps(), &pvm.marks))
    }

    fn mark_at(self, steps: &[PathStep], marks: &ValueMarks) -> Value {
        let Some((step, rest)) = steps.split_first() else {
            return self.with_marks(marks.clone());
        };
        let Value {
            ty,
            payload,
            marks: own,
        } = self;
        let payload = match (payload, step) {
            (Payload::Seq(elems), PathStep::Index(key)) if key.is_known() && !key.is_null() => {
                let index = key
                    .as_number_unmarked()
                    .and_then(|n| n.to_u64())
                    .map(|i| i as usize);
                match index {
                    Some(i) if i < elems.len() => {
                        let mut elems = (*elems).clone();
                        elems[i] = elems[i].clone().mark_at(rest, marks);
                        Payload::Seq(Arc::new(elems))
                    }
                    _ => Payload::Seq(elems),
                }
            }
            (Payload::Attrs(attrs), step) => {
                let key = match step {
                    PathStep::GetAttr(name) if ty.is_object_type() => Some(name.clone()),
                    PathStep::Index(key) if ty.is_map_type() => key.as_string_unmarked(),
                    _ => None,
                };
                match key {
                    Some(key) if attrs.contains_key(&key) => {
                        let mut attrs = (*attrs).clone();
                        if let Some(elem) = attrs.remove(&key) {
                            attrs.insert(key, elem.mark_at(rest, marks));
                        }
                        Payload::Attrs(Arc::new(attrs))
                    }
                    _ => Payload::Attrs(attrs),
                }
            }
            (Payload::Union(variant, inner), PathStep::GetAttr(name)) if &*variant == name.as_str() => {
                let inner = (*inner).clone().mark_at(rest, marks);
                Payload::Union(variant, Arc::new(inner))
            }
            (payload, _) => payload,
        };
        Value {
            ty,
            payload,
            marks: own,
        }
    }
}
