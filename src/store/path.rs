use std::fmt;

use serde_json::{Map, Value};

/// Location of a field inside a document, one segment per nesting level.
/// Segments may contain any character, dots included; the dotted form is
/// only used for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Sets `value` at `path`, creating missing parents. A parent that exists but
/// is not an object is replaced by one. An empty path replaces the document.
pub fn set_path(document: &mut Value, path: &FieldPath, value: Value) {
    let Some((last, parents)) = path.0.split_last() else {
        *document = value;
        return;
    };

    let mut cursor = document;
    for segment in parents {
        cursor = as_object(cursor)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    as_object(cursor).insert(last.clone(), value);
}

/// Removes the field at `path`. Returns whether anything was removed; a
/// missing path is not an error.
pub fn remove_path(document: &mut Value, path: &FieldPath) -> bool {
    let Some((last, parents)) = path.0.split_last() else {
        return false;
    };

    let mut cursor = document;
    for segment in parents {
        match cursor.get_mut(segment.as_str()) {
            Some(next) => cursor = next,
            None => return false,
        }
    }

    cursor
        .as_object_mut()
        .map(|fields| fields.remove(last).is_some())
        .unwrap_or(false)
}

pub fn get_path<'a>(document: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.0
        .iter()
        .try_fold(document, |cursor, segment| cursor.get(segment.as_str()))
}

fn as_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(fields) => fields,
        _ => unreachable!("value was replaced by an object"),
    }
}
