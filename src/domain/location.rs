//! Addressable positions inside a JSON document
//!
//! A [`Location`] is the path from the document root to one element. It is
//! produced by the query resolver and later reused to read and rewrite the
//! same element, so it stores concrete member names and array indices only.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a [`Location`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => {
                f.write_str("['")?;
                for ch in key.chars() {
                    match ch {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        _ => write!(f, "{ch}")?,
                    }
                }
                f.write_str("']")
            }
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Path from the root to one element, e.g. `$['items'][0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location {
    segments: Vec<PathSegment>,
}

impl Location {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// New location one step below `self`.
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(PathSegment::Key(key.into()))
    }

    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    /// Element addressed by this location, if it still exists.
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |node, segment| match (segment, node) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            })
    }

    /// Mutable handle on the element addressed by this location.
    pub fn get_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Value> {
        self.segments
            .iter()
            .try_fold(document, |node, segment| match (segment, node) {
                (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
                _ => None,
            })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_normalized_path() {
        let location = Location::root().key("items").index(2).key("it's");
        assert_eq!(location.to_string(), "$['items'][2]['it\\'s']");
        assert_eq!(Location::root().to_string(), "$");
    }

    #[test]
    fn reads_and_writes_through_location() {
        let mut doc = json!({"items": [{"id": 1}, {"id": 2}]});
        let location = Location::root().key("items").index(1);

        assert_eq!(location.get(&doc), Some(&json!({"id": 2})));

        *location.get_mut(&mut doc).unwrap() = json!("replaced");
        assert_eq!(doc, json!({"items": [{"id": 1}, "replaced"]}));
    }

    #[test]
    fn missing_or_mismatched_segments_resolve_to_none() {
        let doc = json!({"items": [1]});
        assert!(Location::root().key("items").index(5).get(&doc).is_none());
        assert!(Location::root().index(0).get(&doc).is_none());
        assert!(Location::root().key("items").key("x").get(&doc).is_none());
    }

    #[test]
    fn serializes_as_segment_list() {
        let location = Location::root().key("a").index(3);
        let raw = serde_json::to_string(&location).unwrap();
        assert_eq!(raw, r#"["a",3]"#);
        let back: Location = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, location);
    }
}
