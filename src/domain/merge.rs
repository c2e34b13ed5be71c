//! Typed merge of handler results into the document
//!
//! | element \ result | Object        | Array   | Scalar  |
//! |------------------|---------------|---------|---------|
//! | Object           | shallow merge | reject  | reject  |
//! | Array            | reject        | replace | reject  |
//! | Scalar           | replace       | replace | replace |
//!
//! A shallow merge keeps the element's members in place, overwrites the ones
//! the result also carries, and appends new members in result order.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::location::Location;
use crate::error::{ScrapeError, ScrapeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemShape {
    Object,
    Array,
    Scalar,
}

impl ItemShape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Self::Scalar,
        }
    }
}

impl fmt::Display for ItemShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Scalar => "scalar",
        })
    }
}

/// How a result is folded into the element it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    ShallowMerge,
    Replace,
}

impl MergeRule {
    pub fn for_shapes(element: ItemShape, result: ItemShape) -> Option<Self> {
        match (element, result) {
            (ItemShape::Object, ItemShape::Object) => Some(Self::ShallowMerge),
            (ItemShape::Array, ItemShape::Array) | (ItemShape::Scalar, _) => Some(Self::Replace),
            _ => None,
        }
    }
}

/// Merge `result` into the element at `location` inside `document`.
///
/// Nothing is modified when the shapes are incompatible or the location no
/// longer resolves.
pub fn merge_at(document: &mut Value, location: &Location, result: Value) -> ScrapeResult<()> {
    let element = location
        .get_mut(document)
        .ok_or_else(|| ScrapeError::LocationMissing {
            location: location.clone(),
        })?;

    let element_shape = ItemShape::of(element);
    let result_shape = ItemShape::of(&result);
    let rule = MergeRule::for_shapes(element_shape, result_shape).ok_or_else(|| {
        ScrapeError::MergeRejected {
            location: location.clone(),
            element: element_shape,
            result: result_shape,
        }
    })?;

    match (rule, element, result) {
        (MergeRule::ShallowMerge, Value::Object(fields), Value::Object(update)) => {
            for (key, value) in update {
                fields.insert(key, value);
            }
        }
        (_, element, result) => *element = result,
    }
    Ok(())
}
