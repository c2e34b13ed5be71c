//! Parsed representation of a selection query

use std::cmp::Ordering;

use serde_json::Value;

/// A parsed query: `$` followed by segments applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name`, `[...]`: selector applied to the children of each node.
    Child(Selector),
    /// `..name`, `..[...]`: selector applied to each node and all its descendants.
    Descendant(Selector),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Name(String),
    Index(i64),
    Wildcard,
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: i64,
    },
    Union(Vec<Selector>),
    Filter(Filter),
}

/// `?(@.rel.path)` or `?(@.rel.path OP literal)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub path: Vec<RelativeStep>,
    pub comparison: Option<(CompareOp, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelativeStep {
    Name(String),
    Index(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Filter {
    /// Whether `candidate` passes the filter.
    pub fn matches(&self, candidate: &Value) -> bool {
        let target = self.path.iter().try_fold(candidate, |node, step| match (step, node) {
            (RelativeStep::Name(name), Value::Object(map)) => map.get(name),
            (RelativeStep::Index(index), Value::Array(items)) => {
                resolve_index(*index, items.len()).and_then(|i| items.get(i))
            }
            _ => None,
        });

        match (&self.comparison, target) {
            (None, found) => found.is_some(),
            (Some((CompareOp::Ne, _)), None) => true,
            (Some(_), None) => false,
            (Some((op, literal)), Some(value)) => compare(*op, value, literal),
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let equal = match ordering {
        Some(ord) => ord == Ordering::Equal,
        None => left == right,
    };

    match op {
        CompareOp::Eq => equal,
        CompareOp::Ne => !equal,
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Le => ordering.is_some_and(|o| o != Ordering::Greater),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Ge => ordering.is_some_and(|o| o != Ordering::Less),
    }
}

/// Turn a possibly negative index into a position inside `len` items.
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let position = if index < 0 { len + index } else { index };
    if (0..len).contains(&position) {
        usize::try_from(position).ok()
    } else {
        None
    }
}

/// Array positions selected by `[start:end:step]` (positive step only).
pub fn slice_positions(start: Option<i64>, end: Option<i64>, step: i64, len: usize) -> Vec<usize> {
    let Ok(len) = i64::try_from(len) else {
        return Vec::new();
    };
    let clamp = |bound: i64| {
        if bound < 0 {
            (len + bound).max(0)
        } else {
            bound.min(len)
        }
    };
    let start = start.map_or(0, clamp);
    let end = end.map_or(len, clamp);
    let step = usize::try_from(step.max(1)).unwrap_or(1);

    (start..end)
        .step_by(step)
        .filter_map(|i| usize::try_from(i).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn negative_indices_count_from_end() {
        assert_eq!(resolve_index(-1, 3), Some(2));
        assert_eq!(resolve_index(-3, 3), Some(0));
        assert_eq!(resolve_index(-4, 3), None);
        assert_eq!(resolve_index(3, 3), None);
    }

    #[test]
    fn slices_follow_python_bounds() {
        assert_eq!(slice_positions(None, None, 1, 4), vec![0, 1, 2, 3]);
        assert_eq!(slice_positions(Some(1), Some(3), 1, 4), vec![1, 2]);
        assert_eq!(slice_positions(Some(-2), None, 1, 4), vec![2, 3]);
        assert_eq!(slice_positions(None, Some(10), 2, 5), vec![0, 2, 4]);
        assert!(slice_positions(Some(3), Some(1), 1, 5).is_empty());
    }

    #[test]
    fn filter_comparisons() {
        let price_lt_10 = Filter {
            path: vec![RelativeStep::Name("price".into())],
            comparison: Some((CompareOp::Lt, json!(10))),
        };
        assert!(price_lt_10.matches(&json!({"price": 8.5})));
        assert!(!price_lt_10.matches(&json!({"price": 12})));
        assert!(!price_lt_10.matches(&json!({"price": "8"})));
        assert!(!price_lt_10.matches(&json!({})));

        let status_ne = Filter {
            path: vec![RelativeStep::Name("status".into())],
            comparison: Some((CompareOp::Ne, json!("done"))),
        };
        assert!(status_ne.matches(&json!({"status": "todo"})));
        assert!(status_ne.matches(&json!({})));
        assert!(!status_ne.matches(&json!({"status": "done"})));
    }
}
