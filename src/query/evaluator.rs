//! Evaluates a parsed query into document locations
//!
//! Nodes are visited in document order: array elements by index, object
//! members in stored order, descendants pre-order (a node before its
//! children). The same location reached twice is reported once, at its
//! first position.

use std::collections::HashSet;

use serde_json::Value;

use super::ast::{JsonPath, Segment, Selector, resolve_index, slice_positions};
use crate::domain::location::Location;
use crate::domain::progress::Selection;

type Node<'v> = (Location, &'v Value);

pub fn evaluate(path: &JsonPath, document: &Value) -> Selection {
    let mut nodes: Vec<Node<'_>> = vec![(Location::root(), document)];

    for segment in &path.segments {
        let mut next = Vec::new();
        for (location, value) in &nodes {
            let value = *value;
            match segment {
                Segment::Child(selector) => select_children(selector, location, value, &mut next),
                Segment::Descendant(selector) => descend(selector, location, value, &mut next),
            }
        }
        nodes = next;
    }

    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .into_iter()
        .filter_map(|(location, _)| seen.insert(location.clone()).then_some(location))
        .collect()
}

fn descend<'v>(selector: &Selector, location: &Location, value: &'v Value, out: &mut Vec<Node<'v>>) {
    select_children(selector, location, value, out);
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                descend(selector, &location.index(i), item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                descend(selector, &location.key(key.as_str()), item, out);
            }
        }
        _ => {}
    }
}

fn select_children<'v>(
    selector: &Selector,
    location: &Location,
    value: &'v Value,
    out: &mut Vec<Node<'v>>,
) {
    match (selector, value) {
        (Selector::Name(name), Value::Object(map)) => {
            if let Some(child) = map.get(name) {
                out.push((location.key(name.as_str()), child));
            }
        }
        (Selector::Index(index), Value::Array(items)) => {
            if let Some(i) = resolve_index(*index, items.len()) {
                out.push((location.index(i), &items[i]));
            }
        }
        (Selector::Slice { start, end, step }, Value::Array(items)) => {
            for i in slice_positions(*start, *end, *step, items.len()) {
                out.push((location.index(i), &items[i]));
            }
        }
        (Selector::Wildcard, _) => children(location, value).for_each(|node| out.push(node)),
        (Selector::Filter(filter), _) => children(location, value)
            .filter(|(_, child)| filter.matches(child))
            .for_each(|node| out.push(node)),
        (Selector::Union(selectors), _) => {
            for selector in selectors {
                select_children(selector, location, value, out);
            }
        }
        _ => {}
    }
}

fn children<'a, 'v>(
    location: &'a Location,
    value: &'v Value,
) -> Box<dyn Iterator<Item = Node<'v>> + 'a>
where
    'v: 'a,
{
    match value {
        Value::Array(items) => Box::new(
            items
                .iter()
                .enumerate()
                .map(move |(i, item)| (location.index(i), item)),
        ),
        Value::Object(map) => Box::new(
            map.iter()
                .map(move |(key, item)| (location.key(key.as_str()), item)),
        ),
        _ => Box::new(std::iter::empty()),
    }
}
