//! Path query resolver (JSONPath subset)
//!
//! Supports:
//! - `$.store.book` / `$['store']['book']`: child members
//! - `$.store.book[0]`, `$.store.book[-1]`: array index, negative from the end
//! - `$.store.book[0:3]`, `[::2]`: array slices
//! - `$.store.book[*]`, `$.store.*`: wildcard
//! - `$.store.book[0,2]`, `['a','b']`: unions
//! - `$..price`: recursive descent
//! - `$.store.book[?(@.price < 10)]`, `[?(@.isbn)]`: filters
//!
//! Resolution returns [`Location`](crate::domain::Location)s rather than
//! values so that the runner can write results back to the same place.

pub mod ast;
pub mod evaluator;
pub mod parser;

use serde_json::Value;
use thiserror::Error;

pub use ast::JsonPath;
pub use parser::parse;

use crate::domain::progress::Selection;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("'{query}' at position {position}: {reason}")]
    Syntax {
        query: String,
        position: usize,
        reason: String,
    },
}

/// Resolve `query` against `document` into an ordered selection.
///
/// A query that matches nothing yields an empty selection.
pub fn resolve(document: &Value, query: &str) -> Result<Selection, QueryError> {
    let path = parse(query)?;
    Ok(evaluator::evaluate(&path, document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Location;
    use proptest::prelude::*;
    use serde_json::json;

    fn rendered(selection: &Selection) -> Vec<String> {
        selection.iter().map(ToString::to_string).collect()
    }

    fn store() -> Value {
        json!({
            "store": {
                "book": [
                    {"title": "Sayings", "price": 8.95, "isbn": "0-553"},
                    {"title": "Sword", "price": 12.99},
                    {"title": "Moby", "price": 8.99, "isbn": "0-395"},
                    {"title": "Rings", "price": 22.99}
                ],
                "bicycle": {"color": "red", "price": 19.95}
            }
        })
    }

    #[test]
    fn wildcard_over_array_in_order() {
        let doc = json!({"items": [{"id": 1}, {"id": 2}, {"id": 3}]});
        let selection = resolve(&doc, "$.items[*]").unwrap();
        assert_eq!(
            rendered(&selection),
            vec!["$['items'][0]", "$['items'][1]", "$['items'][2]"]
        );
    }

    #[test]
    fn root_query_selects_whole_document() {
        let doc = json!([1, 2]);
        let selection = resolve(&doc, "$").unwrap();
        assert_eq!(selection.len(), 1);
        assert!(selection[0].is_root());
    }

    #[test]
    fn object_wildcard_follows_document_order() {
        let doc: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let selection = resolve(&doc, "$.*").unwrap();
        assert_eq!(rendered(&selection), vec!["$['z']", "$['a']", "$['m']"]);
    }

    #[test]
    fn recursive_descent_is_preorder() {
        let selection = resolve(&store(), "$..price").unwrap();
        assert_eq!(
            rendered(&selection),
            vec![
                "$['store']['book'][0]['price']",
                "$['store']['book'][1]['price']",
                "$['store']['book'][2]['price']",
                "$['store']['book'][3]['price']",
                "$['store']['bicycle']['price']",
            ]
        );
    }

    #[test]
    fn filters_select_matching_elements() {
        let cheap = resolve(&store(), "$.store.book[?(@.price < 10)]").unwrap();
        assert_eq!(
            rendered(&cheap),
            vec!["$['store']['book'][0]", "$['store']['book'][2]"]
        );

        let with_isbn = resolve(&store(), "$..book[?(@.isbn)].title").unwrap();
        assert_eq!(
            rendered(&with_isbn),
            vec!["$['store']['book'][0]['title']", "$['store']['book'][2]['title']"]
        );
    }

    #[test]
    fn negative_index_and_slice() {
        let doc = store();
        assert_eq!(
            rendered(&resolve(&doc, "$.store.book[-1]").unwrap()),
            vec!["$['store']['book'][3]"]
        );
        assert_eq!(
            rendered(&resolve(&doc, "$.store.book[1:3]").unwrap()),
            vec!["$['store']['book'][1]", "$['store']['book'][2]"]
        );
    }

    #[test]
    fn unions_keep_written_order_and_drop_duplicates() {
        let doc = json!({"items": ["a", "b", "c"]});
        let selection = resolve(&doc, "$.items[2,0,2]").unwrap();
        assert_eq!(rendered(&selection), vec!["$['items'][2]", "$['items'][0]"]);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let doc = json!({"items": []});
        assert!(resolve(&doc, "$.items[*]").unwrap().is_empty());
        assert!(resolve(&doc, "$.missing.deeper[0]").unwrap().is_empty());
    }

    #[test]
    fn syntax_error_fails_fast() {
        let doc = json!({});
        assert!(matches!(
            resolve(&doc, "$.items[*").unwrap_err(),
            QueryError::Syntax { .. }
        ));
    }

    #[test]
    fn locations_address_the_matched_values() {
        let doc = store();
        let selection = resolve(&doc, "$..title").unwrap();
        let titles: Vec<&Value> = selection.iter().filter_map(|l| l.get(&doc)).collect();
        assert_eq!(titles, vec!["Sayings", "Sword", "Moby", "Rings"]);
        assert_eq!(
            selection[0],
            Location::root().key("store").key("book").index(0).key("title")
        );
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                prop::collection::vec(("[a-c]{1,2}", inner), 0..5).prop_map(|pairs| {
                    Value::Object(pairs.into_iter().collect())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(
            doc in arb_json(),
            query in prop::sample::select(vec!["$", "$.*", "$..*", "$..a", "$.a[*]", "$..[0]", "$..b[-1:]"]),
        ) {
            let first = resolve(&doc, query).unwrap();
            let second = resolve(&doc, query).unwrap();
            prop_assert_eq!(&first, &second);

            let reparsed: Value = serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
            prop_assert_eq!(first, resolve(&reparsed, query).unwrap());
        }

        #[test]
        fn every_location_resolves(doc in arb_json()) {
            let selection = resolve(&doc, "$..*").unwrap();
            for location in &selection {
                prop_assert!(location.get(&doc).is_some());
            }
        }
    }
}
