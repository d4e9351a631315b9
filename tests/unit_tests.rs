//! Unit tests for reqlsim.

use std::sync::Arc;

use reqlsim::binder::Scope;
use reqlsim::semantics::{
    distinct, max_by, merge_with, min_by, set_difference, set_insert, set_intersection, set_union,
    sort_by_fields, Bound, Direction, KeyRange,
};
use reqlsim::storage::{ConflictPolicy, Table, WriteReport};
use reqlsim::{Catalog, Datum, ErrorKind, Func, GroupResults, ReqlError};
use serde_json::json;

fn d(value: serde_json::Value) -> Datum {
    Datum::from(value)
}

fn seq(value: serde_json::Value) -> Vec<Datum> {
    d(value).into_sequence().expect("array")
}

fn identity(value: &Datum) -> reqlsim::Result<Option<Datum>> {
    Ok(Some(value.clone()))
}

// =============================================================================
// Error Tests
// =============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_error_display_carries_category() {
        let err = ReqlError::runtime("boom");
        assert_eq!(err.to_string(), "Runtime error: boom");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ReqlError::compile("x").kind(), ErrorKind::Compile);
        assert_eq!(ReqlError::runtime("x").kind(), ErrorKind::Runtime);
        assert_eq!(ReqlError::non_existence("x").kind(), ErrorKind::NonExistence);
        assert_eq!(ReqlError::NameNotBound("x".into()).kind(), ErrorKind::Compile);
    }

    #[test]
    fn test_non_existence_is_a_runtime_error() {
        assert!(ReqlError::non_existence("x").is_runtime());
        assert!(!ReqlError::compile("x").is_runtime());
    }
}

// =============================================================================
// Datum Tests
// =============================================================================

mod datum_tests {
    use super::*;

    #[test]
    fn test_type_order() {
        let ordered = [
            Datum::MinVal,
            Datum::Null,
            Datum::Bool(false),
            Datum::Number(-5.0),
            d(json!("a")),
            Datum::MaxVal,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_compound_keys_compare_componentwise() {
        assert!(d(json!(["one", 20])) < d(json!(["one", 30])));
        assert!(d(json!(["one", 99])) < d(json!(["two", 0])));
        assert!(d(json!(["one"])) < d(json!(["one", 0])));
    }

    #[test]
    fn test_time_json_round_trip() {
        let value = d(json!({"$reql_type$": "TIME", "epoch_time": 1_500_000_000, "timezone": "+00:00"}));
        assert!(matches!(value, Datum::Time(_)));
        assert_eq!(value.to_json()["epoch_time"], json!(1_500_000_000.0));
    }

    #[test]
    fn test_integral_numbers_emit_as_integers() {
        assert_eq!(Datum::from(3.0).to_json(), json!(3));
        assert_eq!(Datum::from(2.5).to_json(), json!(2.5));
    }

    #[test]
    fn test_get_field_missing_is_non_existence() {
        let err = d(json!({"a": 1})).get_field("b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonExistence);
    }

    #[test]
    fn test_getter_is_lenient() {
        assert_eq!(d(json!({"a": 1})).getter("b"), Datum::Null);
        assert_eq!(d(json!(5)).getter("b"), Datum::Null);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Datum::Null.is_truthy());
        assert!(!Datum::Bool(false).is_truthy());
        assert!(Datum::from(0).is_truthy());
        assert!(d(json!([])).is_truthy());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Datum::Null.type_name(), "NULL");
        assert_eq!(d(json!({})).type_name(), "OBJECT");
        assert_eq!(d(json!([])).type_name(), "ARRAY");
        assert_eq!(d(json!("s")).type_name(), "STRING");
    }
}

// =============================================================================
// Group Results Tests
// =============================================================================

mod group_tests {
    use super::*;

    #[test]
    fn test_push_keeps_key_order_and_member_order() {
        let mut groups = GroupResults::new();
        groups.push(Datum::from("b"), Datum::from(1));
        groups.push(Datum::from("a"), Datum::from(2));
        groups.push(Datum::from("b"), Datum::from(3));
        let keys: Vec<&Datum> = groups.keys().collect();
        assert_eq!(keys, vec![&Datum::from("b"), &Datum::from("a")]);
        assert_eq!(groups.get(&Datum::from("b")), Some(&d(json!([1, 3]))));
    }

    #[test]
    fn test_get_or_empty() {
        let groups = GroupResults::new();
        assert!(groups.is_empty());
        assert_eq!(groups.get_or_empty(&Datum::from("x")), d(json!([])));
    }

    #[test]
    fn test_try_map_values_preserves_keys() {
        let groups: GroupResults = vec![
            (Datum::from(1), d(json!([1, 2]))),
            (Datum::from(2), d(json!([3]))),
        ]
        .into_iter()
        .collect();
        let counted = groups
            .try_map_values(|v| Ok(Datum::from(v.into_sequence()?.len() as u64)))
            .unwrap();
        assert_eq!(
            counted.into_entries(),
            vec![(Datum::from(1), Datum::from(2)), (Datum::from(2), Datum::from(1))]
        );
    }
}

// =============================================================================
// Scope Tests
// =============================================================================

mod scope_tests {
    use super::*;

    #[test]
    fn test_child_shadows_parent() {
        let root = Scope::new().push(vec![("x".to_string(), Datum::from(1))]);
        let child = root.push(vec![("x".to_string(), Datum::from(2))]);
        assert_eq!(child.get("x").unwrap(), &Datum::from(2));
        assert_eq!(root.get("x").unwrap(), &Datum::from(1));
    }

    #[test]
    fn test_lookup_walks_parents() {
        let root = Scope::new().push(vec![("x".to_string(), Datum::from(1))]);
        let child = root.push(vec![("y".to_string(), Datum::from(2))]);
        assert_eq!(child.get("x").unwrap(), &Datum::from(1));
        assert!(child.contains("y"));
        assert!(!root.contains("y"));
    }

    #[test]
    fn test_unbound_name() {
        let err = Scope::new().get("nope").unwrap_err();
        assert_eq!(err, ReqlError::NameNotBound("nope".into()));
    }
}

// =============================================================================
// Semantics Tests
// =============================================================================

mod semantics_tests {
    use super::*;

    fn literal(value: serde_json::Value) -> Datum {
        Datum::Literal(Box::new(d(value)))
    }

    fn obj(value: serde_json::Value) -> reqlsim::Object {
        d(value).into_object().expect("object")
    }

    #[test]
    fn test_merge_deep() {
        let base = obj(json!({"a": {"x": 1, "y": 2}, "tags": ["p"]}));
        let merged = merge_with(&d(json!({"a": {"y": 3}, "tags": ["q"], "b": 1})), &base).unwrap();
        assert_eq!(
            Datum::Object(merged),
            d(json!({"a": {"x": 1, "y": 3}, "tags": ["p", "q"], "b": 1}))
        );
    }

    #[test]
    fn test_merge_literal_overrides() {
        let base = obj(json!({"a": {"x": 1, "y": 2}}));
        let ext = Datum::object([("a", literal(json!({"z": 9})))]);
        let merged = merge_with(&ext, &base).unwrap();
        assert_eq!(Datum::Object(merged), d(json!({"a": {"z": 9}})));
    }

    #[test]
    fn test_merge_rejects_nested_literal() {
        let inner = Datum::object([("b", literal(json!(1)))]);
        let ext = Datum::object([("a", Datum::Literal(Box::new(inner)))]);
        let err = merge_with(&ext, &obj(json!({}))).unwrap_err();
        assert_eq!(err, ReqlError::runtime("No nested r.literal()!"));
    }

    #[test]
    fn test_merge_requires_object() {
        assert!(merge_with(&Datum::from(1), &obj(json!({}))).is_err());
    }

    #[test]
    fn test_distinct_is_structural() {
        let out = distinct(seq(json!([[1, 2], [2, 1], {"a": 1}, {"a": 1}, 3, 3])));
        assert_eq!(out, seq(json!([[1, 2], {"a": 1}, 3])));
    }

    #[test]
    fn test_set_ops() {
        assert_eq!(set_insert(seq(json!([1, 2])), Datum::from(2)), seq(json!([1, 2])));
        assert_eq!(set_insert(seq(json!([1, 2])), Datum::from(3)), seq(json!([1, 2, 3])));
        assert_eq!(set_union(seq(json!([1, 2])), seq(json!([2, 3]))), seq(json!([1, 2, 3])));
        assert_eq!(set_intersection(seq(json!([1, 2, 3])), &seq(json!([2, 3, 4]))), seq(json!([2, 3])));
        assert_eq!(set_difference(seq(json!([1, 2, 3])), &seq(json!([2]))), seq(json!([1, 3])));
    }

    #[test]
    fn test_min_max_skip_missing_keys() {
        let rows = seq(json!([{"v": 3}, {"w": 1}, {"v": 1}]));
        let key = |row: &Datum| -> reqlsim::Result<Option<Datum>> {
            Ok(row.as_object().and_then(|o| o.get("v")).cloned())
        };
        assert_eq!(min_by(rows.clone(), key).unwrap(), d(json!({"v": 1})));
        assert_eq!(max_by(rows, key).unwrap(), d(json!({"v": 3})));
    }

    #[test]
    fn test_min_ties_keep_first() {
        let rows = seq(json!([{"id": 1, "v": 1}, {"id": 2, "v": 1}]));
        let key = |row: &Datum| -> reqlsim::Result<Option<Datum>> { Ok(Some(row.getter("v"))) };
        assert_eq!(min_by(rows.clone(), key).unwrap().getter("id"), Datum::from(1));
        assert_eq!(max_by(rows, key).unwrap().getter("id"), Datum::from(1));
    }

    #[test]
    fn test_min_of_empty_stream() {
        let err = min_by(Vec::new(), identity).unwrap_err();
        assert_eq!(err.message(), "Cannot take the min of an empty stream.");
    }

    #[test]
    fn test_key_range_bounds() {
        let range = KeyRange::new(Datum::from("bob"), Datum::from("tom"));
        assert!(range.contains(&Datum::from("bob")));
        assert!(range.contains(&Datum::from("joe")));
        assert!(!range.contains(&Datum::from("tom")));

        let range = range
            .with_left_bound(Bound::Open)
            .with_right_bound(Bound::Closed);
        assert!(!range.contains(&Datum::from("bob")));
        assert!(range.contains(&Datum::from("tom")));
    }

    #[test]
    fn test_key_range_sentinels() {
        let range = KeyRange::new(Datum::MinVal, Datum::MaxVal);
        assert!(range.contains(&Datum::Null));
        assert!(range.contains(&Datum::from("zuul")));
        assert!(range.contains(&d(json!(["one", 20]))));
    }

    #[test]
    fn test_bound_parse_rejects_unknown() {
        assert!(Bound::parse("half").is_err());
    }

    #[test]
    fn test_sort_by_fields_stable_and_directional() {
        let rows = seq(json!([
            {"id": 1, "a": 2, "b": 1},
            {"id": 2, "a": 1, "b": 1},
            {"id": 3, "a": 2, "b": 0},
            {"id": 4, "a": 1, "b": 1}
        ]));
        let sorted = sort_by_fields(rows, &[("a", Direction::Desc), ("b", Direction::Asc)]);
        let ids: Vec<Datum> = sorted.iter().map(|r| r.getter("id")).collect();
        assert_eq!(ids, seq(json!([3, 1, 2, 4])));
    }
}

// =============================================================================
// Storage Tests
// =============================================================================

mod storage_tests {
    use super::*;

    fn table() -> Table {
        Table::with_rows("t", seq(json!([{"id": 1, "x": 1}, {"id": 2, "x": 2}]))).unwrap()
    }

    #[test]
    fn test_with_rows_rejects_duplicate_ids() {
        assert!(Table::with_rows("t", seq(json!([{"id": 1}, {"id": 1}]))).is_err());
    }

    #[test]
    fn test_insert_update_policy() {
        let (next, report) = table()
            .insert(seq(json!([{"id": 1, "x": 2}])), ConflictPolicy::Update)
            .unwrap();
        assert_eq!(next.get(&Datum::from(1)), Some(&d(json!({"id": 1, "x": 2}))));
        assert_eq!(report.replaced, 1);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].old_val, d(json!({"id": 1, "x": 1})));
    }

    #[test]
    fn test_insert_error_policy_leaves_row() {
        let (next, report) = table()
            .insert(seq(json!([{"id": 1, "x": 2}])), ConflictPolicy::Error)
            .unwrap();
        assert_eq!(next.get(&Datum::from(1)), Some(&d(json!({"id": 1, "x": 1}))));
        assert_eq!(report.errors, 1);
        assert!(report.changes.is_empty());
    }

    #[test]
    fn test_insert_replace_policy_drops_old_fields() {
        let (next, _) = table()
            .insert(seq(json!([{"id": 2, "y": 9}])), ConflictPolicy::Replace)
            .unwrap();
        assert_eq!(next.get(&Datum::from(2)), Some(&d(json!({"id": 2, "y": 9}))));
    }

    #[test]
    fn test_insert_order_untouched_then_touched() {
        let (next, _) = table()
            .insert(seq(json!([{"id": 3}, {"id": 1, "x": 5}])), ConflictPolicy::Update)
            .unwrap();
        let ids: Vec<Datum> = next.rows().iter().map(|r| r.getter("id")).collect();
        assert_eq!(ids, seq(json!([2, 3, 1])));
    }

    #[test]
    fn test_insert_generates_keys() {
        let (next, report) = table()
            .insert(seq(json!([{"name": "new"}])), ConflictPolicy::Error)
            .unwrap();
        assert_eq!(report.generated_keys.len(), 1);
        let key = Datum::from(report.generated_keys[0].clone());
        assert!(next.get(&key).is_some());
    }

    #[test]
    fn test_insert_is_persistent() {
        let before = table();
        let (_, _) = before
            .insert(seq(json!([{"id": 9}])), ConflictPolicy::Error)
            .unwrap();
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn test_conflict_policy_parse() {
        assert_eq!(ConflictPolicy::parse("update").unwrap(), ConflictPolicy::Update);
        assert!(ConflictPolicy::parse("merge").is_err());
    }

    #[test]
    fn test_remove_by_id() {
        let (next, report) = table().remove_by_id(&[Datum::from(1), Datum::from(7)]);
        assert_eq!(report.deleted, 1);
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_missing_index_is_compile_error() {
        let err = table().index("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compile);
    }

    #[test]
    fn test_index_lifecycle() {
        let t = table()
            .create_index("x", Arc::new(Func::field("x")), false)
            .unwrap();
        assert!(t.create_index("x", Arc::new(Func::field("x")), false).is_err());
        let t = t.rename_index("x", "y").unwrap();
        assert_eq!(t.list_indexes(), vec!["y".to_string()]);
        let t = t.drop_index("y").unwrap();
        assert!(t.list_indexes().is_empty());
        assert!(t.drop_index("y").is_err());
    }

    #[test]
    fn test_report_merge() {
        let mut a = WriteReport {
            inserted: 1,
            ..WriteReport::default()
        };
        a.merge(WriteReport {
            inserted: 2,
            deleted: 1,
            ..WriteReport::default()
        });
        assert_eq!(a.inserted, 3);
        assert_eq!(a.deleted, 1);
    }
}

// =============================================================================
// Catalog Tests
// =============================================================================

mod catalog_tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_json(&json!({
            "databases": {
                "test": {
                    "tables": {
                        "people": [{"id": "joe"}],
                        "scores": {
                            "rows": [{"id": 1, "team": "one", "score": 20}],
                            "indexes": {"team_score": ["team", "score"], "tags": {"field": "tags", "multi": true}}
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_from_json_loads_tables_and_indexes() {
        let catalog = catalog();
        assert_eq!(catalog.list_dbs(), vec!["test".to_string()]);
        let scores = catalog.table("test", "scores").unwrap();
        assert_eq!(scores.list_indexes(), vec!["tags".to_string(), "team_score".to_string()]);
        assert!(scores.index("tags").unwrap().multi);
    }

    #[test]
    fn test_from_json_rejects_bad_shape() {
        assert!(Catalog::from_json(&json!({"tables": []})).is_err());
    }

    #[test]
    fn test_missing_table_message() {
        let err = catalog().table("test", "nope").unwrap_err();
        assert_eq!(err.message(), "Table `test.nope` does not exist.");
    }

    #[test]
    fn test_create_and_drop_db_are_persistent() {
        let before = catalog();
        let after = before.create_db("other").unwrap();
        assert!(after.db_exists("other"));
        assert!(!before.db_exists("other"));
        assert!(after.create_db("other").is_err());
        let dropped = after.drop_db("other").unwrap();
        assert!(!dropped.db_exists("other"));
        assert!(dropped.drop_db("other").is_err());
    }

    #[test]
    fn test_create_table() {
        let db = catalog().db("test").unwrap().create_table("new").unwrap();
        assert!(db.table_exists("new"));
        assert!(db.create_table("new").is_err());
    }
}
