use serde_json::json;
use sheetpipe::config::OccurrencePolicy;
use sheetpipe::project::{FlatRecord, ProjectOptions, project};

fn two_structure_payload() -> serde_json::Value {
    json!({
        "code": 200,
        "result": {
            "detail_structure": [
                {
                    "fields": {
                        "name": [{"value": "Alice"}],
                        "age": [{"value": "30"}]
                    }
                },
                {
                    "fields": {
                        "age": [{"value": "41"}]
                    }
                }
            ]
        }
    })
}

fn column<'a>(record: &'a FlatRecord, name: &str) -> &'a [Option<String>] {
    &record
        .columns
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .cells
}

#[test]
fn absent_field_yields_null_cell() {
    let projection = project(&two_structure_payload(), &ProjectOptions::default());
    let fields = projection.fields.expect("fields record");

    assert_eq!(column(&fields, "name"), &[Some("Alice".into()), None]);
    assert_eq!(column(&fields, "age"), &[Some("30".into()), Some("41".into())]);
}

#[test]
fn projection_is_deterministic() {
    let opts = ProjectOptions {
        field_order: vec!["name".into()],
        ..Default::default()
    };
    let a = project(&two_structure_payload(), &opts);
    let b = project(&two_structure_payload(), &opts);
    assert_eq!(a.fields, b.fields);
    assert_eq!(a.table_cells, b.table_cells);
}

#[test]
fn requested_keys_come_first_then_lexicographic() {
    let opts = ProjectOptions {
        field_order: vec!["name".into(), "missing_key".into()],
        ..Default::default()
    };
    let fields = project(&two_structure_payload(), &opts).fields.unwrap();
    // Requested-but-undiscovered keys are dropped; extras sort after.
    assert_eq!(fields.column_names(), vec!["name", "age"]);

    let fields = project(&two_structure_payload(), &ProjectOptions::default())
        .fields
        .unwrap();
    assert_eq!(fields.column_names(), vec!["age", "name"]);
}

#[test]
fn columns_always_have_equal_length() {
    for policy in [
        OccurrencePolicy::First,
        OccurrencePolicy::Last,
        OccurrencePolicy::All,
    ] {
        let opts = ProjectOptions {
            occurrence: policy,
            ..Default::default()
        };
        let fields = project(&two_structure_payload(), &opts).fields.unwrap();
        let rows = fields.row_count();
        for col in &fields.columns {
            assert_eq!(col.cells.len(), rows, "policy {policy:?}");
        }
    }
}

#[test]
fn occurrence_policy_selects_value() {
    let payload = json!({
        "code": 200,
        "result": {
            "detail_structure": [{
                "fields": {
                    "tag": [{"value": "first"}, {"value": "second"}],
                    "id": [{"value": "7"}]
                }
            }]
        }
    });

    let first = project(
        &payload,
        &ProjectOptions {
            occurrence: OccurrencePolicy::First,
            ..Default::default()
        },
    )
    .fields
    .unwrap();
    assert_eq!(column(&first, "tag"), &[Some("first".into())]);

    let last = project(
        &payload,
        &ProjectOptions {
            occurrence: OccurrencePolicy::Last,
            ..Default::default()
        },
    )
    .fields
    .unwrap();
    assert_eq!(column(&last, "tag"), &[Some("second".into())]);

    let all = project(
        &payload,
        &ProjectOptions {
            occurrence: OccurrencePolicy::All,
            ..Default::default()
        },
    )
    .fields
    .unwrap();
    assert_eq!(
        column(&all, "tag"),
        &[Some("first".into()), Some("second".into())]
    );
    // Shorter occurrence lists pad to the span with nulls.
    assert_eq!(column(&all, "id"), &[Some("7".into()), None]);
}

#[test]
fn table_cells_one_row_per_cell() {
    let payload = json!({
        "code": 200,
        "result": {
            "detail_structure": [{
                "tables_relationship": [{
                    "cells": [
                        {"province": {"value": "Hunan"}, "score": {"value": "610"}},
                        {"province": {"value": "Hubei"}, "kind": {"value": "arts"}}
                    ]
                }]
            }]
        }
    });

    let opts = ProjectOptions {
        table_order: vec!["province".into()],
        ..Default::default()
    };
    let cells = project(&payload, &opts).table_cells.unwrap();

    assert_eq!(cells.column_names(), vec!["province", "kind", "score"]);
    assert_eq!(
        column(&cells, "province"),
        &[Some("Hunan".into()), Some("Hubei".into())]
    );
    assert_eq!(column(&cells, "score"), &[Some("610".into()), None]);
    assert_eq!(column(&cells, "kind"), &[None, Some("arts".into())]);
}

#[test]
fn malformed_fields_yield_none_but_cells_survive() {
    let payload = json!({
        "code": 200,
        "result": {
            "detail_structure": [{
                "fields": "not-a-map",
                "tables_relationship": [{
                    "cells": [{"col": {"value": "x"}}]
                }]
            }]
        }
    });

    let projection = project(&payload, &ProjectOptions::default());
    assert!(projection.fields.is_none());
    assert!(projection.table_cells.is_some());
}

#[test]
fn stamps_are_not_projected() {
    let payload = json!({
        "code": 200,
        "result": {
            "detail_structure": [{
                "fields": {"name": [{"value": "Alice"}]},
                "stamps": [
                    {"color": "red", "shape": "round", "type": "official", "value": "seal", "page_number": 1}
                ]
            }]
        }
    });

    let projection = project(&payload, &ProjectOptions::default());
    let fields = projection.fields.unwrap();
    assert_eq!(fields.column_names(), vec!["name"]);
    assert!(projection.table_cells.is_none());
}

#[test]
fn empty_payload_projects_nothing() {
    let projection = project(&json!({"code": 200, "result": {}}), &ProjectOptions::default());
    assert!(projection.fields.is_none());
    assert!(projection.table_cells.is_none());
}
