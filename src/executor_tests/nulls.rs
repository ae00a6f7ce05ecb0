use serde_json::json;

use super::{assert_data, assert_response, error_summaries, run, value_from_json};
use crate::{FieldError, Resolved, SchemaBuilder, Value};

#[test]
fn non_null_failure_bubbles_to_the_root() {
    let schema = SchemaBuilder::from_sdl(
        "type Query { foo: Foo! } type Foo { bar: String! }",
    )
    .unwrap()
    .resolver("Query", "foo", |_| {
        Resolved::value(value_from_json(json!({})))
    })
    .resolver("Foo", "bar", |_| Err(FieldError::from("X")))
    .finish()
    .unwrap();

    let response = run(&schema, "{ foo { bar } }");
    assert_data(&response, json!(null));
    assert_eq!(
        error_summaries(&response),
        vec![("X".to_owned(), json!(["foo", "bar"]))],
    );
}

#[test]
fn bubbling_stops_at_the_nearest_nullable_ancestor() {
    let schema = SchemaBuilder::from_sdl(
        "type Query { outer: Outer } type Outer { inner: Inner! } type Inner { leaf: String! }",
    )
    .unwrap()
    .resolver("Query", "outer", |_| {
        Resolved::value(value_from_json(json!({"inner": {}})))
    })
    .resolver("Inner", "leaf", |_| Err(FieldError::from("boom")))
    .finish()
    .unwrap();

    let response = run(&schema, "{ outer { inner { leaf } } }");
    assert_data(&response, json!({"outer": null}));
    assert_eq!(
        error_summaries(&response),
        vec![("boom".to_owned(), json!(["outer", "inner", "leaf"]))],
    );
}

#[test]
fn plain_null_in_non_null_slot_reports_a_violation() {
    let schema = SchemaBuilder::from_sdl("type Query { foo: Foo } type Foo { bar: String! }")
        .unwrap()
        .resolver("Query", "foo", |_| {
            Resolved::value(value_from_json(json!({"bar": null})))
        })
        .finish()
        .unwrap();

    let response = run(&schema, "{ foo { bar } }");
    assert_data(&response, json!({"foo": null}));
    assert_eq!(
        error_summaries(&response),
        vec![(
            "Cannot return null for non-nullable field Foo.bar.".to_owned(),
            json!(["foo", "bar"]),
        )],
    );
}

#[test]
fn nullable_failure_stays_local() {
    let schema = SchemaBuilder::from_sdl("type Query { a: String b: String }")
        .unwrap()
        .resolver("Query", "a", |_| Err(FieldError::from("a failed")))
        .resolver("Query", "b", |_| Resolved::value("ok"))
        .finish()
        .unwrap();

    let response = run(&schema, "{ a b }");
    assert_data(&response, json!({"a": null, "b": "ok"}));
    assert_eq!(
        error_summaries(&response),
        vec![("a failed".to_owned(), json!(["a"]))],
    );
}

#[test]
fn non_null_list_element_nulls_the_list() {
    let schema = SchemaBuilder::from_sdl("type Query { items: [String!] }")
        .unwrap()
        .resolver("Query", "items", |_| {
            Resolved::value(Value::list(vec![
                Value::scalar("one"),
                Value::Null,
                Value::scalar("three"),
            ]))
        })
        .finish()
        .unwrap();

    let response = run(&schema, "{ items }");
    assert_data(&response, json!({"items": null}));
    assert_eq!(
        error_summaries(&response),
        vec![(
            "Cannot return null for non-nullable field Query.items.".to_owned(),
            json!(["items", 1]),
        )],
    );
}

#[test]
fn nullable_list_of_non_null_objects_keeps_other_elements() {
    let schema = SchemaBuilder::from_sdl(
        "type Query { users: [User] } type User { name: String! }",
    )
    .unwrap()
    .resolver("Query", "users", |_| {
        Resolved::value(value_from_json(json!([
            {"name": "ada"},
            {"name": null},
        ])))
    })
    .finish()
    .unwrap();

    let response = run(&schema, "{ users { name } }");
    assert_data(
        &response,
        json!({"users": [{"name": "ada"}, null]}),
    );
    assert_eq!(
        error_summaries(&response),
        vec![(
            "Cannot return null for non-nullable field User.name.".to_owned(),
            json!(["users", 1, "name"]),
        )],
    );
}

#[test]
fn duplicate_null_candidates_surface_once() {
    let schema = SchemaBuilder::from_sdl("type Query { foo: Foo! } type Foo { bar: String! }")
        .unwrap()
        .resolver("Query", "foo", |_| Resolved::value(Value::Null))
        .finish()
        .unwrap();

    let response = run(&schema, "{ foo { bar } }");
    assert_data(&response, json!(null));
    assert_eq!(response.errors.len(), 1);
}

#[test]
fn errors_inside_nulled_subtrees_are_preserved() {
    let schema = SchemaBuilder::from_sdl(
        "type Query { foo: Foo } type Foo { a: String b: String! }",
    )
    .unwrap()
    .resolver("Query", "foo", |_| {
        Resolved::value(value_from_json(json!({"b": null})))
    })
    .resolver("Foo", "a", |_| Err(FieldError::from("a failed")))
    .finish()
    .unwrap();

    let response = run(&schema, "{ foo { a b } }");
    assert_data(&response, json!({"foo": null}));
    let summaries = error_summaries(&response);
    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().any(|(m, _)| m == "a failed"));
    assert!(summaries
        .iter()
        .any(|(m, _)| m == "Cannot return null for non-nullable field Foo.b."));
}

#[test]
fn root_field_error_on_non_null_root() {
    let schema = SchemaBuilder::from_sdl("type Query { a: String! }")
        .unwrap()
        .resolver("Query", "a", |_| Err(FieldError::from("down")))
        .finish()
        .unwrap();

    let response = run(&schema, "{ a }");
    assert_response(
        &response,
        json!({
            "data": null,
            "errors": [{
                "message": "down",
                "locations": [{"line": 1, "column": 3}],
                "path": ["a"],
            }],
        }),
    );
}
