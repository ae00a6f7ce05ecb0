use serde_json::json;

use super::{assert_response, compile_default, parse, run, run_with, value_from_json, vars};
use crate::{compile, error::CompileError, CompilerOptions, Resolved, SchemaBuilder, Value};

fn foo_bar_schema() -> std::sync::Arc<crate::schema::SchemaType> {
    SchemaBuilder::from_sdl("type Query { foo: Foo } type Foo { bar: String baz: String }")
        .unwrap()
        .resolver("Query", "foo", |_| {
            Resolved::value(value_from_json(json!({"bar": "B", "baz": "Z"})))
        })
        .finish()
        .unwrap()
}

#[test]
fn skip_at_a_nested_path_follows_its_variable() {
    let query = "query Q($s: Boolean!) { foo { bar @skip(if: $s) } }";

    let skipped = run_with(
        &foo_bar_schema(),
        query,
        Value::Null,
        vars(json!({"s": true})),
    );
    assert_response(&skipped, json!({"data": {"foo": {}}}));

    let kept = run_with(
        &foo_bar_schema(),
        query,
        Value::Null,
        vars(json!({"s": false})),
    );
    assert_response(&kept, json!({"data": {"foo": {"bar": "B"}}}));
}

#[test]
fn literal_conditions_drop_selections_statically() {
    let response = run(
        &foo_bar_schema(),
        "{ foo { bar @skip(if: true) baz @include(if: true) } }",
    );
    assert_response(&response, json!({"data": {"foo": {"baz": "Z"}}}));
}

#[test]
fn skip_true_equals_include_false() {
    let skipped = run(&foo_bar_schema(), "{ foo { bar @skip(if: true) baz } }");
    let excluded = run(&foo_bar_schema(), "{ foo { bar @include(if: false) baz } }");
    assert_eq!(
        serde_json::to_string(&skipped).unwrap(),
        serde_json::to_string(&excluded).unwrap(),
    );
}

#[test]
fn skip_and_include_on_the_same_node_conjoin() {
    let query = "query Q($s: Boolean!, $i: Boolean!) { foo { bar @skip(if: $s) @include(if: $i) } }";
    let cases = [
        (false, true, true),
        (false, false, false),
        (true, true, false),
        (true, false, false),
    ];
    for (s, i, present) in cases {
        let response = run_with(
            &foo_bar_schema(),
            query,
            Value::Null,
            vars(json!({"s": s, "i": i})),
        );
        let expected = if present {
            json!({"data": {"foo": {"bar": "B"}}})
        } else {
            json!({"data": {"foo": {}}})
        };
        assert_response(&response, expected);
    }
}

#[test]
fn fragment_conditions_reach_descendants_after_merging() {
    // `bar` arrives only through the $a fragment and `baz` only through
    // the $b one; merging the two spreads must not widen either gate.
    let query = "query Q($a: Boolean!, $b: Boolean!) {
        foo { ...BarParts @include(if: $a) ...BazParts @include(if: $b) }
    }
    fragment BarParts on Foo { bar }
    fragment BazParts on Foo { baz }";

    let response = run_with(
        &foo_bar_schema(),
        query,
        Value::Null,
        vars(json!({"a": true, "b": false})),
    );
    assert_response(&response, json!({"data": {"foo": {"bar": "B"}}}));

    let response = run_with(
        &foo_bar_schema(),
        query,
        Value::Null,
        vars(json!({"a": false, "b": true})),
    );
    assert_response(&response, json!({"data": {"foo": {"baz": "Z"}}}));
}

#[test]
fn conjunction_order_across_nested_fragments_is_irrelevant() {
    let outer_first = "query Q($a: Boolean!, $b: Boolean!) {
        foo @include(if: $a) { bar @include(if: $b) }
    }";
    let inner_first = "query Q($a: Boolean!, $b: Boolean!) {
        foo @include(if: $b) { bar @include(if: $a) }
    }";
    // Both only produce bar when $a and $b hold.
    for (a, b) in [(true, true), (true, false), (false, true), (false, false)] {
        let lhs = run_with(
            &foo_bar_schema(),
            outer_first,
            Value::Null,
            vars(json!({"a": a, "b": b})),
        );
        let rhs = run_with(
            &foo_bar_schema(),
            inner_first,
            Value::Null,
            vars(json!({"a": b, "b": a})),
        );
        assert_eq!(
            serde_json::to_string(&lhs).unwrap(),
            serde_json::to_string(&rhs).unwrap(),
        );
    }
}

#[test]
fn missing_if_argument_fails_compilation() {
    let err = compile(
        &foo_bar_schema(),
        &parse("{ foo { bar @skip } }"),
        None,
        CompilerOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::InvalidDirective { .. }));
    assert!(err
        .to_string()
        .contains("argument \"if\" of type \"Boolean!\" is required"));
}

#[test]
fn directive_variables_must_be_usable_as_boolean() {
    let err = compile(
        &foo_bar_schema(),
        &parse("query Q($s: String) { foo { bar @skip(if: $s) } }"),
        None,
        CompilerOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::InvalidVariableUsage { .. }));
    assert_eq!(
        err.to_string(),
        "Variable \"$s\" of type \"String\" used in position expecting type \"Boolean!\".",
    );

    // Nullable Boolean is fine when it carries a default.
    let ok = compile(
        &foo_bar_schema(),
        &parse("query Q($s: Boolean = false) { foo { bar @skip(if: $s) } }"),
        None,
        CompilerOptions::default(),
    );
    assert!(ok.is_ok());
}

#[test]
fn defaulted_directive_variable_uses_its_default() {
    let response = run_with(
        &foo_bar_schema(),
        "query Q($s: Boolean = true) { foo { bar @skip(if: $s) baz } }",
        Value::Null,
        vars(json!({})),
    );
    assert_response(&response, json!({"data": {"foo": {"baz": "Z"}}}));
}

#[test]
fn path_based_flag_changes_nothing_observable() {
    let query = "query Q($s: Boolean!) { foo { bar @skip(if: $s) baz } }";
    let legacy = compile_default(&foo_bar_schema(), query);
    let path_based = super::compile_with(
        &foo_bar_schema(),
        query,
        CompilerOptions {
            use_experimental_path_based_skip_include: true,
            ..Default::default()
        },
    );
    for s in [true, false] {
        let lhs = legacy
            .query_sync(Value::Null, crate::Context::empty(), vars(json!({"s": s})))
            .unwrap();
        let rhs = path_based
            .query_sync(Value::Null, crate::Context::empty(), vars(json!({"s": s})))
            .unwrap();
        assert_eq!(
            serde_json::to_string(&lhs).unwrap(),
            serde_json::to_string(&rhs).unwrap(),
        );
    }
}
