use std::sync::Arc;

use serde_json::json;

use super::{
    assert_data, assert_response, compile_default, compile_with, error_summaries, parse, run,
    run_with, value_from_json,
};
use crate::{
    compile, error::CompileError, resolve::Variables, schema::SchemaType, CompilerOptions,
    Context, Resolved, SchemaBuilder, ScalarValue, Value,
};

fn simple_schema() -> Arc<SchemaType> {
    SchemaBuilder::from_sdl("type Query { a: String }")
        .unwrap()
        .resolver("Query", "a", |_| Resolved::value("a"))
        .finish()
        .unwrap()
}

#[test]
fn resolves_simple_field() {
    assert_response(&run(&simple_schema(), "{ a }"), json!({"data": {"a": "a"}}));
}

#[test]
fn default_resolver_reads_root_properties() {
    let schema = SchemaBuilder::from_sdl("type Query { a: String b: Int }")
        .unwrap()
        .finish()
        .unwrap();
    let root = value_from_json(json!({"a": "hello", "b": 42}));
    let response = run_with(&schema, "{ a b }", root, Variables::default());
    assert_response(&response, json!({"data": {"a": "hello", "b": 42}}));
}

#[test]
fn aliases_control_response_keys() {
    let response = run(&simple_schema(), "{ first: a second: a }");
    assert_response(
        &response,
        json!({"data": {"first": "a", "second": "a"}}),
    );
}

#[test]
fn output_keys_follow_selection_order() {
    let schema = SchemaBuilder::from_sdl("type Query { a: String b: String c: String }")
        .unwrap()
        .resolver("Query", "a", |_| Resolved::value("1"))
        .resolver("Query", "b", |_| Resolved::value("2"))
        .resolver("Query", "c", |_| Resolved::value("3"))
        .finish()
        .unwrap();
    let response = run(&schema, "{ c a b }");
    let encoded = serde_json::to_string(&response).unwrap();
    assert_eq!(encoded, r#"{"data":{"c":"3","a":"1","b":"2"}}"#);
}

#[test]
fn repeated_invocations_are_byte_identical() {
    let schema = SchemaBuilder::from_sdl("type Query { a: String b: [Int] }")
        .unwrap()
        .resolver("Query", "a", |_| Resolved::value("x"))
        .resolver("Query", "b", |_| {
            Resolved::value(Value::list(vec![Value::scalar(1), Value::scalar(2)]))
        })
        .finish()
        .unwrap();
    let query = compile_default(&schema, "{ a b }");
    let first = query
        .query_sync(Value::Null, Context::empty(), Variables::default())
        .unwrap();
    let second = query
        .query_sync(Value::Null, Context::empty(), Variables::default())
        .unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap(),
    );
}

#[test]
fn static_arguments_reach_the_resolver() {
    let schema = SchemaBuilder::from_sdl("type Query { add(a: Int!, b: Int!): Int }")
        .unwrap()
        .resolver("Query", "add", |params| {
            let int = |name: &str| {
                params
                    .args
                    .get_field_value(name)
                    .and_then(Value::as_scalar)
                    .and_then(ScalarValue::as_int)
                    .unwrap_or(0)
            };
            Resolved::value(int("a") + int("b"))
        })
        .finish()
        .unwrap();
    assert_response(
        &run(&schema, "{ add(a: 2, b: 40) }"),
        json!({"data": {"add": 42}}),
    );
}

#[test]
fn default_argument_values_fill_in() {
    let schema = SchemaBuilder::from_sdl("type Query { greet(name: String = \"world\"): String }")
        .unwrap()
        .resolver("Query", "greet", |params| {
            let name = params
                .args
                .get_field_value("name")
                .and_then(Value::as_string_value)
                .unwrap_or("nobody");
            Resolved::value(format!("hello {name}"))
        })
        .finish()
        .unwrap();
    assert_response(
        &run(&schema, "{ greet }"),
        json!({"data": {"greet": "hello world"}}),
    );
}

#[test]
fn nested_objects_and_lists() {
    let schema = SchemaBuilder::from_sdl(
        "type Query { user: User } type User { name: String friends: [User] }",
    )
    .unwrap()
    .resolver("Query", "user", |_| {
        Resolved::value(value_from_json(json!({
            "name": "ada",
            "friends": [{"name": "grace"}, {"name": "edsger"}],
        })))
    })
    .finish()
    .unwrap();
    let response = run(&schema, "{ user { name friends { name } } }");
    assert_response(
        &response,
        json!({"data": {"user": {
            "name": "ada",
            "friends": [{"name": "grace"}, {"name": "edsger"}],
        }}}),
    );
}

#[test]
fn fragment_spread_matches_inline_equivalent() {
    let schema = SchemaBuilder::from_sdl("type Query { user: User } type User { id: ID name: String }")
        .unwrap()
        .resolver("Query", "user", |_| {
            Resolved::value(value_from_json(json!({"id": "1", "name": "ada"})))
        })
        .finish()
        .unwrap();
    let with_fragment = run(
        &schema,
        "query { user { ...UserParts } } fragment UserParts on User { id name }",
    );
    let inlined = run(&schema, "query { user { id name } }");
    assert_eq!(
        serde_json::to_string(&with_fragment).unwrap(),
        serde_json::to_string(&inlined).unwrap(),
    );
}

#[test]
fn typename_is_lowered_to_a_constant() {
    let response = run(&simple_schema(), "{ __typename a }");
    assert_response(
        &response,
        json!({"data": {"__typename": "Query", "a": "a"}}),
    );
}

#[test]
fn non_iterable_list_value_is_an_error() {
    let schema = SchemaBuilder::from_sdl("type Query { numbers: [Int] }")
        .unwrap()
        .resolver("Query", "numbers", |_| Resolved::value(3))
        .finish()
        .unwrap();
    let response = run(&schema, "{ numbers }");
    assert_data(&response, json!({"numbers": null}));
    assert_eq!(
        error_summaries(&response),
        vec![(
            "Expected Iterable, but did not find one for field Query.numbers.".to_owned(),
            json!(["numbers"]),
        )],
    );
}

#[test]
fn non_object_value_for_object_type_is_an_error() {
    let schema = SchemaBuilder::from_sdl("type Query { user: User } type User { name: String }")
        .unwrap()
        .resolver("Query", "user", |_| Resolved::value("oops"))
        .finish()
        .unwrap();
    let response = run(&schema, "{ user { name } }");
    assert_data(&response, json!({"user": null}));
    assert_eq!(
        error_summaries(&response),
        vec![(
            "Expected a value of type \"User\" but received: \"oops\"".to_owned(),
            json!(["user"]),
        )],
    );
}

#[test]
fn unknown_field_fails_compilation() {
    let err = compile(
        &simple_schema(),
        &parse("{ nope }"),
        None,
        CompilerOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::UnknownField { .. }));
    assert_eq!(
        err.to_string(),
        "Cannot query field \"nope\" on type \"Query\".",
    );
}

#[test]
fn multiple_operations_require_a_name() {
    let document = parse("query A { a } query B { a }");
    let err = compile(&simple_schema(), &document, None, CompilerOptions::default()).unwrap_err();
    assert_eq!(err, CompileError::MultipleOperationsProvided);

    let by_name = compile(
        &simple_schema(),
        &document,
        Some("B"),
        CompilerOptions::default(),
    );
    assert!(by_name.is_ok());

    let unknown = compile(
        &simple_schema(),
        &document,
        Some("C"),
        CompilerOptions::default(),
    )
    .unwrap_err();
    assert_eq!(unknown, CompileError::UnknownOperationName("C".into()));
}

#[test]
fn fragment_only_document_has_no_operation() {
    let document = parse("fragment F on Query { a }");
    let err = compile(&simple_schema(), &document, None, CompilerOptions::default()).unwrap_err();
    assert_eq!(err, CompileError::NoOperationProvided);
}

#[test]
fn operation_name_is_exposed() {
    let query = compile_default(&simple_schema(), "query Named { a }");
    assert_eq!(query.operation_name(), Some("Named"));
}

#[test]
fn integral_floats_serialize_as_ints() {
    let schema = SchemaBuilder::from_sdl("type Query { n: Int }")
        .unwrap()
        .resolver("Query", "n", |_| Resolved::value(2.0))
        .finish()
        .unwrap();
    assert_response(&run(&schema, "{ n }"), json!({"data": {"n": 2}}));
}

#[test]
fn invalid_leaf_value_is_reported() {
    let schema = SchemaBuilder::from_sdl("type Query { n: Int }")
        .unwrap()
        .resolver("Query", "n", |_| Resolved::value("not a number"))
        .finish()
        .unwrap();
    let response = run(&schema, "{ n }");
    assert_data(&response, json!({"n": null}));
    assert_eq!(
        error_summaries(&response),
        vec![(
            "Expected a value of type \"Int\" but received: \"not a number\"".to_owned(),
            json!(["n"]),
        )],
    );
}

#[test]
fn enum_output_must_be_a_declared_value() {
    let schema = SchemaBuilder::from_sdl("enum Color { RED GREEN } type Query { c: Color }")
        .unwrap()
        .resolver("Query", "c", |_| Resolved::value("RED"))
        .finish()
        .unwrap();
    assert_response(&run(&schema, "{ c }"), json!({"data": {"c": "RED"}}));

    let bad = SchemaBuilder::from_sdl("enum Color { RED GREEN } type Query { c: Color }")
        .unwrap()
        .resolver("Query", "c", |_| Resolved::value("BLUE"))
        .finish()
        .unwrap();
    let response = run(&bad, "{ c }");
    assert_data(&response, json!({"c": null}));
    assert!(error_summaries(&response)[0]
        .0
        .starts_with("Expected a value of type \"Color\""));
}

#[test]
fn custom_serializers_override_defaults() {
    let schema = SchemaBuilder::from_sdl("type Query { n: Int }")
        .unwrap()
        .resolver("Query", "n", |_| Resolved::value(7))
        .finish()
        .unwrap();
    let mut options = CompilerOptions::default();
    options.custom_serializers.insert(
        "Int".into(),
        Arc::new(|v: &Value| -> Result<Value, String> { Ok(Value::scalar(format!("#{v}"))) }),
    );
    let query = compile_with(&schema, "{ n }", options);
    let response = query
        .query_sync(Value::Null, Context::empty(), Variables::default())
        .unwrap();
    assert_data(&response, json!({"n": "#7"}));
}

#[test]
fn leaf_serialization_can_be_disabled() {
    let schema = SchemaBuilder::from_sdl("type Query { n: Int }")
        .unwrap()
        .resolver("Query", "n", |_| Resolved::value("verbatim"))
        .finish()
        .unwrap();
    let query = compile_with(
        &schema,
        "{ n }",
        CompilerOptions {
            disable_leaf_serialization: true,
            ..Default::default()
        },
    );
    let response = query
        .query_sync(Value::Null, Context::empty(), Variables::default())
        .unwrap();
    assert_response(&response, json!({"data": {"n": "verbatim"}}));
}

#[test]
fn context_reaches_resolvers() {
    struct Greeting(String);

    let schema = SchemaBuilder::from_sdl("type Query { greet: String }")
        .unwrap()
        .resolver("Query", "greet", |params| {
            let greeting = params
                .context
                .get::<Greeting>()
                .map(|g| g.0.clone())
                .unwrap_or_default();
            Resolved::value(greeting)
        })
        .finish()
        .unwrap();
    let response = compile_default(&schema, "{ greet }")
        .query_sync(
            Value::Null,
            Context::new(Greeting("hi".into())),
            Variables::default(),
        )
        .unwrap();
    assert_response(&response, json!({"data": {"greet": "hi"}}));
}

#[test]
fn resolver_errors_keep_the_original_error() {
    use std::fmt;

    #[derive(Debug)]
    struct Custom(u32);

    impl fmt::Display for Custom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "custom failure {}", self.0)
        }
    }

    impl std::error::Error for Custom {}

    let schema = SchemaBuilder::from_sdl("type Query { a: String }")
        .unwrap()
        .resolver("Query", "a", |_| {
            Err(crate::FieldError::from_error(Custom(7)))
        })
        .finish()
        .unwrap();
    let response = run(&schema, "{ a }");
    assert_data(&response, json!({"a": null}));
    let original = response.errors[0]
        .error()
        .original_error()
        .and_then(|e| e.downcast_ref::<Custom>());
    assert_eq!(original.map(|c| c.0), Some(7));
}

#[tokio::test]
async fn async_resolvers_complete_in_selection_order() {
    let schema = SchemaBuilder::from_sdl("type Query { slow: String fast: String }")
        .unwrap()
        .resolver("Query", "slow", |_| {
            Resolved::future(async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(Value::scalar("slow"))
            })
        })
        .resolver("Query", "fast", |_| Resolved::value("fast"))
        .finish()
        .unwrap();
    let response = compile_default(&schema, "{ slow fast }")
        .query(Value::Null, Context::empty(), Variables::default())
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"data":{"slow":"slow","fast":"fast"}}"#,
    );
}
