//! End-to-end behavior tests for compiled queries.

mod directives;
mod interfaces_unions;
mod mutations;
mod nulls;
mod queries;
mod subscriptions;

use std::sync::Arc;

use crate::{
    ast::Document,
    compile,
    resolve::Variables,
    response::Response,
    schema::SchemaType,
    value::{Object, Value},
    CompiledQuery, CompilerOptions, Context,
};

pub(crate) fn parse(source: &str) -> Document {
    let document =
        graphql_parser::parse_query::<String>(source).expect("test query should parse");
    crate::parser::lower_document(&document)
}

pub(crate) fn compile_with(
    schema: &Arc<SchemaType>,
    source: &str,
    options: CompilerOptions,
) -> CompiledQuery {
    compile(schema, &parse(source), None, options).expect("test query should compile")
}

pub(crate) fn compile_default(schema: &Arc<SchemaType>, source: &str) -> CompiledQuery {
    compile_with(schema, source, CompilerOptions::default())
}

pub(crate) fn run(schema: &Arc<SchemaType>, source: &str) -> Response {
    run_with(schema, source, Value::Null, Variables::default())
}

pub(crate) fn run_with(
    schema: &Arc<SchemaType>,
    source: &str,
    root: Value,
    variables: Variables,
) -> Response {
    compile_default(schema, source)
        .query_sync(root, Context::empty(), variables)
        .expect("operation should be executable")
}

/// Raw variables straight from a JSON document, the way a transport layer
/// would deliver them.
pub(crate) fn vars(json: serde_json::Value) -> Variables {
    serde_json::from_value(json).expect("test variables should deserialize")
}

/// Builds a runtime [`Value`] from JSON, for root values and resolver
/// fixtures.
pub(crate) fn value_from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::scalar(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64().filter(|i| i32::try_from(*i).is_ok()) {
                Value::scalar(i as i32)
            } else {
                Value::scalar(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::scalar(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(value_from_json).collect())
        }
        serde_json::Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, value_from_json(v)))
                .collect::<Object>(),
        ),
    }
}

/// Asserts the whole serialized response, data and errors included.
#[track_caller]
pub(crate) fn assert_response(response: &Response, expected: serde_json::Value) {
    let actual = serde_json::to_value(response).expect("response should serialize");
    pretty_assertions::assert_eq!(actual, expected);
}

/// Asserts the serialized `data` member alone.
#[track_caller]
pub(crate) fn assert_data(response: &Response, expected: serde_json::Value) {
    let data = response.data.as_ref().expect("response should carry data");
    let actual = serde_json::to_value(data).expect("data should serialize");
    pretty_assertions::assert_eq!(actual, expected, "errors: {:?}", response.errors);
}

/// `(message, path)` pairs of every error, positions ignored.
pub(crate) fn error_summaries(response: &Response) -> Vec<(String, serde_json::Value)> {
    response
        .errors
        .iter()
        .map(|e| {
            (
                e.error().message().to_owned(),
                serde_json::to_value(e.path()).expect("path should serialize"),
            )
        })
        .collect()
}
