use futures::StreamExt as _;
use serde_json::json;

use super::{assert_response, compile_default, error_summaries, value_from_json};
use crate::{
    error::CompileError, resolve::Variables, Context, FieldError, Resolved, SchemaBuilder, Value,
};

const TICK_SDL: &str = "\
    type Query { ok: Boolean } \
    type Subscription { tick: Int }";

fn tick_schema(events: Vec<Result<i32, &'static str>>) -> std::sync::Arc<crate::schema::SchemaType> {
    SchemaBuilder::from_sdl(TICK_SDL)
        .unwrap()
        .subscription("Subscription", "tick", move |_| {
            let events = events.clone();
            Ok(futures::stream::iter(events.into_iter().map(|event| {
                event
                    .map(|n| value_from_json(json!({"tick": n})))
                    .map_err(FieldError::from)
            }))
            .boxed())
        })
        .finish()
        .unwrap()
}

#[tokio::test]
async fn source_event_stream_yields_raw_payloads() {
    let schema = tick_schema(vec![Ok(1), Ok(2)]);
    let query = compile_default(&schema, "subscription { tick }");
    let stream = query
        .create_source_event_stream(Value::Null, Context::empty(), Variables::default())
        .await
        .expect("stream should start");
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].as_ref().unwrap(),
        &value_from_json(json!({"tick": 1})),
    );
}

#[tokio::test]
async fn subscribe_maps_each_event_through_the_body() {
    let schema = tick_schema(vec![Ok(1), Ok(2), Ok(3)]);
    let query = compile_default(&schema, "subscription { tick }");
    let stream = query
        .subscribe(Value::Null, Context::empty(), Variables::default())
        .await
        .expect("subscription should start");
    let responses: Vec<_> = stream.collect().await;
    assert_eq!(responses.len(), 3);
    assert_response(&responses[0], json!({"data": {"tick": 1}}));
    assert_response(&responses[2], json!({"data": {"tick": 3}}));
}

#[tokio::test]
async fn event_errors_do_not_terminate_the_stream() {
    let schema = tick_schema(vec![Ok(1), Err("glitch"), Ok(3)]);
    let query = compile_default(&schema, "subscription { tick }");
    let stream = query
        .subscribe(Value::Null, Context::empty(), Variables::default())
        .await
        .expect("subscription should start");
    let responses: Vec<_> = stream.collect().await;
    assert_eq!(responses.len(), 3);

    assert_response(&responses[0], json!({"data": {"tick": 1}}));
    assert!(responses[1].data.is_none());
    assert_eq!(
        error_summaries(&responses[1]),
        vec![("glitch".to_owned(), json!(["tick"]))],
    );
    assert_response(&responses[2], json!({"data": {"tick": 3}}));
}

#[tokio::test]
async fn synchronous_subscribe_failure_is_an_error_result() {
    let schema = SchemaBuilder::from_sdl(TICK_SDL)
        .unwrap()
        .subscription("Subscription", "tick", |_| Err(FieldError::from("refused")))
        .finish()
        .unwrap();
    let query = compile_default(&schema, "subscription { tick }");
    let err = query
        .subscribe(Value::Null, Context::empty(), Variables::default())
        .await
        .err()
        .expect("subscription should be refused");
    assert_eq!(
        error_summaries(&err),
        vec![("refused".to_owned(), json!(["tick"]))],
    );
}

#[tokio::test]
async fn subscribing_to_a_query_is_a_misuse_error() {
    let schema = tick_schema(vec![]);
    let query = compile_default(&schema, "query { ok }");
    let err = query
        .subscribe(Value::Null, Context::empty(), Variables::default())
        .await
        .err()
        .expect("queries cannot be subscribed");
    assert_eq!(
        error_summaries(&err)[0].0,
        CompileError::NotSubscription.to_string(),
    );
}

#[tokio::test]
async fn querying_a_subscription_is_a_misuse_error() {
    let schema = tick_schema(vec![]);
    let query = compile_default(&schema, "subscription { tick }");
    let err = query
        .query(Value::Null, Context::empty(), Variables::default())
        .await
        .unwrap_err();
    assert_eq!(err, CompileError::IsSubscription);
}

#[tokio::test]
async fn missing_source_resolver_is_reported() {
    let schema = SchemaBuilder::from_sdl(TICK_SDL).unwrap().finish().unwrap();
    let query = compile_default(&schema, "subscription { tick }");
    let err = query
        .subscribe(Value::Null, Context::empty(), Variables::default())
        .await
        .err()
        .expect("no source stream is available");
    assert!(error_summaries(&err)[0]
        .0
        .contains("missing a source stream resolver"));
}
