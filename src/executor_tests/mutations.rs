use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::json;

use super::{assert_response, compile_default};
use crate::{
    resolve::Variables, Context, Resolved, SchemaBuilder, Value,
};

const MUTATION_SDL: &str = "\
    type Query { ok: Boolean } \
    type Mutation { a: Int b: Int }";

/// Shared journal the resolvers append to, for ordering assertions.
#[derive(Default)]
struct Journal(Mutex<Vec<&'static str>>);

impl Journal {
    fn push(&self, entry: &'static str) {
        self.0.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn top_level_mutation_fields_run_in_document_order() {
    let schema = SchemaBuilder::from_sdl(MUTATION_SDL)
        .unwrap()
        .resolver("Mutation", "a", |params| {
            let journal = Arc::clone(params.context.get::<Arc<Journal>>().unwrap());
            Resolved::future(async move {
                // The slow one still finishes before `b` starts.
                tokio::time::sleep(Duration::from_millis(30)).await;
                journal.push("a");
                Ok(Value::scalar(1))
            })
        })
        .resolver("Mutation", "b", |params| {
            let journal = Arc::clone(params.context.get::<Arc<Journal>>().unwrap());
            Resolved::future(async move {
                journal.push("b");
                Ok(Value::scalar(2))
            })
        })
        .finish()
        .unwrap();

    let journal = Arc::new(Journal::default());
    let response = compile_default(&schema, "mutation { a b }")
        .query(
            Value::Null,
            Context::new(Arc::clone(&journal)),
            Variables::default(),
        )
        .await
        .unwrap();

    assert_response(&response, json!({"data": {"a": 1, "b": 2}}));
    assert_eq!(journal.entries(), vec!["a", "b"]);
}

#[tokio::test]
async fn mutation_subtrees_complete_before_the_next_field_starts() {
    let sdl = "\
        type Query { ok: Boolean } \
        type Mutation { first: Step second: Step } \
        type Step { child: Int }";
    let schema = SchemaBuilder::from_sdl(sdl)
        .unwrap()
        .resolver("Mutation", "first", |params| {
            params.context.get::<Arc<Journal>>().unwrap().push("first");
            Resolved::value(super::value_from_json(json!({})))
        })
        .resolver("Mutation", "second", |params| {
            params.context.get::<Arc<Journal>>().unwrap().push("second");
            Resolved::value(super::value_from_json(json!({})))
        })
        .resolver("Step", "child", |params| {
            let journal = Arc::clone(params.context.get::<Arc<Journal>>().unwrap());
            let under_first = params.info.path.first()
                == Some(&crate::PathSegment::Key("first".into()));
            Resolved::future(async move {
                tokio::time::sleep(Duration::from_millis(15)).await;
                journal.push(if under_first { "first.child" } else { "second.child" });
                Ok(Value::scalar(0))
            })
        })
        .finish()
        .unwrap();

    let journal = Arc::new(Journal::default());
    let response = compile_default(&schema, "mutation { first { child } second { child } }")
        .query(
            Value::Null,
            Context::new(Arc::clone(&journal)),
            Variables::default(),
        )
        .await
        .unwrap();

    assert_response(
        &response,
        json!({"data": {
            "first": {"child": 0},
            "second": {"child": 0},
        }}),
    );
    assert_eq!(
        journal.entries(),
        vec!["first", "first.child", "second", "second.child"],
    );
}

#[tokio::test]
async fn query_siblings_are_not_serialized() {
    // Both resolvers are in flight at once: the first sleeps while the
    // second signals, and the first only completes after seeing the
    // signal.
    use tokio::sync::oneshot;

    let (tx, rx) = oneshot::channel::<()>();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let rx = Arc::new(Mutex::new(Some(rx)));

    let schema = SchemaBuilder::from_sdl("type Query { waiter: Int signaler: Int }")
        .unwrap()
        .resolver("Query", "waiter", move |_| {
            let rx = rx.lock().unwrap().take().expect("single invocation");
            Resolved::future(async move {
                rx.await.expect("signal should arrive");
                Ok(Value::scalar(1))
            })
        })
        .resolver("Query", "signaler", move |_| {
            let tx = tx.lock().unwrap().take().expect("single invocation");
            Resolved::future(async move {
                let _ = tx.send(());
                Ok(Value::scalar(2))
            })
        })
        .finish()
        .unwrap();

    let response = compile_default(&schema, "{ waiter signaler }")
        .query(Value::Null, Context::empty(), Variables::default())
        .await
        .unwrap();
    assert_response(&response, json!({"data": {"waiter": 1, "signaler": 2}}));
}

#[test]
fn mutations_need_a_mutation_root() {
    let schema = SchemaBuilder::from_sdl("type Query { ok: Boolean }")
        .unwrap()
        .finish()
        .unwrap();
    let err = crate::compile(
        &schema,
        &super::parse("mutation { nope }"),
        None,
        crate::CompilerOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        crate::CompileError::UnsupportedOperation("mutation".into()),
    );
}
