use serde_json::json;

use super::{assert_data, assert_response, error_summaries, run, value_from_json};
use crate::{Resolved, SchemaBuilder};

const NODE_SDL: &str = "\
    type Query { node: Node! } \
    interface Node { id: ID } \
    type Image implements Node { id: ID url: String } \
    type Post implements Node { id: ID title: String }";

fn node_schema(payload: serde_json::Value) -> std::sync::Arc<crate::schema::SchemaType> {
    SchemaBuilder::from_sdl(NODE_SDL)
        .unwrap()
        .resolver("Query", "node", move |_| {
            Resolved::value(value_from_json(payload.clone()))
        })
        .finish()
        .unwrap()
}

#[test]
fn interface_dispatch_through_typename_property() {
    let schema = node_schema(json!({"__typename": "Image", "id": "1", "url": "u"}));
    let response = run(&schema, "{ node { id ... on Image { url } } }");
    assert_response(
        &response,
        json!({"data": {"node": {"id": "1", "url": "u"}}}),
    );
}

#[test]
fn non_matching_inline_fragments_are_ignored() {
    let schema = node_schema(json!({"__typename": "Post", "id": "2", "title": "t"}));
    let response = run(
        &schema,
        "{ node { id ... on Image { url } ... on Post { title } } }",
    );
    assert_response(
        &response,
        json!({"data": {"node": {"id": "2", "title": "t"}}}),
    );
}

#[test]
fn explicit_resolve_type_wins() {
    let schema = SchemaBuilder::from_sdl(NODE_SDL)
        .unwrap()
        .resolver("Query", "node", |_| {
            Resolved::value(value_from_json(json!({"id": "3", "url": "u"})))
        })
        .resolve_type("Node", |_, _, _| Some("Image".to_owned()))
        .finish()
        .unwrap();
    let response = run(&schema, "{ node { id ... on Image { url } } }");
    assert_response(
        &response,
        json!({"data": {"node": {"id": "3", "url": "u"}}}),
    );
}

#[test]
fn is_type_of_chain_is_the_last_fallback() {
    let schema = SchemaBuilder::from_sdl(NODE_SDL)
        .unwrap()
        .resolver("Query", "node", |_| {
            Resolved::value(value_from_json(json!({"id": "4", "title": "t"})))
        })
        .is_type_of("Image", |value, _| {
            value
                .as_object_value()
                .is_some_and(|o| o.contains_field("url"))
        })
        .is_type_of("Post", |value, _| {
            value
                .as_object_value()
                .is_some_and(|o| o.contains_field("title"))
        })
        .finish()
        .unwrap();
    let response = run(&schema, "{ node { id ... on Post { title } } }");
    assert_response(
        &response,
        json!({"data": {"node": {"id": "4", "title": "t"}}}),
    );
}

#[test]
fn unresolvable_abstract_value_is_reported() {
    let schema = node_schema(json!({"id": "5"}));
    let response = run(&schema, "{ node { id } }");
    assert_data(&response, json!(null));
    let (message, path) = &error_summaries(&response)[0];
    assert!(
        message.starts_with(
            "Abstract type \"Node\" must resolve to an Object type at runtime for field \
             Query.node."
        ),
        "got: {message}",
    );
    assert_eq!(path, &json!(["node"]));
}

#[test]
fn impossible_runtime_type_is_reported() {
    let schema = node_schema(json!({"__typename": "Video", "id": "6"}));
    let response = run(&schema, "{ node { id } }");
    assert_data(&response, json!(null));
    assert_eq!(
        error_summaries(&response)[0].0,
        "Runtime Object type \"Video\" is not a possible type for \"Node\".",
    );
}

#[test]
fn branch_errors_never_leak_meta_path_segments() {
    let schema = SchemaBuilder::from_sdl(NODE_SDL)
        .unwrap()
        .resolver("Query", "node", |_| {
            Resolved::value(value_from_json(json!({"__typename": "Image", "id": "7"})))
        })
        .resolver("Image", "url", |_| Err(crate::FieldError::from("no url")))
        .finish()
        .unwrap();
    let response = run(&schema, "{ node { id ... on Image { url } } }");
    assert_data(&response, json!({"node": {"id": "7", "url": null}}));
    assert_eq!(
        error_summaries(&response),
        vec![("no url".to_owned(), json!(["node", "url"]))],
    );
}

#[test]
fn typename_inside_branches_names_the_concrete_type() {
    let schema = node_schema(json!({"__typename": "Image", "id": "8"}));
    let response = run(&schema, "{ node { __typename id } }");
    assert_response(
        &response,
        json!({"data": {"node": {"__typename": "Image", "id": "8"}}}),
    );
}

#[test]
fn union_members_dispatch_like_interfaces() {
    let sdl = "\
        type Query { media: Media } \
        union Media = Song | Movie \
        type Song { title: String } \
        type Movie { director: String }";
    let schema = SchemaBuilder::from_sdl(sdl)
        .unwrap()
        .resolver("Query", "media", |_| {
            Resolved::value(value_from_json(
                json!({"__typename": "Movie", "director": "kubrick"}),
            ))
        })
        .finish()
        .unwrap();
    let response = run(
        &schema,
        "{ media { ... on Song { title } ... on Movie { director } } }",
    );
    assert_response(
        &response,
        json!({"data": {"media": {"director": "kubrick"}}}),
    );
}

#[test]
fn interface_fragments_apply_to_all_implementers() {
    let schema = node_schema(json!({"__typename": "Post", "id": "9", "title": "t"}));
    let response = run(
        &schema,
        "query { node { ...NodeParts ... on Post { title } } } \
         fragment NodeParts on Node { id }",
    );
    assert_response(
        &response,
        json!({"data": {"node": {"id": "9", "title": "t"}}}),
    );
}
