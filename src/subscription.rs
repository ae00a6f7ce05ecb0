//! Subscription support: source-event streams and per-event mapping.
//!
//! A subscription reduces to one root source stream plus the compiled
//! query body applied to each event payload. Errors inside individual
//! events become `{data, errors}` values on the stream and never
//! terminate it; a failure producing the stream itself surfaces as an
//! error-only [`Response`].

use futures::{stream::BoxStream, StreamExt as _};

use crate::{
    compiled::CompiledQuery,
    error::{ExecutionError, FieldError, FieldResult},
    parser::SourcePosition,
    resolve::{Context, ValuesStream},
    response::Response,
    value::Object,
};

/// A stream of per-event execution results.
pub type ResponseStream = BoxStream<'static, Response>;

/// Maps each source event through the compiled query body.
pub(crate) fn map_source_stream(
    query: CompiledQuery,
    context: Context,
    variables: Object,
    source: ValuesStream,
) -> ResponseStream {
    source
        .then(move |event| {
            let query = query.clone();
            let context = context.clone();
            let variables = variables.clone();
            async move {
                match event {
                    Ok(payload) => query.execute_event(payload, &context, &variables).await,
                    Err(error) => Response::from_errors(vec![event_error(&query, error)]),
                }
            }
        })
        .boxed()
}

/// A failed event carries the subscription root field's location and
/// path, like any other per-field failure.
fn event_error(query: &CompiledQuery, error: FieldError) -> ExecutionError {
    let (position, path) = query
        .root_field_locus()
        .unwrap_or_else(|| (SourcePosition::new_origin(), Vec::new()));
    ExecutionError::new(position, path, error)
}

/// An error from the subscribe function itself, reported before any event
/// flowed.
pub(crate) fn subscribe_failure(query: &CompiledQuery, error: FieldError) -> Response {
    Response::from_errors(vec![event_error(query, error)])
}

pub(crate) fn missing_source_error(field: &str) -> FieldResult<ValuesStream> {
    Err(FieldError::from(format!(
        "Subscription field \"{field}\" is missing a source stream resolver."
    )))
}
