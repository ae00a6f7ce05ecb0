//! Contracts between the engine and user-supplied callbacks.

use std::{any::Any, sync::Arc};

use futures::{future::BoxFuture, stream::BoxStream};
use indexmap::IndexMap;

use crate::{
    ast::InputValue,
    error::FieldResult,
    look_ahead::ResolveInfo,
    value::{Object, Value},
};

/// The map of raw variable values passed into a query invocation.
///
/// Usually deserialized straight from the request's JSON `variables` member.
pub type Variables = IndexMap<String, InputValue>;

/// Boxed stream of source events or mapped results.
pub type ValuesStream = BoxStream<'static, FieldResult<Value>>;

/// The per-request context handed through to every resolver.
///
/// The schema is data-driven, so the context is dynamically typed: wrap any
/// `Send + Sync` state and downcast it back inside resolvers with
/// [`Context::get`].
#[derive(Clone)]
pub struct Context(Arc<dyn Any + Send + Sync>);

impl Context {
    /// Wraps a context value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// A context carrying nothing.
    pub fn empty() -> Self {
        Self(Arc::new(()))
    }

    /// Downcasts back to the wrapped type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::empty()
    }
}

/// What a resolver produced: either a value that is already available, or
/// work that is still pending.
///
/// The engine suspends exclusively at [`Resolved::Future`] boundaries;
/// everything else it does is synchronous.
pub enum Resolved {
    /// An immediately available value.
    Value(Value),
    /// A value still being produced.
    Future(BoxFuture<'static, FieldResult<Value>>),
}

impl Resolved {
    /// Wraps an immediately available value.
    pub fn value(v: impl Into<Value>) -> FieldResult<Self> {
        Ok(Self::Value(v.into()))
    }

    /// Wraps pending work.
    pub fn future<F>(fut: F) -> FieldResult<Self>
    where
        F: std::future::Future<Output = FieldResult<Value>> + Send + 'static,
    {
        Ok(Self::Future(Box::pin(fut)))
    }
}

impl From<Value> for Resolved {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

/// Everything a resolver gets to see for one field invocation.
pub struct ResolverParams<'a> {
    /// The value the enclosing object resolved to.
    pub parent: &'a Value,
    /// The coerced argument object, static literals and runtime variables
    /// already merged.
    pub args: &'a Object,
    /// The per-request context.
    pub context: &'a Context,
    /// Static and per-request details about the field being resolved.
    pub info: &'a ResolveInfo<'a>,
}

/// A field resolver.
pub type ResolveFn =
    Arc<dyn for<'a> Fn(ResolverParams<'a>) -> FieldResult<Resolved> + Send + Sync>;

/// A subscription source-stream producer, attached to a root subscription
/// field.
pub type SubscribeFn =
    Arc<dyn for<'a> Fn(ResolverParams<'a>) -> FieldResult<ValuesStream> + Send + Sync>;

/// Resolves the concrete object type of a value observed at an abstract
/// position. Returning `None` defers to the `__typename` property and
/// `is_type_of` chain.
pub type ResolveTypeFn =
    Arc<dyn for<'a> Fn(&'a Value, &'a Context, &'a ResolveInfo<'a>) -> Option<String> + Send + Sync>;

/// Tells whether a value is of the object type the callback is attached to.
/// Synchronous by construction.
pub type IsTypeOfFn = Arc<dyn Fn(&Value, &Context) -> bool + Send + Sync>;

/// The default resolver: a plain property read from the parent object.
pub(crate) fn default_resolve(parent: &Value, field_name: &str) -> Value {
    parent
        .as_object_value()
        .and_then(|o| o.get_field_value(field_name))
        .cloned()
        .unwrap_or(Value::Null)
}
