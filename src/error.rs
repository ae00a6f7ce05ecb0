//! Field-level and compilation-level error types.

use std::{backtrace::Backtrace, cmp::Ordering, error::Error, fmt, sync::Arc};

use derive_more::{Display, Error as DeriveError};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{
    parser::SourcePosition,
    path::PathSegment,
    value::Value,
};

/// Error type for errors that occur during field resolution.
///
/// Field errors are represented by a human-readable error message and an
/// optional [`Value`] structure with additional information. They can be
/// converted from any type that implements [`Display`], which makes error
/// chaining with the `?` operator a breeze inside resolvers.
#[derive(Clone, Debug)]
pub struct FieldError {
    message: String,
    extensions: Value,
    original: Option<Arc<dyn Error + Send + Sync + 'static>>,
}

impl<T: fmt::Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self {
            message: e.to_string(),
            extensions: Value::Null,
            original: None,
        }
    }
}

impl PartialEq for FieldError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.extensions == other.extensions
    }
}

impl FieldError {
    /// Constructs a new [`FieldError`] with additional data.
    ///
    /// The `extensions` value is included under the `"extensions"` key of
    /// the serialized error, unless it is [`Value::Null`].
    #[must_use]
    pub fn new<T: fmt::Display>(e: T, extensions: Value) -> Self {
        Self {
            message: e.to_string(),
            extensions,
            original: None,
        }
    }

    /// Constructs a [`FieldError`] that keeps the thrown error itself
    /// reachable through [`FieldError::original_error`], so callers can
    /// downcast to their own error types.
    #[must_use]
    pub fn from_error<E: Error + Send + Sync + 'static>(e: E) -> Self {
        let message = e.to_string();
        Self {
            message,
            extensions: Value::Null,
            original: Some(Arc::new(e)),
        }
    }

    /// Returns the `"message"` field of this error.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the `"extensions"` field of this error.
    ///
    /// If there are none, [`Value::Null`] is returned.
    #[must_use]
    pub fn extensions(&self) -> &Value {
        &self.extensions
    }

    /// The error value originally produced by the resolver, if it was
    /// reported through [`FieldError::from_error`]. Identity is preserved:
    /// this is the same allocation the resolver handed over.
    #[must_use]
    pub fn original_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.original.as_deref()
    }
}

/// The result of resolving the value of a field.
pub type FieldResult<T> = Result<T, FieldError>;

/// Error type for errors that occur during query execution.
///
/// All execution errors contain the source position in the query of the
/// field that failed to resolve, and the response path down to it.
#[derive(Clone, Debug)]
pub struct ExecutionError {
    location: SourcePosition,
    path: Vec<PathSegment>,
    error: FieldError,
    backtrace: Option<Arc<Backtrace>>,
}

impl PartialEq for ExecutionError {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location && self.path == other.path && self.error == other.error
    }
}

impl Eq for ExecutionError {}

impl PartialOrd for ExecutionError {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExecutionError {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.location, &self.path, self.error.message()).cmp(&(
            &other.location,
            &other.path,
            other.error.message(),
        ))
    }
}

impl ExecutionError {
    #[doc(hidden)]
    pub fn new(location: SourcePosition, path: Vec<PathSegment>, error: FieldError) -> Self {
        Self {
            location,
            path,
            error,
            backtrace: None,
        }
    }

    /// Constructs a new execution error located at the beginning of the
    /// query, with no path.
    pub fn at_origin(error: FieldError) -> Self {
        Self::new(SourcePosition::new_origin(), Vec::new(), error)
    }

    pub(crate) fn with_captured_backtrace(mut self) -> Self {
        self.backtrace = Some(Arc::new(Backtrace::capture()));
        self
    }

    /// The underlying [`FieldError`].
    pub fn error(&self) -> &FieldError {
        &self.error
    }

    /// The source location in the query of the field that failed.
    pub fn location(&self) -> &SourcePosition {
        &self.location
    }

    /// The path of response keys and list indices leading to the field
    /// that generated this error.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// The backtrace captured where the error was recorded, unless capture
    /// was disabled.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }
}

impl Serialize for ExecutionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("message", self.error.message())?;
        map.serialize_entry("locations", &[self.location])?;
        if !self.path.is_empty() {
            map.serialize_entry("path", &self.path)?;
        }
        if !self.error.extensions().is_null() {
            map.serialize_entry("extensions", self.error.extensions())?;
        }
        map.end()
    }
}

/// An error that prevented a document from being compiled into a
/// [`crate::CompiledQuery`].
#[derive(Clone, Debug, Display, DeriveError, PartialEq)]
pub enum CompileError {
    /// The document contains no executable operation.
    #[display("Must provide an operation.")]
    NoOperationProvided,

    /// The document contains multiple operations and no name was given.
    #[display("Must provide operation name if query contains multiple operations.")]
    MultipleOperationsProvided,

    /// The named operation was not found in the document.
    #[display("Unknown operation named \"{_0}\".")]
    UnknownOperationName(#[error(not(source))] String),

    /// `subscribe` was requested for a query or mutation.
    #[display("Operation is not a subscription.")]
    NotSubscription,

    /// `query` was requested for a subscription.
    #[display("Operation is a subscription.")]
    IsSubscription,

    /// The schema has no root type for the operation's kind.
    #[display("Schema is not configured for {_0}s.")]
    UnsupportedOperation(#[error(not(source))] String),

    /// A `@skip`/`@include` directive is malformed.
    #[display("{message}")]
    InvalidDirective {
        message: String,
        #[error(not(source))]
        position: SourcePosition,
    },

    /// A variable is used in a position its declaration cannot satisfy.
    #[display("{message}")]
    InvalidVariableUsage {
        message: String,
        #[error(not(source))]
        position: SourcePosition,
    },

    /// A fragment's type condition names a type missing from the schema.
    #[display("Unknown type \"{name}\" in fragment type condition.")]
    MissingFragmentType {
        name: String,
        #[error(not(source))]
        position: SourcePosition,
    },

    /// A named fragment is spread but never defined.
    #[display("Unknown fragment \"{name}\".")]
    UnknownFragment {
        name: String,
        #[error(not(source))]
        position: SourcePosition,
    },

    /// An argument or variable literal cannot be coerced to its type.
    #[display("{message}")]
    InvalidLiteral {
        message: String,
        #[error(not(source))]
        position: SourcePosition,
    },

    /// A field's declared type names a type missing from the schema.
    #[display("Unknown type \"{name}\".")]
    UnknownType {
        name: String,
        #[error(not(source))]
        position: SourcePosition,
    },

    /// A selected field does not exist on its parent type.
    #[display("Cannot query field \"{field_name}\" on type \"{type_name}\".")]
    UnknownField {
        type_name: String,
        field_name: String,
        #[error(not(source))]
        position: SourcePosition,
    },

    /// A variable declaration names a type missing from the schema, or a
    /// type that is not an input type.
    #[display("{message}")]
    InvalidVariableType {
        message: String,
        #[error(not(source))]
        position: SourcePosition,
    },
}

impl CompileError {
    /// The position the error points at, when it has one.
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Self::InvalidDirective { position, .. }
            | Self::InvalidVariableUsage { position, .. }
            | Self::MissingFragmentType { position, .. }
            | Self::UnknownFragment { position, .. }
            | Self::InvalidLiteral { position, .. }
            | Self::UnknownType { position, .. }
            | Self::UnknownField { position, .. }
            | Self::InvalidVariableType { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Renders this compilation failure in the response error shape, for
    /// hosts that reply with `{"errors": [...]}` instead of a panic.
    pub fn into_execution_error(self) -> ExecutionError {
        let location = self.position().unwrap_or_else(SourcePosition::new_origin);
        ExecutionError::new(location, Vec::new(), FieldError::from(self))
    }
}
