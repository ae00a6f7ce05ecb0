//! Compiled GraphQL query execution.
//!
//! `graphql-bolt` replaces per-request tree-walking interpretation with a
//! per-query specialized executor: [`compile`] walks schema × document
//! once — flattening fragments, synthesizing skip/include predicates,
//! coercing static arguments, binding leaf serializers and building the
//! nullability map — and returns a reusable [`CompiledQuery`]. Invoking it
//! only coerces variables, drives resolvers and assembles `{data,
//! errors}`.
//!
//! Parsing stays external: hand a [`graphql_parser`] document to
//! [`parser::lower_document`] and the result to [`compile`]. Schemas are
//! data-driven, built from SDL with callbacks attached:
//!
//! ```
//! use graphql_bolt::{
//!     compile, parser::lower_document, CompilerOptions, Context, Resolved, SchemaBuilder,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = SchemaBuilder::from_sdl("type Query { hello: String }")?
//!     .resolver("Query", "hello", |_| Resolved::value("world"))
//!     .finish()?;
//!
//! let document = lower_document(&graphql_parser::parse_query::<String>("{ hello }")?);
//! let query = compile(&schema, &document, None, CompilerOptions::default())?;
//!
//! let response = query.query_sync(
//!     graphql_bolt::Value::Null,
//!     Context::empty(),
//!     Default::default(),
//! )?;
//! assert!(response.is_ok());
//! # Ok(())
//! # }
//! ```

pub mod ast;
mod coerce;
mod collect;
mod compiled;
mod engine;
mod error;
mod integrations;
mod look_ahead;
mod macros;
pub mod parser;
mod path;
mod plan;
mod resolve;
mod response;
pub mod schema;
mod serialize;
mod subscription;
pub mod value;

#[cfg(test)]
mod executor_tests;

pub use crate::{
    compiled::{compile, CompiledQuery, CompilerOptions},
    error::{CompileError, ExecutionError, FieldError, FieldResult},
    look_ahead::{
        field_expansion_enricher, EnricherSeed, ExpansionField, FieldExpansion, InfoEnricher,
        ResolveInfo, TypeExpansion,
    },
    path::PathSegment,
    resolve::{
        Context, Resolved, ResolveFn, ResolverParams, SubscribeFn, ValuesStream, Variables,
    },
    response::Response,
    schema::{SchemaBuilder, SchemaError, SchemaType},
    subscription::ResponseStream,
    value::{Object, ScalarValue, Value},
};
