//! The static schema the compiler reads: the type registry plus the
//! callbacks attached to it.

pub mod build;
pub mod meta;
pub mod model;

pub use self::{
    build::{SchemaBuilder, SchemaError},
    model::SchemaType,
};
