//! Building a [`SchemaType`] from SDL plus attached callbacks.
//!
//! The type shapes come from SDL text parsed by [`graphql_parser`]; the
//! behavior (resolvers, type resolvers, scalar coercion) is attached
//! programmatically before [`SchemaBuilder::finish`] seals the registry.

use std::sync::Arc;

use arcstr::ArcStr;
use derive_more::{Display, Error as DeriveError};
use fnv::FnvHashMap;

use super::{
    meta::{
        Argument, DeprecationStatus, EnumMeta, EnumValue, Field, InputObjectMeta, InterfaceMeta,
        MetaType, ObjectMeta, ParseScalarFn, ScalarMeta, SerializeScalarFn, UnionMeta,
    },
    model::SchemaType,
};
use crate::{
    error::FieldResult,
    parser::{lower_type, lower_value},
    resolve::{Resolved, ResolverParams, ValuesStream},
    value::Value,
};

type SdlDocument<'a> = graphql_parser::schema::Document<'a, String>;
type SdlDefinition<'a> = graphql_parser::schema::Definition<'a, String>;
type SdlTypeDefinition<'a> = graphql_parser::schema::TypeDefinition<'a, String>;
type SdlField<'a> = graphql_parser::schema::Field<'a, String>;
type SdlInputValue<'a> = graphql_parser::schema::InputValue<'a, String>;
type SdlDirective<'a> = graphql_parser::schema::Directive<'a, String>;

/// An error raised while assembling a schema.
#[derive(Clone, Debug, Display, DeriveError, PartialEq)]
pub enum SchemaError {
    /// The SDL text did not parse.
    #[display("Schema parse error: {_0}")]
    Parse(#[error(not(source))] String),

    /// A callback was attached to a type the SDL does not declare.
    #[display("Unknown type \"{_0}\".")]
    UnknownType(#[error(not(source))] String),

    /// A resolver was attached to a type that has no fields.
    #[display("Type \"{_0}\" cannot carry field resolvers.")]
    NotAnObject(#[error(not(source))] String),

    /// A resolver was attached to a field the type does not declare.
    #[display("Unknown field \"{field}\" on type \"{type_name}\".")]
    UnknownField { type_name: String, field: String },

    /// A type resolver was attached to a non-abstract type.
    #[display("Type \"{_0}\" is not an interface or union.")]
    NotAbstract(#[error(not(source))] String),

    /// Scalar callbacks were attached to a non-scalar type.
    #[display("Type \"{_0}\" is not a scalar.")]
    NotAScalar(#[error(not(source))] String),

    /// The SDL declares no query root type.
    #[display("Schema must declare a query root type.")]
    MissingQueryRoot,
}

/// Assembles a [`SchemaType`] from SDL and attached behavior.
pub struct SchemaBuilder {
    types: FnvHashMap<ArcStr, MetaType>,
    query_type_name: Option<ArcStr>,
    mutation_type_name: Option<ArcStr>,
    subscription_type_name: Option<ArcStr>,
    errors: Vec<SchemaError>,
}

impl SchemaBuilder {
    /// Parses SDL text and seeds the registry from it.
    ///
    /// Root operation types come from the `schema { ... }` definition when
    /// present, else from types conventionally named `Query`, `Mutation`
    /// and `Subscription`.
    pub fn from_sdl(sdl: &str) -> Result<Self, SchemaError> {
        let document: SdlDocument<'_> = graphql_parser::parse_schema(sdl)
            .map_err(|e| SchemaError::Parse(e.to_string()))?;

        let mut builder = Self {
            types: FnvHashMap::default(),
            query_type_name: None,
            mutation_type_name: None,
            subscription_type_name: None,
            errors: Vec::new(),
        };
        for name in ["Int", "Float", "String", "Boolean", "ID"] {
            builder.insert_scalar(ArcStr::from(name), None);
        }

        for def in &document.definitions {
            match def {
                SdlDefinition::SchemaDefinition(s) => {
                    builder.query_type_name = s.query.as_deref().map(ArcStr::from);
                    builder.mutation_type_name = s.mutation.as_deref().map(ArcStr::from);
                    builder.subscription_type_name = s.subscription.as_deref().map(ArcStr::from);
                }
                SdlDefinition::TypeDefinition(t) => builder.insert_type_definition(t),
                SdlDefinition::TypeExtension(_) | SdlDefinition::DirectiveDefinition(_) => {}
            }
        }

        for (slot, conventional) in [
            (&mut builder.query_type_name, "Query"),
            (&mut builder.mutation_type_name, "Mutation"),
            (&mut builder.subscription_type_name, "Subscription"),
        ] {
            if slot.is_none() && builder.types.contains_key(conventional) {
                *slot = Some(ArcStr::from(conventional));
            }
        }

        Ok(builder)
    }

    fn insert_scalar(&mut self, name: ArcStr, description: Option<ArcStr>) {
        self.types.insert(
            name.clone(),
            MetaType::Scalar(ScalarMeta {
                name,
                description,
                parse_value: None,
                parse_literal: None,
                serialize: None,
            }),
        );
    }

    fn insert_type_definition(&mut self, def: &SdlTypeDefinition<'_>) {
        match def {
            SdlTypeDefinition::Scalar(s) => {
                self.insert_scalar(ArcStr::from(s.name.as_str()), desc(&s.description));
            }
            SdlTypeDefinition::Object(o) => {
                let meta = ObjectMeta {
                    name: ArcStr::from(o.name.as_str()),
                    description: desc(&o.description),
                    fields: o.fields.iter().map(lower_field).collect(),
                    interface_names: o
                        .implements_interfaces
                        .iter()
                        .map(|i| ArcStr::from(i.as_str()))
                        .collect(),
                    is_type_of: None,
                };
                self.types.insert(meta.name.clone(), MetaType::Object(meta));
            }
            SdlTypeDefinition::Interface(i) => {
                let meta = InterfaceMeta {
                    name: ArcStr::from(i.name.as_str()),
                    description: desc(&i.description),
                    fields: i.fields.iter().map(lower_field).collect(),
                    resolve_type: None,
                };
                self.types
                    .insert(meta.name.clone(), MetaType::Interface(meta));
            }
            SdlTypeDefinition::Union(u) => {
                let meta = UnionMeta {
                    name: ArcStr::from(u.name.as_str()),
                    description: desc(&u.description),
                    of_type_names: u.types.iter().map(|t| ArcStr::from(t.as_str())).collect(),
                    resolve_type: None,
                };
                self.types.insert(meta.name.clone(), MetaType::Union(meta));
            }
            SdlTypeDefinition::Enum(e) => {
                let meta = EnumMeta {
                    name: ArcStr::from(e.name.as_str()),
                    description: desc(&e.description),
                    values: e
                        .values
                        .iter()
                        .map(|v| EnumValue {
                            name: ArcStr::from(v.name.as_str()),
                            description: desc(&v.description),
                            deprecation_status: deprecation(&v.directives),
                        })
                        .collect(),
                };
                self.types.insert(meta.name.clone(), MetaType::Enum(meta));
            }
            SdlTypeDefinition::InputObject(io) => {
                let meta = InputObjectMeta {
                    name: ArcStr::from(io.name.as_str()),
                    description: desc(&io.description),
                    input_fields: io.fields.iter().map(lower_argument).collect(),
                };
                self.types
                    .insert(meta.name.clone(), MetaType::InputObject(meta));
            }
        }
    }

    /// Attaches a resolver to `type_name.field`.
    #[must_use]
    pub fn resolver<F>(mut self, type_name: &str, field: &str, f: F) -> Self
    where
        F: for<'a> Fn(ResolverParams<'a>) -> FieldResult<Resolved> + Send + Sync + 'static,
    {
        match self.field_mut(type_name, field) {
            Ok(meta) => meta.resolver = Some(Arc::new(f)),
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Attaches a subscription source function to `type_name.field`.
    #[must_use]
    pub fn subscription<F>(mut self, type_name: &str, field: &str, f: F) -> Self
    where
        F: for<'a> Fn(ResolverParams<'a>) -> FieldResult<ValuesStream> + Send + Sync + 'static,
    {
        match self.field_mut(type_name, field) {
            Ok(meta) => meta.subscribe = Some(Arc::new(f)),
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Attaches a type resolver to an interface or union.
    #[must_use]
    pub fn resolve_type<F>(mut self, type_name: &str, f: F) -> Self
    where
        F: for<'a> Fn(&'a Value, &'a crate::resolve::Context, &'a crate::look_ahead::ResolveInfo<'a>) -> Option<String>
            + Send
            + Sync
            + 'static,
    {
        let f = Arc::new(f);
        match self.types.get_mut(type_name) {
            Some(MetaType::Interface(i)) => i.resolve_type = Some(f),
            Some(MetaType::Union(u)) => u.resolve_type = Some(f),
            Some(_) => self.errors.push(SchemaError::NotAbstract(type_name.into())),
            None => self.errors.push(SchemaError::UnknownType(type_name.into())),
        }
        self
    }

    /// Attaches an `is_type_of` predicate to an object type.
    #[must_use]
    pub fn is_type_of<F>(mut self, type_name: &str, f: F) -> Self
    where
        F: Fn(&Value, &crate::resolve::Context) -> bool + Send + Sync + 'static,
    {
        match self.types.get_mut(type_name) {
            Some(MetaType::Object(o)) => o.is_type_of = Some(Arc::new(f)),
            Some(_) => self.errors.push(SchemaError::NotAnObject(type_name.into())),
            None => self.errors.push(SchemaError::UnknownType(type_name.into())),
        }
        self
    }

    /// Attaches coercion callbacks to a custom scalar declared in the SDL.
    #[must_use]
    pub fn scalar(
        mut self,
        type_name: &str,
        parse_value: Option<ParseScalarFn>,
        serialize: Option<SerializeScalarFn>,
    ) -> Self {
        match self.types.get_mut(type_name) {
            Some(MetaType::Scalar(s)) => {
                s.parse_value = parse_value.clone();
                s.parse_literal = parse_value;
                s.serialize = serialize;
            }
            Some(_) => self.errors.push(SchemaError::NotAScalar(type_name.into())),
            None => self.errors.push(SchemaError::UnknownType(type_name.into())),
        }
        self
    }

    fn field_mut(&mut self, type_name: &str, field: &str) -> Result<&mut Field, SchemaError> {
        let fields = match self.types.get_mut(type_name) {
            Some(MetaType::Object(o)) => &mut o.fields,
            Some(MetaType::Interface(i)) => &mut i.fields,
            Some(_) => return Err(SchemaError::NotAnObject(type_name.into())),
            None => return Err(SchemaError::UnknownType(type_name.into())),
        };
        fields
            .iter_mut()
            .find(|f| f.name == field)
            .ok_or_else(|| SchemaError::UnknownField {
                type_name: type_name.into(),
                field: field.into(),
            })
    }

    /// Seals the registry.
    pub fn finish(mut self) -> Result<Arc<SchemaType>, SchemaError> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }
        let query_type_name = self.query_type_name.ok_or(SchemaError::MissingQueryRoot)?;
        if !self.types.contains_key(&query_type_name) {
            return Err(SchemaError::UnknownType(query_type_name.to_string()));
        }
        Ok(Arc::new(SchemaType {
            types: self.types,
            query_type_name,
            mutation_type_name: self.mutation_type_name,
            subscription_type_name: self.subscription_type_name,
        }))
    }
}

fn desc(description: &Option<String>) -> Option<ArcStr> {
    description.as_deref().map(ArcStr::from)
}

fn lower_field(field: &SdlField<'_>) -> Field {
    Field {
        name: ArcStr::from(field.name.as_str()),
        description: desc(&field.description),
        arguments: field.arguments.iter().map(lower_argument).collect(),
        field_type: lower_type(&field.field_type),
        deprecation_status: deprecation(&field.directives),
        resolver: None,
        subscribe: None,
    }
}

fn lower_argument(input: &SdlInputValue<'_>) -> Argument {
    Argument {
        name: ArcStr::from(input.name.as_str()),
        description: desc(&input.description),
        arg_type: lower_type(&input.value_type),
        default_value: input.default_value.as_ref().map(lower_value),
    }
}

fn deprecation(directives: &[SdlDirective<'_>]) -> DeprecationStatus {
    directives
        .iter()
        .find(|d| d.name == "deprecated")
        .map(|d| {
            let reason = d.arguments.iter().find(|(n, _)| n == "reason").and_then(
                |(_, v)| match v {
                    graphql_parser::query::Value::String(s) => Some(ArcStr::from(s.as_str())),
                    _ => None,
                },
            );
            DeprecationStatus::Deprecated(reason)
        })
        .unwrap_or(DeprecationStatus::Current)
}
