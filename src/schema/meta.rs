//! Types used to describe a schema.
//!
//! The registry is data-driven: resolvers, type resolvers and scalar
//! callbacks are attached to the metadata records instead of being derived
//! from Rust types.

use std::sync::Arc;

use arcstr::ArcStr;

use crate::{
    ast::{InputValue, Type},
    resolve::{IsTypeOfFn, ResolveFn, ResolveTypeFn, SubscribeFn},
    value::Value,
};

/// Converts an external input value into the internal value of a custom
/// scalar. An `Err` carries the human-readable reason.
pub type ParseScalarFn = Arc<dyn Fn(&InputValue) -> Result<Value, String> + Send + Sync>;

/// Converts an internal leaf value into its response representation.
pub type SerializeScalarFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Whether an item is deprecated, with context.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum DeprecationStatus {
    /// The field/variant is not deprecated.
    #[default]
    Current,
    /// The field/variant is deprecated, with an optional reason.
    Deprecated(Option<ArcStr>),
}

impl DeprecationStatus {
    /// If this deprecation status indicates the item is deprecated.
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Self::Deprecated(_))
    }
}

/// Scalar type metadata.
#[derive(Clone)]
pub struct ScalarMeta {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    /// Coercion of variable values; `None` for the five built-ins and any
    /// custom scalar that accepts every input shape unchanged.
    pub(crate) parse_value: Option<ParseScalarFn>,
    /// Coercion of document literals; defaults to `parse_value`.
    pub(crate) parse_literal: Option<ParseScalarFn>,
    /// Output coercion; `None` means pass-through.
    pub(crate) serialize: Option<SerializeScalarFn>,
}

/// Object type metadata.
#[derive(Clone)]
pub struct ObjectMeta {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub fields: Vec<Field>,
    pub interface_names: Vec<ArcStr>,
    pub(crate) is_type_of: Option<IsTypeOfFn>,
}

/// Enum type metadata.
#[derive(Clone, Debug)]
pub struct EnumMeta {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub values: Vec<EnumValue>,
}

impl EnumMeta {
    /// Whether `name` is one of the declared values.
    pub fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }
}

/// Interface type metadata.
#[derive(Clone)]
pub struct InterfaceMeta {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub fields: Vec<Field>,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

/// Union type metadata.
#[derive(Clone)]
pub struct UnionMeta {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub of_type_names: Vec<ArcStr>,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

/// Input object metadata.
#[derive(Clone)]
pub struct InputObjectMeta {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub input_fields: Vec<Argument>,
}

/// Generic type metadata.
///
/// List and non-`null` wrappers are not registry entries; they live on the
/// [`Type`] literals referencing these records.
#[derive(Clone)]
pub enum MetaType {
    Scalar(ScalarMeta),
    Object(ObjectMeta),
    Enum(EnumMeta),
    Interface(InterfaceMeta),
    Union(UnionMeta),
    InputObject(InputObjectMeta),
}

/// Metadata for a field.
#[derive(Clone)]
pub struct Field {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub arguments: Vec<Argument>,
    pub field_type: Type,
    pub deprecation_status: DeprecationStatus,
    pub(crate) resolver: Option<ResolveFn>,
    pub(crate) subscribe: Option<SubscribeFn>,
}

impl Field {
    /// Access an argument's metadata given its name.
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// Metadata for an argument to a field, or for an input object field.
#[derive(Clone)]
pub struct Argument {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub arg_type: Type,
    pub default_value: Option<InputValue>,
}

/// Metadata for a single value in an enum.
#[derive(Clone, Debug)]
pub struct EnumValue {
    /// The string literal representation of the value in responses.
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub deprecation_status: DeprecationStatus,
}

impl MetaType {
    /// Access the name of the type.
    pub fn name(&self) -> &ArcStr {
        match self {
            Self::Scalar(ScalarMeta { name, .. })
            | Self::Object(ObjectMeta { name, .. })
            | Self::Enum(EnumMeta { name, .. })
            | Self::Interface(InterfaceMeta { name, .. })
            | Self::Union(UnionMeta { name, .. })
            | Self::InputObject(InputObjectMeta { name, .. }) => name,
        }
    }

    /// Access a field's metadata given its name.
    ///
    /// Only objects and interfaces have fields; this always returns `None`
    /// for other types.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Object(ObjectMeta { fields, .. })
            | Self::Interface(InterfaceMeta { fields, .. }) => {
                fields.iter().find(|f| f.name == name)
            }
            _ => None,
        }
    }

    /// Access an input field's metadata given its name.
    pub fn input_field_by_name(&self, name: &str) -> Option<&Argument> {
        match self {
            Self::InputObject(InputObjectMeta { input_fields, .. }) => {
                input_fields.iter().find(|f| f.name == name)
            }
            _ => None,
        }
    }

    /// Objects, interfaces and unions are composite.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }

    /// Only enums and scalars can occur in leaf positions.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_))
    }

    /// Only interfaces and unions are abstract.
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// Only scalars, enums and input objects can be used in input
    /// positions, e.g. arguments or variables.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_))
    }

    pub(crate) fn resolve_type_fn(&self) -> Option<&ResolveTypeFn> {
        match self {
            Self::Interface(InterfaceMeta { resolve_type, .. })
            | Self::Union(UnionMeta { resolve_type, .. }) => resolve_type.as_ref(),
            _ => None,
        }
    }
}

/// Whether `name` is one of the scalars every schema carries.
pub fn is_builtin_scalar(name: &str) -> bool {
    matches!(name, "Int" | "Float" | "String" | "Boolean" | "ID")
}
