//! Compile-time coercion of document literals.
//!
//! Static argument values are coerced once, while planning. Variables
//! encountered inside a literal leave a `null` placeholder in the coerced
//! value and a [`MissingVariable`] record carrying the position of the
//! hole, so the engine can splice runtime values in without re-reading the
//! document.

use crate::{
    ast::{InputValue, Type},
    error::CompileError,
    parser::Spanning,
    path::PathSegment,
    plan::MissingVariable,
    schema::{
        meta::{is_builtin_scalar, MetaType, ScalarMeta},
        SchemaType,
    },
    value::{Object, ScalarValue, Value},
};

pub(crate) struct LiteralCoercer<'a> {
    pub(crate) schema: &'a SchemaType,
    /// The argument being coerced, for path recording and messages.
    pub(crate) argument: &'a str,
    pub(crate) missing: Vec<MissingVariable>,
}

impl<'a> LiteralCoercer<'a> {
    pub(crate) fn new(schema: &'a SchemaType, argument: &'a str) -> Self {
        Self {
            schema,
            argument,
            missing: Vec::new(),
        }
    }

    /// The spec-defined `valueFromAST` for one literal.
    pub(crate) fn coerce(
        &mut self,
        value: &Spanning<InputValue>,
        expected: &Type,
        path: &mut Vec<PathSegment>,
    ) -> Result<Value, CompileError> {
        if let InputValue::Variable(name) = &value.item {
            self.missing.push(MissingVariable {
                name: name.clone(),
                path: path.clone(),
                non_null: expected.is_non_null(),
                expected: expected.clone(),
                argument: self.argument.into(),
            });
            return Ok(Value::Null);
        }

        if expected.is_non_null() {
            if value.item.is_null() {
                return Err(self.invalid(
                    value,
                    format!("Expected value of type \"{expected}\", found null."),
                ));
            }
            return self.coerce(value, &expected.clone().into_nullable(), path);
        }

        if value.item.is_null() {
            return Ok(Value::Null);
        }

        if let Some(inner) = expected.list_inner() {
            return match &value.item {
                InputValue::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (idx, item) in items.iter().enumerate() {
                        path.push(PathSegment::Index(idx));
                        let coerced = self.coerce(item, inner, path);
                        path.pop();
                        out.push(coerced?);
                    }
                    Ok(Value::List(out))
                }
                // Input coercion wraps a single value into a one-element
                // list.
                _ => {
                    path.push(PathSegment::Index(0));
                    let coerced = self.coerce(value, inner, path);
                    path.pop();
                    Ok(Value::List(vec![coerced?]))
                }
            };
        }

        let type_name = expected.innermost_name();
        let Some(meta) = self.schema.concrete_type_by_name(type_name) else {
            return Err(self.invalid(value, format!("Unknown type \"{type_name}\".")));
        };
        match meta {
            MetaType::Scalar(scalar) => self.coerce_scalar(value, scalar),
            MetaType::Enum(e) => match value.item.as_enum_value() {
                Some(name) if e.has_value(name) => Ok(Value::scalar(name)),
                _ => Err(self.invalid(
                    value,
                    format!("Expected value of type \"{}\", found {}.", e.name, value.item),
                )),
            },
            MetaType::InputObject(io) => {
                let Some(provided) = value.item.to_object_value() else {
                    return Err(self.invalid(
                        value,
                        format!("Expected value of type \"{}\", found {}.", io.name, value.item),
                    ));
                };
                for key in provided.keys() {
                    if io.input_fields.iter().all(|f| f.name != *key) {
                        return Err(self.invalid(
                            value,
                            format!("Field \"{key}\" is not defined by type \"{}\".", io.name),
                        ));
                    }
                }
                let mut out = Object::with_capacity(io.input_fields.len());
                for field in &io.input_fields {
                    match provided.get(field.name.as_str()).copied() {
                        Some(inner) => {
                            path.push(PathSegment::Key(field.name.to_string()));
                            let coerced = self.coerce(
                                &Spanning::new(value.start, inner.clone()),
                                &field.arg_type,
                                path,
                            );
                            path.pop();
                            out.add_field(field.name.as_str(), coerced?);
                        }
                        None => {
                            if let Some(default) = &field.default_value {
                                path.push(PathSegment::Key(field.name.to_string()));
                                let coerced = self.coerce(
                                    &Spanning::new(value.start, default.clone()),
                                    &field.arg_type,
                                    path,
                                );
                                path.pop();
                                out.add_field(field.name.as_str(), coerced?);
                            } else if field.arg_type.is_non_null() {
                                return Err(self.invalid(
                                    value,
                                    format!(
                                        "Field \"{}\" of required type \"{}\" was not provided.",
                                        field.name, field.arg_type,
                                    ),
                                ));
                            }
                        }
                    }
                }
                Ok(Value::Object(out))
            }
            _ => Err(self.invalid(
                value,
                format!("Type \"{type_name}\" is not an input type."),
            )),
        }
    }

    fn coerce_scalar(
        &self,
        value: &Spanning<InputValue>,
        scalar: &ScalarMeta,
    ) -> Result<Value, CompileError> {
        if is_builtin_scalar(&scalar.name) {
            return builtin_scalar_literal(&scalar.name, &value.item).ok_or_else(|| {
                self.invalid(
                    value,
                    format!(
                        "Expected value of type \"{}\", found {}.",
                        scalar.name, value.item,
                    ),
                )
            });
        }
        match scalar.parse_literal.as_ref().or(scalar.parse_value.as_ref()) {
            Some(parse) => parse(&value.item).map_err(|reason| {
                self.invalid(
                    value,
                    format!(
                        "Expected value of type \"{}\", found {}; {reason}",
                        scalar.name, value.item,
                    ),
                )
            }),
            None => Ok(super::input_to_value(&value.item)),
        }
    }

    fn invalid(&self, value: &Spanning<InputValue>, message: String) -> CompileError {
        CompileError::InvalidLiteral {
            message: format!("Argument \"{}\": {message}", self.argument),
            position: value.start,
        }
    }
}

pub(crate) fn builtin_scalar_literal(name: &str, value: &InputValue) -> Option<Value> {
    let scalar = value.as_scalar();
    match name {
        "Int" => match scalar? {
            ScalarValue::Int(i) => Some(Value::scalar(*i)),
            _ => None,
        },
        "Float" => match scalar? {
            ScalarValue::Int(i) => Some(Value::scalar(f64::from(*i))),
            ScalarValue::Float(f) => Some(Value::scalar(*f)),
            _ => None,
        },
        "String" => match scalar? {
            ScalarValue::String(s) => Some(Value::scalar(s.as_str())),
            _ => None,
        },
        "Boolean" => match scalar? {
            ScalarValue::Boolean(b) => Some(Value::scalar(*b)),
            _ => None,
        },
        "ID" => match scalar? {
            ScalarValue::String(s) => Some(Value::scalar(s.as_str())),
            ScalarValue::Int(i) => Some(Value::scalar(i.to_string())),
            _ => None,
        },
        _ => None,
    }
}
