//! Per-operation variable coercion.
//!
//! Compilation produces a [`VariablePlan`]: declared types resolved,
//! defaults pre-coerced. Each invocation then runs the plan against the
//! raw variable mapping and yields either the coerced object or the
//! aggregated errors. The generic path (used when the specialized parser
//! is disabled) rebuilds the specs from the operation on every call but
//! shares the same coercion core.

use crate::{
    ast::{InputValue, Operation, Type, VariableDefinition},
    error::{CompileError, ExecutionError, FieldError},
    parser::SourcePosition,
    resolve::Variables,
    schema::{
        meta::{is_builtin_scalar, MetaType},
        SchemaType,
    },
    value::{Object, ScalarValue, Value},
};

use super::literal::LiteralCoercer;

/// Recursive input types make the coercible depth unbounded in the type
/// system; real values are finite, so a generous depth cap stands in for
/// the reference's object-identity cycle detector.
const MAX_INPUT_DEPTH: usize = 64;

pub(crate) struct VariablePlan {
    pub(crate) items: Vec<VariableSpec>,
}

pub(crate) struct VariableSpec {
    pub(crate) name: String,
    pub(crate) var_type: Type,
    pub(crate) default: Option<Value>,
    pub(crate) position: SourcePosition,
}

/// Validates the operation's variable declarations and pre-coerces their
/// defaults.
pub(crate) fn build_variable_plan(
    schema: &SchemaType,
    operation: &Operation,
) -> Result<VariablePlan, CompileError> {
    let mut items = Vec::with_capacity(operation.variable_definitions.len());
    for (name, def) in &operation.variable_definitions {
        items.push(build_variable_spec(schema, &name.item, name.start, def)?);
    }
    Ok(VariablePlan { items })
}

fn build_variable_spec(
    schema: &SchemaType,
    name: &str,
    position: SourcePosition,
    def: &VariableDefinition,
) -> Result<VariableSpec, CompileError> {
    let var_type = &def.var_type.item;
    let type_name = var_type.innermost_name();
    let is_input = schema
        .concrete_type_by_name(type_name)
        .map(MetaType::is_input);
    match is_input {
        Some(true) => {}
        Some(false) => {
            return Err(CompileError::InvalidVariableType {
                message: format!(
                    "Variable \"${name}\" cannot be of non-input type \"{var_type}\"."
                ),
                position: def.var_type.start,
            });
        }
        None => {
            return Err(CompileError::InvalidVariableType {
                message: format!("Unknown type \"{type_name}\" for variable \"${name}\"."),
                position: def.var_type.start,
            });
        }
    }

    let default = match &def.default_value {
        Some(default) => {
            if !default.item.referenced_variables().is_empty() {
                return Err(CompileError::InvalidLiteral {
                    message: format!(
                        "Default value of variable \"${name}\" must be constant."
                    ),
                    position: default.start,
                });
            }
            let mut coercer = LiteralCoercer::new(schema, name);
            let mut path = Vec::new();
            Some(coercer.coerce(default, &var_type.clone().into_nullable(), &mut path)?)
        }
        None => None,
    };

    Ok(VariableSpec {
        name: name.to_owned(),
        var_type: var_type.clone(),
        default,
        position,
    })
}

/// Runs a prebuilt plan against raw variable values.
pub(crate) fn coerce_variable_values(
    schema: &SchemaType,
    plan: &VariablePlan,
    raw: &Variables,
) -> Result<Object, Vec<ExecutionError>> {
    let mut coerced = Object::with_capacity(plan.items.len());
    let mut errors = Vec::new();

    for spec in &plan.items {
        match raw.get(&spec.name) {
            None => {
                if let Some(default) = &spec.default {
                    coerced.add_field(spec.name.as_str(), default.clone());
                } else if spec.var_type.is_non_null() {
                    errors.push(variable_error(
                        spec,
                        format!(
                            "Variable \"${}\" of required type \"{}\" was not provided.",
                            spec.name, spec.var_type,
                        ),
                    ));
                }
            }
            Some(value) if value.is_null() => {
                if spec.var_type.is_non_null() {
                    errors.push(variable_error(
                        spec,
                        format!(
                            "Variable \"${}\" of non-null type \"{}\" must not be null.",
                            spec.name, spec.var_type,
                        ),
                    ));
                } else {
                    coerced.add_field(spec.name.as_str(), Value::Null);
                }
            }
            Some(value) => {
                let mut path = Vec::new();
                match coerce_input(schema, value, &spec.var_type, &mut path, 0) {
                    Ok(v) => {
                        coerced.add_field(spec.name.as_str(), v);
                    }
                    Err(failure) => errors.push(variable_error(
                        spec,
                        if failure.path.is_empty() {
                            format!(
                                "Variable \"${}\" got invalid value: {}",
                                spec.name, failure.message,
                            )
                        } else {
                            format!(
                                "Variable \"${}\" got invalid value at \"{}.{}\": {}",
                                spec.name,
                                spec.name,
                                failure.path.join("."),
                                failure.message,
                            )
                        },
                    )),
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// The generic, unspecialized path: specs are derived from the operation
/// at every invocation.
pub(crate) fn coerce_variables_generic(
    schema: &SchemaType,
    operation: &Operation,
    raw: &Variables,
) -> Result<Object, Vec<ExecutionError>> {
    let mut items = Vec::with_capacity(operation.variable_definitions.len());
    for (name, def) in &operation.variable_definitions {
        match build_variable_spec(schema, &name.item, name.start, def) {
            Ok(spec) => items.push(spec),
            Err(e) => return Err(vec![e.into_execution_error()]),
        }
    }
    coerce_variable_values(schema, &VariablePlan { items }, raw)
}

fn variable_error(spec: &VariableSpec, message: String) -> ExecutionError {
    ExecutionError::new(spec.position, Vec::new(), FieldError::from(message))
}

pub(crate) struct CoerceFailure {
    pub(crate) path: Vec<String>,
    pub(crate) message: String,
}

fn fail(path: &[String], message: String) -> CoerceFailure {
    CoerceFailure {
        path: path.to_vec(),
        message,
    }
}

/// Coerces one raw value against its declared type.
fn coerce_input(
    schema: &SchemaType,
    value: &InputValue,
    ty: &Type,
    path: &mut Vec<String>,
    depth: usize,
) -> Result<Value, CoerceFailure> {
    if depth > MAX_INPUT_DEPTH {
        return Err(fail(
            path,
            format!("Circular reference detected (depth limit of {MAX_INPUT_DEPTH} exceeded)."),
        ));
    }

    if ty.is_non_null() {
        if value.is_null() {
            return Err(fail(
                path,
                format!("Expected non-nullable type \"{ty}\" not to be null."),
            ));
        }
        return coerce_input(schema, value, &ty.clone().into_nullable(), path, depth);
    }

    if value.is_null() {
        return Ok(Value::Null);
    }

    if let Some(inner) = ty.list_inner() {
        return match value.to_list_value() {
            Some(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.into_iter().enumerate() {
                    path.push(idx.to_string());
                    let coerced = coerce_input(schema, item, inner, path, depth + 1);
                    path.pop();
                    out.push(coerced?);
                }
                Ok(Value::List(out))
            }
            // A single value coerces as a one-element list.
            None => Ok(Value::List(vec![coerce_input(
                schema,
                value,
                inner,
                path,
                depth + 1,
            )?])),
        };
    }

    let type_name = ty.innermost_name();
    let Some(meta) = schema.concrete_type_by_name(type_name) else {
        return Err(fail(path, format!("Unknown type \"{type_name}\".")));
    };

    match meta {
        MetaType::Scalar(scalar) => {
            if is_builtin_scalar(&scalar.name) {
                coerce_builtin_scalar(&scalar.name, value, path)
            } else {
                match &scalar.parse_value {
                    Some(parse) => parse(value).map_err(|reason| fail(path, reason)),
                    None => Ok(super::input_to_value(value)),
                }
            }
        }
        MetaType::Enum(e) => {
            let name = value
                .as_enum_value()
                .or_else(|| value.as_string_value());
            match name {
                Some(n) if e.has_value(n) => Ok(Value::scalar(n)),
                _ => Err(fail(
                    path,
                    format!("Value {value} does not exist in \"{}\" enum.", e.name),
                )),
            }
        }
        MetaType::InputObject(io) => {
            let Some(provided) = value.to_object_value() else {
                return Err(fail(
                    path,
                    format!("Expected type \"{}\" to be an object.", io.name),
                ));
            };
            for key in provided.keys() {
                if io.input_fields.iter().all(|f| f.name != *key) {
                    return Err(fail(
                        path,
                        format!("Field \"{key}\" is not defined by type \"{}\".", io.name),
                    ));
                }
            }
            let mut out = Object::with_capacity(io.input_fields.len());
            for field in &io.input_fields {
                match provided.get(field.name.as_str()).copied() {
                    Some(inner) => {
                        path.push(field.name.to_string());
                        let coerced = coerce_input(schema, inner, &field.arg_type, path, depth + 1);
                        path.pop();
                        out.add_field(field.name.as_str(), coerced?);
                    }
                    None => {
                        if let Some(default) = &field.default_value {
                            path.push(field.name.to_string());
                            let coerced =
                                coerce_input(schema, default, &field.arg_type, path, depth + 1);
                            path.pop();
                            out.add_field(field.name.as_str(), coerced?);
                        } else if field.arg_type.is_non_null() {
                            return Err(fail(
                                path,
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
        _ => Err(fail(
            path,
            format!("Type \"{type_name}\" is not an input type."),
        )),
    }
}

fn coerce_builtin_scalar(
    name: &str,
    value: &InputValue,
    path: &[String],
) -> Result<Value, CoerceFailure> {
    let scalar = value.as_scalar();
    match name {
        "Int" => match scalar {
            Some(ScalarValue::Int(i)) => Ok(Value::scalar(*i)),
            Some(ScalarValue::Float(f)) if f.fract() == 0.0 => {
                if *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX) {
                    Ok(Value::scalar(*f as i32))
                } else {
                    Err(fail(
                        path,
                        format!("Int cannot represent non 32-bit signed integer value: {f}"),
                    ))
                }
            }
            _ => Err(fail(
                path,
                format!("Int cannot represent non-integer value: {value}"),
            )),
        },
        "Float" => match scalar {
            Some(ScalarValue::Int(i)) => Ok(Value::scalar(f64::from(*i))),
            Some(ScalarValue::Float(f)) if f.is_finite() => Ok(Value::scalar(*f)),
            _ => Err(fail(
                path,
                format!("Float cannot represent non numeric value: {value}"),
            )),
        },
        "String" => match scalar {
            Some(ScalarValue::String(s)) => Ok(Value::scalar(s.as_str())),
            _ => Err(fail(
                path,
                format!("String cannot represent a non string value: {value}"),
            )),
        },
        "Boolean" => match scalar {
            Some(ScalarValue::Boolean(b)) => Ok(Value::scalar(*b)),
            _ => Err(fail(
                path,
                format!("Boolean cannot represent a non boolean value: {value}"),
            )),
        },
        "ID" => match scalar {
            Some(ScalarValue::String(s)) => Ok(Value::scalar(s.as_str())),
            Some(ScalarValue::Int(i)) => Ok(Value::scalar(i.to_string())),
            _ => Err(fail(path, format!("ID cannot represent value: {value}"))),
        },
        _ => Err(fail(path, format!("Unknown scalar \"{name}\"."))),
    }
}
