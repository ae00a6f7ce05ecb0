//! Output-side coercion of leaf values.

use std::{collections::HashSet, sync::Arc};

use arcstr::ArcStr;

use crate::{
    schema::meta::SerializeScalarFn,
    value::{ScalarValue, Value},
};

/// How one leaf type turns internal values into response values.
#[derive(Clone)]
pub(crate) enum LeafCoercion {
    Int,
    Float,
    String,
    Boolean,
    Id,
    Enum(Arc<HashSet<ArcStr>>),
    Custom(SerializeScalarFn),
    /// `disable_leaf_serialization`, or a custom scalar with no serializer.
    PassThrough,
}

/// The serializer bound to a leaf plan node.
#[derive(Clone)]
pub(crate) struct LeafSerializer {
    pub(crate) type_name: ArcStr,
    pub(crate) coercion: LeafCoercion,
}

impl LeafSerializer {
    /// Coerces `value` for output.
    ///
    /// Any failure is reported as the canonical "expected a value of type"
    /// message; the engine routes it to the error channel the enclosing
    /// nullability demands.
    pub(crate) fn serialize(&self, value: &Value) -> Result<Value, String> {
        let out = match &self.coercion {
            LeafCoercion::PassThrough => Some(value.clone()),
            LeafCoercion::Custom(f) => {
                return f(value).map_err(|reason| self.invalid_with(&reason));
            }
            LeafCoercion::Int => serialize_int(value),
            LeafCoercion::Float => serialize_float(value),
            LeafCoercion::String => serialize_string(value),
            LeafCoercion::Boolean => serialize_boolean(value),
            LeafCoercion::Id => serialize_id(value),
            LeafCoercion::Enum(values) => match value.as_string_value() {
                Some(s) if values.contains(s) => Some(value.clone()),
                _ => None,
            },
        };
        out.ok_or_else(|| self.invalid(value))
    }

    fn invalid(&self, value: &Value) -> String {
        format!(
            "Expected a value of type \"{}\" but received: {value}",
            self.type_name
        )
    }

    fn invalid_with(&self, reason: &str) -> String {
        format!(
            "Expected a value of type \"{}\" but received: {reason}",
            self.type_name
        )
    }
}

fn serialize_int(value: &Value) -> Option<Value> {
    match value.as_scalar()? {
        ScalarValue::Int(i) => Some(Value::scalar(*i)),
        ScalarValue::Float(f) if f.fract() == 0.0 && in_i32_range(*f) => {
            Some(Value::scalar(*f as i32))
        }
        ScalarValue::Boolean(b) => Some(Value::scalar(i32::from(*b))),
        ScalarValue::String(s) => s.parse::<i32>().ok().map(Value::scalar),
        _ => None,
    }
}

fn serialize_float(value: &Value) -> Option<Value> {
    match value.as_scalar()? {
        ScalarValue::Int(i) => Some(Value::scalar(f64::from(*i))),
        ScalarValue::Float(f) if f.is_finite() => Some(Value::scalar(*f)),
        ScalarValue::Boolean(b) => Some(Value::scalar(f64::from(u8::from(*b)))),
        ScalarValue::String(s) => s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::scalar),
        _ => None,
    }
}

fn serialize_string(value: &Value) -> Option<Value> {
    match value.as_scalar()? {
        ScalarValue::String(s) => Some(Value::scalar(s.as_str())),
        ScalarValue::Int(i) => Some(Value::scalar(i.to_string())),
        ScalarValue::Float(f) => Some(Value::scalar(f.to_string())),
        ScalarValue::Boolean(b) => Some(Value::scalar(b.to_string())),
    }
}

fn serialize_boolean(value: &Value) -> Option<Value> {
    match value.as_scalar()? {
        ScalarValue::Boolean(b) => Some(Value::scalar(*b)),
        ScalarValue::Int(i) => Some(Value::scalar(*i != 0)),
        ScalarValue::Float(f) => Some(Value::scalar(*f != 0.0)),
        ScalarValue::String(_) => None,
    }
}

fn serialize_id(value: &Value) -> Option<Value> {
    match value.as_scalar()? {
        ScalarValue::String(s) => Some(Value::scalar(s.as_str())),
        ScalarValue::Int(i) => Some(Value::scalar(i.to_string())),
        _ => None,
    }
}

fn in_i32_range(f: f64) -> bool {
    f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX)
}
