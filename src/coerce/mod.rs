//! Input coercion, compile-time and per-invocation.

pub(crate) mod literal;
pub(crate) mod variables;

use crate::{
    ast::InputValue,
    value::{Object, Value},
};

/// Maps an input value to an internal value without applying any type
/// rules: the fallback for custom scalars that declare no `parse_value`.
/// Enum tokens become their name; variables cannot appear here.
pub(crate) fn input_to_value(input: &InputValue) -> Value {
    match input {
        InputValue::Null | InputValue::Variable(_) => Value::Null,
        InputValue::Scalar(s) => Value::Scalar(s.clone()),
        InputValue::Enum(e) => Value::scalar(e.as_str()),
        InputValue::List(l) => Value::List(l.iter().map(|v| input_to_value(&v.item)).collect()),
        InputValue::Object(o) => Value::Object(
            o.iter()
                .map(|(k, v)| (k.item.clone(), input_to_value(&v.item)))
                .collect::<Object>(),
        ),
    }
}
