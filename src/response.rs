//! The `{data, errors}` result shape and its serialization.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{
    error::{CompileError, ExecutionError},
    plan::{FieldPlanKind, ObjectPlan, PlanShape, TypedPlan},
    value::{ScalarValue, Value},
};

/// The result of one query invocation.
///
/// `data` is `None` only when execution never started (variable coercion
/// failed, or the caller serialized a compilation failure); a response
/// whose non-`null` bubbling reached the root carries `Some(Value::Null)`.
#[derive(Debug, PartialEq)]
pub struct Response {
    /// The produced data, if execution ran.
    pub data: Option<Value>,
    /// Field and request errors, already deduplicated and ordered.
    pub errors: Vec<ExecutionError>,
}

impl Response {
    /// A response carrying only errors.
    pub fn from_errors(errors: Vec<ExecutionError>) -> Self {
        Self { data: None, errors }
    }

    /// Renders a compilation failure the way a transport layer would
    /// respond to it.
    pub fn from_compile_error(error: CompileError) -> Self {
        Self::from_errors(vec![error.into_execution_error()])
    }

    /// Whether the invocation produced no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(data) = &self.data {
            map.serialize_entry("data", data)?;
        }
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}

/// A response-shape skeleton derived from the plan, with object keys
/// pre-escaped. Built only under the `custom_json_serializer` option.
///
/// The writer assumes leaf serialization produced JSON-primitive values;
/// a custom serializer returning lists or objects falls back to the
/// generic encoder for that slot.
#[derive(Debug)]
pub(crate) enum JsonShape {
    Object(Vec<JsonField>),
    List(Box<JsonShape>),
    Leaf,
    /// Conflicting shapes across abstract branches; encoded generically.
    Any,
}

#[derive(Debug)]
pub(crate) struct JsonField {
    key: String,
    /// `"key":` with quoting and escaping already applied.
    prefix: String,
    shape: JsonShape,
}

impl JsonShape {
    pub(crate) fn from_plan(plan: &ObjectPlan) -> Self {
        let fields = plan
            .fields
            .iter()
            .map(|field| {
                let shape = match &field.kind {
                    FieldPlanKind::Typename(_) => Self::Leaf,
                    FieldPlanKind::Resolve(rp) => Self::of_type(&rp.output),
                };
                JsonField {
                    prefix: format!("{}:", escaped_string(&field.response_key)),
                    key: field.response_key.clone(),
                    shape,
                }
            })
            .collect();
        Self::Object(fields)
    }

    fn of_type(plan: &TypedPlan) -> Self {
        match &plan.shape {
            PlanShape::Leaf(_) => Self::Leaf,
            PlanShape::List(item) => Self::List(Box::new(Self::of_type(item))),
            PlanShape::Object(object) => Self::from_plan(object),
            PlanShape::Abstract(abstract_plan) => {
                let mut merged: Option<Self> = None;
                for (_, branch) in &abstract_plan.branches {
                    let shape = Self::from_plan(branch);
                    merged = Some(match merged {
                        None => shape,
                        Some(prev) => prev.merge(shape),
                    });
                }
                merged.unwrap_or(Self::Any)
            }
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Object(mut mine), Self::Object(theirs)) => {
                for field in theirs {
                    match mine.iter_mut().find(|f| f.key == field.key) {
                        None => mine.push(field),
                        Some(existing) => {
                            let prev = std::mem::replace(&mut existing.shape, Self::Any);
                            existing.shape = prev.merge(field.shape);
                        }
                    }
                }
                Self::Object(mine)
            }
            (Self::List(mine), Self::List(theirs)) => Self::List(Box::new(mine.merge(*theirs))),
            (Self::Leaf, Self::Leaf) => Self::Leaf,
            _ => Self::Any,
        }
    }

    /// Writes `value` as JSON using the precomputed keys.
    pub(crate) fn write(&self, value: &Value, out: &mut String) {
        match (self, value) {
            (_, Value::Null) => out.push_str("null"),
            (Self::Object(fields), Value::Object(object)) => {
                out.push('{');
                let mut first = true;
                for (key, field_value) in object.iter() {
                    if !first {
                        out.push(',');
                    }
                    first = false;
                    match fields.iter().find(|f| &f.key == key) {
                        Some(field) => {
                            out.push_str(&field.prefix);
                            field.shape.write(field_value, out);
                        }
                        None => {
                            out.push_str(&escaped_string(key));
                            out.push(':');
                            Self::Any.write(field_value, out);
                        }
                    }
                }
                out.push('}');
            }
            (Self::List(item), Value::List(items)) => {
                out.push('[');
                for (idx, element) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    item.write(element, out);
                }
                out.push(']');
            }
            (_, Value::Scalar(scalar)) => write_scalar(scalar, out),
            // Shape mismatch (custom serializer produced a non-primitive,
            // or an Any slot): fall back to the generic encoder.
            (_, value) => {
                let encoded = serde_json::to_string(value).unwrap_or_else(|_| "null".into());
                out.push_str(&encoded);
            }
        }
    }
}

fn write_scalar(scalar: &ScalarValue, out: &mut String) {
    match scalar {
        ScalarValue::Int(i) => out.push_str(&i.to_string()),
        ScalarValue::Float(f) => {
            if f.is_finite() {
                out.push_str(&f.to_string());
            } else {
                out.push_str("null");
            }
        }
        ScalarValue::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        ScalarValue::String(s) => out.push_str(&escaped_string(s)),
    }
}

fn escaped_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

/// Serializes a full response through a shape skeleton.
pub(crate) fn stringify_with_shape(
    shape: &JsonShape,
    response: &Response,
) -> serde_json::Result<String> {
    let mut out = String::with_capacity(128);
    out.push('{');
    let mut wrote = false;
    if let Some(data) = &response.data {
        out.push_str("\"data\":");
        shape.write(data, &mut out);
        wrote = true;
    }
    if !response.errors.is_empty() {
        if wrote {
            out.push(',');
        }
        out.push_str("\"errors\":");
        out.push_str(&serde_json::to_string(&response.errors)?);
    }
    out.push('}');
    Ok(out)
}
