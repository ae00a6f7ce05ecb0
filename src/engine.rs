//! The plan interpreter.
//!
//! Drives resolvers against a compiled plan. Suspension happens only at
//! resolver futures: sibling fields of queries and subscriptions are
//! polled concurrently through a [`FuturesOrdered`] whose single drain is
//! the deterministic completion point, while top-level mutation fields run
//! strictly in document order, each subtree awaited to the end before the
//! next begins.

use std::sync::{Arc, RwLock};

use arcstr::ArcStr;
use fnv::FnvHashMap;
use futures::{
    future::BoxFuture,
    stream::{FuturesOrdered, StreamExt as _},
};

use crate::{
    ast::{Fragment, OperationType},
    error::{ExecutionError, FieldError, FieldResult},
    look_ahead::{InfoTemplate, ResolveInfo},
    parser::SourcePosition,
    path::{ObjectPath, PathSegment},
    plan::{AbstractPlan, ArgumentPlan, FieldPlan, FieldPlanKind, ObjectPlan, PlanShape, TypedPlan},
    resolve::{default_resolve, Context, Resolved, ResolverParams},
    schema::SchemaType,
    value::{Object, Value},
};

/// Everything one invocation owns. Dropped when the final value is
/// assembled; the compiled plan itself is never touched mutably.
pub(crate) struct ExecCtx<'e> {
    pub(crate) schema: &'e SchemaType,
    pub(crate) fragments: &'e FnvHashMap<String, Arc<Fragment>>,
    pub(crate) operation_type: OperationType,
    pub(crate) operation_name: Option<&'e str>,
    pub(crate) variables: &'e Object,
    pub(crate) root_value: &'e Value,
    pub(crate) context: &'e Context,
    pub(crate) errors: RwLock<Vec<ExecutionError>>,
    pub(crate) null_errors: RwLock<Vec<ExecutionError>>,
    pub(crate) capture_backtrace: bool,
}

impl<'e> ExecCtx<'e> {
    /// Records an error into the channel the slot's nullability demands.
    fn push_error(
        &self,
        non_null: bool,
        position: SourcePosition,
        path: &Arc<ObjectPath>,
        error: FieldError,
    ) {
        let mut err = ExecutionError::new(position, path.to_response_path(), error);
        if self.capture_backtrace {
            err = err.with_captured_backtrace();
        }
        let buffer = if non_null {
            &self.null_errors
        } else {
            &self.errors
        };
        buffer.write().unwrap().push(err);
    }

    fn make_info<'i>(&'i self, template: &'i InfoTemplate, path: Vec<PathSegment>) -> ResolveInfo<'i> {
        ResolveInfo {
            field_name: &template.field_name,
            field_nodes: &template.field_nodes,
            return_type: &template.return_type,
            parent_type_name: &template.parent_type_name,
            schema: self.schema,
            fragments: self.fragments,
            operation_type: self.operation_type,
            operation_name: self.operation_name,
            root_value: self.root_value,
            variable_values: self.variables,
            path,
            enrichment: template.enrichment.as_ref(),
        }
    }
}

/// Executes the root plan. `serial` is set for mutations only.
pub(crate) async fn execute_root<'a>(
    ctx: &'a ExecCtx<'a>,
    plan: &'a ObjectPlan,
    serial: bool,
) -> Value {
    resolve_object(ctx, plan, ctx.root_value, ObjectPath::root(), serial).await
}

fn resolve_object<'a>(
    ctx: &'a ExecCtx<'a>,
    plan: &'a ObjectPlan,
    parent: &'a Value,
    path: Arc<ObjectPath>,
    serial: bool,
) -> BoxFuture<'a, Value> {
    Box::pin(async move {
        let mut object = Object::with_capacity(plan.fields.len());
        if serial {
            for field in &plan.fields {
                if !field.gate.eval(ctx.variables) {
                    continue;
                }
                let (key, value) = resolve_field(ctx, field, parent, path.clone()).await;
                object.add_field(key, value);
            }
        } else {
            let mut pending = FuturesOrdered::new();
            for field in &plan.fields {
                if !field.gate.eval(ctx.variables) {
                    continue;
                }
                pending.push_back(resolve_field(ctx, field, parent, path.clone()));
            }
            while let Some((key, value)) = pending.next().await {
                object.add_field(key, value);
            }
        }
        Value::Object(object)
    })
}

async fn resolve_field<'a>(
    ctx: &'a ExecCtx<'a>,
    field: &'a FieldPlan,
    parent: &'a Value,
    parent_path: Arc<ObjectPath>,
) -> (String, Value) {
    let path = parent_path.literal(field.response_key.clone());
    let value = match &field.kind {
        FieldPlanKind::Typename(type_name) => Value::scalar(type_name.as_str()),
        FieldPlanKind::Resolve(plan) => {
            let args = match build_arguments(&plan.args, ctx.variables) {
                Ok(args) => args,
                Err(message) => {
                    // Invalid arguments: the resolver is never invoked.
                    ctx.push_error(
                        plan.output.non_null,
                        field.position,
                        &path,
                        FieldError::from(message),
                    );
                    return (field.response_key.clone(), Value::Null);
                }
            };
            let outcome = {
                let info = ctx.make_info(&plan.info, path.to_response_path());
                match &plan.resolver {
                    Some(resolver) => resolver(ResolverParams {
                        parent,
                        args: &args,
                        context: ctx.context,
                        info: &info,
                    }),
                    None => Ok(Resolved::Value(default_resolve(parent, &plan.field_name))),
                }
            };
            let result: FieldResult<Value> = match outcome {
                Ok(Resolved::Value(v)) => Ok(v),
                Ok(Resolved::Future(fut)) => fut.await,
                Err(e) => Err(e),
            };
            complete_value(ctx, &plan.output, result, path, field.position, &field.label).await
        }
    };
    (field.response_key.clone(), value)
}

/// Applies a field's compiled child plan to the value its resolver
/// produced.
pub(crate) fn complete_value<'a>(
    ctx: &'a ExecCtx<'a>,
    plan: &'a TypedPlan,
    result: FieldResult<Value>,
    path: Arc<ObjectPath>,
    position: SourcePosition,
    label: &'a ArcStr,
) -> BoxFuture<'a, Value> {
    Box::pin(async move {
        let value = match result {
            Err(e) => {
                ctx.push_error(plan.non_null, position, &path, e);
                return Value::Null;
            }
            Ok(v) => v,
        };

        if value.is_null() {
            if plan.non_null {
                ctx.push_error(
                    true,
                    position,
                    &path,
                    FieldError::from(format!(
                        "Cannot return null for non-nullable field {label}."
                    )),
                );
            }
            return Value::Null;
        }

        match &plan.shape {
            PlanShape::Leaf(serializer) => match serializer.serialize(&value) {
                Ok(v) => v,
                Err(message) => {
                    ctx.push_error(plan.non_null, position, &path, FieldError::from(message));
                    Value::Null
                }
            },
            PlanShape::Object(object_plan) => {
                if value.as_object_value().is_none() {
                    ctx.push_error(
                        plan.non_null,
                        position,
                        &path,
                        FieldError::from(format!(
                            "Expected a value of type \"{}\" but received: {value}",
                            object_plan.type_name
                        )),
                    );
                    return Value::Null;
                }
                resolve_object(ctx, object_plan, &value, path.clone(), false).await
            }
            PlanShape::List(item) => match value {
                Value::List(items) => {
                    let completions = items.into_iter().enumerate().map(|(idx, element)| {
                        complete_value(ctx, item, Ok(element), path.index(idx), position, label)
                    });
                    Value::List(futures::future::join_all(completions).await)
                }
                _ => {
                    ctx.push_error(
                        plan.non_null,
                        position,
                        &path,
                        FieldError::from(format!(
                            "Expected Iterable, but did not find one for field {label}."
                        )),
                    );
                    Value::Null
                }
            },
            PlanShape::Abstract(abstract_plan) => {
                let resolved = resolve_concrete_type(ctx, abstract_plan, &value, &path);
                let Some(type_name) = resolved else {
                    ctx.push_error(
                        plan.non_null,
                        position,
                        &path,
                        FieldError::from(format!(
                            "Abstract type \"{0}\" must resolve to an Object type at runtime \
                             for field {label}. Either the \"{0}\" type should provide a \
                             \"resolveType\" function or each possible type should provide an \
                             \"isTypeOf\" function.",
                            abstract_plan.type_name
                        )),
                    );
                    return Value::Null;
                };
                let Some(branch) = abstract_plan.branch(&type_name) else {
                    ctx.push_error(
                        plan.non_null,
                        position,
                        &path,
                        FieldError::from(format!(
                            "Runtime Object type \"{type_name}\" is not a possible type for \
                             \"{}\".",
                            abstract_plan.type_name
                        )),
                    );
                    return Value::Null;
                };
                let branch_path = path.meta(ArcStr::from(type_name));
                resolve_object(ctx, branch, &value, branch_path, false).await
            }
        }
    })
}

/// The abstract-type dispatch chain: the explicit type resolver when one
/// exists, else the value's `__typename` property, else each possible
/// type's `is_type_of`.
fn resolve_concrete_type(
    ctx: &ExecCtx<'_>,
    plan: &AbstractPlan,
    value: &Value,
    path: &Arc<ObjectPath>,
) -> Option<String> {
    if let Some(resolve_type) = &plan.resolve_type {
        let info = ctx.make_info(&plan.info, path.to_response_path());
        return resolve_type(value, ctx.context, &info);
    }
    if let Some(name) = value
        .as_object_value()
        .and_then(|o| o.get_field_value("__typename"))
        .and_then(Value::as_string_value)
    {
        return Some(name.to_owned());
    }
    for (name, is_type_of) in &plan.is_type_of {
        if is_type_of(value, ctx.context) {
            return Some(name.to_string());
        }
    }
    None
}

/// Assembles the runtime argument object: pre-coerced static values plus
/// variable values spliced into their recorded holes. An unsatisfied
/// non-`null` hole invalidates the whole argument set.
pub(crate) fn build_arguments(plan: &ArgumentPlan, variables: &Object) -> Result<Object, String> {
    if plan.missing.is_empty() {
        return Ok(plan.values.clone());
    }
    let mut args = plan.values.clone();
    for missing in &plan.missing {
        match variables.get_field_value(&missing.name) {
            Some(value) if !value.is_null() => {
                write_at(&mut args, &missing.path, value.clone());
            }
            Some(_) => {
                if missing.non_null {
                    return Err(format!(
                        "Argument \"{}\" of non-null type \"{}\" must not be null.",
                        missing.argument, missing.expected,
                    ));
                }
                write_at(&mut args, &missing.path, Value::Null);
            }
            None => {
                if missing.non_null {
                    return Err(format!(
                        "Argument \"{}\" of required type \"{}\" was provided the variable \
                         \"${}\" which was not provided a runtime value.",
                        missing.argument, missing.expected, missing.name,
                    ));
                }
            }
        }
    }
    Ok(args)
}

fn write_at(args: &mut Object, path: &[PathSegment], value: Value) {
    let Some((PathSegment::Key(key), rest)) = path.split_first() else {
        return;
    };
    match args.get_mut_field_value(key) {
        Some(slot) => write_value_at(slot, rest, value),
        None => {
            if rest.is_empty() {
                args.add_field(key.clone(), value);
            }
        }
    }
}

fn write_value_at(slot: &mut Value, path: &[PathSegment], value: Value) {
    match path.split_first() {
        None => *slot = value,
        Some((segment, rest)) => {
            let next = match segment {
                PathSegment::Key(k) => slot
                    .as_mut_object_value()
                    .and_then(|o| o.get_mut_field_value(k)),
                PathSegment::Index(i) => match slot {
                    Value::List(items) => items.get_mut(*i),
                    _ => None,
                },
            };
            if let Some(next) = next {
                write_value_at(next, rest, value);
            }
        }
    }
}
