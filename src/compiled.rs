//! The compilation entry point and the compiled-query facade.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use fnv::FnvHashMap;

use crate::{
    ast::{Definition, Document, Fragment, Operation, OperationType, Spanning},
    coerce::variables::{
        self, build_variable_plan, coerce_variable_values, coerce_variables_generic,
    },
    engine::{self, ExecCtx},
    error::{CompileError, ExecutionError},
    look_ahead::{InfoEnricher, ResolveInfo},
    macros::{bolt_debug, bolt_trace},
    parser::SourcePosition,
    path::PathSegment,
    plan::{
        nullability::{trim_nulls, NullabilityNode},
        planner::Planner,
        FieldPlanKind, ObjectPlan, ResolvePlan,
    },
    resolve::{Context, ResolverParams, ValuesStream, Variables},
    response::{stringify_with_shape, JsonShape, Response},
    schema::{meta::SerializeScalarFn, SchemaType},
    subscription::{map_source_stream, missing_source_error, subscribe_failure, ResponseStream},
    value::{Object, Value},
};

/// Knobs recognized by [`compile`].
#[derive(Clone, Default)]
pub struct CompilerOptions {
    /// Skip output coercion for spec scalars and enums; the caller
    /// guarantees well-typed leaves.
    pub disable_leaf_serialization: bool,
    /// Do not capture a backtrace on recorded execution errors.
    pub disable_capturing_stack_errors: bool,
    /// Derive a schema-aware stringifier from the plan and use it in
    /// [`CompiledQuery::stringify`].
    pub custom_json_serializer: bool,
    /// Per-type overrides of the default leaf serialization.
    pub custom_serializers: FnvHashMap<String, SerializeScalarFn>,
    /// Compile-time enricher whose payload every [`ResolveInfo`] exposes.
    pub resolver_info_enricher: Option<InfoEnricher>,
    /// Accepted for compatibility: predicates are always stored per
    /// collected occurrence, which is the path-based behavior.
    pub use_experimental_path_based_skip_include: bool,
    /// Use the variable-coercion routine specialized at compile time
    /// instead of re-reading the operation's declarations per invocation.
    pub use_jit_variables_parser: bool,
}

struct Inner {
    schema: Arc<SchemaType>,
    operation: Operation,
    operation_name: Option<String>,
    operation_type: OperationType,
    fragments: FnvHashMap<String, Arc<Fragment>>,
    plan: ObjectPlan,
    nullability: NullabilityNode,
    variable_plan: variables::VariablePlan,
    json_shape: Option<JsonShape>,
    capture_backtrace: bool,
    use_jit_variables_parser: bool,
}

/// A reusable, specialized executor for one `(schema, document,
/// operation)` triple.
///
/// Compilation walks schema × document exactly once; invocations only
/// coerce variables, drive resolvers and assemble the response. Cloning
/// is cheap and shares the immutable plan.
#[derive(Clone)]
pub struct CompiledQuery {
    inner: Arc<Inner>,
}

impl fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery").finish_non_exhaustive()
    }
}

/// Compiles `document` against `schema` into a [`CompiledQuery`].
///
/// The document is expected to have passed query validation; whatever
/// malformations the compiler still detects surface as a
/// [`CompileError`] instead of a usable query.
pub fn compile(
    schema: &Arc<SchemaType>,
    document: &Document,
    operation_name: Option<&str>,
    options: CompilerOptions,
) -> Result<CompiledQuery, CompileError> {
    let operation = get_operation(document, operation_name)?;
    let operation_type = operation.item.operation_type;
    bolt_trace!(
        "compiling operation {:?}",
        operation.item.name.as_ref().map(|n| n.item.as_str())
    );

    let fragments: FnvHashMap<String, Arc<Fragment>> = document
        .iter()
        .filter_map(|def| match def {
            Definition::Fragment(f) => Some((f.name.item.clone(), Arc::clone(f))),
            Definition::Operation(_) => None,
        })
        .collect();

    let root_type_name = schema
        .root_type_name(operation_type)
        .ok_or_else(|| CompileError::UnsupportedOperation(operation_type.to_string()))?
        .clone();

    let planner = Planner {
        schema,
        fragments: &fragments,
        operation: &operation.item,
        options: &options,
    };
    let (plan, nullability) = planner.plan_root(&root_type_name)?;
    let variable_plan = build_variable_plan(schema, &operation.item)?;
    let json_shape = options
        .custom_json_serializer
        .then(|| JsonShape::from_plan(&plan));

    bolt_debug!("compiled {} root fields", plan.fields.len());
    Ok(CompiledQuery {
        inner: Arc::new(Inner {
            schema: Arc::clone(schema),
            operation_name: operation.item.name.as_ref().map(|n| n.item.clone()),
            operation_type,
            operation: operation.item.clone(),
            fragments,
            plan,
            nullability,
            variable_plan,
            json_shape,
            capture_backtrace: !options.disable_capturing_stack_errors,
            use_jit_variables_parser: options.use_jit_variables_parser,
        }),
    })
}

/// Selects the operation to compile, mirroring the executable-document
/// rules: an unnamed request is only valid against a single-operation
/// document.
fn get_operation<'d>(
    document: &'d Document,
    operation_name: Option<&str>,
) -> Result<&'d Spanning<Operation>, CompileError> {
    let mut operation = None;
    for def in document {
        if let Definition::Operation(op) = def {
            if operation_name.is_none() && operation.is_some() {
                return Err(CompileError::MultipleOperationsProvided);
            }
            let matches = operation_name.is_none()
                || op.item.name.as_ref().map(|s| s.item.as_str()) == operation_name;
            if matches {
                operation = Some(op);
                if operation_name.is_some() {
                    break;
                }
            }
        }
    }
    match operation {
        Some(op) => Ok(op),
        None => match operation_name {
            Some(name) => Err(CompileError::UnknownOperationName(name.into())),
            None => Err(CompileError::NoOperationProvided),
        },
    }
}

impl CompiledQuery {
    /// The compiled operation's name, if it has one.
    pub fn operation_name(&self) -> Option<&str> {
        self.inner.operation_name.as_deref()
    }

    /// The compiled operation's kind.
    pub fn operation_type(&self) -> OperationType {
        self.inner.operation_type
    }

    /// Executes the compiled query or mutation.
    ///
    /// Fails only on misuse: invoking a compiled subscription this way.
    pub async fn query(
        &self,
        root_value: Value,
        context: Context,
        variables: Variables,
    ) -> Result<Response, CompileError> {
        if self.inner.operation_type == OperationType::Subscription {
            return Err(CompileError::IsSubscription);
        }
        Ok(self.execute(root_value, &context, &variables).await)
    }

    /// Blocking counterpart of [`CompiledQuery::query`] for fully
    /// synchronous resolver sets.
    pub fn query_sync(
        &self,
        root_value: Value,
        context: Context,
        variables: Variables,
    ) -> Result<Response, CompileError> {
        futures::executor::block_on(self.query(root_value, context, variables))
    }

    async fn execute(&self, root_value: Value, context: &Context, variables: &Variables) -> Response {
        let coerced = match self.coerce_variables(variables) {
            Ok(coerced) => coerced,
            Err(mut errors) => {
                errors.sort();
                return Response::from_errors(errors);
            }
        };
        self.execute_with(root_value, context, &coerced).await
    }

    fn coerce_variables(&self, raw: &Variables) -> Result<Object, Vec<ExecutionError>> {
        let inner = &*self.inner;
        if inner.use_jit_variables_parser {
            coerce_variable_values(&inner.schema, &inner.variable_plan, raw)
        } else {
            coerce_variables_generic(&inner.schema, &inner.operation, raw)
        }
    }

    async fn execute_with(&self, root_value: Value, context: &Context, coerced: &Object) -> Response {
        let inner = &*self.inner;
        bolt_trace!("executing {:?}", inner.operation_name);
        let ctx = ExecCtx {
            schema: &inner.schema,
            fragments: &inner.fragments,
            operation_type: inner.operation_type,
            operation_name: inner.operation_name.as_deref(),
            variables: coerced,
            root_value: &root_value,
            context,
            errors: RwLock::new(Vec::new()),
            null_errors: RwLock::new(Vec::new()),
            capture_backtrace: inner.capture_backtrace,
        };
        let serial = inner.operation_type == OperationType::Mutation;
        let mut data = engine::execute_root(&ctx, &inner.plan, serial).await;

        let mut errors = ctx.errors.into_inner().unwrap();
        let null_errors = ctx.null_errors.into_inner().unwrap();
        let (root_nulled, surviving) = trim_nulls(&mut data, &inner.nullability, null_errors);
        errors.extend(surviving);
        errors.sort();

        Response {
            data: Some(if root_nulled { Value::Null } else { data }),
            errors,
        }
    }

    /// Invokes only the root subscribe function and returns its source
    /// event stream.
    pub async fn create_source_event_stream(
        &self,
        root_value: Value,
        context: Context,
        variables: Variables,
    ) -> Result<ValuesStream, Box<Response>> {
        if self.inner.operation_type != OperationType::Subscription {
            return Err(Box::new(Response::from_compile_error(
                CompileError::NotSubscription,
            )));
        }
        let coerced = self.coerce_variables(&variables).map_err(|mut errors| {
            errors.sort();
            Box::new(Response::from_errors(errors))
        })?;
        self.resolve_source_stream(&root_value, &context, &coerced)
    }

    /// Composes the source event stream with the per-event mapper: each
    /// event payload is executed through the compiled body, yielding a
    /// stream of [`Response`]s that individual event errors never
    /// terminate.
    pub async fn subscribe(
        &self,
        root_value: Value,
        context: Context,
        variables: Variables,
    ) -> Result<ResponseStream, Box<Response>> {
        if self.inner.operation_type != OperationType::Subscription {
            return Err(Box::new(Response::from_compile_error(
                CompileError::NotSubscription,
            )));
        }
        let coerced = self.coerce_variables(&variables).map_err(|mut errors| {
            errors.sort();
            Box::new(Response::from_errors(errors))
        })?;
        let source = self.resolve_source_stream(&root_value, &context, &coerced)?;
        Ok(map_source_stream(self.clone(), context, coerced, source))
    }

    fn resolve_source_stream(
        &self,
        root_value: &Value,
        context: &Context,
        coerced: &Object,
    ) -> Result<ValuesStream, Box<Response>> {
        let inner = &*self.inner;
        let Some((field, plan)) = self.root_resolve_field() else {
            return Err(Box::new(Response::from_compile_error(
                CompileError::NoOperationProvided,
            )));
        };
        let locus_error = |error| Box::new(subscribe_failure(self, error));

        let args = engine::build_arguments(&plan.args, coerced)
            .map_err(|message| locus_error(message.into()))?;
        let info = ResolveInfo {
            field_name: &plan.info.field_name,
            field_nodes: &plan.info.field_nodes,
            return_type: &plan.info.return_type,
            parent_type_name: &plan.info.parent_type_name,
            schema: &inner.schema,
            fragments: &inner.fragments,
            operation_type: inner.operation_type,
            operation_name: inner.operation_name.as_deref(),
            root_value,
            variable_values: coerced,
            path: vec![PathSegment::Key(field.response_key.clone())],
            enrichment: plan.info.enrichment.as_ref(),
        };
        let subscribe = plan.subscribe.clone();
        let outcome = match subscribe {
            Some(f) => f(ResolverParams {
                parent: root_value,
                args: &args,
                context,
                info: &info,
            }),
            None => missing_source_error(&plan.field_name),
        };
        outcome.map_err(locus_error)
    }

    pub(crate) async fn execute_event(
        &self,
        payload: Value,
        context: &Context,
        coerced: &Object,
    ) -> Response {
        self.execute_with(payload, context, coerced).await
    }

    pub(crate) fn root_field_locus(&self) -> Option<(SourcePosition, Vec<PathSegment>)> {
        self.root_resolve_field()
            .map(|(field, _)| (field.position, vec![PathSegment::Key(field.response_key.clone())]))
    }

    fn root_resolve_field(&self) -> Option<(&crate::plan::FieldPlan, &ResolvePlan)> {
        self.inner.plan.fields.iter().find_map(|f| match &f.kind {
            FieldPlanKind::Resolve(plan) => Some((f, plan.as_ref())),
            FieldPlanKind::Typename(_) => None,
        })
    }

    /// Serializes a response to JSON: `serde_json` by default, or the
    /// plan-derived writer when the query was compiled with
    /// `custom_json_serializer`.
    pub fn stringify(&self, response: &Response) -> serde_json::Result<String> {
        match &self.inner.json_shape {
            Some(shape) => stringify_with_shape(shape, response),
            None => serde_json::to_string(response),
        }
    }
}
