//! Schema × document traversal producing the execution plan.

use std::{collections::HashSet, sync::Arc};

use arcstr::ArcStr;
use fnv::FnvHashMap;

use super::{
    nullability::NullabilityNode,
    AbstractPlan, ArgumentPlan, FieldPlan, FieldPlanKind, ObjectPlan, PlanShape, ResolvePlan,
    TypedPlan,
};
use crate::{
    ast::{Fragment, Operation, Type},
    coerce::literal::LiteralCoercer,
    collect::{self, CollectCtx, CollectedField, Conjunction, FieldsAndNodes, IncludeGate},
    compiled::CompilerOptions,
    error::CompileError,
    look_ahead::{EnricherSeed, InfoTemplate},
    parser::SourcePosition,
    path::PathSegment,
    schema::{
        meta::{is_builtin_scalar, Field as FieldMeta, MetaType, ObjectMeta},
        SchemaType,
    },
    serialize::{LeafCoercion, LeafSerializer},
};

pub(crate) struct Planner<'a> {
    pub(crate) schema: &'a SchemaType,
    pub(crate) fragments: &'a FnvHashMap<String, Arc<Fragment>>,
    pub(crate) operation: &'a Operation,
    pub(crate) options: &'a CompilerOptions,
}

impl<'a> Planner<'a> {
    fn collect_ctx(&self) -> CollectCtx<'a> {
        CollectCtx {
            schema: self.schema,
            fragments: self.fragments,
            variable_definitions: &self.operation.variable_definitions,
        }
    }

    /// Plans the operation's root selection set against the root type.
    pub(crate) fn plan_root(
        &self,
        root_type_name: &ArcStr,
    ) -> Result<(ObjectPlan, NullabilityNode), CompileError> {
        let Some(root) = self.schema.object_by_name(root_type_name) else {
            return Err(CompileError::UnknownType {
                name: root_type_name.to_string(),
                position: SourcePosition::new_origin(),
            });
        };
        let mut collected = FieldsAndNodes::default();
        collect::collect_fields(
            &self.collect_ctx(),
            root_type_name,
            &self.operation.selection_set,
            &Conjunction::default(),
            &mut collected,
        )?;
        let (plan, children) = self.plan_object(root, &collected)?;
        Ok((plan, NullabilityNode::nullable_root(children)))
    }

    fn plan_object(
        &self,
        parent: &ObjectMeta,
        collected: &FieldsAndNodes,
    ) -> Result<(ObjectPlan, FnvHashMap<String, NullabilityNode>), CompileError> {
        let mut fields = Vec::with_capacity(collected.len());
        let mut children = FnvHashMap::default();
        for (response_key, occurrences) in collected {
            let mut gate = IncludeGate::default();
            for occurrence in occurrences {
                gate.add(occurrence.gate.clone());
            }
            if gate.is_never() {
                continue;
            }
            let Some(first) = occurrences.first() else {
                continue;
            };
            let field_name = first.node.item.name.item.as_str();
            let position = first.node.start;

            if field_name == "__typename" {
                fields.push(FieldPlan {
                    response_key: response_key.clone(),
                    label: arcstr::format!("{}.__typename", parent.name),
                    position,
                    gate,
                    kind: FieldPlanKind::Typename(parent.name.clone()),
                });
                continue;
            }

            let Some(field_meta) = parent.fields.iter().find(|f| f.name == field_name) else {
                return Err(CompileError::UnknownField {
                    type_name: parent.name.to_string(),
                    field_name: field_name.into(),
                    position,
                });
            };

            let info = self.info_template(parent, field_meta, occurrences)?;
            let args = self.plan_arguments(field_meta, first, position)?;
            let (output, nullability) =
                self.plan_type(&field_meta.field_type, occurrences, &info)?;
            if let Some(node) = nullability {
                children.insert(response_key.clone(), node);
            } else if field_meta.field_type.is_non_null() {
                // Leaf slots are omitted from the map unless their
                // non-null obligation matters for bubbling.
                children.insert(
                    response_key.clone(),
                    NullabilityNode {
                        nullable: false,
                        ..Default::default()
                    },
                );
            }

            fields.push(FieldPlan {
                response_key: response_key.clone(),
                label: arcstr::format!("{}.{}", parent.name, field_meta.name),
                position,
                gate,
                kind: FieldPlanKind::Resolve(Box::new(ResolvePlan {
                    field_name: field_meta.name.clone(),
                    resolver: field_meta.resolver.clone(),
                    subscribe: field_meta.subscribe.clone(),
                    args,
                    info,
                    output,
                })),
            });
        }
        Ok((
            ObjectPlan {
                type_name: parent.name.clone(),
                fields,
            },
            children,
        ))
    }

    /// Compiles the plan for one field's return type.
    ///
    /// Returns the nullability node mirroring the slot, or `None` for leaf
    /// slots (which the caller records only when non-null).
    fn plan_type(
        &self,
        ty: &Type,
        occurrences: &[CollectedField],
        info: &Arc<InfoTemplate>,
    ) -> Result<(TypedPlan, Option<NullabilityNode>), CompileError> {
        let non_null = ty.is_non_null();

        if let Some(inner) = ty.list_inner() {
            let (item, item_nullability) = self.plan_type(inner, occurrences, info)?;
            let node = NullabilityNode {
                nullable: !non_null,
                children: FnvHashMap::default(),
                item: Some(Box::new(item_nullability.unwrap_or_else(|| {
                    NullabilityNode {
                        nullable: !inner.is_non_null(),
                        ..Default::default()
                    }
                }))),
            };
            return Ok((
                TypedPlan {
                    non_null,
                    shape: PlanShape::List(Box::new(item)),
                },
                Some(node),
            ));
        }

        let type_name = ty.innermost_name();
        let position = occurrences
            .first()
            .map(|o| o.node.start)
            .unwrap_or_else(SourcePosition::new_origin);
        let Some(meta) = self.schema.concrete_type_by_name(type_name) else {
            return Err(CompileError::UnknownType {
                name: type_name.into(),
                position,
            });
        };

        match meta {
            MetaType::Scalar(_) | MetaType::Enum(_) => {
                let serializer = self.leaf_serializer(meta);
                Ok((
                    TypedPlan {
                        non_null,
                        shape: PlanShape::Leaf(serializer),
                    },
                    None,
                ))
            }
            MetaType::Object(object) => {
                let collected = self.collect_children(&object.name, occurrences)?;
                let (plan, children) = self.plan_object(object, &collected)?;
                Ok((
                    TypedPlan {
                        non_null,
                        shape: PlanShape::Object(plan),
                    },
                    Some(NullabilityNode {
                        nullable: !non_null,
                        children,
                        item: None,
                    }),
                ))
            }
            MetaType::Interface(_) | MetaType::Union(_) => {
                let possible = self.schema.possible_types(meta);
                let mut branches = Vec::with_capacity(possible.len());
                let mut is_type_of = Vec::new();
                let mut merged_children = FnvHashMap::<String, NullabilityNode>::default();
                for object in possible {
                    let collected = self.collect_children(&object.name, occurrences)?;
                    let (plan, children) = self.plan_object(object, &collected)?;
                    branches.push((object.name.clone(), plan));
                    for (key, node) in children {
                        match merged_children.get_mut(&key) {
                            Some(existing) => existing.merge(node),
                            None => {
                                merged_children.insert(key, node);
                            }
                        }
                    }
                    if let Some(f) = &object.is_type_of {
                        is_type_of.push((object.name.clone(), f.clone()));
                    }
                }
                Ok((
                    TypedPlan {
                        non_null,
                        shape: PlanShape::Abstract(AbstractPlan {
                            type_name: meta.name().clone(),
                            resolve_type: meta.resolve_type_fn().cloned(),
                            branches,
                            is_type_of,
                            info: Arc::clone(info),
                        }),
                    },
                    Some(NullabilityNode {
                        nullable: !non_null,
                        children: merged_children,
                        item: None,
                    }),
                ))
            }
            MetaType::InputObject(_) => Err(CompileError::UnknownField {
                type_name: type_name.into(),
                field_name: info.field_name.to_string(),
                position,
            }),
        }
    }

    /// Collects the child selections of every occurrence of a field for
    /// one concrete runtime type. Each occurrence's descendants inherit
    /// that occurrence's own conjunction, so a child reached only through
    /// a conditioned path stays gated even after selection-set merging.
    fn collect_children(
        &self,
        runtime_type: &ArcStr,
        occurrences: &[CollectedField],
    ) -> Result<FieldsAndNodes, CompileError> {
        let ctx = self.collect_ctx();
        let mut acc = FieldsAndNodes::default();
        for occurrence in occurrences {
            if let Some(selections) = &occurrence.node.item.selection_set {
                let inherited = if occurrence.gate.is_always() {
                    Conjunction::default()
                } else {
                    occurrence.gate.clone()
                };
                collect::collect_fields(&ctx, runtime_type, selections, &inherited, &mut acc)?;
            }
        }
        Ok(acc)
    }

    fn leaf_serializer(&self, meta: &MetaType) -> LeafSerializer {
        let type_name = meta.name().clone();
        if let Some(custom) = self.options.custom_serializers.get(type_name.as_str()) {
            return LeafSerializer {
                type_name,
                coercion: LeafCoercion::Custom(custom.clone()),
            };
        }
        let coercion = match meta {
            MetaType::Enum(e) => {
                if self.options.disable_leaf_serialization {
                    LeafCoercion::PassThrough
                } else {
                    LeafCoercion::Enum(Arc::new(
                        e.values.iter().map(|v| v.name.clone()).collect::<HashSet<_>>(),
                    ))
                }
            }
            MetaType::Scalar(s) => {
                if is_builtin_scalar(&s.name) {
                    if self.options.disable_leaf_serialization {
                        LeafCoercion::PassThrough
                    } else {
                        match s.name.as_str() {
                            "Int" => LeafCoercion::Int,
                            "Float" => LeafCoercion::Float,
                            "String" => LeafCoercion::String,
                            "Boolean" => LeafCoercion::Boolean,
                            _ => LeafCoercion::Id,
                        }
                    }
                } else {
                    match &s.serialize {
                        Some(f) => LeafCoercion::Custom(f.clone()),
                        None => LeafCoercion::PassThrough,
                    }
                }
            }
            _ => LeafCoercion::PassThrough,
        };
        LeafSerializer { type_name, coercion }
    }

    fn plan_arguments(
        &self,
        field_meta: &FieldMeta,
        first: &CollectedField,
        position: SourcePosition,
    ) -> Result<ArgumentPlan, CompileError> {
        let mut plan = ArgumentPlan::default();
        let provided = first.node.item.arguments.as_ref().map(|a| &a.item);
        for argument in &field_meta.arguments {
            let literal = provided.and_then(|args| args.get(&argument.name));
            match literal {
                Some(literal) => {
                    let mut coercer = LiteralCoercer::new(self.schema, &argument.name);
                    let mut path = vec![PathSegment::Key(argument.name.to_string())];
                    let value = coercer.coerce(literal, &argument.arg_type, &mut path)?;
                    plan.values.add_field(argument.name.as_str(), value);
                    plan.missing.append(&mut coercer.missing);
                }
                None => {
                    if let Some(default) = &argument.default_value {
                        let mut coercer = LiteralCoercer::new(self.schema, &argument.name);
                        let mut path = vec![PathSegment::Key(argument.name.to_string())];
                        let value = coercer.coerce(
                            &crate::parser::Spanning::new(position, default.clone()),
                            &argument.arg_type,
                            &mut path,
                        )?;
                        plan.values.add_field(argument.name.as_str(), value);
                    } else if argument.arg_type.is_non_null() {
                        return Err(CompileError::InvalidLiteral {
                            message: format!(
                                "Argument \"{}\" of required type \"{}\" was not provided.",
                                argument.name, argument.arg_type,
                            ),
                            position,
                        });
                    }
                }
            }
        }
        Ok(plan)
    }

    fn info_template(
        &self,
        parent: &ObjectMeta,
        field_meta: &FieldMeta,
        occurrences: &[CollectedField],
    ) -> Result<Arc<InfoTemplate>, CompileError> {
        let field_nodes: Vec<_> = occurrences.iter().map(|o| Arc::clone(&o.node)).collect();
        let enrichment = match &self.options.resolver_info_enricher {
            Some(enricher) => Some(enricher(&EnricherSeed {
                schema: self.schema,
                fragments: self.fragments,
                variable_definitions: &self.operation.variable_definitions,
                parent_type_name: &parent.name,
                field_name: &field_meta.name,
                field_nodes: &field_nodes,
                return_type: &field_meta.field_type,
            })?),
            None => None,
        };
        Ok(Arc::new(InfoTemplate {
            field_name: field_meta.name.clone(),
            field_nodes,
            return_type: field_meta.field_type.clone(),
            parent_type_name: parent.name.clone(),
            enrichment,
        }))
    }
}
