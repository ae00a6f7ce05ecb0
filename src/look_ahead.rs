//! What a resolver can learn about the request it serves.
//!
//! [`ResolveInfo`] carries the mandatory per-field facts. Optional
//! enrichment is attached as a dynamically typed payload computed once at
//! compile time per planned field, so it can never shadow the mandatory
//! fields. The built-in [`field_expansion_enricher`] precomputes, per
//! possible runtime type, which subfields the client will ask for.

use std::{any::Any, sync::Arc};

use arcstr::ArcStr;
use fnv::FnvHashMap;
use indexmap::IndexMap;

use crate::{
    ast::{FieldNode, Fragment, OperationType, Spanning, Type, VariableDefinition},
    collect::{self, CollectCtx, Conjunction, FieldsAndNodes, IncludeGate},
    error::CompileError,
    path::PathSegment,
    schema::SchemaType,
    value::{Object, Value},
};

/// Static and per-request details handed to every resolver invocation.
pub struct ResolveInfo<'a> {
    /// The field's name in the schema (not the response key).
    pub field_name: &'a str,
    /// Every field node that merged into this resolver call.
    pub field_nodes: &'a [FieldNode],
    /// The field's declared return type.
    pub return_type: &'a Type,
    /// The name of the type the field was resolved on.
    pub parent_type_name: &'a str,
    /// The schema the query was compiled against.
    pub schema: &'a SchemaType,
    /// The document's fragment definitions.
    pub fragments: &'a FnvHashMap<String, Arc<Fragment>>,
    /// The kind of the running operation.
    pub operation_type: OperationType,
    /// The running operation's name, if it has one.
    pub operation_name: Option<&'a str>,
    /// The value execution started from.
    pub root_value: &'a Value,
    /// The coerced variable values of this invocation.
    pub variable_values: &'a Object,
    /// The response path down to this field.
    pub path: Vec<PathSegment>,
    pub(crate) enrichment: Option<&'a Arc<dyn Any + Send + Sync>>,
}

impl<'a> ResolveInfo<'a> {
    /// Downcasts the enricher-produced payload, if one was configured.
    pub fn enrichment<T: Any + Send + Sync>(&self) -> Option<&'a T> {
        self.enrichment.and_then(|e| e.downcast_ref())
    }

    /// The payload of the built-in [`field_expansion_enricher`].
    pub fn field_expansion(&self) -> Option<&'a FieldExpansion> {
        self.enrichment()
    }
}

/// The compile-time part of a [`ResolveInfo`], stored in the plan.
pub(crate) struct InfoTemplate {
    pub(crate) field_name: ArcStr,
    pub(crate) field_nodes: Vec<FieldNode>,
    pub(crate) return_type: Type,
    pub(crate) parent_type_name: ArcStr,
    pub(crate) enrichment: Option<Arc<dyn Any + Send + Sync>>,
}

/// What an enricher gets to look at while the query is being compiled.
pub struct EnricherSeed<'a> {
    pub schema: &'a SchemaType,
    pub fragments: &'a FnvHashMap<String, Arc<Fragment>>,
    pub variable_definitions: &'a [(Spanning<String>, VariableDefinition)],
    pub parent_type_name: &'a str,
    pub field_name: &'a str,
    pub field_nodes: &'a [FieldNode],
    pub return_type: &'a Type,
}

/// A compile-time resolver-info enricher.
///
/// Invoked once per planned field; the produced payload is shared by every
/// invocation of the compiled query and exposed through
/// [`ResolveInfo::enrichment`].
pub type InfoEnricher =
    Arc<dyn for<'a> Fn(&EnricherSeed<'a>) -> Result<Arc<dyn Any + Send + Sync>, CompileError> + Send + Sync>;

/// The built-in enricher computing a [`FieldExpansion`] per planned field.
pub fn field_expansion_enricher() -> InfoEnricher {
    Arc::new(|seed| {
        let expansion = FieldExpansion::build(seed, seed.return_type, seed.field_nodes)?;
        Ok(Arc::new(expansion) as Arc<dyn Any + Send + Sync>)
    })
}

/// Which subfields the client requests, keyed by possible runtime type.
///
/// A selection made through an interface appears under every concrete type
/// it overlaps with. Aliased fields and `__typename` are omitted.
#[derive(Debug, Default)]
pub struct FieldExpansion {
    types: IndexMap<ArcStr, TypeExpansion>,
}

/// The subfields requested for one concrete runtime type.
#[derive(Debug, Default)]
pub struct TypeExpansion {
    fields: IndexMap<String, ExpansionField>,
}

/// One requested subfield, with its conditional-inclusion predicate.
#[derive(Debug)]
pub struct ExpansionField {
    gate: IncludeGate,
    expansion: Option<FieldExpansion>,
}

impl FieldExpansion {
    /// The expansion for one possible runtime type.
    pub fn possible_type(&self, name: &str) -> Option<&TypeExpansion> {
        self.types.get(name)
    }

    /// Iterates `(possible type name, expansion)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &TypeExpansion)> {
        self.types.iter()
    }

    fn build(
        seed: &EnricherSeed<'_>,
        return_type: &Type,
        field_nodes: &[FieldNode],
    ) -> Result<Self, CompileError> {
        let mut expansion = Self::default();
        let Some(meta) = seed.schema.concrete_type_by_name(return_type.innermost_name()) else {
            return Ok(expansion);
        };
        if meta.is_leaf() {
            return Ok(expansion);
        }

        let ctx = CollectCtx {
            schema: seed.schema,
            fragments: seed.fragments,
            variable_definitions: seed.variable_definitions,
        };
        for possible in seed.schema.possible_types(meta) {
            let mut acc = FieldsAndNodes::default();
            for node in field_nodes {
                if let Some(selections) = &node.item.selection_set {
                    collect::collect_fields(
                        &ctx,
                        &possible.name,
                        selections,
                        &Conjunction::default(),
                        &mut acc,
                    )?;
                }
            }
            let mut type_expansion = TypeExpansion::default();
            for (_, occurrences) in &acc {
                let Some(first) = occurrences.first() else {
                    continue;
                };
                let field = &first.node.item;
                if field.alias.is_some() || field.name.item == "__typename" {
                    continue;
                }
                let Some(field_meta) = possible
                    .fields
                    .iter()
                    .find(|f| f.name == field.name.item.as_str())
                else {
                    continue;
                };
                let mut gate = IncludeGate::default();
                for occurrence in occurrences {
                    gate.add(occurrence.gate.clone());
                }
                let child_meta = seed
                    .schema
                    .concrete_type_by_name(field_meta.field_type.innermost_name());
                let expansion_below = match child_meta {
                    Some(m) if m.is_composite() => {
                        let nodes: Vec<FieldNode> =
                            occurrences.iter().map(|o| Arc::clone(&o.node)).collect();
                        Some(Self::build(seed, &field_meta.field_type, &nodes)?)
                    }
                    _ => None,
                };
                type_expansion.fields.insert(
                    field.name.item.clone(),
                    ExpansionField {
                        gate,
                        expansion: expansion_below,
                    },
                );
            }
            expansion
                .types
                .insert(possible.name.clone(), type_expansion);
        }
        Ok(expansion)
    }
}

impl TypeExpansion {
    /// The entry for one subfield, if requested.
    pub fn field(&self, name: &str) -> Option<&ExpansionField> {
        self.fields.get(name)
    }

    /// Iterates `(subfield name, entry)` pairs in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExpansionField)> {
        self.fields.iter()
    }
}

impl ExpansionField {
    /// Evaluates the subfield's skip/include predicates against coerced
    /// variable values.
    pub fn should_include(&self, variables: &Object) -> bool {
        self.gate.eval(variables)
    }

    /// Leaf subfields carry no nested expansion.
    pub fn is_leaf(&self) -> bool {
        self.expansion.is_none()
    }

    /// The nested expansion for composite subfields.
    pub fn expansion(&self) -> Option<&FieldExpansion> {
        self.expansion.as_ref()
    }
}
