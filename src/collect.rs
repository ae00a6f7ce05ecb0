//! Field collection: expanding selection sets into response-key order.
//!
//! Fragments are flattened at compile time. Each collected occurrence of a
//! field keeps the conjunction of the `@skip`/`@include` predicates along
//! the exact path that reached it, so merged selection sets stay correct
//! when the same field arrives under different fragment conditions. A
//! response key's runtime gate is the disjunction over its occurrences.

use std::collections::HashSet;

use fnv::FnvHashMap;
use indexmap::IndexMap;
use std::sync::Arc;

use crate::{
    ast::{
        Directive, Fragment, InputValue, Selection, Spanning, Type, VariableDefinition,
    },
    error::CompileError,
    parser::SourcePosition,
    schema::SchemaType,
    value::{Object, ScalarValue, Value},
};

use crate::ast::FieldNode;

/// One `@skip`/`@include` condition, compiled.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Predicate {
    /// `@include(if: $v)`; include when the variable is `true`.
    Include(String),
    /// `@skip(if: $v)`; include when the variable is `false`.
    Skip(String),
}

impl Predicate {
    fn eval(&self, variables: &Object) -> bool {
        let lookup = |name: &str| {
            variables
                .get_field_value(name)
                .and_then(Value::as_scalar)
                .and_then(ScalarValue::as_boolean)
                .unwrap_or(false)
        };
        match self {
            Self::Include(v) => lookup(v),
            Self::Skip(v) => !lookup(v),
        }
    }
}

/// A conjunction of predicates. Empty means "always included"; `never`
/// marks a selection statically excluded by a literal directive argument.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Conjunction {
    never: bool,
    predicates: Vec<Predicate>,
}

impl Conjunction {
    pub(crate) fn never() -> Self {
        Self {
            never: true,
            predicates: Vec::new(),
        }
    }

    pub(crate) fn is_always(&self) -> bool {
        !self.never && self.predicates.is_empty()
    }

    pub(crate) fn is_never(&self) -> bool {
        self.never
    }

    /// Conjoins `other` into this conjunction, dropping duplicates so that
    /// predicates inherited through several fragment levels don't pile up.
    pub(crate) fn and(&self, other: &Self) -> Self {
        if self.never || other.never {
            return Self::never();
        }
        let mut out = self.clone();
        for p in &other.predicates {
            if !out.predicates.contains(p) {
                out.predicates.push(p.clone());
            }
        }
        out
    }

    pub(crate) fn eval(&self, variables: &Object) -> bool {
        !self.never && self.predicates.iter().all(|p| p.eval(variables))
    }
}

/// The runtime gate of a response key: a disjunction of the conjunctions
/// of every occurrence that collected into it.
#[derive(Clone, Debug, Default)]
pub(crate) struct IncludeGate {
    arms: Vec<Conjunction>,
}

impl IncludeGate {
    pub(crate) fn add(&mut self, conj: Conjunction) {
        if conj.is_never() {
            return;
        }
        if conj.is_always() {
            self.arms = vec![Conjunction::default()];
            return;
        }
        if self.arms.iter().any(Conjunction::is_always) {
            return;
        }
        if !self.arms.contains(&conj) {
            self.arms.push(conj);
        }
    }

    /// A gate with no arms can never pass: every occurrence was statically
    /// excluded.
    pub(crate) fn eval(&self, variables: &Object) -> bool {
        self.arms.iter().any(|c| c.eval(variables))
    }

    pub(crate) fn is_never(&self) -> bool {
        self.arms.is_empty()
    }
}

/// A field node as it was reached along one traversal path.
#[derive(Clone, Debug)]
pub(crate) struct CollectedField {
    pub(crate) node: FieldNode,
    pub(crate) gate: Conjunction,
}

/// Response key → every field node that collected into it, in selection
/// order.
pub(crate) type FieldsAndNodes = IndexMap<String, Vec<CollectedField>>;

pub(crate) struct CollectCtx<'a> {
    pub(crate) schema: &'a SchemaType,
    pub(crate) fragments: &'a FnvHashMap<String, Arc<Fragment>>,
    pub(crate) variable_definitions: &'a [(Spanning<String>, VariableDefinition)],
}

/// Expands `selections` for the concrete `runtime_type` into `acc`.
///
/// Fragment chains are walked with an explicit stack, so arbitrarily deep
/// spread nesting cannot overflow the call stack; only entering a field's
/// own selection set (done by the planner) recurses.
pub(crate) fn collect_fields<'a>(
    ctx: &CollectCtx<'a>,
    runtime_type: &str,
    selections: &'a [Selection],
    inherited: &Conjunction,
    acc: &mut FieldsAndNodes,
) -> Result<(), CompileError> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<(std::slice::Iter<'a, Selection>, Conjunction)> =
        vec![(selections.iter(), inherited.clone())];

    loop {
        let next = match stack.last_mut() {
            Some((iter, inherited)) => iter.next().map(|s| (s, inherited.clone())),
            None => break,
        };
        let Some((selection, inherited)) = next else {
            stack.pop();
            continue;
        };
        let inherited = &inherited;
        match selection {
            Selection::Field(node) => {
                let own = directives_conjunction(ctx, &node.item.directives)?;
                let gate = inherited.and(&own);
                if gate.is_never() {
                    continue;
                }
                acc.entry(node.item.response_key().to_owned())
                    .or_default()
                    .push(CollectedField {
                        node: Arc::clone(node),
                        gate,
                    });
            }
            Selection::InlineFragment(frag) => {
                if let Some(cond) = &frag.item.type_condition {
                    match ctx.schema.applies_to(&cond.item, runtime_type) {
                        None => {
                            return Err(CompileError::MissingFragmentType {
                                name: cond.item.clone(),
                                position: cond.start,
                            });
                        }
                        Some(false) => continue,
                        Some(true) => {}
                    }
                }
                let own = directives_conjunction(ctx, &frag.item.directives)?;
                let inherited = inherited.and(&own);
                if inherited.is_never() {
                    continue;
                }
                stack.push((frag.item.selection_set.iter(), inherited));
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.item.name.item.as_str();
                if visited.contains(name) {
                    continue;
                }
                let Some(fragment) = ctx.fragments.get(name) else {
                    return Err(CompileError::UnknownFragment {
                        name: name.into(),
                        position: spread.start,
                    });
                };
                match ctx
                    .schema
                    .applies_to(&fragment.type_condition.item, runtime_type)
                {
                    None => {
                        return Err(CompileError::MissingFragmentType {
                            name: fragment.type_condition.item.clone(),
                            position: fragment.type_condition.start,
                        });
                    }
                    Some(false) => continue,
                    Some(true) => {}
                }
                let own = directives_conjunction(ctx, &spread.item.directives)?
                    .and(&directives_conjunction(ctx, &fragment.directives)?);
                let inherited = inherited.and(&own);
                if inherited.is_never() {
                    continue;
                }
                visited.insert(name);
                stack.push((fragment.selection_set.iter(), inherited));
            }
        }
    }
    Ok(())
}

/// Compiles the `@skip`/`@include` directives of one selection into a
/// conjunction. Other directives are left to the validator.
pub(crate) fn directives_conjunction(
    ctx: &CollectCtx<'_>,
    directives: &Option<Vec<Spanning<Directive>>>,
) -> Result<Conjunction, CompileError> {
    let mut conj = Conjunction::default();
    let Some(directives) = directives else {
        return Ok(conj);
    };
    for directive in directives {
        let name = directive.item.name.item.as_str();
        let skip = match name {
            "skip" => true,
            "include" => false,
            _ => continue,
        };
        let condition = directive
            .item
            .arguments
            .as_ref()
            .and_then(|args| args.item.get("if"));
        let Some(condition) = condition else {
            return Err(CompileError::InvalidDirective {
                message: format!(
                    "Directive \"@{name}\" argument \"if\" of type \"Boolean!\" is required, \
                     but it was not provided."
                ),
                position: directive.start,
            });
        };
        let pred = match &condition.item {
            InputValue::Scalar(ScalarValue::Boolean(b)) => {
                if *b == skip {
                    // skip(if: true) / include(if: false): statically out.
                    return Ok(Conjunction::never());
                }
                continue;
            }
            InputValue::Variable(v) => {
                check_boolean_variable(ctx, v, directive.start)?;
                if skip {
                    Predicate::Skip(v.clone())
                } else {
                    Predicate::Include(v.clone())
                }
            }
            other => {
                return Err(CompileError::InvalidDirective {
                    message: format!("Argument \"if\" has invalid value {other}."),
                    position: condition.start,
                });
            }
        };
        conj = conj.and(&Conjunction {
            never: false,
            predicates: vec![pred],
        });
    }
    Ok(conj)
}

/// A directive condition variable must be declared `Boolean!`, or
/// `Boolean` with a default value.
fn check_boolean_variable(
    ctx: &CollectCtx<'_>,
    name: &str,
    position: SourcePosition,
) -> Result<(), CompileError> {
    let def = ctx
        .variable_definitions
        .iter()
        .find(|(n, _)| n.item == name);
    let usable = match def {
        Some((_, def)) => match &def.var_type.item {
            Type::NonNullNamed(n) => n == "Boolean",
            Type::Named(n) => n == "Boolean" && def.default_value.is_some(),
            _ => false,
        },
        None => false,
    };
    if usable {
        Ok(())
    } else {
        let declared = def
            .map(|(_, d)| d.var_type.item.to_string())
            .unwrap_or_else(|| "undefined".into());
        Err(CompileError::InvalidVariableUsage {
            message: format!(
                "Variable \"${name}\" of type \"{declared}\" used in position expecting \
                 type \"Boolean!\"."
            ),
            position,
        })
    }
}
