//! Source positions and lowering of externally parsed documents.
//!
//! Parsing itself is not this crate's business: callers hand over a
//! [`graphql_parser`] query document, and [`lower_document`] turns it into
//! the owned [`crate::ast`] the compiler reads. Only line/column survive
//! from the parse; they feed error `locations`.

use std::sync::Arc;

use serde::Serialize;

use crate::ast::{
    Arguments, Definition, Directive, Document, Field, Fragment, FragmentSpread, InlineFragment,
    InputValue, Operation, OperationType, Selection, Type, VariableDefinition,
};

/// A reference to a line and column in an input source file.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SourcePosition {
    line: usize,
    column: usize,
}

impl SourcePosition {
    #[doc(hidden)]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The position pointing at nothing in particular.
    pub fn new_origin() -> Self {
        Self { line: 0, column: 0 }
    }

    /// The one-based line of this position.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The one-based column of this position.
    pub fn column(&self) -> usize {
        self.column
    }
}

/// Data structure used to wrap items with their position in the source.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Spanning<T> {
    /// The wrapped item.
    pub item: T,

    /// Where the item starts in the source.
    pub start: SourcePosition,
}

impl<T> Spanning<T> {
    #[doc(hidden)]
    pub fn new(start: SourcePosition, item: T) -> Self {
        Self { item, start }
    }

    /// Wraps an item with no position information.
    pub fn unlocated(item: T) -> Self {
        Self::new(SourcePosition::new_origin(), item)
    }

    /// Modifies the contents of the spanned item.
    pub fn map<O, F: FnOnce(T) -> O>(self, f: F) -> Spanning<O> {
        Spanning::new(self.start, f(self.item))
    }
}

type ExtDocument<'a> = graphql_parser::query::Document<'a, String>;
type ExtDefinition<'a> = graphql_parser::query::Definition<'a, String>;
type ExtOperation<'a> = graphql_parser::query::OperationDefinition<'a, String>;
type ExtSelectionSet<'a> = graphql_parser::query::SelectionSet<'a, String>;
type ExtSelection<'a> = graphql_parser::query::Selection<'a, String>;
type ExtField<'a> = graphql_parser::query::Field<'a, String>;
type ExtDirective<'a> = graphql_parser::query::Directive<'a, String>;
type ExtVariableDefinition<'a> = graphql_parser::query::VariableDefinition<'a, String>;
type ExtValue<'a> = graphql_parser::query::Value<'a, String>;
type ExtType<'a> = graphql_parser::query::Type<'a, String>;

fn position(pos: &graphql_parser::Pos) -> SourcePosition {
    SourcePosition::new(pos.line, pos.column)
}

/// Lowers an externally parsed query document into the crate AST.
pub fn lower_document(document: &ExtDocument<'_>) -> Document {
    document.definitions.iter().map(lower_definition).collect()
}

fn lower_definition(def: &ExtDefinition<'_>) -> Definition {
    match def {
        ExtDefinition::Operation(op) => {
            let (pos, op) = lower_operation(op);
            Definition::Operation(Spanning::new(pos, op))
        }
        ExtDefinition::Fragment(f) => {
            let graphql_parser::query::TypeCondition::On(cond) = &f.type_condition;
            Definition::Fragment(Arc::new(Fragment {
                name: Spanning::new(position(&f.position), f.name.clone()),
                type_condition: Spanning::new(position(&f.position), cond.clone()),
                directives: lower_directives(&f.directives),
                selection_set: lower_selection_set(&f.selection_set),
            }))
        }
    }
}

fn lower_operation(op: &ExtOperation<'_>) -> (SourcePosition, Operation) {
    match op {
        ExtOperation::SelectionSet(set) => (
            position(&set.span.0),
            Operation {
                operation_type: OperationType::Query,
                name: None,
                variable_definitions: vec![],
                directives: None,
                selection_set: lower_selection_set(set),
            },
        ),
        ExtOperation::Query(q) => (
            position(&q.position),
            lower_operation_parts(
                OperationType::Query,
                &q.name,
                &q.position,
                &q.variable_definitions,
                &q.directives,
                &q.selection_set,
            ),
        ),
        ExtOperation::Mutation(m) => (
            position(&m.position),
            lower_operation_parts(
                OperationType::Mutation,
                &m.name,
                &m.position,
                &m.variable_definitions,
                &m.directives,
                &m.selection_set,
            ),
        ),
        ExtOperation::Subscription(s) => (
            position(&s.position),
            lower_operation_parts(
                OperationType::Subscription,
                &s.name,
                &s.position,
                &s.variable_definitions,
                &s.directives,
                &s.selection_set,
            ),
        ),
    }
}

fn lower_operation_parts(
    operation_type: OperationType,
    name: &Option<String>,
    pos: &graphql_parser::Pos,
    variable_definitions: &[ExtVariableDefinition<'_>],
    directives: &[ExtDirective<'_>],
    selection_set: &ExtSelectionSet<'_>,
) -> Operation {
    Operation {
        operation_type,
        name: name
            .as_ref()
            .map(|n| Spanning::new(position(pos), n.clone())),
        variable_definitions: variable_definitions
            .iter()
            .map(|d| {
                (
                    Spanning::new(position(&d.position), d.name.clone()),
                    VariableDefinition {
                        var_type: Spanning::new(position(&d.position), lower_type(&d.var_type)),
                        default_value: d
                            .default_value
                            .as_ref()
                            .map(|v| Spanning::new(position(&d.position), lower_value(v))),
                    },
                )
            })
            .collect(),
        directives: lower_directives(directives),
        selection_set: lower_selection_set(selection_set),
    }
}

fn lower_selection_set(set: &ExtSelectionSet<'_>) -> Vec<Selection> {
    set.items.iter().map(lower_selection).collect()
}

fn lower_selection(selection: &ExtSelection<'_>) -> Selection {
    match selection {
        ExtSelection::Field(f) => Selection::Field(Arc::new(Spanning::new(
            position(&f.position),
            lower_field(f),
        ))),
        ExtSelection::FragmentSpread(s) => Selection::FragmentSpread(Spanning::new(
            position(&s.position),
            FragmentSpread {
                name: Spanning::new(position(&s.position), s.fragment_name.clone()),
                directives: lower_directives(&s.directives),
            },
        )),
        ExtSelection::InlineFragment(i) => {
            let cond = i.type_condition.as_ref().map(|c| {
                let graphql_parser::query::TypeCondition::On(name) = c;
                Spanning::new(position(&i.position), name.clone())
            });
            Selection::InlineFragment(Spanning::new(
                position(&i.position),
                InlineFragment {
                    type_condition: cond,
                    directives: lower_directives(&i.directives),
                    selection_set: lower_selection_set(&i.selection_set),
                },
            ))
        }
    }
}

fn lower_field(field: &ExtField<'_>) -> Field {
    Field {
        alias: field
            .alias
            .as_ref()
            .map(|a| Spanning::new(position(&field.position), a.clone())),
        name: Spanning::new(position(&field.position), field.name.clone()),
        arguments: lower_arguments(&field.arguments, &field.position),
        directives: lower_directives(&field.directives),
        selection_set: if field.selection_set.items.is_empty() {
            None
        } else {
            Some(lower_selection_set(&field.selection_set))
        },
    }
}

fn lower_arguments(
    arguments: &[(String, ExtValue<'_>)],
    pos: &graphql_parser::Pos,
) -> Option<Spanning<Arguments>> {
    if arguments.is_empty() {
        return None;
    }
    Some(Spanning::new(
        position(pos),
        Arguments {
            items: arguments
                .iter()
                .map(|(name, value)| {
                    (
                        Spanning::new(position(pos), name.clone()),
                        Spanning::new(position(pos), lower_value(value)),
                    )
                })
                .collect(),
        },
    ))
}

fn lower_directives(directives: &[ExtDirective<'_>]) -> Option<Vec<Spanning<Directive>>> {
    if directives.is_empty() {
        return None;
    }
    Some(
        directives
            .iter()
            .map(|d| {
                Spanning::new(
                    position(&d.position),
                    Directive {
                        name: Spanning::new(position(&d.position), d.name.clone()),
                        arguments: lower_arguments(&d.arguments, &d.position),
                    },
                )
            })
            .collect(),
    )
}

pub(crate) fn lower_type(ty: &ExtType<'_>) -> Type {
    match ty {
        ExtType::NamedType(n) => Type::Named(arcstr::ArcStr::from(n.as_str())),
        ExtType::ListType(inner) => Type::List(Box::new(lower_type(inner))),
        ExtType::NonNullType(inner) => match lower_type(inner) {
            Type::Named(n) => Type::NonNullNamed(n),
            Type::List(l) => Type::NonNullList(l),
            t => t,
        },
    }
}

/// Lowers a parsed value literal, preserving variable references.
pub fn lower_value(value: &ExtValue<'_>) -> InputValue {
    match value {
        ExtValue::Variable(v) => InputValue::Variable(v.clone()),
        ExtValue::Int(n) => match n.as_i64() {
            Some(i) if i >= i64::from(i32::MIN) && i <= i64::from(i32::MAX) => {
                InputValue::scalar(i as i32)
            }
            Some(i) => InputValue::scalar(i as f64),
            None => InputValue::Null,
        },
        ExtValue::Float(f) => InputValue::scalar(*f),
        ExtValue::String(s) => InputValue::scalar(s.as_str()),
        ExtValue::Boolean(b) => InputValue::scalar(*b),
        ExtValue::Null => InputValue::Null,
        ExtValue::Enum(e) => InputValue::enum_value(e),
        ExtValue::List(items) => {
            InputValue::List(items.iter().map(|v| Spanning::unlocated(lower_value(v))).collect())
        }
        ExtValue::Object(fields) => InputValue::Object(
            fields
                .iter()
                .map(|(k, v)| {
                    (
                        Spanning::unlocated(k.clone()),
                        Spanning::unlocated(lower_value(v)),
                    )
                })
                .collect(),
        ),
    }
}
