//! The compiler's output: a materialized execution plan.
//!
//! Every field the expanded document can produce maps to exactly one plan
//! node. The engine interprets this structure; nothing on the per-request
//! hot path re-walks the schema or the document.

pub(crate) mod nullability;
pub(crate) mod planner;

use std::sync::Arc;

use arcstr::ArcStr;

use crate::{
    ast::Type,
    collect::IncludeGate,
    look_ahead::InfoTemplate,
    parser::SourcePosition,
    path::PathSegment,
    resolve::{IsTypeOfFn, ResolveFn, ResolveTypeFn, SubscribeFn},
    serialize::LeafSerializer,
    value::Object,
};

/// A plan node together with its non-`null` obligation.
///
/// When `non_null` is set, failures and `null`s produced here must bubble:
/// the engine routes their errors into the null-error channel and the
/// trimmer prunes ancestors afterwards.
pub(crate) struct TypedPlan {
    pub(crate) non_null: bool,
    pub(crate) shape: PlanShape,
}

pub(crate) enum PlanShape {
    Leaf(LeafSerializer),
    Object(ObjectPlan),
    Abstract(AbstractPlan),
    List(Box<TypedPlan>),
}

/// The fields to produce for one concrete object type, in selection order.
pub(crate) struct ObjectPlan {
    pub(crate) type_name: ArcStr,
    pub(crate) fields: Vec<FieldPlan>,
}

/// Precomputed dispatch for an interface or union position.
pub(crate) struct AbstractPlan {
    pub(crate) type_name: ArcStr,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
    /// `concrete type name → branch`, in deterministic order.
    pub(crate) branches: Vec<(ArcStr, ObjectPlan)>,
    /// The `is_type_of` fallback chain, in possible-type order.
    pub(crate) is_type_of: Vec<(ArcStr, IsTypeOfFn)>,
    /// Resolve-info template for the abstract position's type resolver.
    pub(crate) info: Arc<InfoTemplate>,
}

impl AbstractPlan {
    pub(crate) fn branch(&self, name: &str) -> Option<&ObjectPlan> {
        self.branches
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }
}

/// One response key of an [`ObjectPlan`].
pub(crate) struct FieldPlan {
    pub(crate) response_key: String,
    pub(crate) label: ArcStr,
    pub(crate) position: SourcePosition,
    pub(crate) gate: IncludeGate,
    pub(crate) kind: FieldPlanKind,
}

pub(crate) enum FieldPlanKind {
    /// `__typename`, lowered to a constant at plan time.
    Typename(ArcStr),
    /// A deferred field: value obtained through a resolver invocation.
    Resolve(Box<ResolvePlan>),
}

pub(crate) struct ResolvePlan {
    pub(crate) field_name: ArcStr,
    /// `None` falls back to a property read on the parent value.
    pub(crate) resolver: Option<ResolveFn>,
    pub(crate) subscribe: Option<SubscribeFn>,
    pub(crate) args: ArgumentPlan,
    pub(crate) info: Arc<InfoTemplate>,
    pub(crate) output: TypedPlan,
}

/// Argument assembly instructions for one field.
///
/// `values` holds everything known statically, already coerced. Each
/// [`MissingVariable`] marks a hole a runtime variable value gets spliced
/// into; non-`null` holes gate the resolver call.
#[derive(Clone, Default)]
pub(crate) struct ArgumentPlan {
    pub(crate) values: Object,
    pub(crate) missing: Vec<MissingVariable>,
}

#[derive(Clone, Debug)]
pub(crate) struct MissingVariable {
    pub(crate) name: String,
    /// Position inside the argument object, starting with the argument's
    /// own name.
    pub(crate) path: Vec<PathSegment>,
    pub(crate) non_null: bool,
    pub(crate) expected: Type,
    pub(crate) argument: ArcStr,
}
