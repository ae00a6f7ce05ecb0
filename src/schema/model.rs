//! The schema registry the compiler plans against.

use arcstr::ArcStr;
use fnv::FnvHashMap;

use super::meta::{MetaType, ObjectMeta};
use crate::ast::OperationType;

/// A static schema: the full type registry plus the root operation types.
///
/// Immutable once built; a compiled query keeps an `Arc` of it.
pub struct SchemaType {
    pub(crate) types: FnvHashMap<ArcStr, MetaType>,
    pub(crate) query_type_name: ArcStr,
    pub(crate) mutation_type_name: Option<ArcStr>,
    pub(crate) subscription_type_name: Option<ArcStr>,
}

impl SchemaType {
    /// Looks a type up by name.
    pub fn concrete_type_by_name(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// The root type name for the given operation kind, if the schema
    /// supports it.
    pub fn root_type_name(&self, operation: OperationType) -> Option<&ArcStr> {
        match operation {
            OperationType::Query => Some(&self.query_type_name),
            OperationType::Mutation => self.mutation_type_name.as_ref(),
            OperationType::Subscription => self.subscription_type_name.as_ref(),
        }
    }

    /// The object metadata for a concrete type name.
    pub fn object_by_name(&self, name: &str) -> Option<&ObjectMeta> {
        match self.concrete_type_by_name(name) {
            Some(MetaType::Object(o)) => Some(o),
            _ => None,
        }
    }

    /// The concrete object types assignable to `t` under the subtype
    /// relation. An object is its own only possible type.
    pub fn possible_types<'a>(&'a self, t: &'a MetaType) -> Vec<&'a ObjectMeta> {
        match t {
            MetaType::Object(o) => vec![o],
            MetaType::Interface(i) => {
                let mut implementers = self
                    .types
                    .values()
                    .filter_map(|t| match t {
                        MetaType::Object(o) if o.interface_names.contains(&i.name) => Some(o),
                        _ => None,
                    })
                    .collect::<Vec<_>>();
                implementers.sort_by(|a, b| a.name.cmp(&b.name));
                implementers
            }
            MetaType::Union(u) => u
                .of_type_names
                .iter()
                .filter_map(|n| self.object_by_name(n))
                .collect(),
            _ => vec![],
        }
    }

    /// Whether `possible` is a possible runtime type of `abstract_type`.
    pub fn is_possible_type(&self, abstract_type: &MetaType, possible: &str) -> bool {
        self.possible_types(abstract_type)
            .iter()
            .any(|o| o.name == possible)
    }

    /// Whether two composite types can ever describe the same runtime
    /// value: either is assignable to the other, or their possible-type
    /// sets intersect.
    pub fn type_overlap(&self, t1: &MetaType, t2: &MetaType) -> bool {
        if std::ptr::eq(t1, t2) || t1.name() == t2.name() {
            return true;
        }
        match (t1.is_abstract(), t2.is_abstract()) {
            (true, true) => self
                .possible_types(t1)
                .iter()
                .any(|t| self.is_possible_type(t2, &t.name)),
            (true, false) => self.is_possible_type(t1, t2.name()),
            (false, true) => self.is_possible_type(t2, t1.name()),
            (false, false) => false,
        }
    }

    /// Whether a fragment with type condition `condition` applies to the
    /// concrete object type `concrete`.
    pub(crate) fn applies_to(&self, condition: &str, concrete: &str) -> Option<bool> {
        let cond = self.concrete_type_by_name(condition)?;
        Some(match cond {
            MetaType::Object(o) => o.name == concrete,
            _ => self.is_possible_type(cond, concrete),
        })
    }
}
