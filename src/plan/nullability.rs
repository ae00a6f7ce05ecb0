//! The nullability map and the post-execution null trimmer.
//!
//! The map mirrors the response shape: one node per response key, a single
//! synthetic child per list. Leaf slots are omitted; errors at leaves are
//! already located by their path. After execution the trimmer converts
//! bubbled null errors into the minimal set of slot nullings.

use std::collections::HashSet;

use fnv::FnvHashMap;

use crate::{error::ExecutionError, path::PathSegment, value::Value};

#[derive(Debug, Default)]
pub(crate) struct NullabilityNode {
    pub(crate) nullable: bool,
    pub(crate) children: FnvHashMap<String, NullabilityNode>,
    pub(crate) item: Option<Box<NullabilityNode>>,
}

impl NullabilityNode {
    pub(crate) fn nullable_root(children: FnvHashMap<String, NullabilityNode>) -> Self {
        Self {
            nullable: true,
            children,
            item: None,
        }
    }

    /// Merges another node into this one, as needed when abstract-type
    /// branches write the same response keys. A slot that is nullable in
    /// any branch is treated as nullable, so bubbling never overshoots.
    pub(crate) fn merge(&mut self, other: NullabilityNode) {
        self.nullable |= other.nullable;
        match (&mut self.item, other.item) {
            (Some(mine), Some(theirs)) => mine.merge(*theirs),
            (mine @ None, Some(theirs)) => *mine = Some(theirs),
            _ => {}
        }
        for (key, child) in other.children {
            match self.children.get_mut(&key) {
                Some(mine) => mine.merge(child),
                None => {
                    self.children.insert(key, child);
                }
            }
        }
    }
}

/// Applies non-`null` semantics to the produced data.
///
/// Each null error is walked from the root; the deepest nullable ancestor
/// on its path is nulled out, or the whole response when no such ancestor
/// exists. A path contributes exactly one error no matter how many
/// candidates it produced. Returns whether the root itself was nulled and
/// the surviving errors.
pub(crate) fn trim_nulls(
    data: &mut Value,
    root: &NullabilityNode,
    null_errors: Vec<ExecutionError>,
) -> (bool, Vec<ExecutionError>) {
    let mut surviving = Vec::new();
    let mut seen: HashSet<Vec<PathSegment>> = HashSet::new();
    let mut root_nulled = false;

    for err in null_errors {
        if !seen.insert(err.path().to_vec()) {
            continue;
        }

        if !root_nulled {
            let cut = find_cut(root, err.path());
            match cut {
                0 => root_nulled = true,
                depth => null_at(data, &err.path()[..depth]),
            }
        }
        surviving.push(err);
    }

    (root_nulled, surviving)
}

/// The deepest prefix length of `path` that lands on a nullable slot;
/// zero means the response root.
fn find_cut(root: &NullabilityNode, path: &[PathSegment]) -> usize {
    let mut node = root;
    let mut cut = 0;
    for (i, segment) in path.iter().enumerate() {
        let child = match segment {
            PathSegment::Key(k) => node.children.get(k),
            PathSegment::Index(_) => node.item.as_deref(),
        };
        let Some(child) = child else {
            break;
        };
        node = child;
        if node.nullable {
            cut = i + 1;
        }
    }
    cut
}

/// Writes `null` into `data` at `path`. Silently stops when an ancestor
/// was already nulled by an earlier cut.
fn null_at(data: &mut Value, path: &[PathSegment]) {
    let Some((last, prefix)) = path.split_last() else {
        return;
    };
    let mut slot = data;
    for segment in prefix {
        let next = match segment {
            PathSegment::Key(k) => slot
                .as_mut_object_value()
                .and_then(|o| o.get_mut_field_value(k)),
            PathSegment::Index(i) => match slot {
                Value::List(items) => items.get_mut(*i),
                _ => None,
            },
        };
        match next {
            Some(next) => slot = next,
            None => return,
        }
    }
    match last {
        PathSegment::Key(k) => {
            if let Some(obj) = slot.as_mut_object_value() {
                if let Some(v) = obj.get_mut_field_value(k) {
                    *v = Value::Null;
                }
            }
        }
        PathSegment::Index(i) => {
            if let Value::List(items) = slot {
                if let Some(v) = items.get_mut(*i) {
                    *v = Value::Null;
                }
            }
        }
    }
}
