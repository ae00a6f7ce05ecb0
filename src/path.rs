//! Response-path bookkeeping.
//!
//! Paths are persistent cons lists sharing their tails, so pushing a
//! segment while descending never copies the ancestry. Three segment kinds
//! exist: `Literal` response keys and list `Index`es surface in
//! client-visible error paths; `Meta` segments only disambiguate
//! abstract-type branches internally and are stripped on output.

use std::{fmt, sync::Arc};

use arcstr::ArcStr;
use serde::{Serialize, Serializer};

/// A segment of a client-visible response path.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PathSegment {
    /// A response key.
    Key(String),
    /// A list index.
    Index(usize),
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Key(k) => serializer.serialize_str(k),
            Self::Index(i) => serializer.serialize_u64(*i as u64),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => write!(f, "{k}"),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum PathEntry {
    Literal(String),
    Index(usize),
    Meta(ArcStr),
}

/// A persistent path from the response root to the slot being resolved.
#[derive(Clone, Debug)]
pub(crate) enum ObjectPath {
    Root,
    Node(PathEntry, Arc<ObjectPath>),
}

impl ObjectPath {
    pub(crate) fn root() -> Arc<Self> {
        Arc::new(Self::Root)
    }

    pub(crate) fn literal(self: &Arc<Self>, key: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::Node(PathEntry::Literal(key.into()), Arc::clone(self)))
    }

    pub(crate) fn index(self: &Arc<Self>, idx: usize) -> Arc<Self> {
        Arc::new(Self::Node(PathEntry::Index(idx), Arc::clone(self)))
    }

    pub(crate) fn meta(self: &Arc<Self>, name: ArcStr) -> Arc<Self> {
        Arc::new(Self::Node(PathEntry::Meta(name), Arc::clone(self)))
    }

    /// Renders the client-visible path in root-to-leaf order, dropping
    /// `Meta` segments.
    pub(crate) fn to_response_path(&self) -> Vec<PathSegment> {
        let mut acc = Vec::new();
        self.construct_path(&mut acc);
        acc
    }

    fn construct_path(&self, acc: &mut Vec<PathSegment>) {
        match self {
            Self::Root => {}
            Self::Node(entry, prev) => {
                prev.construct_path(acc);
                match entry {
                    PathEntry::Literal(key) => acc.push(PathSegment::Key(key.clone())),
                    PathEntry::Index(idx) => acc.push(PathSegment::Index(*idx)),
                    PathEntry::Meta(_) => {}
                }
            }
        }
    }

}
