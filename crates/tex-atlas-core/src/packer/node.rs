use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

use crate::model::Rect;

/// Stable identifier of an occupied packer slot. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackId(NonZeroU32);

impl PackId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a node inside a packer's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

/// A node of the packing tree.
///
/// Leaves are either free (`id() == None`) or occupied by exactly one
/// inserted rectangle. Internal nodes always have two children whose
/// rectangles partition the parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackNode {
    pub(crate) rect: Rect,
    pub(crate) children: Option<[NodeIndex; 2]>,
    pub(crate) id: Option<PackId>,
    pub(crate) timestamp: u64,
}

impl PackNode {
    pub(crate) fn free(rect: Rect) -> Self {
        Self {
            rect,
            children: None,
            id: None,
            timestamp: 0,
        }
    }

    /// Area covered by this node, border included.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn children(&self) -> Option<[NodeIndex; 2]> {
        self.children
    }

    pub fn id(&self) -> Option<PackId> {
        self.id
    }

    /// Insertion counter value at the time the leaf was occupied; 0 when free.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_occupied(&self) -> bool {
        self.id.is_some()
    }

    pub(crate) fn is_free_leaf(&self) -> bool {
        self.is_leaf() && self.id.is_none()
    }
}
