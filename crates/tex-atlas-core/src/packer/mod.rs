//! Append-only guillotine box packer.
//!
//! The packer keeps a binary tree over its root rectangle. Every insertion
//! picks the free leaf with the smallest leftover area and cuts it until a
//! leaf of exactly the requested (border-padded) size remains.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::error::{AtlasError, Result};
use crate::model::{AtlasStats, Rect, Size};

mod node;

pub use node::{NodeIndex, PackId, PackNode};

pub struct BoxPacker {
    size: Size,
    border: u32,
    nodes: Vec<PackNode>,
    by_id: HashMap<PackId, NodeIndex>,
    next_id: u32,
    timestamp: u64,
}

impl BoxPacker {
    /// Create a packer covering `size` that reserves `border` pixels around every item.
    pub fn new(size: impl Into<Size>, border: u32) -> Result<Self> {
        let size = size.into();
        if size.is_empty() {
            return Err(AtlasError::InvalidDimensions {
                width: size.w,
                height: size.h,
            });
        }
        let pad = border.saturating_mul(2);
        if pad >= size.w || pad >= size.h {
            return Err(AtlasError::InvalidConfig(format!(
                "border ({}) * 2 leaves no usable space in a {}x{} packer",
                border, size.w, size.h
            )));
        }
        Ok(Self {
            size,
            border,
            nodes: vec![PackNode::free(Rect::from_size(size))],
            by_id: HashMap::new(),
            next_id: 1,
            timestamp: 0,
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn border(&self) -> u32 {
        self.border
    }

    /// Number of occupied leaves.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Place a rectangle of `size` (border excluded).
    ///
    /// Returns `Ok(None)` when no free leaf can hold it; that is the normal
    /// "atlas full" outcome. Zero-sized requests are rejected.
    pub fn insert(&mut self, size: impl Into<Size>) -> Result<Option<PackNode>> {
        let size = size.into();
        let need = self.padded_request(size)?;
        let Some(leaf) = self.best_leaf(need) else {
            debug!(
                w = size.w,
                h = size.h,
                used = self.len(),
                "box packer out of space"
            );
            return Ok(None);
        };
        let id = PackId::new(self.next_id)
            .ok_or_else(|| AtlasError::InvalidInput("pack id space exhausted".into()))?;
        self.next_id = self.next_id.checked_add(1).unwrap_or(0);

        let idx = self.split_to_fit(leaf, need);
        self.timestamp += 1;
        let node = &mut self.nodes[idx.0];
        node.id = Some(id);
        node.timestamp = self.timestamp;
        self.by_id.insert(id, idx);
        trace!(%id, x = node.rect.x, y = node.rect.y, w = node.rect.w, h = node.rect.h, "packed");
        Ok(Some(*node))
    }

    /// Padded rectangle the next `insert(size)` would occupy, without touching the tree.
    ///
    /// Lets a caller prepare the slot (write pixels, reserve GPU memory) and
    /// only commit with `insert` once that succeeded.
    pub fn find_slot(&self, size: impl Into<Size>) -> Result<Option<Rect>> {
        let need = self.padded_request(size.into())?;
        Ok(self.best_leaf(need).map(|leaf| {
            let r = self.nodes[leaf.0].rect;
            // Splitting always keeps the first child at the leaf's corner.
            Rect::new(r.x, r.y, need.w, need.h)
        }))
    }

    /// Whether a rectangle of `size` would currently fit. Does not modify the tree.
    pub fn can_fit(&self, size: impl Into<Size>) -> bool {
        matches!(self.find_slot(size), Ok(Some(_)))
    }

    /// Occupied leaf with the given id.
    pub fn get_node(&self, id: PackId) -> Option<&PackNode> {
        self.by_id.get(&id).map(|idx| &self.nodes[idx.0])
    }

    pub fn root(&self) -> &PackNode {
        &self.nodes[NodeIndex::ROOT.0]
    }

    pub fn node(&self, index: NodeIndex) -> Option<&PackNode> {
        self.nodes.get(index.0)
    }

    /// All nodes in pre-order (parent, first child subtree, second child subtree).
    pub fn nodes(&self) -> Vec<&PackNode> {
        self.preorder().into_iter().map(|(idx, _)| &self.nodes[idx.0]).collect()
    }

    /// Occupied leaves in insertion order.
    pub fn occupied(&self) -> Vec<&PackNode> {
        let mut out: Vec<&PackNode> = self.nodes.iter().filter(|n| n.is_occupied()).collect();
        out.sort_by_key(|n| n.timestamp);
        out
    }

    /// Occupied area divided by the root area, in `[0, 1]`.
    pub fn percentage_used(&self) -> f32 {
        self.stats().occupancy as f32
    }

    pub fn stats(&self) -> AtlasStats {
        let used = self
            .nodes
            .iter()
            .filter(|n| n.is_occupied())
            .map(|n| n.rect.area())
            .sum();
        AtlasStats::new(self.len(), used, self.size.area())
    }

    /// Discard the whole tree and start over with a single free root.
    ///
    /// Ids handed out before the reset are never reissued.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(PackNode::free(Rect::from_size(self.size)));
        self.by_id.clear();
    }

    fn padded_request(&self, size: Size) -> Result<Size> {
        if size.is_empty() {
            return Err(AtlasError::InvalidInput(format!(
                "cannot pack an empty {}x{} rectangle",
                size.w, size.h
            )));
        }
        Ok(size.padded(self.border))
    }

    fn best_leaf(&self, need: Size) -> Option<NodeIndex> {
        let mut best: Option<(NodeIndex, u64)> = None;
        for (idx, _) in self.preorder() {
            let node = &self.nodes[idx.0];
            if !node.is_free_leaf() || node.rect.w < need.w || node.rect.h < need.h {
                continue;
            }
            let leftover = node.rect.area() - need.area();
            if best.is_none_or(|(_, b)| leftover < b) {
                best = Some((idx, leftover));
                if leftover == 0 {
                    break;
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    // Cut along the axis with the larger leftover until the first child is an exact fit.
    fn split_to_fit(&mut self, mut idx: NodeIndex, need: Size) -> NodeIndex {
        loop {
            let r = self.nodes[idx.0].rect;
            let dw = r.w - need.w;
            let dh = r.h - need.h;
            if dw == 0 && dh == 0 {
                return idx;
            }
            let (first, second) = if dw > dh {
                (
                    Rect::new(r.x, r.y, need.w, r.h),
                    Rect::new(r.x + need.w, r.y, dw, r.h),
                )
            } else {
                (
                    Rect::new(r.x, r.y, r.w, need.h),
                    Rect::new(r.x, r.y + need.h, r.w, dh),
                )
            };
            let a = self.push(first);
            let b = self.push(second);
            self.nodes[idx.0].children = Some([a, b]);
            idx = a;
        }
    }

    fn push(&mut self, rect: Rect) -> NodeIndex {
        self.nodes.push(PackNode::free(rect));
        NodeIndex(self.nodes.len() - 1)
    }

    fn preorder(&self) -> Vec<(NodeIndex, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(NodeIndex::ROOT, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            out.push((idx, depth));
            if let Some([a, b]) = self.nodes[idx.0].children {
                stack.push((b, depth + 1));
                stack.push((a, depth + 1));
            }
        }
        out
    }
}

impl fmt::Debug for BoxPacker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxPacker")
            .field("size", &self.size)
            .field("border", &self.border)
            .field("nodes", &self.nodes.len())
            .field("occupied", &self.len())
            .finish()
    }
}

/// Indented tree dump, one node per line: `id: x,y-wxh [timestamp]` (free nodes print id 0).
impl fmt::Display for BoxPacker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, depth) in self.preorder() {
            let n = &self.nodes[idx.0];
            writeln!(
                f,
                "{:indent$}{}: {},{}-{}x{} [{}]",
                "",
                n.id.map_or(0, |id| id.get()),
                n.rect.x,
                n.rect.y,
                n.rect.w,
                n.rect.h,
                n.timestamp,
                indent = depth * 4
            )?;
        }
        Ok(())
    }
}
