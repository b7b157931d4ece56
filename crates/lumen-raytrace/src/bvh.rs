//! Flat bounding volume hierarchy with skip links for stackless traversal.
//!
//! Both acceleration levels share the same node layout. A hierarchy is built
//! by recursive median split on the longest axis of each node's bounds, and
//! every node carries a `skip` index: the node to visit next once its subtree
//! has been rejected or exhausted. The left child's skip is its right
//! sibling, the right child inherits the parent's skip, and the root's skip
//! is `-1`. Traversal therefore needs no stack:
//!
//! - internal node whose box is hit: descend to the left child
//! - leaf whose box is hit: test primitives, then follow `skip`
//! - any box miss: follow `skip`

use std::ops::{ControlFlow, Range};

use bytemuck::{Pod, Zeroable};
use lumen_math::{Aabb, Point3};

use crate::Ray;

/// Maximum primitives per bottom-level leaf.
pub const BLAS_LEAF_SIZE: usize = 4;

/// Maximum instances per top-level leaf.
pub const TLAS_LEAF_SIZE: usize = 2;

/// Skip index marking the end of traversal.
pub const SKIP_END: i32 = -1;

/// A BVH node in the flat, upload-ready layout.
///
/// For leaves `left_first` is the first slot in the index array and `count`
/// is non-zero. For internal nodes `count` is zero and `left_first` and
/// `right` name the children.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BvhNode {
    /// Box minimum corner.
    pub aabb_min: [f32; 3],
    /// Left child (internal) or first index slot (leaf).
    pub left_first: u32,
    /// Box maximum corner.
    pub aabb_max: [f32; 3],
    /// Number of primitives; zero for internal nodes.
    pub count: u32,
    /// Right child (internal only).
    pub right: u32,
    /// Next node once this subtree is done, or [`SKIP_END`].
    pub skip: i32,
    /// Padding to 48 bytes.
    pub _pad: [u32; 2],
}

impl BvhNode {
    /// Whether this node references primitives directly.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }

    /// Node bounds as an [`Aabb`].
    pub fn aabb(&self) -> Aabb {
        Aabb::new(Point3::from(self.aabb_min), Point3::from(self.aabb_max))
    }

    /// Index array slots covered by a leaf.
    #[inline]
    pub fn index_range(&self) -> Range<usize> {
        let first = self.left_first as usize;
        first..first + self.count as usize
    }

    /// Shift every node reference by `node_offset` and every leaf index slot
    /// by `index_offset`, used when concatenating hierarchies.
    pub fn rebased(mut self, node_offset: u32, index_offset: u32) -> Self {
        if self.is_leaf() {
            self.left_first += index_offset;
        } else {
            self.left_first += node_offset;
            self.right += node_offset;
        }
        if self.skip >= 0 {
            self.skip += node_offset as i32;
        }
        self
    }

    fn set_bounds(&mut self, aabb: &Aabb) {
        self.aabb_min = [aabb.min.x, aabb.min.y, aabb.min.z];
        self.aabb_max = [aabb.max.x, aabb.max.y, aabb.max.z];
    }
}

/// A hierarchy over a set of bounds, with the root at node 0.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    /// Nodes, root first.
    pub nodes: Vec<BvhNode>,
    /// Leaf slots mapping to input primitive indices.
    pub indices: Vec<u32>,
}

impl Bvh {
    /// Build a hierarchy over `bounds` with at most `leaf_size` primitives
    /// per leaf.
    ///
    /// Returns an empty hierarchy when `bounds` is empty.
    pub fn build(bounds: &[Aabb], leaf_size: usize) -> Self {
        if bounds.is_empty() {
            return Self::default();
        }
        let mut builder = Builder {
            bounds,
            centroids: bounds.iter().map(Aabb::center).collect(),
            leaf_size: leaf_size.max(1),
            nodes: Vec::with_capacity(2 * bounds.len()),
            indices: (0..bounds.len() as u32).collect(),
        };
        builder.build_range(0, bounds.len(), SKIP_END);
        Self {
            nodes: builder.nodes,
            indices: builder.indices,
        }
    }

    /// Bounds of the whole hierarchy.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(BvhNode::aabb).unwrap_or_default()
    }
}

struct Builder<'a> {
    bounds: &'a [Aabb],
    centroids: Vec<Point3>,
    leaf_size: usize,
    nodes: Vec<BvhNode>,
    indices: Vec<u32>,
}

impl Builder<'_> {
    fn build_range(&mut self, first: usize, count: usize, skip: i32) -> u32 {
        let node_index = self.nodes.len();
        self.nodes.push(BvhNode::default());

        let aabb = self.indices[first..first + count]
            .iter()
            .fold(Aabb::empty(), |acc, &i| acc.union(&self.bounds[i as usize]));

        let mut node = BvhNode {
            skip,
            ..BvhNode::default()
        };
        node.set_bounds(&aabb);

        if count <= self.leaf_size {
            node.left_first = first as u32;
            node.count = count as u32;
            self.nodes[node_index] = node;
            return node_index as u32;
        }

        let axis = aabb.longest_axis();
        let centroids = &self.centroids;
        self.indices[first..first + count].sort_by(|&a, &b| {
            centroids[a as usize][axis]
                .total_cmp(&centroids[b as usize][axis])
                .then(a.cmp(&b))
        });

        // Right first so its index is known as the left child's skip.
        let mid = count / 2;
        let right = self.build_range(first + mid, count - mid, skip);
        let left = self.build_range(first, mid, right as i32);

        node.left_first = left;
        node.right = right;
        self.nodes[node_index] = node;
        node_index as u32
    }
}

/// Callbacks driven by [`traverse`].
pub trait BvhVisitor {
    /// Whether traversal should enter `node`. Typically a slab test.
    fn enter(&mut self, node: &BvhNode) -> bool;

    /// Process a leaf. Returning `Break` ends traversal early.
    fn leaf(&mut self, node: &BvhNode) -> ControlFlow<()>;
}

/// Walk `nodes` from `root` in skip-link order without a stack.
pub fn traverse<V: BvhVisitor>(nodes: &[BvhNode], root: u32, visitor: &mut V) -> ControlFlow<()> {
    let mut index = root as i32;
    while index >= 0 {
        let node = &nodes[index as usize];
        if !visitor.enter(node) {
            index = node.skip;
        } else if node.is_leaf() {
            visitor.leaf(node)?;
            index = node.skip;
        } else {
            index = node.left_first as i32;
        }
    }
    ControlFlow::Continue(())
}

/// Visitor that records every leaf slot whose path of boxes the ray enters.
///
/// Used by tests and tooling to cross-check traversal against brute force.
pub struct CollectLeaves<'r> {
    ray: &'r Ray,
    t_max: f32,
    /// Leaf slots gathered so far.
    pub slots: Vec<usize>,
}

impl<'r> CollectLeaves<'r> {
    /// Collect leaves hit by `ray` before `t_max`.
    pub fn new(ray: &'r Ray, t_max: f32) -> Self {
        Self {
            ray,
            t_max,
            slots: Vec::new(),
        }
    }
}

impl BvhVisitor for CollectLeaves<'_> {
    fn enter(&mut self, node: &BvhNode) -> bool {
        self.ray.hits_box(&node.aabb_min, &node.aabb_max, self.t_max)
    }

    fn leaf(&mut self, node: &BvhNode) -> ControlFlow<()> {
        self.slots.extend(node.index_range());
        ControlFlow::Continue(())
    }
}
