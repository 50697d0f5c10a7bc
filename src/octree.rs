//! The color trie that indexes every input color by successive bits of its channels.
//!
//! Nodes live in an arena owned by the [`ColorOctree`] and refer to each other through [`NodeId`]s.
//! A node's `children` are the only owning links: releasing a node releases its whole subtree.
//! The `parent` link is a plain index used to re-check mergeability after a merge.

use crate::{ColorSlice, MAX_DEPTH};
use palette::Srgb;
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// The number of children of each trie node.
pub(crate) const BRANCHES: usize = 8;

/// The index of a node in the arena of a [`ColorOctree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    /// The root node, which is never released.
    pub(crate) const ROOT: Self = Self(0);
}

/// A node of the color trie.
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    /// The number of inserted colors whose bit prefix passes through this node.
    pub(crate) pixel_count: u64,
    /// The component-wise sum of the colors in this bucket.
    ///
    /// Only leaves carry sums: depth-terminal nodes from insertion,
    /// and collapsed nodes that had their children folded into them.
    pub(crate) sums: [u64; 3],
    /// The owned child slots, indexed by the 3-bit value taken from the channels at this depth.
    pub(crate) children: [Option<NodeId>; BRANCHES],
    /// The non-owning back reference to the parent (`None` for the root).
    pub(crate) parent: Option<NodeId>,
    /// The depth of this node, with the root at depth `0`.
    pub(crate) depth: u8,
    /// Whether this node is a color bucket.
    pub(crate) is_leaf: bool,
}

impl Node {
    /// Creates an empty node below `parent`.
    fn new(parent: Option<NodeId>, depth: u8) -> Self {
        Self { parent, depth, ..Self::default() }
    }

    /// Iterates over the present children in slot order.
    pub(crate) fn present_children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().flatten().copied()
    }

    /// Adds the statistics of a bucket to this node.
    fn add_bucket(&mut self, pixel_count: u64, sums: [u64; 3]) {
        self.pixel_count += pixel_count;
        for (sum, s) in self.sums.iter_mut().zip(sums) {
            *sum += s;
        }
    }
}

/// Returns the child slot for `color` at the given depth.
///
/// The slot combines the bit at position `7 - depth` of each channel, red being the most significant.
#[inline]
pub(crate) fn child_slot([r, g, b]: [u8; 3], depth: u8) -> usize {
    let shift = MAX_DEPTH - 1 - depth;
    let bit = |c: u8| usize::from((c >> shift) & 1);
    (bit(r) << 2) | (bit(g) << 1) | bit(b)
}

/// An 8-ary trie keyed by successive bits of the red, green, and blue channels.
///
/// Every inserted color follows a path of exactly [`MAX_DEPTH`] levels below the root.
/// Each node on the path counts the color, and only the depth-terminal node accumulates its
/// channel sums. Use [`ColorOctree::reduce`] to shrink the number of buckets and
/// [`extract_palette`](crate::extract_palette) to read the averaged colors back out.
///
/// # Examples
/// ```
/// # use octette::{ColorOctree, ColorSlice};
/// # use palette::Srgb;
/// let pixels = [Srgb::new(0, 0, 0), Srgb::new(0, 0, 0), Srgb::new(255, 0, 0)];
/// let octree = ColorOctree::from_colors(ColorSlice::try_from(pixels.as_slice()).unwrap());
/// assert_eq!(octree.distinct_color_count(), 2);
/// assert_eq!(octree.total_pixels(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ColorOctree {
    /// The node arena. Index `0` is the root.
    pub(crate) nodes: Vec<Node>,
    /// Released arena slots available for reuse.
    free: Vec<NodeId>,
    /// The number of leaves reachable from the root.
    pub(crate) leaf_count: usize,
}

impl Default for ColorOctree {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorOctree {
    /// Creates an empty [`ColorOctree`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(None, 0)],
            free: Vec::new(),
            leaf_count: 0,
        }
    }

    /// Creates a [`ColorOctree`] by inserting every color in the given slice.
    #[must_use]
    pub fn from_colors(colors: ColorSlice) -> Self {
        let mut octree = Self::new();
        octree.extend_from_slice(&colors);
        octree
    }

    /// Creates a [`ColorOctree`] in parallel by building one trie per chunk of `colors`
    /// and then merging the chunk tries together.
    ///
    /// The result has the same buckets and statistics as [`ColorOctree::from_colors`].
    #[cfg(feature = "threads")]
    #[must_use]
    pub fn from_colors_par(colors: ColorSlice) -> Self {
        let chunk_size = colors.len().div_ceil(rayon::current_num_threads()).max(1);
        colors
            .par_chunks(chunk_size)
            .map(|chunk| {
                let mut octree = Self::new();
                octree.extend_from_slice(chunk);
                octree
            })
            .reduce(Self::new, |mut a, b| {
                a.merge(&b);
                a
            })
    }

    /// Inserts each color in `colors`.
    fn extend_from_slice(&mut self, colors: &[Srgb<u8>]) {
        for &color in colors {
            self.insert(color);
        }
    }

    /// Inserts a single color.
    ///
    /// Missing nodes along the path are created on demand.
    /// If the path runs into a bucket that was collapsed by a reduction,
    /// the color is added to that bucket instead.
    pub fn insert(&mut self, color: Srgb<u8>) {
        let (r, g, b) = color.into_components();
        let rgb = [r, g, b];

        let mut id = NodeId::ROOT;
        loop {
            let node = &mut self.nodes[id.0];
            node.pixel_count += 1;

            if node.is_leaf || node.depth == MAX_DEPTH {
                for (sum, c) in node.sums.iter_mut().zip(rgb) {
                    *sum += u64::from(c);
                }
                if !node.is_leaf {
                    node.is_leaf = true;
                    self.leaf_count += 1;
                }
                return;
            }

            let depth = node.depth;
            let slot = child_slot(rgb, depth);
            let existing = node.children[slot];
            id = match existing {
                Some(child) => child,
                None => {
                    let child = self.alloc(Node::new(Some(id), depth + 1));
                    self.nodes[id.0].children[slot] = Some(child);
                    child
                }
            };
        }
    }

    /// The current number of color buckets (leaves reachable from the root).
    #[must_use]
    pub fn distinct_color_count(&self) -> usize {
        self.leaf_count
    }

    /// The total number of colors inserted.
    #[must_use]
    pub fn total_pixels(&self) -> u64 {
        self.nodes[NodeId::ROOT.0].pixel_count
    }

    /// Whether no colors have been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_pixels() == 0
    }

    /// The number of live nodes in the trie, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// The sum of the pixel counts of all leaves, computed by a full traversal.
    ///
    /// This always equals [`ColorOctree::total_pixels`].
    #[must_use]
    pub fn leaf_pixel_total(&self) -> u64 {
        self.post_order()
            .map(|id| self.node(id))
            .filter(|node| node.is_leaf)
            .map(|node| node.pixel_count)
            .sum()
    }

    /// Adds all statistics of `other` into this trie, node by node.
    ///
    /// If one side has a bucket where the other side has a deeper subtree,
    /// the subtree is folded into the bucket.
    pub fn merge(&mut self, other: &Self) {
        let mut stack = vec![(NodeId::ROOT, NodeId::ROOT)];
        while let Some((id, other_id)) = stack.pop() {
            let theirs = other.node(other_id);
            if theirs.pixel_count == 0 {
                continue;
            }

            if theirs.is_leaf {
                self.collapse(id);
                self.nodes[id.0].add_bucket(theirs.pixel_count, theirs.sums);
                continue;
            }

            if self.nodes[id.0].is_leaf {
                let sums = other.subtree_sums(other_id);
                self.nodes[id.0].add_bucket(theirs.pixel_count, sums);
                continue;
            }

            self.nodes[id.0].pixel_count += theirs.pixel_count;
            let depth = self.nodes[id.0].depth;
            for (slot, child) in theirs.children.iter().enumerate() {
                let Some(child) = *child else { continue };
                let ours = match self.nodes[id.0].children[slot] {
                    Some(ours) => ours,
                    None => {
                        let ours = self.alloc(Node::new(Some(id), depth + 1));
                        self.nodes[id.0].children[slot] = Some(ours);
                        ours
                    }
                };
                stack.push((ours, child));
            }
        }

        self.leaf_count = self.post_order().filter(|&id| self.node(id).is_leaf).count();
    }

    /// Returns the node with the given id.
    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the node with the given id.
    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Whether the node is an internal node whose present children are all leaves.
    pub(crate) fn is_mergeable(&self, id: NodeId) -> bool {
        let node = self.node(id);
        !node.is_leaf
            && node.present_children().next().is_some()
            && node.present_children().all(|child| self.node(child).is_leaf)
    }

    /// Places `node` in the arena, reusing a released slot if there is one.
    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = node;
            id
        } else {
            self.nodes.push(node);
            NodeId(self.nodes.len() - 1)
        }
    }

    /// Releases the node and its whole subtree back to the arena.
    ///
    /// The caller must have already detached `id` from its parent
    /// and must adjust `leaf_count` itself.
    pub(crate) fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = std::mem::take(&mut self.nodes[id.0]);
            stack.extend(node.present_children());
            self.free.push(id);
        }
    }

    /// Folds every bucket below `id` into `id` and makes it a leaf.
    ///
    /// Does not maintain `leaf_count`.
    fn collapse(&mut self, id: NodeId) {
        if self.node(id).is_leaf {
            return;
        }
        let sums = self.subtree_sums(id);
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children.into_iter().flatten() {
            self.release(child);
        }
        let node = self.node_mut(id);
        node.sums = sums;
        node.is_leaf = true;
    }

    /// The channel sums over all buckets in the subtree rooted at `id`.
    fn subtree_sums(&self, id: NodeId) -> [u64; 3] {
        let mut sums = [0; 3];
        for node in PostOrder::new(self, id).map(|id| self.node(id)) {
            if node.is_leaf {
                for (sum, s) in sums.iter_mut().zip(node.sums) {
                    *sum += s;
                }
            }
        }
        sums
    }

    /// A post-order traversal of the trie from the root, visiting children in slot order `0..8`.
    pub(crate) fn post_order(&self) -> PostOrder<'_> {
        PostOrder::new(self, NodeId::ROOT)
    }
}

/// A deterministic post-order traversal over a subtree of a [`ColorOctree`].
pub(crate) struct PostOrder<'a> {
    /// The trie being traversed.
    octree: &'a ColorOctree,
    /// The current path, with the next child slot to visit for each node.
    stack: Vec<(NodeId, usize)>,
}

impl<'a> PostOrder<'a> {
    /// Starts a traversal of the subtree rooted at `root`.
    fn new(octree: &'a ColorOctree, root: NodeId) -> Self {
        let mut stack = Vec::with_capacity(usize::from(MAX_DEPTH) + 1);
        stack.push((root, 0));
        Self { octree, stack }
    }
}

impl Iterator for PostOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let octree = self.octree;
        loop {
            let (id, slot) = self.stack.last_mut()?;
            let next = octree.node(*id).children[*slot..]
                .iter()
                .enumerate()
                .find_map(|(i, child)| child.map(|child| (*slot + i, child)));

            match next {
                Some((i, child)) => {
                    *slot = i + 1;
                    self.stack.push((child, 0));
                }
                None => return self.stack.pop().map(|(id, _)| id),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;

    /// The statistics of every node in traversal order, for comparing tries built differently.
    fn snapshot(octree: &ColorOctree) -> Vec<(u8, u64, [u64; 3], bool)> {
        octree
            .post_order()
            .map(|id| {
                let node = octree.node(id);
                (node.depth, node.pixel_count, node.sums, node.is_leaf)
            })
            .collect()
    }

    fn octree_of(colors: &[Srgb<u8>]) -> ColorOctree {
        ColorOctree::from_colors(ColorSlice::try_from(colors).unwrap())
    }

    /// Follows the insertion path of `color` and returns the visited nodes.
    fn path_of(octree: &ColorOctree, color: Srgb<u8>) -> Vec<NodeId> {
        let (r, g, b) = color.into_components();
        let mut id = NodeId::ROOT;
        let mut path = vec![id];
        while !octree.node(id).is_leaf {
            let depth = octree.node(id).depth;
            id = octree.node(id).children[child_slot([r, g, b], depth)].unwrap();
            path.push(id);
        }
        path
    }

    #[test]
    fn child_slot_takes_one_bit_per_channel() {
        assert_eq!(child_slot([0, 0, 0], 0), 0);
        assert_eq!(child_slot([0x80, 0, 0], 0), 4);
        assert_eq!(child_slot([0, 0x80, 0], 0), 2);
        assert_eq!(child_slot([0, 0, 0x80], 0), 1);
        assert_eq!(child_slot([0xff, 0xff, 0xff], 3), 7);
        assert_eq!(child_slot([1, 0, 1], 7), 5);
        assert_eq!(child_slot([1, 0, 1], 6), 0);
    }

    #[test]
    fn empty_octree() {
        let octree = ColorOctree::new();
        assert!(octree.is_empty());
        assert_eq!(octree.distinct_color_count(), 0);
        assert_eq!(octree.leaf_pixel_total(), 0);
        assert_eq!(octree.node_count(), 1);
        assert_eq!(octree.post_order().collect::<Vec<_>>(), vec![NodeId::ROOT]);
    }

    #[test]
    fn insertion_path_has_full_depth_and_counts() {
        let color = Srgb::new(200, 100, 50);
        let octree = octree_of(&repeat(color, 3));

        let path = path_of(&octree, color);
        assert_eq!(path.len(), usize::from(MAX_DEPTH) + 1);
        for (depth, &id) in path.iter().enumerate() {
            let node = octree.node(id);
            assert_eq!(usize::from(node.depth), depth);
            assert_eq!(node.pixel_count, 3);
            if depth == usize::from(MAX_DEPTH) {
                assert!(node.is_leaf);
                assert_eq!(node.sums, [600, 300, 150]);
            } else {
                assert!(!node.is_leaf);
                assert_eq!(node.sums, [0; 3]);
            }
        }

        for pair in path.windows(2) {
            assert_eq!(octree.node(pair[1]).parent, Some(pair[0]));
        }
        assert_eq!(octree.node_count(), path.len());
    }

    #[test]
    fn one_leaf_per_distinct_color() {
        let colors = test_data_1024();
        let octree = octree_of(&colors);

        let mut distinct = colors.iter().map(|&c| c.into_components()).collect::<Vec<_>>();
        distinct.sort_unstable();
        distinct.dedup();

        assert_eq!(octree.distinct_color_count(), distinct.len());
        assert_eq!(octree.total_pixels(), 1024);
        assert_eq!(octree.leaf_pixel_total(), 1024);
    }

    #[test]
    fn node_count_matches_child_counts() {
        let octree = octree_of(&test_data_256());
        for id in octree.post_order() {
            let node = octree.node(id);
            if node.is_leaf {
                continue;
            }
            let children = node.present_children().map(|c| octree.node(c).pixel_count).sum::<u64>();
            assert_eq!(children, node.pixel_count);
        }
    }

    #[test]
    fn siblings_share_a_parent() {
        let a = Srgb::new(0, 0, 0);
        let b = Srgb::new(0, 0, 1);
        let octree = octree_of(&[a, b]);

        let path_a = path_of(&octree, a);
        let path_b = path_of(&octree, b);
        assert_eq!(path_a[..8], path_b[..8]);
        assert_ne!(path_a[8], path_b[8]);
        assert_eq!(octree.node(path_a[7]).pixel_count, 2);
        assert_eq!(octree.distinct_color_count(), 2);
    }

    #[test]
    fn post_order_visits_children_before_parents() {
        let octree = octree_of(&test_data_256());
        let order = octree.post_order().collect::<Vec<_>>();
        assert_eq!(order.len(), octree.node_count());
        assert_eq!(order.last(), Some(&NodeId::ROOT));

        let position = |id: NodeId| order.iter().position(|&x| x == id).unwrap();
        for &id in &order {
            if let Some(parent) = octree.node(id).parent {
                assert!(position(id) < position(parent));
            }
        }
    }

    #[test]
    fn merge_matches_single_build() {
        let colors = test_data_1024();
        let expected = octree_of(&colors);

        let (left, right) = colors.split_at(300);
        let mut actual = octree_of(left);
        actual.merge(&octree_of(right));

        assert_eq!(snapshot(&actual), snapshot(&expected));
        assert_eq!(actual.distinct_color_count(), expected.distinct_color_count());
    }

    #[test]
    fn merge_into_collapsed_bucket() {
        let colors = [Srgb::new(10, 20, 30), Srgb::new(200, 20, 30)];
        let mut collapsed = octree_of(&colors);
        collapsed.reduce(1).unwrap();
        assert!(collapsed.node(NodeId::ROOT).is_leaf);

        collapsed.merge(&octree_of(&colors));
        assert_eq!(collapsed.distinct_color_count(), 1);
        assert_eq!(collapsed.total_pixels(), 4);
        assert_eq!(collapsed.node(NodeId::ROOT).sums, [420, 80, 120]);
        assert_eq!(collapsed.node_count(), 1);

        let mut full = octree_of(&colors);
        let mut collapsed = octree_of(&colors);
        collapsed.reduce(1).unwrap();
        full.merge(&collapsed);
        assert_eq!(full.distinct_color_count(), 1);
        assert_eq!(full.leaf_pixel_total(), 4);
        assert_eq!(full.node(NodeId::ROOT).sums, [420, 80, 120]);
    }

    #[test]
    fn insert_after_collapse_joins_bucket() {
        let mut octree = octree_of(&[Srgb::new(0, 0, 0), Srgb::new(255, 255, 255)]);
        octree.reduce(1).unwrap();
        octree.insert(Srgb::new(30, 60, 90));

        assert_eq!(octree.distinct_color_count(), 1);
        assert_eq!(octree.total_pixels(), 3);
        assert_eq!(octree.node(NodeId::ROOT).sums, [285, 315, 345]);
    }

    #[test]
    fn merged_counts_grow_past_u32() {
        let color = Srgb::new(12, 34, 56);
        let mut octree = octree_of(&[color]);
        for _ in 0..32 {
            let copy = octree.clone();
            octree.merge(&copy);
        }
        octree.insert(color);

        let total = (1u64 << 32) + 1;
        assert_eq!(octree.total_pixels(), total);
        assert_eq!(octree.leaf_pixel_total(), total);
        assert_eq!(octree.distinct_color_count(), 1);

        octree.reduce(1).unwrap();
        assert_eq!(octree.node(NodeId::ROOT).pixel_count, total);
        assert_eq!(crate::extract_palette(&octree).unwrap(), vec![color]);
    }

    #[test]
    fn released_slots_are_reused() {
        let mut octree = octree_of(&[Srgb::new(0, 0, 0), Srgb::new(0, 0, 1)]);
        let before = octree.nodes.len();
        octree.reduce(1).unwrap();
        assert!(octree.node_count() < before);

        // a new path of 8 nodes, 2 of which land in released slots
        octree.insert(Srgb::new(255, 255, 255));
        assert_eq!(octree.nodes.len(), before + 6);
        assert_eq!(octree.distinct_color_count(), 2);
    }

    #[test]
    #[cfg(feature = "threads")]
    fn single_and_multi_threaded_match() {
        let colors = [test_data_1024().as_slice(); 8].concat();
        let colors = ColorSlice::try_from(colors.as_slice()).unwrap();

        let single = ColorOctree::from_colors(colors);
        let par = ColorOctree::from_colors_par(colors);
        assert_eq!(snapshot(&single), snapshot(&par));
        assert_eq!(single.distinct_color_count(), par.distinct_color_count());
        assert_eq!(par.leaf_pixel_total(), u64::from(colors.num_colors()));
    }
}
