//! Shrinks a [`ColorOctree`] to at most `K` color buckets.
//!
//! Mergeable nodes (internal nodes whose present children are all leaves) wait in a min-priority
//! queue keyed by their pixel count. Each step folds the lightest node's children into it,
//! turning it into a leaf, and queues its parent once that parent becomes mergeable in turn.
//!
//! Each step removes `children - 1` buckets, so the bucket count never increases.
//! Every internal node is eventually queued, so in the worst case the whole trie collapses
//! into the root and a single bucket remains.

use crate::{octree::NodeId, ColorOctree, PaletteSize, QuantizeError, QuantizeResult};
use std::{cmp::Reverse, collections::BinaryHeap};
use tracing::{debug, trace};

/// Statistics about a call to [`ColorOctree::reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReduceSummary {
    /// The number of steps that folded two or more children, each lowering the bucket count.
    pub merges: u32,
    /// The number of steps that folded a single child, leaving the bucket count unchanged.
    pub promotions: u32,
    /// The number of queue entries that were no longer mergeable when popped and were skipped.
    pub stale: u32,
}

impl ReduceSummary {
    /// The number of nodes that were turned into leaves.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.merges + self.promotions
    }
}

/// A queued mergeable node.
///
/// Ordered by pixel count, then by the order in which nodes were queued,
/// so that equal weights are popped in a reproducible order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    /// The pixel count of the node when it was queued.
    pixel_count: u64,
    /// The queue sequence number.
    order: u64,
    /// The queued node.
    node: NodeId,
}

/// A min-priority queue of merge candidates.
#[derive(Debug, Default)]
struct MergeQueue {
    /// The candidates, lightest on top.
    heap: BinaryHeap<Reverse<Candidate>>,
    /// The number of candidates pushed so far.
    pushed: u64,
}

impl MergeQueue {
    /// Queues `node` with its current pixel count.
    fn push(&mut self, octree: &ColorOctree, node: NodeId) {
        let pixel_count = octree.node(node).pixel_count;
        self.heap.push(Reverse(Candidate { pixel_count, order: self.pushed, node }));
        self.pushed += 1;
    }

    /// Removes the lightest candidate.
    fn pop(&mut self) -> Option<NodeId> {
        self.heap.pop().map(|Reverse(candidate)| candidate.node)
    }
}

/// The outcome of a single [`Reducer::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// A node absorbed this many (at least two) children.
    Merged(usize),
    /// A node absorbed its only child.
    Promoted,
    /// The popped node was no longer mergeable and was skipped.
    Stale,
}

/// Drives the merge loop over a [`ColorOctree`] one step at a time.
pub(crate) struct Reducer<'a> {
    /// The trie being reduced.
    octree: &'a mut ColorOctree,
    /// The pending merge candidates.
    queue: MergeQueue,
}

impl<'a> Reducer<'a> {
    /// Queues every node that is currently mergeable, in post-order.
    pub(crate) fn new(octree: &'a mut ColorOctree) -> Self {
        let mut queue = MergeQueue::default();
        let seeds = octree
            .post_order()
            .filter(|&id| octree.is_mergeable(id))
            .collect::<Vec<_>>();

        for id in seeds {
            queue.push(octree, id);
        }

        Self { octree, queue }
    }

    /// The current number of buckets in the trie.
    pub(crate) fn distinct_color_count(&self) -> usize {
        self.octree.distinct_color_count()
    }

    /// Pops the lightest candidate and folds its children into it.
    ///
    /// Returns `Ok(None)` once the queue is empty.
    pub(crate) fn step(&mut self) -> QuantizeResult<Option<Step>> {
        let Some(id) = self.queue.pop() else {
            return Ok(None);
        };

        if !self.octree.is_mergeable(id) {
            trace!(?id, "skipping stale merge candidate");
            return Ok(Some(Step::Stale));
        }

        let folded = self.fold_children(id)?;

        if let Some(parent) = self.octree.node(id).parent {
            if self.octree.is_mergeable(parent) {
                self.queue.push(self.octree, parent);
            }
        }

        Ok(Some(if folded > 1 { Step::Merged(folded) } else { Step::Promoted }))
    }

    /// Moves the statistics of every child of `id` into `id`,
    /// releases the children, and marks `id` as a leaf.
    ///
    /// Returns the number of children folded.
    fn fold_children(&mut self, id: NodeId) -> QuantizeResult<usize> {
        let children = std::mem::take(&mut self.octree.node_mut(id).children);

        let mut folded = 0;
        let mut pixel_count = 0u64;
        let mut sums = [0u64; 3];
        for child in children.into_iter().flatten() {
            let node = self.octree.node(child);
            if !node.is_leaf {
                return Err(QuantizeError::InternalInvariant(format!(
                    "attempted to fold a non-leaf child at depth {}",
                    node.depth
                )));
            }
            pixel_count += node.pixel_count;
            for (sum, s) in sums.iter_mut().zip(node.sums) {
                *sum += s;
            }
            self.octree.release(child);
            folded += 1;
        }

        let node = self.octree.node_mut(id);
        if pixel_count != node.pixel_count {
            return Err(QuantizeError::InternalInvariant(format!(
                "node at depth {} counts {} pixels but its children hold {pixel_count}",
                node.depth, node.pixel_count
            )));
        }

        for (sum, s) in node.sums.iter_mut().zip(sums) {
            *sum += s;
        }
        node.is_leaf = true;
        self.octree.leaf_count = self.octree.leaf_count + 1 - folded;

        Ok(folded)
    }
}

impl ColorOctree {
    /// Folds the lowest-weight subtrees until at most `target` buckets remain.
    ///
    /// A `target` of `0` is rejected with
    /// [`ConfigError::PaletteSize`](crate::ConfigError::PaletteSize) and leaves the trie untouched.
    /// See [`ColorOctree::reduce_to`] for details.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidConfig`] for a `target` of `0`,
    /// or [`QuantizeError::InternalInvariant`] if the trie is inconsistent.
    /// Signed targets, including negative ones, should go through
    /// [`PaletteSize::try_from`] and [`ColorOctree::reduce_to`] instead.
    pub fn reduce(&mut self, target: u32) -> QuantizeResult<ReduceSummary> {
        let k = PaletteSize::try_from(target)?;
        self.reduce_to(k)
    }

    /// Folds the lowest-weight subtrees until at most `k` buckets remain.
    ///
    /// If the trie already has `k` buckets or fewer, nothing is changed.
    /// Otherwise, afterwards `1 <= self.distinct_color_count() <= k`.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InternalInvariant`] if the trie is found to be inconsistent.
    /// The trie must then be discarded.
    pub fn reduce_to(&mut self, k: PaletteSize) -> QuantizeResult<ReduceSummary> {
        let target = k.as_usize();
        let start = self.distinct_color_count();
        let mut summary = ReduceSummary::default();

        if start <= target {
            debug!(buckets = start, %k, "no reduction needed");
            return Ok(summary);
        }

        let mut reducer = Reducer::new(self);
        while reducer.distinct_color_count() > target {
            match reducer.step()? {
                Some(Step::Merged(_)) => summary.merges += 1,
                Some(Step::Promoted) => summary.promotions += 1,
                Some(Step::Stale) => summary.stale += 1,
                None => break,
            }
        }

        debug!(
            from = start,
            to = self.distinct_color_count(),
            merges = summary.merges,
            promotions = summary.promotions,
            stale = summary.stale,
            "reduced color octree"
        );

        Ok(summary)
    }
}
